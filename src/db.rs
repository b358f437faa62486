use std::time::Duration;

use sea_orm::sea_query::Index;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema,
};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::entities;

/// Type alias for a database connection pool.
pub type DbPool = DatabaseConnection;

/// Establishes a connection pool to the database.
pub async fn establish_connection(config: &AppConfig) -> Result<DbPool, DbErr> {
    let mut options = ConnectOptions::new(config.database_url.clone());
    options
        .max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .connect_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(!config.is_production());

    let pool = Database::connect(options).await?;
    info!("database connection established");

    if config.auto_migrate {
        init_schema(&pool).await?;
    }

    Ok(pool)
}

/// Creates any missing tables from the entity definitions. Idempotent;
/// suitable for the embedded SQLite target and for fresh Postgres
/// databases.
pub async fn init_schema(db: &DbPool) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut statements = vec![
        schema.create_table_from_entity(entities::order::Entity),
        schema.create_table_from_entity(entities::order_item::Entity),
        schema.create_table_from_entity(entities::workflow_step::Entity),
        schema.create_table_from_entity(entities::assignment::Entity),
        schema.create_table_from_entity(entities::transition_log::Entity),
    ];

    for statement in &mut statements {
        statement.if_not_exists();
        db.execute(backend.build(&*statement)).await?;
    }

    // One assignment per (item, person, role), regardless of which writer
    // touches the table.
    let unique_assignment = Index::create()
        .name("idx_assignments_item_person_role")
        .table(entities::assignment::Entity)
        .col(entities::assignment::Column::ItemId)
        .col(entities::assignment::Column::PersonId)
        .col(entities::assignment::Column::Role)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(backend.build(&unique_assignment)).await?;

    debug!("schema initialized");
    Ok(())
}
