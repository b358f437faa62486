pub mod assignment;
pub mod order;
pub mod order_item;
pub mod transition_log;
pub mod workflow_step;
