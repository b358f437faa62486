use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::entities::{order, workflow_step};
use crate::workflow::rooms::active_step;

/// Urgency bucket for the order-level SLA display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SlaSeverity {
    Normal,
    Warning,
    Critical,
}

/// Order-level SLA: elapsed-time percentage plus a human label.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SlaProgress {
    /// Elapsed share of the deadline window, clamped to [0, 100].
    pub percentage: f64,
    /// Whole hours until the deadline, floored at zero.
    pub hours_left: i64,
    pub label: String,
    pub severity: SlaSeverity,
}

/// Computes SLA progress for an order against its deadline. Pure; `now`
/// is injected so readers can ask about any instant.
pub fn sla_progress(
    due_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> SlaProgress {
    let Some(due_at) = due_at else {
        return SlaProgress {
            percentage: 0.0,
            hours_left: 0,
            label: "N/A".to_string(),
            severity: SlaSeverity::Normal,
        };
    };

    let total_secs = (due_at - created_at).num_seconds();
    let elapsed_secs = (now - created_at).num_seconds();
    let percentage = if total_secs <= 0 {
        100.0
    } else {
        (elapsed_secs as f64 / total_secs as f64 * 100.0).clamp(0.0, 100.0)
    };

    let remaining = due_at - now;
    let hours_left = remaining.num_hours().max(0);

    let (label, severity) = if remaining.num_seconds() <= 0 {
        ("Overdue".to_string(), SlaSeverity::Critical)
    } else if remaining.num_hours() <= 2 {
        (
            format!("{}m remaining", remaining.num_minutes().max(1)),
            SlaSeverity::Critical,
        )
    } else if remaining.num_hours() <= 8 {
        (
            format!("{}h remaining", remaining.num_hours()),
            SlaSeverity::Warning,
        )
    } else {
        (
            format!("{}h remaining", remaining.num_hours()),
            SlaSeverity::Normal,
        )
    };

    SlaProgress {
        percentage,
        hours_left,
        label,
        severity,
    }
}

/// Deadline display for one fulfillment unit's active step.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StepDeadline {
    pub label: String,
    pub due_at: Option<DateTime<Utc>>,
}

impl StepDeadline {
    fn bare(label: &str) -> Self {
        Self {
            label: label.to_string(),
            due_at: None,
        }
    }
}

fn days_label(prefix: &str, days: i64) -> String {
    if days == 1 {
        format!("{prefix} 1 day")
    } else {
        format!("{prefix} {days} days")
    }
}

/// Computes the deadline label for a unit from its services' steps.
///
/// The countdown base is the active step's `started_at`, falling back to
/// the order's confirmation and then creation time for steps that have
/// not started yet.
pub fn step_deadline(
    steps: &[workflow_step::Model],
    order: &order::Model,
    now: DateTime<Utc>,
) -> StepDeadline {
    if steps.is_empty() {
        return StepDeadline::bare("Awaiting process");
    }

    let Some(active) = active_step(steps) else {
        if steps.iter().all(|s| s.status.is_terminal()) {
            return StepDeadline::bare("Completed");
        }
        return StepDeadline::bare("N/A");
    };

    let base = active
        .started_at
        .or(order.confirmed_at)
        .unwrap_or(order.created_at);
    if active.estimated_duration_days <= 0 {
        return StepDeadline::bare("No deadline set");
    }

    let due = base + Duration::days(i64::from(active.estimated_duration_days));
    let diff_secs = (due - now).num_seconds();
    // Ceiling of the day difference, matching "due tomorrow" = 1 day left.
    let diff_days = if diff_secs >= 0 {
        (diff_secs + 86_399) / 86_400
    } else {
        -((-diff_secs + 86_399) / 86_400)
    };

    let label = if diff_days >= 0 {
        days_label("Remaining", diff_days)
    } else {
        days_label("Overdue", -diff_days)
    };

    StepDeadline {
        label,
        due_at: Some(due),
    }
}
