use serde::Serialize;

use crate::capacity::select_reviewer;
use crate::model::{ExecutionRecord, ReconciledTask, Reviewer, Task, TaskStatus};
use crate::reconcile::reconcile;

pub const BLOCKED_NO_CAPACITY: &str = "no reviewer capacity";
pub const BLOCKED_NO_PENDING: &str = "no pending tasks";

/// The single decision handed to the orchestration layer: start a task with a
/// reviewer, or stand down with a reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Decision {
    Start {
        task_hash: String,
        ordinal: usize,
        description: String,
        reviewer: String,
    },
    Blocked {
        reason: String,
    },
}

/// The lowest-ordinal pending task, or `None` when the backlog is exhausted.
/// Ordinal order is the sole priority rule.
pub fn next_task(reconciled: &[ReconciledTask]) -> Option<&ReconciledTask> {
    reconciled
        .iter()
        .filter(|t| t.status == TaskStatus::Pending)
        .min_by_key(|t| t.task.ordinal)
}

/// Reconcile and decide what to start next.
///
/// Capacity is checked before task selection only as a short-circuit; both
/// computations are pure, so the order does not affect correctness. An
/// exhausted backlog and a full roster are both expected terminal states,
/// reported as `Blocked` with a specific reason rather than as errors.
pub fn start_next(
    tasks: &[Task],
    executions: &[ExecutionRecord],
    reviewers: &[Reviewer],
) -> Decision {
    let Some(reviewer) = select_reviewer(reviewers, executions) else {
        return Decision::Blocked {
            reason: BLOCKED_NO_CAPACITY.to_string(),
        };
    };

    let reconciliation = reconcile(tasks, executions);
    match next_task(&reconciliation.tasks) {
        Some(next) => Decision::Start {
            task_hash: next.task.hash_id.clone(),
            ordinal: next.task.ordinal,
            description: next.task.description.clone(),
            reviewer: reviewer.username.clone(),
        },
        None => Decision::Blocked {
            reason: BLOCKED_NO_PENDING.to_string(),
        },
    }
}
