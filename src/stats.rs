use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{PrState, ProjectState, TaskStatus};
use crate::reconcile::reconcile;

/// Per-reviewer merged/open PR counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewerStats {
    pub username: String,
    pub merged: u64,
    pub open: u64,
}

/// Rolled-up view across one or more projects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    /// `completed / total * 100`; 0 for an empty backlog.
    pub completion_pct: f64,
    /// Sorted by merged count descending, then username.
    pub leaderboard: Vec<ReviewerStats>,
    pub total_cost_usd: f64,
    pub cost_by_model: BTreeMap<String, f64>,
    /// Orphaned-execution reasons, for warning output.
    pub orphaned: Vec<String>,
}

/// Aggregate completion, leaderboard, and cost data over reconciled state.
///
/// Counts every execution record, not just current ones: a reviewer's merged
/// total and a model's spend include retried attempts. A project with zero
/// executions produces a valid all-zero report.
pub fn aggregate(projects: &[ProjectState]) -> Report {
    let mut total_tasks = 0;
    let mut completed_tasks = 0;
    let mut counts: BTreeMap<&str, (u64, u64)> = BTreeMap::new();
    let mut total_cost_usd = 0.0;
    let mut cost_by_model: BTreeMap<String, f64> = BTreeMap::new();
    let mut orphaned = Vec::new();

    for project in projects {
        let recon = reconcile(&project.tasks, &project.executions);
        total_tasks += recon.tasks.len();
        completed_tasks += recon
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count();
        orphaned.extend(
            recon
                .orphaned
                .iter()
                .map(|o| format!("{}: {}", project.project, o.reason)),
        );

        for record in &project.executions {
            if !record.reviewer.is_empty() {
                let entry = counts.entry(record.reviewer.as_str()).or_insert((0, 0));
                match record.pr_state {
                    PrState::Merged => entry.0 += 1,
                    PrState::Open => entry.1 += 1,
                    PrState::Closed => {}
                }
            }
            for op in &record.ai_operations {
                total_cost_usd += op.cost_usd;
                *cost_by_model.entry(op.model.clone()).or_insert(0.0) += op.cost_usd;
            }
        }
    }

    let completion_pct = if total_tasks == 0 {
        0.0
    } else {
        completed_tasks as f64 / total_tasks as f64 * 100.0
    };

    let mut leaderboard: Vec<ReviewerStats> = counts
        .into_iter()
        .map(|(username, (merged, open))| ReviewerStats {
            username: username.to_string(),
            merged,
            open,
        })
        .collect();
    leaderboard.sort_by(|a, b| b.merged.cmp(&a.merged).then(a.username.cmp(&b.username)));

    Report {
        total_tasks,
        completed_tasks,
        completion_pct,
        leaderboard,
        total_cost_usd,
        cost_by_model,
        orphaned,
    }
}
