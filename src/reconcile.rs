use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::model::{ExecutionRecord, PrState, ReconciledTask, Task, TaskStatus};

/// An execution whose task no longer exists in the current spec read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrphanedExecution {
    pub execution: ExecutionRecord,
    pub reason: String,
}

/// Output of one reconciliation pass: every spec task classified, plus the
/// inconsistencies worth surfacing (orphans, current-execution ties).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciliation {
    pub tasks: Vec<ReconciledTask>,
    pub orphaned: Vec<OrphanedExecution>,
    pub warnings: Vec<String>,
}

/// Classify every spec task against the execution history.
///
/// Pure function of its two inputs: no I/O, no shared state, identical inputs
/// give identical output. The spec file and the PR set are never a consistent
/// snapshot of each other, so this is re-run from scratch on every invocation
/// instead of holding any cross-run state.
///
/// Rules, per task hash:
/// - the current execution is the latest-created non-closed record (ties on
///   `created_at` broken by the higher PR number);
/// - completed if the spec checkbox is ticked or the current execution is
///   merged; in-progress if it is open; pending otherwise (including when
///   every record is closed, which makes the task eligible for retry);
/// - executions whose hash matches no spec task are surfaced as orphaned.
pub fn reconcile(tasks: &[Task], executions: &[ExecutionRecord]) -> Reconciliation {
    let mut by_hash: HashMap<&str, Vec<&ExecutionRecord>> = HashMap::new();
    for record in executions {
        by_hash.entry(record.task_hash.as_str()).or_default().push(record);
    }

    let mut current: HashMap<&str, &ExecutionRecord> = HashMap::new();
    let mut warnings = Vec::new();
    for (hash, records) in &by_hash {
        let mut live: Vec<&ExecutionRecord> = records
            .iter()
            .copied()
            .filter(|r| r.pr_state != PrState::Closed)
            .collect();
        if live.is_empty() {
            // Only closed attempts; the task reverts to pending for retry.
            continue;
        }
        live.sort_by_key(|r| (r.created_at, r.pr_number));
        let picked = live[live.len() - 1];
        if live.len() > 1 {
            let prs: Vec<String> = live.iter().map(|r| format!("#{}", r.pr_number)).collect();
            warnings.push(format!(
                "task {hash} has {} overlapping non-closed executions ({}); keeping PR #{}",
                live.len(),
                prs.join(", "),
                picked.pr_number
            ));
        }
        current.insert(*hash, picked);
    }
    warnings.sort();

    let known: HashSet<&str> = tasks.iter().map(|t| t.hash_id.as_str()).collect();

    let reconciled: Vec<ReconciledTask> = tasks
        .iter()
        .map(|task| {
            let execution = current.get(task.hash_id.as_str()).copied();
            let status = if task.completed {
                // Once ticked in the spec, never re-offered.
                TaskStatus::Completed
            } else {
                match execution {
                    Some(e) if e.pr_state == PrState::Merged => TaskStatus::Completed,
                    Some(e) if e.pr_state == PrState::Open => TaskStatus::InProgress,
                    _ => TaskStatus::Pending,
                }
            };
            ReconciledTask {
                task: task.clone(),
                status,
                execution: execution.cloned(),
            }
        })
        .collect();

    let mut orphaned: Vec<OrphanedExecution> = current
        .iter()
        .filter(|(hash, _)| !known.contains(*hash))
        .map(|(hash, record)| OrphanedExecution {
            execution: (*record).clone(),
            reason: format!(
                "{} PR #{} (branch {}) references task {hash}, which is no longer in the spec",
                record.pr_state, record.pr_number, record.branch_name
            ),
        })
        .collect();
    orphaned.sort_by_key(|o| o.execution.pr_number);

    Reconciliation {
        tasks: reconciled,
        orphaned,
        warnings,
    }
}
