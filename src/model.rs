use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One checklist item from the spec file.
///
/// Identity is the content hash, not the ordinal: ordinals shift whenever the
/// backlog is edited or reordered, while the hash stays attached to the same
/// logical task across readings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// 1-based position in the spec document.
    pub ordinal: usize,
    /// Checklist text, verbatim (including inline markdown).
    pub description: String,
    /// First 8 hex chars of the SHA-256 of the trimmed description.
    pub hash_id: String,
    /// Checkbox state in the spec file.
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    Open,
    Merged,
    Closed,
}

impl fmt::Display for PrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrState::Open => write!(f, "open"),
            PrState::Merged => write!(f, "merged"),
            PrState::Closed => write!(f, "closed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Create,
    Refine,
    Summarize,
}

/// One AI invocation attached to an execution. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiOperation {
    pub kind: OpKind,
    pub model: String,
    pub cost_usd: f64,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub duration_s: f64,
    pub run_id: String,
    pub created_at: DateTime<Utc>,
}

/// One pull-request attempt at a task. Never mutated; a retry after a
/// close-without-merge shows up as a fresh record with a later `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub task_hash: String,
    pub pr_number: u64,
    pub branch_name: String,
    /// Assigned reviewer username; empty when unassigned.
    pub reviewer: String,
    pub pr_state: PrState,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub ai_operations: Vec<AiOperation>,
}

/// A reviewer and their concurrent-open-PR ceiling.
///
/// `max_open_prs = 0` keeps the reviewer in the roster but never selects them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reviewer {
    pub username: String,
    pub max_open_prs: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::InProgress => write!(f, "in-progress"),
            TaskStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Derived per-task view after reconciling spec and PR data. Not stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciledTask {
    pub task: Task,
    pub status: TaskStatus,
    /// Current (most recent non-closed) execution, when one exists.
    pub execution: Option<ExecutionRecord>,
}

/// Everything known about one project, as handed to the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectState {
    pub project: String,
    pub tasks: Vec<Task>,
    pub executions: Vec<ExecutionRecord>,
}
