pub mod github;

use crate::error::Result;
use crate::ident;
use crate::model::ExecutionRecord;

/// Source of execution records for a project.
///
/// Implementations hand the core already-materialized data; the engine never
/// talks to the network itself.
pub trait PullRequestStore {
    /// Fetch every execution record for the project, across open, merged,
    /// and closed PRs, ordered by creation time.
    fn list(&self, project: &str) -> Result<Vec<ExecutionRecord>>;
}

/// Vec-backed store for tests and for pre-fetched data (`--executions`).
pub struct InMemoryStore {
    records: Vec<ExecutionRecord>,
}

impl InMemoryStore {
    pub fn new(records: Vec<ExecutionRecord>) -> Self {
        Self { records }
    }
}

impl PullRequestStore for InMemoryStore {
    fn list(&self, project: &str) -> Result<Vec<ExecutionRecord>> {
        let mut records: Vec<ExecutionRecord> = self
            .records
            .iter()
            .filter(|r| {
                ident::decode_branch(&r.branch_name).is_some_and(|(p, _)| p == project)
            })
            .cloned()
            .collect();
        records.sort_by_key(|r| (r.created_at, r.pr_number));
        Ok(records)
    }
}
