use std::collections::HashMap;

use crate::model::{ExecutionRecord, PrState, Reviewer};

/// Pick the reviewer to assign next, or `None` when everyone is at capacity.
///
/// Open-PR counts are derived from the execution records on every call; there
/// is no reservation or internal state, so two overlapping runs can both get
/// an answer and the duplicate reconciles away later. Selection is the first
/// reviewer in configured order with spare capacity (deterministic, not a
/// load balancer). A full roster is an expected state, not an error.
pub fn select_reviewer<'a>(
    reviewers: &'a [Reviewer],
    in_progress: &[ExecutionRecord],
) -> Option<&'a Reviewer> {
    let mut open_counts: HashMap<&str, u32> = HashMap::new();
    for record in in_progress {
        if record.pr_state == PrState::Open {
            *open_counts.entry(record.reviewer.as_str()).or_insert(0) += 1;
        }
    }

    reviewers.iter().find(|r| {
        let open = open_counts.get(r.username.as_str()).copied().unwrap_or(0);
        open < r.max_open_prs
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn reviewer(username: &str, max_open_prs: u32) -> Reviewer {
        Reviewer {
            username: username.to_string(),
            max_open_prs,
        }
    }

    fn open_pr(reviewer: &str, pr_number: u64) -> ExecutionRecord {
        ExecutionRecord {
            task_hash: format!("{pr_number:08x}"),
            pr_number,
            branch_name: format!("claude-step-demo-{pr_number:08x}"),
            reviewer: reviewer.to_string(),
            pr_state: PrState::Open,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
            ai_operations: Vec::new(),
        }
    }

    #[test]
    fn test_selects_first_with_spare_capacity() {
        let reviewers = vec![reviewer("alice", 2), reviewer("bob", 2)];
        let selected = select_reviewer(&reviewers, &[]).unwrap();
        assert_eq!(selected.username, "alice");
    }

    #[test]
    fn test_skips_full_reviewer() {
        let reviewers = vec![reviewer("alice", 1), reviewer("bob", 2)];
        let in_progress = vec![open_pr("alice", 1)];
        let selected = select_reviewer(&reviewers, &in_progress).unwrap();
        assert_eq!(selected.username, "bob");
    }

    #[test]
    fn test_capacity_boundary() {
        // Accepts at N-1 open, rejects at N open.
        let reviewers = vec![reviewer("alice", 2)];
        let one_open = vec![open_pr("alice", 1)];
        assert_eq!(
            select_reviewer(&reviewers, &one_open).unwrap().username,
            "alice"
        );
        let two_open = vec![open_pr("alice", 1), open_pr("alice", 2)];
        assert!(select_reviewer(&reviewers, &two_open).is_none());
    }

    #[test]
    fn test_all_at_capacity_returns_none() {
        let reviewers = vec![reviewer("alice", 1), reviewer("bob", 1)];
        let in_progress = vec![open_pr("alice", 1), open_pr("bob", 2)];
        assert!(select_reviewer(&reviewers, &in_progress).is_none());
    }

    #[test]
    fn test_zero_max_is_permanently_at_capacity() {
        let reviewers = vec![reviewer("alice", 0), reviewer("bob", 1)];
        let selected = select_reviewer(&reviewers, &[]).unwrap();
        assert_eq!(selected.username, "bob");

        let only_alice = vec![reviewer("alice", 0)];
        assert!(select_reviewer(&only_alice, &[]).is_none());
    }

    #[test]
    fn test_merged_and_closed_do_not_count() {
        let reviewers = vec![reviewer("alice", 1)];
        let mut merged = open_pr("alice", 1);
        merged.pr_state = PrState::Merged;
        let mut closed = open_pr("alice", 2);
        closed.pr_state = PrState::Closed;
        let selected = select_reviewer(&reviewers, &[merged, closed]).unwrap();
        assert_eq!(selected.username, "alice");
    }

    #[test]
    fn test_empty_roster_returns_none() {
        assert!(select_reviewer(&[], &[]).is_none());
    }
}
