use std::process::Command;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::ident;
use crate::model::{AiOperation, ExecutionRecord, PrState};

use super::PullRequestStore;

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;

/// Marker preceding the fenced JSON metadata block in a PR body.
pub const META_MARKER: &str = "<!-- claude-step-meta -->";

/// Abstraction over `gh` CLI execution for testability.
pub trait GhClient {
    fn run(&self, args: &[&str]) -> Result<String>;
}

/// Real `gh` CLI client with retry and exponential backoff.
struct DefaultGhClient;

impl GhClient for DefaultGhClient {
    fn run(&self, args: &[&str]) -> Result<String> {
        retry_with_backoff(|| {
            let output = Command::new("gh")
                .args(args)
                .output()
                .map_err(|e| Error::PrStore(format!("failed to run gh: {e}")))?;

            if output.status.success() {
                String::from_utf8(output.stdout)
                    .map_err(|e| Error::PrStore(format!("invalid utf8 from gh: {e}")))
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(Error::PrStore(format!("gh failed: {stderr}")))
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct GhAssignee {
    login: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhPullRequest {
    number: u64,
    head_ref_name: String,
    #[serde(default)]
    assignees: Vec<GhAssignee>,
    state: String,
    created_at: DateTime<Utc>,
    body: Option<String>,
}

/// `PullRequestStore` backed by the `gh` CLI.
pub struct GitHubPrStore {
    client: Box<dyn GhClient>,
}

impl GitHubPrStore {
    pub fn new() -> Self {
        Self {
            client: Box::new(DefaultGhClient),
        }
    }

    #[cfg(test)]
    fn with_client(client: Box<dyn GhClient>) -> Self {
        Self { client }
    }

    /// Map one `gh` PR into an execution record.
    ///
    /// Returns `None` for PRs this tool does not own: branches that do not
    /// decode, branches for other projects, and unrecognized lifecycle
    /// states.
    fn parse_pr(project: &str, pr: GhPullRequest) -> Option<ExecutionRecord> {
        let (branch_project, task_hash) = match ident::decode_branch(&pr.head_ref_name) {
            Some(decoded) => decoded,
            None => {
                debug!(pr = pr.number, branch = pr.head_ref_name, "skipping unrelated branch");
                return None;
            }
        };
        if branch_project != project {
            return None;
        }

        let pr_state = match pr.state.as_str() {
            "OPEN" => PrState::Open,
            "MERGED" => PrState::Merged,
            "CLOSED" => PrState::Closed,
            other => {
                warn!(pr = pr.number, state = other, "unrecognized PR state, skipping");
                return None;
            }
        };

        let reviewer = pr
            .assignees
            .first()
            .map(|a| a.login.clone())
            .unwrap_or_default();
        let ai_operations = pr
            .body
            .as_deref()
            .map(parse_meta_operations)
            .unwrap_or_default();

        Some(ExecutionRecord {
            task_hash,
            pr_number: pr.number,
            branch_name: pr.head_ref_name,
            reviewer,
            pr_state,
            created_at: pr.created_at,
            ai_operations,
        })
    }
}

impl Default for GitHubPrStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PullRequestStore for GitHubPrStore {
    fn list(&self, project: &str) -> Result<Vec<ExecutionRecord>> {
        let json = self.client.run(&[
            "pr",
            "list",
            "--state",
            "all",
            "--limit",
            "200",
            "--json",
            "number,headRefName,assignees,state,createdAt,body",
        ])?;

        let prs: Vec<GhPullRequest> = serde_json::from_str(&json)
            .map_err(|e| Error::PrStore(format!("failed to parse gh output: {e}")))?;

        let mut records: Vec<ExecutionRecord> = prs
            .into_iter()
            .filter_map(|pr| Self::parse_pr(project, pr))
            .collect();
        records.sort_by_key(|r| (r.created_at, r.pr_number));

        debug!(count = records.len(), project, "fetched execution records");
        Ok(records)
    }
}

/// Extract AI operation metadata from a PR body.
///
/// Looks for the `<!-- claude-step-meta -->` marker followed by a fenced
/// JSON block holding an array of operations. Anything malformed or missing
/// degrades to an empty list; cost data is best-effort.
pub fn parse_meta_operations(body: &str) -> Vec<AiOperation> {
    let Some(marker_pos) = body.find(META_MARKER) else {
        return Vec::new();
    };
    let after = &body[marker_pos + META_MARKER.len()..];

    let Some(fence_pos) = after.find("```json") else {
        warn!("metadata marker without a json block in PR body");
        return Vec::new();
    };
    let json_start = fence_pos + "```json".len();
    let Some(fence_end) = after[json_start..].find("```") else {
        warn!("unterminated metadata block in PR body");
        return Vec::new();
    };

    match serde_json::from_str(&after[json_start..json_start + fence_end]) {
        Ok(ops) => ops,
        Err(e) => {
            warn!(error = %e, "failed to parse PR metadata block");
            Vec::new()
        }
    }
}

fn retry_with_backoff<F, T>(f: F) -> Result<T>
where
    F: Fn() -> Result<T>,
{
    retry_with_backoff_ms(f, INITIAL_BACKOFF_MS, MAX_RETRIES)
}

fn retry_with_backoff_ms<F, T>(f: F, initial_backoff_ms: u64, max_retries: u32) -> Result<T>
where
    F: Fn() -> Result<T>,
{
    let mut backoff_ms = initial_backoff_ms;

    for attempt in 1..=max_retries {
        match f() {
            Ok(val) => return Ok(val),
            Err(e) if attempt < max_retries => {
                warn!(attempt, error = %e, backoff_ms, "retrying after transient error");
                thread::sleep(Duration::from_millis(backoff_ms));
                backoff_ms *= 2;
            }
            Err(e) => return Err(e),
        }
    }

    unreachable!()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct MockGhClient {
        responses: RefCell<Vec<Result<String>>>,
    }

    impl MockGhClient {
        fn new(responses: Vec<Result<String>>) -> Self {
            Self {
                responses: RefCell::new(responses),
            }
        }
    }

    impl GhClient for MockGhClient {
        fn run(&self, _args: &[&str]) -> Result<String> {
            let mut responses = self.responses.borrow_mut();
            if responses.is_empty() {
                Err(Error::PrStore("no more mock responses".to_string()))
            } else {
                responses.remove(0)
            }
        }
    }

    fn pr_json(
        number: u64,
        branch: &str,
        assignee: Option<&str>,
        state: &str,
        body: &str,
    ) -> serde_json::Value {
        let assignees: Vec<serde_json::Value> = assignee
            .into_iter()
            .map(|login| serde_json::json!({"login": login}))
            .collect();
        serde_json::json!({
            "number": number,
            "headRefName": branch,
            "assignees": assignees,
            "state": state,
            "createdAt": "2024-05-01T09:00:00Z",
            "body": body,
        })
    }

    fn mock_prs_json(prs: &[serde_json::Value]) -> String {
        serde_json::to_string(prs).unwrap()
    }

    #[test]
    fn test_list_decodes_owned_branches() {
        let json = mock_prs_json(&[
            pr_json(1, "claude-step-demo-a1b2c3d4", Some("alice"), "OPEN", ""),
            pr_json(2, "claude-step-demo-deadbeef", Some("bob"), "MERGED", ""),
        ]);
        let store = GitHubPrStore::with_client(Box::new(MockGhClient::new(vec![Ok(json)])));
        let records = store.list("demo").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].task_hash, "a1b2c3d4");
        assert_eq!(records[0].reviewer, "alice");
        assert_eq!(records[0].pr_state, PrState::Open);
        assert_eq!(records[1].pr_state, PrState::Merged);
    }

    #[test]
    fn test_list_skips_unrelated_and_foreign_branches() {
        let json = mock_prs_json(&[
            pr_json(1, "main", Some("alice"), "OPEN", ""),
            pr_json(2, "feature/login", None, "OPEN", ""),
            pr_json(3, "claude-step-other-a1b2c3d4", Some("bob"), "OPEN", ""),
            pr_json(4, "claude-step-demo-a1b2c3d4", Some("alice"), "OPEN", ""),
        ]);
        let store = GitHubPrStore::with_client(Box::new(MockGhClient::new(vec![Ok(json)])));
        let records = store.list("demo").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pr_number, 4);
    }

    #[test]
    fn test_list_unassigned_pr_has_empty_reviewer() {
        let json = mock_prs_json(&[pr_json(1, "claude-step-demo-a1b2c3d4", None, "OPEN", "")]);
        let store = GitHubPrStore::with_client(Box::new(MockGhClient::new(vec![Ok(json)])));
        let records = store.list("demo").unwrap();
        assert_eq!(records[0].reviewer, "");
    }

    #[test]
    fn test_list_skips_unrecognized_state() {
        let json = mock_prs_json(&[
            pr_json(1, "claude-step-demo-a1b2c3d4", Some("alice"), "DRAFT", ""),
            pr_json(2, "claude-step-demo-deadbeef", Some("alice"), "CLOSED", ""),
        ]);
        let store = GitHubPrStore::with_client(Box::new(MockGhClient::new(vec![Ok(json)])));
        let records = store.list("demo").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pr_state, PrState::Closed);
    }

    #[test]
    fn test_list_error_propagated() {
        let store = GitHubPrStore::with_client(Box::new(MockGhClient::new(vec![Err(
            Error::PrStore("gh not found".to_string()),
        )])));
        let err = store.list("demo").unwrap_err();
        assert!(err.to_string().contains("gh not found"));
    }

    #[test]
    fn test_list_parses_metadata_from_body() {
        let body = format!(
            "Automated implementation.\n\n{META_MARKER}\n```json\n[{{\"kind\":\"create\",\"model\":\"sonnet\",\"cost_usd\":0.12,\"tokens_in\":1000,\"tokens_out\":500,\"duration_s\":42.0,\"run_id\":\"run-1\",\"created_at\":\"2024-05-01T09:00:00Z\"}}]\n```\n"
        );
        let json = mock_prs_json(&[pr_json(
            1,
            "claude-step-demo-a1b2c3d4",
            Some("alice"),
            "MERGED",
            &body,
        )]);
        let store = GitHubPrStore::with_client(Box::new(MockGhClient::new(vec![Ok(json)])));
        let records = store.list("demo").unwrap();
        assert_eq!(records[0].ai_operations.len(), 1);
        let op = &records[0].ai_operations[0];
        assert_eq!(op.model, "sonnet");
        assert!((op.cost_usd - 0.12).abs() < 1e-9);
    }

    // --- metadata parsing ---

    #[test]
    fn test_parse_meta_absent_marker() {
        assert!(parse_meta_operations("just a normal PR body").is_empty());
    }

    #[test]
    fn test_parse_meta_marker_without_block() {
        let body = format!("{META_MARKER}\nno fence here");
        assert!(parse_meta_operations(&body).is_empty());
    }

    #[test]
    fn test_parse_meta_unterminated_block() {
        let body = format!("{META_MARKER}\n```json\n[]");
        assert!(parse_meta_operations(&body).is_empty());
    }

    #[test]
    fn test_parse_meta_invalid_json_degrades_to_empty() {
        let body = format!("{META_MARKER}\n```json\nnot json\n```");
        assert!(parse_meta_operations(&body).is_empty());
    }

    #[test]
    fn test_parse_meta_empty_array() {
        let body = format!("{META_MARKER}\n```json\n[]\n```");
        assert!(parse_meta_operations(&body).is_empty());
    }

    // --- retry ---

    #[test]
    fn test_retry_succeeds_after_transient_failure() {
        let attempts = RefCell::new(0);
        let result = retry_with_backoff_ms(
            || {
                *attempts.borrow_mut() += 1;
                if *attempts.borrow() < 3 {
                    Err(Error::PrStore("transient".to_string()))
                } else {
                    Ok("done".to_string())
                }
            },
            1,
            3,
        );
        assert_eq!(result.unwrap(), "done");
        assert_eq!(*attempts.borrow(), 3);
    }

    #[test]
    fn test_retry_gives_up_after_max_attempts() {
        let attempts = RefCell::new(0);
        let result: Result<String> = retry_with_backoff_ms(
            || {
                *attempts.borrow_mut() += 1;
                Err(Error::PrStore("persistent".to_string()))
            },
            1,
            3,
        );
        assert!(result.is_err());
        assert_eq!(*attempts.borrow(), 3);
    }
}
