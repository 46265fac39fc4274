#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};

use claude_step::ident::encode_branch;
use claude_step::model::{AiOperation, ExecutionRecord, OpKind, PrState, Reviewer};

pub fn ts(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
}

pub fn reviewer(username: &str, max_open_prs: u32) -> Reviewer {
    Reviewer {
        username: username.to_string(),
        max_open_prs,
    }
}

pub fn record(
    project: &str,
    hash: &str,
    pr_number: u64,
    reviewer: &str,
    state: PrState,
    created_at: DateTime<Utc>,
) -> ExecutionRecord {
    ExecutionRecord {
        task_hash: hash.to_string(),
        pr_number,
        branch_name: encode_branch(project, hash),
        reviewer: reviewer.to_string(),
        pr_state: state,
        created_at,
        ai_operations: Vec::new(),
    }
}

pub fn operation(model: &str, cost_usd: f64) -> AiOperation {
    AiOperation {
        kind: OpKind::Create,
        model: model.to_string(),
        cost_usd,
        tokens_in: 1200,
        tokens_out: 800,
        duration_s: 35.0,
        run_id: "run-1".to_string(),
        created_at: ts(9),
    }
}

/// Serialize records the way `--executions` expects them on disk.
pub fn executions_json(records: &[ExecutionRecord]) -> String {
    serde_json::to_string_pretty(records).unwrap()
}
