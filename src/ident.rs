use regex::Regex;
use sha2::{Digest, Sha256};

/// Prefix shared by every branch this tool owns.
pub const BRANCH_PREFIX: &str = "claude-step-";

/// Derive the stable 8-hex-char identifier for a task description.
///
/// SHA-256 of the whitespace-trimmed text, truncated to the first 4 bytes.
/// Deterministic across runs; identical descriptions collide by design.
pub fn task_hash(description: &str) -> String {
    let digest = Sha256::digest(description.trim().as_bytes());
    digest.iter().take(4).map(|b| format!("{b:02x}")).collect()
}

/// Build the branch name for a task: `claude-step-{project}-{hash_id}`.
pub fn encode_branch(project: &str, hash_id: &str) -> String {
    format!("{BRANCH_PREFIX}{project}-{hash_id}")
}

/// Parse a branch name back into `(project, hash_id)`.
///
/// Returns `None` for anything that is not a well-formed claude-step branch;
/// observed branches are routinely unrelated. The hash is anchored at the end
/// of the name so hyphenated project names parse unambiguously.
pub fn decode_branch(branch: &str) -> Option<(String, String)> {
    let re = Regex::new(r"^claude-step-([a-z0-9-]+)-([0-9a-f]{8})$").unwrap();
    let caps = re.captures(branch)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}
