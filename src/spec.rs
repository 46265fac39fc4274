use regex::Regex;

use crate::ident;
use crate::model::Task;

/// Parse a spec document into its ordered task list.
///
/// Recognizes GitHub-style checklist items (`- [ ]` / `- [x]`, `*` bullets
/// also accepted) in document order; prose, headings, blank lines, and code
/// blocks are ignored. Ordinals are 1-based document positions.
/// A document with no checklist items yields an empty list, which is a valid
/// (empty) backlog, not an error.
pub fn parse(markdown: &str) -> Vec<Task> {
    let item_re = Regex::new(r"^\s*[-*] \[([ xX])\] (.*)$").unwrap();

    let mut tasks = Vec::new();
    for line in markdown.lines() {
        let Some(caps) = item_re.captures(line) else {
            continue;
        };
        let description = caps[2].trim().to_string();
        if description.is_empty() {
            continue;
        }
        let hash_id = ident::task_hash(&description);
        tasks.push(Task {
            ordinal: tasks.len() + 1,
            hash_id,
            completed: &caps[1] != " ",
            description,
        });
    }
    tasks
}
