//! claude-step: task identification and state reconciliation for an
//! AI-assisted delivery loop.
//!
//! A per-project spec file holds an ordered checklist of tasks; each task is
//! worked as a single pull request on a `claude-step-{project}-{hash}` branch.
//! The engine reads both sides (spec file, PR set), reconciles them into a
//! per-task status, and decides which task to start next and which reviewer
//! has capacity to take it. The core is pure and synchronous; all I/O lives
//! in the binary and the PR store adapter.

pub mod capacity;
pub mod cli;
pub mod config;
pub mod error;
pub mod ident;
pub mod model;
pub mod reconcile;
pub mod scheduler;
pub mod spec;
pub mod stats;
pub mod store;
