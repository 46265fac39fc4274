use clap::{Parser, Subcommand};

/// claude-step: spec-driven task scheduling for AI-written pull requests
#[derive(Parser, Debug, Clone)]
#[command(name = "claude-step", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,

    /// Path to config file
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Project identifier (overrides the config file)
    #[arg(long, global = true)]
    pub project: Option<String>,

    /// Path to the spec file (overrides the config file)
    #[arg(long, global = true)]
    pub spec: Option<String>,

    /// Emit JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Decide the next task to start and the reviewer to assign
    Next {
        /// Read execution records from a JSON file instead of querying gh
        #[arg(long)]
        executions: Option<String>,
    },

    /// Show the reconciled status of every task in the spec
    Status {
        /// Read execution records from a JSON file instead of querying gh
        #[arg(long)]
        executions: Option<String>,
    },

    /// Aggregate completion, cost, and reviewer statistics
    Stats {
        /// Read execution records from a JSON file instead of querying gh
        #[arg(long)]
        executions: Option<String>,
    },
}

impl CliCommand {
    /// Path of the pre-fetched executions file, when one was given.
    pub fn executions_file(&self) -> Option<&str> {
        match self {
            CliCommand::Next { executions }
            | CliCommand::Status { executions }
            | CliCommand::Stats { executions } => executions.as_deref(),
        }
    }
}
