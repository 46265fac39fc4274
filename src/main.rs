use clap::Parser;
use tracing::{info, warn};

use claude_step::cli::{Cli, CliCommand};
use claude_step::config::Config;
use claude_step::error::{Error, Result};
use claude_step::model::{ExecutionRecord, ProjectState, Task};
use claude_step::reconcile::{Reconciliation, reconcile};
use claude_step::scheduler::{Decision, start_next};
use claude_step::spec;
use claude_step::stats;
use claude_step::store::github::GitHubPrStore;
use claude_step::store::{InMemoryStore, PullRequestStore};

fn init_logging() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = Config::load(cli)?;
    info!(
        project = config.project,
        spec_file = config.spec_file,
        reviewers = config.reviewers.len(),
        "config loaded"
    );

    let spec_text = std::fs::read_to_string(&config.spec_file).map_err(|e| {
        Error::Spec(format!("failed to read spec file {}: {e}", config.spec_file))
    })?;
    let tasks = spec::parse(&spec_text);
    info!(count = tasks.len(), "parsed spec tasks");

    let executions = load_executions(&config.project, cli.command.executions_file())?;
    info!(count = executions.len(), "loaded execution records");

    match &cli.command {
        CliCommand::Next { .. } => cmd_next(cli, &config, &tasks, &executions),
        CliCommand::Status { .. } => cmd_status(cli, &tasks, &executions),
        CliCommand::Stats { .. } => cmd_stats(cli, &config, &tasks, &executions),
    }
}

/// Build the store (pre-fetched file or live `gh`) and fetch the project's
/// execution records.
fn load_executions(project: &str, executions_file: Option<&str>) -> Result<Vec<ExecutionRecord>> {
    let store: Box<dyn PullRequestStore> = match executions_file {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|e| {
                Error::PrStore(format!("failed to read executions file {path}: {e}"))
            })?;
            let records: Vec<ExecutionRecord> = serde_json::from_str(&content).map_err(|e| {
                Error::PrStore(format!("failed to parse executions file {path}: {e}"))
            })?;
            Box::new(InMemoryStore::new(records))
        }
        None => Box::new(GitHubPrStore::new()),
    };
    store.list(project)
}

fn log_inconsistencies(recon: &Reconciliation) {
    for orphan in &recon.orphaned {
        warn!(pr = orphan.execution.pr_number, "{}", orphan.reason);
    }
    for warning in &recon.warnings {
        warn!("{warning}");
    }
}

fn cmd_next(
    cli: &Cli,
    config: &Config,
    tasks: &[Task],
    executions: &[ExecutionRecord],
) -> Result<()> {
    let recon = reconcile(tasks, executions);
    log_inconsistencies(&recon);

    let decision = start_next(tasks, executions, &config.reviewers);
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
        return Ok(());
    }

    match &decision {
        Decision::Start {
            task_hash,
            ordinal,
            description,
            reviewer,
        } => {
            println!("start: task {task_hash} (#{ordinal}) -> {reviewer}");
            println!("  {description}");
        }
        Decision::Blocked { reason } => println!("blocked: {reason}"),
    }
    Ok(())
}

fn cmd_status(cli: &Cli, tasks: &[Task], executions: &[ExecutionRecord]) -> Result<()> {
    let recon = reconcile(tasks, executions);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&recon)?);
        return Ok(());
    }

    for rt in &recon.tasks {
        match &rt.execution {
            Some(e) => println!(
                "[{}] #{} {} {} (PR #{}, {})",
                rt.status, rt.task.ordinal, rt.task.hash_id, rt.task.description, e.pr_number, e.pr_state
            ),
            None => println!(
                "[{}] #{} {} {}",
                rt.status, rt.task.ordinal, rt.task.hash_id, rt.task.description
            ),
        }
    }
    for orphan in &recon.orphaned {
        println!("orphaned: {}", orphan.reason);
    }
    for warning in &recon.warnings {
        println!("warning: {warning}");
    }
    Ok(())
}

fn cmd_stats(
    cli: &Cli,
    config: &Config,
    tasks: &[Task],
    executions: &[ExecutionRecord],
) -> Result<()> {
    let state = ProjectState {
        project: config.project.clone(),
        tasks: tasks.to_vec(),
        executions: executions.to_vec(),
    };
    let report = stats::aggregate(std::slice::from_ref(&state));

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "tasks: {}/{} completed ({:.1}%)",
        report.completed_tasks, report.total_tasks, report.completion_pct
    );
    println!("total cost: ${:.2}", report.total_cost_usd);
    for (model, cost) in &report.cost_by_model {
        println!("  {model}: ${cost:.2}");
    }
    if !report.leaderboard.is_empty() {
        println!("reviewers:");
        for r in &report.leaderboard {
            println!("  {}: {} merged, {} open", r.username, r.merged, r.open);
        }
    }
    for orphan in &report.orphaned {
        println!("orphaned: {orphan}");
    }
    Ok(())
}
