use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use orchestragent::app::session::{
    CreateSessionRequest, ListSessionsRequest, RemoveSessionRequest,
};
use orchestragent::app::{AppConfig, AppContext, DEFAULT_BASE_BRANCH, SessionError};
use orchestragent::git::find_git_repo_root;
use serde_json::{Value, json};
use tracing::error;
use tracing::level_filters::LevelFilter;

/// Manage isolated git worktree sessions for coding agents.
#[derive(Parser)]
#[command(name = "orchestragent", version)]
struct Cli {
    /// Path to the git repository (defaults to the repository containing the
    /// current directory).
    #[arg(long, global = true)]
    repo: Option<PathBuf>,

    /// Directory where the `SQLite` session database is created.
    #[arg(long, global = true, default_value = ".")]
    db: PathBuf,

    /// Branch to check out in the main repository when it is on an agent
    /// branch being removed.
    #[arg(
        long,
        global = true,
        env = "ORCHESTRAGENT_BASE_BRANCH",
        default_value = DEFAULT_BASE_BRANCH
    )]
    base_branch: String,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a branch, worktree, and session record for an agent.
    Create { agent_id: String },
    /// Remove an agent's worktree, branch, and session record.
    Remove { agent_id: String },
    /// List sessions, marking those whose branch is missing as orphaned.
    List {
        /// Skip checking each session's branch in git.
        #[arg(long)]
        no_reconcile: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let max_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run(cli).await {
        error!("{err}");

        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn run(cli: Cli) -> Result<(), String> {
    let repo_root = resolve_repo_root(cli.repo)?;
    let config = AppConfig::new(repo_root, cli.db).with_base_branch(cli.base_branch);
    let context = AppContext::open(config)
        .await
        .map_err(|err| format!("Failed to open session store: {err}"))?;

    let result = execute(&context, cli.command).await;
    context.shutdown().await;

    match result {
        Ok(output) => write_json(&output),
        Err(err) => {
            let kind = err.kind();
            write_json(&json!({
                "error": {
                    "kind": kind,
                    "message": err.to_string(),
                }
            }))?;

            Err(format!("{kind}: {err}"))
        }
    }
}

async fn execute(context: &AppContext, command: Command) -> Result<Value, SessionError> {
    let value = match command {
        Command::Create { agent_id } => {
            let summary = context
                .create_session()
                .execute(CreateSessionRequest { agent_id })
                .await?;

            json!(summary)
        }
        Command::Remove { agent_id } => {
            let removed = context
                .remove_session()
                .execute(RemoveSessionRequest { agent_id })
                .await?;

            json!(removed)
        }
        Command::List { no_reconcile } => {
            let sessions = context
                .list_sessions()
                .execute(ListSessionsRequest {
                    reconcile: !no_reconcile,
                })
                .await?;

            json!({ "sessions": sessions })
        }
    };

    Ok(value)
}

/// Uses the explicit `--repo` path, else the repository containing the
/// current directory, else the current directory itself.
fn resolve_repo_root(repo: Option<PathBuf>) -> Result<PathBuf, String> {
    let repo_root = match repo {
        Some(repo) => repo,
        None => {
            let current_dir = std::env::current_dir()
                .map_err(|err| format!("Failed to resolve current directory: {err}"))?;

            find_git_repo_root(&current_dir).unwrap_or(current_dir)
        }
    };

    std::fs::canonicalize(&repo_root)
        .map_err(|err| format!("Failed to resolve repository {}: {err}", repo_root.display()))
}

fn write_json(value: &Value) -> Result<(), String> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| format!("Failed to render output: {err}"))?;

    writeln!(io::stdout(), "{rendered}").map_err(|err| format!("Failed to write output: {err}"))
}
