//! Database layer for persisting agent sessions using `SQLite` via `SQLx`.
//!
//! # Database Maintenance Guide
//!
//! ## Adding or changing a table
//! 1. Create a new migration file in `crates/orchestragent/migrations/` with
//!    the next sequence number (e.g., `002_add_base_branch.sql`).
//! 2. Write the `CREATE TABLE` / `ALTER TABLE` statements in that file.
//! 3. Update the query strings and [`agent_from_row`] accordingly.
//! 4. The migration runs automatically on the next launch via
//!    [`Database::open`].
//!
//! ## Migration versioning
//! - Migrations are embedded at compile time via `sqlx::migrate!()`.
//! - Files must be named `NNN_description.sql` with a monotonically increasing
//!   prefix.
//! - `SQLx` tracks applied migrations in the `_sqlx_migrations` table.
//!
//! ## Uniqueness
//! `agent_session.agent_id` carries a `UNIQUE` constraint. Two concurrent
//! saves for the same agent cannot both succeed; the loser receives
//! [`RepositoryError::Duplicate`].

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use thiserror::Error;

use crate::domain::agent::{Agent, AgentId, AgentStatus};

/// File name of the session database inside the configured directory.
pub const DB_FILE: &str = ".orchestragent.db";

/// Errors from the session store.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("agent `{agent_id}` is already stored")]
    Duplicate { agent_id: String },
    #[error("failed to prepare database directory {}: {source}", .path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("failed to run migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("failed to {operation}: {source}")]
    Query {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[error("stored session `{agent_id}` is invalid: {reason}")]
    InvalidRow { agent_id: String, reason: String },
}

impl RepositoryError {
    fn query(operation: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| Self::Query { operation, source }
    }
}

/// Durable store of agent session records keyed by normalized agent ID.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Inserts a new record.
    ///
    /// Returns [`RepositoryError::Duplicate`] when the agent is already
    /// stored.
    async fn save(&self, agent: &Agent) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, agent_id: &AgentId) -> Result<Option<Agent>, RepositoryError>;

    async fn exists(&self, agent_id: &AgentId) -> Result<bool, RepositoryError>;

    /// Returns all records in insertion order.
    async fn list(&self) -> Result<Vec<Agent>, RepositoryError>;

    /// Deletes a record and returns whether one was removed.
    async fn delete(&self, agent_id: &AgentId) -> Result<bool, RepositoryError>;
}

/// `SQLite`-backed [`SessionRepository`].
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating when missing) the database file and applies pending
    /// migrations.
    ///
    /// # Errors
    /// Returns an error if the parent directory cannot be created, the
    /// connection fails, or a migration fails.
    pub async fn open(db_path: &Path) -> Result<Self, RepositoryError> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| RepositoryError::Directory {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        Self::connect(options).await
    }

    /// Closes every pooled connection. Further queries fail.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn connect(options: SqliteConnectOptions) -> Result<Self, RepositoryError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(RepositoryError::Connect)?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }
}

#[cfg(test)]
impl Database {
    pub(crate) async fn open_in_memory() -> Result<Self, RepositoryError> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        Self::connect(options).await
    }
}

#[async_trait]
impl SessionRepository for Database {
    async fn save(&self, agent: &Agent) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO agent_session (agent_id, worktree_path, branch_name, status) VALUES (?, \
             ?, ?, ?)",
        )
        .bind(agent.id().as_str())
        .bind(agent.worktree_path().to_string_lossy().into_owned())
        .bind(agent.branch_name())
        .bind(agent.status().as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(error)) if error.is_unique_violation() => {
                Err(RepositoryError::Duplicate {
                    agent_id: agent.id().to_string(),
                })
            }
            Err(source) => Err(RepositoryError::Query {
                operation: "insert agent session",
                source,
            }),
        }
    }

    async fn find_by_id(&self, agent_id: &AgentId) -> Result<Option<Agent>, RepositoryError> {
        let row = sqlx::query(
            "SELECT agent_id, worktree_path, branch_name, status FROM agent_session WHERE \
             agent_id = ?",
        )
        .bind(agent_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::query("load agent session"))?;

        row.as_ref().map(agent_from_row).transpose()
    }

    async fn exists(&self, agent_id: &AgentId) -> Result<bool, RepositoryError> {
        let row = sqlx::query("SELECT 1 FROM agent_session WHERE agent_id = ?")
            .bind(agent_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::query("check agent session"))?;

        Ok(row.is_some())
    }

    async fn list(&self) -> Result<Vec<Agent>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT agent_id, worktree_path, branch_name, status FROM agent_session ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::query("list agent sessions"))?;

        rows.iter().map(agent_from_row).collect()
    }

    async fn delete(&self, agent_id: &AgentId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM agent_session WHERE agent_id = ?")
            .bind(agent_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::query("delete agent session"))?;

        Ok(result.rows_affected() > 0)
    }
}

/// Resolves the database file path inside `database_dir`.
///
/// An empty directory means the current working directory; relative
/// directories are resolved against it. The directory itself is created by
/// [`Database::open`].
///
/// # Errors
/// Returns an error if the current directory cannot be read.
pub fn resolve_database_path(database_dir: &Path) -> Result<PathBuf, RepositoryError> {
    let base_dir = if database_dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        database_dir
    };

    if base_dir.is_absolute() {
        return Ok(base_dir.join(DB_FILE));
    }

    let current_dir = std::env::current_dir().map_err(|source| RepositoryError::Directory {
        path: base_dir.to_path_buf(),
        source,
    })?;

    Ok(current_dir.join(base_dir).join(DB_FILE))
}

/// Converts a stored row into an [`Agent`], rejecting rows whose branch
/// does not match the one derived from the identifier.
fn agent_from_row(row: &SqliteRow) -> Result<Agent, RepositoryError> {
    let raw_id: String = row.get("agent_id");
    let worktree_path: String = row.get("worktree_path");
    let branch_name: String = row.get("branch_name");
    let status: String = row.get("status");

    let invalid = |reason: String| RepositoryError::InvalidRow {
        agent_id: raw_id.clone(),
        reason,
    };

    let agent_id = AgentId::new(&raw_id).map_err(|error| invalid(error.to_string()))?;
    let status = status.parse::<AgentStatus>().map_err(invalid)?;
    if branch_name != agent_id.branch_name() {
        return Err(invalid(format!(
            "branch `{branch_name}` does not match `{}`",
            agent_id.branch_name()
        )));
    }

    Ok(Agent::from_parts(
        agent_id,
        PathBuf::from(worktree_path),
        status,
    ))
}
