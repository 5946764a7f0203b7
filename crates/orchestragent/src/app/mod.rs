//! App-layer composition root and session use cases.
//!
//! [`AppContext`] owns the process-wide resources (session database and git
//! client for one repository) and hands them to the use cases it builds.
//! Call [`AppContext::shutdown`] before exiting so the database is closed
//! cleanly.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::infra::db::{self, Database, RepositoryError};
use crate::infra::git::GitClient;

pub mod error;
pub mod session;

pub use error::{ErrorKind, SessionError};
use session::{CreateSessionUseCase, ListSessionsUseCase, RemoveSessionUseCase};

/// Branch used when no base branch is configured.
pub const DEFAULT_BASE_BRANCH: &str = "main";

/// Settings needed to open an [`AppContext`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AppConfig {
    pub base_branch: String,
    /// Directory holding the session database file.
    pub database_dir: PathBuf,
    /// Root of the git repository that owns the agent worktrees.
    pub repo_root: PathBuf,
}

impl AppConfig {
    pub fn new(repo_root: impl Into<PathBuf>, database_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_branch: DEFAULT_BASE_BRANCH.to_string(),
            database_dir: database_dir.into(),
            repo_root: repo_root.into(),
        }
    }

    #[must_use]
    pub fn with_base_branch(mut self, base_branch: impl Into<String>) -> Self {
        self.base_branch = base_branch.into();

        self
    }
}

/// Explicitly owned process context shared by all use cases.
pub struct AppContext {
    config: AppConfig,
    db: Arc<Database>,
    git: Arc<GitClient>,
}

impl AppContext {
    /// Resolves and opens the session database and prepares the git client.
    ///
    /// # Errors
    /// Returns an error if the database path cannot be prepared or the
    /// database cannot be opened.
    pub async fn open(config: AppConfig) -> Result<Self, RepositoryError> {
        let db_path = db::resolve_database_path(&config.database_dir)?;
        let db = Database::open(&db_path).await?;
        info!(
            repo_root = %config.repo_root.display(),
            database = %db_path.display(),
            "session store opened"
        );

        Ok(Self {
            git: Arc::new(GitClient::new(config.repo_root.clone())),
            db: Arc::new(db),
            config,
        })
    }

    pub fn repo_root(&self) -> &Path {
        &self.config.repo_root
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn git(&self) -> &GitClient {
        &self.git
    }

    pub fn create_session(&self) -> CreateSessionUseCase<GitClient, Database> {
        CreateSessionUseCase::new(
            Arc::clone(&self.git),
            Arc::clone(&self.db),
            self.config.repo_root.clone(),
        )
    }

    pub fn remove_session(&self) -> RemoveSessionUseCase<GitClient, Database> {
        RemoveSessionUseCase::new(
            Arc::clone(&self.git),
            Arc::clone(&self.db),
            self.config.base_branch.clone(),
        )
    }

    pub fn list_sessions(&self) -> ListSessionsUseCase<GitClient, Database> {
        ListSessionsUseCase::new(Arc::clone(&self.git), Arc::clone(&self.db))
    }

    /// Closes the session database. Use cases built from this context stop
    /// working afterwards.
    pub async fn shutdown(self) {
        self.db.close().await;
        info!("session store closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_base_branch() {
        // Arrange & Act
        let config = AppConfig::new("/repo", "/data");

        // Assert
        assert_eq!(config.base_branch, DEFAULT_BASE_BRANCH);
        assert_eq!(
            config.with_base_branch("develop").base_branch,
            "develop".to_string()
        );
    }

    #[tokio::test]
    async fn test_open_creates_database_in_configured_dir() {
        // Arrange
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let database_dir = dir.path().join("state");
        let config = AppConfig::new(dir.path(), &database_dir);

        // Act
        let context = AppContext::open(config).await.expect("failed to open");

        // Assert
        assert!(database_dir.join(db::DB_FILE).exists());
        assert_eq!(context.repo_root(), dir.path());
        assert_eq!(context.git().repo_root(), dir.path());
        context.shutdown().await;
    }
}
