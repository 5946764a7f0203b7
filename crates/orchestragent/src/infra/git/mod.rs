//! Git capability used by session workflows and its `git` CLI implementation.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

mod repo;
mod worktree;

pub use repo::find_git_repo_root;
pub use worktree::GitClient;

/// Errors from git process invocations.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to execute git {command}: {source}")]
    Spawn {
        command: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("git {command} failed: {detail}")]
    CommandFailed {
        command: &'static str,
        detail: String,
    },
    /// Git no longer knows the worktree, typically because it was already
    /// removed.
    #[error("worktree {} is not registered with git: {detail}", .path.display())]
    WorktreeMissing { path: PathBuf, detail: String },
}

/// Git mutations and queries needed to back an agent session.
///
/// Implementations must treat each call as one independent external
/// invocation; no state is held across calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GitOperations: Send + Sync {
    /// Creates `branch_name` and checks it out in a new worktree at
    /// `worktree_path`.
    async fn create_worktree(&self, worktree_path: &Path, branch_name: &str)
    -> Result<(), GitError>;

    /// Removes the worktree at `worktree_path`, discarding local changes.
    ///
    /// Returns [`GitError::WorktreeMissing`] when git does not know the path.
    async fn remove_worktree(&self, worktree_path: &Path) -> Result<(), GitError>;

    /// Returns whether a local branch with exactly this name exists.
    async fn branch_exists(&self, branch_name: &str) -> Result<bool, GitError>;

    /// Checks out `base_branch` in the main repository if it currently has
    /// `branch_name` checked out. Returns whether a checkout happened.
    async fn switch_off_branch(
        &self,
        branch_name: &str,
        base_branch: &str,
    ) -> Result<bool, GitError>;

    /// Force-deletes a local branch. A missing branch is not an error.
    async fn delete_branch(&self, branch_name: &str) -> Result<(), GitError>;
}
