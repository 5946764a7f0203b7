use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::repo::{command_output_detail, is_missing_branch_detail, is_missing_worktree_detail};
use super::{GitError, GitOperations};

/// [`GitOperations`] backed by the `git` executable, run inside `repo_root`.
///
/// Child processes are killed when the awaiting future is dropped, so a
/// cancelled caller does not leave git running in the background.
#[derive(Clone, Debug)]
pub struct GitClient {
    repo_root: PathBuf,
}

impl GitClient {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
        }
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    async fn run(&self, command: &'static str, args: &[&OsStr]) -> Result<Output, GitError> {
        debug!(command, repo_root = %self.repo_root.display(), "running git");

        Command::new("git")
            .args(args)
            .current_dir(&self.repo_root)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| GitError::Spawn { command, source })
    }

    /// Drops stale worktree registrations so their branches can be deleted.
    async fn prune_worktrees(&self) {
        let args = [OsStr::new("worktree"), OsStr::new("prune")];
        match self.run("worktree prune", &args).await {
            Ok(output) if output.status.success() => {}
            Ok(output) => {
                let detail = command_output_detail(&output.stdout, &output.stderr);
                warn!(%detail, "git worktree prune failed");
            }
            Err(error) => warn!(%error, "git worktree prune failed"),
        }
    }
}

#[async_trait]
impl GitOperations for GitClient {
    async fn create_worktree(
        &self,
        worktree_path: &Path,
        branch_name: &str,
    ) -> Result<(), GitError> {
        let args = [
            OsStr::new("worktree"),
            OsStr::new("add"),
            OsStr::new("-b"),
            OsStr::new(branch_name),
            worktree_path.as_os_str(),
        ];
        let output = self.run("worktree add", &args).await?;
        if !output.status.success() {
            return Err(GitError::CommandFailed {
                command: "worktree add",
                detail: command_output_detail(&output.stdout, &output.stderr),
            });
        }

        Ok(())
    }

    async fn remove_worktree(&self, worktree_path: &Path) -> Result<(), GitError> {
        let args = [
            OsStr::new("worktree"),
            OsStr::new("remove"),
            OsStr::new("--force"),
            worktree_path.as_os_str(),
        ];
        let output = self.run("worktree remove", &args).await?;
        if output.status.success() {
            return Ok(());
        }

        let detail = command_output_detail(&output.stdout, &output.stderr);
        if is_missing_worktree_detail(&detail) {
            self.prune_worktrees().await;

            return Err(GitError::WorktreeMissing {
                path: worktree_path.to_path_buf(),
                detail,
            });
        }

        Err(GitError::CommandFailed {
            command: "worktree remove",
            detail,
        })
    }

    async fn branch_exists(&self, branch_name: &str) -> Result<bool, GitError> {
        let args = [
            OsStr::new("branch"),
            OsStr::new("--list"),
            OsStr::new(branch_name),
        ];
        let output = self.run("branch --list", &args).await?;
        if !output.status.success() {
            return Err(GitError::CommandFailed {
                command: "branch --list",
                detail: command_output_detail(&output.stdout, &output.stderr),
            });
        }

        Ok(!String::from_utf8_lossy(&output.stdout).trim().is_empty())
    }

    async fn switch_off_branch(
        &self,
        branch_name: &str,
        base_branch: &str,
    ) -> Result<bool, GitError> {
        let args = [
            OsStr::new("symbolic-ref"),
            OsStr::new("--quiet"),
            OsStr::new("--short"),
            OsStr::new("HEAD"),
        ];
        let output = self.run("symbolic-ref", &args).await?;
        // Non-zero exit means a detached HEAD, which holds no branch.
        if !output.status.success()
            || String::from_utf8_lossy(&output.stdout).trim() != branch_name
        {
            return Ok(false);
        }

        let args = [OsStr::new("checkout"), OsStr::new(base_branch)];
        let output = self.run("checkout", &args).await?;
        if !output.status.success() {
            return Err(GitError::CommandFailed {
                command: "checkout",
                detail: command_output_detail(&output.stdout, &output.stderr),
            });
        }
        debug!(branch = branch_name, base_branch, "switched main repository to base branch");

        Ok(true)
    }

    async fn delete_branch(&self, branch_name: &str) -> Result<(), GitError> {
        let args = [OsStr::new("branch"), OsStr::new("-D"), OsStr::new(branch_name)];
        let output = self.run("branch -D", &args).await?;
        if output.status.success() {
            return Ok(());
        }

        let detail = command_output_detail(&output.stdout, &output.stderr);
        if is_missing_branch_detail(&detail) {
            debug!(branch = branch_name, "branch already deleted");

            return Ok(());
        }

        Err(GitError::CommandFailed {
            command: "branch -D",
            detail,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::process::Command as StdCommand;

    use tempfile::TempDir;

    use super::*;

    fn git(dir: &Path, args: &[&str]) {
        let status = StdCommand::new("git")
            .args(args)
            .current_dir(dir)
            .status()
            .expect("failed to run git");
        assert!(status.success(), "git {args:?} failed");
    }

    fn init_repo() -> TempDir {
        let temp = TempDir::new().expect("test setup failed");
        git(temp.path(), &["init"]);
        git(temp.path(), &["config", "user.name", "Test User"]);
        git(temp.path(), &["config", "user.email", "test@example.com"]);
        git(temp.path(), &["config", "commit.gpgsign", "false"]);
        fs::write(temp.path().join("README.md"), "# Test Repo").expect("test setup failed");
        git(temp.path(), &["add", "README.md"]);
        git(temp.path(), &["commit", "-m", "Initial commit"]);

        temp
    }

    #[tokio::test]
    async fn test_create_worktree_creates_directory_and_branch() {
        // Arrange
        let repo = init_repo();
        let client = GitClient::new(repo.path());
        let worktree_path = repo.path().join(".worktrees").join("agent-test");

        // Act
        let result = client.create_worktree(&worktree_path, "agent-test").await;

        // Assert
        assert!(result.is_ok(), "{result:?}");
        assert!(worktree_path.join("README.md").exists());
        assert!(client.branch_exists("agent-test").await.expect("branch query"));
    }

    #[tokio::test]
    async fn test_create_worktree_fails_when_branch_exists() {
        // Arrange
        let repo = init_repo();
        let client = GitClient::new(repo.path());
        git(repo.path(), &["branch", "agent-test"]);
        let worktree_path = repo.path().join(".worktrees").join("agent-test");

        // Act
        let result = client.create_worktree(&worktree_path, "agent-test").await;

        // Assert
        assert!(matches!(
            result,
            Err(GitError::CommandFailed {
                command: "worktree add",
                ..
            })
        ));
        assert!(!worktree_path.exists());
    }

    #[tokio::test]
    async fn test_remove_worktree_discards_local_changes() {
        // Arrange
        let repo = init_repo();
        let client = GitClient::new(repo.path());
        let worktree_path = repo.path().join(".worktrees").join("agent-test");
        client
            .create_worktree(&worktree_path, "agent-test")
            .await
            .expect("create worktree");
        fs::write(worktree_path.join("README.md"), "dirty").expect("modify file");
        fs::write(worktree_path.join("untracked.txt"), "new").expect("add file");

        // Act
        let result = client.remove_worktree(&worktree_path).await;

        // Assert
        assert!(result.is_ok(), "{result:?}");
        assert!(!worktree_path.exists());
    }

    #[tokio::test]
    async fn test_remove_worktree_reports_missing_worktree() {
        // Arrange
        let repo = init_repo();
        let client = GitClient::new(repo.path());
        let worktree_path = repo.path().join(".worktrees").join("agent-gone");

        // Act
        let result = client.remove_worktree(&worktree_path).await;

        // Assert
        assert!(
            matches!(result, Err(GitError::WorktreeMissing { .. })),
            "{result:?}"
        );
    }

    #[tokio::test]
    async fn test_branch_exists_is_false_for_unknown_branch() {
        // Arrange
        let repo = init_repo();
        let client = GitClient::new(repo.path());

        // Act
        let exists = client.branch_exists("nonexistent").await;

        // Assert
        assert!(!exists.expect("branch query"));
    }

    #[tokio::test]
    async fn test_delete_branch_removes_branch_and_tolerates_missing() {
        // Arrange
        let repo = init_repo();
        let client = GitClient::new(repo.path());
        git(repo.path(), &["branch", "agent-test"]);

        // Act
        let first = client.delete_branch("agent-test").await;
        let second = client.delete_branch("agent-test").await;

        // Assert
        assert!(first.is_ok(), "{first:?}");
        assert!(second.is_ok(), "{second:?}");
        assert!(!client.branch_exists("agent-test").await.expect("branch query"));
    }

    fn current_branch(dir: &Path) -> String {
        let output = StdCommand::new("git")
            .args(["symbolic-ref", "--short", "HEAD"])
            .current_dir(dir)
            .output()
            .expect("failed to run git");

        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    #[tokio::test]
    async fn test_switch_off_branch_checks_out_base_when_branch_is_current() {
        // Arrange
        let repo = init_repo();
        let client = GitClient::new(repo.path());
        let base_branch = current_branch(repo.path());
        git(repo.path(), &["checkout", "-b", "agent-test"]);

        // Act
        let switched = client.switch_off_branch("agent-test", &base_branch).await;

        // Assert
        assert!(switched.expect("switch should succeed"));
        assert_eq!(current_branch(repo.path()), base_branch);
        assert!(client.delete_branch("agent-test").await.is_ok());
    }

    #[tokio::test]
    async fn test_switch_off_branch_leaves_other_branch_checked_out() {
        // Arrange
        let repo = init_repo();
        let client = GitClient::new(repo.path());
        let base_branch = current_branch(repo.path());
        git(repo.path(), &["branch", "agent-test"]);

        // Act
        let switched = client.switch_off_branch("agent-test", "missing-base").await;

        // Assert
        assert!(!switched.expect("query should succeed"));
        assert_eq!(current_branch(repo.path()), base_branch);
    }

    #[tokio::test]
    async fn test_git_commands_fail_outside_repository() {
        // Arrange
        let temp = TempDir::new().expect("test setup failed");
        let client = GitClient::new(temp.path());

        // Act
        let result = client.branch_exists("agent-test").await;

        // Assert
        assert!(matches!(result, Err(GitError::CommandFailed { .. })));
    }
}
