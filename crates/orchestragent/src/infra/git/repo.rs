use std::path::{Path, PathBuf};

/// Walks up the directory tree to find the directory containing `.git`.
///
/// Both regular repositories (`.git` directory) and linked worktrees (`.git`
/// file) are recognized.
pub fn find_git_repo_root(dir: &Path) -> Option<PathBuf> {
    let mut current = dir.to_path_buf();
    loop {
        if current.join(".git").exists() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Extracts the best human-readable error detail from command output.
pub(super) fn command_output_detail(stdout: &[u8], stderr: &[u8]) -> String {
    let stderr_text = String::from_utf8_lossy(stderr).trim().to_string();
    if !stderr_text.is_empty() {
        return stderr_text;
    }

    let stdout_text = String::from_utf8_lossy(stdout).trim().to_string();
    if !stdout_text.is_empty() {
        return stdout_text;
    }

    "Unknown git error".to_string()
}

/// Returns whether `git worktree remove` output means the path is not (or no
/// longer) a registered worktree.
pub(super) fn is_missing_worktree_detail(detail: &str) -> bool {
    detail.contains("is not a working tree") || detail.contains("does not exist")
}

/// Returns whether `git branch -D` output means the branch is already gone.
pub(super) fn is_missing_branch_detail(detail: &str) -> bool {
    detail.contains("not found")
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_find_git_repo_root_exists() {
        // Arrange
        let temp = TempDir::new().expect("test setup failed");
        fs::create_dir(temp.path().join(".git")).expect("test setup failed");

        // Act
        let result = find_git_repo_root(temp.path());

        // Assert
        assert_eq!(result, Some(temp.path().to_path_buf()));
    }

    #[test]
    fn test_find_git_repo_root_from_nested_dir() {
        // Arrange
        let temp = TempDir::new().expect("test setup failed");
        fs::create_dir(temp.path().join(".git")).expect("test setup failed");
        let nested = temp.path().join("src").join("app");
        fs::create_dir_all(&nested).expect("test setup failed");

        // Act
        let result = find_git_repo_root(&nested);

        // Assert
        assert_eq!(result, Some(temp.path().to_path_buf()));
    }

    #[test]
    fn test_find_git_repo_root_accepts_worktree_git_file() {
        // Arrange
        let temp = TempDir::new().expect("test setup failed");
        fs::write(temp.path().join(".git"), "gitdir: /repo/.git/worktrees/a\n")
            .expect("test setup failed");

        // Act
        let result = find_git_repo_root(temp.path());

        // Assert
        assert_eq!(result, Some(temp.path().to_path_buf()));
    }

    #[test]
    fn test_command_output_detail_prefers_stderr() {
        // Arrange & Act
        let detail = command_output_detail(b"out\n", b"  fatal: bad  \n");

        // Assert
        assert_eq!(detail, "fatal: bad");
    }

    #[test]
    fn test_command_output_detail_falls_back_to_stdout_then_default() {
        // Arrange & Act
        let stdout_detail = command_output_detail(b"only stdout", b"");
        let default_detail = command_output_detail(b"", b"  ");

        // Assert
        assert_eq!(stdout_detail, "only stdout");
        assert_eq!(default_detail, "Unknown git error");
    }

    #[test]
    fn test_missing_worktree_detail_matches_git_messages() {
        // Arrange & Act & Assert
        assert!(is_missing_worktree_detail(
            "fatal: '/repo/.worktrees/agent-a1' is not a working tree"
        ));
        assert!(is_missing_worktree_detail(
            "fatal: validation failed, cannot remove working tree: '/x' does not exist"
        ));
        assert!(!is_missing_worktree_detail(
            "fatal: cannot remove a locked working tree"
        ));
    }

    #[test]
    fn test_missing_branch_detail_matches_git_message() {
        // Arrange & Act & Assert
        assert!(is_missing_branch_detail("error: branch 'agent-a1' not found."));
        assert!(!is_missing_branch_detail(
            "error: Cannot delete branch 'agent-a1' checked out at '/repo'"
        ));
    }
}
