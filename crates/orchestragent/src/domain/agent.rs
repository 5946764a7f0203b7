//! Agent identity and the durable record that binds it to a git worktree.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

/// Prefix shared by every agent branch and worktree directory.
pub const BRANCH_PREFIX: &str = "agent-";

/// Directory under the repository root that holds agent worktrees.
pub const WORKTREES_DIR: &str = ".worktrees";

const MIN_AGENT_ID_LEN: usize = 2;
const MAX_AGENT_ID_LEN: usize = 50;

#[allow(clippy::expect_used)]
static AGENT_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9-]*[a-z0-9]$").expect("agent ID pattern is a valid literal")
});

/// Reasons a raw identifier is rejected by [`AgentId::new`].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum AgentIdError {
    #[error("agent ID must be 2-50 characters, got {len}")]
    Length { len: usize },
    #[error("agent ID must contain only lowercase letters, numbers, and interior hyphens")]
    Pattern,
}

/// Normalized agent identifier.
///
/// Raw input is trimmed and lower-cased once at construction; the stored
/// value is always the normalized form, so two inputs that normalize to the
/// same string are the same identity.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct AgentId(String);

impl AgentId {
    /// Validates and normalizes a raw identifier.
    ///
    /// # Errors
    /// Returns [`AgentIdError::Length`] when the normalized value is outside
    /// 2-50 characters and [`AgentIdError::Pattern`] when it contains
    /// characters other than lowercase letters, digits, and interior hyphens.
    pub fn new(raw: &str) -> Result<Self, AgentIdError> {
        let normalized = raw.trim().to_lowercase();

        let len = normalized.len();
        if !(MIN_AGENT_ID_LEN..=MAX_AGENT_ID_LEN).contains(&len) {
            return Err(AgentIdError::Length { len });
        }

        if !AGENT_ID_PATTERN.is_match(&normalized) {
            return Err(AgentIdError::Pattern);
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the git branch owned by this agent.
    pub fn branch_name(&self) -> String {
        format!("{BRANCH_PREFIX}{}", self.0)
    }

    /// Returns the directory name of this agent's worktree.
    pub fn worktree_dir_name(&self) -> String {
        format!("{BRANCH_PREFIX}{}", self.0)
    }

    /// Returns `<repo_root>/.worktrees/agent-<id>`.
    pub fn worktree_path(&self, repo_root: &Path) -> PathBuf {
        repo_root.join(WORKTREES_DIR).join(self.worktree_dir_name())
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AgentId {
    type Err = AgentIdError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::new(raw)
    }
}

/// Lifecycle status reported for a session.
///
/// Only [`AgentStatus::Created`] is ever persisted. [`AgentStatus::Orphaned`]
/// is a read-time override for records whose branch no longer exists in git.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Created,
    Orphaned,
}

impl AgentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentStatus::Created => "created",
            AgentStatus::Orphaned => "orphaned",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "created" => Ok(AgentStatus::Created),
            "orphaned" => Ok(AgentStatus::Orphaned),
            other => Err(format!("Unknown agent status: {other}")),
        }
    }
}

/// Durable session record for one agent.
///
/// The branch name is never stored independently of the identifier; it is
/// always derived through [`AgentId::branch_name`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Agent {
    id: AgentId,
    status: AgentStatus,
    worktree_path: PathBuf,
}

impl Agent {
    /// Creates a freshly created agent record.
    pub fn new(id: AgentId, worktree_path: PathBuf) -> Self {
        Self::from_parts(id, worktree_path, AgentStatus::Created)
    }

    /// Rebuilds an agent record from persisted values.
    pub fn from_parts(id: AgentId, worktree_path: PathBuf, status: AgentStatus) -> Self {
        Self {
            id,
            status,
            worktree_path,
        }
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn worktree_path(&self) -> &Path {
        &self.worktree_path
    }

    pub fn branch_name(&self) -> String {
        self.id.branch_name()
    }

    pub fn status(&self) -> AgentStatus {
        self.status
    }

    /// Returns the same record reported with a different status.
    #[must_use]
    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.status = status;

        self
    }
}
