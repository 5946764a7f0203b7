//! Classified failures surfaced by the session use cases.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::domain::agent::AgentIdError;
use crate::infra::db::RepositoryError;
use crate::infra::git::GitError;

/// Failure of a session use case, identifying which precondition or
/// operation failed. Underlying diagnostics are kept as the error source.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid agent ID `{raw}`: {source}")]
    InvalidAgentId {
        raw: String,
        #[source]
        source: AgentIdError,
    },
    #[error("agent already exists: {agent_id}")]
    AgentAlreadyExists { agent_id: String },
    #[error("agent not found: {agent_id}")]
    AgentNotFound { agent_id: String },
    #[error("branch already exists: {branch}")]
    BranchAlreadyExists { branch: String },
    #[error("failed to {operation}: {source}")]
    GitOperationFailed {
        operation: &'static str,
        #[source]
        source: GitError,
    },
    #[error("failed to {operation}: {source}")]
    PersistenceFailed {
        operation: &'static str,
        #[source]
        source: RepositoryError,
    },
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::InvalidAgentId { .. } => ErrorKind::InvalidAgentId,
            SessionError::AgentAlreadyExists { .. } => ErrorKind::AgentAlreadyExists,
            SessionError::AgentNotFound { .. } => ErrorKind::AgentNotFound,
            SessionError::BranchAlreadyExists { .. } => ErrorKind::BranchAlreadyExists,
            SessionError::GitOperationFailed { .. } => ErrorKind::GitOperationFailed,
            SessionError::PersistenceFailed { .. } => ErrorKind::PersistenceFailed,
        }
    }

    pub(crate) fn git(operation: &'static str) -> impl FnOnce(GitError) -> Self {
        move |source| SessionError::GitOperationFailed { operation, source }
    }

    pub(crate) fn persistence(operation: &'static str) -> impl FnOnce(RepositoryError) -> Self {
        move |source| SessionError::PersistenceFailed { operation, source }
    }
}

/// Stable, machine-readable discriminant of a [`SessionError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidAgentId,
    AgentAlreadyExists,
    AgentNotFound,
    BranchAlreadyExists,
    GitOperationFailed,
    PersistenceFailed,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidAgentId => "invalid_agent_id",
            ErrorKind::AgentAlreadyExists => "agent_already_exists",
            ErrorKind::AgentNotFound => "agent_not_found",
            ErrorKind::BranchAlreadyExists => "branch_already_exists",
            ErrorKind::GitOperationFailed => "git_operation_failed",
            ErrorKind::PersistenceFailed => "persistence_failed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
