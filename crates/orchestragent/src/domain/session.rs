use std::path::PathBuf;

use serde::Serialize;

use super::agent::{Agent, AgentStatus};

/// Session snapshot returned by create and list.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SessionSummary {
    pub agent_id: String,
    pub branch_name: String,
    pub status: AgentStatus,
    pub worktree_path: PathBuf,
}

impl From<&Agent> for SessionSummary {
    fn from(agent: &Agent) -> Self {
        Self {
            agent_id: agent.id().to_string(),
            branch_name: agent.branch_name(),
            status: agent.status(),
            worktree_path: agent.worktree_path().to_path_buf(),
        }
    }
}

/// Outcome of a completed session teardown.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RemovedSession {
    pub agent_id: String,
    /// Whether git reported the worktree as already gone, e.g. on a retry
    /// after an earlier persistence failure.
    pub worktree_already_absent: bool,
}
