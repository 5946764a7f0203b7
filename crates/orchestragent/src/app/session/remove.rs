//! Session teardown: locate the record, clean git, then delete the record.

use std::sync::Arc;

use tracing::{info, warn};

use crate::app::error::SessionError;
use crate::domain::agent::AgentId;
use crate::domain::session::RemovedSession;
use crate::infra::db::SessionRepository;
use crate::infra::git::{GitError, GitOperations};

#[derive(Clone, Debug)]
pub struct RemoveSessionRequest {
    pub agent_id: String,
}

/// Removes an agent's worktree, branch, and durable record.
pub struct RemoveSessionUseCase<G, R> {
    base_branch: String,
    git: Arc<G>,
    repository: Arc<R>,
}

impl<G: GitOperations, R: SessionRepository> RemoveSessionUseCase<G, R> {
    pub fn new(git: Arc<G>, repository: Arc<R>, base_branch: impl Into<String>) -> Self {
        Self {
            base_branch: base_branch.into(),
            git,
            repository,
        }
    }

    /// Branch checked out in the main repository when it is found on the
    /// agent branch, so that branch can be deleted.
    pub fn base_branch(&self) -> &str {
        &self.base_branch
    }

    /// Runs the removal workflow.
    ///
    /// The record is deleted last, so any git failure leaves it in place and
    /// the removal can be retried. On such a retry git may report the
    /// worktree as already gone; that is absorbed because the caller's intent
    /// (no worktree, no record) is still being completed.
    ///
    /// # Errors
    /// Returns the [`SessionError`] variant naming the failed step.
    pub async fn execute(
        &self,
        request: RemoveSessionRequest,
    ) -> Result<RemovedSession, SessionError> {
        let agent_id =
            AgentId::new(&request.agent_id).map_err(|source| SessionError::InvalidAgentId {
                raw: request.agent_id.clone(),
                source,
            })?;

        let agent = self
            .repository
            .find_by_id(&agent_id)
            .await
            .map_err(SessionError::persistence("find agent"))?
            .ok_or_else(|| SessionError::AgentNotFound {
                agent_id: agent_id.to_string(),
            })?;

        let worktree_already_absent = match self.git.remove_worktree(agent.worktree_path()).await
        {
            Ok(()) => false,
            Err(GitError::WorktreeMissing { path, detail }) => {
                warn!(
                    agent_id = %agent_id,
                    path = %path.display(),
                    %detail,
                    "worktree already removed, continuing with record deletion"
                );

                true
            }
            Err(source) => return Err(SessionError::git("remove worktree")(source)),
        };

        let branch_name = agent.branch_name();
        let switched = self
            .git
            .switch_off_branch(&branch_name, &self.base_branch)
            .await
            .map_err(SessionError::git("check out base branch"))?;
        if switched {
            warn!(
                agent_id = %agent_id,
                branch = %branch_name,
                base_branch = %self.base_branch,
                "main repository was on the agent branch, switched to base branch"
            );
        }

        self.git
            .delete_branch(&branch_name)
            .await
            .map_err(SessionError::git("delete branch"))?;

        let deleted = self
            .repository
            .delete(&agent_id)
            .await
            .map_err(SessionError::persistence("delete agent"))?;
        if !deleted {
            warn!(agent_id = %agent_id, "record was already deleted by another caller");
        }

        info!(
            agent_id = %agent_id,
            worktree_already_absent,
            "session removed"
        );

        Ok(RemovedSession {
            agent_id: agent_id.to_string(),
            worktree_already_absent,
        })
    }
}
