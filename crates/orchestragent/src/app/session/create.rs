//! Session creation: validate, guard, create the worktree, then persist.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};

use crate::app::error::SessionError;
use crate::domain::agent::{Agent, AgentId};
use crate::domain::session::SessionSummary;
use crate::infra::db::{RepositoryError, SessionRepository};
use crate::infra::git::GitOperations;

#[derive(Clone, Debug)]
pub struct CreateSessionRequest {
    pub agent_id: String,
}

/// Creates the branch, worktree, and durable record for a new agent.
pub struct CreateSessionUseCase<G, R> {
    git: Arc<G>,
    repo_root: PathBuf,
    repository: Arc<R>,
}

impl<G: GitOperations, R: SessionRepository> CreateSessionUseCase<G, R> {
    pub fn new(git: Arc<G>, repository: Arc<R>, repo_root: impl Into<PathBuf>) -> Self {
        Self {
            git,
            repo_root: repo_root.into(),
            repository,
        }
    }

    /// Runs the creation workflow.
    ///
    /// Steps run in a fixed order so that a record is only written after git
    /// has created the worktree:
    /// 1. Validate the identifier.
    /// 2. Reject agents that already have a record.
    /// 3. Reject branches that already exist in git.
    /// 4. Create the worktree and branch.
    /// 5. Save the record, rolling the worktree back if the save fails.
    ///
    /// # Errors
    /// Returns the [`SessionError`] variant naming the failed step.
    pub async fn execute(
        &self,
        request: CreateSessionRequest,
    ) -> Result<SessionSummary, SessionError> {
        let agent_id =
            AgentId::new(&request.agent_id).map_err(|source| SessionError::InvalidAgentId {
                raw: request.agent_id.clone(),
                source,
            })?;

        let agent_exists = self
            .repository
            .exists(&agent_id)
            .await
            .map_err(SessionError::persistence("check agent existence"))?;
        if agent_exists {
            return Err(SessionError::AgentAlreadyExists {
                agent_id: agent_id.to_string(),
            });
        }

        let branch_name = agent_id.branch_name();
        let branch_exists = self
            .git
            .branch_exists(&branch_name)
            .await
            .map_err(SessionError::git("check branch existence"))?;
        if branch_exists {
            return Err(SessionError::BranchAlreadyExists {
                branch: branch_name,
            });
        }

        let worktree_path = agent_id.worktree_path(&self.repo_root);
        self.git
            .create_worktree(&worktree_path, &branch_name)
            .await
            .map_err(SessionError::git("create worktree"))?;

        let agent = Agent::new(agent_id, worktree_path);
        match self.repository.save(&agent).await {
            Ok(()) => {}
            // Another caller stored this agent first; its record points at the
            // same path, so the worktree is left for it.
            Err(RepositoryError::Duplicate { agent_id }) => {
                return Err(SessionError::AgentAlreadyExists { agent_id });
            }
            Err(source) => {
                self.rollback_worktree(&agent).await;

                return Err(SessionError::persistence("save agent")(source));
            }
        }

        info!(
            agent_id = %agent.id(),
            branch = %branch_name,
            path = %agent.worktree_path().display(),
            "session created"
        );

        Ok(SessionSummary::from(&agent))
    }

    /// Removes the worktree and branch created for a record that failed to
    /// persist.
    async fn rollback_worktree(&self, agent: &Agent) {
        let branch_name = agent.branch_name();
        if let Err(rollback_error) = self.git.remove_worktree(agent.worktree_path()).await {
            error!(
                agent_id = %agent.id(),
                path = %agent.worktree_path().display(),
                error = %rollback_error,
                "failed to remove worktree after save failure"
            );
        }
        if let Err(rollback_error) = self.git.delete_branch(&branch_name).await {
            error!(
                agent_id = %agent.id(),
                branch = %branch_name,
                error = %rollback_error,
                "failed to delete branch after save failure"
            );
        }
    }
}
