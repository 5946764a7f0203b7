//! Session listing with optional drift detection against git.

use std::sync::Arc;

use tracing::warn;

use crate::app::error::SessionError;
use crate::domain::agent::AgentStatus;
use crate::domain::session::SessionSummary;
use crate::infra::db::SessionRepository;
use crate::infra::git::GitOperations;

#[derive(Clone, Copy, Debug, Default)]
pub struct ListSessionsRequest {
    /// Checks every record's branch in git and reports missing ones as
    /// [`AgentStatus::Orphaned`].
    pub reconcile: bool,
}

pub struct ListSessionsUseCase<G, R> {
    git: Arc<G>,
    repository: Arc<R>,
}

impl<G: GitOperations, R: SessionRepository> ListSessionsUseCase<G, R> {
    pub fn new(git: Arc<G>, repository: Arc<R>) -> Self {
        Self { git, repository }
    }

    /// Returns all sessions in insertion order.
    ///
    /// Drifted records are reported, never dropped.
    ///
    /// # Errors
    /// Returns [`SessionError::PersistenceFailed`] if records cannot be
    /// loaded and [`SessionError::GitOperationFailed`] if reconciliation
    /// cannot query git.
    pub async fn execute(
        &self,
        request: ListSessionsRequest,
    ) -> Result<Vec<SessionSummary>, SessionError> {
        let agents = self
            .repository
            .list()
            .await
            .map_err(SessionError::persistence("list agents"))?;

        let mut sessions = Vec::with_capacity(agents.len());
        for agent in agents {
            let branch_name = agent.branch_name();
            let agent = if request.reconcile
                && !self
                    .git
                    .branch_exists(&branch_name)
                    .await
                    .map_err(SessionError::git("check branch existence"))?
            {
                warn!(
                    agent_id = %agent.id(),
                    branch = %branch_name,
                    "session branch missing from git"
                );

                agent.with_status(AgentStatus::Orphaned)
            } else {
                agent
            };

            sessions.push(SessionSummary::from(&agent));
        }

        Ok(sessions)
    }
}
