//! Review-gated, single-execution command gate.
//!
//! An approved one-time review authorizes exactly one run of its input.
//! The session id is held in the lock registry for the whole attempt, and
//! the review moves out of `approved` at most once per acquisition: to
//! `executed` when the run completes before the deadline, or to `unknown`
//! when the gate detached from it.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::client::{ExecClientFactory, ExecRequest, ExecResponse, ExecTarget};
use super::lock::ExecLockRegistry;
use crate::models::auth::ApiContext;
use crate::models::plugin::PLUGIN_REVIEW_NAME;
use crate::models::review::{Review, ReviewStatus, ReviewType};
use crate::store::{PluginStore, ReviewStore, SessionStore, StoreError};

/// How long a caller waits for the execution before getting a 202.
pub const DEFAULT_EXEC_DEADLINE: Duration = Duration::from_secs(50);

pub const MSG_REVIEW_NOT_FOUND: &str = "reviewed session not found";
pub const MSG_SESSION_NOT_FOUND: &str = "session not found";
pub const MSG_NOT_CREATOR: &str = "only the creator can trigger this action";
pub const MSG_NOT_APPROVED: &str = "review not approved or already executed";

#[derive(Debug, Error)]
pub enum GateError {
    #[error("{0}")]
    NotFound(String),

    #[error("the session {0} is already being processed")]
    Conflict(String),

    /// Ownership or review status does not allow the execution.
    #[error("{0}")]
    PreconditionFailed(String),

    #[error("review plugin is not enabled for the connection {0}")]
    PluginNotEnabled(String),

    /// The execution client could not be opened.
    #[error("{0}")]
    Client(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// How an execution attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    /// The run finished before the deadline.
    Completed(ExecResponse),
    /// The deadline won; the outcome is not known.
    Detached { session_id: String },
}

pub struct ExecGate {
    locks: Arc<ExecLockRegistry>,
    reviews: Arc<dyn ReviewStore>,
    sessions: Arc<dyn SessionStore>,
    plugins: Arc<dyn PluginStore>,
    clients: Arc<dyn ExecClientFactory>,
    deadline: Duration,
}

impl ExecGate {
    pub fn new(
        reviews: Arc<dyn ReviewStore>,
        sessions: Arc<dyn SessionStore>,
        plugins: Arc<dyn PluginStore>,
        clients: Arc<dyn ExecClientFactory>,
    ) -> Self {
        Self {
            locks: Arc::new(ExecLockRegistry::new()),
            reviews,
            sessions,
            plugins,
            clients,
            deadline: DEFAULT_EXEC_DEADLINE,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_locks(mut self, locks: Arc<ExecLockRegistry>) -> Self {
        self.locks = locks;
        self
    }

    pub fn locks(&self) -> &Arc<ExecLockRegistry> {
        &self.locks
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Run the approved one-time review of `session_id` on behalf of `ctx`.
    pub async fn execute(&self, ctx: &ApiContext, session_id: &str) -> Result<ExecOutcome, GateError> {
        let mut review = self
            .reviews
            .find_review_by_session_id(session_id)
            .await?
            .ok_or_else(|| GateError::NotFound(MSG_REVIEW_NOT_FOUND.into()))?;

        let Some(_guard) = self.locks.acquire(session_id) else {
            info!(session = %session_id, "execution already in flight");
            return Err(GateError::Conflict(session_id.to_string()));
        };

        if review.review_type != ReviewType::OneTime {
            return Err(GateError::NotFound(MSG_SESSION_NOT_FOUND.into()));
        }

        let session = self
            .sessions
            .find_session(&ctx.org_id, session_id)
            .await?
            .ok_or_else(|| GateError::NotFound(MSG_SESSION_NOT_FOUND.into()))?;

        if session.user_email != ctx.user_email {
            return Err(GateError::PreconditionFailed(MSG_NOT_CREATOR.into()));
        }

        if review.status != ReviewStatus::Approved {
            debug!(
                session = %session_id,
                review = %review.id,
                status = review.status.as_str(),
                "review not executable"
            );
            return Err(GateError::PreconditionFailed(MSG_NOT_APPROVED.into()));
        }

        let enrolled = self
            .plugins
            .find_plugin(&ctx.org_id, PLUGIN_REVIEW_NAME)
            .await?
            .is_some_and(|plugin| plugin.has_connection(&review.connection.name));
        if !enrolled {
            return Err(GateError::PluginNotEnabled(review.connection.name.clone()));
        }

        let target = ExecTarget {
            org_id: ctx.org_id.clone(),
            session_id: session_id.to_string(),
            connection: session.connection.clone(),
        };
        let mut client = self.clients.connect(&target).await.map_err(|e| {
            warn!(session = %session_id, connection = %target.connection, "failed opening client: {e}");
            GateError::Client(e.to_string())
        })?;

        // The session's script runs with the env vars and args the review carries.
        let request = ExecRequest {
            script: session.script.data.clone(),
            env_vars: review.input_env_vars.clone(),
            client_args: review.input_client_args.clone(),
        };
        let cancel = CancellationToken::new();
        let (tx, rx) = oneshot::channel();
        let run_cancel = cancel.clone();
        tokio::spawn(async move {
            let response = client.run(request, run_cancel).await;
            // The receiver is gone once the gate has detached.
            let _ = tx.send(response);
        });

        info!(
            session = %session_id,
            review = %review.id,
            connection = %target.connection,
            "execution started"
        );

        match tokio::time::timeout(self.deadline, rx).await {
            Ok(Ok(response)) => {
                self.persist_status(&mut review, ReviewStatus::Executed).await;
                info!(
                    session = %session_id,
                    exit_code = ?response.exit_code,
                    elapsed_ms = response.execution_time_ms,
                    "execution completed"
                );
                Ok(ExecOutcome::Completed(response))
            }
            Ok(Err(_)) => {
                error!(session = %session_id, "execution task ended without a result");
                self.persist_status(&mut review, ReviewStatus::Unknown).await;
                Err(GateError::Internal("execution ended without a result".into()))
            }
            Err(_) => {
                cancel.cancel();
                self.persist_status(&mut review, ReviewStatus::Unknown).await;
                info!(
                    session = %session_id,
                    deadline_secs = self.deadline.as_secs(),
                    "deadline reached, detached from execution"
                );
                Ok(ExecOutcome::Detached {
                    session_id: session_id.to_string(),
                })
            }
        }
    }

    /// Best effort: a failed write is logged and does not change the response.
    async fn persist_status(&self, review: &mut Review, status: ReviewStatus) {
        review.status = status;
        if let Err(e) = self.reviews.persist_review(review).await {
            warn!(
                review = %review.id,
                status = status.as_str(),
                "failed persisting review status: {e}"
            );
        }
    }
}
