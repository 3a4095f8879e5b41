//! Storage collaborators for sessions, reviews and plugin enrollment.

pub mod memory;
pub mod pg;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::plugin::Plugin;
use crate::models::review::Review;
use crate::models::session::{Session, SessionFilter, SessionList, SessionStatusHistory};

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid record: {0}")]
    Invalid(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),
}

/// Read access to sessions, scoped to an org.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn find_session(
        &self,
        org_id: &str,
        session_id: &str,
    ) -> Result<Option<Session>, StoreError>;

    /// A page of sessions, newest first, with scripts blanked.
    async fn list_sessions(
        &self,
        org_id: &str,
        filter: &SessionFilter,
    ) -> Result<SessionList, StoreError>;

    /// Status changes of a session, oldest first.
    async fn status_history(
        &self,
        org_id: &str,
        session_id: &str,
    ) -> Result<Vec<SessionStatusHistory>, StoreError>;
}

/// Review reads and writes.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn find_review_by_session_id(
        &self,
        session_id: &str,
    ) -> Result<Option<Review>, StoreError>;

    /// Idempotent upsert keyed by review id.
    async fn persist_review(&self, review: &Review) -> Result<(), StoreError>;
}

/// Plugin enrollment lookup.
#[async_trait]
pub trait PluginStore: Send + Sync {
    async fn find_plugin(&self, org_id: &str, name: &str) -> Result<Option<Plugin>, StoreError>;
}
