//! In-memory store backing the unit and router tests.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use super::{PluginStore, ReviewStore, SessionStore, StoreError};
use crate::models::plugin::Plugin;
use crate::models::review::Review;
use crate::models::session::{
    Session, SessionFilter, SessionList, SessionStatus, SessionStatusHistory,
};
use crate::uuid::uuidv7;

/// Sessions, reviews and plugins held in concurrent maps.
pub struct MemoryStore {
    sessions: DashMap<String, Session>,
    /// Keyed by review id.
    reviews: DashMap<String, Review>,
    history: DashMap<String, Vec<SessionStatusHistory>>,
    /// Keyed by (org id, plugin name).
    plugins: DashMap<(String, String), Plugin>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            reviews: DashMap::new(),
            history: DashMap::new(),
            plugins: DashMap::new(),
        }
    }

    /// Insert or replace a session and record its current status.
    pub fn put_session(&self, session: Session) {
        self.record_status(&session.id, session.status);
        self.sessions.insert(session.id.clone(), session);
    }

    /// Append a status change to a session's history.
    pub fn record_status(&self, session_id: &str, status: SessionStatus) {
        self.history
            .entry(session_id.to_string())
            .or_default()
            .push(SessionStatusHistory {
                id: uuidv7().to_string(),
                session_id: session_id.to_string(),
                status,
                created_at: Utc::now(),
            });
    }

    pub fn put_review(&self, review: Review) {
        self.reviews.insert(review.id.clone(), review);
    }

    pub fn put_plugin(&self, plugin: Plugin) {
        self.plugins
            .insert((plugin.org_id.clone(), plugin.name.clone()), plugin);
    }

    pub fn remove_plugin(&self, org_id: &str, name: &str) {
        self.plugins.remove(&(org_id.to_string(), name.to_string()));
    }

    /// Current copy of a review by id.
    pub fn review(&self, review_id: &str) -> Option<Review> {
        self.reviews.get(review_id).map(|r| r.clone())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn find_session(
        &self,
        org_id: &str,
        session_id: &str,
    ) -> Result<Option<Session>, StoreError> {
        Ok(self
            .sessions
            .get(session_id)
            .filter(|s| s.org_id == org_id)
            .map(|s| s.clone()))
    }

    async fn list_sessions(
        &self,
        org_id: &str,
        filter: &SessionFilter,
    ) -> Result<SessionList, StoreError> {
        let mut matching: Vec<Session> = self
            .sessions
            .iter()
            .filter(|s| s.org_id == org_id && filter.matches(s))
            .map(|s| s.redacted())
            .collect();
        matching.sort_by(|a, b| b.start_date.cmp(&a.start_date));

        let total = matching.len() as i64;
        let offset = filter.offset();
        let items: Vec<Session> = matching
            .into_iter()
            .skip(offset as usize)
            .take(filter.limit() as usize)
            .collect();
        let has_next_page = offset + (items.len() as i64) < total;

        Ok(SessionList {
            total,
            has_next_page,
            items,
        })
    }

    async fn status_history(
        &self,
        org_id: &str,
        session_id: &str,
    ) -> Result<Vec<SessionStatusHistory>, StoreError> {
        let owned = self
            .sessions
            .get(session_id)
            .is_some_and(|s| s.org_id == org_id);
        if !owned {
            return Ok(Vec::new());
        }
        Ok(self
            .history
            .get(session_id)
            .map(|h| h.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn find_review_by_session_id(
        &self,
        session_id: &str,
    ) -> Result<Option<Review>, StoreError> {
        Ok(self
            .reviews
            .iter()
            .find(|r| r.session_id == session_id)
            .map(|r| r.clone()))
    }

    async fn persist_review(&self, review: &Review) -> Result<(), StoreError> {
        self.reviews.insert(review.id.clone(), review.clone());
        Ok(())
    }
}

#[async_trait]
impl PluginStore for MemoryStore {
    async fn find_plugin(&self, org_id: &str, name: &str) -> Result<Option<Plugin>, StoreError> {
        Ok(self
            .plugins
            .get(&(org_id.to_string(), name.to_string()))
            .map(|p| p.clone()))
    }
}
