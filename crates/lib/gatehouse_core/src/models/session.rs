//! Session domain models.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::review::Review;

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "session_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Open,
    Ready,
    Done,
}

/// Script payload recorded for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionScript {
    pub data: String,
}

/// A remote command/connection interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub org_id: String,
    pub user_id: String,
    pub user_email: String,
    pub user_name: String,
    pub connection: String,
    #[serde(rename = "type")]
    pub connection_type: String,
    pub verb: String,
    pub status: SessionStatus,
    pub script: SessionScript,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub event_size: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    /// Attached on single-session reads only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<Review>,
}

impl Session {
    /// Copy of the session suitable for listings: script blanked, no review.
    pub fn redacted(&self) -> Self {
        Self {
            script: SessionScript::default(),
            review: None,
            ..self.clone()
        }
    }
}

/// One page of sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionList {
    pub total: i64,
    pub has_next_page: bool,
    pub items: Vec<Session>,
}

/// A recorded status change of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatusHistory {
    pub id: String,
    pub session_id: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
}

/// Default page size for session listings.
pub const DEFAULT_LIMIT: i64 = 100;

/// Listing filters. Absent fields do not constrain the result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionFilter {
    pub user: Option<String>,
    pub connection_type: Option<String>,
    pub connection: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl SessionFilter {
    pub fn limit(&self) -> i64 {
        self.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.filter(|o| *o >= 0).unwrap_or(0)
    }

    /// Whether a session passes every set filter.
    pub fn matches(&self, session: &Session) -> bool {
        if let Some(user) = &self.user
            && session.user_id != *user
        {
            return false;
        }
        if let Some(kind) = &self.connection_type
            && session.connection_type != *kind
        {
            return false;
        }
        if let Some(conn) = &self.connection
            && session.connection != *conn
        {
            return false;
        }
        if let Some(start) = self.start_date
            && session.start_date < start
        {
            return false;
        }
        if let Some(end) = self.end_date
            && session.start_date > end
        {
            return false;
        }
        true
    }
}
