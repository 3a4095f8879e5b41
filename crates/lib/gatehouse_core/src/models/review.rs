//! Review domain models.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of grant a review authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "review_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReviewType {
    /// Standing, time-boxed access.
    Jit,
    /// Exactly one execution of the reviewed input.
    OneTime,
}

/// Review status.
///
/// `Pending` moves to `Approved` or `Rejected`. An approved one-time review
/// moves once to `Executed`, or to `Unknown` when the execution was detached
/// before its outcome was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "review_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
    Executed,
    Unknown,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Executed => "executed",
            Self::Unknown => "unknown",
        }
    }
}

/// User that created or reviewed a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewOwner {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
}

/// Connection the review targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewConnection {
    pub id: String,
    pub name: String,
}

/// Approval state of one reviewer group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewGroup {
    pub id: String,
    pub group: String,
    pub status: ReviewStatus,
    pub reviewed_by: Option<ReviewOwner>,
    pub review_date: Option<DateTime<Utc>>,
}

/// A review gating a privileged command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub org_id: String,
    pub session_id: String,
    #[serde(rename = "type")]
    pub review_type: ReviewType,
    pub input: String,
    #[serde(default)]
    pub input_env_vars: HashMap<String, String>,
    #[serde(default)]
    pub input_client_args: Vec<String>,
    pub access_duration_secs: Option<i64>,
    pub status: ReviewStatus,
    pub revoke_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub created_by: ReviewOwner,
    pub connection: ReviewConnection,
    #[serde(default)]
    pub review_groups: Vec<ReviewGroup>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_type_wire_names() {
        assert_eq!(
            serde_json::to_value(ReviewType::OneTime).unwrap(),
            serde_json::json!("onetime")
        );
        assert_eq!(
            serde_json::to_value(ReviewType::Jit).unwrap(),
            serde_json::json!("jit")
        );
    }

    #[test]
    fn status_strings_match_wire_names() {
        for status in [
            ReviewStatus::Pending,
            ReviewStatus::Approved,
            ReviewStatus::Rejected,
            ReviewStatus::Executed,
            ReviewStatus::Unknown,
        ] {
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                serde_json::json!(status.as_str())
            );
        }
    }
}
