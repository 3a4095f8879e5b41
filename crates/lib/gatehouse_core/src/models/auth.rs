//! Authentication domain models.
//!
//! These are the principals a credential can resolve to. The HTTP layer
//! renders its own summaries from them.

use serde::{Deserialize, Serialize};

/// Group name that marks a user as an administrator.
pub const GROUP_ADMIN: &str = "admin";

/// Org/user attributes carried by admin-internal calls and resolved for
/// end users.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiContext {
    pub org_id: String,
    #[serde(default)]
    pub org_name: String,
    pub user_id: String,
    pub user_email: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_status: String,
    #[serde(default)]
    pub user_groups: Vec<String>,
    #[serde(default)]
    pub slack_id: String,
}

impl ApiContext {
    /// Whether the user belongs to the admin group.
    pub fn is_admin(&self) -> bool {
        self.user_groups.iter().any(|g| g == GROUP_ADMIN)
    }
}

/// A registered agent, resolved from an `x-agt-` token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub org_id: String,
    pub name: String,
    pub mode: String,
    pub status: String,
}

/// A client key, resolved from a legacy client DSN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientKey {
    pub id: String,
    pub org_id: String,
    pub name: String,
    pub active: bool,
}

/// Organization record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Org {
    pub id: String,
    pub name: String,
}

/// Domain user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub org_id: String,
    pub email: String,
    pub name: String,
    pub status: String,
    pub slack_id: String,
    pub groups: Vec<String>,
}

/// Result of resolving a token subject. The user record may be missing when
/// the subject is known to the identity provider but was never provisioned.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub org: Org,
    pub user: Option<User>,
}

impl UserProfile {
    /// Flatten into an `ApiContext`. Returns `None` without a user record.
    pub fn to_api_context(&self) -> Option<ApiContext> {
        let user = self.user.as_ref()?;
        Some(ApiContext {
            org_id: self.org.id.clone(),
            org_name: self.org.name.clone(),
            user_id: user.id.clone(),
            user_email: user.email.clone(),
            user_name: user.name.clone(),
            user_status: user.status.clone(),
            user_groups: user.groups.clone(),
            slack_id: user.slack_id.clone(),
        })
    }
}

/// JWT claims embedded in user access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Identity-provider subject of the user.
    pub sub: String,
    /// User email.
    pub email: String,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
}
