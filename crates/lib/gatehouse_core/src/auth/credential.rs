//! Call metadata keys, deployment profile and bearer-token extraction.

use std::fmt;
use std::str::FromStr;

use http::HeaderMap;
use http::header::AUTHORIZATION;
use tracing::debug;

use super::AuthError;

/// Metadata entry naming the kind of client (`agent`, `client`, ...).
pub const MD_ORIGIN: &str = "origin";
/// Metadata entry carrying `Bearer <token>`.
pub const MD_AUTHORIZATION: &str = "authorization";
/// Metadata entry with the client build identifier.
pub const MD_USER_AGENT: &str = "user-agent";
/// Metadata entry with base64(JSON) user attributes for admin-internal calls.
pub const MD_USER_INFO: &str = "user-info";

/// Origin tag sent by agents.
pub const ORIGIN_AGENT: &str = "agent";

/// Token synthesized for agent origins in the development profile.
pub const DEV_AGENT_TOKEN: &str = "x-agt-test-token";
/// Token synthesized for every other origin in the development profile.
pub const DEV_USER_TOKEN: &str = "x-gatehouse-test-token";

/// Deployment profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Production,
    /// Local testing: bearer parsing is bypassed.
    Development,
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "prod" | "production" => Ok(Self::Production),
            "dev" | "development" => Ok(Self::Development),
            other => Err(format!("unknown profile '{other}'")),
        }
    }
}

/// The credential presented by one call. Never persisted; `Debug` omits the
/// token.
#[derive(Clone)]
pub struct Credential {
    token: String,
    is_agent_origin: bool,
    user_agent: Option<String>,
}

impl Credential {
    pub fn new(token: impl Into<String>, is_agent_origin: bool, user_agent: Option<String>) -> Self {
        Self {
            token: token.into(),
            is_agent_origin,
            user_agent,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_agent_origin(&self) -> bool {
        self.is_agent_origin
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("tokenlen", &self.token.len())
            .field("is_agent_origin", &self.is_agent_origin)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// First value of a metadata entry, if present and valid UTF-8.
pub fn metadata_value<'a>(metadata: &'a HeaderMap, key: &str) -> Option<&'a str> {
    metadata.get(key).and_then(|v| v.to_str().ok())
}

/// Copy of the metadata safe to log: the authorization entry is removed.
pub fn scrubbed(metadata: &HeaderMap) -> HeaderMap {
    let mut copy = metadata.clone();
    copy.remove(AUTHORIZATION);
    copy
}

/// Extract the bearer token of a call.
///
/// The development profile skips parsing and returns a fixed token per
/// origin kind. Otherwise the header must be exactly `Bearer <token>`.
pub fn parse_bearer_token(
    profile: Profile,
    is_agent_origin: bool,
    metadata: &HeaderMap,
) -> Result<String, AuthError> {
    if profile == Profile::Development {
        let token = if is_agent_origin {
            DEV_AGENT_TOKEN
        } else {
            DEV_USER_TOKEN
        };
        return Ok(token.to_string());
    }

    let Some(value) = metadata_value(metadata, MD_AUTHORIZATION) else {
        debug!(metadata = ?scrubbed(metadata), "missing authorization header");
        return Err(AuthError::invalid_authentication());
    };

    let parts: Vec<&str> = value.split(' ').collect();
    match parts.as_slice() {
        ["Bearer", token] if !token.is_empty() => Ok((*token).to_string()),
        _ => {
            debug!(metadata = ?scrubbed(metadata), "authorization header in wrong format");
            Err(AuthError::invalid_authentication())
        }
    }
}
