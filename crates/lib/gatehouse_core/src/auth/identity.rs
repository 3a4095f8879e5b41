//! Resolved principals.

use serde::Serialize;

use crate::models::auth::{Agent, ApiContext, ClientKey};

/// The principal a call authenticated as. Exactly one per call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Identity {
    /// Internal admin API acting on behalf of a user.
    Admin(ApiContext),
    Agent(Agent),
    /// Legacy client authenticated by DSN.
    ClientKey(ClientKey),
    /// End user with an access token.
    User(ApiContext),
}

impl Identity {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Admin(_) => "admin",
            Self::Agent(_) => "agent",
            Self::ClientKey(_) => "client_key",
            Self::User(_) => "user",
        }
    }

    pub fn org_id(&self) -> &str {
        match self {
            Self::Admin(ctx) | Self::User(ctx) => &ctx.org_id,
            Self::Agent(agent) => &agent.org_id,
            Self::ClientKey(key) => &key.org_id,
        }
    }
}

/// A type that can be read back out of an [`Identity`].
///
/// `ApiContext` is shared by the admin and user variants.
pub trait IdentityVariant {
    const KIND: &'static str;

    fn from_identity(identity: &Identity) -> Option<&Self>;
}

impl IdentityVariant for ApiContext {
    const KIND: &'static str = "api_context";

    fn from_identity(identity: &Identity) -> Option<&Self> {
        match identity {
            Identity::Admin(ctx) | Identity::User(ctx) => Some(ctx),
            _ => None,
        }
    }
}

impl IdentityVariant for Agent {
    const KIND: &'static str = "agent";

    fn from_identity(identity: &Identity) -> Option<&Self> {
        match identity {
            Identity::Agent(agent) => Some(agent),
            _ => None,
        }
    }
}

impl IdentityVariant for ClientKey {
    const KIND: &'static str = "client_key";

    fn from_identity(identity: &Identity) -> Option<&Self> {
        match identity {
            Identity::ClientKey(key) => Some(key),
            _ => None,
        }
    }
}
