//! Agent token authentication.

use async_trait::async_trait;
use http::HeaderMap;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::debug;

use super::credential::scrubbed;
use super::queries::{find_agent_by_token_hash, hash_secret};
use super::{AuthError, Credential, CredentialScheme, Identity, ValidatorError};
use crate::models::auth::Agent;

/// Prefix carried by every agent token.
pub const PREFIX_AGENT_TOKEN: &str = "x-agt-";

/// Agent lookup by token.
#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn find_by_token(&self, token: &str) -> Result<Option<Agent>, ValidatorError>;
}

/// Agents stored in PostgreSQL with hashed tokens.
pub struct PgAgentStore {
    pool: PgPool,
}

impl PgAgentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AgentStore for PgAgentStore {
    async fn find_by_token(&self, token: &str) -> Result<Option<Agent>, ValidatorError> {
        find_agent_by_token_hash(&self.pool, &hash_secret(token)).await
    }
}

/// Agent scheme: claims tokens with the agent prefix.
pub struct AgentScheme {
    store: Arc<dyn AgentStore>,
}

impl AgentScheme {
    pub fn new(store: Arc<dyn AgentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CredentialScheme for AgentScheme {
    fn name(&self) -> &'static str {
        "agent"
    }

    fn matches(&self, credential: &Credential) -> bool {
        credential.token().starts_with(PREFIX_AGENT_TOKEN)
    }

    async fn authenticate(
        &self,
        credential: &Credential,
        metadata: &HeaderMap,
    ) -> Result<Identity, AuthError> {
        match self.store.find_by_token(credential.token()).await {
            Ok(Some(agent)) => Ok(Identity::Agent(agent)),
            Ok(None) => {
                debug!(
                    tokenlen = credential.token().len(),
                    metadata = ?scrubbed(metadata),
                    "invalid agent authentication"
                );
                Err(AuthError::invalid_authentication())
            }
            Err(e) => {
                debug!(
                    tokenlen = credential.token().len(),
                    metadata = ?scrubbed(metadata),
                    "invalid agent authentication: {e}"
                );
                Err(AuthError::invalid_authentication())
            }
        }
    }
}
