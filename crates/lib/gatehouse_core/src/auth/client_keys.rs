//! Client-key (DSN) authentication for legacy client builds.
//!
//! Older SDK and sidecar builds present a DSN of the form
//! `grpc[s]://<name>:<secret>@<host>[:<port>]` instead of a prefixed token.
//! They are recognized by their user agent.

use std::sync::Arc;

use async_trait::async_trait;
use http::HeaderMap;
use sqlx::PgPool;
use tracing::{debug, error};
use url::Url;

use super::credential::scrubbed;
use super::queries::{find_active_client_key, hash_secret};
use super::{AuthError, Credential, CredentialScheme, Identity, ValidatorError};
use crate::models::auth::ClientKey;

/// User-agent prefix of legacy clients (`gateagent/sdk`, `gateagent/sidecar`).
pub const LEGACY_USER_AGENT_PREFIX: &str = "gateagent/s";

/// The parts of a DSN needed for lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDsn {
    pub name: String,
    pub secret_hash: String,
    pub address: String,
}

/// Parse a client DSN. The secret is hashed immediately.
pub fn parse_dsn(dsn: &str) -> Result<ParsedDsn, ValidatorError> {
    let url = Url::parse(dsn).map_err(|e| ValidatorError::InvalidDsn(e.to_string()))?;
    if !matches!(url.scheme(), "grpc" | "grpcs") {
        return Err(ValidatorError::InvalidDsn(format!(
            "unsupported scheme '{}'",
            url.scheme()
        )));
    }
    let name = url.username();
    let secret = url.password().unwrap_or_default();
    if name.is_empty() || secret.is_empty() {
        return Err(ValidatorError::InvalidDsn("missing key name or secret".into()));
    }
    let host = url
        .host_str()
        .ok_or_else(|| ValidatorError::InvalidDsn("missing host".into()))?;
    let address = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    Ok(ParsedDsn {
        name: name.to_string(),
        secret_hash: hash_secret(secret),
        address,
    })
}

/// Client-key validation.
///
/// `Err` means the DSN could not be validated at all; `Ok(None)` means it
/// is well formed but unknown or inactive.
#[async_trait]
pub trait ClientKeyStore: Send + Sync {
    async fn validate_dsn(&self, dsn: &str) -> Result<Option<ClientKey>, ValidatorError>;
}

/// Client keys stored in PostgreSQL.
pub struct PgClientKeyStore {
    pool: PgPool,
}

impl PgClientKeyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClientKeyStore for PgClientKeyStore {
    async fn validate_dsn(&self, dsn: &str) -> Result<Option<ClientKey>, ValidatorError> {
        let parsed = parse_dsn(dsn)?;
        find_active_client_key(&self.pool, &parsed.name, &parsed.secret_hash).await
    }
}

/// Client-key scheme: claims calls from legacy user agents.
pub struct ClientKeyScheme {
    store: Arc<dyn ClientKeyStore>,
}

impl ClientKeyScheme {
    pub fn new(store: Arc<dyn ClientKeyStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CredentialScheme for ClientKeyScheme {
    fn name(&self) -> &'static str {
        "client_key"
    }

    fn matches(&self, credential: &Credential) -> bool {
        credential
            .user_agent()
            .is_some_and(|ua| ua.starts_with(LEGACY_USER_AGENT_PREFIX))
    }

    async fn authenticate(
        &self,
        credential: &Credential,
        metadata: &HeaderMap,
    ) -> Result<Identity, AuthError> {
        match self.store.validate_dsn(credential.token()).await {
            Ok(Some(key)) => Ok(Identity::ClientKey(key)),
            Ok(None) => {
                debug!(
                    tokenlen = credential.token().len(),
                    metadata = ?scrubbed(metadata),
                    "invalid client key authentication"
                );
                Err(AuthError::invalid_authentication())
            }
            Err(e) => {
                error!("failed validating dsn authentication, err={e}");
                Err(AuthError::Internal("failed validating dsn".into()))
            }
        }
    }
}
