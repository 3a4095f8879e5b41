//! Credential schemes and their precedence.

use std::sync::Arc;

use async_trait::async_trait;
use http::HeaderMap;

use super::{AuthError, Credential, Identity};

/// One way of turning a credential into an identity.
#[async_trait]
pub trait CredentialScheme: Send + Sync {
    /// Scheme identifier for logging.
    fn name(&self) -> &'static str;

    /// Whether this scheme claims the credential.
    fn matches(&self, credential: &Credential) -> bool;

    /// Validate a claimed credential. Called only after `matches` returned
    /// true; a rejection is final.
    async fn authenticate(
        &self,
        credential: &Credential,
        metadata: &HeaderMap,
    ) -> Result<Identity, AuthError>;
}

/// Ordered list of schemes. The first scheme that matches decides.
pub struct SchemeChain {
    schemes: Vec<Arc<dyn CredentialScheme>>,
}

impl SchemeChain {
    /// Create a chain from schemes in precedence order.
    pub fn new(schemes: Vec<Arc<dyn CredentialScheme>>) -> Self {
        Self { schemes }
    }

    /// Scheme names in precedence order.
    pub fn names(&self) -> Vec<&'static str> {
        self.schemes.iter().map(|s| s.name()).collect()
    }

    /// The scheme that claims a credential, if any.
    pub fn classify(&self, credential: &Credential) -> Option<&Arc<dyn CredentialScheme>> {
        self.schemes.iter().find(|s| s.matches(credential))
    }

    /// Classify and validate. An unclaimed credential is rejected.
    pub async fn resolve(
        &self,
        credential: &Credential,
        metadata: &HeaderMap,
    ) -> Result<Identity, AuthError> {
        let Some(scheme) = self.classify(credential) else {
            tracing::debug!(tokenlen = credential.token().len(), "no credential scheme matched");
            return Err(AuthError::invalid_authentication());
        };
        tracing::debug!(
            scheme = scheme.name(),
            tokenlen = credential.token().len(),
            "credential classified"
        );
        scheme.authenticate(credential, metadata).await
    }
}
