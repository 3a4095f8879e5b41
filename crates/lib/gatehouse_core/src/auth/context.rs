//! Request-scoped authentication context.

use std::sync::Arc;

use http::{Extensions, HeaderMap};

use super::{AuthError, Identity, IdentityVariant};

/// The resolved identity of a call together with the metadata it arrived
/// with.
///
/// Attached to the request extensions once by the authenticator; every
/// later read returns the same instance.
#[derive(Debug, Clone)]
pub struct AuthContext {
    identity: Arc<Identity>,
    metadata: Arc<HeaderMap>,
}

impl AuthContext {
    pub fn new(identity: Identity, metadata: HeaderMap) -> Self {
        Self {
            identity: Arc::new(identity),
            metadata: Arc::new(metadata),
        }
    }

    /// Attach to a request. A context that is already present is kept.
    pub fn attach(self, extensions: &mut Extensions) {
        if extensions.get::<AuthContext>().is_none() {
            extensions.insert(self);
        }
    }

    /// Read the context attached to a request.
    pub fn from_extensions(extensions: &Extensions) -> Result<&AuthContext, AuthError> {
        extensions
            .get::<AuthContext>()
            .ok_or_else(|| AuthError::Internal("authentication context not found".into()))
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The incoming metadata, unchanged.
    pub fn metadata(&self) -> &HeaderMap {
        &self.metadata
    }

    /// Typed view of the identity.
    ///
    /// A mismatch means a handler was mounted behind the wrong scheme; it is
    /// reported as `Unauthenticated` and logged as a defect.
    pub fn get<T: IdentityVariant>(&self) -> Result<&T, AuthError> {
        T::from_identity(&self.identity).ok_or_else(|| {
            tracing::error!(
                expected = T::KIND,
                found = self.identity.kind(),
                "auth context holds an unexpected identity"
            );
            AuthError::Unauthenticated(format!(
                "invalid authentication, missing auth context, type: {}",
                self.identity.kind()
            ))
        })
    }
}
