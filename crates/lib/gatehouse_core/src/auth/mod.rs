//! Authentication of inbound calls.
//!
//! A call carries an opaque bearer credential. [`StreamAuthenticator`]
//! classifies it with an ordered [`SchemeChain`] and resolves it to exactly
//! one [`Identity`], which handlers read back through [`AuthContext`].

pub mod admin;
pub mod agents;
pub mod authenticator;
pub mod client_keys;
pub mod context;
pub mod credential;
pub mod identity;
pub mod jwt;
pub mod queries;
pub mod scheme;
pub mod users;

pub use authenticator::StreamAuthenticator;
pub use context::AuthContext;
pub use credential::{Credential, Profile};
pub use identity::{Identity, IdentityVariant};
pub use scheme::{CredentialScheme, SchemeChain};

use thiserror::Error;

/// Caller-facing message for every credential failure.
pub const MSG_INVALID_AUTHENTICATION: &str = "invalid authentication";

/// Authentication errors surfaced to the caller.
///
/// `Unauthenticated` messages are deliberately uniform; validator detail is
/// logged server-side only.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Internal(String),
}

impl AuthError {
    /// The uniform credential rejection.
    pub fn invalid_authentication() -> Self {
        Self::Unauthenticated(MSG_INVALID_AUTHENTICATION.into())
    }
}

/// Errors returned by credential validators (agent, client-key and user
/// lookups, token exchange).
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("Invalid DSN: {0}")]
    InvalidDsn(String),

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Token exchange failed: {0}")]
    Exchange(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),
}
