//! End-user access tokens.
//!
//! The token is exchanged for an identity-provider subject, which is then
//! resolved to a provisioned user.

use std::sync::Arc;

use async_trait::async_trait;
use http::HeaderMap;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::debug;
use url::Url;

use super::jwt::verify_access_token;
use super::queries::find_user_profile_by_subject;
use super::{AuthError, Credential, CredentialScheme, Identity, ValidatorError};
use crate::models::auth::UserProfile;

/// Exchange an access token for a subject identifier.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange(&self, token: &str) -> Result<String, ValidatorError>;
}

/// Resolve a subject to a user profile.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_subject(&self, subject: &str) -> Result<Option<UserProfile>, ValidatorError>;
}

/// Verifies HS256 tokens locally.
pub struct JwtTokenExchanger {
    secret: Vec<u8>,
}

impl JwtTokenExchanger {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

#[async_trait]
impl TokenExchanger for JwtTokenExchanger {
    async fn exchange(&self, token: &str) -> Result<String, ValidatorError> {
        verify_access_token(token, &self.secret).map(|claims| claims.sub)
    }
}

#[derive(Deserialize)]
struct UserInfo {
    sub: String,
}

/// Calls an OIDC userinfo endpoint with the token and reads `sub`.
pub struct UserInfoExchanger {
    client: reqwest::Client,
    url: Url,
}

impl UserInfoExchanger {
    pub fn new(url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl TokenExchanger for UserInfoExchanger {
    async fn exchange(&self, token: &str) -> Result<String, ValidatorError> {
        let info = self
            .client
            .get(self.url.clone())
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?
            .json::<UserInfo>()
            .await?;
        if info.sub.is_empty() {
            return Err(ValidatorError::TokenError("userinfo returned empty subject".into()));
        }
        Ok(info.sub)
    }
}

/// Users stored in PostgreSQL.
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_subject(&self, subject: &str) -> Result<Option<UserProfile>, ValidatorError> {
        find_user_profile_by_subject(&self.pool, subject).await
    }
}

/// Default scheme: claims every credential.
pub struct UserTokenScheme {
    exchanger: Arc<dyn TokenExchanger>,
    users: Arc<dyn UserStore>,
}

impl UserTokenScheme {
    pub fn new(exchanger: Arc<dyn TokenExchanger>, users: Arc<dyn UserStore>) -> Self {
        Self { exchanger, users }
    }
}

#[async_trait]
impl CredentialScheme for UserTokenScheme {
    fn name(&self) -> &'static str {
        "user_token"
    }

    fn matches(&self, _credential: &Credential) -> bool {
        true
    }

    async fn authenticate(
        &self,
        credential: &Credential,
        _metadata: &HeaderMap,
    ) -> Result<Identity, AuthError> {
        let subject = self
            .exchanger
            .exchange(credential.token())
            .await
            .map_err(|e| {
                debug!("failed verifying access token, reason={e}");
                AuthError::invalid_authentication()
            })?;

        let profile = match self.users.find_by_subject(&subject).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                debug!(subject = %subject, "no user provisioned for subject");
                return Err(AuthError::invalid_authentication());
            }
            Err(e) => {
                debug!(subject = %subject, "failed resolving user, reason={e}");
                return Err(AuthError::invalid_authentication());
            }
        };

        profile
            .to_api_context()
            .map(Identity::User)
            .ok_or_else(AuthError::invalid_authentication)
    }
}
