//! Admin-internal credentials.
//!
//! Internal services call in with a shared key (`x-adm-...`) and pass the
//! user they act for as base64(JSON) in the `user-info` metadata entry.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::HeaderMap;
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use sha2::{Digest, Sha256};
use tracing::{error, info};

use super::credential::{MD_USER_INFO, metadata_value};
use super::{AuthError, Credential, CredentialScheme, Identity};
use crate::models::auth::ApiContext;

/// Prefix carried by every admin-internal key.
pub const PREFIX_ADMIN_KEY: &str = "x-adm-";

/// The configured internal key, held as a SHA-256 digest.
#[derive(Clone)]
pub struct AdminKey {
    digest: Option<[u8; 32]>,
}

impl AdminKey {
    /// Accept exactly `key`. Keys without the admin prefix are never
    /// accepted.
    pub fn new(key: &str) -> Self {
        if !key.starts_with(PREFIX_ADMIN_KEY) || key.len() == PREFIX_ADMIN_KEY.len() {
            tracing::warn!("admin key lacks the '{PREFIX_ADMIN_KEY}' prefix, admin api disabled");
            return Self::disabled();
        }
        Self {
            digest: Some(digest(key)),
        }
    }

    /// Reject every key.
    pub fn disabled() -> Self {
        Self { digest: None }
    }

    /// Generate a fresh random key (64 alphanumeric chars after the prefix).
    pub fn generate() -> String {
        let suffix: String = rng()
            .sample_iter(&Alphanumeric)
            .take(64)
            .map(char::from)
            .collect();
        format!("{PREFIX_ADMIN_KEY}{suffix}")
    }

    pub fn authenticate(&self, token: &str) -> bool {
        match &self.digest {
            Some(expected) => {
                token.starts_with(PREFIX_ADMIN_KEY) && constant_time_eq(&digest(token), expected)
            }
            None => false,
        }
    }
}

fn digest(value: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hasher.finalize().into()
}

fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Decode the `user-info` metadata entry.
///
/// Each failing stage is logged distinctly; the caller always sees
/// `Unauthenticated`.
pub fn decode_user_info(metadata: &HeaderMap) -> Result<ApiContext, AuthError> {
    let Some(encoded) = metadata_value(metadata, MD_USER_INFO) else {
        return Err(AuthError::Unauthenticated(
            "invalid authentication, missing system attributes".into(),
        ));
    };
    let json = STANDARD.decode(encoded).map_err(|e| {
        error!("failed decoding (base64) user info: {e}");
        AuthError::Unauthenticated(
            "invalid authentication, failed decoding (base64) user info".into(),
        )
    })?;
    serde_json::from_slice::<ApiContext>(&json).map_err(|e| {
        error!("failed decoding (json) user info: {e}");
        AuthError::Unauthenticated("invalid authentication, failed decoding (json) user info".into())
    })
}

/// Encode user attributes for the `user-info` metadata entry.
pub fn encode_user_info(ctx: &ApiContext) -> Result<String, serde_json::Error> {
    Ok(STANDARD.encode(serde_json::to_vec(ctx)?))
}

/// Admin-internal scheme: claims tokens with the admin prefix.
pub struct AdminScheme {
    key: AdminKey,
}

impl AdminScheme {
    pub fn new(key: AdminKey) -> Self {
        Self { key }
    }
}

#[async_trait]
impl CredentialScheme for AdminScheme {
    fn name(&self) -> &'static str {
        "admin"
    }

    fn matches(&self, credential: &Credential) -> bool {
        credential.token().starts_with(PREFIX_ADMIN_KEY)
    }

    async fn authenticate(
        &self,
        credential: &Credential,
        metadata: &HeaderMap,
    ) -> Result<Identity, AuthError> {
        if !self.key.authenticate(credential.token()) {
            error!(
                tokenlen = credential.token().len(),
                "invalid admin api authentication"
            );
            return Err(AuthError::Unauthenticated(
                "failed to authenticate internal request".into(),
            ));
        }
        let ctx = decode_user_info(metadata)?;
        info!(
            org = %ctx.org_id,
            orgname = %ctx.org_name,
            userid = %ctx.user_id,
            email = %ctx.user_email,
            usergrps = ?ctx.user_groups,
            status = %ctx.user_status,
            "admin api - decoded userinfo"
        );
        Ok(Identity::Admin(ctx))
    }
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;

    use super::*;

    fn alice() -> ApiContext {
        ApiContext {
            org_id: "org-1".into(),
            org_name: "acme".into(),
            user_id: "u-1".into(),
            user_email: "alice@example.com".into(),
            user_name: "Alice".into(),
            user_status: "active".into(),
            user_groups: vec!["admin".into(), "sre".into()],
            slack_id: "U123".into(),
        }
    }

    fn metadata_with(user_info: &str) -> HeaderMap {
        let mut md = HeaderMap::new();
        md.insert(MD_USER_INFO, HeaderValue::from_str(user_info).unwrap());
        md
    }

    #[test]
    fn key_accepts_only_itself() {
        let raw = AdminKey::generate();
        let key = AdminKey::new(&raw);
        assert!(key.authenticate(&raw));
        assert!(!key.authenticate(&format!("{raw}x")));
        assert!(!key.authenticate(&AdminKey::generate()));
    }

    #[test]
    fn key_without_prefix_disables_admin_api() {
        let key = AdminKey::new("not-prefixed");
        assert!(!key.authenticate("not-prefixed"));
        assert!(!AdminKey::disabled().authenticate(PREFIX_ADMIN_KEY));
    }

    #[test]
    fn user_info_round_trips() {
        let encoded = encode_user_info(&alice()).unwrap();
        let decoded = decode_user_info(&metadata_with(&encoded)).unwrap();
        assert_eq!(decoded, alice());
    }

    #[test]
    fn user_info_failures_are_distinguished_but_unauthenticated() {
        let missing = decode_user_info(&HeaderMap::new()).unwrap_err();
        let bad_b64 = decode_user_info(&metadata_with("%%%not-base64")).unwrap_err();
        let bad_json = decode_user_info(&metadata_with(&STANDARD.encode("{nope"))).unwrap_err();

        let messages: Vec<String> = [missing, bad_b64, bad_json]
            .into_iter()
            .map(|e| match e {
                AuthError::Unauthenticated(msg) => msg,
                other => panic!("unexpected: {other:?}"),
            })
            .collect();
        assert!(messages[0].contains("missing system attributes"));
        assert!(messages[1].contains("base64"));
        assert!(messages[2].contains("json"));
    }

    #[tokio::test]
    async fn scheme_resolves_admin_identity() {
        let raw = AdminKey::generate();
        let scheme = AdminScheme::new(AdminKey::new(&raw));
        let cred = Credential::new(raw, false, None);
        let md = metadata_with(&encode_user_info(&alice()).unwrap());

        assert!(scheme.matches(&cred));
        let identity = scheme.authenticate(&cred, &md).await.unwrap();
        assert_eq!(identity, Identity::Admin(alice()));
    }

    #[tokio::test]
    async fn scheme_rejects_wrong_key_before_decoding() {
        let scheme = AdminScheme::new(AdminKey::new(&AdminKey::generate()));
        let cred = Credential::new(AdminKey::generate(), false, None);
        let md = metadata_with(&encode_user_info(&alice()).unwrap());

        let err = scheme.authenticate(&cred, &md).await.unwrap_err();
        match err {
            AuthError::Unauthenticated(msg) => {
                assert_eq!(msg, "failed to authenticate internal request")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
