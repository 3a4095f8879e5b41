//! Credential lookups against PostgreSQL.
//!
//! Secrets (agent tokens, client-key secrets) are stored as SHA-256 hex
//! digests and looked up by digest.

use sha2::{Digest, Sha256};
use sqlx::PgPool;

use super::ValidatorError;
use crate::models::auth::{Agent, ClientKey, Org, User, UserProfile};

/// SHA-256 hash a secret for storage and lookup.
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Find an agent by the digest of its token.
pub async fn find_agent_by_token_hash(
    pool: &PgPool,
    token_hash: &str,
) -> Result<Option<Agent>, ValidatorError> {
    let row = sqlx::query_as::<_, (String, String, String, String, String)>(
        "SELECT id::text, org_id::text, name, mode, status \
         FROM agents WHERE token_hash = $1",
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(id, org_id, name, mode, status)| Agent {
        id,
        org_id,
        name,
        mode,
        status,
    }))
}

/// Find an active client key by name and secret digest.
pub async fn find_active_client_key(
    pool: &PgPool,
    name: &str,
    secret_hash: &str,
) -> Result<Option<ClientKey>, ValidatorError> {
    let row = sqlx::query_as::<_, (String, String, String, bool)>(
        "SELECT id::text, org_id::text, name, active \
         FROM client_keys \
         WHERE name = $1 AND secret_hash = $2 AND active",
    )
    .bind(name)
    .bind(secret_hash)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(id, org_id, name, active)| ClientKey {
        id,
        org_id,
        name,
        active,
    }))
}

/// Resolve an identity-provider subject to the user and its org.
pub async fn find_user_profile_by_subject(
    pool: &PgPool,
    subject: &str,
) -> Result<Option<UserProfile>, ValidatorError> {
    let row = sqlx::query_as::<_, (String, String, String, String, String, String, String)>(
        "SELECT u.id::text, o.id::text, o.name, u.email, u.name, u.status, u.slack_id \
         FROM users u \
         JOIN orgs o ON o.id = u.org_id \
         WHERE u.subject = $1",
    )
    .bind(subject)
    .fetch_optional(pool)
    .await?;

    let Some((user_id, org_id, org_name, email, name, status, slack_id)) = row else {
        return Ok(None);
    };

    let groups = sqlx::query_scalar::<_, String>(
        "SELECT name FROM user_groups WHERE user_id = $1::uuid ORDER BY name",
    )
    .bind(&user_id)
    .fetch_all(pool)
    .await?;

    Ok(Some(UserProfile {
        org: Org {
            id: org_id.clone(),
            name: org_name,
        },
        user: Some(User {
            id: user_id,
            org_id,
            email,
            name,
            status,
            slack_id,
            groups,
        }),
    }))
}
