//! PostgreSQL store.
//!
//! Ids are UUID columns; a non-UUID id can never match a row, so lookups
//! by such ids return `None` instead of a database error.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{PluginStore, ReviewStore, SessionStore, StoreError};
use crate::models::plugin::{Plugin, PluginConnection};
use crate::models::review::{
    Review, ReviewConnection, ReviewGroup, ReviewOwner, ReviewStatus, ReviewType,
};
use crate::models::session::{
    Session, SessionFilter, SessionList, SessionScript, SessionStatus, SessionStatusHistory,
};

/// Database row for `sessions`.
#[derive(Debug, Clone, sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    org_id: Uuid,
    user_id: String,
    user_email: String,
    user_name: String,
    connection: String,
    connection_type: String,
    verb: String,
    status: SessionStatus,
    script: String,
    labels: serde_json::Value,
    event_size: i64,
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
}

impl SessionRow {
    fn into_session(self) -> Session {
        Session {
            id: self.id.to_string(),
            org_id: self.org_id.to_string(),
            user_id: self.user_id,
            user_email: self.user_email,
            user_name: self.user_name,
            connection: self.connection,
            connection_type: self.connection_type,
            verb: self.verb,
            status: self.status,
            script: SessionScript { data: self.script },
            labels: serde_json::from_value(self.labels).unwrap_or_default(),
            event_size: self.event_size,
            start_date: self.start_date,
            end_date: self.end_date,
            review: None,
        }
    }
}

/// Database row for `reviews`.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ReviewRow {
    id: Uuid,
    org_id: Uuid,
    session_id: Uuid,
    review_type: ReviewType,
    input: String,
    input_env_vars: serde_json::Value,
    input_client_args: serde_json::Value,
    access_duration_secs: Option<i64>,
    status: ReviewStatus,
    revoke_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    created_by_id: String,
    created_by_email: String,
    created_by_name: String,
    connection_id: String,
    connection_name: String,
}

/// Database row for `review_groups`.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ReviewGroupRow {
    id: Uuid,
    group_name: String,
    status: ReviewStatus,
    reviewed_by: Option<serde_json::Value>,
    review_date: Option<DateTime<Utc>>,
}

impl ReviewGroupRow {
    fn into_group(self) -> ReviewGroup {
        ReviewGroup {
            id: self.id.to_string(),
            group: self.group_name,
            status: self.status,
            reviewed_by: self
                .reviewed_by
                .and_then(|v| serde_json::from_value::<ReviewOwner>(v).ok()),
            review_date: self.review_date,
        }
    }
}

fn parse_id(id: &str) -> Option<Uuid> {
    Uuid::parse_str(id).ok()
}

fn require_id(field: &str, id: &str) -> Result<Uuid, StoreError> {
    parse_id(id).ok_or_else(|| StoreError::Invalid(format!("{field} is not a uuid: {id}")))
}

/// Sessions, reviews and plugins in PostgreSQL.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn find_session(
        &self,
        org_id: &str,
        session_id: &str,
    ) -> Result<Option<Session>, StoreError> {
        let (Some(org_id), Some(session_id)) = (parse_id(org_id), parse_id(session_id)) else {
            return Ok(None);
        };
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, org_id, user_id, user_email, user_name, connection,
                   connection_type, verb, status, script, labels, event_size,
                   start_date, end_date
            FROM sessions
            WHERE org_id = $1 AND id = $2
            "#,
        )
        .bind(org_id)
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(SessionRow::into_session))
    }

    async fn list_sessions(
        &self,
        org_id: &str,
        filter: &SessionFilter,
    ) -> Result<SessionList, StoreError> {
        let Some(org_id) = parse_id(org_id) else {
            return Ok(SessionList {
                total: 0,
                has_next_page: false,
                items: Vec::new(),
            });
        };

        const WHERE: &str = r#"
            WHERE org_id = $1
              AND ($2::text IS NULL OR user_id = $2)
              AND ($3::text IS NULL OR connection_type = $3)
              AND ($4::text IS NULL OR connection = $4)
              AND ($5::timestamptz IS NULL OR start_date >= $5)
              AND ($6::timestamptz IS NULL OR start_date <= $6)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM sessions {WHERE}"))
            .bind(org_id)
            .bind(&filter.user)
            .bind(&filter.connection_type)
            .bind(&filter.connection)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            r#"
            SELECT id, org_id, user_id, user_email, user_name, connection,
                   connection_type, verb, status, '' AS script, labels, event_size,
                   start_date, end_date
            FROM sessions {WHERE}
            ORDER BY start_date DESC
            LIMIT $7 OFFSET $8
            "#
        ))
        .bind(org_id)
        .bind(&filter.user)
        .bind(&filter.connection_type)
        .bind(&filter.connection)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(filter.limit())
        .bind(filter.offset())
        .fetch_all(&self.pool)
        .await?;

        let items: Vec<Session> = rows.into_iter().map(SessionRow::into_session).collect();
        let has_next_page = filter.offset() + (items.len() as i64) < total;
        Ok(SessionList {
            total,
            has_next_page,
            items,
        })
    }

    async fn status_history(
        &self,
        org_id: &str,
        session_id: &str,
    ) -> Result<Vec<SessionStatusHistory>, StoreError> {
        let (Some(org_id), Some(session_id)) = (parse_id(org_id), parse_id(session_id)) else {
            return Ok(Vec::new());
        };
        let rows = sqlx::query_as::<_, (Uuid, Uuid, SessionStatus, DateTime<Utc>)>(
            r#"
            SELECT h.id, h.session_id, h.status, h.created_at
            FROM session_status_history h
            JOIN sessions s ON s.id = h.session_id
            WHERE s.org_id = $1 AND h.session_id = $2
            ORDER BY h.created_at
            "#,
        )
        .bind(org_id)
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, session_id, status, created_at)| SessionStatusHistory {
                id: id.to_string(),
                session_id: session_id.to_string(),
                status,
                created_at,
            })
            .collect())
    }
}

#[async_trait]
impl ReviewStore for PgStore {
    async fn find_review_by_session_id(
        &self,
        session_id: &str,
    ) -> Result<Option<Review>, StoreError> {
        let Some(session_id) = parse_id(session_id) else {
            return Ok(None);
        };
        let Some(row) = sqlx::query_as::<_, ReviewRow>(
            r#"
            SELECT id, org_id, session_id, review_type, input, input_env_vars,
                   input_client_args, access_duration_secs, status, revoke_at,
                   created_at, created_by_id, created_by_email, created_by_name,
                   connection_id, connection_name
            FROM reviews
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let groups = sqlx::query_as::<_, ReviewGroupRow>(
            r#"
            SELECT id, group_name, status, reviewed_by, review_date
            FROM review_groups
            WHERE review_id = $1
            ORDER BY group_name
            "#,
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        let input_env_vars: HashMap<String, String> =
            serde_json::from_value(row.input_env_vars).unwrap_or_default();
        let input_client_args: Vec<String> =
            serde_json::from_value(row.input_client_args).unwrap_or_default();

        Ok(Some(Review {
            id: row.id.to_string(),
            org_id: row.org_id.to_string(),
            session_id: row.session_id.to_string(),
            review_type: row.review_type,
            input: row.input,
            input_env_vars,
            input_client_args,
            access_duration_secs: row.access_duration_secs,
            status: row.status,
            revoke_at: row.revoke_at,
            created_at: row.created_at,
            created_by: ReviewOwner {
                id: row.created_by_id,
                email: row.created_by_email,
                name: row.created_by_name,
            },
            connection: ReviewConnection {
                id: row.connection_id,
                name: row.connection_name,
            },
            review_groups: groups.into_iter().map(ReviewGroupRow::into_group).collect(),
        }))
    }

    async fn persist_review(&self, review: &Review) -> Result<(), StoreError> {
        let id = require_id("review id", &review.id)?;
        let org_id = require_id("org id", &review.org_id)?;
        let session_id = require_id("session id", &review.session_id)?;
        let env_vars = serde_json::to_value(&review.input_env_vars)
            .map_err(|e| StoreError::Invalid(format!("input env vars: {e}")))?;
        let client_args = serde_json::to_value(&review.input_client_args)
            .map_err(|e| StoreError::Invalid(format!("input client args: {e}")))?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO reviews (
                id, org_id, session_id, review_type, input, input_env_vars,
                input_client_args, access_duration_secs, status, revoke_at,
                created_at, created_by_id, created_by_email, created_by_name,
                connection_id, connection_name
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (id) DO UPDATE SET
                input = EXCLUDED.input,
                input_env_vars = EXCLUDED.input_env_vars,
                input_client_args = EXCLUDED.input_client_args,
                access_duration_secs = EXCLUDED.access_duration_secs,
                status = EXCLUDED.status,
                revoke_at = EXCLUDED.revoke_at
            "#,
        )
        .bind(id)
        .bind(org_id)
        .bind(session_id)
        .bind(review.review_type)
        .bind(&review.input)
        .bind(env_vars)
        .bind(client_args)
        .bind(review.access_duration_secs)
        .bind(review.status)
        .bind(review.revoke_at)
        .bind(review.created_at)
        .bind(&review.created_by.id)
        .bind(&review.created_by.email)
        .bind(&review.created_by.name)
        .bind(&review.connection.id)
        .bind(&review.connection.name)
        .execute(&mut *tx)
        .await?;

        for group in &review.review_groups {
            let group_id = require_id("review group id", &group.id)?;
            let reviewed_by = group
                .reviewed_by
                .as_ref()
                .map(serde_json::to_value)
                .transpose()
                .map_err(|e| StoreError::Invalid(format!("reviewed by: {e}")))?;
            sqlx::query(
                r#"
                INSERT INTO review_groups (id, review_id, group_name, status, reviewed_by, review_date)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (id) DO UPDATE SET
                    status = EXCLUDED.status,
                    reviewed_by = EXCLUDED.reviewed_by,
                    review_date = EXCLUDED.review_date
                "#,
            )
            .bind(group_id)
            .bind(id)
            .bind(&group.group)
            .bind(group.status)
            .bind(reviewed_by)
            .bind(group.review_date)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl PluginStore for PgStore {
    async fn find_plugin(&self, org_id: &str, name: &str) -> Result<Option<Plugin>, StoreError> {
        let Some(org_uuid) = parse_id(org_id) else {
            return Ok(None);
        };
        let Some(plugin_id) = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM plugins WHERE org_id = $1 AND name = $2",
        )
        .bind(org_uuid)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let connections = sqlx::query_as::<_, (String, String)>(
            "SELECT connection_id, connection_name FROM plugin_connections \
             WHERE plugin_id = $1 ORDER BY connection_name",
        )
        .bind(plugin_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(Plugin {
            id: plugin_id.to_string(),
            org_id: org_id.to_string(),
            name: name.to_string(),
            connections: connections
                .into_iter()
                .map(|(id, name)| PluginConnection { id, name })
                .collect(),
        }))
    }
}
