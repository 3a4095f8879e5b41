//! Session request handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::http::header::LOCATION;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use gatehouse_core::auth::AuthContext;
use gatehouse_core::exec::{ExecOutcome, GateError};
use gatehouse_core::models::auth::ApiContext;
use gatehouse_core::models::session::{Session, SessionFilter, SessionList, SessionStatusHistory};
use tracing::{debug, info};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{
    ExecAcceptedResponse, ExecErrResponse, ExecSessionRequest, ListSessionsQuery,
};
use crate::routes::session_location;

const MSG_SESSION_NOT_FOUND: &str = "session not found";

/// `POST /api/sessions/{session_id}/exec`: run the approved one-time
/// review of a session.
///
/// 200 with the result when the run finishes in time, 400 with the same
/// fields when the command failed, 202 when the deadline passed first.
pub async fn exec_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(session_id): Path<String>,
    body: Bytes,
) -> AppResult<Response> {
    let request = parse_exec_request(&body)?;
    let ctx = auth.get::<ApiContext>()?;
    if let Some(metadata) = &request.metadata {
        debug!(
            session = %session_id,
            keys = ?metadata.keys().collect::<Vec<_>>(),
            "exec request metadata"
        );
    }

    let location = [(LOCATION, session_location(&session_id))];
    match state.gate.execute(ctx, &session_id).await {
        Ok(ExecOutcome::Completed(response)) => {
            let status = if response.is_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::OK
            };
            Ok((status, location, Json(response)).into_response())
        }
        Ok(ExecOutcome::Detached { session_id }) => Ok((
            StatusCode::ACCEPTED,
            location,
            Json(ExecAcceptedResponse {
                session_id,
                exit_code: None,
            }),
        )
            .into_response()),
        Err(GateError::Client(message)) => Ok((
            StatusCode::BAD_REQUEST,
            Json(ExecErrResponse {
                session_id: None,
                message,
            }),
        )
            .into_response()),
        Err(e) => {
            info!(session = %session_id, "exec refused: {e}");
            Err(e.into())
        }
    }
}

fn parse_exec_request(body: &[u8]) -> AppResult<ExecSessionRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ExecSessionRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("failed parsing request payload: {e}")))
}

/// `GET /api/sessions/{session_id}`: a session with its review attached.
pub async fn find_one_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(session_id): Path<String>,
) -> AppResult<Json<Session>> {
    let ctx = auth.get::<ApiContext>()?;
    let mut session = state
        .sessions
        .find_session(&ctx.org_id, &session_id)
        .await?
        .filter(|s| ctx.is_admin() || s.user_id == ctx.user_id)
        .ok_or_else(|| AppError::NotFound(MSG_SESSION_NOT_FOUND.into()))?;

    session.review = state.reviews.find_review_by_session_id(&session.id).await?;
    Ok(Json(session))
}

/// `GET /api/sessions`: sessions of the caller's org, newest first.
///
/// Non-admins only see their own sessions.
pub async fn find_all_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListSessionsQuery>,
) -> AppResult<Json<SessionList>> {
    let ctx = auth.get::<ApiContext>()?;
    let filter = session_filter(ctx, query);
    let list = state.sessions.list_sessions(&ctx.org_id, &filter).await?;
    Ok(Json(list))
}

fn session_filter(ctx: &ApiContext, query: ListSessionsQuery) -> SessionFilter {
    let user = if ctx.is_admin() {
        query.user
    } else {
        if query.user.is_some() {
            debug!(user = %ctx.user_id, "ignoring user filter from non-admin");
        }
        Some(ctx.user_id.clone())
    };

    SessionFilter {
        user,
        connection_type: query.connection_type,
        connection: query.connection,
        start_date: parse_date(query.start_date.as_deref()),
        end_date: parse_date(query.end_date.as_deref()),
        limit: query.limit.and_then(|v| v.parse().ok()),
        offset: query.offset.and_then(|v| v.parse().ok()),
    }
}

fn parse_date(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|d| d.with_timezone(&Utc))
}

/// `GET /api/sessions/{session_id}/status/history`
pub async fn status_history_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(session_id): Path<String>,
) -> AppResult<Json<Vec<SessionStatusHistory>>> {
    let ctx = auth.get::<ApiContext>()?;
    let history = state
        .sessions
        .status_history(&ctx.org_id, &session_id)
        .await?;
    if history.is_empty() {
        return Err(AppError::NotFound(MSG_SESSION_NOT_FOUND.into()));
    }
    Ok(Json(history))
}
