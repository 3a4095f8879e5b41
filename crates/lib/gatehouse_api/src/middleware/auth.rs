//! Authentication middleware.
//!
//! Every protected call passes through the stream authenticator before any
//! handler runs. The resolved identity is attached to the request
//! extensions as an [`AuthContext`].

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use gatehouse_core::auth::AuthContext;

use crate::AppState;
use crate::error::AppError;

/// Axum middleware: authenticates the call from its headers and attaches
/// the resulting [`AuthContext`]. Rejected calls never reach the handler.
pub async fn authenticate_call(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = state
        .authenticator
        .authenticate(Some(request.headers()))
        .await?;

    let metadata = request.headers().clone();
    AuthContext::new(identity, metadata).attach(request.extensions_mut());

    Ok(next.run(request).await)
}
