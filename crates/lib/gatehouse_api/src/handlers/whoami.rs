//! Identity introspection.

use axum::{Extension, Json};
use gatehouse_core::auth::{AuthContext, Identity};

/// `GET /api/whoami`: the identity the call authenticated as.
pub async fn whoami_handler(Extension(auth): Extension<AuthContext>) -> Json<Identity> {
    Json(auth.identity().clone())
}
