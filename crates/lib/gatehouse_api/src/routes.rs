//! Route paths.

pub const GET_API_WHOAMI: &str = "/api/whoami";
pub const GET_API_SESSIONS: &str = "/api/sessions";
pub const GET_API_SESSIONS_ID: &str = "/api/sessions/{session_id}";
pub const GET_API_SESSIONS_ID_STATUS_HISTORY: &str = "/api/sessions/{session_id}/status/history";
pub const POST_API_SESSIONS_ID_EXEC: &str = "/api/sessions/{session_id}/exec";

/// Where the result of a session can be polled.
pub fn session_location(session_id: &str) -> String {
    format!("/api/sessions/{session_id}")
}
