//! Request and response bodies.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// `POST /api/sessions/{session_id}/exec` body. Every field is optional;
/// the reviewed input is what runs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecSessionRequest {
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub connection: Option<String>,
    #[serde(default)]
    pub client_args: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Returned when the execution client could not be opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecErrResponse {
    pub session_id: Option<String>,
    pub message: String,
}

/// Returned when the deadline passed before the execution finished.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecAcceptedResponse {
    pub session_id: String,
    pub exit_code: Option<i32>,
}

/// Query options of `GET /api/sessions`. Values that fail to parse are
/// ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListSessionsQuery {
    pub user: Option<String>,
    #[serde(rename = "type")]
    pub connection_type: Option<String>,
    pub connection: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}
