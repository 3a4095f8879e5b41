//! Command execution client seam.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::ExecError;

pub const OUTPUT_STATUS_SUCCESS: &str = "success";
pub const OUTPUT_STATUS_FAILED: &str = "failed";

/// Where an execution runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecTarget {
    pub org_id: String,
    pub session_id: String,
    pub connection: String,
}

/// The reviewed input to run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecRequest {
    pub script: String,
    pub env_vars: HashMap<String, String>,
    pub client_args: Vec<String>,
}

/// Structured result of one execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecResponse {
    pub session_id: String,
    pub exit_code: Option<i32>,
    pub output: String,
    pub output_status: String,
    pub truncated: bool,
    pub execution_time_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ExecResponse {
    pub fn is_error(&self) -> bool {
        self.output_status != OUTPUT_STATUS_SUCCESS
    }

    /// A failed response with no exit code, for executions that never ran
    /// to completion.
    pub fn failed(session_id: &str, message: impl Into<String>, execution_time_ms: i64) -> Self {
        Self {
            session_id: session_id.to_string(),
            exit_code: None,
            output: String::new(),
            output_status: OUTPUT_STATUS_FAILED.to_string(),
            truncated: false,
            execution_time_ms,
            error_message: Some(message.into()),
        }
    }
}

/// An open execution link for one session.
#[async_trait]
pub trait ExecClient: Send {
    fn session_id(&self) -> &str;

    /// Run to completion, or stop early once `cancel` fires. Resources held
    /// by the execution are released before this returns.
    async fn run(&mut self, request: ExecRequest, cancel: CancellationToken) -> ExecResponse;
}

/// Opens execution clients.
#[async_trait]
pub trait ExecClientFactory: Send + Sync {
    async fn connect(&self, target: &ExecTarget) -> Result<Box<dyn ExecClient>, ExecError>;
}
