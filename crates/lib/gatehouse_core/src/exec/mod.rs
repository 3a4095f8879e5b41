//! Review-gated command execution.

pub mod client;
pub mod gate;
pub mod lock;
pub mod process;

use thiserror::Error;

pub use client::{ExecClient, ExecClientFactory, ExecRequest, ExecResponse, ExecTarget};
pub use gate::{DEFAULT_EXEC_DEADLINE, ExecGate, ExecOutcome, GateError};
pub use lock::{ExecLockGuard, ExecLockRegistry};
pub use process::{ConnectionCommand, ProcessExecClientFactory};

/// Execution client errors.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("connection {0} is not configured for execution")]
    UnknownConnection(String),

    #[error("Invalid connections file: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
