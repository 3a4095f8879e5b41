//! Local child-process execution.
//!
//! Each connection maps to a command line. The reviewed script is written
//! to the child's stdin, review env vars are set on the child and client
//! args are appended to the configured args.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::client::{
    ExecClient, ExecClientFactory, ExecRequest, ExecResponse, ExecTarget, OUTPUT_STATUS_FAILED,
    OUTPUT_STATUS_SUCCESS,
};
use super::ExecError;

/// Default cap on captured output (1 MiB).
pub const DEFAULT_OUTPUT_LIMIT: usize = 1024 * 1024;

/// Command line for one connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionCommand {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Opens process clients for configured connections.
#[derive(Debug, Clone)]
pub struct ProcessExecClientFactory {
    connections: HashMap<String, ConnectionCommand>,
    output_limit: usize,
}

impl ProcessExecClientFactory {
    pub fn new(connections: HashMap<String, ConnectionCommand>) -> Self {
        Self {
            connections,
            output_limit: DEFAULT_OUTPUT_LIMIT,
        }
    }

    pub fn with_output_limit(mut self, limit: usize) -> Self {
        self.output_limit = limit;
        self
    }

    /// Load a JSON object of connection name to `{command, args}`.
    pub fn from_file(path: &Path) -> Result<Self, ExecError> {
        let raw = std::fs::read_to_string(path)?;
        let connections: HashMap<String, ConnectionCommand> = serde_json::from_str(&raw)
            .map_err(|e| ExecError::InvalidConfig(format!("{}: {e}", path.display())))?;
        info!(
            path = %path.display(),
            count = connections.len(),
            "loaded connection commands"
        );
        Ok(Self::new(connections))
    }

    pub fn connection_names(&self) -> impl Iterator<Item = &str> {
        self.connections.keys().map(String::as_str)
    }
}

impl Default for ProcessExecClientFactory {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

#[async_trait]
impl ExecClientFactory for ProcessExecClientFactory {
    async fn connect(&self, target: &ExecTarget) -> Result<Box<dyn ExecClient>, ExecError> {
        let command = self
            .connections
            .get(&target.connection)
            .cloned()
            .ok_or_else(|| ExecError::UnknownConnection(target.connection.clone()))?;
        debug!(
            session = %target.session_id,
            connection = %target.connection,
            "opened process client"
        );
        Ok(Box::new(ProcessExecClient {
            session_id: target.session_id.clone(),
            command,
            output_limit: self.output_limit,
        }))
    }
}

/// Runs one session's script as a child process.
pub struct ProcessExecClient {
    session_id: String,
    command: ConnectionCommand,
    output_limit: usize,
}

/// Read at most `limit` bytes of `reader`, draining the rest so the child
/// never blocks on a full pipe. The flag reports whether anything was dropped.
async fn read_capped<R: AsyncRead + Unpin>(reader: Option<R>, limit: usize) -> (Vec<u8>, bool) {
    let Some(mut reader) = reader else {
        return (Vec::new(), false);
    };
    let mut buf = Vec::new();
    if let Err(e) = (&mut reader).take(limit as u64).read_to_end(&mut buf).await {
        debug!("failed reading command output: {e}");
        return (buf, false);
    }
    let dropped = tokio::io::copy(&mut reader, &mut tokio::io::sink())
        .await
        .unwrap_or(0);
    (buf, dropped > 0)
}

impl ProcessExecClient {
    fn capture(&self, stdout: (Vec<u8>, bool), stderr: (Vec<u8>, bool)) -> (String, bool) {
        let (mut combined, stdout_dropped) = stdout;
        let (stderr, stderr_dropped) = stderr;
        combined.extend_from_slice(&stderr);
        let truncated = stdout_dropped || stderr_dropped || combined.len() > self.output_limit;
        combined.truncate(self.output_limit);
        (String::from_utf8_lossy(&combined).into_owned(), truncated)
    }
}

#[async_trait]
impl ExecClient for ProcessExecClient {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn run(&mut self, request: ExecRequest, cancel: CancellationToken) -> ExecResponse {
        let started = Instant::now();
        let elapsed_ms = |started: Instant| started.elapsed().as_millis() as i64;

        let mut cmd = tokio::process::Command::new(&self.command.command);
        cmd.args(&self.command.args)
            .args(&request.client_args)
            .envs(&request.env_vars)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(session = %self.session_id, "failed spawning '{}': {e}", self.command.command);
                return ExecResponse::failed(
                    &self.session_id,
                    format!("failed starting '{}': {e}", self.command.command),
                    elapsed_ms(started),
                );
            }
        };

        let stdin = child.stdin.take();
        let script = request.script;
        let feed = async move {
            if let Some(mut stdin) = stdin
                && let Err(e) = stdin.write_all(script.as_bytes()).await
            {
                debug!("child closed stdin early: {e}");
            }
        };

        let stdout = read_capped(child.stdout.take(), self.output_limit);
        let stderr = read_capped(child.stderr.take(), self.output_limit);

        // Dropping the child on cancellation kills it.
        let (stdout, stderr, status) = tokio::select! {
            (_, stdout, stderr, status) = async { tokio::join!(feed, stdout, stderr, child.wait()) } => {
                (stdout, stderr, status)
            }
            _ = cancel.cancelled() => {
                info!(session = %self.session_id, "execution cancelled");
                return ExecResponse::failed(&self.session_id, "execution cancelled", elapsed_ms(started));
            }
        };

        let status = match status {
            Ok(status) => status,
            Err(e) => {
                return ExecResponse::failed(
                    &self.session_id,
                    format!("failed waiting for command: {e}"),
                    elapsed_ms(started),
                );
            }
        };

        let (text, truncated) = self.capture(stdout, stderr);
        let exit_code = status.code();
        let success = status.success();
        ExecResponse {
            session_id: self.session_id.clone(),
            exit_code,
            error_message: (!success).then(|| match exit_code {
                Some(code) => format!("command exited with code {code}"),
                None => "command terminated by signal".to_string(),
            }),
            output: text,
            output_status: if success {
                OUTPUT_STATUS_SUCCESS
            } else {
                OUTPUT_STATUS_FAILED
            }
            .to_string(),
            truncated,
            execution_time_ms: elapsed_ms(started),
        }
    }
}
