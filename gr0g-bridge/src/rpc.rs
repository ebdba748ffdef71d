//! Client for the control daemon's local RPC socket.
//!
//! Each call opens a fresh connection, writes one framed [`Request`] and
//! reads one framed [`Response`]; nothing is shared between calls. The
//! whole exchange runs under a bounded timeout so a hung daemon cannot
//! wedge the protocol surface.

use std::path::PathBuf;
use std::time::Duration;

use tokio::net::UnixStream;

use gr0g_proto::async_io::{read_frame, write_frame};
use gr0g_proto::ble::commands;
use gr0g_proto::{Frame, Request, Response, Status, MSG_RESPONSE};

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("socket i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed backend reply: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected frame type {0:#06x}")]
    UnexpectedFrame(u16),
    #[error("backend rejected command: {0}")]
    Rejected(String),
    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone)]
pub struct RpcClient {
    socket: PathBuf,
    timeout: Duration,
}

impl RpcClient {
    pub fn new(socket: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            socket: socket.into(),
            timeout,
        }
    }

    /// Fetch a fresh machine status snapshot
    pub async fn status(&self) -> Result<Status, RpcError> {
        let data = self.call(Request::new(commands::STATUS)).await?;
        Ok(serde_json::from_value(data)?)
    }

    /// Submit a command with its arguments, returning the daemon's result
    pub async fn cmd(
        &self,
        cmd: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, RpcError> {
        self.call(Request::with_args(cmd, args)).await
    }

    async fn call(&self, request: Request) -> Result<serde_json::Value, RpcError> {
        match tokio::time::timeout(self.timeout, self.exchange(&request)).await {
            Ok(result) => result,
            Err(_) => Err(RpcError::Timeout(self.timeout)),
        }
    }

    async fn exchange(&self, request: &Request) -> Result<serde_json::Value, RpcError> {
        let mut stream = UnixStream::connect(&self.socket).await?;

        write_frame(&mut stream, &Frame::request(request)?).await?;
        let reply = read_frame(&mut stream).await?;
        if reply.msg_type != MSG_RESPONSE {
            return Err(RpcError::UnexpectedFrame(reply.msg_type));
        }

        let response: Response = serde_json::from_slice(&reply.payload)?;
        if response.ok {
            Ok(response.data.unwrap_or(serde_json::Value::Null))
        } else {
            Err(RpcError::Rejected(
                response.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}
