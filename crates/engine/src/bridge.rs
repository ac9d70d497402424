use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axon_core::{EngineError, Error, Fault, FaultHub, FaultKind, Result};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::{timeout, Instant};
use tracing::debug;

const READ_CHUNK: usize = 4096;

/// Request/response client for the external engine's command socket.
///
/// Every call opens a fresh connection, writes one newline-terminated JSON
/// message, and reads until a complete JSON value arrives or the deadline
/// elapses. Connections are never shared between concurrent calls, so a
/// busy endpoint is an expected fault rather than a bug.
pub struct EngineBridge {
    command_path: PathBuf,
    call_timeout: Duration,
    faults: Arc<FaultHub>,
}

impl EngineBridge {
    pub fn new(command_path: PathBuf, call_timeout: Duration, faults: Arc<FaultHub>) -> Self {
        Self {
            command_path,
            call_timeout,
            faults,
        }
    }

    pub fn command_path(&self) -> &Path {
        &self.command_path
    }

    pub async fn call(&self, message: &Value) -> Result<Value> {
        self.call_with_timeout(message, self.call_timeout).await
    }

    /// One exchange over a fresh channel. The stream is dropped on every
    /// exit path, including faults.
    pub async fn call_with_timeout(&self, message: &Value, call_timeout: Duration) -> Result<Value> {
        let deadline = Instant::now() + call_timeout;

        let mut stream = match UnixStream::connect(&self.command_path).await {
            Ok(s) => s,
            Err(e) => return Err(self.fault(classify_connect_error(e, &self.command_path))),
        };
        debug!(path = %self.command_path.display(), "Engine channel opened");

        let mut payload = serde_json::to_vec(message)?;
        payload.push(b'\n');
        if let Err(e) = stream.write_all(&payload).await {
            return Err(self.fault(EngineError::Channel(e)));
        }
        if let Err(e) = stream.flush().await {
            return Err(self.fault(EngineError::Channel(e)));
        }

        let mut buf: Vec<u8> = Vec::with_capacity(READ_CHUNK);
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.fault(EngineError::Timeout(call_timeout)));
            }
            let n = match timeout(remaining, stream.read(&mut chunk)).await {
                Ok(Ok(n)) => n,
                Ok(Err(e)) => return Err(self.fault(EngineError::Channel(e))),
                Err(_) => return Err(self.fault(EngineError::Timeout(call_timeout))),
            };
            if n == 0 {
                // Peer closed: whatever arrived is the whole response.
                return self.parse_response(&buf);
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
                    return Ok(value);
                }
            }
        }
    }

    fn parse_response(&self, buf: &[u8]) -> Result<Value> {
        let text = String::from_utf8_lossy(buf);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(self.fault(EngineError::Malformed("empty response".to_string())));
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => Ok(value),
            Err(_) => {
                let preview: String = trimmed.chars().take(200).collect();
                Err(self.fault(EngineError::Malformed(preview)))
            }
        }
    }

    /// Publish the fault to the hub and convert it into an error result.
    fn fault(&self, err: EngineError) -> Error {
        let kind = match &err {
            EngineError::Unreachable(_) => Some(FaultKind::EngineUnreachable),
            EngineError::Busy(_) => Some(FaultKind::EngineBusy),
            EngineError::Timeout(_) => Some(FaultKind::EngineTimeout),
            EngineError::Malformed(_) => Some(FaultKind::MalformedResponse),
            EngineError::Channel(_) => None,
        };
        if let Some(kind) = kind {
            self.faults.publish(Fault::new(kind, err.to_string()));
        }
        Error::Engine(err)
    }
}

/// Connect-time errors carry the distinction the caller branches on:
/// a missing socket means the engine is not running, a refused connection
/// means the endpoint exists but cannot take this call right now.
fn classify_connect_error(e: std::io::Error, path: &Path) -> EngineError {
    match e.kind() {
        std::io::ErrorKind::NotFound => EngineError::Unreachable(path.display().to_string()),
        std::io::ErrorKind::ConnectionRefused => EngineError::Busy(path.display().to_string()),
        _ => EngineError::Channel(e),
    }
}
