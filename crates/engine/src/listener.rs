use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UnixStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub type LogCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Follow the engine's out-of-band log stream for as long as the bridge
/// host is alive. Any failure sleeps and retries indefinitely, since the
/// engine may come and go. Lines are forwarded to the callback and are never
/// correlated with in-flight command calls.
pub fn spawn_log_listener(
    path: PathBuf,
    retry_delay: Duration,
    callback: LogCallback,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if *shutdown.borrow() {
                break;
            }
            match UnixStream::connect(&path).await {
                Ok(stream) => {
                    debug!(path = %path.display(), "Engine log stream connected");
                    let mut lines = BufReader::new(stream).lines();
                    loop {
                        tokio::select! {
                            _ = shutdown.changed() => return,
                            line = lines.next_line() => match line {
                                Ok(Some(line)) => {
                                    let text = line.trim();
                                    if !text.is_empty() {
                                        callback(text);
                                    }
                                }
                                Ok(None) => break,
                                Err(e) => {
                                    warn!(error = %e, "Engine log read error");
                                    break;
                                }
                            }
                        }
                    }
                }
                Err(_) => {
                    // Log socket not up yet; keep waiting.
                }
            }
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(retry_delay) => {}
            }
        }
        debug!(path = %path.display(), "Engine log listener stopped");
    })
}
