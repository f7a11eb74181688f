use std::process::Stdio;

use log::debug;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::utils::error::AppError;

/// Line streams produced by a log source: primary content plus the
/// source's own diagnostic output. Closure of either stream is fatal for
/// the pipeline.
pub struct LogStreams {
    pub lines: mpsc::Receiver<String>,
    pub diagnostics: mpsc::Receiver<String>,
}

/// The log-source surface the pipeline depends on. One implementation
/// follows journalctl; tests feed lines through in-process channels.
pub trait LogSource: Send + 'static {
    fn start(&mut self) -> Result<LogStreams, AppError>;
}

/// Follows a systemd unit's journal via `journalctl -f`.
pub struct JournalSource {
    unit: String,
}

impl JournalSource {
    pub fn new(unit: impl Into<String>) -> Self {
        Self { unit: unit.into() }
    }
}

impl LogSource for JournalSource {
    fn start(&mut self) -> Result<LogStreams, AppError> {
        debug!("attaching to journal for unit {}", self.unit);
        let mut child = Command::new("journalctl")
            .args(["-f", "-u", &self.unit, "-n", "0", "-o", "cat"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AppError::StreamError(format!("failed to start journalctl: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AppError::StreamError("journalctl stdout pipe unavailable".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AppError::StreamError("journalctl stderr pipe unavailable".to_string()))?;

        let (line_tx, lines) = mpsc::channel(64);
        let (diag_tx, diagnostics) = mpsc::channel(8);

        tokio::spawn(forward_lines(stdout, line_tx));
        tokio::spawn(forward_lines(stderr, diag_tx));

        // reap the child once its pipes close
        tokio::spawn(async move {
            let _ = child.wait().await;
        });

        Ok(LogStreams { lines, diagnostics })
    }
}

/// Copies lines from a pipe into a channel until the pipe closes or the
/// receiver goes away. Dropping the sender closes the stream for the
/// consumer.
async fn forward_lines<R>(pipe: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(pipe).lines();
    while let Ok(Some(line)) = reader.next_line().await {
        if tx.send(line).await.is_err() {
            return;
        }
    }
}
