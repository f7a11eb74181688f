use std::net::IpAddr;

use log::{error, info};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::detection::parser::AttemptParser;
use crate::detection::threshold::ThresholdCounter;
use crate::utils::error::AppError;

/// Feeds journal lines through the parser and counter and enqueues
/// addresses that cross the failure threshold.
pub struct Watcher {
    parser: AttemptParser,
    counter: ThresholdCounter,
}

impl Watcher {
    pub fn new(threshold: u32) -> Self {
        Self {
            parser: AttemptParser::new(),
            counter: ThresholdCounter::new(threshold),
        }
    }

    /// Drains the primary stream until it closes. Parse failures are
    /// logged and skipped; stream closure is fatal. The block-queue sender
    /// is dropped on the way out, closing the queue for the blocker.
    pub async fn run(
        mut self,
        mut lines: mpsc::Receiver<String>,
        block_tx: mpsc::Sender<IpAddr>,
        fatal_tx: mpsc::Sender<AppError>,
        shutdown: CancellationToken,
    ) {
        loop {
            let line = tokio::select! {
                _ = shutdown.cancelled() => return,
                line = lines.recv() => match line {
                    Some(line) => line,
                    None => break,
                },
            };

            let addr = match self.parser.parse(&line) {
                Ok(Some(addr)) => addr,
                Ok(None) => continue,
                Err(err) => {
                    error!("{}", err);
                    continue;
                }
            };

            if self.counter.record(addr) {
                info!("{} reached the failure threshold", addr);
                // backpressure: a full queue throttles further ingestion
                if block_tx.send(addr).await.is_err() {
                    break;
                }
            }
        }

        drop(block_tx);
        let _ = fatal_tx
            .send(AppError::StreamError(
                "journal stdout stream closed".to_string(),
            ))
            .await;
    }
}

/// Collapses the log source's diagnostic stream into a single fatal
/// signal: the first line read, or the stream closing, ends the pipeline.
pub async fn watch_diagnostics(
    mut diagnostics: mpsc::Receiver<String>,
    fatal_tx: mpsc::Sender<AppError>,
    shutdown: CancellationToken,
) {
    let err = tokio::select! {
        _ = shutdown.cancelled() => return,
        line = diagnostics.recv() => match line {
            Some(line) => AppError::StreamError(format!("journal reported: {}", line)),
            None => AppError::StreamError("journal stderr stream closed".to_string()),
        },
    };
    let _ = fatal_tx.send(err).await;
}
