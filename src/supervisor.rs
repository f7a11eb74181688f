use log::{error, info};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::monitor::journal::LogSource;
use crate::monitor::watcher::{self, Watcher};
use crate::prevention::blocker::Blocker;
use crate::prevention::firewall::FilterClient;
use crate::utils::error::AppError;

/// Wires the watcher, blocker and fatal-error channel together and runs
/// the pipeline until the first unrecoverable error or a shutdown signal.
pub struct Supervisor<S: LogSource, F: FilterClient> {
    config: Config,
    source: S,
    filter: F,
}

impl<S: LogSource, F: FilterClient> Supervisor<S, F> {
    pub fn new(config: Config, source: S, filter: F) -> Self {
        Self {
            config,
            source,
            filter,
        }
    }

    /// Startup preconditions against the packet filter. Any failure aborts
    /// before the pipeline starts.
    fn prepare_filter(&self) -> Result<(), AppError> {
        self.filter.ensure_available()?;
        self.filter.ensure_set()?;
        self.filter.ensure_rule()?;
        Ok(())
    }

    /// Runs the pipeline. Returns `Ok(())` only when stopped by the
    /// shutdown token; the first error on the fatal channel is logged and
    /// returned so the process exits non-zero.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), AppError> {
        self.prepare_filter()?;

        let streams = self.source.start()?;
        let (block_tx, block_rx) = mpsc::channel(self.config.queue_capacity);
        let (fatal_tx, mut fatal_rx) = mpsc::channel(1);

        tokio::spawn(Watcher::new(self.config.threshold).run(
            streams.lines,
            block_tx,
            fatal_tx.clone(),
            shutdown.clone(),
        ));
        tokio::spawn(watcher::watch_diagnostics(
            streams.diagnostics,
            fatal_tx.clone(),
            shutdown.clone(),
        ));
        tokio::spawn(Blocker::new(self.filter).run(block_rx, fatal_tx, shutdown.clone()));

        info!("bruteguard running...");

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("shutdown signal received, stopping");
                Ok(())
            }
            err = fatal_rx.recv() => {
                let err = err.unwrap_or_else(|| {
                    AppError::StreamError("fatal-error channel closed".to_string())
                });
                error!("{}", err);
                shutdown.cancel();
                Err(err)
            }
        }
    }
}
