use std::collections::HashSet;
use std::net::IpAddr;

use log::{debug, info};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::prevention::firewall::{BlockOutcome, FilterClient};
use crate::utils::error::AppError;

/// Consumes the block queue in arrival order and applies each address to
/// the packet filter. Addresses blocked earlier in this run are skipped
/// without touching the filter.
pub struct Blocker<F: FilterClient> {
    filter: F,
    blocked: HashSet<IpAddr>,
}

impl<F: FilterClient> Blocker<F> {
    pub fn new(filter: F) -> Self {
        Self {
            filter,
            blocked: HashSet::new(),
        }
    }

    /// Runs until the queue closes, the shutdown token fires, or a block
    /// action fails. Failures other than the filter's own "already added"
    /// signal are fatal and stop consumption.
    pub async fn run(
        mut self,
        mut queue: mpsc::Receiver<IpAddr>,
        fatal_tx: mpsc::Sender<AppError>,
        shutdown: CancellationToken,
    ) {
        loop {
            let addr = tokio::select! {
                _ = shutdown.cancelled() => return,
                addr = queue.recv() => match addr {
                    Some(addr) => addr,
                    // queue closed by the watcher, which reports the error
                    None => return,
                },
            };

            if self.blocked.contains(&addr) {
                debug!("{} is already blocked, skipping", addr);
                continue;
            }

            info!("blocking ip {}", addr);
            match self.filter.block_ip(addr) {
                Ok(BlockOutcome::Added) => {
                    self.blocked.insert(addr);
                }
                Ok(BlockOutcome::AlreadyPresent) => {
                    debug!("{} was already in the filter set", addr);
                    self.blocked.insert(addr);
                }
                Err(err) => {
                    let _ = fatal_tx.send(err).await;
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Scripted filter double recording every external call.
    struct MockFilter {
        calls: Arc<Mutex<Vec<IpAddr>>>,
        outcomes: Arc<Mutex<Vec<Result<BlockOutcome, AppError>>>>,
    }

    impl MockFilter {
        fn new(outcomes: Vec<Result<BlockOutcome, AppError>>) -> (Self, Arc<Mutex<Vec<IpAddr>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            let filter = Self {
                calls: Arc::clone(&calls),
                outcomes: Arc::new(Mutex::new(outcomes)),
            };
            (filter, calls)
        }
    }

    impl FilterClient for MockFilter {
        fn ensure_available(&self) -> Result<(), AppError> {
            Ok(())
        }

        fn ensure_set(&self) -> Result<(), AppError> {
            Ok(())
        }

        fn ensure_rule(&self) -> Result<(), AppError> {
            Ok(())
        }

        fn block_ip(&mut self, addr: IpAddr) -> Result<BlockOutcome, AppError> {
            self.calls.lock().unwrap().push(addr);
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.is_empty() {
                Ok(BlockOutcome::Added)
            } else {
                outcomes.remove(0)
            }
        }
    }

    fn addr(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_blocks_each_address_once() {
        let (filter, calls) = MockFilter::new(vec![]);
        let (block_tx, block_rx) = mpsc::channel(10);
        let (fatal_tx, _fatal_rx) = mpsc::channel(1);
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(Blocker::new(filter).run(block_rx, fatal_tx, shutdown));

        block_tx.send(addr("10.0.0.5")).await.unwrap();
        block_tx.send(addr("10.0.0.6")).await.unwrap();
        block_tx.send(addr("10.0.0.5")).await.unwrap();
        drop(block_tx);
        handle.await.unwrap();

        assert_eq!(
            *calls.lock().unwrap(),
            vec![addr("10.0.0.5"), addr("10.0.0.6")]
        );
    }

    #[tokio::test]
    async fn test_already_present_counts_as_blocked() {
        let (filter, calls) = MockFilter::new(vec![Ok(BlockOutcome::AlreadyPresent)]);
        let (block_tx, block_rx) = mpsc::channel(10);
        let (fatal_tx, mut fatal_rx) = mpsc::channel(1);
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(Blocker::new(filter).run(block_rx, fatal_tx, shutdown));

        block_tx.send(addr("10.0.0.5")).await.unwrap();
        block_tx.send(addr("10.0.0.5")).await.unwrap();
        drop(block_tx);
        handle.await.unwrap();

        // one external call, no fatal error
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert!(fatal_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_block_failure_is_fatal_and_stops_consumption() {
        let (filter, calls) = MockFilter::new(vec![Err(AppError::BlockActionError(
            "ipset v7.15: permission denied".to_string(),
        ))]);
        let (block_tx, block_rx) = mpsc::channel(10);
        let (fatal_tx, mut fatal_rx) = mpsc::channel(1);
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(Blocker::new(filter).run(block_rx, fatal_tx, shutdown));

        block_tx.send(addr("10.0.0.5")).await.unwrap();
        block_tx.send(addr("10.0.0.6")).await.unwrap();

        let err = fatal_rx.recv().await.unwrap();
        assert!(matches!(err, AppError::BlockActionError(_)));
        handle.await.unwrap();

        // the second address is never attempted
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_stops_the_blocker() {
        let (filter, calls) = MockFilter::new(vec![]);
        let (_block_tx, block_rx) = mpsc::channel::<IpAddr>(10);
        let (fatal_tx, _fatal_rx) = mpsc::channel(1);
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(Blocker::new(filter).run(block_rx, fatal_tx, shutdown.clone()));
        shutdown.cancel();
        handle.await.unwrap();

        assert!(calls.lock().unwrap().is_empty());
    }
}
