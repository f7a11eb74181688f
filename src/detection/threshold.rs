use std::collections::HashMap;
use std::net::IpAddr;

/// Per-address failed-attempt counter with a fire-once threshold.
///
/// Counts are held for the life of the process; there is no time-based
/// decay, so an address that never reaches the threshold keeps its count
/// indefinitely.
#[derive(Debug)]
pub struct ThresholdCounter {
    threshold: u32,
    attempts: HashMap<IpAddr, u32>,
}

impl ThresholdCounter {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            attempts: HashMap::new(),
        }
    }

    /// Records one failed attempt for `addr`. Returns true when the new
    /// count reaches the threshold; the entry is removed at that point so
    /// the next failure starts a fresh cycle.
    pub fn record(&mut self, addr: IpAddr) -> bool {
        let count = self.attempts.entry(addr).or_insert(0);
        *count += 1;
        if *count >= self.threshold {
            self.attempts.remove(&addr);
            return true;
        }
        false
    }

    /// Current count for an address; 0 when no entry exists.
    pub fn count(&self, addr: &IpAddr) -> u32 {
        self.attempts.get(addr).copied().unwrap_or(0)
    }

    /// Number of addresses currently being tracked.
    pub fn tracked(&self) -> usize {
        self.attempts.len()
    }
}
