use crate::result::{ProbeResult, ProbeStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use tracing::warn;

/// Point-in-time view of a run's results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub total: usize,
    pub processed: usize,
    pub remaining: usize,
    /// Found results in the order they completed
    pub found: Vec<ProbeResult>,
    pub not_found: usize,
    pub errors: usize,
    /// Error results in the order they completed
    pub failures: Vec<ProbeResult>,
    pub cancelled: bool,
}

impl Snapshot {
    /// Found results re-sorted by their position in the wordlist
    pub fn found_in_wordlist_order(&self) -> Vec<ProbeResult> {
        let mut found = self.found.clone();
        found.sort_by_key(|result| result.candidate.position);
        found
    }

    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }
}

#[derive(Debug, Default)]
struct Ledger {
    seen: HashSet<usize>,
    found: Vec<ProbeResult>,
    failures: Vec<ProbeResult>,
    not_found: usize,
    processed: usize,
}

/// Collects results from all workers of one run
#[derive(Debug)]
pub struct Aggregator {
    total: usize,
    ledger: Mutex<Ledger>,
}

impl Aggregator {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ledger: Mutex::new(Ledger::default()),
        }
    }

    /// Record one result. A second result for the same candidate is dropped
    /// and `false` is returned.
    pub fn record(&self, result: ProbeResult) -> bool {
        let mut ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);

        if !ledger.seen.insert(result.candidate.position) {
            warn!(
                "Ignoring duplicate result for '{}' ({})",
                result.candidate.word, result.status
            );
            return false;
        }

        ledger.processed += 1;
        match result.status {
            ProbeStatus::Found => ledger.found.push(result),
            ProbeStatus::NotFound => ledger.not_found += 1,
            ProbeStatus::Error => ledger.failures.push(result),
        }
        true
    }

    pub fn processed(&self) -> usize {
        self.ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .processed
    }

    pub fn snapshot(&self) -> Snapshot {
        let ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);

        Snapshot {
            total: self.total,
            processed: ledger.processed,
            remaining: self.total.saturating_sub(ledger.processed),
            found: ledger.found.clone(),
            not_found: ledger.not_found,
            errors: ledger.failures.len(),
            failures: ledger.failures.clone(),
            cancelled: false,
        }
    }
}
