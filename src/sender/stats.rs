// Lock-free pipeline counters.
//
// Every background task holds an `Arc<PipelineStats>` and bumps counters
// with relaxed atomics; `snapshot` gives a consistent-enough copy for logs.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct PipelineStats {
    submitted: AtomicU64,
    delivered: AtomicU64,
    spilled: AtomicU64,
    persistence_failures: AtomicU64,
    abandoned: AtomicU64,
    replay_cycles: AtomicU64,
    batches_sent: AtomicU64,
    batches_failed: AtomicU64,
    entries_replayed: AtomicU64,
    oversized_entries: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// A record reached the remote side on its first attempt.
    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// A record was appended to the replay log.
    pub fn record_spilled(&self, count: u64) {
        self.spilled.fetch_add(count, Ordering::Relaxed);
    }

    /// A record could be neither sent nor persisted and is gone.
    pub fn record_persistence_failure(&self, count: u64) {
        self.persistence_failures.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_abandoned(&self, count: u64) {
        self.abandoned.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_replay_cycle(
        &self,
        batches_sent: u64,
        batches_failed: u64,
        entries_replayed: u64,
        oversized_entries: u64,
    ) {
        self.replay_cycles.fetch_add(1, Ordering::Relaxed);
        self.batches_sent.fetch_add(batches_sent, Ordering::Relaxed);
        self.batches_failed.fetch_add(batches_failed, Ordering::Relaxed);
        self.entries_replayed
            .fetch_add(entries_replayed, Ordering::Relaxed);
        self.oversized_entries
            .fetch_add(oversized_entries, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            spilled: self.spilled.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            replay_cycles: self.replay_cycles.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            entries_replayed: self.entries_replayed.load(Ordering::Relaxed),
            oversized_entries: self.oversized_entries.load(Ordering::Relaxed),
        }
    }
}

/// Immutable copy of [`PipelineStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub submitted: u64,
    pub delivered: u64,
    pub spilled: u64,
    pub persistence_failures: u64,
    pub abandoned: u64,
    pub replay_cycles: u64,
    pub batches_sent: u64,
    pub batches_failed: u64,
    pub entries_replayed: u64,
    pub oversized_entries: u64,
}

impl StatsSnapshot {
    /// Fraction of submitted records that went out without touching disk.
    pub fn direct_delivery_rate(&self) -> f64 {
        if self.submitted == 0 {
            return 1.0;
        }
        self.delivered as f64 / self.submitted as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_concurrent_updates() {
        let stats = Arc::new(PipelineStats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = stats.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.record_submitted();
                        stats.record_delivered();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.submitted, 8000);
        assert_eq!(snapshot.delivered, 8000);
        assert_eq!(snapshot.direct_delivery_rate(), 1.0);
    }

    #[test]
    fn test_replay_cycle_accumulates() {
        let stats = PipelineStats::new();
        stats.record_replay_cycle(2, 1, 10_000, 3);
        stats.record_replay_cycle(1, 0, 2_000, 0);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.replay_cycles, 2);
        assert_eq!(snapshot.batches_sent, 3);
        assert_eq!(snapshot.batches_failed, 1);
        assert_eq!(snapshot.entries_replayed, 12_000);
        assert_eq!(snapshot.oversized_entries, 3);
    }

    #[test]
    fn test_snapshot_serializes() {
        let stats = PipelineStats::new();
        stats.record_spilled(4);
        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(json["spilled"], 4);
        assert_eq!(json["abandoned"], 0);
    }
}
