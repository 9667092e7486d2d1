use super::stats::PipelineStats;
use super::transport::RecordTransport;
use crate::buffer::HandoffQueue;
use crate::domain::EncodedRecord;
use crate::reliability::ReplayLog;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What the dispatch worker does with records still queued when it stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownPolicy {
    /// Drop them. They are counted and logged.
    #[default]
    Abandon,
    /// Append them to the replay log without a network attempt.
    SpillToReplayLog,
}

impl FromStr for ShutdownPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abandon" => Ok(ShutdownPolicy::Abandon),
            "spill" | "spill-to-replay-log" => Ok(ShutdownPolicy::SpillToReplayLog),
            other => Err(format!(
                "Unknown shutdown policy '{other}', expected 'abandon' or 'spill'"
            )),
        }
    }
}

impl fmt::Display for ShutdownPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownPolicy::Abandon => f.write_str("abandon"),
            ShutdownPolicy::SpillToReplayLog => f.write_str("spill"),
        }
    }
}

/// Single consumer of the handoff queue.
///
/// Each record gets exactly one uncompressed send attempt. Any failure
/// appends it to the replay log and the loop moves on immediately.
pub struct DispatchWorker {
    queue: Arc<HandoffQueue>,
    transport: Arc<dyn RecordTransport>,
    replay_log: Arc<ReplayLog>,
    stats: Arc<PipelineStats>,
    policy: ShutdownPolicy,
    cancel: CancellationToken,
}

impl DispatchWorker {
    pub fn new(
        queue: Arc<HandoffQueue>,
        transport: Arc<dyn RecordTransport>,
        replay_log: Arc<ReplayLog>,
        stats: Arc<PipelineStats>,
        policy: ShutdownPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            queue,
            transport,
            replay_log,
            stats,
            policy,
            cancel,
        }
    }

    pub async fn run(self) {
        info!("Dispatch worker started (shutdown policy: {})", self.policy);

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let record = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                record = self.queue.dequeue() => record,
            };

            match record {
                Some(record) => self.dispatch(record).await,
                None => break,
            }
        }

        self.handle_remaining().await;
        info!("Dispatch worker stopped");
    }

    /// Send one record, falling back to the replay log.
    pub async fn dispatch(&self, record: EncodedRecord) {
        match self.transport.send_record(record.clone()).await {
            Ok(()) => {
                debug!("Delivered {}", record);
                self.stats.record_delivered();
            }
            Err(e) => {
                warn!("Send failed, spilling to replay log: {}", e);
                self.spill(std::slice::from_ref(&record)).await;
            }
        }
    }

    async fn spill(&self, records: &[EncodedRecord]) {
        match self.replay_log.append_all(records).await {
            Ok(()) => self.stats.record_spilled(records.len() as u64),
            Err(e) => {
                error!(
                    "Lost {} record(s), replay log {} unwritable: {}",
                    records.len(),
                    self.replay_log.path().display(),
                    e
                );
                self.stats.record_persistence_failure(records.len() as u64);
            }
        }
    }

    async fn handle_remaining(&self) {
        let remaining = self.queue.drain();
        if remaining.is_empty() {
            return;
        }

        match self.policy {
            ShutdownPolicy::Abandon => {
                warn!(
                    "Abandoning {} queued record(s) at shutdown",
                    remaining.len()
                );
                self.stats.record_abandoned(remaining.len() as u64);
            }
            ShutdownPolicy::SpillToReplayLog => {
                info!(
                    "Spilling {} queued record(s) to replay log at shutdown",
                    remaining.len()
                );
                self.spill(&remaining).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::{MockRecordTransport, TransmissionError};
    use futures::FutureExt;
    use tempfile::TempDir;

    fn record(n: usize) -> EncodedRecord {
        EncodedRecord::from_line(&format!("m v={n}i {n}")).unwrap()
    }

    struct Fixture {
        _dir: TempDir,
        queue: Arc<HandoffQueue>,
        replay_log: Arc<ReplayLog>,
        stats: Arc<PipelineStats>,
        cancel: CancellationToken,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let replay_log = Arc::new(ReplayLog::new(dir.path().join("offline_log.txt")).unwrap());
            Self {
                _dir: dir,
                queue: Arc::new(HandoffQueue::new()),
                replay_log,
                stats: Arc::new(PipelineStats::new()),
                cancel: CancellationToken::new(),
            }
        }

        fn worker(&self, transport: MockRecordTransport, policy: ShutdownPolicy) -> DispatchWorker {
            DispatchWorker::new(
                self.queue.clone(),
                Arc::new(transport),
                self.replay_log.clone(),
                self.stats.clone(),
                policy,
                self.cancel.clone(),
            )
        }
    }

    #[tokio::test]
    async fn test_delivered_records_are_not_logged() {
        let fixture = Fixture::new();
        let mut transport = MockRecordTransport::new();
        transport
            .expect_send_record()
            .times(3)
            .returning(|_| async { Ok(()) }.boxed());

        for n in 0..3 {
            fixture.queue.enqueue(record(n));
        }
        fixture.queue.shutdown();
        fixture.worker(transport, ShutdownPolicy::Abandon).run().await;

        assert_eq!(fixture.stats.snapshot().delivered, 3);
        assert!(!fixture.replay_log.path().exists());
    }

    #[tokio::test]
    async fn test_failures_spill_in_order() {
        let fixture = Fixture::new();
        let mut transport = MockRecordTransport::new();
        transport
            .expect_send_record()
            .returning(|_| async { Err(TransmissionError::Timeout) }.boxed());

        for n in 0..3 {
            fixture.queue.enqueue(record(n));
        }
        fixture.queue.shutdown();
        fixture.worker(transport, ShutdownPolicy::Abandon).run().await;

        let content = std::fs::read_to_string(fixture.replay_log.path()).unwrap();
        assert_eq!(content, "m v=0i 0\nm v=1i 1\nm v=2i 2\n");
        assert_eq!(fixture.stats.snapshot().spilled, 3);
    }

    #[tokio::test]
    async fn test_cancel_abandons_queued_records() {
        let fixture = Fixture::new();
        let mut transport = MockRecordTransport::new();
        transport.expect_send_record().never();

        for n in 0..4 {
            fixture.queue.enqueue(record(n));
        }
        fixture.cancel.cancel();
        fixture.worker(transport, ShutdownPolicy::Abandon).run().await;

        assert_eq!(fixture.stats.snapshot().abandoned, 4);
        assert!(fixture.queue.is_empty());
        assert!(!fixture.replay_log.path().exists());
    }

    #[tokio::test]
    async fn test_cancel_spills_queued_records() {
        let fixture = Fixture::new();
        let mut transport = MockRecordTransport::new();
        transport.expect_send_record().never();

        for n in 0..2 {
            fixture.queue.enqueue(record(n));
        }
        fixture.cancel.cancel();
        fixture
            .worker(transport, ShutdownPolicy::SpillToReplayLog)
            .run()
            .await;

        let content = std::fs::read_to_string(fixture.replay_log.path()).unwrap();
        assert_eq!(content, "m v=0i 0\nm v=1i 1\n");
        assert_eq!(fixture.stats.snapshot().abandoned, 0);
    }

    #[tokio::test]
    async fn test_unwritable_log_counts_lost_record() {
        let dir = TempDir::new().unwrap();
        // The log path is a directory, so opening it for append fails
        let replay_log = Arc::new(ReplayLog::new(dir.path()).unwrap());
        let stats = Arc::new(PipelineStats::new());
        let mut transport = MockRecordTransport::new();
        transport
            .expect_send_record()
            .returning(|_| async { Err(TransmissionError::Timeout) }.boxed());

        let worker = DispatchWorker::new(
            Arc::new(HandoffQueue::new()),
            Arc::new(transport),
            replay_log,
            stats.clone(),
            ShutdownPolicy::Abandon,
            CancellationToken::new(),
        );
        worker.dispatch(record(1)).await;

        assert_eq!(stats.snapshot().persistence_failures, 1);
        assert_eq!(stats.snapshot().spilled, 0);
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(
            "abandon".parse::<ShutdownPolicy>(),
            Ok(ShutdownPolicy::Abandon)
        );
        assert_eq!(
            "SPILL".parse::<ShutdownPolicy>(),
            Ok(ShutdownPolicy::SpillToReplayLog)
        );
        assert!("keep".parse::<ShutdownPolicy>().is_err());
    }
}
