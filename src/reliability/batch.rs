use super::backoff::ReplayBackoff;
use super::replay::{ReplayError, ReplayLog, ReplayReport};
use crate::sender::{BatchTransport, PipelineStats};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub const DEFAULT_REPLAY_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_BATCH_ENTRIES: usize = 5000;
pub const DEFAULT_MAX_LINE_LENGTH: usize = 2048;

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub interval: Duration,
    pub max_entries: usize,
    /// Longest accepted replay entry in bytes, newline included.
    pub max_line_length: usize,
    pub backoff: ReplayBackoff,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_REPLAY_INTERVAL,
            max_entries: DEFAULT_MAX_BATCH_ENTRIES,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            backoff: ReplayBackoff::Fixed,
        }
    }
}

/// Background task that periodically replays the log through a batch
/// transport. Stops at the first cancellation check after the token fires;
/// a pass already in progress is finished first.
pub struct BatchProcessor {
    replay_log: Arc<ReplayLog>,
    transport: Arc<dyn BatchTransport>,
    config: BatchConfig,
    stats: Arc<PipelineStats>,
    cancel: CancellationToken,
}

impl BatchProcessor {
    pub fn new(
        replay_log: Arc<ReplayLog>,
        transport: Arc<dyn BatchTransport>,
        config: BatchConfig,
        stats: Arc<PipelineStats>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            replay_log,
            transport,
            config,
            stats,
            cancel,
        }
    }

    /// One replay pass, with statistics recorded.
    pub async fn run_cycle(&self) -> Result<ReplayReport, ReplayError> {
        let report = self
            .replay_log
            .process(self.transport.as_ref(), &self.config)
            .await?;

        if report.batches_attempted > 0 || report.oversized_entries > 0 {
            self.stats.record_replay_cycle(
                report.batches_sent,
                report.batches_failed,
                report.entries_sent,
                report.oversized_entries,
            );
        }
        Ok(report)
    }

    pub async fn run(self) {
        info!(
            "Batch processor started (interval {:?}, {} entries per batch)",
            self.config.interval, self.config.max_entries
        );

        let mut consecutive_failures = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            match self.run_cycle().await {
                Ok(report) if report.is_clean() => consecutive_failures = 0,
                Ok(_) => consecutive_failures = consecutive_failures.saturating_add(1),
                Err(e) => {
                    error!("Replay pass over {} failed: {}", self.replay_log.path().display(), e);
                    consecutive_failures = consecutive_failures.saturating_add(1);
                }
            }

            let delay = self
                .config
                .backoff
                .next_delay(self.config.interval, consecutive_failures);
            debug!("Next replay pass in {:?}", delay);

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!("Batch processor stopped");
    }
}
