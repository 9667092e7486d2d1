//! Wiring of the delivery pipeline.
//!
//! producer -> [`HandoffQueue`] -> [`DispatchWorker`] -> transport or
//! [`ReplayLog`]; independently, [`BatchProcessor`] -> replay log ->
//! gzip -> transport.

use crate::buffer::HandoffQueue;
use crate::domain::{EncodedRecord, ForwarderError, MetricPoint};
use crate::encoder::{EncodingError, LineBuilder};
use crate::reliability::{BatchConfig, BatchProcessor, ReplayLog};
use crate::sender::{
    BatchTransport, DispatchWorker, PipelineStats, RecordTransport, ShutdownPolicy, StatsSnapshot,
};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

pub const DEFAULT_REPLAY_LOG_PATH: &str = "logs/offline_log.txt";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub replay_log_path: PathBuf,
    pub batch: BatchConfig,
    pub shutdown_policy: ShutdownPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            replay_log_path: PathBuf::from(DEFAULT_REPLAY_LOG_PATH),
            batch: BatchConfig::default(),
            shutdown_policy: ShutdownPolicy::Abandon,
        }
    }
}

/// Running pipeline. Producers call the `submit*` methods from any thread;
/// none of them block on the network or fail because of delivery problems.
pub struct Pipeline {
    queue: Arc<HandoffQueue>,
    replay_log: Arc<ReplayLog>,
    stats: Arc<PipelineStats>,
    cancel: CancellationToken,
    tasks: TaskTracker,
    running: AtomicBool,
    runtime: Handle,
    builder: Mutex<LineBuilder>,
}

impl Pipeline {
    /// Settle the replay log and spawn the dispatch worker and batch
    /// processor on the current runtime.
    pub async fn start(
        config: PipelineConfig,
        record_transport: Arc<dyn RecordTransport>,
        batch_transport: Arc<dyn BatchTransport>,
    ) -> Result<Self, ForwarderError> {
        if config.batch.max_entries == 0 || config.batch.max_line_length == 0 {
            return Err(ForwarderError::Config(
                "Batch limits must be greater than zero".to_string(),
            ));
        }

        let replay_log = Arc::new(ReplayLog::new(&config.replay_log_path)?);
        replay_log.recover().await?;

        let queue = Arc::new(HandoffQueue::new());
        let stats = Arc::new(PipelineStats::new());
        let cancel = CancellationToken::new();
        let tasks = TaskTracker::new();

        let worker = DispatchWorker::new(
            queue.clone(),
            record_transport,
            replay_log.clone(),
            stats.clone(),
            config.shutdown_policy,
            cancel.clone(),
        );
        tasks.spawn(worker.run());

        let processor = BatchProcessor::new(
            replay_log.clone(),
            batch_transport,
            config.batch.clone(),
            stats.clone(),
            cancel.clone(),
        );
        tasks.spawn(processor.run());

        info!(
            "Pipeline started (replay log: {})",
            replay_log.path().display()
        );

        Ok(Self {
            queue,
            replay_log,
            stats,
            cancel,
            tasks,
            running: AtomicBool::new(true),
            runtime: Handle::current(),
            builder: Mutex::new(LineBuilder::new()),
        })
    }

    /// Hand an encoded record to the dispatch worker.
    ///
    /// After shutdown the record goes straight to the replay log instead.
    /// A record that races shutdown's final drain is spilled by this call,
    /// along with anything else still queued, even under
    /// [`ShutdownPolicy::Abandon`].
    pub fn submit(&self, record: EncodedRecord) {
        self.stats.record_submitted();

        if self.running.load(Ordering::SeqCst) {
            self.queue.enqueue(record);
            if self.running.load(Ordering::SeqCst) {
                return;
            }
            // Shutdown may already have drained the queue; nothing else
            // will look at it again
            self.spill_after_shutdown(self.queue.drain());
            return;
        }

        warn!("Pipeline stopped, writing record to replay log");
        self.spill_after_shutdown(vec![record]);
    }

    fn spill_after_shutdown(&self, records: Vec<EncodedRecord>) {
        if records.is_empty() {
            return;
        }

        let replay_log = self.replay_log.clone();
        let stats = self.stats.clone();
        self.tasks.spawn_on(
            async move {
                let count = records.len() as u64;
                match replay_log.append_all(&records).await {
                    Ok(()) => stats.record_spilled(count),
                    Err(e) => {
                        error!("Lost {} record(s) after shutdown: {}", count, e);
                        stats.record_persistence_failure(count);
                    }
                }
            },
            &self.runtime,
        );
    }

    /// Accept one already-encoded line from an external producer.
    pub fn submit_line(&self, line: &str) -> Result<(), EncodingError> {
        let record = EncodedRecord::from_line(line)?;
        self.submit(record);
        Ok(())
    }

    /// Encode and submit a point, reusing the pipeline's line buffer.
    pub fn submit_point(&self, point: &MetricPoint) -> Result<(), EncodingError> {
        let record = {
            let mut builder = self.builder.lock();
            point.encode_with(&mut builder)?
        };
        self.submit(record);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn replay_log(&self) -> &Arc<ReplayLog> {
        &self.replay_log
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Stop both background tasks and wait for them.
    ///
    /// Queued records are handled by the configured [`ShutdownPolicy`].
    /// Safe to call more than once; later calls also wait for replay-log
    /// writes started by `submit` after the first shutdown.
    pub async fn shutdown(&self) -> StatsSnapshot {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("Shutting down pipeline");
            self.cancel.cancel();
            self.queue.shutdown();
            self.tasks.close();
        }

        self.tasks.wait().await;

        // Records that raced past the running check after the worker drained
        let stragglers = self.queue.drain();
        if !stragglers.is_empty() {
            match self.replay_log.append_all(&stragglers).await {
                Ok(()) => self.stats.record_spilled(stragglers.len() as u64),
                Err(e) => {
                    error!("Lost {} record(s) at shutdown: {}", stragglers.len(), e);
                    self.stats
                        .record_persistence_failure(stragglers.len() as u64);
                }
            }
        }

        let snapshot = self.stats.snapshot();
        info!(
            "Pipeline stopped: {} submitted, {} delivered ({:.1}% direct), {} spilled, {} abandoned",
            snapshot.submitted,
            snapshot.delivered,
            snapshot.direct_delivery_rate() * 100.0,
            snapshot.spilled,
            snapshot.abandoned
        );
        snapshot
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("running", &self.is_running())
            .field("queue", &self.queue)
            .field("replay_log", &self.replay_log.path())
            .finish()
    }
}
