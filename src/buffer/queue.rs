use crate::domain::EncodedRecord;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::pin::pin;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Notify;

struct QueueState {
    items: VecDeque<EncodedRecord>,
    shutdown: bool,
}

/// Unbounded FIFO between producers and the dispatch worker.
///
/// `enqueue` never blocks and never fails. `dequeue` waits until an item
/// arrives or the queue is shut down; records queued before shutdown are
/// still handed out before the `None` sentinel.
pub struct HandoffQueue {
    state: Mutex<QueueState>,
    available: Notify,
    enqueued: AtomicU64,
    dequeued: AtomicU64,
}

impl Default for HandoffQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl HandoffQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                shutdown: false,
            }),
            available: Notify::new(),
            enqueued: AtomicU64::new(0),
            dequeued: AtomicU64::new(0),
        }
    }

    pub fn enqueue(&self, record: EncodedRecord) {
        self.state.lock().items.push_back(record);
        self.enqueued.fetch_add(1, Ordering::Relaxed);
        self.available.notify_one();
    }

    /// Wait for the head item. `None` means empty and shut down.
    pub async fn dequeue(&self) -> Option<EncodedRecord> {
        loop {
            let mut notified = pin!(self.available.notified());
            // Register before checking so a notify between the check and
            // the await is not lost
            notified.as_mut().enable();

            {
                let mut state = self.state.lock();
                if let Some(record) = state.items.pop_front() {
                    self.dequeued.fetch_add(1, Ordering::Relaxed);
                    return Some(record);
                }
                if state.shutdown {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Remove everything still queued. Used when shutting down.
    pub fn drain(&self) -> Vec<EncodedRecord> {
        let drained: Vec<_> = self.state.lock().items.drain(..).collect();
        self.dequeued
            .fetch_add(drained.len() as u64, Ordering::Relaxed);
        drained
    }

    pub fn shutdown(&self) {
        self.state.lock().shutdown = true;
        self.available.notify_waiters();
    }

    pub fn is_shutdown(&self) -> bool {
        self.state.lock().shutdown
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    pub fn total_dequeued(&self) -> u64 {
        self.dequeued.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for HandoffQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandoffQueue")
            .field("len", &self.len())
            .field("shutdown", &self.is_shutdown())
            .field("enqueued", &self.total_enqueued())
            .field("dequeued", &self.total_dequeued())
            .finish()
    }
}
