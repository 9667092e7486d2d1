#![allow(dead_code)]

use bytes::Bytes;
use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use telemetry_forwarder::EncodedRecord;
use telemetry_forwarder::reliability::gunzip;
use telemetry_forwarder::sender::{BatchTransport, RecordTransport, TransmissionError};

pub fn record(n: usize) -> EncodedRecord {
    EncodedRecord::from_line(&format!("m,source=test v={n}i {n}")).unwrap()
}

pub fn lines(range: std::ops::Range<usize>) -> String {
    range.map(|n| record(n).as_str().to_string()).collect()
}

/// Batch transport that remembers every decompressed payload and answers
/// from a script, falling back to `default_result` once the script is used up.
#[derive(Default)]
pub struct RecordingBatchTransport {
    pub payloads: Mutex<Vec<String>>,
    script: Mutex<VecDeque<bool>>,
    default_result: AtomicBool,
}

impl RecordingBatchTransport {
    pub fn accepting() -> Arc<Self> {
        let transport = Self::default();
        transport.default_result.store(true, Ordering::SeqCst);
        Arc::new(transport)
    }

    pub fn rejecting() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn scripted(results: &[bool]) -> Arc<Self> {
        let transport = Self::default();
        transport.script.lock().extend(results.iter().copied());
        Arc::new(transport)
    }

    pub fn set_accepting(&self, accept: bool) {
        self.default_result.store(accept, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.payloads.lock().len()
    }

    pub fn entries_per_call(&self) -> Vec<usize> {
        self.payloads.lock().iter().map(|p| p.lines().count()).collect()
    }
}

impl BatchTransport for RecordingBatchTransport {
    fn send_batch(&self, payload: Bytes) -> BoxFuture<'static, bool> {
        let text = String::from_utf8(gunzip(&payload).unwrap()).unwrap();
        self.payloads.lock().push(text);
        let result = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.default_result.load(Ordering::SeqCst));
        async move { result }.boxed()
    }
}

/// Record transport that keeps delivered lines and can be switched offline.
#[derive(Default)]
pub struct SwitchableRecordTransport {
    pub delivered: Mutex<Vec<String>>,
    offline: AtomicBool,
}

impl SwitchableRecordTransport {
    pub fn online() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn offline() -> Arc<Self> {
        let transport = Self::default();
        transport.offline.store(true, Ordering::SeqCst);
        Arc::new(transport)
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().clone()
    }
}

impl RecordTransport for SwitchableRecordTransport {
    fn send_record(
        &self,
        record: EncodedRecord,
    ) -> BoxFuture<'static, Result<(), TransmissionError>> {
        let result = if self.offline.load(Ordering::SeqCst) {
            Err(TransmissionError::ConnectionFailed("offline".to_string()))
        } else {
            self.delivered.lock().push(record.as_str().to_string());
            Ok(())
        };
        async move { result }.boxed()
    }
}

/// Record transport whose sends block until the test releases them.
pub struct GatedRecordTransport {
    pub started: tokio::sync::Notify,
    gate: Arc<tokio::sync::Semaphore>,
    pub delivered: Arc<Mutex<Vec<String>>>,
}

impl GatedRecordTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            started: tokio::sync::Notify::new(),
            gate: Arc::new(tokio::sync::Semaphore::new(0)),
            delivered: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn release(&self, sends: usize) {
        self.gate.add_permits(sends);
    }
}

impl RecordTransport for GatedRecordTransport {
    fn send_record(
        &self,
        record: EncodedRecord,
    ) -> BoxFuture<'static, Result<(), TransmissionError>> {
        self.started.notify_one();
        let gate = self.gate.clone();
        let delivered = self.delivered.clone();
        async move {
            match gate.acquire().await {
                Ok(permit) => {
                    permit.forget();
                    delivered.lock().push(record.as_str().to_string());
                    Ok(())
                }
                Err(e) => Err(TransmissionError::ConnectionFailed(e.to_string())),
            }
        }
        .boxed()
    }
}

/// Poll `condition` every few milliseconds until it holds or five seconds pass.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within 5s"
        );
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}
