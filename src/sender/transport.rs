//! Send capabilities used by the background tasks.
//!
//! Both traits return boxed futures so they can be held as `Arc<dyn ..>`
//! and swapped for fakes in tests.

use super::transmission::TransmissionError;
use crate::domain::EncodedRecord;
use bytes::Bytes;
use futures::future::BoxFuture;

#[cfg(test)]
use mockall::automock;

/// Immediate, uncompressed delivery of a single line.
#[cfg_attr(test, automock)]
pub trait RecordTransport: Send + Sync {
    fn send_record(
        &self,
        record: EncodedRecord,
    ) -> BoxFuture<'static, Result<(), TransmissionError>>;
}

/// Delivery of one gzip-compressed replay batch. `true` means the remote
/// side acknowledged the whole batch.
#[cfg_attr(test, automock)]
pub trait BatchTransport: Send + Sync {
    fn send_batch(&self, payload: Bytes) -> BoxFuture<'static, bool>;
}
