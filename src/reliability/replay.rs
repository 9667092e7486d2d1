use super::batch::BatchConfig;
use super::compression::gzip;
use crate::domain::EncodedRecord;
use crate::sender::BatchTransport;
use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid replay log path: {0}")]
    InvalidPath(String),
}

/// Outcome of one pass over the replay log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub batches_attempted: u64,
    pub batches_sent: u64,
    pub batches_failed: u64,
    pub entries_sent: u64,
    pub entries_retained: u64,
    /// Entries longer than `max_line_length`, each sent as a batch of one.
    pub oversized_entries: u64,
}

impl ReplayReport {
    pub fn is_clean(&self) -> bool {
        self.batches_failed == 0
    }
}

/// Append-only overflow file for records that could not be sent.
///
/// One entry per line, byte-identical to the encoded record. Entries that
/// survive a replay pass are staged in `<path>.tmp` and swapped back in.
/// Every mutation of either file happens under one writer lock; network
/// sends during a replay pass do not hold it.
#[derive(Debug)]
pub struct ReplayLog {
    path: PathBuf,
    tmp_path: PathBuf,
    writer: Mutex<()>,
    pass: Mutex<()>,
}

impl ReplayLog {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, ReplayError> {
        let path = path.into();
        let file_name = path
            .file_name()
            .ok_or_else(|| ReplayError::InvalidPath(path.display().to_string()))?;

        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        Ok(Self {
            path,
            tmp_path,
            writer: Mutex::new(()),
            pass: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tmp_path(&self) -> &Path {
        &self.tmp_path
    }

    /// Create the parent directory and settle a staging file left behind
    /// by an interrupted replay pass.
    ///
    /// If the log is missing, the pass died between removing the log and
    /// renaming the staging file, so the staging file becomes the log.
    /// Otherwise the log still holds every staged entry and the staging
    /// file is discarded.
    pub async fn recover(&self) -> Result<(), ReplayError> {
        let _guard = self.writer.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        if !exists(&self.tmp_path).await? {
            return Ok(());
        }

        if exists(&self.path).await? {
            warn!(
                "Discarding stale staging file {}; {} is intact",
                self.tmp_path.display(),
                self.path.display()
            );
            fs::remove_file(&self.tmp_path).await?;
        } else {
            warn!(
                "Restoring {} from interrupted replay pass",
                self.tmp_path.display()
            );
            fs::rename(&self.tmp_path, &self.path).await?;
        }
        Ok(())
    }

    pub async fn append(&self, record: &EncodedRecord) -> Result<(), ReplayError> {
        self.append_all(std::slice::from_ref(record)).await
    }

    /// Append records in order with a single open/close of the log.
    pub async fn append_all(&self, records: &[EncodedRecord]) -> Result<(), ReplayError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut data = Vec::with_capacity(records.iter().map(EncodedRecord::len).sum());
        for record in records {
            data.extend_from_slice(record.as_bytes());
        }

        let _guard = self.writer.lock().await;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&data).await?;
        file.flush().await?;

        debug!(
            "Appended {} record(s) to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Current log size in bytes; a missing log counts as empty.
    pub async fn size(&self) -> Result<u64, ReplayError> {
        file_len(&self.path).await
    }

    /// Drain the log through `transport` in gzip batches.
    ///
    /// Only the bytes present when the pass starts are replayed. Lines
    /// appended while batches are in flight are carried over untouched.
    /// Batches the transport rejects are written back verbatim and in
    /// order; if none were rejected both files are removed. Concurrent
    /// passes run one after the other.
    pub async fn process(
        &self,
        transport: &dyn BatchTransport,
        config: &BatchConfig,
    ) -> Result<ReplayReport, ReplayError> {
        let _pass = self.pass.lock().await;
        let mut report = ReplayReport::default();

        let snapshot_len = {
            let _guard = self.writer.lock().await;
            file_len(&self.path).await?
        };
        if snapshot_len == 0 {
            return Ok(report);
        }

        let input = fs::File::open(&self.path).await?;
        let mut reader = BufReader::new(input.take(snapshot_len));
        let mut staging = BufWriter::new(fs::File::create(&self.tmp_path).await?);

        let mut line = Vec::with_capacity(config.max_line_length);
        let mut batch = Vec::new();
        let mut batch_entries = 0usize;

        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line).await? == 0 {
                break;
            }

            let body = trim_line_end(&line);
            if body.is_empty() {
                continue;
            }
            if body.len() + 1 > config.max_line_length {
                warn!(
                    "Replay entry of {} bytes exceeds limit {}; sending it alone",
                    body.len() + 1,
                    config.max_line_length
                );
                report.oversized_entries += 1;

                if batch_entries > 0 {
                    self.flush_batch(transport, &batch, batch_entries, &mut staging, &mut report)
                        .await?;
                    batch.clear();
                    batch_entries = 0;
                }

                let mut single = Vec::with_capacity(body.len() + 1);
                single.extend_from_slice(body);
                single.push(b'\n');
                self.flush_batch(transport, &single, 1, &mut staging, &mut report)
                    .await?;
                continue;
            }

            batch.extend_from_slice(body);
            batch.push(b'\n');
            batch_entries += 1;

            if batch_entries >= config.max_entries {
                self.flush_batch(transport, &batch, batch_entries, &mut staging, &mut report)
                    .await?;
                batch.clear();
                batch_entries = 0;
            }
        }

        if batch_entries > 0 {
            self.flush_batch(transport, &batch, batch_entries, &mut staging, &mut report)
                .await?;
        }

        let _guard = self.writer.lock().await;

        let current_len = file_len(&self.path).await?;
        if current_len > snapshot_len {
            let mut tail = fs::File::open(&self.path).await?;
            tail.seek(SeekFrom::Start(snapshot_len)).await?;
            let carried = tokio::io::copy(&mut tail, &mut staging).await?;
            debug!("Carried {} bytes appended during replay", carried);
        }

        staging.flush().await?;
        let staging = staging.into_inner();
        staging.sync_all().await?;
        drop(staging);

        remove_if_exists(&self.path).await?;
        if file_len(&self.tmp_path).await? > 0 {
            fs::rename(&self.tmp_path, &self.path).await?;
        } else {
            remove_if_exists(&self.tmp_path).await?;
        }

        info!(
            "Replay pass: {}/{} batches sent, {} entries sent, {} retained, {} oversized",
            report.batches_sent,
            report.batches_attempted,
            report.entries_sent,
            report.entries_retained,
            report.oversized_entries
        );
        Ok(report)
    }

    async fn flush_batch(
        &self,
        transport: &dyn BatchTransport,
        batch: &[u8],
        entries: usize,
        staging: &mut BufWriter<fs::File>,
        report: &mut ReplayReport,
    ) -> Result<(), ReplayError> {
        report.batches_attempted += 1;

        let sent = match gzip(batch) {
            Ok(payload) => {
                debug!(
                    "Sending replay batch: {} entries, {} -> {} bytes",
                    entries,
                    batch.len(),
                    payload.len()
                );
                transport.send_batch(payload).await
            }
            Err(e) => {
                warn!("Failed to compress replay batch of {} entries: {}", entries, e);
                false
            }
        };

        if sent {
            report.batches_sent += 1;
            report.entries_sent += entries as u64;
        } else {
            staging.write_all(batch).await?;
            report.batches_failed += 1;
            report.entries_retained += entries as u64;
        }
        Ok(())
    }
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

async fn file_len(path: &Path) -> Result<u64, ReplayError> {
    match fs::metadata(path).await {
        Ok(metadata) => Ok(metadata.len()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}

async fn exists(path: &Path) -> Result<bool, ReplayError> {
    Ok(fs::try_exists(path).await?)
}

async fn remove_if_exists(path: &Path) -> Result<(), ReplayError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
