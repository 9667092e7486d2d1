use crate::pipeline::Pipeline;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineCounts {
    pub accepted: u64,
    pub rejected: u64,
    pub skipped: u64,
}

/// Submit every line read from `reader` until EOF or cancellation.
///
/// Blank lines are skipped; lines the pipeline refuses are logged and
/// counted but do not stop the loop.
pub async fn forward_lines<R>(
    reader: R,
    pipeline: &Pipeline,
    cancel: &CancellationToken,
) -> std::io::Result<LineCounts>
where
    R: AsyncBufRead + Unpin,
{
    let mut counts = LineCounts::default();
    let mut lines = reader.lines();

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = lines.next_line() => next?,
        };

        let Some(line) = next else {
            debug!("Input closed");
            break;
        };

        if line.trim().is_empty() {
            counts.skipped += 1;
            continue;
        }

        match pipeline.submit_line(&line) {
            Ok(()) => counts.accepted += 1,
            Err(e) => {
                warn!("Rejected input line: {}", e);
                counts.rejected += 1;
            }
        }
    }

    Ok(counts)
}
