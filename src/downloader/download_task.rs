//! Core download execution — the per-job worker task.
//!
//! One worker task is spawned per job and torn down at job termination.
//! It owns the destination file handle for the job's duration and releases
//! it on every exit path. The transfer loop is cooperative: cancellation
//! and the stall timeout are both checked at chunk boundaries, never by
//! interrupting a chunk already in flight.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;

use crate::channel::{self, EventChannel, EventSender};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{DownloadJob, Event, JobId};

/// Start the worker for a job
///
/// Returns immediately with the receiving end of the job's event channel;
/// the transfer proceeds on a freshly spawned task. Exactly one terminal
/// event is delivered, and it is always the last event on the channel.
pub(crate) fn start(
    job: DownloadJob,
    client: reqwest::Client,
    cancel_token: CancellationToken,
    config: Arc<Config>,
) -> EventChannel {
    let (events, event_channel) = channel::channel(
        config.events.channel_capacity,
        config.events.progress_send_timeout(),
    );

    tokio::spawn(run_download_task(job, client, cancel_token, config, events));

    event_channel
}

/// Full lifecycle of a single transfer: run it, clean up, emit the terminal event.
async fn run_download_task(
    job: DownloadJob,
    client: reqwest::Client,
    cancel_token: CancellationToken,
    config: Arc<Config>,
    events: EventSender,
) {
    let id = job.id;

    tracing::info!(
        job_id = id.0,
        url = %job.descriptor.source_url,
        total_bytes = job.descriptor.total_bytes,
        destination = %job.destination_path.display(),
        "Starting transfer"
    );

    match transfer(&job, &client, &cancel_token, &config, &events).await {
        Ok(()) => {
            tracing::info!(
                job_id = id.0,
                path = %job.destination_path.display(),
                "Transfer complete"
            );
            events
                .terminal(Event::Completed {
                    id,
                    path: job.destination_path.clone(),
                })
                .await;
        }
        Err(Error::Cancelled) => {
            // Partially-written files are deleted, never left as a
            // misleading artifact.
            remove_partial_file(id, &job.destination_path).await;
            tracing::info!(job_id = id.0, "Transfer cancelled");
            events.terminal(Event::Cancelled { id }).await;
        }
        Err(e) => {
            remove_partial_file(id, &job.destination_path).await;
            tracing::warn!(job_id = id.0, error = %e, "Transfer failed");
            events
                .terminal(Event::Failed {
                    id,
                    kind: e.kind(),
                    error: e.to_string(),
                })
                .await;
        }
    }
}

/// Open the destination, fetch the media bytes and drive the chunk loop.
///
/// The file handle is scoped to this function and therefore closed on
/// every exit path before the caller deletes partial output.
async fn transfer(
    job: &DownloadJob,
    client: &reqwest::Client,
    cancel_token: &CancellationToken,
    config: &Config,
    events: &EventSender,
) -> Result<()> {
    if let Some(parent) = job.destination_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let file = tokio::fs::File::create(&job.destination_path).await?;
    let mut writer = BufWriter::with_capacity(config.download.chunk_size_bytes, file);

    // The stall window covers the wait for response headers too: a host
    // that accepts the connection but never starts the body counts as a
    // stalled transfer, not a hang.
    let response = tokio::select! {
        biased;
        _ = cancel_token.cancelled() => return Err(Error::Cancelled),
        sent = tokio::time::timeout(
            config.network.stall_timeout,
            client.get(&job.descriptor.source_url).send(),
        ) => match sent {
            Err(_) => {
                return Err(Error::Timeout {
                    stalled_for: config.network.stall_timeout,
                });
            }
            Ok(response) => response?.error_for_status()?,
        },
    };

    let stream = response.bytes_stream().map(|chunk| chunk.map_err(Error::from));

    write_stream(
        stream,
        &mut writer,
        job.id,
        job.descriptor.total_bytes,
        events,
        cancel_token,
        config.network.stall_timeout,
    )
    .await?;

    writer.flush().await?;
    writer.into_inner().sync_all().await?;
    Ok(())
}

/// Chunk loop: write each received chunk and emit a progress event.
///
/// Cancellation and the stall window are checked between chunks. Emitted
/// percentages are non-decreasing and reach exactly 100 when the received
/// byte count matches the descriptor; any mismatch at end of stream (short
/// or excess) is a failure. Assumes `total_bytes > 0` — zero-sized
/// descriptors are rejected at resolution.
async fn write_stream<S, W>(
    stream: S,
    writer: &mut W,
    id: JobId,
    total_bytes: u64,
    events: &EventSender,
    cancel_token: &CancellationToken,
    stall_timeout: Duration,
) -> Result<()>
where
    S: Stream<Item = Result<Bytes>>,
    W: AsyncWrite + Unpin,
{
    debug_assert!(total_bytes > 0, "zero-sized jobs are rejected at resolution");

    tokio::pin!(stream);
    let mut bytes_transferred: u64 = 0;

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => return Err(Error::Cancelled),
            next = tokio::time::timeout(stall_timeout, stream.next()) => match next {
                Err(_) => {
                    return Err(Error::Timeout {
                        stalled_for: stall_timeout,
                    });
                }
                Ok(None) => break,
                Ok(Some(Err(e))) => return Err(e),
                Ok(Some(Ok(chunk))) => chunk,
            },
        };

        bytes_transferred += chunk.len() as u64;
        if bytes_transferred > total_bytes {
            return Err(Error::TruncatedTransfer {
                expected: total_bytes,
                received: bytes_transferred,
            });
        }

        writer.write_all(&chunk).await?;

        let percent = (100.0 * bytes_transferred as f64 / total_bytes as f64) as f32;
        events.progress(Event::Progress { id, percent }).await;
    }

    if bytes_transferred != total_bytes {
        return Err(Error::TruncatedTransfer {
            expected: total_bytes,
            received: bytes_transferred,
        });
    }

    Ok(())
}

/// Delete a partially-written destination file after failure or cancellation.
async fn remove_partial_file(id: JobId, path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!(job_id = id.0, path = %path.display(), "Removed partial file");
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(
                job_id = id.0,
                path = %path.display(),
                error = %e,
                "Failed to remove partial file"
            );
        }
    }
}
