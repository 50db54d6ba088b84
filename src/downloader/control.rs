//! Session lifecycle control — submit, cancel, and the event pump.
//!
//! State machine: `Idle → Resolving → Downloading → {Completed | Failed |
//! Cancelled} → Idle`. Transitions are linear; after any terminal event
//! the controller resets to `Idle` and accepts a new submission.

use chrono::Utc;
use std::sync::atomic::Ordering;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::types::{DownloadJob, DownloadRequest, Event, JobId, JobState};
use crate::utils;

use super::{ActiveJob, VideoDownloader, download_task};

impl VideoDownloader {
    /// Submit a download request
    ///
    /// Rejected synchronously with [`Error::Busy`] if a job is already
    /// active; the rejection never reaches the event channel and the
    /// running job is unaffected. On acceptance the controller moves to
    /// `Resolving` and the rest of the lifecycle is reported through
    /// events (see [`subscribe`](VideoDownloader::subscribe)).
    ///
    /// Returns the ID of the newly created job.
    pub async fn submit(&self, request: DownloadRequest) -> Result<JobId> {
        let mut session = self.session.lock().await;
        if session.state != JobState::Idle {
            return Err(Error::Busy {
                state: session.state.to_string(),
            });
        }

        let id = JobId::new(self.next_job_id.fetch_add(1, Ordering::SeqCst));
        let cancel_token = CancellationToken::new();

        session.state = JobState::Resolving;
        session.active = Some(ActiveJob {
            id,
            cancel_token: cancel_token.clone(),
        });
        drop(session);

        tracing::info!(job_id = id.0, url = %request.url, "Download submitted");

        let downloader = self.clone();
        tokio::spawn(async move {
            downloader.run_session(id, request, cancel_token).await;
        });

        Ok(id)
    }

    /// Cancel the active download
    ///
    /// Valid only while a transfer is in progress. Cancellation is
    /// cooperative: the worker acknowledges at the next chunk boundary,
    /// deletes the partial file and emits `Cancelled`, upon which the
    /// controller resets to `Idle`.
    pub async fn cancel(&self) -> Result<()> {
        let session = self.session.lock().await;
        match (&session.state, &session.active) {
            (JobState::Downloading, Some(active)) => {
                tracing::info!(job_id = active.id.0, "Cancellation requested");
                active.cancel_token.cancel();
                Ok(())
            }
            (state, _) => Err(Error::InvalidState {
                operation: "cancel".to_string(),
                state: state.to_string(),
            }),
        }
    }

    /// One session from resolution to the terminal event.
    ///
    /// Runs on a spawned task so the caller of `submit` is never blocked
    /// on network or disk I/O.
    async fn run_session(&self, id: JobId, request: DownloadRequest, cancel: CancellationToken) {
        // Resolution phase: errors here are reported before any job or
        // file is created, so there is nothing to clean up.
        let descriptor = match self.resolver.resolve(&request.url).await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                tracing::warn!(job_id = id.0, url = %request.url, error = %e, "Resolution failed");
                self.finish_failed(id, e).await;
                return;
            }
        };

        let job = match self.build_job(id, request, descriptor).await {
            Ok(job) => job,
            Err(e) => {
                self.finish_failed(id, e).await;
                return;
            }
        };

        self.session.lock().await.state = JobState::Downloading;

        let mut events = download_task::start(
            job,
            self.client.clone(),
            cancel,
            std::sync::Arc::clone(&self.config),
        );

        // Event pump: the controller is the sole consumer of the worker's
        // channel. Every event is forwarded to subscribers unchanged; the
        // terminal one also drives the state machine back to Idle.
        while let Some(event) = events.recv().await {
            if event.is_terminal() {
                let terminal_state = match &event {
                    Event::Completed { .. } => JobState::Completed,
                    Event::Failed { .. } => JobState::Failed,
                    Event::Cancelled { .. } => JobState::Cancelled,
                    Event::Progress { .. } => unreachable!(),
                };
                self.session.lock().await.state = terminal_state;
                self.emit_event(event);
                self.reset_to_idle().await;
                return;
            }
            self.emit_event(event);
        }

        // The worker vanished without a terminal event. Surface it rather
        // than leaving the controller stuck outside Idle.
        tracing::error!(job_id = id.0, "Worker ended without a terminal event");
        self.finish_failed(
            id,
            Error::Io(std::io::Error::other("worker ended unexpectedly")),
        )
        .await;
    }

    /// Build the job: pick the destination directory and derive the
    /// output filename from the media title and container type.
    async fn build_job(
        &self,
        id: JobId,
        request: DownloadRequest,
        descriptor: crate::types::StreamDescriptor,
    ) -> Result<DownloadJob> {
        let dir = request
            .destination_dir
            .clone()
            .unwrap_or_else(|| self.config.download.download_dir.clone());
        tokio::fs::create_dir_all(&dir).await?;

        // Canonicalize so the Completed event carries an absolute path
        let dir = tokio::fs::canonicalize(&dir).await.unwrap_or(dir);

        let filename = format!(
            "{}.{}",
            utils::sanitize_filename(&descriptor.title),
            utils::extension_for_mime(&descriptor.mime_type)
        );
        let destination_path =
            utils::unique_path(&dir.join(filename), self.config.download.overwrite);

        Ok(DownloadJob {
            id,
            request,
            descriptor,
            destination_path,
            created_at: Utc::now(),
        })
    }

    /// Record a failure, forward it to subscribers and reset to Idle.
    async fn finish_failed(&self, id: JobId, error: Error) {
        self.session.lock().await.state = JobState::Failed;
        self.emit_event(Event::Failed {
            id,
            kind: error.kind(),
            error: error.to_string(),
        });
        self.reset_to_idle().await;
    }

    /// Terminal event has been forwarded; accept new submissions.
    async fn reset_to_idle(&self) {
        let mut session = self.session.lock().await;
        session.state = JobState::Idle;
        session.active = None;
    }
}
