//! Core downloader implementation split into focused submodules.
//!
//! The `VideoDownloader` struct and its methods are organized by domain:
//! - [`control`] - Session lifecycle control (submit/cancel, state machine)
//! - [`download_task`] - Core download execution (the per-job worker)

mod control;
mod download_task;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use std::sync::Arc;
use std::sync::atomic::AtomicI64;

use crate::config::Config;
use crate::error::Result;
use crate::resolver::{HttpStreamResolver, StreamResolver};
use crate::types::{Event, JobId, JobState};

/// Per-controller session state
///
/// Exactly one job may be active per controller instance at any time, so a
/// single slot (rather than a queue) is all the bookkeeping needed.
pub(crate) struct Session {
    /// Current position in the lifecycle state machine
    pub(crate) state: JobState,
    /// The active job, present from submission until the terminal event
    /// has been forwarded
    pub(crate) active: Option<ActiveJob>,
}

/// Handle to the currently running job
pub(crate) struct ActiveJob {
    pub(crate) id: JobId,
    /// Cancellation token observed cooperatively by the worker at chunk
    /// boundaries
    pub(crate) cancel_token: tokio_util::sync::CancellationToken,
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
///
/// Owns the session state machine: validates input, starts and cancels
/// jobs, and forwards lifecycle events to subscribers. The controller
/// never blocks its caller on network or disk I/O; resolution and
/// transfer run on spawned tasks and report back through events.
#[derive(Clone)]
pub struct VideoDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Stream metadata resolver (trait object for pluggable implementations)
    pub(crate) resolver: Arc<dyn StreamResolver>,
    /// HTTP client shared by resolution and transfer
    pub(crate) client: reqwest::Client,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Session state (single active job per controller)
    pub(crate) session: Arc<tokio::sync::Mutex<Session>>,
    /// Monotonic job ID counter
    pub(crate) next_job_id: Arc<AtomicI64>,
}

impl VideoDownloader {
    /// Create a new VideoDownloader instance
    ///
    /// Validates the configuration, ensures the download directory exists
    /// and sets up the HTTP client, the default HTTP resolver and the
    /// event broadcast channel.
    pub async fn new(config: Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.network.connect_timeout)
            .user_agent(config.network.user_agent.clone())
            .build()?;
        let resolver = Arc::new(HttpStreamResolver::with_client(client.clone()));

        Self::with_resolver(config, resolver, client).await
    }

    /// Create a VideoDownloader with a custom stream resolver
    ///
    /// Useful for media hosts with bespoke metadata protocols, and for
    /// tests that stub out resolution entirely.
    pub async fn with_resolver(
        config: Config,
        resolver: Arc<dyn StreamResolver>,
        client: reqwest::Client,
    ) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.download.download_dir)
            .await
            .map_err(|e| {
                crate::error::Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create download directory '{}': {}",
                        config.download.download_dir.display(),
                        e
                    ),
                ))
            })?;

        let (event_tx, _rx) = tokio::sync::broadcast::channel(config.events.broadcast_capacity);

        Ok(Self {
            config: Arc::new(config),
            resolver,
            client,
            event_tx,
            session: Arc::new(tokio::sync::Mutex::new(Session {
                state: JobState::Idle,
                active: None,
            })),
            next_job_id: Arc::new(AtomicI64::new(1)),
        })
    }

    /// Subscribe to download events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all
    /// events independently. Events are buffered; a subscriber that falls
    /// behind by more than the configured broadcast capacity receives a
    /// `RecvError::Lagged` error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tube_dl::{Config, DownloadRequest, VideoDownloader};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let downloader = VideoDownloader::new(Config::default()).await?;
    ///
    ///     let mut events = downloader.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             println!("Event: {:?}", event);
    ///         }
    ///     });
    ///
    ///     downloader
    ///         .submit(DownloadRequest::new("https://media.example.com/watch?v=abc"))
    ///         .await?;
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Current position in the session state machine
    ///
    /// The state observed here is a snapshot: terminal states are visible
    /// only briefly, because the controller resets to `Idle` as soon as
    /// the terminal event has been forwarded to subscribers.
    pub async fn state(&self) -> JobState {
        self.session.lock().await.state
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers the event is dropped; the
    /// download itself proceeds whether or not anyone is listening.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
