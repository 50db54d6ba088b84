//! Shared test helpers for creating VideoDownloader instances in tests.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::tempdir;
use tokio::sync::broadcast;

use crate::config::Config;
use crate::downloader::VideoDownloader;
use crate::error::{Error, Result};
use crate::resolver::StreamResolver;
use crate::types::{Event, JobState, StreamDescriptor};

/// Resolver stub with canned outcomes, so controller tests don't need a
/// manifest endpoint.
pub(crate) enum StubResolver {
    /// Always resolves to this descriptor
    Descriptor(StreamDescriptor),
    /// Sleeps before resolving, to hold the controller in Resolving
    Slow(StreamDescriptor, Duration),
    /// Always fails with NoSuitableStream
    NoStream,
    /// Always fails with InvalidUrl
    BadUrl,
}

#[async_trait]
impl StreamResolver for StubResolver {
    async fn resolve(&self, _url: &str) -> Result<StreamDescriptor> {
        match self {
            StubResolver::Descriptor(descriptor) => Ok(descriptor.clone()),
            StubResolver::Slow(descriptor, delay) => {
                tokio::time::sleep(*delay).await;
                Ok(descriptor.clone())
            }
            StubResolver::NoStream => Err(Error::NoSuitableStream(
                "no progressive variant".to_string(),
            )),
            StubResolver::BadUrl => Err(Error::InvalidUrl("host unreachable".to_string())),
        }
    }
}

/// A descriptor pointing at `source_url`, sized `total_bytes`.
pub(crate) fn test_descriptor(source_url: &str, total_bytes: u64) -> StreamDescriptor {
    StreamDescriptor {
        title: "Test Video".to_string(),
        resolution: 720,
        bitrate_bps: 1_500_000,
        mime_type: "video/mp4".to_string(),
        total_bytes,
        progressive: true,
        source_url: source_url.to_string(),
    }
}

/// Test config with short timeouts, rooted in a temp directory.
pub(crate) fn test_config(download_dir: std::path::PathBuf) -> Config {
    let mut config = Config::default();
    config.download.download_dir = download_dir;
    config.network.connect_timeout = Duration::from_secs(2);
    config.network.stall_timeout = Duration::from_millis(300);
    config.events.progress_send_timeout_ms = 50;
    config
}

/// Helper to create a test VideoDownloader with a stub resolver.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) async fn create_test_downloader(
    resolver: StubResolver,
) -> (VideoDownloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path().join("downloads"));

    let downloader =
        VideoDownloader::with_resolver(config, Arc::new(resolver), reqwest::Client::new())
            .await
            .unwrap();

    (downloader, temp_dir)
}

/// Collect broadcast events until (and including) the terminal one.
pub(crate) async fn collect_job_events(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("timed out waiting for a lifecycle event")
            .expect("event broadcast closed unexpectedly");
        let terminal = event.is_terminal();
        events.push(event);
        if terminal {
            return events;
        }
    }
}

/// Poll until the controller reaches `state` (or panic after 5 seconds).
pub(crate) async fn wait_for_state(downloader: &VideoDownloader, state: JobState) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if downloader.state().await == state {
            return;
        }
        if Instant::now() > deadline {
            panic!("timed out waiting for controller state {state:?}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Extract the progress percentages from a collected event sequence.
pub(crate) fn progress_percents(events: &[Event]) -> Vec<f32> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::Progress { percent, .. } => Some(*percent),
            _ => None,
        })
        .collect()
}
