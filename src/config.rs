//! Configuration types for tube-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Download behavior configuration (destination, write granularity)
///
/// Groups settings related to how media files are stored on disk.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Default download directory (default: "./downloads")
    ///
    /// Used when a request does not carry its own destination directory.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// File writer buffer capacity in bytes (default: 64 KiB)
    ///
    /// Chunk granularity is an implementation parameter, not a correctness
    /// constant; progress is reported per received network chunk regardless.
    #[serde(default = "default_chunk_size")]
    pub chunk_size_bytes: usize,

    /// Overwrite an existing file at the destination path (default: false,
    /// a numbered suffix is appended instead)
    #[serde(default)]
    pub overwrite: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            chunk_size_bytes: default_chunk_size(),
            overwrite: false,
        }
    }
}

/// Network behavior configuration (timeouts, identification)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Connection timeout for metadata and media requests (default: 10 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Stall window: if no bytes arrive within this duration the transfer
    /// fails with a timeout (default: 30 seconds)
    #[serde(default = "default_stall_timeout", with = "duration_serde")]
    pub stall_timeout: Duration,

    /// User-Agent header sent to the media host
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            stall_timeout: default_stall_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Event delivery configuration (channel sizing, backpressure)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventConfig {
    /// Capacity of the worker-to-controller event channel (default: 64)
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// How long a progress send may block on a full channel before the
    /// update is dropped, in milliseconds (default: 250)
    ///
    /// Terminal events never use this path; they block until delivered.
    #[serde(default = "default_progress_send_timeout_ms")]
    pub progress_send_timeout_ms: u64,

    /// Buffer size of the subscriber broadcast channel (default: 256)
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

impl EventConfig {
    /// The progress send timeout as a [`Duration`]
    pub fn progress_send_timeout(&self) -> Duration {
        Duration::from_millis(self.progress_send_timeout_ms)
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            progress_send_timeout_ms: default_progress_send_timeout_ms(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

/// Main configuration for [`VideoDownloader`](crate::VideoDownloader)
///
/// Works out of the box with zero configuration:
///
/// ```
/// use tube_dl::Config;
///
/// let config = Config::default();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Download behavior
    #[serde(default)]
    pub download: DownloadConfig,

    /// Network behavior
    #[serde(default)]
    pub network: NetworkConfig,

    /// Event delivery
    #[serde(default)]
    pub events: EventConfig,
}

impl Config {
    /// Validate the configuration
    ///
    /// Returns [`Error::Config`] naming the offending key when a value
    /// would make the downloader inoperable (zero-sized buffers, a zero
    /// stall window).
    pub fn validate(&self) -> Result<()> {
        if self.download.chunk_size_bytes == 0 {
            return Err(Error::Config {
                message: "chunk size must be greater than zero".to_string(),
                key: Some("download.chunk_size_bytes".to_string()),
            });
        }
        if self.network.stall_timeout.is_zero() {
            return Err(Error::Config {
                message: "stall timeout must be greater than zero".to_string(),
                key: Some("network.stall_timeout".to_string()),
            });
        }
        if self.events.channel_capacity == 0 {
            return Err(Error::Config {
                message: "event channel capacity must be greater than zero".to_string(),
                key: Some("events.channel_capacity".to_string()),
            });
        }
        if self.events.broadcast_capacity == 0 {
            return Err(Error::Config {
                message: "broadcast capacity must be greater than zero".to_string(),
                key: Some("events.broadcast_capacity".to_string()),
            });
        }
        Ok(())
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_chunk_size() -> usize {
    64 * 1024
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_stall_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("tube-dl/{}", env!("CARGO_PKG_VERSION"))
}

fn default_channel_capacity() -> usize {
    64
}

fn default_progress_send_timeout_ms() -> u64 {
    250
}

fn default_broadcast_capacity() -> usize {
    256
}

// Duration serialization helper (seconds as u64)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_chunk_size_is_rejected_with_key() {
        let mut config = Config::default();
        config.download.chunk_size_bytes = 0;

        match config.validate() {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("download.chunk_size_bytes"));
            }
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn zero_stall_timeout_is_rejected_with_key() {
        let mut config = Config::default();
        config.network.stall_timeout = Duration::ZERO;

        match config.validate() {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("network.stall_timeout"));
            }
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn zero_channel_capacity_is_rejected() {
        let mut config = Config::default();
        config.events.channel_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_json_deserializes_to_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.download.download_dir, PathBuf::from("./downloads"));
        assert_eq!(config.download.chunk_size_bytes, 64 * 1024);
        assert_eq!(config.network.stall_timeout, Duration::from_secs(30));
        assert_eq!(config.events.channel_capacity, 64);
    }

    #[test]
    fn durations_round_trip_as_seconds() {
        let mut config = Config::default();
        config.network.stall_timeout = Duration::from_secs(5);

        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.network.stall_timeout, Duration::from_secs(5));
    }

    #[test]
    fn progress_send_timeout_converts_millis() {
        let events = EventConfig {
            progress_send_timeout_ms: 100,
            ..Default::default()
        };
        assert_eq!(events.progress_send_timeout(), Duration::from_millis(100));
    }
}
