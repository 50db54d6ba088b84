//! Core types for tube-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ErrorKind;

/// Unique identifier for a download job
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub i64);

impl JobId {
    /// Create a new JobId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for JobId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<JobId> for i64 {
    fn from(id: JobId) -> Self {
        id.0
    }
}

impl PartialEq<i64> for JobId {
    fn eq(&self, other: &i64) -> bool {
        self.0 == *other
    }
}

impl PartialEq<JobId> for i64 {
    fn eq(&self, other: &JobId) -> bool {
        *self == other.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// A user-submitted download request
///
/// Immutable once submitted. The destination directory is optional; when
/// absent, the configured default download directory is used.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// Media page or manifest URL
    pub url: String,

    /// Destination directory override (None = use configured download_dir)
    #[serde(default)]
    pub destination_dir: Option<PathBuf>,
}

impl DownloadRequest {
    /// Create a request for the given URL with the default destination
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            destination_dir: None,
        }
    }

    /// Create a request with an explicit destination directory
    pub fn with_destination(url: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            destination_dir: Some(dir.into()),
        }
    }
}

/// Metadata for the selected progressive stream variant
///
/// Produced once per request by the resolver and immutable afterwards.
/// `total_bytes` is always greater than zero: zero-sized variants are
/// rejected during resolution, so the worker may divide by it freely.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Media title (used to derive the output filename)
    pub title: String,

    /// Vertical resolution in pixels (e.g. 1080)
    pub resolution: u32,

    /// Average bitrate in bits per second
    pub bitrate_bps: u64,

    /// MIME type of the container (e.g. "video/mp4")
    pub mime_type: String,

    /// Total size of the encoded file in bytes (always > 0)
    pub total_bytes: u64,

    /// Whether the variant is progressive (audio+video in a single file)
    pub progressive: bool,

    /// Direct URL the media bytes are streamed from
    pub source_url: String,
}

/// Lifecycle state of a download session
///
/// Transitions are linear and one-directional:
/// `Idle → Resolving → Downloading → {Completed | Failed | Cancelled} → Idle`.
/// No state is revisited within a single job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// No job active; new submissions are accepted
    Idle,
    /// Fetching stream metadata and selecting a variant
    Resolving,
    /// Transferring media bytes to disk
    Downloading,
    /// Terminal: transfer finished successfully
    Completed,
    /// Terminal: transfer failed
    Failed,
    /// Terminal: transfer cancelled by the caller
    Cancelled,
}

impl JobState {
    /// Whether this state ends a job's lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobState::Idle => "idle",
            JobState::Resolving => "resolving",
            JobState::Downloading => "downloading",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        };
        write!(f, "{name}")
    }
}

/// A fully-resolved download job
///
/// Built by the controller after successful resolution and handed to the
/// worker, which owns it exclusively for the duration of the transfer.
#[derive(Clone, Debug)]
pub struct DownloadJob {
    /// Unique job identifier
    pub id: JobId,

    /// The originating request
    pub request: DownloadRequest,

    /// The selected stream variant
    pub descriptor: StreamDescriptor,

    /// Absolute path the media file is written to
    pub destination_path: PathBuf,

    /// When the job was created
    pub created_at: DateTime<Utc>,
}

/// Event emitted during the download lifecycle
///
/// Events for a given job are delivered in emission order; exactly one of
/// `Completed`, `Failed` or `Cancelled` is delivered last.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Transfer progress update
    Progress {
        /// Job ID
        id: JobId,
        /// Progress percentage (0.0 to 100.0, non-decreasing per job)
        percent: f32,
    },

    /// Transfer completed successfully
    Completed {
        /// Job ID
        id: JobId,
        /// Absolute path of the saved media file
        path: PathBuf,
    },

    /// Resolution or transfer failed
    Failed {
        /// Job ID
        id: JobId,
        /// Machine-readable failure category
        kind: ErrorKind,
        /// Human-readable error message
        error: String,
    },

    /// Transfer cancelled by the caller
    Cancelled {
        /// Job ID
        id: JobId,
    },
}

impl Event {
    /// The job this event belongs to
    pub fn job_id(&self) -> JobId {
        match self {
            Event::Progress { id, .. }
            | Event::Completed { id, .. }
            | Event::Failed { id, .. }
            | Event::Cancelled { id } => *id,
        }
    }

    /// Whether this event ends the job's lifecycle
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Event::Progress { .. })
    }
}
