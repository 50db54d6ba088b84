//! # tube-dl
//!
//! Asynchronous video download coordinator library.
//!
//! Given a media URL, tube-dl resolves the available stream variants,
//! selects the best progressive (single-file, audio+video) one, transfers
//! it to local storage in bounded chunks and reports progress, completion,
//! failure and cancellation to the caller without ever blocking the
//! caller's own execution context.
//!
//! ## Design Philosophy
//!
//! tube-dl is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to events, no polling required
//! - **Single-job** - One controller owns at most one active download;
//!   lifecycle is fully explicit (submit → events → terminal → idle)
//! - **Sensible defaults** - Works out of the box with zero configuration
//!
//! ## Quick Start
//!
//! ```no_run
//! use tube_dl::{Config, DownloadRequest, Event, VideoDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = VideoDownloader::new(Config::default()).await?;
//!
//!     // Subscribe to lifecycle events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             match event {
//!                 Event::Progress { percent, .. } => println!("{percent:.0}%"),
//!                 Event::Completed { path, .. } => println!("Saved to {path:?}"),
//!                 Event::Failed { error, .. } => eprintln!("Failed: {error}"),
//!                 Event::Cancelled { .. } => println!("Cancelled"),
//!             }
//!         }
//!     });
//!
//!     downloader
//!         .submit(DownloadRequest::new("https://media.example.com/watch?v=abc"))
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Worker-to-controller event delivery
pub mod channel;
/// Configuration types
pub mod config;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Stream metadata resolution and variant selection
pub mod resolver;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use channel::EventChannel;
pub use config::{Config, DownloadConfig, EventConfig, NetworkConfig};
pub use downloader::VideoDownloader;
pub use error::{Error, ErrorKind, Result};
pub use resolver::{HttpStreamResolver, StreamManifest, StreamResolver, StreamVariant};
pub use types::{
    DownloadJob, DownloadRequest, Event, JobId, JobState, StreamDescriptor,
};
