//! Stream metadata resolution and variant selection
//!
//! A [`StreamResolver`] turns a media URL into a single
//! [`StreamDescriptor`] describing the best progressive variant. The
//! default [`HttpStreamResolver`] fetches a JSON stream manifest from the
//! media host; tests and embedders can plug in their own implementation.
//!
//! Selection policy: progressive variants only, maximum resolution first,
//! ties broken by maximum bitrate, remaining ties by first-encountered
//! order. Selection is deterministic for identical inputs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::NetworkConfig;
use crate::error::{Error, Result};
use crate::types::StreamDescriptor;

/// Trait for resolving a URL into a downloadable stream descriptor
///
/// Implementations perform network requests only; no local file I/O
/// happens during resolution. A descriptor returned from `resolve` always
/// has `total_bytes > 0` and `progressive == true`.
#[async_trait]
pub trait StreamResolver: Send + Sync {
    /// Fetch metadata for `url` and select the best progressive variant
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidUrl`] if the URL is malformed or the host is
    ///   unreachable
    /// - [`Error::NoSuitableStream`] if no progressive variant with a
    ///   non-zero size exists
    /// - [`Error::Network`] for failures after the host was reached
    async fn resolve(&self, url: &str) -> Result<StreamDescriptor>;
}

/// Stream manifest document served by the media host
///
/// The wire protocol for fetching metadata is delegated to the host; this
/// is the shape tube-dl expects the host's manifest endpoint to return.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreamManifest {
    /// Media title
    pub title: String,

    /// All available encoded variants
    #[serde(default)]
    pub streams: Vec<StreamVariant>,
}

/// One encoded variant inside a [`StreamManifest`]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreamVariant {
    /// Vertical resolution in pixels
    pub resolution: u32,

    /// Average bitrate in bits per second
    #[serde(default)]
    pub bitrate_bps: u64,

    /// Container MIME type
    pub mime_type: String,

    /// Size of the encoded file in bytes
    pub size_bytes: u64,

    /// Whether audio and video are combined in a single file
    #[serde(default)]
    pub progressive: bool,

    /// Direct URL the media bytes are served from
    pub url: String,
}

/// Default resolver fetching a JSON manifest over HTTP
pub struct HttpStreamResolver {
    client: reqwest::Client,
}

impl HttpStreamResolver {
    /// Create a resolver with its own HTTP client configured from `network`
    pub fn new(network: &NetworkConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(network.connect_timeout)
            .user_agent(network.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    /// Create a resolver reusing an existing HTTP client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StreamResolver for HttpStreamResolver {
    async fn resolve(&self, url: &str) -> Result<StreamDescriptor> {
        let parsed = validate_url(url)?;

        tracing::debug!(url = %parsed, "Fetching stream manifest");

        let response = self
            .client
            .get(parsed.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                // Connect/DNS failures count as "unreachable"
                if e.is_connect() || e.is_timeout() {
                    Error::InvalidUrl(format!("host unreachable: {e}"))
                } else {
                    Error::Network(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::InvalidUrl(format!(
                "media host returned {status} for {parsed}"
            )));
        }

        let manifest: StreamManifest = response.json().await?;
        let descriptor = select_best_variant(&manifest)?;

        tracing::info!(
            title = %descriptor.title,
            resolution = descriptor.resolution,
            bitrate_bps = descriptor.bitrate_bps,
            total_bytes = descriptor.total_bytes,
            "Selected progressive stream"
        );

        Ok(descriptor)
    }
}

/// Parse and validate a user-supplied URL
fn validate_url(url: &str) -> Result<Url> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidUrl("URL is empty".to_string()));
    }

    let parsed =
        Url::parse(trimmed).map_err(|e| Error::InvalidUrl(format!("{trimmed}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(Error::InvalidUrl(format!(
            "unsupported URL scheme '{scheme}'"
        ))),
    }
}

/// Select the best progressive variant from a manifest
///
/// Filters to progressive variants with a non-zero size, then picks the
/// maximum resolution, breaking ties by maximum bitrate. Strictly-greater
/// comparisons keep the first-encountered variant on full ties, so the
/// result is deterministic for identical manifests.
fn select_best_variant(manifest: &StreamManifest) -> Result<StreamDescriptor> {
    let mut best: Option<&StreamVariant> = None;

    for variant in &manifest.streams {
        if !variant.progressive || variant.size_bytes == 0 {
            continue;
        }

        let better = match best {
            None => true,
            Some(current) => {
                variant.resolution > current.resolution
                    || (variant.resolution == current.resolution
                        && variant.bitrate_bps > current.bitrate_bps)
            }
        };
        if better {
            best = Some(variant);
        }
    }

    let variant = best.ok_or_else(|| {
        Error::NoSuitableStream(format!(
            "no progressive variant with a non-zero size among {} streams",
            manifest.streams.len()
        ))
    })?;

    Ok(StreamDescriptor {
        title: manifest.title.clone(),
        resolution: variant.resolution,
        bitrate_bps: variant.bitrate_bps,
        mime_type: variant.mime_type.clone(),
        total_bytes: variant.size_bytes,
        progressive: true,
        source_url: variant.url.clone(),
    })
}
