//! Remote asset applier
//!
//! Fetches an image URL found in the property bag, turns the bytes into a
//! host image and fills the first image layer of the target with it. Every
//! failure ends up in [`AssetOutcome`]; nothing is propagated.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::Config;
use crate::error::BindError;
use crate::host::{Host, NodeId, NodeKind, ScaleMode};
use crate::markup::{PropertyBag, PropertyValue};

/// Bag keys checked for an image URL, in order
pub const IMAGE_SOURCE_KEYS: [&str; 7] = ["src", "image", "imageUrl", "img", "photo", "avatarUrl", "url"];

/// Substrings that mark a layer as the image target
const IMAGE_LAYER_HINTS: [&str; 6] = ["image", "picture", "avatar", "photo", "mask", "fill"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssetOutcome {
    Applied { layer: String },
    LayerNotFound,
    FetchFailed { reason: String },
    DecodeFailed { reason: String },
    /// The host refused to list layers or set the fill
    ApplyFailed { reason: String },
}

impl AssetOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, AssetOutcome::Applied { .. })
    }
}

/// `(key, url)` of the first known image key holding an http(s) URL
pub fn find_image_url(bag: &PropertyBag) -> Option<(String, String)> {
    IMAGE_SOURCE_KEYS.iter().find_map(|wanted| {
        bag.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(wanted))
            .and_then(|(key, value)| url_entry(key, value))
    })
}

/// First http(s) string value among `candidates`, in bag order
///
/// Only keys no target property claimed belong in `candidates`.
pub fn find_url_among(bag: &PropertyBag, candidates: &[String]) -> Option<(String, String)> {
    bag.iter()
        .filter(|(key, _)| candidates.iter().any(|c| c == key))
        .find_map(|(key, value)| url_entry(key, value))
}

fn url_entry(key: &str, value: &PropertyValue) -> Option<(String, String)> {
    match value {
        PropertyValue::String(url) if is_http_url(url) => Some((key.to_string(), url.clone())),
        _ => None,
    }
}

pub fn is_http_url(candidate: &str) -> bool {
    Url::parse(candidate.trim())
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// `img`, or a name containing one of the image hints (case-insensitive)
pub fn is_image_layer_name(name: &str) -> bool {
    let lower = name.trim().to_lowercase();
    lower == "img" || IMAGE_LAYER_HINTS.iter().any(|hint| lower.contains(hint))
}

/// HTTP fetcher plus image application
#[derive(Debug, Clone)]
pub struct AssetFetcher {
    client: reqwest::Client,
}

impl AssetFetcher {
    pub fn new(config: &Config) -> Result<Self, BindError> {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(config.user_agent.as_str());
        if let Some(secs) = config.fetch_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder.build().map_err(|e| BindError::HttpClient {
            reason: e.to_string(),
        })?;
        Ok(Self { client })
    }

    /// GET `url`; non-2xx is an error
    #[instrument(skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, BindError> {
        let parsed = Url::parse(url.trim())
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .ok_or_else(|| BindError::UnsupportedUrl { url: url.to_string() })?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| BindError::FetchTransport {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BindError::FetchStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| BindError::FetchTransport {
            url: url.to_string(),
            reason: format!("failed to read body: {}", e),
        })?;
        debug!(bytes = bytes.len(), "image downloaded");
        Ok(bytes.to_vec())
    }

    /// Fetch, decode and fill the target's image layer
    #[instrument(skip(self, host), fields(target = %target))]
    pub async fn apply_image(&self, host: &dyn Host, url: &str, target: &NodeId) -> AssetOutcome {
        let bytes = match self.fetch(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "image fetch failed");
                return AssetOutcome::FetchFailed { reason: e.to_string() };
            }
        };

        let image = match host.create_image(&bytes) {
            Ok(image) => image,
            Err(e) => {
                warn!(error = %e, "image decode failed");
                return AssetOutcome::DecodeFailed { reason: e.to_string() };
            }
        };

        let layers = match host.find_descendants(target, &NodeKind::IMAGE_CAPABLE) {
            Ok(layers) => layers,
            Err(e) => return AssetOutcome::ApplyFailed { reason: e.to_string() },
        };

        let Some(layer) = layers.iter().find(|l| is_image_layer_name(&l.name)) else {
            debug!(candidates = layers.len(), "no image layer matched");
            return AssetOutcome::LayerNotFound;
        };

        match host.set_image_fill(&layer.id, &image, ScaleMode::Fill) {
            Ok(()) => AssetOutcome::Applied {
                layer: layer.name.clone(),
            },
            Err(e) => {
                warn!(error = %e, layer = %layer.name, "image fill rejected");
                AssetOutcome::ApplyFailed { reason: e.to_string() }
            }
        }
    }
}
