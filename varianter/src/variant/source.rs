//! Source locator parsing and loading.
//!
//! A locator is either an `http(s)` URL fetched over the network or a path
//! on the local filesystem. `file://` URLs are treated as local paths; any
//! string that is not an absolute URL is a path (relative paths resolve
//! against the process working directory).

use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use reqwest::Url;
use tracing::debug;

use super::error::VariantError;
use super::http::AsyncHttpClient;

/// Base name used when a locator yields nothing usable.
const FALLBACK_BASE_NAME: &str = "image";

/// Where source bytes come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceLocator {
    Remote(Url),
    Local(PathBuf),
}

impl SourceLocator {
    /// Classifies a raw source string.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Self::Remote(url),
            Ok(url) if url.scheme() == "file" => match url.to_file_path() {
                Ok(path) => Self::Local(path),
                Err(()) => Self::Local(PathBuf::from(raw)),
            },
            _ => Self::Local(PathBuf::from(raw)),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// Filesystem-safe stem of the source name, used as the output
    /// directory. `https://x/photos/cat.jpg` and `/a/cat.jpg` both give
    /// `cat`.
    pub fn base_name(&self) -> String {
        let stem = match self {
            Self::Remote(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
                .and_then(|last| {
                    Path::new(&last)
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                }),
            Self::Local(path) => path.file_stem().map(|s| s.to_string_lossy().into_owned()),
        };

        let sanitized: String = stem
            .unwrap_or_default()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        if sanitized.trim_matches('.').is_empty() {
            FALLBACK_BASE_NAME.to_string()
        } else {
            sanitized
        }
    }

    /// Reads the full source into memory.
    pub async fn load(&self, http: &dyn AsyncHttpClient) -> Result<Bytes, VariantError> {
        match self {
            Self::Remote(url) => {
                debug!(url = %url, "Fetching remote source");
                http.get(url.as_str())
                    .await
                    .map_err(|e| VariantError::source_unavailable(url.as_str(), e.to_string()))
            }
            Self::Local(path) => {
                debug!(path = %path.display(), "Reading local source");
                tokio::fs::read(path).await.map(Bytes::from).map_err(|e| {
                    VariantError::source_unavailable(
                        path.display().to_string(),
                        format!(
                            "local image path not found or not accessible: {}: {}",
                            path.display(),
                            e
                        ),
                    )
                })
            }
        }
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(url) => write!(f, "{}", url),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}
