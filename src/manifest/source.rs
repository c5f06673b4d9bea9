//! Where the manifest comes from: an HTTP URL or a local file.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use super::ManifestError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    Url(String),
    File(PathBuf),
}

impl ManifestSource {
    /// `http://` and `https://` values are URLs, anything else is a path.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Self::Url(raw.to_string())
        } else {
            Self::File(PathBuf::from(raw))
        }
    }

    /// Read the manifest text. URLs are fetched with a cache-busting
    /// `nocache` query parameter.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the status is not 2xx, or the
    /// file cannot be read.
    pub async fn read_text(&self, http: &reqwest::Client) -> Result<String, ManifestError> {
        match self {
            Self::Url(url) => {
                let url = cache_busted(url, now_ms());
                let response = http
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| ManifestError::Fetch(e.to_string()))?;

                let status = response.status();
                if !status.is_success() {
                    return Err(ManifestError::Status { url, status: status.as_u16() });
                }
                response
                    .text()
                    .await
                    .map_err(|e| ManifestError::Fetch(e.to_string()))
            }
            Self::File(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ManifestError::Read { path: path.display().to_string(), source }),
        }
    }
}

impl std::fmt::Display for ManifestSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn cache_busted(url: &str, stamp: u128) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}nocache={stamp}")
}
