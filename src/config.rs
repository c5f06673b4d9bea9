//! Plugin configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::geometry::Point;
use crate::manifest::ManifestSource;
use crate::services::placement::{DEFAULT_CHILDREN_SETTLE_MS, PlacementOptions};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MANIFEST_SOURCE: &str = "public/plantilles.json";
pub const DEFAULT_PUBLIC_DIR: &str = "public";
pub const DEFAULT_THUMBNAILS_DIR: &str = "public/thumbnails";
pub const DEFAULT_BOARD_API_BASE_URL: &str = "https://api.miro.com/v2";
pub const DEFAULT_PLACEMENT_OFFSET_X: f64 = 10_000.0;
pub const DEFAULT_PLACEMENT_OFFSET_Y: f64 = 0.0;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable: {var}")]
    MissingVar { var: String },
    #[error("invalid value for {var}: {value}")]
    Invalid { var: String, value: String },
}

impl crate::error::ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingVar { .. } => "E_CONFIG_MISSING",
            Self::Invalid { .. } => "E_CONFIG_INVALID",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestHostConfig {
    pub base_url: String,
    pub board_id: String,
    pub token: String,
}

/// Which board the service talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostConfig {
    /// In-memory board, optionally loaded from and saved to a JSON snapshot.
    Memory { board_file: Option<PathBuf> },
    Rest(RestHostConfig),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl HttpTimeouts {
    #[must_use]
    pub fn request(self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    #[must_use]
    pub fn connect(self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PluginConfig {
    pub port: u16,
    pub manifest_source: ManifestSource,
    pub public_dir: PathBuf,
    pub thumbnails_dir: PathBuf,
    pub host: HostConfig,
    pub staging_offset: Point,
    pub placement_settle_ms: u64,
    pub verbose_logging: bool,
    pub timeouts: HttpTimeouts,
}

impl PluginConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `MANIFEST_SOURCE`: URL or file path, default `public/plantilles.json`
    /// - `PUBLIC_DIR` / `THUMBNAILS_DIR`: static asset roots
    /// - `BOARD_HOST`: `memory` (default) or `rest`
    /// - `BOARD_FILE`: snapshot path for the memory host
    /// - `PLACEMENT_OFFSET_X` / `PLACEMENT_OFFSET_Y`: default 10000 / 0
    /// - `PLACEMENT_SETTLE_MS`: default 1500
    /// - `VERBOSE_LOGGING`: default false
    /// - `HTTP_TIMEOUT_SECS` / `HTTP_CONNECT_TIMEOUT_SECS`: default 30 / 10
    ///
    /// Required when `BOARD_HOST=rest`:
    /// - `BOARD_ID`
    /// - `BOARD_TOKEN_ENV` (names the env var containing the token)
    /// - `BOARD_API_BASE_URL` is optional, default `https://api.miro.com/v2`
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown `BOARD_HOST` or missing REST settings.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = match std::env::var("BOARD_HOST").ok().as_deref().unwrap_or("memory") {
            "memory" => HostConfig::Memory { board_file: std::env::var("BOARD_FILE").ok().map(PathBuf::from) },
            "rest" => HostConfig::Rest(rest_from_env()?),
            other => {
                return Err(ConfigError::Invalid { var: "BOARD_HOST".into(), value: other.to_string() });
            }
        };

        Ok(Self {
            port: env_parse("PORT", DEFAULT_PORT),
            manifest_source: ManifestSource::parse(&env_or("MANIFEST_SOURCE", DEFAULT_MANIFEST_SOURCE)),
            public_dir: PathBuf::from(env_or("PUBLIC_DIR", DEFAULT_PUBLIC_DIR)),
            thumbnails_dir: PathBuf::from(env_or("THUMBNAILS_DIR", DEFAULT_THUMBNAILS_DIR)),
            host,
            staging_offset: Point::new(
                env_parse("PLACEMENT_OFFSET_X", DEFAULT_PLACEMENT_OFFSET_X),
                env_parse("PLACEMENT_OFFSET_Y", DEFAULT_PLACEMENT_OFFSET_Y),
            ),
            placement_settle_ms: env_parse("PLACEMENT_SETTLE_MS", DEFAULT_CHILDREN_SETTLE_MS),
            verbose_logging: env_parse("VERBOSE_LOGGING", false),
            timeouts: HttpTimeouts {
                request_secs: env_parse("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS),
                connect_secs: env_parse("HTTP_CONNECT_TIMEOUT_SECS", DEFAULT_HTTP_CONNECT_TIMEOUT_SECS),
            },
        })
    }

    #[must_use]
    pub fn placement_options(&self) -> PlacementOptions {
        PlacementOptions {
            verbose_logging: self.verbose_logging,
            children_settle: Duration::from_millis(self.placement_settle_ms),
            ..PlacementOptions::default()
        }
    }
}

fn rest_from_env() -> Result<RestHostConfig, ConfigError> {
    let board_id = std::env::var("BOARD_ID").map_err(|_| ConfigError::MissingVar { var: "BOARD_ID".into() })?;
    let token_var =
        std::env::var("BOARD_TOKEN_ENV").map_err(|_| ConfigError::MissingVar { var: "BOARD_TOKEN_ENV".into() })?;
    let token = std::env::var(&token_var).map_err(|_| ConfigError::MissingVar { var: token_var.clone() })?;
    let base_url = env_or("BOARD_API_BASE_URL", DEFAULT_BOARD_API_BASE_URL)
        .trim_end_matches('/')
        .to_string();
    Ok(RestHostConfig { base_url, board_id, token })
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
