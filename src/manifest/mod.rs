//! Manifest: the `plantilles.json` wire format.
//!
//! DESIGN
//! ======
//! The manifest is a JSON array of frames, each with an `items` array of
//! children whose positions are relative to the frame's top-left corner.
//! The same shape is read on import and written on export. Field names stay
//! as they appear on the wire (`fase`, `ordre`, `xRel`).
//!
//! Parsing is deliberately lenient per field: a value of the wrong JSON type
//! reads as absent instead of failing the whole entry, so a single malformed
//! field drops (at most) one item, never the whole load.

pub mod load;
pub mod source;
pub mod title;

use serde::{Deserialize, Serialize};

use crate::model::Props;

pub use load::{LoadReport, LoadSummary, load_templates, parse_manifest};
pub use source::ManifestSource;

/// Download name of the manifest and of exported snapshots.
pub const MANIFEST_FILE_NAME: &str = "plantilles.json";

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest request failed: {0}")]
    Fetch(String),
    #[error("manifest request to {url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("manifest is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("manifest must be a JSON array of frames")]
    NotAnArray,
}

impl crate::error::ErrorCode for ManifestError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "E_MANIFEST_FETCH",
            Self::Status { .. } => "E_MANIFEST_STATUS",
            Self::Read { .. } => "E_MANIFEST_READ",
            Self::Parse(_) => "E_MANIFEST_PARSE",
            Self::NotAnArray => "E_MANIFEST_SHAPE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::Status { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

/// One frame entry of the manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestFrame {
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::unsigned", skip_serializing_if = "Option::is_none")]
    pub fase: Option<u32>,
    #[serde(default, deserialize_with = "lenient::unsigned", skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, deserialize_with = "lenient::props", skip_serializing_if = "Option::is_none")]
    pub style: Option<Props>,
    #[serde(deserialize_with = "lenient::items")]
    pub items: Vec<ManifestItem>,
}

/// One child entry of a manifest frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestItem {
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub x_rel: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub y_rel: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, deserialize_with = "lenient::props", skip_serializing_if = "Option::is_none")]
    pub style: Option<Props>,
    #[serde(default, deserialize_with = "lenient::props", skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Props>,
    #[serde(default, deserialize_with = "lenient::integer", skip_serializing_if = "Option::is_none")]
    pub ordre: Option<i64>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Serialize frames the way the export artifact is written.
///
/// # Errors
///
/// Returns a parse error if serialization fails.
pub fn to_pretty_json(frames: &[ManifestFrame]) -> Result<String, ManifestError> {
    Ok(serde_json::to_string_pretty(frames)?)
}

// =============================================================================
// LENIENT FIELD READERS
// =============================================================================

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::ManifestItem;
    use crate::model::Props;

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(Value::deserialize(d)?.as_f64())
    }

    pub fn integer<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        Ok(Value::deserialize(d)?.as_i64())
    }

    pub fn unsigned<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        Ok(Value::deserialize(d)?
            .as_u64()
            .and_then(|v| u32::try_from(v).ok()))
    }

    /// Strings as-is; numeric ids are accepted and stringified.
    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn props<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Props>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Object(map) => Some(map),
            _ => None,
        })
    }

    /// `items` must be an array; entries that are not objects read as an
    /// item with no kind, which the loader rejects.
    pub fn items<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<ManifestItem>, D::Error> {
        match Value::deserialize(d)? {
            Value::Array(entries) => Ok(entries
                .into_iter()
                .map(|entry| serde_json::from_value(entry).unwrap_or_default())
                .collect()),
            _ => Err(serde::de::Error::custom("items must be an array")),
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
