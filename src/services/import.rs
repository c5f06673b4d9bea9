//! Import service: fetch the manifest and swap the catalog.
//!
//! ERROR HANDLING
//! ==============
//! The catalog is replaced only after the whole manifest has been read and
//! parsed. Any fetch or parse failure is logged once and returned; the
//! previous catalog stays in place.

use tokio::sync::RwLock;
use tracing::{error, info};

use crate::catalog::Catalog;
use crate::error::ErrorCode;
use crate::manifest::{LoadSummary, ManifestError, ManifestSource, parse_manifest};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("manifest import failed from {source_name}: {error}")]
    Manifest {
        source_name: String,
        #[source]
        error: ManifestError,
    },
}

impl ErrorCode for ImportError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Manifest { error, .. } => error.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Manifest { error, .. } => error.retryable(),
        }
    }
}

/// Read `source` and replace the catalog's templates.
///
/// # Errors
///
/// Returns an error if the manifest cannot be read or is not a JSON array.
/// The catalog is untouched in that case.
pub async fn import_catalog(
    source: &ManifestSource,
    http: &reqwest::Client,
    catalog: &RwLock<Catalog>,
) -> Result<LoadSummary, ImportError> {
    info!(%source, "import: reading manifest");

    let report = source
        .read_text(http)
        .await
        .and_then(|text| parse_manifest(&text))
        .map_err(|error| {
            error!(%source, %error, "import: manifest import failed, catalog unchanged");
            ImportError::Manifest { source_name: source.to_string(), error }
        })?;

    let summary = report.summary();
    catalog.write().await.replace(report.templates);
    info!(
        loaded = summary.loaded,
        skipped_frames = summary.skipped_frames,
        rejected_items = summary.rejected_items,
        duplicate_keys = summary.duplicate_keys,
        "import: catalog replaced"
    );
    Ok(summary)
}

#[cfg(test)]
#[path = "import_test.rs"]
mod tests;
