//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor and
//! built once by the CLI for one-shot commands. It holds the catalog behind
//! a `RwLock` (replaced wholesale on import), the board handle and a shared
//! `reqwest` client for manifest fetches.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::catalog::Catalog;
use crate::config::{HostConfig, HttpTimeouts, PluginConfig};
use crate::host::memory::MemoryBoard;
use crate::host::rest::RestBoard;
use crate::host::{BoardHost, HostError};

// =============================================================================
// BOARD HANDLE
// =============================================================================

/// The configured board. Memory boards remember their snapshot file so
/// mutations can be written back.
#[derive(Clone)]
pub enum BoardHandle {
    Memory { board: Arc<MemoryBoard>, file: Option<PathBuf> },
    Rest(Arc<RestBoard>),
}

impl BoardHandle {
    /// Build the board described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be read or the HTTP client
    /// cannot be built.
    pub async fn from_config(config: &PluginConfig) -> Result<Self, HostError> {
        match &config.host {
            HostConfig::Memory { board_file: Some(path) } => {
                let board = MemoryBoard::load(path).await?;
                info!(path = %path.display(), items = board.items().await.len(), "memory board loaded");
                Ok(Self::Memory { board: Arc::new(board), file: Some(path.clone()) })
            }
            HostConfig::Memory { board_file: None } => {
                Ok(Self::Memory { board: Arc::new(MemoryBoard::new()), file: None })
            }
            HostConfig::Rest(rest) => {
                let board = RestBoard::new(
                    &rest.base_url,
                    rest.board_id.clone(),
                    rest.token.clone(),
                    config.timeouts.request(),
                    config.timeouts.connect(),
                )?;
                info!(base_url = %rest.base_url, board_id = %rest.board_id, "REST board configured");
                Ok(Self::Rest(Arc::new(board)))
            }
        }
    }

    #[must_use]
    pub fn host(&self) -> &dyn BoardHost {
        match self {
            Self::Memory { board, .. } => board.as_ref(),
            Self::Rest(board) => board.as_ref(),
        }
    }

    /// Write a memory board back to its snapshot file, if it has one.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    pub async fn persist(&self) -> Result<(), HostError> {
        if let Self::Memory { board, file: Some(path) } = self {
            board.save(path).await?;
            info!(path = %path.display(), "memory board saved");
        }
        Ok(())
    }
}

// =============================================================================
// APP STATE
// =============================================================================

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PluginConfig>,
    pub catalog: Arc<RwLock<Catalog>>,
    pub board: BoardHandle,
    pub http: reqwest::Client,
}

impl AppState {
    #[must_use]
    pub fn new(config: PluginConfig, board: BoardHandle, http: reqwest::Client) -> Self {
        Self { config: Arc::new(config), catalog: Arc::new(RwLock::new(Catalog::default())), board, http }
    }
}

/// HTTP client for manifest fetches.
///
/// # Errors
///
/// Returns an error if the client cannot be built.
pub fn http_client(timeouts: HttpTimeouts) -> Result<reqwest::Client, HostError> {
    reqwest::Client::builder()
        .timeout(timeouts.request())
        .connect_timeout(timeouts.connect())
        .build()
        .map_err(|e| HostError::HttpClientBuild(e.to_string()))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_handle_persists_to_snapshot() {
        let path = std::env::temp_dir().join(format!("plantilles-state-{}.json", uuid::Uuid::new_v4()));
        let mut config = test_helpers::test_config(crate::manifest::ManifestSource::File(path.clone()));
        config.host = HostConfig::Memory { board_file: Some(path.clone()) };

        let handle = BoardHandle::from_config(&config).await.unwrap();
        handle.persist().await.unwrap();
        assert!(tokio::fs::try_exists(&path).await.unwrap());
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn memory_handle_without_file_does_not_persist() {
        let config = test_helpers::test_config(crate::manifest::ManifestSource::File("x".into()));
        let handle = BoardHandle::from_config(&config).await.unwrap();
        assert!(handle.persist().await.is_ok());
        assert!(matches!(handle, BoardHandle::Memory { file: None, .. }));
    }

    #[test]
    fn new_state_starts_with_empty_catalog() {
        let state = test_helpers::test_app_state();
        assert!(state.catalog.try_read().unwrap().is_empty());
    }
}
