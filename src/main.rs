use std::path::PathBuf;

use clap::{Parser, Subcommand};
use plantilles::catalog::{SessionFilter, TemplateSummary};
use plantilles::config::{ConfigError, HostConfig, PluginConfig};
use plantilles::geometry::Point;
use plantilles::host::HostError;
use plantilles::manifest::{MANIFEST_FILE_NAME, ManifestError, ManifestSource, to_pretty_json};
use plantilles::model::TemplateKey;
use plantilles::services::export::{ExportError, ExportOptions, export_board};
use plantilles::services::import::{ImportError, import_catalog};
use plantilles::services::placement::{PlacementError, place_by_key};
use plantilles::state::{AppState, BoardHandle, http_client};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Host(#[from] HostError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Placement(#[from] PlacementError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Catalog(#[from] plantilles::catalog::CatalogError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("output serialization failed: {0}")]
    Output(#[from] serde_json::Error),
    #[error("invalid template key '{0}' (expected <phase>.<index>)")]
    InvalidKey(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "plantilles", about = "Frame-template catalog and placement service")]
struct Cli {
    /// Manifest URL or file path.
    #[arg(long, env = "MANIFEST_SOURCE")]
    manifest: Option<String>,

    /// Use an in-memory board backed by this JSON snapshot.
    #[arg(long)]
    board_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the panel HTTP API.
    Serve {
        #[arg(long, env = "PORT")]
        port: Option<u16>,
    },
    /// Print catalog entries as JSON.
    List {
        #[arg(long, default_value = "all")]
        session: String,
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Place one template on the board.
    Place {
        /// Template key, e.g. `2.3`.
        key: String,
        #[arg(long, allow_hyphen_values = true)]
        offset_x: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        offset_y: Option<f64>,
    },
    /// Export board frames as a manifest.
    Export {
        /// Output path, `-` for stdout.
        #[arg(long, short, default_value = MANIFEST_FILE_NAME)]
        output: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = PluginConfig::from_env()?;
    if let Some(manifest) = &cli.manifest {
        config.manifest_source = ManifestSource::parse(manifest);
    }
    if let Some(path) = cli.board_file {
        config.host = HostConfig::Memory { board_file: Some(path) };
    }

    let board = BoardHandle::from_config(&config).await?;
    let http = http_client(config.timeouts)?;

    match cli.command {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            run_serve(AppState::new(config, board, http)).await
        }
        Command::List { session, search } => {
            run_list(&AppState::new(config, board, http), &session, &search).await
        }
        Command::Place { key, offset_x, offset_y } => {
            let offset = Point::new(
                offset_x.unwrap_or(config.staging_offset.x),
                offset_y.unwrap_or(config.staging_offset.y),
            );
            run_place(&AppState::new(config, board, http), &key, offset).await
        }
        Command::Export { output } => run_export(&board, &output).await,
    }
}

async fn run_serve(state: AppState) -> Result<(), CliError> {
    let port = state.config.port;

    // A missing manifest at start-up leaves the catalog empty; the panel
    // can re-import later. The import has already logged the failure.
    if import_catalog(&state.config.manifest_source, &state.http, &state.catalog)
        .await
        .is_err()
    {
        tracing::debug!("serving with an empty catalog");
    }

    let app = plantilles::routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;

    tracing::info!(%port, "plantilles listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn run_list(state: &AppState, session: &str, search: &str) -> Result<(), CliError> {
    import_catalog(&state.config.manifest_source, &state.http, &state.catalog).await?;
    let session = SessionFilter::parse(session)?;

    let catalog = state.catalog.read().await;
    let entries: Vec<TemplateSummary> = catalog
        .filtered(session, search)
        .into_iter()
        .map(TemplateSummary::from)
        .collect();
    let json = serde_json::to_string_pretty(&entries)?;
    println!("{json}");
    Ok(())
}

async fn run_place(state: &AppState, key: &str, offset: Point) -> Result<(), CliError> {
    let key = TemplateKey::parse(key).ok_or_else(|| CliError::InvalidKey(key.to_string()))?;
    import_catalog(&state.config.manifest_source, &state.http, &state.catalog).await?;

    let catalog = state.catalog.read().await.clone();
    let report = place_by_key(state.board.host(), &catalog, key, offset, &state.config.placement_options()).await?;
    state.board.persist().await?;

    println!(
        "placed {} \"{}\" as frame {}: {} created, {} failed",
        report.key, report.title, report.frame_id, report.created, report.failed
    );
    Ok(())
}

async fn run_export(board: &BoardHandle, output: &str) -> Result<(), CliError> {
    let frames = export_board(board.host(), &ExportOptions::default()).await?;
    let json = to_pretty_json(&frames)?;

    if output == "-" {
        println!("{json}");
    } else {
        tokio::fs::write(output, json).await?;
        tracing::info!(path = %output, frames = frames.len(), "export written");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_and_manifest_errors_keep_their_own_messages() {
        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = CliError::from(json);
        assert!(matches!(err, CliError::Output(_)));
        assert!(err.to_string().starts_with("output serialization failed"));

        let err = CliError::from(ManifestError::NotAnArray);
        assert!(matches!(err, CliError::Manifest(_)));
        assert_eq!(err.to_string(), "manifest must be a JSON array of frames");
    }

    #[test]
    fn place_key_parses_from_cli() {
        let cli = Cli::try_parse_from(["plantilles", "place", "2.3", "--offset-x", "-50"]).unwrap();
        match cli.command {
            Command::Place { key, offset_x, offset_y } => {
                assert_eq!(TemplateKey::parse(&key), Some(TemplateKey::new(2, 3)));
                assert_eq!(offset_x, Some(-50.0));
                assert!(offset_y.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
