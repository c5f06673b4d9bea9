//! Board export as a downloadable manifest.

use axum::extract::State;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};

use super::ApiError;
use crate::manifest::{MANIFEST_FILE_NAME, to_pretty_json};
use crate::services::export::{ExportError, ExportOptions, export_board as read_board};
use crate::state::AppState;

/// `GET /api/export`: every board frame as `plantilles.json`.
pub async fn export_board(State(state): State<AppState>) -> Result<Response, ApiError> {
    let frames = read_board(state.board.host(), &ExportOptions::default())
        .await
        .map_err(ApiError::from_error)?;
    let json = to_pretty_json(&frames)
        .map_err(ExportError::from)
        .map_err(ApiError::from_error)?;
    Ok(attachment(json))
}

fn attachment(json: String) -> Response {
    (
        [
            (CONTENT_TYPE, "application/json; charset=utf-8".to_string()),
            (CONTENT_DISPOSITION, format!("attachment; filename=\"{MANIFEST_FILE_NAME}\"")),
        ],
        json,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryBoard;
    use crate::host::{BoardItem, FRAME_KIND};
    use crate::state::test_helpers::test_app_state_with;

    #[test]
    fn attachment_sets_download_headers() {
        let response = attachment("[]".into());
        let headers = response.headers();
        assert_eq!(
            headers
                .get(CONTENT_DISPOSITION)
                .and_then(|v| v.to_str().ok()),
            Some("attachment; filename=\"plantilles.json\"")
        );
        assert_eq!(
            headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some("application/json; charset=utf-8")
        );
    }

    #[tokio::test]
    async fn export_handler_returns_attachment() {
        let board = MemoryBoard::with_items(vec![BoardItem {
            id: "f".into(),
            kind: FRAME_KIND.into(),
            title: Some("1.1 - A".into()),
            x: Some(0.0),
            y: Some(0.0),
            width: Some(10.0),
            height: Some(10.0),
            ..BoardItem::default()
        }]);
        let state = test_app_state_with(board);

        let response = export_board(State(state)).await.unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
        assert!(response.headers().contains_key(CONTENT_DISPOSITION));
    }
}
