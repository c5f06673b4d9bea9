//! Export service: board frames back into manifest form.
//!
//! Each frame's children are the items parented to it. A frame with no
//! parented items (boards built before frames owned their contents) falls
//! back to every non-frame item whose centre lies inside the frame.
//! Children are re-read one by one with a pause between reads, and their
//! positions are stored relative to the frame's top-left corner.

use std::time::Duration;

use tracing::{info, warn};

use crate::error::ErrorCode;
use crate::geometry::{self, Rect};
use crate::host::{BoardHost, BoardItem, FRAME_KIND, HostError, ItemQuery};
use crate::manifest::{ManifestFrame, ManifestItem};
use crate::model::ElementKind;

pub const DEFAULT_ITEM_PAUSE_MS: u64 = 100;
pub const DEFAULT_FRAME_PAUSE_MS: u64 = 500;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("board read failed: {0}")]
    Host(#[from] HostError),
    #[error("export serialization failed: {0}")]
    Serialize(#[from] crate::manifest::ManifestError),
}

impl ErrorCode for ExportError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Host(e) => e.error_code(),
            Self::Serialize(_) => "E_EXPORT_SERIALIZE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Host(e) if e.retryable())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub item_pause: Duration,
    pub frame_pause: Duration,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            item_pause: Duration::from_millis(DEFAULT_ITEM_PAUSE_MS),
            frame_pause: Duration::from_millis(DEFAULT_FRAME_PAUSE_MS),
        }
    }
}

/// Read every frame on the board as a manifest entry.
///
/// # Errors
///
/// Returns an error if the frame or item listing fails. Failures reading a
/// single item are logged and the item is left out.
pub async fn export_board(host: &dyn BoardHost, opts: &ExportOptions) -> Result<Vec<ManifestFrame>, ExportError> {
    info!("export: reading board frames");
    let frames = host.query(&ItemQuery::of_kind(FRAME_KIND)).await?;
    let all_items = host.query(&ItemQuery::all()).await?;

    let mut exported = Vec::with_capacity(frames.len());
    for frame in &frames {
        let Some(rect) = frame.rect() else {
            warn!(frame_id = %frame.id, "export: frame without usable geometry skipped");
            continue;
        };

        let members = frame_members(frame, &rect, &all_items);
        let mut items = Vec::with_capacity(members.len());
        for (ordre, member) in members.iter().enumerate() {
            match host.get(&member.id).await {
                Ok(Some(full)) => {
                    if let Some(item) = export_item(&full, &rect, ordre) {
                        items.push(item);
                    }
                }
                Ok(None) => warn!(item_id = %member.id, "export: item disappeared"),
                Err(e) => warn!(item_id = %member.id, error = %e, "export: could not read item"),
            }
            tokio::time::sleep(opts.item_pause).await;
        }

        info!(frame_id = %frame.id, title = ?frame.title, items = items.len(), "export: frame read");
        exported.push(export_frame(frame, &rect, items));
        tokio::time::sleep(opts.frame_pause).await;
    }

    info!(frames = exported.len(), "export: completed");
    Ok(exported)
}

/// Parented children, or items whose centre lies inside the frame when
/// nothing is parented to it.
fn frame_members<'a>(frame: &BoardItem, rect: &Rect, all_items: &'a [BoardItem]) -> Vec<&'a BoardItem> {
    let parented: Vec<&BoardItem> = all_items
        .iter()
        .filter(|item| item.parent_id.as_deref() == Some(frame.id.as_str()))
        .collect();
    if !parented.is_empty() {
        return parented;
    }
    all_items
        .iter()
        .filter(|item| !item.is_frame())
        .filter(|item| item.center().is_some_and(|c| rect.contains(c)))
        .collect()
}

/// `None` for images, non-element kinds and items without finite geometry.
fn export_item(item: &BoardItem, frame: &Rect, ordre: usize) -> Option<ManifestItem> {
    match ElementKind::from_str(&item.kind) {
        None | Some(ElementKind::Image) => return None,
        Some(_) => {}
    }
    let own = item.rect()?;
    let relative = geometry::to_relative(frame, geometry::Point::new(own.x, own.y))?;

    Some(ManifestItem {
        id: Some(item.id.clone()),
        kind: Some(item.kind.clone()),
        x_rel: Some(relative.x),
        y_rel: Some(relative.y),
        width: Some(own.width),
        height: Some(own.height),
        content: item.content.clone(),
        rotation: item.rotation,
        style: Some(item.style.clone()),
        metadata: Some(item.metadata.clone()),
        ordre: i64::try_from(ordre).ok(),
        shape: item.shape.clone(),
        scale: item.scale,
        title: item.title.clone(),
        emoji: item.emoji.clone(),
        url: None,
    })
}

fn export_frame(frame: &BoardItem, rect: &Rect, items: Vec<ManifestItem>) -> ManifestFrame {
    ManifestFrame {
        id: Some(frame.id.clone()),
        title: frame.title.clone(),
        fase: Some(0),
        index: Some(0),
        thumbnail: Some(String::new()),
        x: Some(rect.x),
        y: Some(rect.y),
        width: Some(rect.width),
        height: Some(rect.height),
        style: Some(frame.style.clone()),
        items,
    }
}

#[cfg(test)]
#[path = "export_test.rs"]
mod tests;
