//! Placement service: recreate a catalog template on the board.
//!
//! DESIGN
//! ======
//! Placement is all-or-nothing up to frame creation and best-effort after
//! it. The template is resolved and every child validated before the first
//! host call; any invalid geometry aborts with nothing created. Once the
//! frame exists, children are created concurrently and each one's failure is
//! counted without affecting its siblings.
//!
//! The host does not guarantee read-after-write consistency for fresh or
//! reparented items, so fixed settle delays (see `PlacementOptions`) sit
//! between dependent calls.
//!
//! ERROR HANDLING
//! ==============
//! `PlacementError` covers the aborting cases only. Per-child failures end up
//! in `PlacementReport::failed`; a failed post-creation update is logged and
//! not counted.

use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, CatalogError};
use crate::error::ErrorCode;
use crate::geometry::{self, Bounds, Point, Rect};
use crate::host::{BoardHost, BoardItem, DraftBody, HostError, ItemDraft, ItemUpdate};
use crate::model::{Element, ElementBody, Template, TemplateKey};

pub const DEFAULT_FRAME_FILL: &str = "#ffffff";
pub const DEFAULT_STICKY_SHAPE: &str = "square";
pub const DEFAULT_SHAPE: &str = "rectangle";
pub const DEFAULT_CHILD_MARGIN: f64 = 4.0;
pub const DEFAULT_FRAME_SETTLE_MS: u64 = 100;
pub const DEFAULT_CHILDREN_SETTLE_MS: u64 = 1500;
pub const DEFAULT_REPARENT_SETTLE_MS: u64 = 200;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("template {key} failed validation: {}", problems.join("; "))]
    Validation { key: TemplateKey, problems: Vec<String> },
    #[error("template {0} has no placeable children")]
    EmptyBounds(TemplateKey),
    #[error("host error: {0}")]
    Host(#[from] HostError),
}

impl ErrorCode for PlacementError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Catalog(e) => e.error_code(),
            Self::Validation { .. } => "E_TEMPLATE_INVALID",
            Self::EmptyBounds(_) => "E_TEMPLATE_EMPTY",
            Self::Host(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Host(e) if e.retryable())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacementOptions {
    /// Per-child diagnostics at info level.
    pub verbose_logging: bool,
    /// Wait after creating the frame, before re-reading it.
    pub frame_settle: Duration,
    /// Wait before the child fan-out starts.
    pub children_settle: Duration,
    /// Wait after each reparent, before re-reading the child.
    pub reparent_settle: Duration,
    /// Gap between the frame's top-left corner and the children's bounding box.
    pub margin: f64,
}

impl Default for PlacementOptions {
    fn default() -> Self {
        Self {
            verbose_logging: false,
            frame_settle: Duration::from_millis(DEFAULT_FRAME_SETTLE_MS),
            children_settle: Duration::from_millis(DEFAULT_CHILDREN_SETTLE_MS),
            reparent_settle: Duration::from_millis(DEFAULT_REPARENT_SETTLE_MS),
            margin: DEFAULT_CHILD_MARGIN,
        }
    }
}

/// Outcome of one placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacementReport {
    pub key: String,
    pub title: String,
    pub frame_id: String,
    pub created: usize,
    pub failed: usize,
}

/// A child ready to create: its element and absolute centre.
struct Placeable<'a> {
    element: &'a Element,
    position: Point,
}

// =============================================================================
// PLACEMENT
// =============================================================================

/// Resolve `key` in `catalog`, stage it at `offset` and place it.
///
/// # Errors
///
/// See [`place_template`].
pub async fn place_by_key(
    host: &dyn BoardHost,
    catalog: &Catalog,
    key: TemplateKey,
    offset: Point,
    opts: &PlacementOptions,
) -> Result<PlacementReport, PlacementError> {
    let template = catalog.find(key)?;
    let staged = template.staged_at_offset(offset.x, offset.y);
    place_template(host, catalog, &staged, opts).await
}

/// Place `staged` (a catalog template moved to its target position).
///
/// Children and size come from the catalog entry with the same key; only
/// the staged centre is used from `staged`.
///
/// # Errors
///
/// Returns an error, with nothing created, when the key is not in the
/// catalog, any geometry is invalid, or no child is placeable. Returns a
/// host error if the frame itself cannot be created or read back.
pub async fn place_template(
    host: &dyn BoardHost,
    catalog: &Catalog,
    staged: &Template,
    opts: &PlacementOptions,
) -> Result<PlacementReport, PlacementError> {
    let template = catalog.find(staged.key)?;

    let frame = validate(template)?;

    let mut failed = template.rejected.len();
    let mut placeable: Vec<Placeable<'_>> = Vec::with_capacity(template.children.len());
    for element in &template.children {
        if !host.supports(element.kind()) {
            warn!(key = %template.key, kind = %element.kind(), "placement: kind not supported by host");
            failed += 1;
            continue;
        }
        match element.absolute_position(&frame) {
            Some(position) => placeable.push(Placeable { element, position }),
            None => failed += 1,
        }
    }
    placeable.sort_by(|a, b| b.element.z_order.cmp(&a.element.z_order));

    let bounds = children_bounds(&placeable);
    if bounds.is_fallback() {
        return Err(PlacementError::EmptyBounds(template.key));
    }

    let origin = staged_origin(staged, &frame);
    let frame_item = host
        .create(&ItemDraft {
            position: Point::new(origin.x + frame.width / 2.0, origin.y + frame.height / 2.0),
            rotation: None,
            body: DraftBody::Frame {
                title: template.title.clone(),
                width: template.width,
                height: template.height,
                fill_color: template
                    .fill_color()
                    .unwrap_or(DEFAULT_FRAME_FILL)
                    .to_string(),
            },
        })
        .await?;
    debug!(
        frame_id = %frame_item.id,
        width = ?frame_item.width,
        height = ?frame_item.height,
        "placement: frame created"
    );

    tokio::time::sleep(opts.frame_settle).await;
    let frame_item = host
        .get(&frame_item.id)
        .await?
        .ok_or_else(|| HostError::NotFound(frame_item.id.clone()))?;

    tokio::time::sleep(opts.children_settle).await;

    let tasks = placeable.iter().map(|p| {
        let target = Point::new(
            p.position.x - bounds.min_x + origin.x + opts.margin,
            p.position.y - bounds.min_y + origin.y + opts.margin,
        );
        place_child(host, &frame_item, p.element, target, opts)
    });
    let results = join_all(tasks).await;

    let created = results.iter().filter(|ok| **ok).count();
    failed += results.len() - created;

    info!(
        key = %template.key,
        title = %template.title,
        frame_id = %frame_item.id,
        created,
        failed,
        "placement: template placed"
    );

    if let Err(e) = host.zoom_to(&frame_item.id).await {
        warn!(frame_id = %frame_item.id, error = %e, "placement: viewport focus failed");
    }

    Ok(PlacementReport {
        key: template.key.to_string(),
        title: template.title.clone(),
        frame_id: frame_item.id,
        created,
        failed,
    })
}

/// Check the frame and every child before any host call.
fn validate(template: &Template) -> Result<Rect, PlacementError> {
    let mut problems = Vec::new();
    if !template.x.is_finite() || !template.y.is_finite() {
        problems.push("frame position invalid".to_string());
    }
    if !template.width.is_some_and(f64::is_finite) {
        problems.push("frame width invalid".to_string());
    }
    if !template.height.is_some_and(f64::is_finite) {
        problems.push("frame height invalid".to_string());
    }
    for (i, element) in template.children.iter().enumerate() {
        for problem in element.geometry_problems() {
            problems.push(format!("child {i} ({}): {problem}", element.kind()));
        }
    }

    match template.frame_rect() {
        Some(rect) if problems.is_empty() => Ok(rect),
        _ => {
            warn!(key = %template.key, ?problems, "placement: template failed validation");
            Err(PlacementError::Validation { key: template.key, problems })
        }
    }
}

fn children_bounds(placeable: &[Placeable<'_>]) -> Bounds {
    let rects: Vec<Rect> = placeable
        .iter()
        .map(|p| Rect::new(p.position.x, p.position.y, p.element.width, p.element.height))
        .collect();
    geometry::bounding_box(&rects)
}

/// Top-left of the new frame. A non-finite staged centre falls back to the
/// origin.
fn staged_origin(staged: &Template, frame: &Rect) -> Point {
    let x = if staged.x.is_finite() { staged.x } else { 0.0 };
    let y = if staged.y.is_finite() { staged.y } else { 0.0 };
    Point::new(x - frame.width / 2.0, y - frame.height / 2.0)
}

// =============================================================================
// CHILDREN
// =============================================================================

/// Create, reparent, settle, update. `true` when the child landed in the
/// frame.
async fn place_child(
    host: &dyn BoardHost,
    frame: &BoardItem,
    element: &Element,
    target: Point,
    opts: &PlacementOptions,
) -> bool {
    if !target.is_finite() {
        warn!(kind = %element.kind(), "placement: child position not finite");
        return false;
    }
    let draft = match child_draft(element, target) {
        Ok(draft) => draft,
        Err(reason) => {
            warn!(kind = %element.kind(), reason, "placement: child rejected");
            return false;
        }
    };

    let item = match host.create(&draft).await {
        Ok(item) => item,
        Err(e) => {
            warn!(kind = %element.kind(), error = %e, "placement: child creation failed");
            return false;
        }
    };
    if opts.verbose_logging {
        info!(item_id = %item.id, kind = %item.kind, parent = ?item.parent_id, "placement: child created");
    }

    if let Err(e) = host.add_to_frame(&frame.id, &item.id).await {
        warn!(item_id = %item.id, error = %e, "placement: reparent failed");
        return false;
    }
    tokio::time::sleep(opts.reparent_settle).await;

    match host.get(&item.id).await {
        Ok(Some(refreshed)) if opts.verbose_logging => {
            info!(item_id = %item.id, parent = ?refreshed.parent_id, "placement: child reparented");
        }
        Ok(Some(_)) => {}
        Ok(None) => warn!(item_id = %item.id, "placement: child vanished after reparent"),
        Err(e) => warn!(item_id = %item.id, error = %e, "placement: child re-read failed"),
    }

    if let Some(update) = extra_update(element) {
        match host.update(&item.id, &update).await {
            Ok(_) if opts.verbose_logging => info!(item_id = %item.id, ?update, "placement: extra properties applied"),
            Ok(_) => {}
            Err(e) => warn!(item_id = %item.id, error = %e, "placement: extra properties failed"),
        }
    }
    true
}

fn non_empty(value: Option<&String>) -> Option<&String> {
    value.filter(|s| !s.is_empty())
}

/// Kind-specific creation payload, or the reason the element cannot be
/// created.
fn child_draft(element: &Element, position: Point) -> Result<ItemDraft, &'static str> {
    let body = match &element.body {
        ElementBody::StickyNote { content, shape } => {
            let content = non_empty(content.as_ref()).ok_or("sticky note without content")?;
            DraftBody::StickyNote {
                content: content.clone(),
                shape: shape.clone().unwrap_or_else(|| DEFAULT_STICKY_SHAPE.to_string()),
                width: element.width,
                style: element.style.clone(),
            }
        }
        ElementBody::Text { content } => {
            let content = non_empty(content.as_ref()).ok_or("text without content")?;
            DraftBody::Text {
                content: content.clone(),
                width: Some(element.width),
                height: Some(element.height),
                style: element.style.clone(),
            }
        }
        ElementBody::Shape { content, shape } => DraftBody::Shape {
            content: content.clone().unwrap_or_default(),
            shape: shape.clone().unwrap_or_else(|| DEFAULT_SHAPE.to_string()),
            width: Some(element.width),
            height: Some(element.height),
            style: element.style.clone(),
        },
        ElementBody::Image { url, scale } => {
            let url = url
                .as_ref()
                .filter(|u| u.starts_with("http") || u.starts_with("data:image/"))
                .ok_or("image with invalid url")?;
            DraftBody::Image {
                url: url.clone(),
                width: Some(element.width),
                height: Some(element.height),
                scale: scale.filter(|s| s.is_finite()),
            }
        }
        ElementBody::Emoji { emoji } => {
            let emoji = non_empty(emoji.as_ref()).ok_or("emoji without glyph")?;
            DraftBody::Emoji {
                emoji: emoji.clone(),
                width: Some(element.width),
                height: Some(element.height),
                style: element.style.clone(),
            }
        }
    };
    Ok(ItemDraft { position, rotation: element.rotation.filter(|r| r.is_finite()), body })
}

/// Properties applied after creation. Only images take an update; the
/// other kinds cannot be updated once created.
fn extra_update(element: &Element) -> Option<ItemUpdate> {
    let ElementBody::Image { scale, .. } = &element.body else {
        return None;
    };
    let update = ItemUpdate {
        style: (!element.style.is_empty()).then(|| element.style.clone()),
        rotation: element.rotation,
        metadata: (!element.metadata.is_empty()).then(|| element.metadata.clone()),
        scale: *scale,
        width: Some(element.width),
        height: Some(element.height),
        title: None,
    };
    (!update.is_empty()).then_some(update)
}

#[cfg(test)]
#[path = "placement_test.rs"]
mod tests;
