//! Manifest → templates.
//!
//! ERROR HANDLING
//! ==============
//! Nothing here fails the whole load except a manifest that is not a JSON
//! array. Malformed frame entries are skipped and malformed items are
//! recorded on their template as rejected, each with a logged warning.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::title::parse_title;
use super::{ManifestError, ManifestFrame, ManifestItem};
use crate::model::{Element, ElementBody, ElementKind, RejectReason, RejectedElement, Template};

/// Outcome of loading a manifest.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Templates sorted by key.
    pub templates: Vec<Template>,
    pub skipped_frames: usize,
    pub rejected_items: usize,
    pub duplicate_keys: usize,
}

impl LoadReport {
    #[must_use]
    pub fn summary(&self) -> LoadSummary {
        LoadSummary {
            loaded: self.templates.len(),
            skipped_frames: self.skipped_frames,
            rejected_items: self.rejected_items,
            duplicate_keys: self.duplicate_keys,
        }
    }
}

/// Counts only, for logs and API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub loaded: usize,
    pub skipped_frames: usize,
    pub rejected_items: usize,
    pub duplicate_keys: usize,
}

/// Parse manifest text.
///
/// # Errors
///
/// Returns an error when the text is not JSON or not a JSON array.
pub fn parse_manifest(text: &str) -> Result<LoadReport, ManifestError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let serde_json::Value::Array(entries) = value else {
        return Err(ManifestError::NotAnArray);
    };
    Ok(load_templates(entries))
}

/// Build templates from raw manifest entries.
#[must_use]
pub fn load_templates(entries: Vec<serde_json::Value>) -> LoadReport {
    let mut report = LoadReport::default();
    let mut seen = HashSet::new();

    for (position, entry) in entries.into_iter().enumerate() {
        let frame = match serde_json::from_value::<ManifestFrame>(entry) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(position, error = %e, "manifest: invalid frame entry skipped");
                report.skipped_frames += 1;
                continue;
            }
        };

        let template = build_template(frame, position);
        report.rejected_items += template.rejected.len();

        if !seen.insert(template.key) {
            warn!(key = %template.key, title = %template.title, "manifest: duplicate template key skipped");
            report.duplicate_keys += 1;
            continue;
        }

        debug!(
            key = %template.key,
            title = %template.title,
            children = template.children.len(),
            "manifest: template loaded"
        );
        report.templates.push(template);
    }

    report.templates.sort_by_key(|t| t.key);
    info!(
        loaded = report.templates.len(),
        skipped_frames = report.skipped_frames,
        rejected_items = report.rejected_items,
        "manifest: load finished"
    );
    report
}

fn build_template(frame: ManifestFrame, position: usize) -> Template {
    let raw_title = frame.title.unwrap_or_default();
    let parsed = parse_title(&raw_title, position);
    if !parsed.matched {
        warn!(title = %raw_title, key = %parsed.key, "manifest: unexpected title format, using positional key");
    }

    let mut children = Vec::new();
    let mut rejected = Vec::new();
    for item in frame.items {
        match build_element(item) {
            Ok(element) => children.push(element),
            Err(rejection) => {
                warn!(kind = ?rejection.kind, reason = ?rejection.reason, "manifest: item rejected");
                rejected.push(rejection);
            }
        }
    }

    Template {
        key: parsed.key,
        title: parsed.display(),
        x: frame.x.unwrap_or(0.0),
        y: frame.y.unwrap_or(0.0),
        width: frame.width,
        height: frame.height,
        style: frame.style.unwrap_or_default(),
        thumbnail: frame.thumbnail.unwrap_or_default(),
        children,
        rejected,
    }
}

fn build_element(item: ManifestItem) -> Result<Element, RejectedElement> {
    let Some(kind_name) = item.kind.filter(|k| !k.is_empty()) else {
        return Err(RejectedElement { kind: None, reason: RejectReason::MissingKind });
    };

    let geometry = [item.x_rel, item.y_rel, item.width, item.height];
    let [Some(x_rel), Some(y_rel), Some(width), Some(height)] = geometry else {
        return Err(RejectedElement { kind: Some(kind_name), reason: RejectReason::NonFiniteGeometry });
    };
    if !geometry.iter().flatten().all(|v| v.is_finite()) {
        return Err(RejectedElement { kind: Some(kind_name), reason: RejectReason::NonFiniteGeometry });
    }

    let Some(kind) = ElementKind::from_str(&kind_name) else {
        return Err(RejectedElement { kind: Some(kind_name), reason: RejectReason::UnknownKind });
    };

    let body = match kind {
        ElementKind::StickyNote => ElementBody::StickyNote { content: item.content, shape: item.shape },
        ElementKind::Text => ElementBody::Text { content: item.content },
        ElementKind::Shape => ElementBody::Shape { content: item.content, shape: item.shape },
        ElementKind::Image => ElementBody::Image { url: item.url, scale: item.scale },
        ElementKind::Emoji => ElementBody::Emoji { emoji: item.emoji },
    };

    Ok(Element {
        body,
        x_rel,
        y_rel,
        width,
        height,
        rotation: item.rotation,
        style: item.style.unwrap_or_default(),
        metadata: item.metadata.unwrap_or_default(),
        title: item.title,
        z_order: item.ordre.unwrap_or(0),
    })
}
