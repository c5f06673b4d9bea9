//! Template domain model.
//!
//! DESIGN
//! ======
//! A `Template` is one frame of the manifest: a `(phase, sequence_index)`
//! keyed group of child `Element`s whose positions are stored relative to the
//! frame's top-left corner. Absolute positions are always derived, never
//! stored. `ElementBody` is a closed variant over the five element kinds the
//! board can recreate; each variant carries only the fields that kind uses.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{self, Point, Rect};

/// Free-form key/value bag (style, metadata).
pub type Props = serde_json::Map<String, serde_json::Value>;

// =============================================================================
// KEY
// =============================================================================

/// Unique catalog key of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TemplateKey {
    pub phase: u32,
    pub sequence_index: u32,
}

impl TemplateKey {
    #[must_use]
    pub fn new(phase: u32, sequence_index: u32) -> Self {
        Self { phase, sequence_index }
    }

    /// Parse `"<phase>.<index>"`, the form used on the CLI and in thumbnails.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let (phase, index) = raw.trim().split_once('.')?;
        Some(Self::new(phase.parse().ok()?, index.parse().ok()?))
    }
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.phase, self.sequence_index)
    }
}

// =============================================================================
// ELEMENT KIND
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    StickyNote,
    Text,
    Shape,
    Image,
    Emoji,
}

impl ElementKind {
    pub const ALL: [Self; 5] = [Self::StickyNote, Self::Text, Self::Shape, Self::Image, Self::Emoji];

    /// Wire name used by the manifest and the board API.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StickyNote => "sticky_note",
            Self::Text => "text",
            Self::Shape => "shape",
            Self::Image => "image",
            Self::Emoji => "emoji",
        }
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == raw)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ELEMENT
// =============================================================================

/// Kind-specific payload of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementBody {
    StickyNote { content: Option<String>, shape: Option<String> },
    Text { content: Option<String> },
    Shape { content: Option<String>, shape: Option<String> },
    Image { url: Option<String>, scale: Option<f64> },
    Emoji { emoji: Option<String> },
}

impl ElementBody {
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::StickyNote { .. } => ElementKind::StickyNote,
            Self::Text { .. } => ElementKind::Text,
            Self::Shape { .. } => ElementKind::Shape,
            Self::Image { .. } => ElementKind::Image,
            Self::Emoji { .. } => ElementKind::Emoji,
        }
    }

    /// Text payload, for the kinds that carry one.
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::StickyNote { content, .. } | Self::Text { content } | Self::Shape { content, .. } => {
                content.as_deref()
            }
            Self::Image { .. } | Self::Emoji { .. } => None,
        }
    }
}

/// A child of a template.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub body: ElementBody,
    pub x_rel: f64,
    pub y_rel: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: Option<f64>,
    pub style: Props,
    pub metadata: Props,
    pub title: Option<String>,
    pub z_order: i64,
}

impl Element {
    #[must_use]
    pub fn new(body: ElementBody, x_rel: f64, y_rel: f64, width: f64, height: f64) -> Self {
        Self {
            body,
            x_rel,
            y_rel,
            width,
            height,
            rotation: None,
            style: Props::new(),
            metadata: Props::new(),
            title: None,
            z_order: 0,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ElementKind {
        self.body.kind()
    }

    #[must_use]
    pub fn relative_position(&self) -> Point {
        Point::new(self.x_rel, self.y_rel)
    }

    /// Problems that make this element unusable for placement.
    #[must_use]
    pub fn geometry_problems(&self) -> Vec<&'static str> {
        let mut problems = Vec::new();
        if !self.x_rel.is_finite() {
            problems.push("xRel invalid");
        }
        if !self.y_rel.is_finite() {
            problems.push("yRel invalid");
        }
        if !self.width.is_finite() {
            problems.push("width invalid");
        }
        if !self.height.is_finite() {
            problems.push("height invalid");
        }
        problems
    }

    /// Absolute centre on the board given the owning frame's rect.
    #[must_use]
    pub fn absolute_position(&self, frame: &Rect) -> Option<Point> {
        geometry::to_absolute(frame, self.relative_position())
    }
}

/// Why a manifest item did not become an [`Element`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    MissingKind,
    UnknownKind,
    NonFiniteGeometry,
}

/// A manifest item dropped at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedElement {
    pub kind: Option<String>,
    pub reason: RejectReason,
}

// =============================================================================
// TEMPLATE
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub key: TemplateKey,
    pub title: String,
    pub x: f64,
    pub y: f64,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub style: Props,
    pub thumbnail: String,
    pub children: Vec<Element>,
    pub rejected: Vec<RejectedElement>,
}

impl Template {
    /// The frame rect, `None` when the manifest gave no usable size.
    #[must_use]
    pub fn frame_rect(&self) -> Option<Rect> {
        let rect = Rect::new(self.x, self.y, self.width?, self.height?);
        rect.is_finite().then_some(rect)
    }

    /// Copy of this template moved by `(dx, dy)`. Children keep their
    /// relative offsets, so they follow the frame.
    #[must_use]
    pub fn staged_at_offset(&self, dx: f64, dy: f64) -> Self {
        Self { x: self.x + dx, y: self.y + dy, ..self.clone() }
    }

    /// `fillColor` from the frame style, if it is a string.
    #[must_use]
    pub fn fill_color(&self) -> Option<&str> {
        self.style.get("fillColor").and_then(serde_json::Value::as_str)
    }

    /// Thumbnail reference for the panel grid.
    #[must_use]
    pub fn thumbnail_url(&self) -> String {
        if self.thumbnail.trim().is_empty() {
            format!("/thumbnails/{}.jpg", self.key)
        } else {
            self.thumbnail.clone()
        }
    }
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
