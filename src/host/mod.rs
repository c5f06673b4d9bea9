//! Host adapter: the whiteboard the templates are placed on.
//!
//! DESIGN
//! ======
//! `BoardHost` is the narrow surface the placement and export services need
//! from a board: query, read, create, update, reparent, focus. Every item a
//! host returns carries absolute, centre-anchored coordinates; adapters whose
//! backend reports parent-relative positions convert before returning.
//!
//! Two implementations ship: [`memory::MemoryBoard`] (tests, local JSON
//! boards) and [`rest::RestBoard`] (a v2-style REST board API).

pub mod memory;
pub mod rest;

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};
use crate::model::{ElementKind, Props};

/// Wire kind of a frame container.
pub const FRAME_KIND: &str = "frame";

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("item not found: {0}")]
    NotFound(String),
    #[error("item kind not supported by this board: {0}")]
    Unsupported(String),
    #[error("board rejected the request: {0}")]
    Rejected(String),
    #[error("board request failed: {0}")]
    Request(String),
    #[error("board response error: status {status}")]
    Response { status: u16, body: String },
    #[error("board response parse failed: {0}")]
    Parse(String),
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
    #[error("board snapshot error: {0}")]
    Snapshot(String),
}

impl crate::error::ErrorCode for HostError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_ITEM_NOT_FOUND",
            Self::Unsupported(_) => "E_ITEM_UNSUPPORTED",
            Self::Rejected(_) => "E_HOST_REJECTED",
            Self::Request(_) => "E_HOST_REQUEST",
            Self::Response { .. } => "E_HOST_RESPONSE",
            Self::Parse(_) => "E_HOST_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
            Self::Snapshot(_) => "E_BOARD_SNAPSHOT",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Response { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// BOARD ITEM
// =============================================================================

/// An item as read back from the board.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Props::is_empty")]
    pub style: Props,
    #[serde(default, skip_serializing_if = "Props::is_empty")]
    pub metadata: Props,
}

impl BoardItem {
    #[must_use]
    pub fn is_frame(&self) -> bool {
        self.kind == FRAME_KIND
    }

    /// Centre point, `None` when the board reported no usable position.
    #[must_use]
    pub fn center(&self) -> Option<Point> {
        let point = Point::new(self.x?, self.y?);
        point.is_finite().then_some(point)
    }

    /// Full geometry, `None` unless position and size are all finite.
    #[must_use]
    pub fn rect(&self) -> Option<Rect> {
        let rect = Rect::new(self.x?, self.y?, self.width?, self.height?);
        rect.is_finite().then_some(rect)
    }
}

// =============================================================================
// DRAFTS & UPDATES
// =============================================================================

/// Kind-specific creation payload. Sticky notes are square and sized by
/// width only; text boxes wrap at `width` and grow to `height`.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftBody {
    Frame { title: String, width: Option<f64>, height: Option<f64>, fill_color: String },
    StickyNote { content: String, shape: String, width: f64, style: Props },
    Text { content: String, width: Option<f64>, height: Option<f64>, style: Props },
    Shape { content: String, shape: String, width: Option<f64>, height: Option<f64>, style: Props },
    Image { url: String, width: Option<f64>, height: Option<f64>, scale: Option<f64> },
    Emoji { emoji: String, width: Option<f64>, height: Option<f64>, style: Props },
}

impl DraftBody {
    /// Wire kind of the item this draft creates.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Frame { .. } => FRAME_KIND,
            Self::StickyNote { .. } => ElementKind::StickyNote.as_str(),
            Self::Text { .. } => ElementKind::Text.as_str(),
            Self::Shape { .. } => ElementKind::Shape.as_str(),
            Self::Image { .. } => ElementKind::Image.as_str(),
            Self::Emoji { .. } => ElementKind::Emoji.as_str(),
        }
    }
}

/// Request to create one board item at an absolute centre position.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDraft {
    pub position: Point,
    pub rotation: Option<f64>,
    pub body: DraftBody,
}

/// Mutable properties applied after creation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemUpdate {
    pub style: Option<Props>,
    pub rotation: Option<f64>,
    pub metadata: Option<Props>,
    pub scale: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub title: Option<String>,
}

impl ItemUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Filter for [`BoardHost::query`]. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemQuery {
    pub kind: Option<String>,
    pub parent_id: Option<String>,
}

impl ItemQuery {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn of_kind(kind: &str) -> Self {
        Self { kind: Some(kind.to_string()), parent_id: None }
    }

    #[must_use]
    pub fn children_of(parent_id: &str) -> Self {
        Self { kind: None, parent_id: Some(parent_id.to_string()) }
    }

    #[must_use]
    pub fn matches(&self, item: &BoardItem) -> bool {
        self.kind.as_ref().is_none_or(|k| *k == item.kind)
            && self
                .parent_id
                .as_ref()
                .is_none_or(|p| item.parent_id.as_ref() == Some(p))
    }
}

// =============================================================================
// HOST TRAIT
// =============================================================================

/// Board operations used by placement and export. Enables mocking in tests.
#[async_trait::async_trait]
pub trait BoardHost: Send + Sync {
    /// Items matching the query, in board order.
    ///
    /// # Errors
    ///
    /// Returns a [`HostError`] if the board cannot be read.
    async fn query(&self, query: &ItemQuery) -> Result<Vec<BoardItem>, HostError>;

    /// One item by id, `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`HostError`] if the board cannot be read.
    async fn get(&self, id: &str) -> Result<Option<BoardItem>, HostError>;

    /// Create an item.
    ///
    /// # Errors
    ///
    /// Returns a [`HostError`] if the board refuses or fails the creation.
    async fn create(&self, draft: &ItemDraft) -> Result<BoardItem, HostError>;

    /// Apply mutable properties to an existing item.
    ///
    /// # Errors
    ///
    /// Returns a [`HostError`] if the item is missing or the update fails.
    async fn update(&self, id: &str, update: &ItemUpdate) -> Result<BoardItem, HostError>;

    /// Move an item into a frame.
    ///
    /// # Errors
    ///
    /// Returns a [`HostError`] if either item is missing or the board refuses.
    async fn add_to_frame(&self, frame_id: &str, item_id: &str) -> Result<(), HostError>;

    /// Focus the viewport on an item.
    ///
    /// # Errors
    ///
    /// Returns a [`HostError`] if the item is missing.
    async fn zoom_to(&self, id: &str) -> Result<(), HostError>;

    /// Whether this board can create elements of `kind`.
    fn supports(&self, kind: ElementKind) -> bool {
        let _ = kind;
        true
    }
}
