//! In-memory board.
//!
//! Backs the CLI's local board files and every service test. Items live in
//! insertion order behind a `tokio::sync::RwLock`; call counters let tests
//! assert exactly which host operations a service issued.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BoardHost, BoardItem, DraftBody, FRAME_KIND, HostError, ItemDraft, ItemQuery, ItemUpdate};
use crate::model::{ElementKind, Props};

/// Counts of mutating host calls.
#[derive(Debug, Default)]
pub struct CallStats {
    pub creates: AtomicUsize,
    pub updates: AtomicUsize,
    pub reparents: AtomicUsize,
}

#[derive(Default)]
pub struct MemoryBoard {
    items: RwLock<Vec<BoardItem>>,
    focused: RwLock<Option<String>>,
    stats: CallStats,
    /// Kinds whose creation fails, to exercise per-item error paths.
    failing: HashSet<ElementKind>,
    unsupported: HashSet<ElementKind>,
}

impl MemoryBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_items(items: Vec<BoardItem>) -> Self {
        Self { items: RwLock::new(items), ..Self::default() }
    }

    /// Make every creation of `kind` fail.
    #[must_use]
    pub fn failing_on(mut self, kind: ElementKind) -> Self {
        self.failing.insert(kind);
        self
    }

    /// Report `kind` as not creatable.
    #[must_use]
    pub fn without_support_for(mut self, kind: ElementKind) -> Self {
        self.unsupported.insert(kind);
        self
    }

    /// Load a board snapshot written by [`MemoryBoard::save`]. A missing
    /// file is an empty board.
    ///
    /// # Errors
    ///
    /// Returns a snapshot error if the file exists but cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self, HostError> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(HostError::Snapshot(format!("{}: {e}", path.display()))),
        };
        let items: Vec<BoardItem> =
            serde_json::from_str(&text).map_err(|e| HostError::Snapshot(format!("{}: {e}", path.display())))?;
        Ok(Self::with_items(items))
    }

    /// Write all items as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns a snapshot error if serialization or the write fails.
    pub async fn save(&self, path: &Path) -> Result<(), HostError> {
        let json = {
            let items = self.items.read().await;
            serde_json::to_string_pretty(&*items).map_err(|e| HostError::Snapshot(e.to_string()))?
        };
        tokio::fs::write(path, json)
            .await
            .map_err(|e| HostError::Snapshot(format!("{}: {e}", path.display())))
    }

    pub async fn items(&self) -> Vec<BoardItem> {
        self.items.read().await.clone()
    }

    pub async fn focused(&self) -> Option<String> {
        self.focused.read().await.clone()
    }

    #[must_use]
    pub fn stats(&self) -> &CallStats {
        &self.stats
    }

    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.stats.creates.load(Ordering::SeqCst)
    }
}

fn materialize(id: String, draft: &ItemDraft) -> BoardItem {
    let mut item = BoardItem {
        id,
        kind: draft.body.kind_name().to_string(),
        x: Some(draft.position.x),
        y: Some(draft.position.y),
        rotation: draft.rotation,
        ..BoardItem::default()
    };

    match &draft.body {
        DraftBody::Frame { title, width, height, fill_color } => {
            item.title = Some(title.clone());
            item.width = *width;
            item.height = *height;
            item.style
                .insert("fillColor".into(), serde_json::Value::String(fill_color.clone()));
        }
        DraftBody::StickyNote { content, shape, width, style } => {
            item.content = Some(content.clone());
            item.shape = Some(shape.clone());
            item.style = style.clone();
            // Sticky notes are square on the board.
            item.width = Some(*width);
            item.height = Some(*width);
        }
        DraftBody::Text { content, width, height, style } => {
            item.content = Some(content.clone());
            item.width = *width;
            item.height = *height;
            item.style = style.clone();
        }
        DraftBody::Shape { content, shape, width, height, style } => {
            item.content = Some(content.clone());
            item.shape = Some(shape.clone());
            item.width = *width;
            item.height = *height;
            item.style = style.clone();
        }
        DraftBody::Image { url, width, height, scale } => {
            item.url = Some(url.clone());
            item.width = *width;
            item.height = *height;
            item.scale = *scale;
        }
        DraftBody::Emoji { emoji, width, height, style } => {
            item.emoji = Some(emoji.clone());
            item.width = *width;
            item.height = *height;
            item.style = style.clone();
        }
    }
    item
}

fn merge_props(target: &mut Props, source: &Props) {
    for (k, v) in source {
        target.insert(k.clone(), v.clone());
    }
}

#[async_trait::async_trait]
impl BoardHost for MemoryBoard {
    async fn query(&self, query: &ItemQuery) -> Result<Vec<BoardItem>, HostError> {
        let items = self.items.read().await;
        Ok(items
            .iter()
            .filter(|item| query.matches(item))
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Option<BoardItem>, HostError> {
        let items = self.items.read().await;
        Ok(items.iter().find(|item| item.id == id).cloned())
    }

    async fn create(&self, draft: &ItemDraft) -> Result<BoardItem, HostError> {
        self.stats.creates.fetch_add(1, Ordering::SeqCst);

        if let Some(kind) = ElementKind::from_str(draft.body.kind_name()) {
            if self.unsupported.contains(&kind) {
                return Err(HostError::Unsupported(kind.to_string()));
            }
            if self.failing.contains(&kind) {
                return Err(HostError::Rejected(format!("create {kind} refused")));
            }
        }

        let item = materialize(Uuid::new_v4().to_string(), draft);
        self.items.write().await.push(item.clone());
        Ok(item)
    }

    async fn update(&self, id: &str, update: &ItemUpdate) -> Result<BoardItem, HostError> {
        self.stats.updates.fetch_add(1, Ordering::SeqCst);

        let mut items = self.items.write().await;
        let item = items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| HostError::NotFound(id.to_string()))?;

        if let Some(style) = &update.style {
            merge_props(&mut item.style, style);
        }
        if let Some(metadata) = &update.metadata {
            merge_props(&mut item.metadata, metadata);
        }
        item.rotation = update.rotation.or(item.rotation);
        item.scale = update.scale.or(item.scale);
        item.width = update.width.or(item.width);
        item.height = update.height.or(item.height);
        if update.title.is_some() {
            item.title.clone_from(&update.title);
        }
        Ok(item.clone())
    }

    async fn add_to_frame(&self, frame_id: &str, item_id: &str) -> Result<(), HostError> {
        self.stats.reparents.fetch_add(1, Ordering::SeqCst);

        let mut items = self.items.write().await;
        let frame = items
            .iter()
            .find(|item| item.id == frame_id)
            .ok_or_else(|| HostError::NotFound(frame_id.to_string()))?;
        if frame.kind != FRAME_KIND {
            return Err(HostError::Rejected(format!("{frame_id} is not a frame")));
        }

        let item = items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or_else(|| HostError::NotFound(item_id.to_string()))?;
        item.parent_id = Some(frame_id.to_string());
        Ok(())
    }

    async fn zoom_to(&self, id: &str) -> Result<(), HostError> {
        if self.get(id).await?.is_none() {
            return Err(HostError::NotFound(id.to_string()));
        }
        *self.focused.write().await = Some(id.to_string());
        Ok(())
    }

    fn supports(&self, kind: ElementKind) -> bool {
        !self.unsupported.contains(&kind)
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
