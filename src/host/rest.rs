//! REST board host.
//!
//! Thin HTTP wrapper over a v2-style board API (`/boards/{id}/items`,
//! `/boards/{id}/sticky_notes`, ...). Request bodies are built and responses
//! parsed by pure functions so the wire mapping is testable without a
//! network.
//!
//! Child positions come back relative to the parent's top-left corner; they
//! are converted to absolute centre coordinates before leaving this module.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};

use super::{BoardHost, BoardItem, DraftBody, FRAME_KIND, HostError, ItemDraft, ItemQuery, ItemUpdate};
use crate::geometry::{self, Point, Rect};
use crate::model::{ElementKind, Props};

const PAGE_LIMIT: u32 = 50;
const RELATIVE_TO_PARENT: &str = "parent_top_left";

// =============================================================================
// CLIENT
// =============================================================================

pub struct RestBoard {
    http: reqwest::Client,
    base_url: String,
    board_id: String,
    token: String,
}

impl RestBoard {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        board_id: String,
        token: String,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, HostError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| HostError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string(), board_id, token })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/boards/{}/{path}", self.base_url, self.board_id)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<(u16, String), HostError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| HostError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| HostError::Request(e.to_string()))?;
        Ok((status, text))
    }

    async fn send_ok(&self, request: reqwest::RequestBuilder) -> Result<String, HostError> {
        let (status, text) = self.send(request).await?;
        if !(200..300).contains(&status) {
            return Err(HostError::Response { status, body: text });
        }
        Ok(text)
    }

    async fn fetch_raw(&self, id: &str) -> Result<Option<ApiItem>, HostError> {
        let (status, text) = self
            .send(self.http.get(self.url(&format!("items/{id}"))))
            .await?;
        match status {
            404 => Ok(None),
            200..=299 => parse_item(&text).map(Some),
            _ => Err(HostError::Response { status, body: text }),
        }
    }

    /// Absolute rects of parents referenced by `items`, fetched once each.
    async fn parent_rects(&self, items: &[ApiItem]) -> Result<HashMap<String, Rect>, HostError> {
        let mut rects = HashMap::new();
        for item in items {
            let Some(parent_id) = item.parent_id() else { continue };
            if rects.contains_key(parent_id) {
                continue;
            }
            if let Some(rect) = items
                .iter()
                .find(|i| i.id == parent_id)
                .and_then(ApiItem::rect)
            {
                rects.insert(parent_id.to_string(), rect);
                continue;
            }
            if let Some(rect) = self.fetch_raw(parent_id).await?.as_ref().and_then(ApiItem::rect) {
                rects.insert(parent_id.to_string(), rect);
            }
        }
        Ok(rects)
    }

    async fn resolve(&self, items: Vec<ApiItem>) -> Result<Vec<BoardItem>, HostError> {
        let rects = self.parent_rects(&items).await?;
        Ok(items
            .into_iter()
            .map(|item| {
                let parent = item.parent_id().and_then(|p| rects.get(p)).copied();
                to_board_item(item, parent.as_ref())
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl BoardHost for RestBoard {
    async fn query(&self, query: &ItemQuery) -> Result<Vec<BoardItem>, HostError> {
        let mut raw = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = page_params(query, cursor.as_deref());
            let text = self
                .send_ok(self.http.get(self.url("items")).query(&params))
                .await?;
            let page = parse_page(&text)?;
            raw.extend(page.data);
            match page.cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
        tracing::debug!(count = raw.len(), kind = ?query.kind, parent = ?query.parent_id, "board query");

        let items = self.resolve(raw).await?;
        Ok(items
            .into_iter()
            .filter(|item| query.matches(item))
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Option<BoardItem>, HostError> {
        let Some(item) = self.fetch_raw(id).await? else {
            return Ok(None);
        };
        Ok(self.resolve(vec![item]).await?.pop())
    }

    async fn create(&self, draft: &ItemDraft) -> Result<BoardItem, HostError> {
        if matches!(draft.body, DraftBody::Emoji { .. }) {
            return Err(HostError::Unsupported(ElementKind::Emoji.to_string()));
        }
        let endpoint = endpoint_for(draft.body.kind_name());
        let body = create_body(draft);
        let text = self
            .send_ok(self.http.post(self.url(endpoint)).json(&body))
            .await?;
        Ok(to_board_item(parse_item(&text)?, None))
    }

    async fn update(&self, id: &str, update: &ItemUpdate) -> Result<BoardItem, HostError> {
        let current = self
            .get(id)
            .await?
            .ok_or_else(|| HostError::NotFound(id.to_string()))?;
        let endpoint = endpoint_for(&current.kind);
        let body = update_body(update);
        let text = self
            .send_ok(
                self.http
                    .patch(self.url(&format!("{endpoint}/{id}")))
                    .json(&body),
            )
            .await?;
        let updated = parse_item(&text)?;
        Ok(self.resolve(vec![updated]).await?.pop().unwrap_or(current))
    }

    async fn add_to_frame(&self, frame_id: &str, item_id: &str) -> Result<(), HostError> {
        let frame = self
            .get(frame_id)
            .await?
            .ok_or_else(|| HostError::NotFound(frame_id.to_string()))?;
        if !frame.is_frame() {
            return Err(HostError::Rejected(format!("{frame_id} is not a frame")));
        }
        let item = self
            .get(item_id)
            .await?
            .ok_or_else(|| HostError::NotFound(item_id.to_string()))?;

        let body = reparent_body(&frame, &item)?;
        self.send_ok(
            self.http
                .patch(self.url(&format!("items/{item_id}")))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn zoom_to(&self, id: &str) -> Result<(), HostError> {
        // The REST API has no viewport; the panel client focuses itself.
        tracing::debug!(%id, "zoom_to ignored by REST host");
        Ok(())
    }

    fn supports(&self, kind: ElementKind) -> bool {
        kind != ElementKind::Emoji
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct ApiPage {
    #[serde(default)]
    data: Vec<ApiItem>,
    #[serde(default)]
    cursor: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiItem {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: ApiData,
    #[serde(default)]
    style: Props,
    #[serde(default)]
    geometry: ApiGeometry,
    #[serde(default)]
    position: Option<ApiPosition>,
    #[serde(default)]
    parent: Option<ApiParent>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiData {
    content: Option<String>,
    shape: Option<String>,
    title: Option<String>,
    #[serde(alias = "imageUrl")]
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiGeometry {
    width: Option<f64>,
    height: Option<f64>,
    rotation: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPosition {
    x: Option<f64>,
    y: Option<f64>,
    #[serde(default)]
    relative_to: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiParent {
    id: String,
}

impl ApiItem {
    fn parent_id(&self) -> Option<&str> {
        self.parent.as_ref().map(|p| p.id.as_str())
    }

    /// Own rect, valid only for items positioned on the canvas.
    fn rect(&self) -> Option<Rect> {
        let position = self.position.as_ref()?;
        if position.relative_to.as_deref() == Some(RELATIVE_TO_PARENT) {
            return None;
        }
        let rect = Rect::new(position.x?, position.y?, self.geometry.width?, self.geometry.height?);
        rect.is_finite().then_some(rect)
    }
}

// =============================================================================
// PARSING
// =============================================================================

fn parse_page(json: &str) -> Result<ApiPage, HostError> {
    serde_json::from_str(json).map_err(|e| HostError::Parse(e.to_string()))
}

fn parse_item(json: &str) -> Result<ApiItem, HostError> {
    serde_json::from_str(json).map_err(|e| HostError::Parse(e.to_string()))
}

fn to_board_item(api: ApiItem, parent: Option<&Rect>) -> BoardItem {
    let relative = api
        .position
        .as_ref()
        .is_some_and(|p| p.relative_to.as_deref() == Some(RELATIVE_TO_PARENT));
    let center = api.position.as_ref().and_then(|p| {
        let point = Point::new(p.x?, p.y?);
        match (relative, parent) {
            (true, Some(rect)) => geometry::to_absolute(rect, point),
            (true, None) => None,
            (false, _) => Some(point),
        }
    });
    let parent_id = api.parent.map(|p| p.id);

    BoardItem {
        id: api.id,
        kind: api.kind,
        x: center.map(|c| c.x),
        y: center.map(|c| c.y),
        width: api.geometry.width,
        height: api.geometry.height,
        rotation: api.geometry.rotation,
        parent_id,
        title: api.data.title,
        content: api.data.content,
        shape: api.data.shape,
        url: api.data.url,
        emoji: None,
        scale: None,
        style: api.style,
        metadata: Props::new(),
    }
}

// =============================================================================
// REQUEST BUILDERS
// =============================================================================

fn endpoint_for(kind: &str) -> &'static str {
    match kind {
        FRAME_KIND => "frames",
        "sticky_note" => "sticky_notes",
        "text" => "texts",
        "shape" => "shapes",
        "image" => "images",
        _ => "items",
    }
}

fn page_params(query: &ItemQuery, cursor: Option<&str>) -> Vec<(&'static str, String)> {
    let mut params = vec![("limit", PAGE_LIMIT.to_string())];
    if let Some(kind) = &query.kind {
        params.push(("type", kind.clone()));
    }
    if let Some(parent) = &query.parent_id {
        params.push(("parent_item_id", parent.clone()));
    }
    if let Some(cursor) = cursor {
        params.push(("cursor", cursor.to_string()));
    }
    params
}

fn insert_some(map: &mut serde_json::Map<String, Value>, key: &str, value: Option<f64>) {
    if let Some(v) = value {
        map.insert(key.to_string(), json!(v));
    }
}

fn create_body(draft: &ItemDraft) -> Value {
    let mut geometry = serde_json::Map::new();
    insert_some(&mut geometry, "rotation", draft.rotation);

    let (data, style) = match &draft.body {
        DraftBody::Frame { title, width, height, fill_color } => {
            insert_some(&mut geometry, "width", *width);
            insert_some(&mut geometry, "height", *height);
            let mut style = Props::new();
            style.insert("fillColor".into(), json!(fill_color));
            (json!({ "title": title, "format": "custom", "type": "freeform" }), style)
        }
        DraftBody::StickyNote { content, shape, width, style } => {
            insert_some(&mut geometry, "width", Some(*width));
            (json!({ "content": content, "shape": shape }), style.clone())
        }
        // Text height follows its content on the board.
        DraftBody::Text { content, width, style, .. } => {
            insert_some(&mut geometry, "width", *width);
            (json!({ "content": content }), style.clone())
        }
        DraftBody::Shape { content, shape, width, height, style } => {
            insert_some(&mut geometry, "width", *width);
            insert_some(&mut geometry, "height", *height);
            (json!({ "content": content, "shape": shape }), style.clone())
        }
        DraftBody::Image { url, width, height, .. } => {
            // Images take one dimension; the other follows the aspect ratio.
            match (width, height) {
                (Some(w), _) => insert_some(&mut geometry, "width", Some(*w)),
                (None, h) => insert_some(&mut geometry, "height", *h),
            }
            (json!({ "url": url }), Props::new())
        }
        DraftBody::Emoji { emoji, width, height, style } => {
            insert_some(&mut geometry, "width", *width);
            insert_some(&mut geometry, "height", *height);
            (json!({ "emoji": emoji }), style.clone())
        }
    };

    let mut body = serde_json::Map::new();
    body.insert("data".into(), data);
    body.insert("position".into(), json!({ "x": draft.position.x, "y": draft.position.y }));
    if !geometry.is_empty() {
        body.insert("geometry".into(), Value::Object(geometry));
    }
    if !style.is_empty() {
        body.insert("style".into(), Value::Object(style));
    }
    Value::Object(body)
}

fn update_body(update: &ItemUpdate) -> Value {
    let mut geometry = serde_json::Map::new();
    insert_some(&mut geometry, "rotation", update.rotation);
    match (update.width, update.height) {
        (Some(w), _) => insert_some(&mut geometry, "width", Some(w)),
        (None, h) => insert_some(&mut geometry, "height", h),
    }

    let mut body = serde_json::Map::new();
    if !geometry.is_empty() {
        body.insert("geometry".into(), Value::Object(geometry));
    }
    if let Some(title) = &update.title {
        body.insert("data".into(), json!({ "title": title }));
    }
    if update.style.as_ref().is_some_and(|s| !s.is_empty())
        || update.metadata.is_some()
        || update.scale.is_some()
    {
        tracing::debug!("style, metadata and scale are not writable over REST; skipped");
    }
    Value::Object(body)
}

fn reparent_body(frame: &BoardItem, item: &BoardItem) -> Result<Value, HostError> {
    let frame_rect = frame
        .rect()
        .ok_or_else(|| HostError::Rejected(format!("frame {} has no geometry", frame.id)))?;
    let center = item
        .center()
        .ok_or_else(|| HostError::Rejected(format!("item {} has no position", item.id)))?;
    let relative = geometry::to_relative(&frame_rect, center)
        .ok_or_else(|| HostError::Rejected(format!("item {} position not finite", item.id)))?;
    Ok(json!({
        "parent": { "id": frame.id },
        "position": { "x": relative.x, "y": relative.y },
    }))
}

#[cfg(test)]
#[path = "rest_test.rs"]
mod tests;
