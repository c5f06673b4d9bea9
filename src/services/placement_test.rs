use super::*;
use crate::catalog::{Catalog, CatalogError};
use crate::host::memory::MemoryBoard;
use crate::host::{FRAME_KIND, ItemQuery};
use crate::manifest::parse_manifest;
use crate::model::{ElementKind, Props};
use std::sync::atomic::Ordering;

const EPS: f64 = 1e-9;

fn instant() -> PlacementOptions {
    PlacementOptions {
        verbose_logging: true,
        frame_settle: Duration::ZERO,
        children_settle: Duration::ZERO,
        reparent_settle: Duration::ZERO,
        ..PlacementOptions::default()
    }
}

fn text(content: &str, x_rel: f64, y_rel: f64, w: f64, h: f64) -> Element {
    Element::new(ElementBody::Text { content: Some(content.into()) }, x_rel, y_rel, w, h)
}

fn template(children: Vec<Element>) -> Template {
    Template {
        key: TemplateKey::new(1, 1),
        title: "1.1 - Test".into(),
        x: 1000.0,
        y: 500.0,
        width: Some(400.0),
        height: Some(200.0),
        style: Props::new(),
        thumbnail: String::new(),
        children,
        rejected: Vec::new(),
    }
}

fn close(a: Option<f64>, b: f64) -> bool {
    a.is_some_and(|a| (a - b).abs() < EPS)
}

// =============================================================================
// ABORTING CASES
// =============================================================================

#[tokio::test]
async fn nan_child_aborts_with_zero_creations() {
    let board = MemoryBoard::new();
    let catalog = Catalog::new(vec![template(vec![text("a", f64::NAN, 10.0, 10.0, 10.0)])]);

    let err = place_template(&board, &catalog, &catalog.templates()[0], &instant())
        .await
        .unwrap_err();

    match err {
        PlacementError::Validation { problems, .. } => assert_eq!(problems, vec!["child 0 (text): xRel invalid"]),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(board.create_calls(), 0);
}

#[tokio::test]
async fn one_invalid_child_aborts_even_with_valid_siblings() {
    let board = MemoryBoard::new();
    let catalog = Catalog::new(vec![template(vec![
        text("a", 10.0, 10.0, 10.0, 10.0),
        text("b", 10.0, 10.0, f64::INFINITY, 10.0),
    ])]);
    let err = place_template(&board, &catalog, &catalog.templates()[0], &instant())
        .await
        .unwrap_err();
    assert!(matches!(err, PlacementError::Validation { .. }));
    assert_eq!(board.create_calls(), 0);
}

#[tokio::test]
async fn frame_without_size_fails_validation() {
    let board = MemoryBoard::new();
    let mut t = template(vec![text("a", 10.0, 10.0, 10.0, 10.0)]);
    t.width = None;
    let catalog = Catalog::new(vec![t]);
    let err = place_template(&board, &catalog, &catalog.templates()[0], &instant())
        .await
        .unwrap_err();
    assert!(matches!(err, PlacementError::Validation { ref problems, .. } if problems == &["frame width invalid"]));
    assert_eq!(board.create_calls(), 0);
}

#[tokio::test]
async fn unknown_key_aborts() {
    let board = MemoryBoard::new();
    let catalog = Catalog::new(vec![template(vec![text("a", 0.0, 0.0, 1.0, 1.0)])]);
    let err = place_by_key(&board, &catalog, TemplateKey::new(4, 4), Point::new(0.0, 0.0), &instant())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PlacementError::Catalog(CatalogError::TemplateNotFound(k)) if k == TemplateKey::new(4, 4)
    ));
    assert_eq!(board.create_calls(), 0);
}

#[tokio::test]
async fn no_supported_children_aborts_before_frame() {
    let board = MemoryBoard::new().without_support_for(ElementKind::Emoji);
    let emoji = Element::new(ElementBody::Emoji { emoji: Some("🎯".into()) }, 5.0, 5.0, 10.0, 10.0);
    let catalog = Catalog::new(vec![template(vec![emoji])]);
    let err = place_template(&board, &catalog, &catalog.templates()[0], &instant())
        .await
        .unwrap_err();
    assert!(matches!(err, PlacementError::EmptyBounds(_)));
    assert_eq!(board.create_calls(), 0);
}

// =============================================================================
// BEST-EFFORT CHILDREN
// =============================================================================

#[tokio::test]
async fn unsupported_video_child_counts_as_one_failure() {
    let manifest = serde_json::json!([{
        "title": "1.1 - Mixed",
        "x": 0, "y": 0, "width": 400, "height": 300,
        "items": [
            { "type": "sticky_note", "xRel": 50, "yRel": 50, "width": 100, "height": 100, "content": "hola" },
            { "type": "video", "xRel": 150, "yRel": 50, "width": 100, "height": 100 },
        ],
    }]);
    let catalog = Catalog::new(parse_manifest(&manifest.to_string()).unwrap().templates);
    let board = MemoryBoard::new();

    let report = place_template(&board, &catalog, &catalog.templates()[0], &instant())
        .await
        .unwrap();

    assert_eq!(report.created, 1);
    assert_eq!(report.failed, 1);
    // frame + sticky note
    assert_eq!(board.create_calls(), 2);
    let stickies = board
        .query(&ItemQuery::of_kind("sticky_note"))
        .await
        .unwrap();
    assert_eq!(stickies.len(), 1);
}

#[tokio::test]
async fn child_failures_do_not_abort_siblings() {
    let board = MemoryBoard::new().failing_on(ElementKind::Text);
    let shape = Element::new(ElementBody::Shape { content: None, shape: None }, 20.0, 20.0, 10.0, 10.0);
    let catalog = Catalog::new(vec![template(vec![text("a", 10.0, 10.0, 10.0, 10.0), shape])]);

    let report = place_template(&board, &catalog, &catalog.templates()[0], &instant())
        .await
        .unwrap();

    assert_eq!(report.created, 1);
    assert_eq!(report.failed, 1);
    let shapes = board.query(&ItemQuery::of_kind("shape")).await.unwrap();
    assert_eq!(shapes[0].shape.as_deref(), Some(DEFAULT_SHAPE));
}

#[tokio::test]
async fn creation_preconditions_are_per_item() {
    let board = MemoryBoard::new();
    let catalog = Catalog::new(vec![template(vec![
        text("", 10.0, 10.0, 10.0, 10.0),
        Element::new(ElementBody::StickyNote { content: None, shape: None }, 10.0, 10.0, 10.0, 10.0),
        Element::new(ElementBody::Image { url: Some("ftp://x/y.png".into()), scale: None }, 10.0, 10.0, 10.0, 10.0),
        Element::new(ElementBody::Emoji { emoji: None }, 10.0, 10.0, 10.0, 10.0),
        text("ok", 30.0, 30.0, 10.0, 10.0),
    ])]);

    let report = place_template(&board, &catalog, &catalog.templates()[0], &instant())
        .await
        .unwrap();

    assert_eq!(report.created, 1);
    assert_eq!(report.failed, 4);
    // only the frame and the valid text reach the host
    assert_eq!(board.create_calls(), 2);
}

// =============================================================================
// LAYOUT
// =============================================================================

#[tokio::test]
async fn frame_sized_from_manifest_at_staged_position() {
    let board = MemoryBoard::new();
    let mut t = template(vec![text("a", 50.0, 25.0, 40.0, 10.0)]);
    t.style.insert("fillColor".into(), serde_json::json!("#fef445"));
    let catalog = Catalog::new(vec![t]);

    let report = place_by_key(&board, &catalog, TemplateKey::new(1, 1), Point::new(10_000.0, 0.0), &instant())
        .await
        .unwrap();

    let frame = board.get(&report.frame_id).await.unwrap().unwrap();
    assert_eq!(frame.kind, FRAME_KIND);
    assert!(close(frame.x, 11_000.0));
    assert!(close(frame.y, 500.0));
    assert!(close(frame.width, 400.0));
    assert!(close(frame.height, 200.0));
    assert_eq!(frame.title.as_deref(), Some("1.1 - Test"));
    assert_eq!(frame.style.get("fillColor").and_then(|v| v.as_str()), Some("#fef445"));
    assert_eq!(board.focused().await.as_deref(), Some(report.frame_id.as_str()));
}

#[tokio::test]
async fn children_rebased_to_frame_corner_with_margin() {
    let board = MemoryBoard::new();
    let circle = ElementBody::Shape { content: None, shape: Some("circle".into()) };
    let shape = Element::new(circle, 100.0, 100.0, 20.0, 20.0);
    let catalog = Catalog::new(vec![template(vec![text("a", 50.0, 25.0, 40.0, 10.0), shape])]);

    let report = place_by_key(&board, &catalog, TemplateKey::new(1, 1), Point::new(10_000.0, 0.0), &instant())
        .await
        .unwrap();
    assert_eq!(report.created, 2);
    assert_eq!(report.failed, 0);

    let children = board
        .query(&ItemQuery::children_of(&report.frame_id))
        .await
        .unwrap();
    assert_eq!(children.len(), 2);

    let text_item = children.iter().find(|i| i.kind == "text").unwrap();
    assert!(close(text_item.x, 10_824.0));
    assert!(close(text_item.y, 409.0));

    let shape_item = children.iter().find(|i| i.kind == "shape").unwrap();
    assert!(close(shape_item.x, 10_874.0));
    assert!(close(shape_item.y, 484.0));
}

#[tokio::test]
async fn children_issued_in_descending_z_order() {
    let board = MemoryBoard::new();
    let mut low = text("low", 10.0, 10.0, 10.0, 10.0);
    low.z_order = 1;
    let mut high = text("high", 20.0, 20.0, 10.0, 10.0);
    high.z_order = 5;
    let catalog = Catalog::new(vec![template(vec![low, high])]);

    place_template(&board, &catalog, &catalog.templates()[0], &instant())
        .await
        .unwrap();

    let contents: Vec<Option<String>> = board
        .query(&ItemQuery::of_kind("text"))
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.content)
        .collect();
    assert_eq!(contents, vec![Some("high".to_string()), Some("low".to_string())]);
}

#[tokio::test]
async fn only_images_receive_extra_properties() {
    let board = MemoryBoard::new();
    let mut image = Element::new(
        ElementBody::Image { url: Some("https://img.test/a.png".into()), scale: Some(0.5) },
        40.0,
        40.0,
        30.0,
        30.0,
    );
    image.rotation = Some(15.0);
    image.metadata.insert("source".into(), serde_json::json!("library"));
    let note_body = ElementBody::StickyNote { content: Some("n".into()), shape: None };
    let mut note = Element::new(note_body, 10.0, 10.0, 10.0, 10.0);
    note.rotation = Some(3.0);
    let catalog = Catalog::new(vec![template(vec![image, note])]);

    let report = place_template(&board, &catalog, &catalog.templates()[0], &instant())
        .await
        .unwrap();
    assert_eq!(report.created, 2);
    assert_eq!(board.stats().updates.load(Ordering::SeqCst), 1);

    let images = board.query(&ItemQuery::of_kind("image")).await.unwrap();
    assert_eq!(images[0].scale, Some(0.5));
    assert_eq!(images[0].metadata.get("source").and_then(|v| v.as_str()), Some("library"));
}

#[tokio::test]
async fn catalog_template_is_not_mutated() {
    let board = MemoryBoard::new();
    let catalog = Catalog::new(vec![template(vec![text("a", 50.0, 25.0, 40.0, 10.0)])]);
    let before = catalog.templates().to_vec();
    place_by_key(&board, &catalog, TemplateKey::new(1, 1), Point::new(10_000.0, 0.0), &instant())
        .await
        .unwrap();
    assert_eq!(catalog.templates(), before.as_slice());
}

// =============================================================================
// PURE HELPERS
// =============================================================================

#[test]
fn extra_update_only_for_images() {
    let note = Element::new(ElementBody::StickyNote { content: Some("x".into()), shape: None }, 0.0, 0.0, 1.0, 1.0);
    assert!(extra_update(&note).is_none());
    let image = Element::new(ElementBody::Image { url: Some("http://x".into()), scale: None }, 0.0, 0.0, 1.0, 2.0);
    let update = extra_update(&image).unwrap();
    assert_eq!(update.width, Some(1.0));
    assert_eq!(update.height, Some(2.0));
    assert!(update.style.is_none());
}

#[test]
fn sticky_draft_uses_width_and_default_shape() {
    let note = Element::new(ElementBody::StickyNote { content: Some("x".into()), shape: None }, 0.0, 0.0, 120.0, 80.0);
    let draft = child_draft(&note, Point::new(1.0, 2.0)).unwrap();
    assert_eq!(
        draft.body,
        DraftBody::StickyNote {
            content: "x".into(),
            shape: DEFAULT_STICKY_SHAPE.into(),
            width: 120.0,
            style: Props::new(),
        }
    );
}

#[test]
fn image_accepts_data_uri() {
    let body = ElementBody::Image { url: Some("data:image/png;base64,AAAA".into()), scale: None };
    let image = Element::new(body, 0.0, 0.0, 1.0, 1.0);
    assert!(child_draft(&image, Point::new(0.0, 0.0)).is_ok());
}

#[test]
fn placement_error_codes() {
    use crate::error::ErrorCode;
    assert_eq!(PlacementError::EmptyBounds(TemplateKey::new(1, 1)).error_code(), "E_TEMPLATE_EMPTY");
    assert_eq!(PlacementError::Host(HostError::NotFound("x".into())).error_code(), "E_ITEM_NOT_FOUND");
    assert!(PlacementError::Host(HostError::Request("t".into())).retryable());
}
