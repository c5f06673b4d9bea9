use super::*;

fn sticky(x_rel: f64, y_rel: f64) -> Element {
    Element::new(ElementBody::StickyNote { content: Some("hi".into()), shape: None }, x_rel, y_rel, 100.0, 100.0)
}

fn template(children: Vec<Element>) -> Template {
    Template {
        key: TemplateKey::new(2, 3),
        title: "2.3 - Step".into(),
        x: 1000.0,
        y: 500.0,
        width: Some(800.0),
        height: Some(400.0),
        style: Props::new(),
        thumbnail: String::new(),
        children,
        rejected: Vec::new(),
    }
}

#[test]
fn template_key_parse_and_display() {
    let key = TemplateKey::parse("4.7").unwrap();
    assert_eq!(key, TemplateKey::new(4, 7));
    assert_eq!(key.to_string(), "4.7");
    assert!(TemplateKey::parse("4").is_none());
    assert!(TemplateKey::parse("a.b").is_none());
    assert!(TemplateKey::parse("-1.2").is_none());
}

#[test]
fn template_keys_order_by_phase_then_index() {
    let mut keys = vec![TemplateKey::new(2, 0), TemplateKey::new(1, 9), TemplateKey::new(1, 2)];
    keys.sort();
    assert_eq!(keys, vec![TemplateKey::new(1, 2), TemplateKey::new(1, 9), TemplateKey::new(2, 0)]);
}

#[test]
fn element_kind_round_trip_str() {
    for kind in ElementKind::ALL {
        assert_eq!(ElementKind::from_str(kind.as_str()), Some(kind));
    }
    assert_eq!(ElementKind::from_str("video"), None);
    assert_eq!(ElementKind::from_str("frame"), None);
    assert_eq!(ElementKind::from_str("STICKY_NOTE"), None);
}

#[test]
fn body_content_only_for_text_bearing_kinds() {
    assert_eq!(ElementBody::Text { content: Some("x".into()) }.content(), Some("x"));
    assert_eq!(ElementBody::Image { url: Some("http://a".into()), scale: None }.content(), None);
    assert_eq!(ElementBody::Emoji { emoji: Some("🙂".into()) }.content(), None);
}

#[test]
fn element_absolute_position_uses_frame_top_left() {
    let t = template(vec![sticky(50.0, 20.0)]);
    let frame = t.frame_rect().unwrap();
    let abs = t.children[0].absolute_position(&frame).unwrap();
    assert!((abs.x - 650.0).abs() < 1e-9);
    assert!((abs.y - 320.0).abs() < 1e-9);
}

#[test]
fn geometry_problems_lists_each_bad_field() {
    let mut e = sticky(f64::NAN, 0.0);
    e.height = f64::INFINITY;
    assert_eq!(e.geometry_problems(), vec!["xRel invalid", "height invalid"]);
    assert!(sticky(1.0, 2.0).geometry_problems().is_empty());
}

#[test]
fn frame_rect_requires_size() {
    let mut t = template(Vec::new());
    t.width = None;
    assert!(t.frame_rect().is_none());
    t.width = Some(f64::NAN);
    assert!(t.frame_rect().is_none());
}

#[test]
fn staged_copy_moves_frame_and_leaves_source_untouched() {
    let t = template(vec![sticky(10.0, 10.0)]);
    let staged = t.staged_at_offset(10_000.0, 0.0);
    assert!((staged.x - 11_000.0).abs() < f64::EPSILON);
    assert!((t.x - 1000.0).abs() < f64::EPSILON);
    assert_eq!(staged.children, t.children);
    assert_eq!(staged.key, t.key);
}

#[test]
fn thumbnail_url_falls_back_to_key_path() {
    let mut t = template(Vec::new());
    assert_eq!(t.thumbnail_url(), "/thumbnails/2.3.jpg");
    t.thumbnail = "https://cdn.test/x.png".into();
    assert_eq!(t.thumbnail_url(), "https://cdn.test/x.png");
}

#[test]
fn fill_color_reads_style_string() {
    let mut t = template(Vec::new());
    assert_eq!(t.fill_color(), None);
    t.style.insert("fillColor".into(), serde_json::json!("#fef445"));
    assert_eq!(t.fill_color(), Some("#fef445"));
}
