use super::*;
use crate::model::TemplateKey;
use std::path::PathBuf;

async fn write_temp(contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("plantilles-import-{}.json", uuid::Uuid::new_v4()));
    tokio::fs::write(&path, contents).await.unwrap();
    path
}

fn seeded_catalog() -> RwLock<Catalog> {
    let report = parse_manifest(r#"[{"title":"9.9 - Old","x":0,"y":0,"width":1,"height":1,"items":[]}]"#).unwrap();
    RwLock::new(Catalog::new(report.templates))
}

#[tokio::test]
async fn import_replaces_catalog() {
    let path = write_temp(
        &serde_json::json!([
            { "title": "1.2 - B", "x": 0, "y": 0, "width": 10, "height": 10, "items": [] },
            { "title": "1.1 - A", "x": 0, "y": 0, "width": 10, "height": 10, "items": [] },
            { "title": "1.1 - Dup", "x": 0, "y": 0, "width": 10, "height": 10, "items": [] },
        ])
        .to_string(),
    )
    .await;
    let catalog = seeded_catalog();

    let summary = import_catalog(&ManifestSource::File(path.clone()), &reqwest::Client::new(), &catalog)
        .await
        .unwrap();

    assert_eq!(summary.loaded, 2);
    assert_eq!(summary.duplicate_keys, 1);
    let catalog = catalog.read().await;
    assert!(catalog.find(TemplateKey::new(9, 9)).ok().is_none());
    assert_eq!(catalog.templates()[0].title, "1.1 - A");
    let _ = tokio::fs::remove_file(&path).await;
}

#[tokio::test]
async fn missing_source_leaves_catalog_unchanged() {
    let catalog = seeded_catalog();
    let source = ManifestSource::File(PathBuf::from("/no/such/dir/plantilles.json"));

    let err = import_catalog(&source, &reqwest::Client::new(), &catalog)
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::Manifest { error: ManifestError::Read { .. }, .. }));
    assert_eq!(catalog.read().await.len(), 1);
}

#[tokio::test]
async fn malformed_manifest_leaves_catalog_unchanged() {
    let path = write_temp(r#"{"not":"an array"}"#).await;
    let catalog = seeded_catalog();

    let err = import_catalog(&ManifestSource::File(path.clone()), &reqwest::Client::new(), &catalog)
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), "E_MANIFEST_SHAPE");
    assert!(catalog.read().await.find(TemplateKey::new(9, 9)).ok().is_some());
    let _ = tokio::fs::remove_file(&path).await;
}
