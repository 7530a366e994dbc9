use client::{ClientError, FileManifestSource, ManifestSource, StaticManifestSource};
use model::CustomTypeModel;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use typepath::{pointer_file_name, TypePathManifest};

fn manifest(repository: &str) -> TypePathManifest {
    let page: CustomTypeModel = serde_json::from_value(json!({
        "id": "page",
        "json": {"Main": {"title": {"type": "StructuredText"}}}
    }))
    .unwrap();
    TypePathManifest::build(repository, vec![page], vec![]).unwrap()
}

#[tokio::test]
async fn file_source_follows_the_pointer() {
    let dir = tempfile::tempdir().unwrap();
    let written = manifest("blog");
    written.write_to_dir(dir.path(), "prismic-").unwrap();

    let source = FileManifestSource::new(dir.path());
    let loaded = source
        .load("blog", &pointer_file_name("prismic-", "blog"), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(loaded, written);
    assert!(loaded.registry().unwrap().len() > 0);
}

#[tokio::test]
async fn file_source_rejects_foreign_manifests() {
    let dir = tempfile::tempdir().unwrap();
    manifest("shop").write_to_dir(dir.path(), "").unwrap();
    std::fs::rename(
        dir.path().join(pointer_file_name("", "shop")),
        dir.path().join(pointer_file_name("", "blog")),
    )
    .unwrap();

    let source = FileManifestSource::new(dir.path());
    let result = source
        .load("blog", &pointer_file_name("", "blog"), &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(ClientError::Manifest(_))));
}

#[tokio::test]
async fn file_source_missing_pointer_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let source = FileManifestSource::new(dir.path());
    let result = source
        .load("blog", "blog.json", &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(ClientError::NotFound(_))));
}

#[tokio::test]
async fn static_source_serves_by_repository() {
    let source = StaticManifestSource::new();
    source.insert(manifest("blog"));
    let cancel = CancellationToken::new();
    assert!(source.load("blog", "", &cancel).await.is_ok());
    assert!(matches!(
        source.load("shop", "", &cancel).await,
        Err(ClientError::NotFound(_))
    ));
}
