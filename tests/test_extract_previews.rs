mod support;

use tempfile::TempDir;

use crate::support::{create_catalog, create_preview_cache, preview_file, tracing_init};
use lumen::catalog::Catalog;
use lumen::db::SqliteCatalog;
use lumen::export::{ExportError, ExtractSummary, PreviewExporter};
use lumen::preview::{PreviewCache, PreviewError, PreviewSource};

const PHOTOS: &[&str] = &[
    "INSERT INTO AgLibraryFile (id_local, baseName) VALUES
        (11, 'IMG_0001'), (12, 'IMG_0002'), (13, 'DSC_0003')",
    "INSERT INTO Adobe_images (id_local, id_global, rootFile) VALUES
        (1, 'G-1', 11), (2, 'G-2', 12), (3, 'G-3', 13)",
];

#[tokio::test]
async fn test_extract_writes_largest_preview() {
    tracing_init();
    let temp_dir = TempDir::new().unwrap();
    let catalog_path = create_catalog(temp_dir.path(), "Shoot.lrcat", PHOTOS).await;

    // Photo 2 has no cached preview
    create_preview_cache(
        &catalog_path,
        &[
            (
                1,
                "0A1B2C3D-0001",
                "aaaa",
                preview_file(&[(1, "small-1"), (3, "large-1"), (2, "medium-1")]),
            ),
            (3, "F00DCAFE-0003", "cccc", preview_file(&[(1, "only-3")])),
        ],
    )
    .await;

    let store = SqliteCatalog::open(&catalog_path).await.unwrap();
    let catalog = Catalog::from_store(store.clone());
    let previews = PreviewCache::open_for_catalog(&catalog_path).await.unwrap();
    assert_eq!(previews.len(), 2);

    let output_dir = temp_dir.path().join("out");
    let summary = PreviewExporter::new(&output_dir)
        .extract(&catalog, &previews)
        .await
        .unwrap();
    store.close().await;

    assert_eq!(
        summary,
        ExtractSummary {
            success_count: 2,
            error_count: 1
        }
    );
    assert_eq!(std::fs::read(output_dir.join("IMG_0001.jpg")).unwrap(), b"large-1");
    assert_eq!(std::fs::read(output_dir.join("DSC_0003.jpg")).unwrap(), b"only-3");
    assert!(!output_dir.join("IMG_0002.jpg").exists());
}

#[tokio::test]
async fn test_corrupt_preview_is_skipped() {
    tracing_init();
    let temp_dir = TempDir::new().unwrap();
    let catalog_path = create_catalog(temp_dir.path(), "Shoot.lrcat", PHOTOS).await;

    create_preview_cache(
        &catalog_path,
        &[
            (1, "0A1B2C3D-0001", "aaaa", b"not a preview".to_vec()),
            (2, "1B2C3D4E-0002", "bbbb", preview_file(&[(2, "two")])),
        ],
    )
    .await;

    let catalog = Catalog::from_store(SqliteCatalog::open(&catalog_path).await.unwrap());
    let previews = PreviewCache::open_for_catalog(&catalog_path).await.unwrap();

    let photos = catalog.photos().await.unwrap();
    assert!(matches!(
        previews.preview(&photos[0]).await,
        Err(PreviewError::Malformed(_))
    ));
    assert!(matches!(
        previews.preview(&photos[2]).await,
        Err(PreviewError::NotCached(3))
    ));

    let output_dir = temp_dir.path().join("out");
    let summary = PreviewExporter::new(&output_dir)
        .with_extension("jpeg")
        .extract(&catalog, &previews)
        .await
        .unwrap();

    assert_eq!(summary.success_count, 1);
    assert_eq!(summary.error_count, 2);
    assert_eq!(std::fs::read(output_dir.join("IMG_0002.jpeg")).unwrap(), b"two");
}

#[tokio::test]
async fn test_output_path_must_be_directory() {
    tracing_init();
    let temp_dir = TempDir::new().unwrap();
    let catalog_path = create_catalog(temp_dir.path(), "Shoot.lrcat", PHOTOS).await;
    create_preview_cache(&catalog_path, &[]).await;

    let output = temp_dir.path().join("taken");
    std::fs::write(&output, b"").unwrap();

    let catalog = Catalog::from_store(SqliteCatalog::open(&catalog_path).await.unwrap());
    let previews = PreviewCache::open_for_catalog(&catalog_path).await.unwrap();
    assert!(previews.is_empty());

    let err = PreviewExporter::new(&output)
        .extract(&catalog, &previews)
        .await
        .unwrap_err();
    assert!(matches!(err, ExportError::NotADirectory(_)));
}

#[tokio::test]
async fn test_missing_preview_cache() {
    tracing_init();
    let temp_dir = TempDir::new().unwrap();
    let catalog_path = create_catalog(temp_dir.path(), "Shoot.lrcat", PHOTOS).await;

    let err = PreviewCache::open_for_catalog(&catalog_path).await.unwrap_err();
    assert!(matches!(err, PreviewError::Catalog(_)));
}
