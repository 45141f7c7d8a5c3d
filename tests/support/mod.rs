#![allow(dead_code)]

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};
use std::path::{Path, PathBuf};

use lumen::preview::{SECTION_HEADER_LEN, SECTION_MAGIC};

/// Initialize tracing for tests with proper test output handling
pub fn tracing_init() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// The catalog tables the named queries read, with only the columns they use
const CATALOG_SCHEMA: &[&str] = &[
    "CREATE TABLE Adobe_images (
        id_local INTEGER PRIMARY KEY,
        id_global TEXT NOT NULL,
        captureTime TEXT,
        rootFile INTEGER
    )",
    "CREATE TABLE AgHarvestedExifMetadata (
        id_local INTEGER PRIMARY KEY,
        image INTEGER,
        aperture REAL,
        shutterSpeed REAL,
        focalLength REAL,
        lensRef INTEGER,
        cameraModelRef INTEGER
    )",
    "CREATE TABLE AgInternedExifLens (id_local INTEGER PRIMARY KEY, value TEXT)",
    "CREATE TABLE AgInternedExifCameraModel (id_local INTEGER PRIMARY KEY, value TEXT)",
    "CREATE TABLE AgLibraryKeyword (id_local INTEGER PRIMARY KEY, name TEXT)",
    "CREATE TABLE AgLibraryKeywordPopularity (
        id_local INTEGER PRIMARY KEY,
        occurrences INTEGER NOT NULL,
        tag INTEGER
    )",
    "CREATE TABLE Adobe_libraryImageDevelopHistoryStep (
        id_local INTEGER PRIMARY KEY,
        image INTEGER
    )",
    "CREATE TABLE AgLibraryFile (id_local INTEGER PRIMARY KEY, baseName TEXT NOT NULL)",
];

const PREVIEW_SCHEMA: &[&str] = &["CREATE TABLE ImageCacheEntry (
        id_local INTEGER PRIMARY KEY,
        imageId INTEGER,
        uuid TEXT,
        digest TEXT
    )"];

async fn create_database(path: &Path, schema: &[&str], statements: &[&str]) {
    // Preview cache paths contain spaces, so skip the URL form
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Delete);
    let pool = SqlitePool::connect_with(options)
        .await
        .expect("Failed to create fixture database");

    for sql in schema.iter().chain(statements) {
        sqlx::query(sql)
            .execute(&pool)
            .await
            .unwrap_or_else(|e| panic!("Fixture statement failed: {}\n{}", e, sql));
    }

    pool.close().await;
}

/// Create a catalog file with the catalog schema and run `statements` on it
pub async fn create_catalog(dir: &Path, name: &str, statements: &[&str]) -> PathBuf {
    let path = dir.join(name);
    create_database(&path, CATALOG_SCHEMA, statements).await;
    path
}

/// Create the preview cache next to a catalog and store one preview file per
/// `(image_id, uuid, digest, contents)`
pub async fn create_preview_cache(
    catalog_path: &Path,
    previews: &[(i64, &str, &str, Vec<u8>)],
) -> PathBuf {
    let stem = catalog_path.file_stem().unwrap().to_string_lossy();
    let root = catalog_path
        .parent()
        .unwrap()
        .join(format!("{} Previews.lrdata", stem));
    std::fs::create_dir_all(&root).unwrap();

    let mut statements = Vec::new();
    for (image_id, uuid, digest, contents) in previews {
        statements.push(format!(
            "INSERT INTO ImageCacheEntry (imageId, uuid, digest) VALUES ({}, '{}', '{}')",
            image_id, uuid, digest
        ));

        let dir = root.join(&uuid[..1]).join(&uuid[..4]);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{}-{}.lrprev", uuid, digest)), contents).unwrap();
    }

    let statements: Vec<&str> = statements.iter().map(String::as_str).collect();
    create_database(&root.join("previews.db"), PREVIEW_SCHEMA, &statements).await;
    root
}

/// Encode one cached-preview section: fixed big-endian header, NUL-padded
/// name, data, then `padding` zero bytes
pub fn preview_section(name: &str, kind: u8, data: &[u8], padding: usize) -> Vec<u8> {
    let name_len = (name.len() / 8 + 1) * 8;
    let header_len = SECTION_HEADER_LEN + name_len;

    let mut out = Vec::new();
    out.extend_from_slice(SECTION_MAGIC);
    out.extend_from_slice(&(header_len as u16).to_be_bytes());
    out.push(1);
    out.push(kind);
    out.extend_from_slice(&(data.len() as u64).to_be_bytes());
    out.extend_from_slice(&(padding as u64).to_be_bytes());
    out.extend_from_slice(name.as_bytes());
    out.resize(header_len, 0);
    out.extend_from_slice(data);
    out.resize(header_len + data.len() + padding, 0);
    out
}

/// A preview file with a header section and the given `level_N` renditions
pub fn preview_file(levels: &[(u32, &str)]) -> Vec<u8> {
    let mut file = preview_section("header", 1, b"{\"orientation\":\"AB\"}", 4);
    for (level, data) in levels {
        file.extend(preview_section(&format!("level_{}", level), 2, data.as_bytes(), 0));
    }
    file
}
