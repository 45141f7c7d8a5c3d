use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::db::{CatalogError, CatalogStore, PhotoRecord, SqliteCatalog};

/// Magic bytes opening every section of a cached preview file
pub const SECTION_MAGIC: &[u8; 4] = b"AgHg";

/// Fixed part of a section header, before the section name
pub const SECTION_HEADER_LEN: usize = 24;

const PREVIEW_ENTRIES: &str = "preview_entries";

const PREVIEW_ENTRIES_QUERY: &str = r#"
SELECT   imageId,
         uuid,
         digest
FROM     ImageCacheEntry
ORDER BY imageId
"#;

/// Errors that can occur while reading cached previews
#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("Preview catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("No cached preview for photo {0}")]
    NotCached(i64),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed preview file: {0}")]
    Malformed(String),
}

/// Source of per-photo preview bytes (allows mocking for tests)
#[async_trait::async_trait]
pub trait PreviewSource: Send + Sync {
    /// Bytes of the best available preview. Opaque; never decoded here.
    async fn preview(&self, photo: &PhotoRecord) -> Result<Vec<u8>, PreviewError>;
}

/// One section of a cached preview file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewSection<'a> {
    pub name: String,
    pub kind: u8,
    pub data: &'a [u8],
}

impl PreviewSection<'_> {
    /// Pyramid level for sections named `level_N`
    pub fn level(&self) -> Option<u32> {
        self.name.strip_prefix("level_")?.parse().ok()
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    uuid: String,
    digest: String,
}

/// The preview cache that sits next to a catalog
///
/// Layout: `<catalog stem> Previews.lrdata/previews.db` indexes photos to
/// preview files stored under `<uuid[0]>/<uuid[0..4]>/<uuid>-<digest>.lrprev`.
/// The index is read once when the cache is opened.
#[derive(Debug)]
pub struct PreviewCache {
    root: PathBuf,
    entries: HashMap<i64, CacheEntry>,
}

impl PreviewCache {
    /// Where the preview cache for `catalog_path` lives
    pub fn lrdata_path(catalog_path: &Path) -> PathBuf {
        let stem = catalog_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent = catalog_path.parent().unwrap_or_else(|| Path::new(""));
        parent.join(format!("{} Previews.lrdata", stem))
    }

    /// Open the preview cache belonging to a catalog file
    pub async fn open_for_catalog(catalog_path: &Path) -> Result<Self, PreviewError> {
        Self::open(Self::lrdata_path(catalog_path)).await
    }

    /// Open a preview cache directory and load its index
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, PreviewError> {
        let root = root.as_ref().to_path_buf();
        let index = SqliteCatalog::open(root.join("previews.db")).await?;
        let rows = index.query(PREVIEW_ENTRIES, PREVIEW_ENTRIES_QUERY).await;
        index.close().await;

        let mut entries = HashMap::new();
        for row in rows? {
            let image_id = row
                .i64(0)
                .map_err(|e| CatalogError::row_conversion(PREVIEW_ENTRIES, e))?;
            let uuid = row
                .label(1)
                .map_err(|e| CatalogError::row_conversion(PREVIEW_ENTRIES, e))?;
            let digest = row
                .label(2)
                .map_err(|e| CatalogError::row_conversion(PREVIEW_ENTRIES, e))?;
            entries
                .entry(image_id)
                .or_insert(CacheEntry { uuid, digest });
        }

        info!(
            "Opened preview cache {} ({} entries)",
            root.display(),
            entries.len()
        );
        Ok(PreviewCache { root, entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Path of the cached preview file for a photo id, if the index has one
    pub fn preview_path(&self, image_id: i64) -> Option<PathBuf> {
        let entry = self.entries.get(&image_id)?;
        Some(preview_file_path(&self.root, &entry.uuid, &entry.digest))
    }
}

#[async_trait::async_trait]
impl PreviewSource for PreviewCache {
    async fn preview(&self, photo: &PhotoRecord) -> Result<Vec<u8>, PreviewError> {
        let path = self
            .preview_path(photo.id)
            .ok_or(PreviewError::NotCached(photo.id))?;
        debug!("Reading preview {}", path.display());

        let bytes = tokio::fs::read(&path).await?;
        largest_level(&bytes)
    }
}

fn preview_file_path(root: &Path, uuid: &str, digest: &str) -> PathBuf {
    let first = uuid.get(..1).unwrap_or("");
    let prefix = uuid.get(..4).unwrap_or(uuid);
    root.join(first)
        .join(prefix)
        .join(format!("{}-{}.lrprev", uuid, digest))
}

/// Split a cached preview file into its sections
///
/// Each section is a big-endian header (magic, u16 header length, u8 version,
/// u8 kind, u64 data length, u64 padding length), a NUL-padded name filling
/// the rest of the header, then the data and padding.
pub fn parse_sections(bytes: &[u8]) -> Result<Vec<PreviewSection<'_>>, PreviewError> {
    let mut sections = Vec::new();
    let mut pos = 0usize;

    while pos < bytes.len() {
        let header = bytes
            .get(pos..pos + SECTION_HEADER_LEN)
            .ok_or_else(|| PreviewError::Malformed(format!("truncated header at {}", pos)))?;

        if &header[0..4] != SECTION_MAGIC {
            return Err(PreviewError::Malformed(format!("bad magic at {}", pos)));
        }

        let header_len = u16::from_be_bytes([header[4], header[5]]) as usize;
        let kind = header[7];
        let data_len = read_u64(&header[8..16]);
        let padding_len = read_u64(&header[16..24]);

        if header_len < SECTION_HEADER_LEN {
            return Err(PreviewError::Malformed(format!(
                "header length {} at {}",
                header_len, pos
            )));
        }

        let data_start = pos + header_len;
        let data_end = usize::try_from(data_len)
            .ok()
            .and_then(|len| data_start.checked_add(len))
            .filter(|end| *end <= bytes.len())
            .ok_or_else(|| PreviewError::Malformed(format!("section at {} overruns file", pos)))?;

        let name_bytes = bytes
            .get(pos + SECTION_HEADER_LEN..data_start)
            .ok_or_else(|| PreviewError::Malformed(format!("truncated name at {}", pos)))?;
        let name = String::from_utf8_lossy(name_bytes)
            .trim_end_matches('\0')
            .to_string();

        sections.push(PreviewSection {
            name,
            kind,
            data: &bytes[data_start..data_end],
        });

        // Trailing padding on the last section may be cut short
        pos = usize::try_from(padding_len)
            .ok()
            .and_then(|len| data_end.checked_add(len))
            .unwrap_or(usize::MAX)
            .min(bytes.len());
    }

    Ok(sections)
}

/// Data of the highest `level_N` section, the largest rendition in the file
pub fn largest_level(bytes: &[u8]) -> Result<Vec<u8>, PreviewError> {
    parse_sections(bytes)?
        .into_iter()
        .filter_map(|section| section.level().map(|level| (level, section)))
        .max_by_key(|(level, _)| *level)
        .map(|(_, section)| section.data.to_vec())
        .ok_or_else(|| PreviewError::Malformed("no preview levels".to_string()))
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_be_bytes(buf)
}
