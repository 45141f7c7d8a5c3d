use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::db::{CatalogError, PhotoRecord};
use crate::preview::PreviewSource;

/// Extension used for extracted previews unless configured otherwise
pub const DEFAULT_PREVIEW_EXTENSION: &str = "jpg";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Output path {} exists but is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("Unable to stat output directory {}: {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Unable to create output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Unable to list photos: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Unable to write preview {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Outcome of an extraction run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtractSummary {
    pub success_count: usize,
    pub error_count: usize,
}

/// Writes cached previews out as one file per photo
#[derive(Debug, Clone)]
pub struct PreviewExporter {
    output_dir: PathBuf,
    extension: String,
}

impl PreviewExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        PreviewExporter {
            output_dir: output_dir.into(),
            extension: DEFAULT_PREVIEW_EXTENSION.to_string(),
        }
    }

    /// Use a different file extension for written previews
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// File a photo's preview is written to: `<output_dir>/<base_name>.<ext>`
    pub fn output_path(&self, photo: &PhotoRecord) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", photo.base_name, self.extension))
    }

    /// Create the output directory if needed and check it is a directory
    pub async fn ensure_output_dir(&self) -> Result<(), ExportError> {
        match fs::metadata(&self.output_dir).await {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            Ok(_) => Err(ExportError::NotADirectory(self.output_dir.clone())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                fs::create_dir_all(&self.output_dir)
                    .await
                    .map_err(|source| ExportError::CreateDir {
                        path: self.output_dir.clone(),
                        source,
                    })?;
                debug!("Created output directory {}", self.output_dir.display());
                Ok(())
            }
            Err(source) => Err(ExportError::Stat {
                path: self.output_dir.clone(),
                source,
            }),
        }
    }

    /// Extract the preview of every photo in the catalog
    pub async fn extract(
        &self,
        catalog: &Catalog,
        previews: &dyn PreviewSource,
    ) -> Result<ExtractSummary, ExportError> {
        self.ensure_output_dir().await?;
        let photos = catalog.photos().await?;
        self.extract_photos(&photos, previews).await
    }

    /// Extract previews for the given photos
    ///
    /// A photo whose preview cannot be retrieved is logged, counted as an
    /// error and skipped. A preview that cannot be written stops the run.
    pub async fn extract_photos(
        &self,
        photos: &[PhotoRecord],
        previews: &dyn PreviewSource,
    ) -> Result<ExtractSummary, ExportError> {
        info!(
            action = "extract",
            status = "start",
            photos = photos.len(),
            "Extracting previews to {}",
            self.output_dir.display()
        );

        let mut summary = ExtractSummary::default();

        for photo in photos {
            let preview = match previews.preview(photo).await {
                Ok(preview) => preview,
                Err(e) => {
                    warn!(
                        action = "extract",
                        status = "error",
                        photo = %photo.base_name,
                        "Error retrieving photo preview, skipping: {}",
                        e
                    );
                    summary.error_count += 1;
                    continue;
                }
            };

            let path = self.output_path(photo);
            if let Err(source) = fs::write(&path, &preview).await {
                warn!(
                    action = "write",
                    status = "error",
                    filename = %path.display(),
                    "Error writing preview file: {}",
                    source
                );
                return Err(ExportError::Write { path, source });
            }

            debug!(
                action = "write",
                status = "ok",
                filename = %path.display(),
                bytes = preview.len(),
                "Wrote preview"
            );
            summary.success_count += 1;
        }

        info!(
            action = "extract",
            status = "done",
            success_count = summary.success_count,
            error_count = summary.error_count,
            "Complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::PreviewError;
    use std::collections::HashMap;
    use tempfile::TempDir;

    struct FixturePreviews(HashMap<i64, Vec<u8>>);

    #[async_trait::async_trait]
    impl PreviewSource for FixturePreviews {
        async fn preview(&self, photo: &PhotoRecord) -> Result<Vec<u8>, PreviewError> {
            self.0
                .get(&photo.id)
                .cloned()
                .ok_or(PreviewError::NotCached(photo.id))
        }
    }

    fn photo(id: i64, base_name: &str) -> PhotoRecord {
        PhotoRecord {
            id,
            global_id: format!("GLOBAL-{}", id),
            base_name: base_name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_extract_skips_missing_previews() {
        let temp_dir = TempDir::new().unwrap();
        let exporter = PreviewExporter::new(temp_dir.path().join("out"));
        exporter.ensure_output_dir().await.unwrap();

        let previews = FixturePreviews(HashMap::from([
            (1, b"jpeg-one".to_vec()),
            (3, b"jpeg-three".to_vec()),
        ]));
        let photos = vec![photo(1, "IMG_0001"), photo(2, "IMG_0002"), photo(3, "IMG_0003")];

        let summary = exporter.extract_photos(&photos, &previews).await.unwrap();

        assert_eq!(
            summary,
            ExtractSummary {
                success_count: 2,
                error_count: 1
            }
        );
        let out = temp_dir.path().join("out");
        assert_eq!(std::fs::read(out.join("IMG_0001.jpg")).unwrap(), b"jpeg-one");
        assert_eq!(std::fs::read(out.join("IMG_0003.jpg")).unwrap(), b"jpeg-three");
        assert!(!out.join("IMG_0002.jpg").exists());
    }

    #[tokio::test]
    async fn test_write_failure_stops_run() {
        let temp_dir = TempDir::new().unwrap();
        // Output directory never created, so the write fails
        let exporter = PreviewExporter::new(temp_dir.path().join("missing"));
        let previews = FixturePreviews(HashMap::from([(1, b"jpeg".to_vec())]));

        let err = exporter
            .extract_photos(&[photo(1, "IMG_0001")], &previews)
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Write { .. }));
    }

    #[tokio::test]
    async fn test_ensure_output_dir_rejects_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("previews");
        std::fs::write(&file, b"").unwrap();

        let err = PreviewExporter::new(&file)
            .ensure_output_dir()
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::NotADirectory(_)));
    }

    #[tokio::test]
    async fn test_ensure_output_dir_creates_nested() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b");
        PreviewExporter::new(&nested).ensure_output_dir().await.unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_output_path_extension() {
        let exporter = PreviewExporter::new("/out").with_extension("jpeg");
        assert_eq!(
            exporter.output_path(&photo(1, "DSC_1234")),
            PathBuf::from("/out/DSC_1234.jpeg")
        );
    }
}
