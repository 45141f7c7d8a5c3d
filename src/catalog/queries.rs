use std::sync::Arc;
use tracing::info;

use crate::catalog::adapter::{
    query_distribution, ApertureCount, ExposureTimeCount, LabeledCount,
};
use crate::convert::{aperture_to_f_number, format_f_number, shutter_speed_to_exposure_time};
use crate::db::{CatalogError, CatalogStore, ConversionError, PhotoRecord, StringRecord};
use crate::distribution::DistributionList;

/// Day bucket format for capture dates (`YYYY-MM-DD`, SQLite strftime syntax)
pub const DAY_FORMAT: &str = "%Y-%m-%d";

// Query labels, reported in logs and errors
pub const PHOTO_COUNTS_BY_DATE: &str = "photo_counts_by_date";
pub const LENS_DISTRIBUTION: &str = "lens_distribution";
pub const CAMERA_DISTRIBUTION: &str = "camera_distribution";
pub const FOCAL_LENGTH_DISTRIBUTION: &str = "focal_length_distribution";
pub const APERTURE_DISTRIBUTION: &str = "aperture_distribution";
pub const EXPOSURE_TIME_DISTRIBUTION: &str = "exposure_time_distribution";
pub const EDIT_COUNT_DISTRIBUTION: &str = "edit_count_distribution";
pub const KEYWORD_DISTRIBUTION: &str = "keyword_distribution";
pub const SUNBURST_STATS: &str = "sunburst_stats";
pub const PHOTOS: &str = "photos";

const LENS_QUERY: &str = r#"
SELECT    LensRef.id_local      AS id,
          LensRef.value         AS name,
          count(LensRef.value)  AS count
FROM      Adobe_images               image
JOIN      AgHarvestedExifMetadata    metadata   ON  image.id_local   = metadata.image
LEFT JOIN AgInternedExifLens         LensRef    ON  LensRef.id_local = metadata.lensRef
WHERE     LensRef.id_local IS NOT NULL
GROUP BY  LensRef.id_local
ORDER BY  count DESC, name
"#;

const CAMERA_QUERY: &str = r#"
SELECT    Camera.id_local       AS id,
          Camera.value          AS name,
          count(Camera.value)   AS count
FROM      Adobe_images               image
JOIN      AgHarvestedExifMetadata    metadata   ON  image.id_local  = metadata.image
LEFT JOIN AgInternedExifCameraModel  Camera     ON  Camera.id_local = metadata.cameraModelRef
WHERE     Camera.id_local IS NOT NULL
GROUP BY  Camera.id_local
ORDER BY  count DESC, name
"#;

const FOCAL_LENGTH_QUERY: &str = r#"
SELECT   min(id_local)     AS id,
         focalLength       AS name,
         count(id_local)   AS count
FROM     AgHarvestedExifMetadata
WHERE    focalLength IS NOT NULL
GROUP BY focalLength
ORDER BY count DESC, focalLength
"#;

const APERTURE_QUERY: &str = r#"
SELECT   aperture,
         count(aperture)
FROM     AgHarvestedExifMetadata
WHERE    aperture IS NOT NULL
GROUP BY aperture
ORDER BY aperture
"#;

const EXPOSURE_TIME_QUERY: &str = r#"
SELECT   shutterSpeed,
         count(shutterSpeed)
FROM     AgHarvestedExifMetadata
WHERE    shutterSpeed IS NOT NULL
GROUP BY shutterSpeed
ORDER BY shutterSpeed
"#;

const EDIT_COUNT_QUERY: &str = r#"
SELECT   edit_count AS id,
         edit_count AS label,
         count(*)   AS count
FROM     (
  SELECT   count(*) AS edit_count,
           image
  FROM     Adobe_libraryImageDevelopHistoryStep
  GROUP BY image
)
WHERE    edit_count > 1
GROUP BY edit_count
ORDER BY edit_count DESC
"#;

const KEYWORD_QUERY: &str = r#"
SELECT     k.id_local    AS id,
           k.name        AS label,
           p.occurrences AS count
FROM       AgLibraryKeywordPopularity p
INNER JOIN AgLibraryKeyword           k  ON  p.tag = k.id_local
ORDER BY   p.occurrences DESC, k.name
"#;

const SUNBURST_QUERY: &str = r#"
SELECT    count(*)          AS count,
          Camera.value      AS camera,
          Lens.value        AS lens,
          exif.aperture     AS aperture,
          exif.focalLength  AS focal_length,
          exif.shutterSpeed AS exposure
FROM      Adobe_images              image
JOIN      AgHarvestedExifMetadata   exif      ON  image.id_local  = exif.image
LEFT JOIN AgInternedExifLens        Lens      ON  Lens.id_local   = exif.lensRef
LEFT JOIN AgInternedExifCameraModel Camera    ON  Camera.id_local = exif.cameraModelRef
WHERE     Camera.value IS NOT NULL AND Lens.value IS NOT NULL
GROUP BY  camera, lens, aperture, focal_length, exposure
ORDER BY  camera, lens, aperture, focal_length, exposure, count
"#;

const PHOTOS_QUERY: &str = r#"
SELECT   image.id_local,
         image.id_global,
         file.baseName
FROM     Adobe_images   image
JOIN     AgLibraryFile  file   ON  file.id_local = image.rootFile
ORDER BY image.id_local
"#;

fn photo_counts_by_date_query() -> String {
    format!(
        r#"
SELECT   0,
         strftime('{day}', captureTime) AS day,
         count(*)
FROM     Adobe_images
WHERE    day IS NOT NULL
GROUP BY day
ORDER BY day
"#,
        day = DAY_FORMAT
    )
}

/// The fixed set of named aggregations over one catalog
///
/// Every method is a one-shot snapshot: it runs its query to completion and
/// returns a fresh list. Nothing is cached between calls.
#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn CatalogStore>,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("store", &"<dyn CatalogStore>")
            .finish()
    }
}

impl Catalog {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Catalog { store }
    }

    /// Wrap a concrete store
    pub fn from_store<S: CatalogStore + 'static>(store: S) -> Self {
        Catalog {
            store: Arc::new(store),
        }
    }

    pub fn store(&self) -> &dyn CatalogStore {
        self.store.as_ref()
    }

    /// Photo count per capture day, ascending by date
    ///
    /// Only days with photos appear; photos without a parseable capture time
    /// are left out.
    pub async fn photo_counts_by_date(&self) -> Result<DistributionList, CatalogError> {
        let query = photo_counts_by_date_query();
        query_distribution(self.store(), PHOTO_COUNTS_BY_DATE, &query, &LabeledCount).await
    }

    /// Photo count per lens, most used first
    pub async fn lens_distribution(&self) -> Result<DistributionList, CatalogError> {
        query_distribution(self.store(), LENS_DISTRIBUTION, LENS_QUERY, &LabeledCount).await
    }

    /// Photo count per camera model, most used first
    pub async fn camera_distribution(&self) -> Result<DistributionList, CatalogError> {
        query_distribution(self.store(), CAMERA_DISTRIBUTION, CAMERA_QUERY, &LabeledCount).await
    }

    /// Photo count per stored focal length, most used first
    pub async fn focal_length_distribution(&self) -> Result<DistributionList, CatalogError> {
        query_distribution(
            self.store(),
            FOCAL_LENGTH_DISTRIBUTION,
            FOCAL_LENGTH_QUERY,
            &LabeledCount,
        )
        .await
    }

    /// Photo count per f-number, widest aperture first
    ///
    /// APEX codes that render to the same f-number share one bucket.
    pub async fn aperture_distribution(&self) -> Result<DistributionList, CatalogError> {
        let list = query_distribution(
            self.store(),
            APERTURE_DISTRIBUTION,
            APERTURE_QUERY,
            &ApertureCount,
        )
        .await?;
        Ok(list.coalesce())
    }

    /// Photo count per exposure time, ordered by the stored APEX value
    /// (longest exposure first)
    ///
    /// Ordering comes from the numeric code, not the rendered label, so
    /// `"2s"` precedes `"1/60"` which precedes `"1/250"`.
    pub async fn exposure_time_distribution(&self) -> Result<DistributionList, CatalogError> {
        let list = query_distribution(
            self.store(),
            EXPOSURE_TIME_DISTRIBUTION,
            EXPOSURE_TIME_QUERY,
            &ExposureTimeCount,
        )
        .await?;
        Ok(list.coalesce())
    }

    /// Number of photos per develop-history depth, deepest first
    ///
    /// Photos with zero or one history step are not counted.
    pub async fn edit_count_distribution(&self) -> Result<DistributionList, CatalogError> {
        query_distribution(
            self.store(),
            EDIT_COUNT_DISTRIBUTION,
            EDIT_COUNT_QUERY,
            &LabeledCount,
        )
        .await
    }

    /// Keyword occurrence counts as maintained by the catalog, most used first
    pub async fn keyword_distribution(&self) -> Result<DistributionList, CatalogError> {
        query_distribution(self.store(), KEYWORD_DISTRIBUTION, KEYWORD_QUERY, &LabeledCount).await
    }

    /// Flat camera x lens x aperture x focal length x exposure count table
    ///
    /// Aperture renders as `f/2.8`, exposure as `1/250` and focal length gains
    /// an `mm` suffix. Empty values are left empty.
    pub async fn sunburst_stats(&self) -> Result<Vec<StringRecord>, CatalogError> {
        let mut records = self
            .store
            .query_string_map(SUNBURST_STATS, SUNBURST_QUERY)
            .await?;

        for record in records.iter_mut() {
            convert_sunburst_record(record)
                .map_err(|e| CatalogError::row_conversion(SUNBURST_STATS, e))?;
        }

        info!(rows = records.len(), "Computed sunburst stats");
        Ok(records)
    }

    /// Every photo with its root file's base name, by id
    pub async fn photos(&self) -> Result<Vec<PhotoRecord>, CatalogError> {
        let rows = self.store.query(PHOTOS, PHOTOS_QUERY).await?;

        rows.iter()
            .map(|row| -> Result<PhotoRecord, ConversionError> {
                Ok(PhotoRecord {
                    id: row.i64(0)?,
                    global_id: row.label(1)?,
                    base_name: row.label(2)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CatalogError::row_conversion(PHOTOS, e))
    }
}

// Column positions in the sunburst select list, for error reporting
const SUNBURST_APERTURE_COLUMN: usize = 3;
const SUNBURST_EXPOSURE_COLUMN: usize = 5;

fn convert_sunburst_record(record: &mut StringRecord) -> Result<(), ConversionError> {
    if let Some(aperture) = record.get_mut("aperture").filter(|v| !v.is_empty()) {
        let apex = parse_apex(aperture, SUNBURST_APERTURE_COLUMN)?;
        *aperture = format!("f/{}", format_f_number(aperture_to_f_number(apex)));
    }

    if let Some(exposure) = record.get_mut("exposure").filter(|v| !v.is_empty()) {
        let apex = parse_apex(exposure, SUNBURST_EXPOSURE_COLUMN)?;
        *exposure = shutter_speed_to_exposure_time(apex);
    }

    if let Some(focal_length) = record.get_mut("focal_length").filter(|v| !v.is_empty()) {
        focal_length.push_str("mm");
    }

    Ok(())
}

fn parse_apex(value: &str, column: usize) -> Result<f64, ConversionError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConversionError::InvalidNumber {
            column,
            value: value.to_string(),
        })
}
