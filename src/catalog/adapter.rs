use tracing::debug;

use crate::convert::{aperture_to_f_number, format_f_number, shutter_speed_to_exposure_time};
use crate::db::{CatalogError, CatalogRow, CatalogStore, ConversionError};
use crate::distribution::{DistributionEntry, DistributionList};

/// Turns one aggregation row into a distribution bucket
pub trait RowConverter: Send + Sync {
    fn convert(&self, row: &CatalogRow) -> Result<DistributionEntry, ConversionError>;
}

/// Rows shaped `(id, label, count)`
///
/// A NULL label becomes the empty string.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabeledCount;

impl RowConverter for LabeledCount {
    fn convert(&self, row: &CatalogRow) -> Result<DistributionEntry, ConversionError> {
        Ok(DistributionEntry {
            id: row.i64(0)?,
            label: row.label(1)?,
            count: row.count(2)?,
        })
    }
}

/// Rows shaped `(apex_aperture, count)`, labelled by f-number (`"2.8"`)
#[derive(Debug, Clone, Copy, Default)]
pub struct ApertureCount;

impl RowConverter for ApertureCount {
    fn convert(&self, row: &CatalogRow) -> Result<DistributionEntry, ConversionError> {
        let aperture = row.f64(0)?;
        Ok(DistributionEntry {
            id: 0,
            label: format_f_number(aperture_to_f_number(aperture)),
            count: row.count(1)?,
        })
    }
}

/// Rows shaped `(apex_shutter_speed, count)`, labelled by exposure time
/// (`"1/250"`, `"2s"`)
#[derive(Debug, Clone, Copy, Default)]
pub struct ExposureTimeCount;

impl RowConverter for ExposureTimeCount {
    fn convert(&self, row: &CatalogRow) -> Result<DistributionEntry, ConversionError> {
        let shutter = row.f64(0)?;
        Ok(DistributionEntry {
            id: 0,
            label: shutter_speed_to_exposure_time(shutter),
            count: row.count(1)?,
        })
    }
}

/// Run an aggregation query and convert every row
///
/// Entries keep the store's row order. The first row that fails conversion
/// aborts the whole query; no partial list is returned.
pub async fn query_distribution(
    store: &dyn CatalogStore,
    label: &str,
    sql: &str,
    converter: &dyn RowConverter,
) -> Result<DistributionList, CatalogError> {
    let rows = store.query(label, sql).await?;

    let mut entries = DistributionList::new();
    for row in &rows {
        let entry = converter
            .convert(row)
            .map_err(|e| CatalogError::row_conversion(label, e))?;
        entries.push(entry);
    }

    debug!(label, buckets = entries.len(), "Converted distribution");
    Ok(entries)
}
