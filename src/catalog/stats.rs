use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::queries::Catalog;
use crate::db::CatalogError;
use crate::distribution::{merge_distributions, DistributionList};

/// Every distribution for one catalog (or several, once merged)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub by_date: DistributionList,
    pub by_lens: DistributionList,
    pub by_camera: DistributionList,
    pub by_focal_length: DistributionList,
    pub by_aperture: DistributionList,
    pub by_exposure_time: DistributionList,
    pub by_edit_count: DistributionList,
    pub by_keyword: DistributionList,
    /// Labels of named queries that failed; their distributions are empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_queries: Vec<String>,
}

impl CatalogStats {
    /// Combine snapshots from several catalogs
    ///
    /// Each dimension goes through [`merge_distributions`], so the merged
    /// lists are sorted by label.
    pub fn merge(snapshots: &[CatalogStats]) -> CatalogStats {
        let mut failed_queries: Vec<String> = snapshots
            .iter()
            .flat_map(|s| s.failed_queries.iter().cloned())
            .collect();
        failed_queries.sort();
        failed_queries.dedup();

        CatalogStats {
            by_date: merge_distributions(snapshots.iter().map(|s| &s.by_date)),
            by_lens: merge_distributions(snapshots.iter().map(|s| &s.by_lens)),
            by_camera: merge_distributions(snapshots.iter().map(|s| &s.by_camera)),
            by_focal_length: merge_distributions(snapshots.iter().map(|s| &s.by_focal_length)),
            by_aperture: merge_distributions(snapshots.iter().map(|s| &s.by_aperture)),
            by_exposure_time: merge_distributions(snapshots.iter().map(|s| &s.by_exposure_time)),
            by_edit_count: merge_distributions(snapshots.iter().map(|s| &s.by_edit_count)),
            by_keyword: merge_distributions(snapshots.iter().map(|s| &s.by_keyword)),
            failed_queries,
        }
    }

    /// Number of photos with a capture date
    pub fn photo_count(&self) -> i64 {
        self.by_date.total()
    }
}

impl Catalog {
    /// Run every named distribution query
    ///
    /// A query that fails on its own is logged, recorded in
    /// `failed_queries` and left empty. A connection failure aborts.
    pub async fn stats(&self) -> Result<CatalogStats, CatalogError> {
        let mut stats = CatalogStats::default();

        stats.by_date = tolerate(self.photo_counts_by_date().await, &mut stats.failed_queries)?;
        stats.by_lens = tolerate(self.lens_distribution().await, &mut stats.failed_queries)?;
        stats.by_camera = tolerate(self.camera_distribution().await, &mut stats.failed_queries)?;
        stats.by_focal_length =
            tolerate(self.focal_length_distribution().await, &mut stats.failed_queries)?;
        stats.by_aperture =
            tolerate(self.aperture_distribution().await, &mut stats.failed_queries)?;
        stats.by_exposure_time =
            tolerate(self.exposure_time_distribution().await, &mut stats.failed_queries)?;
        stats.by_edit_count =
            tolerate(self.edit_count_distribution().await, &mut stats.failed_queries)?;
        stats.by_keyword = tolerate(self.keyword_distribution().await, &mut stats.failed_queries)?;

        info!(
            photos = stats.photo_count(),
            failed = stats.failed_queries.len(),
            "Computed catalog stats"
        );
        Ok(stats)
    }
}

fn tolerate(
    result: Result<DistributionList, CatalogError>,
    failed: &mut Vec<String>,
) -> Result<DistributionList, CatalogError> {
    match result {
        Ok(list) => Ok(list),
        Err(e @ CatalogError::Connection { .. }) => Err(e),
        Err(e) => {
            warn!("Skipping distribution: {}", e);
            if let Some(label) = e.label() {
                failed.push(label.to_string());
            }
            Ok(DistributionList::new())
        }
    }
}
