mod adapter;
mod queries;
mod stats;

pub use adapter::{
    query_distribution, ApertureCount, ExposureTimeCount, LabeledCount, RowConverter,
};
pub use queries::*;
pub use stats::CatalogStats;
