mod client;
mod models;
mod store;

pub use client::SqliteCatalog;
pub use models::{CatalogRow, CatalogValue, PhotoRecord, StringRecord};
pub use store::{CatalogError, CatalogStore, ConversionError};
