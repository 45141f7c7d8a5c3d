use std::path::PathBuf;
use thiserror::Error;

use crate::db::models::{CatalogRow, StringRecord};

/// Errors raised while talking to a catalog store
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The catalog file could not be opened. Fatal for everything that
    /// wanted to read from it.
    #[error("Unable to open catalog {}: {source}", path.display())]
    Connection {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },
    /// One named query failed against an otherwise healthy store
    #[error("Query {label} failed: {source}")]
    Query {
        label: String,
        #[source]
        source: sqlx::Error,
    },
    /// A result row did not have the shape the query's converter expects.
    /// No partial result accompanies this error.
    #[error("Query {label} returned an unusable row: {source}")]
    RowConversion {
        label: String,
        #[source]
        source: ConversionError,
    },
}

impl CatalogError {
    pub fn query(label: &str, source: sqlx::Error) -> Self {
        CatalogError::Query {
            label: label.to_string(),
            source,
        }
    }

    pub fn row_conversion(label: &str, source: ConversionError) -> Self {
        CatalogError::RowConversion {
            label: label.to_string(),
            source,
        }
    }

    /// Label of the query that failed, if the error is tied to one
    pub fn label(&self) -> Option<&str> {
        match self {
            CatalogError::Connection { .. } => None,
            CatalogError::Query { label, .. } | CatalogError::RowConversion { label, .. } => {
                Some(label)
            }
        }
    }
}

/// Errors raised while turning one result row into a typed value
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("column {0} is missing")]
    MissingColumn(usize),
    #[error("column {column}: expected {expected}, found {found}")]
    UnexpectedType {
        column: usize,
        expected: &'static str,
        found: &'static str,
    },
    #[error("column {column}: {value:?} is not a number")]
    InvalidNumber { column: usize, value: String },
    #[error("column {column}: count {count} is negative")]
    NegativeCount { column: usize, count: i64 },
    #[error("column {column}: {message}")]
    Decode { column: usize, message: String },
}

/// Read access to a photo catalog (allows mocking for tests)
///
/// Implementations run literal SQL and return owned rows. Whatever cursor a
/// store opens must not outlive the call that opened it.
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    /// Run `sql` and return every row in the order the query produced them
    async fn query(&self, label: &str, sql: &str) -> Result<Vec<CatalogRow>, CatalogError>;

    /// Run `sql` and return every row as a column-name to string map
    async fn query_string_map(
        &self,
        label: &str,
        sql: &str,
    ) -> Result<Vec<StringRecord>, CatalogError>;
}
