use futures::TryStreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::db::models::{CatalogRow, CatalogValue, StringRecord};
use crate::db::store::{CatalogError, CatalogStore, ConversionError};

/// SQLite-backed catalog store
///
/// Catalogs are opened read-only and never created: a missing file is a
/// connection error, not an empty catalog. So is a file that exists but is
/// not a readable SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
    path: PathBuf,
}

impl SqliteCatalog {
    /// Open a catalog file read-only
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref().to_path_buf();
        info!("Opening catalog {}", path.display());

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .read_only(true)
            .create_if_missing(false);

        // One connection: queries run one after another and never overlap
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|source| CatalogError::Connection {
                path: path.clone(),
                source,
            })?;

        // SQLite only reads the file header on the first statement
        if let Err(source) = sqlx::query(SCHEMA_CHECK_QUERY).fetch_one(&pool).await {
            pool.close().await;
            return Err(CatalogError::Connection { path, source });
        }

        Ok(SqliteCatalog { pool, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the underlying pool
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Classify a failed statement. Failures of the store itself abort the
    /// caller; everything else belongs to the one query.
    fn query_error(&self, label: &str, source: sqlx::Error) -> CatalogError {
        if is_connection_error(&source) {
            CatalogError::Connection {
                path: self.path.clone(),
                source,
            }
        } else {
            CatalogError::query(label, source)
        }
    }
}

const SCHEMA_CHECK_QUERY: &str = "SELECT count(*) FROM sqlite_master";

// Primary SQLite result codes
const SQLITE_CORRUPT: i32 = 11;
const SQLITE_CANTOPEN: i32 = 14;
const SQLITE_NOTADB: i32 = 26;

fn is_connection_error(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Io(_) | sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db) => db
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .map(|code| matches!(code & 0xff, SQLITE_CORRUPT | SQLITE_CANTOPEN | SQLITE_NOTADB))
            .unwrap_or(false),
        _ => false,
    }
}

#[async_trait::async_trait]
impl CatalogStore for SqliteCatalog {
    async fn query(&self, label: &str, sql: &str) -> Result<Vec<CatalogRow>, CatalogError> {
        debug!(label, "Executing catalog query");

        // The cursor is dropped on every return path below
        let mut cursor = sqlx::query(sql).fetch(&self.pool);
        let mut rows = Vec::new();

        while let Some(row) = cursor
            .try_next()
            .await
            .map_err(|e| self.query_error(label, e))?
        {
            let decoded = decode_row(&row).map_err(|e| CatalogError::row_conversion(label, e))?;
            rows.push(decoded);
        }

        debug!(label, rows = rows.len(), "Catalog query complete");
        Ok(rows)
    }

    async fn query_string_map(
        &self,
        label: &str,
        sql: &str,
    ) -> Result<Vec<StringRecord>, CatalogError> {
        debug!(label, "Executing catalog string-map query");

        let mut cursor = sqlx::query(sql).fetch(&self.pool);
        let mut records = Vec::new();

        while let Some(row) = cursor
            .try_next()
            .await
            .map_err(|e| self.query_error(label, e))?
        {
            let mut record = StringRecord::new();
            for column in row.columns() {
                let value = decode_value(&row, column.ordinal())
                    .map_err(|e| CatalogError::row_conversion(label, e))?;
                record.insert(column.name().to_string(), value.render());
            }
            records.push(record);
        }

        debug!(label, rows = records.len(), "Catalog string-map query complete");
        Ok(records)
    }
}

fn decode_row(row: &SqliteRow) -> Result<CatalogRow, ConversionError> {
    let mut values = Vec::with_capacity(row.len());
    for index in 0..row.len() {
        values.push(decode_value(row, index)?);
    }
    Ok(CatalogRow::new(values))
}

/// Decode one column by the storage class of the value actually stored,
/// not the declared column type (SQLite columns are dynamically typed)
fn decode_value(row: &SqliteRow, index: usize) -> Result<CatalogValue, ConversionError> {
    let storage_class = {
        let raw = row
            .try_get_raw(index)
            .map_err(|_| ConversionError::MissingColumn(index))?;
        if raw.is_null() {
            return Ok(CatalogValue::Null);
        }
        raw.type_info().name().to_string()
    };

    let decode_err = |e: sqlx::Error| ConversionError::Decode {
        column: index,
        message: e.to_string(),
    };

    let value = match storage_class.as_str() {
        "INTEGER" | "BOOLEAN" => {
            CatalogValue::Integer(row.try_get_unchecked::<i64, _>(index).map_err(decode_err)?)
        }
        "REAL" | "NUMERIC" => {
            CatalogValue::Real(row.try_get_unchecked::<f64, _>(index).map_err(decode_err)?)
        }
        "TEXT" | "DATE" | "TIME" | "DATETIME" => {
            CatalogValue::Text(row.try_get_unchecked::<String, _>(index).map_err(decode_err)?)
        }
        "BLOB" => {
            CatalogValue::Blob(row.try_get_unchecked::<Vec<u8>, _>(index).map_err(decode_err)?)
        }
        other => {
            return Err(ConversionError::Decode {
                column: index,
                message: format!("unsupported storage class {}", other),
            })
        }
    };

    Ok(value)
}
