use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::db::store::ConversionError;

/// A row rendered as column name -> display string
pub type StringRecord = BTreeMap<String, String>;

/// A single column value as SQLite stored it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CatalogValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl CatalogValue {
    /// SQLite storage class name
    pub fn type_name(&self) -> &'static str {
        match self {
            CatalogValue::Null => "NULL",
            CatalogValue::Integer(_) => "INTEGER",
            CatalogValue::Real(_) => "REAL",
            CatalogValue::Text(_) => "TEXT",
            CatalogValue::Blob(_) => "BLOB",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CatalogValue::Null)
    }

    /// String form used by string-map queries
    ///
    /// NULL renders empty and numbers use their shortest decimal form
    /// (`50`, `35.5`).
    pub fn render(&self) -> String {
        match self {
            CatalogValue::Null => String::new(),
            CatalogValue::Integer(v) => v.to_string(),
            CatalogValue::Real(v) => v.to_string(),
            CatalogValue::Text(v) => v.clone(),
            CatalogValue::Blob(v) => String::from_utf8_lossy(v).into_owned(),
        }
    }
}

/// One result row, values in select-list order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogRow(Vec<CatalogValue>);

impl CatalogRow {
    pub fn new(values: Vec<CatalogValue>) -> Self {
        CatalogRow(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[CatalogValue] {
        &self.0
    }

    pub fn get(&self, column: usize) -> Result<&CatalogValue, ConversionError> {
        self.0
            .get(column)
            .ok_or(ConversionError::MissingColumn(column))
    }

    /// Read an integer column. Integral reals and numeric text are accepted.
    pub fn i64(&self, column: usize) -> Result<i64, ConversionError> {
        match self.get(column)? {
            CatalogValue::Integer(v) => Ok(*v),
            CatalogValue::Real(v) if v.fract() == 0.0 && v.is_finite() => Ok(*v as i64),
            CatalogValue::Text(s) => s.trim().parse().map_err(|_| ConversionError::InvalidNumber {
                column,
                value: s.clone(),
            }),
            other => Err(ConversionError::UnexpectedType {
                column,
                expected: "INTEGER",
                found: other.type_name(),
            }),
        }
    }

    /// Read a floating point column. Integers and numeric text are accepted.
    pub fn f64(&self, column: usize) -> Result<f64, ConversionError> {
        match self.get(column)? {
            CatalogValue::Integer(v) => Ok(*v as f64),
            CatalogValue::Real(v) => Ok(*v),
            CatalogValue::Text(s) => s.trim().parse().map_err(|_| ConversionError::InvalidNumber {
                column,
                value: s.clone(),
            }),
            other => Err(ConversionError::UnexpectedType {
                column,
                expected: "REAL",
                found: other.type_name(),
            }),
        }
    }

    /// Read a column as a label. NULL becomes the empty string.
    pub fn label(&self, column: usize) -> Result<String, ConversionError> {
        match self.get(column)? {
            CatalogValue::Blob(_) => Err(ConversionError::UnexpectedType {
                column,
                expected: "TEXT",
                found: "BLOB",
            }),
            other => Ok(other.render()),
        }
    }

    /// Read a non-negative count column
    pub fn count(&self, column: usize) -> Result<i64, ConversionError> {
        let count = self.i64(column)?;
        if count < 0 {
            return Err(ConversionError::NegativeCount { column, count });
        }
        Ok(count)
    }
}

impl From<Vec<CatalogValue>> for CatalogRow {
    fn from(values: Vec<CatalogValue>) -> Self {
        CatalogRow(values)
    }
}

/// A photo in the catalog, as the preview workflow sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRecord {
    /// `Adobe_images.id_local`
    pub id: i64,
    /// `Adobe_images.id_global`, a UUID string
    pub global_id: String,
    /// File name without extension, used to name extracted previews
    pub base_name: String,
}
