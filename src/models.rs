//! Shared value types for the DWH agent core.
//!
//! `TableIdentity` and `ColumnRule` mirror read-only configuration rows;
//! `LotMapping` is the per-request value object passed between resolver,
//! projector and fetcher. Result rows are ordered dynamic mappings because
//! every warehouse table has its own schema.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

/// Identity of one warehouse table as registered in configuration.
///
/// `table_name` is the natural key, normalized to upper case. The process
/// dimension is absent for tables that only exist in the fallback
/// table-field registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableIdentity {
    pub table_name: String,
    pub department: Option<String>,
    pub product_code: Option<String>,
    pub process_code: Option<String>,
    pub process_name: Option<String>,
}

/// Result of resolving a lot number to a table identity.
///
/// All identity fields are `None` (and `table_name` empty) when no table
/// contains the lot or the input lot number was empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LotMapping {
    pub lotno: String,
    pub table_name: String,
    pub department: Option<String>,
    pub product_code: Option<String>,
    pub process_code: Option<String>,
    pub process_name: Option<String>,
}

impl LotMapping {
    /// Mapping for a lot number that resolved to nothing.
    pub fn unresolved(lotno: impl Into<String>) -> Self {
        Self {
            lotno: lotno.into(),
            ..Self::default()
        }
    }
}

/// One link-code configuration row: a physical column of one table family,
/// its user-facing view name and its defect classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRule {
    pub product_code: String,
    pub department: String,
    pub process_code: String,
    /// Physical column key, matched case-insensitively.
    pub column: String,
    /// Display name substituted for `column` in presentation rows.
    pub view_name: String,
    pub is_defect: bool,
}

/// A single cell value decoded from a warehouse row.
///
/// Schemas vary per table, so cells carry a tagged union rather than a fixed
/// record type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Uuid(Uuid),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Json(serde_json::Value),
}

/// One presentation-ready row: column name to value, in source column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultRow {
    columns: Vec<(String, CellValue)>,
}

impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl ResultRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: CellValue) {
        self.columns.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&CellValue> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn contains_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, CellValue)> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl FromIterator<(String, CellValue)> for ResultRow {
    fn from_iter<I: IntoIterator<Item = (String, CellValue)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// Envelope returned by every exposed tool operation.
///
/// `success = false` with empty content means "no usable input or no match",
/// not a crash; collaborator failures are converted before reaching here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse<T> {
    pub success: bool,
    pub content: T,
}

impl<T> ToolResponse<T> {
    pub fn ok(content: T) -> Self {
        Self {
            success: true,
            content,
        }
    }

    pub fn failed(content: T) -> Self {
        Self {
            success: false,
            content,
        }
    }
}

impl<T: Default> ToolResponse<T> {
    /// Failure with empty content, the standard missing-input/no-match shape.
    pub fn empty_failure() -> Self {
        Self::failed(T::default())
    }
}
