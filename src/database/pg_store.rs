//! Postgres implementation of the warehouse store.
//!
//! Configuration lookups bind every value as a query parameter. Data tables
//! are addressed by dynamic identifiers, which cannot be parameterized, so
//! each table name passes a two-step guard first: a plain-identifier check
//! and an allow-list probe against the configuration registry. Validated
//! names are lower-cased and double-quoted: the registry stores upper-cased
//! names while the physical tables live in lower case.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Column, PgPool, Row, TypeInfo};
use tracing::{debug, warn};

use crate::error::{DwhError, DwhResult};
use crate::models::{CellValue, ColumnRule, ResultRow, TableIdentity};

use super::store::WarehouseStore;

const SPECIAL_TYPE_DEFECTIVE: &str = "Defective";

#[derive(Clone)]
pub struct PgWarehouseStore {
    pool: PgPool,
}

impl PgWarehouseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Validate a dynamic table name and return the quoted form safe to
    /// splice into query text.
    async fn checked_table_ident(&self, table: &str) -> DwhResult<String> {
        if !is_plain_identifier(table) {
            return Err(DwhError::invalid_identifier(
                table,
                "not a plain SQL identifier",
            ));
        }

        let allowed: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM config_warehouse_table
                WHERE upper(table_name) = upper($1) AND is_active = 1
            )
            OR EXISTS(
                SELECT 1 FROM config_table_field
                WHERE upper(target_table_name) = upper($1)
            )
            "#,
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await?;

        if !allowed {
            warn!(table, "rejected table name not present in configuration registry");
            return Err(DwhError::invalid_identifier(
                table,
                "not registered in configuration",
            ));
        }

        Ok(format!("\"{}\"", table.to_ascii_lowercase()))
    }
}

#[async_trait]
impl WarehouseStore for PgWarehouseStore {
    async fn list_table_identities(&self) -> DwhResult<Vec<TableIdentity>> {
        let rows = sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT DISTINCT
                t1.table_name, t1.department, t1.product_code, t1.process_code,
                t2.dg_process_name AS process_name
            FROM config_warehouse_table t1
            LEFT JOIN config_link_code t2
                ON t1.product_code = t2.product_subgroup
                AND t1.process_code = t2.dg_process_code
            WHERE t1.is_active = 1
            UNION
            SELECT DISTINCT
                upper(target_table_name) AS table_name, department,
                upper(split_part(lower(target_table_name), '_lot_info', 1)) AS product_code,
                NULL AS process_code, NULL AS process_name
            FROM config_table_field
            WHERE target_table_name IS NOT NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(IdentityRow::into_identity).collect())
    }

    async fn list_lot_info_candidate_tables(&self) -> DwhResult<Vec<String>> {
        let tables: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT upper(target_table_name) AS table_name
            FROM config_table_field
            WHERE target_table_name IS NOT NULL
            ORDER BY table_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(tables)
    }

    async fn table_contains_lot(&self, table: &str, lotno: &str) -> DwhResult<bool> {
        let ident = self.checked_table_ident(table).await?;
        let found: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM {ident} WHERE lotno = $1)"
        ))
        .bind(lotno)
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }

    async fn fetch_table_rows(&self, table: &str, lotno: &str) -> DwhResult<Vec<ResultRow>> {
        let ident = self.checked_table_ident(table).await?;
        let rows = sqlx::query(&format!("SELECT * FROM {ident} WHERE lotno = $1"))
            .bind(lotno)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(decode_row).collect())
    }

    async fn fetch_sample_rows(
        &self,
        table: &str,
        lotno: Option<&str>,
        limit: i64,
    ) -> DwhResult<Vec<ResultRow>> {
        let ident = self.checked_table_ident(table).await?;
        let rows = match lotno {
            Some(lotno) => {
                sqlx::query(&format!(
                    "SELECT * FROM {ident} WHERE lotno = $1 LIMIT $2"
                ))
                .bind(lotno)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!("SELECT * FROM {ident} LIMIT $1"))
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows.iter().map(decode_row).collect())
    }

    async fn first_product(&self, table: &str) -> DwhResult<Option<String>> {
        let ident = self.checked_table_ident(table).await?;
        let product: Option<Option<String>> = sqlx::query_scalar(&format!(
            "SELECT DISTINCT product FROM {ident} LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(product.flatten())
    }

    async fn find_table_identity(&self, table: &str) -> DwhResult<Option<TableIdentity>> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT table_name, department, product_code, process_code,
                   CAST(NULL AS text) AS process_name
            FROM config_warehouse_table
            WHERE table_name = $1
            LIMIT 1
            "#,
        )
        .bind(table)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(IdentityRow::into_identity))
    }

    async fn list_process_tables(
        &self,
        product_code: &str,
        department: &str,
    ) -> DwhResult<Vec<String>> {
        let tables: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT table_name
            FROM config_warehouse_table
            WHERE product_code = $1
              AND department = $2
            ORDER BY table_name
            "#,
        )
        .bind(product_code)
        .bind(department)
        .fetch_all(&self.pool)
        .await?;
        Ok(tables)
    }

    async fn list_identities_for_product(
        &self,
        product_code: &str,
    ) -> DwhResult<Vec<TableIdentity>> {
        let rows = sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT DISTINCT
                t1.table_name, t1.department, t1.product_code, t1.process_code,
                t2.dg_process_name AS process_name
            FROM config_warehouse_table t1
            LEFT JOIN config_link_code t2 ON t1.process_code = t2.dg_process_code
            WHERE t1.is_active = 1 AND t1.product_code = $1
            ORDER BY t1.table_name
            "#,
        )
        .bind(product_code)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(IdentityRow::into_identity).collect())
    }

    async fn list_column_rules(
        &self,
        product_code: &str,
        process_code: &str,
        department: &str,
        defect: bool,
    ) -> DwhResult<Vec<ColumnRule>> {
        // <> drops rows with a NULL special type (three-valued comparison).
        // Untagged columns never become rules.
        let comparison = if defect { "=" } else { "<>" };
        let rows = sqlx::query_as::<_, LinkCodeRow>(&format!(
            r#"
            SELECT product_subgroup, dg_department, dg_process_code,
                   link_code_main, view_column, special_data_type
            FROM config_link_code
            WHERE product_subgroup = $1
              AND dg_process_code = $2
              AND dg_department = $3
              AND special_data_type {comparison} $4
            "#
        ))
        .bind(product_code)
        .bind(process_code)
        .bind(department)
        .bind(SPECIAL_TYPE_DEFECTIVE)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().filter_map(LinkCodeRow::into_rule).collect())
    }
}

#[derive(sqlx::FromRow)]
struct IdentityRow {
    table_name: String,
    department: Option<String>,
    product_code: Option<String>,
    process_code: Option<String>,
    process_name: Option<String>,
}

impl IdentityRow {
    fn into_identity(self) -> TableIdentity {
        TableIdentity {
            table_name: self.table_name,
            department: self.department,
            product_code: self.product_code,
            process_code: self.process_code,
            process_name: self.process_name,
        }
    }
}

#[derive(sqlx::FromRow)]
struct LinkCodeRow {
    product_subgroup: Option<String>,
    dg_department: Option<String>,
    dg_process_code: Option<String>,
    link_code_main: Option<String>,
    view_column: Option<String>,
    special_data_type: Option<String>,
}

impl LinkCodeRow {
    fn into_rule(self) -> Option<ColumnRule> {
        let column = self.link_code_main?;
        Some(ColumnRule {
            product_code: self.product_subgroup.unwrap_or_default(),
            department: self.dg_department.unwrap_or_default(),
            process_code: self.dg_process_code.unwrap_or_default(),
            view_name: self.view_column.unwrap_or_else(|| column.clone()),
            is_defect: self.special_data_type.as_deref() == Some(SPECIAL_TYPE_DEFECTIVE),
            column,
        })
    }
}

/// Decode one dynamic-schema row into an ordered column map.
fn decode_row(row: &PgRow) -> ResultRow {
    let mut out = ResultRow::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let name = column.name().to_string();
        let value = decode_cell(row, idx, column.type_info().name());
        out.push(name, value);
    }
    out
}

fn decode_cell(row: &PgRow, idx: usize, type_name: &str) -> CellValue {
    fn opt<T>(decoded: Result<Option<T>, sqlx::Error>, wrap: impl FnOnce(T) -> CellValue) -> Option<CellValue> {
        match decoded {
            Ok(Some(v)) => Some(wrap(v)),
            Ok(None) => Some(CellValue::Null),
            Err(_) => None,
        }
    }

    let decoded = match type_name {
        "BOOL" => opt(row.try_get::<Option<bool>, _>(idx), CellValue::Bool),
        "INT2" => opt(row.try_get::<Option<i16>, _>(idx), |v| {
            CellValue::Int(v as i64)
        }),
        "INT4" => opt(row.try_get::<Option<i32>, _>(idx), |v| {
            CellValue::Int(v as i64)
        }),
        "INT8" => opt(row.try_get::<Option<i64>, _>(idx), CellValue::Int),
        "FLOAT4" => opt(row.try_get::<Option<f32>, _>(idx), |v| {
            CellValue::Float(v as f64)
        }),
        "FLOAT8" => opt(row.try_get::<Option<f64>, _>(idx), CellValue::Float),
        "NUMERIC" => opt(
            row.try_get::<Option<rust_decimal::Decimal>, _>(idx),
            CellValue::Decimal,
        ),
        "UUID" => opt(row.try_get::<Option<uuid::Uuid>, _>(idx), CellValue::Uuid),
        "DATE" => opt(
            row.try_get::<Option<chrono::NaiveDate>, _>(idx),
            CellValue::Date,
        ),
        "TIMESTAMP" => opt(
            row.try_get::<Option<chrono::NaiveDateTime>, _>(idx),
            CellValue::Timestamp,
        ),
        "TIMESTAMPTZ" => opt(
            row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx),
            CellValue::TimestampTz,
        ),
        "JSON" | "JSONB" => opt(
            row.try_get::<Option<serde_json::Value>, _>(idx),
            CellValue::Json,
        ),
        _ => opt(row.try_get::<Option<String>, _>(idx), CellValue::Text),
    };

    decoded.unwrap_or_else(|| {
        debug!(type_name, "could not decode column value, emitting null");
        CellValue::Null
    })
}

/// True for names consisting of an ASCII letter or underscore followed by
/// letters, digits or underscores. Anything else never reaches query text.
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
