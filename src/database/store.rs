//! The warehouse capability boundary: run a query, get back rows.
//!
//! Everything the mapping core needs from the warehouse is behind this trait
//! so resolvers and fetchers can be exercised against an in-memory fake.

use async_trait::async_trait;

use crate::error::DwhResult;
use crate::models::{ColumnRule, ResultRow, TableIdentity};

/// Read operations the mapping core consumes from the configuration/data
/// store. All operations are parameterized reads; nothing here mutates.
#[async_trait]
pub trait WarehouseStore: Send + Sync {
    /// Union of the warehouse-table registry (active rows, joined to their
    /// link-code process names) and the fallback table-field registry.
    async fn list_table_identities(&self) -> DwhResult<Vec<TableIdentity>>;

    /// Candidate lot-info tables from the fallback registry, in a stable
    /// order so the lot scan is deterministic for a fixed snapshot.
    async fn list_lot_info_candidate_tables(&self) -> DwhResult<Vec<String>>;

    /// Existence probe: does `table` hold any row for this lot number?
    async fn table_contains_lot(&self, table: &str, lotno: &str) -> DwhResult<bool>;

    /// All rows of `table` matching the lot number, raw and unprojected.
    async fn fetch_table_rows(&self, table: &str, lotno: &str) -> DwhResult<Vec<ResultRow>>;

    /// Bounded sample of `table`, optionally filtered by lot number. Used by
    /// the free-query path.
    async fn fetch_sample_rows(
        &self,
        table: &str,
        lotno: Option<&str>,
        limit: i64,
    ) -> DwhResult<Vec<ResultRow>>;

    /// First declared `product` value of `table`, if the column has rows.
    async fn first_product(&self, table: &str) -> DwhResult<Option<String>>;

    /// Exact registry lookup for one table name.
    async fn find_table_identity(&self, table: &str) -> DwhResult<Option<TableIdentity>>;

    /// Distinct table names registered under exactly this product code and
    /// department, in a stable order.
    async fn list_process_tables(
        &self,
        product_code: &str,
        department: &str,
    ) -> DwhResult<Vec<String>>;

    /// Registry rows for a product code. Deliberately ignores department:
    /// the lot resolver's product join picks the first row (see DESIGN.md).
    async fn list_identities_for_product(
        &self,
        product_code: &str,
    ) -> DwhResult<Vec<TableIdentity>>;

    /// Column rules for one table family whose defect classification equals
    /// `defect`. Callers invert the flag to build exclusion sets.
    async fn list_column_rules(
        &self,
        product_code: &str,
        process_code: &str,
        department: &str,
        defect: bool,
    ) -> DwhResult<Vec<ColumnRule>>;
}
