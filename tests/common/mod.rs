//! In-memory warehouse store for exercising the mapping core without a
//! database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use dwh_agent::database::WarehouseStore;
use dwh_agent::error::{DwhError, DwhResult};
use dwh_agent::models::{CellValue, ColumnRule, ResultRow, TableIdentity};

/// Configurable fake store. Populate the public fields, wrap in an `Arc`,
/// and hand it to the components under test.
#[derive(Default)]
pub struct MockWarehouseStore {
    /// Warehouse registry rows (with process dimension).
    pub identities: Vec<TableIdentity>,
    /// Fallback registry rows (no process dimension).
    pub fallback_identities: Vec<TableIdentity>,
    /// Candidate lot-info tables, in scan order.
    pub candidate_tables: Vec<String>,
    /// Declared product per data table.
    pub products: HashMap<String, String>,
    /// Data rows per table. Rows carry a `lotno` text column.
    pub rows: HashMap<String, Vec<ResultRow>>,
    /// Link-code rules.
    pub rules: Vec<ColumnRule>,
    /// Tables whose data fetches fail with a store error.
    pub failing_tables: Vec<String>,
    /// Artificial latency per data table, to exercise completion-order and
    /// timeout behavior.
    pub delays: HashMap<String, Duration>,
    /// Number of store calls served, for "performs no queries" assertions.
    pub query_count: AtomicUsize,
}

impl MockWarehouseStore {
    pub fn queries_served(&self) -> usize {
        self.query_count.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.query_count.fetch_add(1, Ordering::SeqCst);
    }

    async fn simulate_table_access(&self, table: &str) -> DwhResult<()> {
        if let Some(delay) = self.delays.get(table) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing_tables.iter().any(|t| t == table) {
            return Err(DwhError::Store(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn table_rows(&self, table: &str, lotno: &str) -> Vec<ResultRow> {
        self.rows
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| row.get("lotno") == Some(&CellValue::Text(lotno.to_string())))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl WarehouseStore for MockWarehouseStore {
    async fn list_table_identities(&self) -> DwhResult<Vec<TableIdentity>> {
        self.tick();
        let mut all = self.identities.clone();
        all.extend(self.fallback_identities.clone());
        Ok(all)
    }

    async fn list_lot_info_candidate_tables(&self) -> DwhResult<Vec<String>> {
        self.tick();
        Ok(self.candidate_tables.clone())
    }

    async fn table_contains_lot(&self, table: &str, lotno: &str) -> DwhResult<bool> {
        self.tick();
        self.simulate_table_access(table).await?;
        Ok(!self.table_rows(table, lotno).is_empty())
    }

    async fn fetch_table_rows(&self, table: &str, lotno: &str) -> DwhResult<Vec<ResultRow>> {
        self.tick();
        self.simulate_table_access(table).await?;
        Ok(self.table_rows(table, lotno))
    }

    async fn fetch_sample_rows(
        &self,
        table: &str,
        lotno: Option<&str>,
        limit: i64,
    ) -> DwhResult<Vec<ResultRow>> {
        self.tick();
        self.simulate_table_access(table).await?;
        let rows = match lotno {
            Some(lotno) => self.table_rows(table, lotno),
            None => self.rows.get(table).cloned().unwrap_or_default(),
        };
        Ok(rows.into_iter().take(limit as usize).collect())
    }

    async fn first_product(&self, table: &str) -> DwhResult<Option<String>> {
        self.tick();
        self.simulate_table_access(table).await?;
        Ok(self.products.get(table).cloned())
    }

    async fn find_table_identity(&self, table: &str) -> DwhResult<Option<TableIdentity>> {
        self.tick();
        Ok(self
            .identities
            .iter()
            .find(|identity| identity.table_name == table)
            .cloned())
    }

    async fn list_process_tables(
        &self,
        product_code: &str,
        department: &str,
    ) -> DwhResult<Vec<String>> {
        self.tick();
        let mut tables: Vec<String> = self
            .identities
            .iter()
            .filter(|identity| {
                identity.product_code.as_deref() == Some(product_code)
                    && identity.department.as_deref() == Some(department)
            })
            .map(|identity| identity.table_name.clone())
            .collect();
        tables.sort();
        tables.dedup();
        Ok(tables)
    }

    async fn list_identities_for_product(
        &self,
        product_code: &str,
    ) -> DwhResult<Vec<TableIdentity>> {
        self.tick();
        let mut matches: Vec<TableIdentity> = self
            .identities
            .iter()
            .filter(|identity| identity.product_code.as_deref() == Some(product_code))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.table_name.cmp(&b.table_name));
        Ok(matches)
    }

    async fn list_column_rules(
        &self,
        product_code: &str,
        process_code: &str,
        department: &str,
        defect: bool,
    ) -> DwhResult<Vec<ColumnRule>> {
        self.tick();
        Ok(self
            .rules
            .iter()
            .filter(|rule| {
                rule.product_code == product_code
                    && rule.process_code == process_code
                    && rule.department == department
                    && rule.is_defect == defect
            })
            .cloned()
            .collect())
    }
}

pub fn identity(
    table_name: &str,
    department: &str,
    product_code: &str,
    process_code: &str,
    process_name: &str,
) -> TableIdentity {
    TableIdentity {
        table_name: table_name.into(),
        department: Some(department.into()),
        product_code: Some(product_code.into()),
        process_code: Some(process_code.into()),
        process_name: Some(process_name.into()),
    }
}

pub fn fallback_identity(table_name: &str, department: &str, product_code: &str) -> TableIdentity {
    TableIdentity {
        table_name: table_name.into(),
        department: Some(department.into()),
        product_code: Some(product_code.into()),
        process_code: None,
        process_name: None,
    }
}

pub fn rule(
    product_code: &str,
    department: &str,
    process_code: &str,
    column: &str,
    view_name: &str,
    is_defect: bool,
) -> ColumnRule {
    ColumnRule {
        product_code: product_code.into(),
        department: department.into(),
        process_code: process_code.into(),
        column: column.into(),
        view_name: view_name.into(),
        is_defect,
    }
}

pub fn text_row(pairs: &[(&str, &str)]) -> ResultRow {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), CellValue::Text(value.to_string())))
        .collect()
}
