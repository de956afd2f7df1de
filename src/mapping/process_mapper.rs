//! Process Set Resolver: all tables sharing a (product, department) identity.

use std::sync::Arc;

use crate::database::WarehouseStore;
use crate::error::DwhResult;

pub struct ProcessMapper {
    store: Arc<dyn WarehouseStore>,
}

impl ProcessMapper {
    pub fn new(store: Arc<dyn WarehouseStore>) -> Self {
        Self { store }
    }

    /// Distinct table names registered under exactly this product code and
    /// department. Either argument empty means an empty set, not an error.
    pub async fn resolve_process_set(
        &self,
        product_code: &str,
        department: &str,
    ) -> DwhResult<Vec<String>> {
        if product_code.is_empty() || department.is_empty() {
            return Ok(Vec::new());
        }
        self.store
            .list_process_tables(product_code, department)
            .await
    }
}
