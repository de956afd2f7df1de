//! Lot Resolver: find which warehouse table holds a lot number and resolve
//! that table's full identity.

use std::sync::Arc;

use tracing::{debug, info};

use crate::database::WarehouseStore;
use crate::error::{DwhError, DwhResult};
use crate::models::LotMapping;

pub struct LotResolver {
    store: Arc<dyn WarehouseStore>,
}

impl LotResolver {
    pub fn new(store: Arc<dyn WarehouseStore>) -> Self {
        Self { store }
    }

    /// Resolve a lot number to its table identity.
    ///
    /// Probes every candidate lot-info table in registry order and stops at
    /// the first one containing the lot. An empty lot number short-circuits
    /// without touching the store. A matched table whose `product` column is
    /// empty is a resolution failure, not a partial answer.
    pub async fn resolve_lot(&self, lotno: &str) -> DwhResult<LotMapping> {
        if lotno.is_empty() {
            return Ok(LotMapping::unresolved(lotno));
        }

        let candidates = self.store.list_lot_info_candidate_tables().await?;

        let mut target_table = String::new();
        for table in &candidates {
            if self.store.table_contains_lot(table, lotno).await? {
                target_table = table.clone();
                break;
            }
        }

        if target_table.is_empty() {
            debug!(lotno, "lot not found in any candidate table");
            return Ok(LotMapping::unresolved(lotno));
        }

        let product = self
            .store
            .first_product(&target_table)
            .await?
            .ok_or_else(|| {
                DwhError::resolution_failed(&target_table, "table declares no product")
            })?;

        // Joins back on product code only; department is ignored and the
        // first registry row wins (see DESIGN.md).
        let identities = self.store.list_identities_for_product(&product).await?;
        if identities.len() > 1 {
            debug!(
                lotno,
                product = %product,
                count = identities.len(),
                "product maps to multiple identity rows, taking the first"
            );
        }

        let mapping = match identities.into_iter().next() {
            Some(identity) => LotMapping {
                lotno: lotno.to_string(),
                table_name: target_table,
                department: identity.department,
                product_code: identity.product_code,
                process_code: identity.process_code,
                process_name: identity.process_name,
            },
            None => LotMapping {
                lotno: lotno.to_string(),
                table_name: target_table,
                ..LotMapping::default()
            },
        };

        info!(
            lotno,
            table = %mapping.table_name,
            product = mapping.product_code.as_deref().unwrap_or("-"),
            "resolved lot"
        );
        Ok(mapping)
    }
}
