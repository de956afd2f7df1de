//! Row Fetcher: rows for one lot from one table, optionally projected
//! through the configured column view.

use std::sync::Arc;

use crate::database::WarehouseStore;
use crate::error::DwhResult;
use crate::mapping::ColumnProjector;
use crate::models::ResultRow;

pub struct RowFetcher {
    store: Arc<dyn WarehouseStore>,
    projector: ColumnProjector,
}

impl RowFetcher {
    pub fn new(store: Arc<dyn WarehouseStore>) -> Self {
        Self {
            projector: ColumnProjector::new(store.clone()),
            store,
        }
    }

    /// Fetch all rows of `table_name` matching `lotno`.
    ///
    /// `want_defect` of `None` is the plain fetch path: raw rows,
    /// unfiltered. `Some(flag)` applies the computed exclusion and rename
    /// for the requested view. Empty table name or lot number, or a table
    /// missing from the warehouse registry, yields an empty result rather
    /// than an error.
    pub async fn fetch_rows(
        &self,
        table_name: &str,
        lotno: &str,
        want_defect: Option<bool>,
    ) -> DwhResult<Vec<ResultRow>> {
        if table_name.is_empty() || lotno.is_empty() {
            return Ok(Vec::new());
        }

        let Some(identity) = self.store.find_table_identity(table_name).await? else {
            return Ok(Vec::new());
        };

        let rows = self.store.fetch_table_rows(table_name, lotno).await?;

        match want_defect {
            None => Ok(rows),
            Some(flag) => {
                let projection = self.projector.compute_projection(&identity, flag).await?;
                Ok(projection.apply_all(&rows))
            }
        }
    }
}
