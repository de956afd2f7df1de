//! Aggregator: fan one lot number out across a list of process tables.
//!
//! Fetches run concurrently under a semaphore and a per-query timeout, and
//! results land in a position-indexed slot vector, so completion order never
//! changes output order and a failing table never aborts the whole call.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

use crate::database::WarehouseStore;
use crate::error::DwhError;
use crate::models::ResultRow;
use crate::retrieval::RowFetcher;

/// Fan-out limits for the aggregator.
#[derive(Debug, Clone)]
pub struct AggregateConfig {
    pub max_concurrent_fetches: usize,
    pub query_timeout: Duration,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: std::env::var("DWH_MAX_CONCURRENT_FETCHES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            query_timeout: Duration::from_secs(
                std::env::var("DWH_QUERY_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }
}

/// One aggregation slot: the rows of one table, or the error that kept them
/// empty. Slot order mirrors the caller's table list.
#[derive(Debug, Clone, Serialize)]
pub struct TableRows {
    pub table_name: String,
    pub rows: Vec<ResultRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TableRows {
    fn ok(table_name: String, rows: Vec<ResultRow>) -> Self {
        Self {
            table_name,
            rows,
            error: None,
        }
    }

    fn failed(table_name: String, error: String) -> Self {
        Self {
            table_name,
            rows: Vec::new(),
            error: Some(error),
        }
    }
}

pub struct LotAggregator {
    store: Arc<dyn WarehouseStore>,
    config: AggregateConfig,
}

impl LotAggregator {
    pub fn new(store: Arc<dyn WarehouseStore>) -> Self {
        Self::with_config(store, AggregateConfig::default())
    }

    pub fn with_config(store: Arc<dyn WarehouseStore>, config: AggregateConfig) -> Self {
        Self { store, config }
    }

    /// Fetch `lotno` from every table in `table_names`, in input order.
    /// Every input table gets exactly one output slot; zero-row and failed
    /// tables contribute empty slots (the latter with the error recorded).
    pub async fn aggregate(
        &self,
        table_names: &[String],
        lotno: &str,
        want_defect: bool,
    ) -> Vec<TableRows> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_fetches.max(1)));
        let mut join_set = JoinSet::new();

        for (position, table) in table_names.iter().enumerate() {
            let store = self.store.clone();
            let semaphore = semaphore.clone();
            let table = table.clone();
            let lotno = lotno.to_string();
            let timeout = self.config.query_timeout;

            join_set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (
                            position,
                            TableRows::failed(table, "fetch pool closed".to_string()),
                        )
                    }
                };

                let fetcher = RowFetcher::new(store);
                let outcome =
                    tokio::time::timeout(timeout, fetcher.fetch_rows(&table, &lotno, Some(want_defect)))
                        .await;

                let slot = match outcome {
                    Ok(Ok(rows)) => TableRows::ok(table, rows),
                    Ok(Err(err)) => {
                        warn!(table = %table, lotno = %lotno, error = %err, "table fetch failed");
                        TableRows::failed(table, err.to_string())
                    }
                    Err(_) => {
                        let err = DwhError::QueryTimeout {
                            table: table.clone(),
                            timeout_ms: timeout.as_millis() as u64,
                        };
                        warn!(table = %table, lotno = %lotno, "table fetch timed out");
                        TableRows::failed(table, err.to_string())
                    }
                };
                (position, slot)
            });
        }

        let mut slots: Vec<Option<TableRows>> = table_names.iter().map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((position, slot)) => slots[position] = Some(slot),
                Err(join_err) => warn!(error = %join_err, "aggregation task aborted"),
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(position, slot)| {
                slot.unwrap_or_else(|| {
                    TableRows::failed(
                        table_names[position].clone(),
                        "fetch task aborted".to_string(),
                    )
                })
            })
            .collect()
    }
}
