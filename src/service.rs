//! Tool operations exposed to the surrounding service layer.
//!
//! Each operation mirrors one agent tool: it validates its loosely-typed
//! arguments, drives the mapping/retrieval components, and reports through
//! the `ToolResponse` envelope. Component errors stop here; callers see
//! `success = false` with empty content, never a raw fault.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::database::WarehouseStore;
use crate::mapping::freetext::LOTNO_NOT_FOUND;
use crate::mapping::{FreetextMapper, LotResolver, ProcessMapper};
use crate::models::{ResultRow, ToolResponse};
use crate::retrieval::{AggregateConfig, LotAggregator, TableRows};

/// Row cap for the free-query tool.
const SAMPLE_ROW_LIMIT: i64 = 5;

/// Loosely-typed arguments forwarded by the LLM client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolArguments {
    #[serde(default)]
    pub mapping_data: Option<MappingData>,
    #[serde(default)]
    pub table_list: Option<Vec<String>>,
}

/// The subset of mapping fields tools read back from the client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MappingData {
    #[serde(default)]
    pub lotno: Option<String>,
    #[serde(default)]
    pub table_name: Option<String>,
}

pub struct AgentToolkit {
    lot_resolver: LotResolver,
    process_mapper: ProcessMapper,
    freetext: FreetextMapper,
    aggregator: LotAggregator,
    store: Arc<dyn WarehouseStore>,
}

impl AgentToolkit {
    pub fn new(store: Arc<dyn WarehouseStore>) -> Self {
        Self::with_aggregate_config(store, AggregateConfig::default())
    }

    pub fn with_aggregate_config(store: Arc<dyn WarehouseStore>, config: AggregateConfig) -> Self {
        Self {
            lot_resolver: LotResolver::new(store.clone()),
            process_mapper: ProcessMapper::new(store.clone()),
            freetext: FreetextMapper::new(store.clone()),
            aggregator: LotAggregator::with_config(store.clone(), config),
            store,
        }
    }

    /// Map a free-text description to identity fields and a lot number.
    pub async fn mapping_info(&self, chat_input: Option<&str>) -> ToolResponse<Value> {
        let Some(text) = non_empty(chat_input) else {
            return ToolResponse::failed(Value::String(
                "No mapping prompt provided, please tell user to try again.".to_string(),
            ));
        };

        info!(tool = "mapping_info", "tool invoked");
        match self.freetext.map_freetext(text).await {
            Ok(mapping) => ToolResponse::ok(json!(mapping)),
            Err(err) => {
                warn!(tool = "mapping_info", error = %err, "free-text mapping failed");
                ToolResponse::failed(Value::Null)
            }
        }
    }

    /// List the process tables belonging to the product family of the lot
    /// number carried in `arguments.mapping_data`.
    pub async fn process_mapper(
        &self,
        chat_input: Option<&str>,
        arguments: Option<&ToolArguments>,
    ) -> ToolResponse<Vec<String>> {
        if non_empty(chat_input).is_none() {
            return ToolResponse::empty_failure();
        }
        info!(tool = "process_mapper", "tool invoked");

        let Some(lotno) = argument_lotno(arguments) else {
            return ToolResponse::empty_failure();
        };

        let mapping = match self.lot_resolver.resolve_lot(lotno).await {
            Ok(mapping) => mapping,
            Err(err) => {
                warn!(tool = "process_mapper", lotno, error = %err, "lot resolution failed");
                return ToolResponse::empty_failure();
            }
        };

        let (Some(product_code), Some(department)) =
            (mapping.product_code.as_deref(), mapping.department.as_deref())
        else {
            return ToolResponse::empty_failure();
        };

        match self
            .process_mapper
            .resolve_process_set(product_code, department)
            .await
        {
            Ok(tables) if !tables.is_empty() => ToolResponse::ok(tables),
            Ok(_) => ToolResponse::empty_failure(),
            Err(err) => {
                warn!(tool = "process_mapper", product_code, department, error = %err,
                    "process set lookup failed");
                ToolResponse::empty_failure()
            }
        }
    }

    /// Sample rows from the table named in `arguments.mapping_data`,
    /// filtered by lot number when one is present and not the `-` sentinel.
    pub async fn execute_query(
        &self,
        chat_input: Option<&str>,
        arguments: Option<&ToolArguments>,
    ) -> ToolResponse<Vec<ResultRow>> {
        if non_empty(chat_input).is_none() {
            return ToolResponse::empty_failure();
        }
        info!(tool = "execute_query", "tool invoked");

        let Some(table_name) = arguments
            .and_then(|a| a.mapping_data.as_ref())
            .and_then(|m| m.table_name.as_deref())
            .filter(|t| !t.is_empty())
        else {
            return ToolResponse::empty_failure();
        };

        let lotno = argument_lotno(arguments).filter(|l| *l != LOTNO_NOT_FOUND);

        match self
            .store
            .fetch_sample_rows(table_name, lotno, SAMPLE_ROW_LIMIT)
            .await
        {
            Ok(rows) => ToolResponse::ok(rows),
            Err(err) => {
                warn!(tool = "execute_query", table = table_name, error = %err, "sample fetch failed");
                ToolResponse::empty_failure()
            }
        }
    }

    /// Summarize one lot across the client-supplied table list, normal view.
    pub async fn summary_process_data(
        &self,
        chat_input: Option<&str>,
        arguments: Option<&ToolArguments>,
    ) -> ToolResponse<Vec<TableRows>> {
        self.summary(chat_input, arguments, false).await
    }

    /// Summarize one lot across the table list, defective columns only.
    pub async fn summary_process_data_defective(
        &self,
        chat_input: Option<&str>,
        arguments: Option<&ToolArguments>,
    ) -> ToolResponse<Vec<TableRows>> {
        self.summary(chat_input, arguments, true).await
    }

    async fn summary(
        &self,
        chat_input: Option<&str>,
        arguments: Option<&ToolArguments>,
        want_defect: bool,
    ) -> ToolResponse<Vec<TableRows>> {
        if non_empty(chat_input).is_none() {
            return ToolResponse::empty_failure();
        }
        info!(tool = "summary_process_data", want_defect, "tool invoked");

        let Some(lotno) = argument_lotno(arguments) else {
            return ToolResponse::empty_failure();
        };
        let Some(table_list) = arguments.and_then(|a| a.table_list.as_ref()) else {
            return ToolResponse::empty_failure();
        };

        let entries = self.aggregator.aggregate(table_list, lotno, want_defect).await;
        ToolResponse::ok(entries)
    }
}

fn non_empty(input: Option<&str>) -> Option<&str> {
    input.filter(|s| !s.trim().is_empty())
}

fn argument_lotno(arguments: Option<&ToolArguments>) -> Option<&str> {
    arguments
        .and_then(|a| a.mapping_data.as_ref())
        .and_then(|m| m.lotno.as_deref())
        .filter(|l| !l.is_empty())
}
