//! DWH agent core: lot/identity mapping, column projection and row
//! retrieval for a manufacturing data warehouse.
//!
//! The crate exposes a small set of tool operations consumed by LLM-driven
//! clients over HTTP. The persistence layer is a capability trait
//! ([`database::WarehouseStore`]); the shipped implementation runs against
//! Postgres via sqlx.

pub mod database;
pub mod error;
pub mod mapping;
pub mod models;
pub mod retrieval;
pub mod service;

#[cfg(feature = "server")]
pub mod api;

pub use error::{DwhError, DwhResult};
pub use models::{CellValue, ColumnRule, LotMapping, ResultRow, TableIdentity, ToolResponse};
pub use service::AgentToolkit;
