//! REST API module for the DWH agent tools
//!
//! HTTP endpoints consumed by LLM clients (chatbots, MCP bridges). Thin
//! wrappers over the toolkit operations; all decision logic lives below.

pub mod agent_routes;

pub use agent_routes::{create_dwh_agent_router, AppState};
