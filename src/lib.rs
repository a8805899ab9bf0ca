//! gh·lens
//!
//! A single-page web tool that answers natural-language questions about a
//! GitHub repository. Each question is forwarded to a model agent whose only
//! tools are those exposed by a GitHub MCP server launched for that question.
//!
//! # Architecture
//!
//! - **Server**: Axum routes rendering the form and the result page
//! - **Runner**: One MCP session and one agent per question, always torn down
//! - **LLM**: Streaming Chat Completions driver and the tool-calling loop
//! - **MCP Client**: Child-process server launch and tool discovery via rmcp
//!
//! # Modules
//!
//! - [`query`]: Presets and full-query composition
//! - [`runner`]: The per-question round trip
//! - [`llm`]: Model driver trait, provider detection and the agent loop
//! - [`mcp`]: MCP server parameters, sessions and tool adaptation
//! - [`error`]: Failure kinds and their display text
//! - [`ui`]: Server-rendered HTML

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod error;
pub mod llm;
pub mod mcp;
pub mod query;
pub mod runner;
pub mod server;
pub mod ui;

use runner::AgentRunner;
use std::sync::Arc;

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Runs one question per call; holds no per-question state.
    pub runner: Arc<AgentRunner>,
}
