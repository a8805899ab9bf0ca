//! Model Context Protocol (MCP) client side.
//!
//! The GitHub MCP server runs as a child process speaking MCP over its
//! standard streams. One process and one session exist per agent run; both
//! are released when the run finishes.
//!
//! # Seams
//!
//! - [`ServerLauncher`] starts a server from [`ServerParams`] and hands back a
//!   negotiated [`ToolSession`].
//! - [`ToolSession`] lists and calls the server's tools and is closed
//!   explicitly by its owner.
//! - [`Toolkit`] adapts a session's tools to the model's function-calling
//!   schema and dispatches the calls the model makes.
//!
//! The production launcher is [`ChildProcessLauncher`], backed by `rmcp`'s
//! `TokioChildProcess` transport.

pub mod config;
pub mod session;
pub mod toolkit;

pub use config::ServerParams;
pub use session::{ChildProcessLauncher, McpSession};
pub use toolkit::Toolkit;

use async_trait::async_trait;
use rmcp::model::{CallToolResult, JsonObject, Tool};

use crate::error::RunError;

/// A live client session against one MCP server.
#[async_trait]
pub trait ToolSession: Send + Sync {
    /// Discover every tool the server exposes.
    async fn list_tools(&self) -> anyhow::Result<Vec<Tool>>;

    /// Invoke a tool by its server-side name.
    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> anyhow::Result<CallToolResult>;

    /// Tear down the session and its transport.
    async fn close(self: Box<Self>) -> anyhow::Result<()>;
}

/// Starts an MCP server and negotiates a session with it.
#[async_trait]
pub trait ServerLauncher: Send + Sync + std::fmt::Debug {
    /// Launch failures map to [`RunError::SubprocessLaunch`], handshake
    /// failures to [`RunError::Protocol`].
    async fn launch(&self, params: &ServerParams) -> Result<Box<dyn ToolSession>, RunError>;
}
