use anyhow::{Context, anyhow};
use async_trait::async_trait;
use rmcp::{
    model::{CallToolRequestParam, CallToolResult, JsonObject, Tool},
    service::{RoleClient, RunningService, ServiceExt},
    transport::TokioChildProcess,
};
use tokio::process::Command;

use super::{ServerLauncher, ServerParams, ToolSession};
use crate::error::RunError;

/// Launches MCP servers as child processes over stdio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChildProcessLauncher;

#[async_trait]
impl ServerLauncher for ChildProcessLauncher {
    async fn launch(&self, params: &ServerParams) -> Result<Box<dyn ToolSession>, RunError> {
        let mut cmd = Command::new(&params.command);
        cmd.args(&params.args).envs(&params.env).kill_on_drop(true);

        let transport = TokioChildProcess::new(cmd).map_err(|e| {
            RunError::launch(format!(
                "failed to spawn `{}`: {e}",
                params.display_command()
            ))
        })?;

        tracing::debug!(
            name: "mcp.server.spawned",
            command = %params.display_command(),
            "MCP server process spawned"
        );

        let service = ()
            .serve(transport)
            .await
            .map_err(|e| RunError::protocol(format!("MCP session negotiation failed: {e}")))?;

        if let Some(info) = service.peer_info() {
            tracing::info!(
                name: "mcp.session.opened",
                server = %info.server_info.name,
                version = %info.server_info.version,
                "MCP session opened"
            );
        }

        Ok(Box::new(McpSession { service }))
    }
}

/// A negotiated rmcp client session; owns the child process.
pub struct McpSession {
    service: RunningService<RoleClient, ()>,
}

impl std::fmt::Debug for McpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpSession")
            .field("server", &self.service.peer_info().map(|i| &i.server_info.name))
            .finish()
    }
}

#[async_trait]
impl ToolSession for McpSession {
    async fn list_tools(&self) -> anyhow::Result<Vec<Tool>> {
        self.service
            .list_all_tools()
            .await
            .context("tools/list failed")
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> anyhow::Result<CallToolResult> {
        self.service
            .call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments,
            })
            .await
            .with_context(|| format!("tools/call failed for {name}"))
    }

    async fn close(self: Box<Self>) -> anyhow::Result<()> {
        let reason = self
            .service
            .cancel()
            .await
            .map_err(|e| anyhow!("MCP session shutdown failed: {e}"))?;
        tracing::debug!(name: "mcp.session.closed", reason = ?reason, "MCP session closed");
        Ok(())
    }
}
