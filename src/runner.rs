//! Agent runner: exactly one round trip to the GitHub agent per call.
//!
//! Each call launches a fresh MCP server process, opens a session, discovers
//! the tools, builds a fresh agent and awaits one answer. The session is
//! closed on every path once the session exists. Nothing is cached and
//! nothing outlives the call.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::RunError;
use crate::llm::{Agent, AgentResponse, ChatCompletionsDriver, INSTRUCTIONS, LlmDriver};
use crate::mcp::{ChildProcessLauncher, ServerLauncher, ServerParams, ToolSession, Toolkit};

/// Produces a model driver for one run.
pub type DriverFactory = Arc<dyn Fn() -> Arc<dyn LlmDriver> + Send + Sync>;

/// Everything a run needs, passed in explicitly.
#[derive(Clone)]
pub struct RunnerSettings {
    pub github_token: Option<String>,
    /// Server launch parameters without the credential.
    pub server: ServerParams,
    pub instructions: String,
    pub max_iterations: usize,
    /// Upper bound on one round trip; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for RunnerSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnerSettings")
            .field("github_token", &self.github_token.as_ref().map(|_| "<redacted>"))
            .field("server", &self.server.display_command())
            .field("max_iterations", &self.max_iterations)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            github_token: None,
            server: ServerParams::default(),
            instructions: INSTRUCTIONS.to_string(),
            max_iterations: crate::llm::agent::DEFAULT_MAX_ITERATIONS,
            timeout: None,
        }
    }
}

impl RunnerSettings {
    /// The credential, if set to something other than blanks.
    pub fn github_token(&self) -> Option<&str> {
        self.github_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Runs GitHub questions through an MCP-backed agent.
#[derive(Clone)]
pub struct AgentRunner {
    settings: RunnerSettings,
    launcher: Arc<dyn ServerLauncher>,
    driver_factory: DriverFactory,
}

impl std::fmt::Debug for AgentRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRunner")
            .field("settings", &self.settings)
            .field("launcher", &self.launcher)
            .finish()
    }
}

impl AgentRunner {
    pub fn new(
        settings: RunnerSettings,
        launcher: Arc<dyn ServerLauncher>,
        driver_factory: DriverFactory,
    ) -> Self {
        Self {
            settings,
            launcher,
            driver_factory,
        }
    }

    /// Production wiring: child-process MCP server and Chat Completions model.
    pub fn from_config(config: &AppConfig) -> Self {
        let llm = config.llm_settings();
        let driver_factory: DriverFactory =
            Arc::new(move || Arc::new(ChatCompletionsDriver::new(llm.clone())) as Arc<dyn LlmDriver>);

        Self::new(config.runner_settings(), Arc::new(ChildProcessLauncher), driver_factory)
    }

    pub fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    pub fn has_github_credential(&self) -> bool {
        self.settings.github_token().is_some()
    }

    /// Answer `message`, converting every failure into display text.
    pub async fn run(&self, message: &str) -> AgentResponse {
        match self.try_run(message).await {
            Ok(response) => response,
            Err(err) => AgentResponse::failure(&err),
        }
    }

    /// Answer `message`, keeping the failure kind.
    pub async fn try_run(&self, message: &str) -> Result<AgentResponse, RunError> {
        let Some(token) = self.settings.github_token() else {
            tracing::warn!(name: "agent.run.rejected", "GitHub credential missing; not launching MCP server");
            return Err(RunError::CredentialMissing);
        };

        let run_id = Uuid::new_v4();
        let params = self.settings.server.with_github_token(token);

        tracing::info!(
            name: "agent.run.started",
            run_id = %run_id,
            command = %params.display_command(),
            query_length = message.len(),
            "Starting agent run"
        );

        let result = self.round_trip(run_id, &params, message).await;

        match &result {
            Ok(response) => tracing::info!(
                name: "agent.run.finished",
                run_id = %run_id,
                content_length = response.content.len(),
                "Agent run finished"
            ),
            Err(err) => tracing::error!(
                name: "agent.run.failed",
                run_id = %run_id,
                kind = %err.kind(),
                error = %err,
                "Agent run failed"
            ),
        }
        result
    }

    async fn round_trip(
        &self,
        run_id: Uuid,
        params: &ServerParams,
        message: &str,
    ) -> Result<AgentResponse, RunError> {
        // One deadline covers launch, handshake, discovery and the agent.
        let deadline = self.settings.timeout.map(|limit| (Instant::now() + limit, limit));

        let session = match deadline {
            Some((at, limit)) => tokio::time::timeout_at(at, self.launcher.launch(params))
                .await
                .unwrap_or_else(|_| Err(timed_out(limit)))?,
            None => self.launcher.launch(params).await?,
        };

        let outcome = match deadline {
            Some((at, limit)) => {
                tokio::time::timeout_at(at, self.converse(run_id, session.as_ref(), message))
                    .await
                    .unwrap_or_else(|_| Err(timed_out(limit)))
            }
            None => self.converse(run_id, session.as_ref(), message).await,
        };

        let closed = session.close().await;

        match (outcome, closed) {
            (Ok(response), Ok(())) => Ok(response),
            (Ok(response), Err(e)) => {
                tracing::warn!(run_id = %run_id, error = %e, "MCP session teardown failed after answer");
                Ok(response)
            }
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(e)) => Err(RunError::aggregate(vec![err, RunError::protocol(e)])),
        }
    }

    async fn converse(
        &self,
        run_id: Uuid,
        session: &dyn ToolSession,
        message: &str,
    ) -> Result<AgentResponse, RunError> {
        let toolkit = Toolkit::discover(session)
            .await
            .map_err(|e| RunError::protocol(format!("tool discovery failed: {e}")))?;

        tracing::info!(
            name: "mcp.tools.discovered",
            run_id = %run_id,
            tool_count = toolkit.len(),
            "MCP tools discovered"
        );

        let agent = Agent::new(run_id, (self.driver_factory)(), toolkit)
            .with_instructions(self.settings.instructions.clone())
            .with_max_iterations(self.settings.max_iterations);

        agent.run(message).await
    }
}

fn timed_out(limit: Duration) -> RunError {
    RunError::model(format!("no answer within {}s", limit.as_secs()))
}
