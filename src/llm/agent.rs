//! The GitHub agent: one query in, one answer out.
//!
//! The agent sends its instructions, the query and the toolkit's functions
//! to the model, then loops:
//! 1. Collect the model turn, accumulating streamed tool calls
//! 2. If the turn requested tools, execute them through the MCP session
//! 3. Feed the results back and ask again
//! 4. Stop at the first turn without tool calls
//!
//! A failing tool call is reported back to the model as the tool's output.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::StreamExt;
use uuid::Uuid;

use super::{DriverEvent, LlmDriver, LlmRequest, Message, ToolCall, ToolCallFunction};
use crate::error::{ErrorKind, RunError};
use crate::mcp::Toolkit;

/// Fixed instruction set of the GitHub agent.
pub const INSTRUCTIONS: &str = "\
You are a precise GitHub intelligence assistant.
- Deliver clear, structured insights drawn directly from the GitHub API
- Use markdown tables for numerical or comparative data
- Include direct links to relevant GitHub pages where useful
- Keep prose concise; let data speak for itself
- Respond in markdown
";

/// Default bound on model turns per query.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Display text of one round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentResponse {
    /// The model's markdown answer, or a diagnostic.
    pub content: String,
    /// Set when `content` is a diagnostic.
    pub error: Option<ErrorKind>,
}

impl AgentResponse {
    pub fn answer(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            error: None,
        }
    }

    pub fn failure(err: &RunError) -> Self {
        Self {
            content: err.diagnostic(),
            error: Some(err.kind()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Default)]
struct ToolCallAccumulator {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

/// A single-use agent bound to instructions, a driver and a toolkit.
pub struct Agent<'s> {
    run_id: Uuid,
    instructions: String,
    driver: Arc<dyn LlmDriver>,
    toolkit: Toolkit<'s>,
    max_iterations: usize,
}

impl std::fmt::Debug for Agent<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("run_id", &self.run_id)
            .field("toolkit", &self.toolkit)
            .field("max_iterations", &self.max_iterations)
            .finish()
    }
}

impl<'s> Agent<'s> {
    pub fn new(run_id: Uuid, driver: Arc<dyn LlmDriver>, toolkit: Toolkit<'s>) -> Self {
        Self {
            run_id,
            instructions: INSTRUCTIONS.to_string(),
            driver,
            toolkit,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Answer `query`, calling tools as the model asks.
    pub async fn run(&self, query: &str) -> Result<AgentResponse, RunError> {
        let run_id = self.run_id;
        let tools = self.toolkit.openai_tools_json();
        let mut messages = vec![Message::system(&self.instructions), Message::user(query)];

        for iteration in 1..=self.max_iterations {
            tracing::debug!(
                run_id = %run_id,
                iteration,
                message_count = messages.len(),
                tool_count = tools.len(),
                "Requesting model turn"
            );

            let (text, tool_calls) = self
                .turn(LlmRequest {
                    messages: messages.clone(),
                    tools: tools.clone(),
                })
                .await?;

            if tool_calls.is_empty() {
                tracing::info!(
                    name: "agent.answer.ready",
                    run_id = %run_id,
                    iteration,
                    content_length = text.len(),
                    "Agent produced an answer"
                );
                return Ok(AgentResponse::answer(text));
            }

            messages.push(Message::assistant_tool_calls(
                (!text.is_empty()).then_some(text),
                tool_calls.clone(),
            ));

            for call in &tool_calls {
                let content = self.execute(call).await;
                messages.push(Message::tool_result(&call.id, content));
            }
        }

        tracing::error!(
            run_id = %run_id,
            max_iterations = self.max_iterations,
            "Maximum tool loop iterations exceeded"
        );
        Err(RunError::model(format!(
            "maximum tool loop iterations exceeded ({})",
            self.max_iterations
        )))
    }

    /// Collect one model turn into its text and completed tool calls.
    async fn turn(&self, req: LlmRequest) -> Result<(String, Vec<ToolCall>), RunError> {
        let mut stream = self.driver.stream(req).await.map_err(RunError::model)?;

        let mut text = String::new();
        let mut accumulators: BTreeMap<usize, ToolCallAccumulator> = BTreeMap::new();

        while let Some(event) = stream.next().await {
            match event.map_err(RunError::model)? {
                DriverEvent::TextDelta { text: delta } => text.push_str(&delta),
                DriverEvent::ToolCallDelta {
                    index,
                    id,
                    name,
                    arguments_delta,
                } => {
                    let acc = accumulators.entry(index).or_default();
                    if acc.id.is_none() {
                        acc.id = id;
                    }
                    if acc.name.is_none() {
                        acc.name = name;
                    }
                    if let Some(delta) = arguments_delta {
                        acc.arguments.push_str(&delta);
                    }
                }
                DriverEvent::Finish { reason } => {
                    tracing::debug!(run_id = %self.run_id, finish_reason = %reason, "Model turn finished");
                }
                DriverEvent::Done => break,
            }
        }

        let tool_calls = accumulators
            .into_iter()
            .map(|(index, acc)| match (acc.id, acc.name) {
                (Some(id), Some(name)) => Ok(ToolCall {
                    id,
                    call_type: "function".to_string(),
                    function: ToolCallFunction {
                        name,
                        arguments: acc.arguments,
                    },
                }),
                (id, name) => Err(RunError::model(format!(
                    "incomplete tool call at index {index} (id: {}, name: {})",
                    id.as_deref().unwrap_or("missing"),
                    name.as_deref().unwrap_or("missing")
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok((text, tool_calls))
    }

    async fn execute(&self, call: &ToolCall) -> String {
        let tool = &call.function.name;
        let arguments = if call.function.arguments.trim().is_empty() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            match serde_json::from_str(&call.function.arguments) {
                Ok(v) => v,
                Err(e) => return format!("Error: invalid tool arguments: {e}"),
            }
        };

        tracing::info!(
            name: "agent.tool.call",
            run_id = %self.run_id,
            tool_id = %call.id,
            tool = %tool,
            "Executing tool call"
        );

        match self.toolkit.call(tool, arguments).await {
            Ok(content) => {
                tracing::debug!(
                    run_id = %self.run_id,
                    tool = %tool,
                    result_length = content.len(),
                    "Tool call succeeded"
                );
                content
            }
            Err(e) => {
                tracing::warn!(
                    run_id = %self.run_id,
                    tool = %tool,
                    error = %e,
                    "Tool call failed"
                );
                format!("Error: {e}")
            }
        }
    }
}
