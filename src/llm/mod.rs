//! Model provider access and the GitHub agent.
//!
//! The [`LlmDriver`] trait is the streaming seam to an OpenAI-compatible
//! model endpoint. The [`Agent`] builds on a driver and an MCP
//! [`Toolkit`](crate::mcp::Toolkit) to run the tool loop for one query.
//!
//! # Drivers
//!
//! - [`ChatCompletionsDriver`]: Chat Completions API (`/v1/chat/completions`)

pub mod agent;
pub mod chat_completions;
pub mod provider;

pub use agent::{Agent, AgentResponse, INSTRUCTIONS};
pub use chat_completions::ChatCompletionsDriver;
pub use provider::Provider;

use futures::Stream;
use std::pin::Pin;

/// LLM connection and model settings.
#[derive(Clone)]
pub struct LlmSettings {
    /// Base URL for the LLM API (e.g., `https://api.openai.com`).
    pub base_url: String,
    /// Optional API key. Absence surfaces as a provider failure, not a precheck.
    pub api_key: Option<String>,
    /// Model identifier (e.g., `gpt-4o`).
    pub model: String,
    /// Provider type, detected from `base_url`.
    pub provider: Provider,
}

impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("provider", &self.provider)
            .finish()
    }
}

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// A message in the agent's conversation.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub role: MessageRole,
    /// `None` only for assistant turns that consist solely of tool calls.
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(MessageRole::User, content)
    }

    pub fn assistant_tool_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content,
            tool_call_id: None,
            tool_calls: Some(tool_calls),
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: Some(content.into()),
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: None,
        }
    }

    fn text(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_call_id: None,
            tool_calls: None,
        }
    }
}

/// A tool call made by the assistant.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ToolCall {
    pub id: String,
    /// Always `"function"`.
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: ToolCallFunction,
}

/// Function details in a tool call.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ToolCallFunction {
    pub name: String,
    /// Arguments as a JSON string.
    pub arguments: String,
}

/// Request to an LLM driver.
#[derive(Debug)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    /// Available tools in `OpenAI` function schema format.
    pub tools: Vec<serde_json::Value>,
}

/// Incremental output of one model turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    /// Assistant text fragment.
    TextDelta { text: String },
    /// Fragment of a streamed tool call; fields arrive piecemeal per index.
    ToolCallDelta {
        index: usize,
        id: Option<String>,
        name: Option<String>,
        arguments_delta: Option<String>,
    },
    /// The turn ended with a reason reported by the provider.
    Finish { reason: String },
    /// End of stream.
    Done,
}

pub type DriverStream = Pin<Box<dyn Stream<Item = anyhow::Result<DriverEvent>> + Send>>;

/// Trait for LLM streaming drivers.
#[async_trait::async_trait]
pub trait LlmDriver: Send + Sync {
    /// Stream one model turn.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the connection is interrupted.
    async fn stream(&self, req: LlmRequest) -> anyhow::Result<DriverStream>;
}
