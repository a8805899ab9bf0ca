use anyhow::anyhow;
use rmcp::model::{CallToolResult, Tool};
use std::collections::HashMap;

use super::ToolSession;

/// The tools of one MCP session, exposed to the model as functions.
///
/// Tool names are sanitized for function-calling compatibility; the index
/// maps each exported name back to the server-side name.
pub struct Toolkit<'s> {
    session: &'s dyn ToolSession,
    tools: Vec<(String, Tool)>,
    tool_index: HashMap<String, String>,
}

impl std::fmt::Debug for Toolkit<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolkit")
            .field("tools", &self.tools.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .finish()
    }
}

impl<'s> Toolkit<'s> {
    /// Discover the session's tools.
    pub async fn discover(session: &'s dyn ToolSession) -> anyhow::Result<Self> {
        let discovered = session.list_tools().await?;
        let toolkit = Self::from_tools(session, discovered);

        for (name, _) in &toolkit.tools {
            tracing::debug!(name: "mcp.tool.discovered", tool = %name, "MCP tool discovered");
        }
        Ok(toolkit)
    }

    /// Build from an already-listed tool set.
    pub fn from_tools(session: &'s dyn ToolSession, discovered: Vec<Tool>) -> Self {
        let mut tools = Vec::with_capacity(discovered.len());
        let mut tool_index = HashMap::with_capacity(discovered.len());

        for t in discovered {
            let raw = t.name.to_string();
            let exported = sanitize_tool_name(&raw);
            tool_index.insert(exported.clone(), raw);
            tools.push((exported, t));
        }

        Self {
            session,
            tools,
            tool_index,
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Exported tool names, in discovery order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|(n, _)| n.as_str())
    }

    /// Tools in `OpenAI` function schema format.
    pub fn openai_tools_json(&self) -> Vec<serde_json::Value> {
        self.tools
            .iter()
            .map(|(name, t)| {
                let params = serde_json::to_value(&*t.input_schema)
                    .unwrap_or_else(|_| serde_json::json!({"type":"object","properties":{}}));

                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": name,
                        "description": t.description.as_deref().unwrap_or(""),
                        "parameters": params
                    }
                })
            })
            .collect()
    }

    /// Execute a tool call made by the model and return its output as text.
    ///
    /// A result flagged as an error by the server is still returned as text,
    /// prefixed with `Error:`, so the model can react to it.
    pub async fn call(&self, name: &str, arguments: serde_json::Value) -> anyhow::Result<String> {
        let raw = self
            .tool_index
            .get(name)
            .ok_or_else(|| anyhow!("unknown tool: {name}"))?;

        let args = match arguments {
            serde_json::Value::Object(map) => Some(map),
            serde_json::Value::Null => None,
            other => return Err(anyhow!("tool arguments must be an object, got {other}")),
        };

        let result = self.session.call_tool(raw, args).await?;
        Ok(result_text(&result))
    }
}

/// Sanitize tool names for `OpenAI` API compatibility (`^[a-zA-Z0-9_-]+$`).
fn sanitize_tool_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Flatten a tool result to text: text parts verbatim, other parts as JSON.
fn result_text(result: &CallToolResult) -> String {
    let parts: Vec<String> = result
        .content
        .iter()
        .map(|c| {
            let v = serde_json::to_value(c).unwrap_or_default();
            match v.get("text").and_then(serde_json::Value::as_str) {
                Some(text) => text.to_string(),
                None => v.to_string(),
            }
        })
        .collect();

    let body = if parts.is_empty() {
        result
            .structured_content
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    } else {
        parts.join("\n")
    };

    if result.is_error.unwrap_or(false) {
        format!("Error: {body}")
    } else {
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rmcp::model::{Content, JsonObject};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingSession {
        calls: Mutex<Vec<(String, Option<JsonObject>)>>,
    }

    #[async_trait]
    impl ToolSession for RecordingSession {
        async fn list_tools(&self) -> anyhow::Result<Vec<Tool>> {
            Ok(vec![tool("list_issues"), tool("search.code")])
        }

        async fn call_tool(
            &self,
            name: &str,
            arguments: Option<JsonObject>,
        ) -> anyhow::Result<CallToolResult> {
            self.calls
                .lock()
                .unwrap()
                .push((name.to_string(), arguments));
            Ok(CallToolResult::success(vec![Content::text(format!(
                "called {name}"
            ))]))
        }

        async fn close(self: Box<Self>) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn tool(name: &str) -> Tool {
        let schema = serde_json::json!({
            "type": "object",
            "properties": { "owner": { "type": "string" } }
        });
        Tool::new(
            name.to_string(),
            format!("{name} tool"),
            Arc::new(schema.as_object().unwrap().clone()),
        )
    }

    #[test]
    fn test_sanitize_tool_name() {
        assert_eq!(sanitize_tool_name("search.code"), "search_code");
        assert_eq!(sanitize_tool_name("github::get-file"), "github__get-file");
    }

    #[tokio::test]
    async fn test_discover_exports_function_schema() {
        let session = RecordingSession::default();
        let toolkit = Toolkit::discover(&session).await.unwrap();

        assert_eq!(toolkit.len(), 2);
        assert_eq!(
            toolkit.names().collect::<Vec<_>>(),
            vec!["list_issues", "search_code"]
        );

        let json = toolkit.openai_tools_json();
        assert_eq!(json[0]["type"], "function");
        assert_eq!(json[0]["function"]["name"], "list_issues");
        assert_eq!(json[0]["function"]["description"], "list_issues tool");
        assert_eq!(json[1]["function"]["parameters"]["type"], "object");
    }

    #[tokio::test]
    async fn test_call_maps_back_to_raw_name() {
        let session = RecordingSession::default();
        let toolkit = Toolkit::discover(&session).await.unwrap();

        let out = toolkit
            .call("search_code", serde_json::json!({"q": "fn main"}))
            .await
            .unwrap();
        assert_eq!(out, "called search.code");

        let calls = session.calls.lock().unwrap();
        assert_eq!(calls[0].0, "search.code");
        assert_eq!(calls[0].1.as_ref().unwrap()["q"], "fn main");
    }

    #[tokio::test]
    async fn test_call_rejects_unknown_tool_and_bad_arguments() {
        let session = RecordingSession::default();
        let toolkit = Toolkit::discover(&session).await.unwrap();

        assert!(toolkit.call("delete_repo", serde_json::json!({})).await.is_err());
        assert!(toolkit.call("list_issues", serde_json::json!([1, 2])).await.is_err());
        assert!(session.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_error_result_is_prefixed() {
        let result = CallToolResult::error(vec![Content::text("Not Found")]);
        assert_eq!(result_text(&result), "Error: Not Found");
    }
}
