use async_trait::async_trait;
use axum_test::TestServer;
use gh_lens::AppState;
use gh_lens::error::RunError;
use gh_lens::llm::{DriverEvent, DriverStream, LlmDriver, LlmRequest, MessageRole};
use gh_lens::mcp::{ServerLauncher, ServerParams, ToolSession};
use gh_lens::runner::{AgentRunner, DriverFactory, RunnerSettings};
use gh_lens::server::{MISSING_TOKEN_NOTICE, router};
use rmcp::model::{CallToolResult, Content, JsonObject, Tool};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Fake GitHub MCP server exposing a single `list_issues` tool.
#[derive(Debug, Default)]
struct FakeGithub {
    launches: AtomicUsize,
    closes: Arc<AtomicUsize>,
    calls: Arc<Mutex<Vec<(String, Option<JsonObject>)>>>,
}

struct FakeSession {
    closes: Arc<AtomicUsize>,
    calls: Arc<Mutex<Vec<(String, Option<JsonObject>)>>>,
}

#[async_trait]
impl ToolSession for FakeSession {
    async fn list_tools(&self) -> anyhow::Result<Vec<Tool>> {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {
                "owner": { "type": "string" },
                "repo": { "type": "string" },
                "labels": { "type": "array", "items": { "type": "string" } }
            }
        });
        let schema = schema.as_object().cloned().unwrap_or_default();
        Ok(vec![Tool::new(
            "list_issues",
            "List issues in a GitHub repository",
            Arc::new(schema),
        )])
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> anyhow::Result<CallToolResult> {
        self.calls.lock().unwrap().push((name.to_string(), arguments));
        Ok(CallToolResult::success(vec![Content::text(
            r#"[{"number":101,"title":"Crash on empty prompt"},{"number":102,"title":"Tokenizer overflow"},{"number":103,"title":"Wrong stop sequence"}]"#,
        )]))
    }

    async fn close(self: Box<Self>) -> anyhow::Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ServerLauncher for FakeGithub {
    async fn launch(&self, params: &ServerParams) -> Result<Box<dyn ToolSession>, RunError> {
        assert_eq!(params.env.get("GITHUB_TOKEN").map(String::as_str), Some("ghp_test"));
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            closes: Arc::clone(&self.closes),
            calls: Arc::clone(&self.calls),
        }))
    }
}

/// Model that calls `list_issues` once, then answers from the tool output.
struct IssueTriageModel;

#[async_trait]
impl LlmDriver for IssueTriageModel {
    async fn stream(&self, req: LlmRequest) -> anyhow::Result<DriverStream> {
        let answered_tool = req
            .messages
            .last()
            .is_some_and(|m| m.role == MessageRole::Tool);

        let events: Vec<anyhow::Result<DriverEvent>> = if answered_tool {
            vec![
                Ok(DriverEvent::TextDelta {
                    text: "3 bugs found:\n\n".to_string(),
                }),
                Ok(DriverEvent::TextDelta {
                    text: "| # | title |\n|---|---|\n| 101 | Crash on empty prompt |\n".to_string(),
                }),
                Ok(DriverEvent::Done),
            ]
        } else {
            assert!(req.tools.iter().any(|t| t["function"]["name"] == "list_issues"));
            vec![
                Ok(DriverEvent::ToolCallDelta {
                    index: 0,
                    id: Some("call_1".to_string()),
                    name: Some("list_issues".to_string()),
                    arguments_delta: Some(r#"{"owner":"openai","#.to_string()),
                }),
                Ok(DriverEvent::ToolCallDelta {
                    index: 0,
                    id: None,
                    name: None,
                    arguments_delta: Some(r#""repo":"gpt-4","labels":["bug"]}"#.to_string()),
                }),
                Ok(DriverEvent::Finish {
                    reason: "tool_calls".to_string(),
                }),
                Ok(DriverEvent::Done),
            ]
        };
        Ok(Box::pin(futures::stream::iter(events)))
    }
}

fn server(token: Option<&str>) -> (TestServer, Arc<FakeGithub>) {
    let github = Arc::new(FakeGithub::default());
    let settings = RunnerSettings {
        github_token: token.map(ToString::to_string),
        ..RunnerSettings::default()
    };
    let factory: DriverFactory = Arc::new(|| Arc::new(IssueTriageModel) as Arc<dyn LlmDriver>);
    let runner = AgentRunner::new(
        settings,
        Arc::clone(&github) as Arc<dyn ServerLauncher>,
        factory,
    );
    let app = router(
        AppState {
            runner: Arc::new(runner),
        },
        None,
    );
    (TestServer::new(app).unwrap(), github)
}

#[tokio::test]
async fn test_issue_question_end_to_end() {
    let (server, github) = server(Some("ghp_test"));

    let response = server
        .post("/run")
        .form(&[
            ("repo", "openai/gpt-4"),
            ("preset", "Issues"),
            ("query", "Find all open issues labeled as bugs in openai/gpt-4"),
        ])
        .await;
    response.assert_status_ok();

    let html = response.text();
    assert!(html.contains("▸ Find all open issues labeled as bugs in openai/gpt-4<"));
    assert!(!html.contains("(repository: openai/gpt-4)"));
    assert!(html.contains("3 bugs found"));
    assert!(html.contains("<td>Crash on empty prompt</td>"));

    assert_eq!(github.launches.load(Ordering::SeqCst), 1);
    assert_eq!(github.closes.load(Ordering::SeqCst), 1);

    let calls = github.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "list_issues");
    let args = calls[0].1.as_ref().unwrap();
    assert_eq!(args["owner"], "openai");
    assert_eq!(args["labels"][0], "bug");
}

#[tokio::test]
async fn test_custom_query_gets_repository_suffix() {
    let (server, _github) = server(Some("ghp_test"));

    let response = server
        .post("/run")
        .form(&[
            ("repo", "openai/gpt-4"),
            ("preset", "Custom"),
            ("query", "Which issues are stale?"),
        ])
        .await;

    response.assert_text_contains("▸ Which issues are stale? (repository: openai/gpt-4)");
}

#[tokio::test]
async fn test_missing_token_shows_notice_without_launching() {
    let (server, github) = server(None);

    let response = server
        .post("/run")
        .form(&[("repo", "openai/gpt-4"), ("preset", "Issues"), ("query", "anything")])
        .await;
    response.assert_status_ok();
    response.assert_text_contains(MISSING_TOKEN_NOTICE);
    assert!(!response.text().contains("result-body"));
    assert_eq!(github.launches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_blank_query_is_rejected() {
    let (server, github) = server(Some("ghp_test"));

    let response = server
        .post("/run")
        .form(&[("repo", "openai/gpt-4"), ("preset", "Custom"), ("query", "   \n")])
        .await;
    response.assert_text_contains("Please enter a query before running.");
    assert_eq!(github.launches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_template_endpoint_follows_preset() {
    let (server, _github) = server(None);

    let response = server
        .get("/template")
        .add_query_param("preset", "Repository Activity")
        .add_query_param("repo", "torvalds/linux")
        .await;
    response.assert_status_ok();
    response.assert_text("Summarise recent commit activity and code quality trends in torvalds/linux");

    let custom = server
        .get("/template")
        .add_query_param("preset", "Custom")
        .add_query_param("repo", "torvalds/linux")
        .await;
    custom.assert_text("");
}

#[tokio::test]
async fn test_index_renders_form() {
    let (server, _github) = server(None);

    let response = server.get("/").await;
    response.assert_status_ok();
    response.assert_text_contains("⬡ gh·lens");
    response.assert_text_contains("// getting started");
    response.assert_text_contains(r#"action="/run""#);
}
