use axum::{
    Form, Router,
    extract::{Query, Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{Html, IntoResponse},
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use tower_http::trace::TraceLayer;

use tracing::info;

use crate::AppState;
use crate::config::AppConfig;
use crate::query::{Preset, QueryRequest};
use crate::runner::AgentRunner;
use crate::ui::{FormState, Panel, render_page};

/// Shown instead of running the agent when no GitHub credential is configured.
pub const MISSING_TOKEN_NOTICE: &str = "GITHUB_TOKEN not found. Add it to your .env file.";

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let llm = config.llm_settings();
    info!(
        name: "llm.config.loaded",
        base_url = %llm.base_url,
        model = %llm.model,
        api_key_set = llm.api_key.is_some(),
        "LLM configuration loaded"
    );

    let runner = AgentRunner::from_config(&config);
    info!(
        name: "mcp.server.configured",
        command = %runner.settings().server.display_command(),
        github_token_set = runner.has_github_credential(),
        "MCP server command configured"
    );

    let state = AppState {
        runner: Arc::new(runner),
    };
    let app = router(state, config.request_timeout());

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Build the router; `request_timeout` of `None` leaves requests unbounded.
pub fn router(state: AppState, request_timeout: Option<Duration>) -> Router {
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/template", get(template_handler))
        .route("/run", post(run_handler))
        .with_state(state);

    let app = match request_timeout {
        Some(duration) => app.layer(axum::middleware::from_fn(
            move |req: Request, next: Next| async move {
                match tokio::time::timeout(duration, next.run(req)).await {
                    Ok(res) => res,
                    Err(_) => (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response(),
                }
            },
        )),
        None => app,
    };

    app.layer(TraceLayer::new_for_http())
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Query-string pre-fill for the index page.
#[derive(Debug, Default, Deserialize)]
struct PageParams {
    #[serde(default)]
    repo: Option<String>,
    #[serde(default)]
    preset: Option<String>,
}

/// GET / - Render the empty form.
async fn index_handler(Query(params): Query<PageParams>) -> Html<String> {
    let preset = params
        .preset
        .as_deref()
        .and_then(|p| p.parse::<Preset>().ok())
        .unwrap_or_default();
    let form = FormState::prefilled(params.repo.unwrap_or_default(), preset);
    Html(render_page(&form, &Panel::GettingStarted))
}

#[derive(Debug, Deserialize)]
struct TemplateParams {
    preset: String,
    #[serde(default)]
    repo: String,
}

/// GET /template - Starting query text for a preset.
async fn template_handler(Query(params): Query<TemplateParams>) -> impl IntoResponse {
    match params.preset.parse::<Preset>() {
        Ok(preset) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            preset.template(&params.repo),
        ),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            e.to_string(),
        ),
    }
}

/// Form body of a query submission.
#[derive(Debug, Default, Deserialize)]
struct RunForm {
    #[serde(default)]
    repo: String,
    #[serde(default)]
    preset: String,
    #[serde(default)]
    query: String,
}

/// POST /run - Run one query and render the outcome.
async fn run_handler(State(state): State<AppState>, Form(form): Form<RunForm>) -> Html<String> {
    let request = QueryRequest::new(form.repo.trim(), form.query);
    let echoed = FormState {
        repository: request.repository.clone(),
        preset: form.preset.parse().unwrap_or_default(),
        query: request.query.clone(),
    };

    if !state.runner.has_github_credential() {
        info!(name: "query.rejected", reason = "credential_missing", "Query rejected");
        return Html(render_page(&echoed, &Panel::Error(MISSING_TOKEN_NOTICE.to_string())));
    }
    if let Err(e) = request.validate() {
        info!(name: "query.rejected", reason = %e, "Query rejected");
        return Html(render_page(&echoed, &Panel::Error(e.to_string())));
    }

    let full_query = request.full_query();
    info!(
        name: "query.submitted",
        repository = %request.repository,
        preset = %echoed.preset,
        "Query submitted"
    );

    let response = state.runner.run(&full_query).await;
    Html(render_page(
        &echoed,
        &Panel::Result {
            full_query,
            response,
        },
    ))
}
