//! Server-rendered page for the query form and its outcome.

use std::fmt::Write as _;

use crate::llm::AgentResponse;
use crate::query::Preset;

use super::markdown::{escape_html, render_markdown};

const STYLE: &str = include_str!("style.css");

/// Values echoed back into the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub repository: String,
    pub preset: Preset,
    pub query: String,
}

impl FormState {
    /// Form for a fresh page load: the query box starts from the preset template.
    pub fn prefilled(repository: impl Into<String>, preset: Preset) -> Self {
        let repository = repository.into();
        let query = preset.template(&repository);
        Self {
            repository,
            preset,
            query,
        }
    }
}

/// What is shown below the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Panel {
    /// Nothing has been run yet.
    GettingStarted,
    /// The submission was rejected before the agent ran.
    Error(String),
    /// One completed round trip.
    Result {
        full_query: String,
        response: AgentResponse,
    },
}

/// Render the complete page.
pub fn render_page(form: &FormState, panel: &Panel) -> String {
    html_shell("gh·lens", &format!("{}{}", form_section(form), panel_section(panel)))
}

fn html_shell(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="description" content="Natural language interface for GitHub repositories via MCP">
    <title>{title}</title>
    <style>{STYLE}</style>
</head>
<body>
    <main class="container">
        <div class="gh-hero">
            <h1>⬡ gh·lens</h1>
            <p>natural language interface for GitHub repositories via MCP</p>
        </div>
        {content}
    </main>
    <script>{SCRIPT}</script>
</body>
</html>"#
    )
}

fn form_section(form: &FormState) -> String {
    let mut options = String::new();
    for preset in Preset::ALL {
        let selected = if preset == form.preset { " selected" } else { "" };
        let _ = write!(
            options,
            r#"<option value="{label}"{selected}>{label}</option>"#,
            label = escape_html(preset.label())
        );
    }

    format!(
        r#"
        <form id="query-form" method="post" action="/run">
            <div class="row">
                <div>
                    <span class="field-label">Repository</span>
                    <input type="text" name="repo" id="repo" value="{repo}" placeholder="owner/repo  e.g. torvalds/linux" autocomplete="off">
                </div>
                <div>
                    <span class="field-label">Query preset</span>
                    <select name="preset" id="preset">{options}</select>
                </div>
            </div>
            <span class="field-label">Query</span>
            <textarea name="query" id="query" rows="4" placeholder="Ask anything about the repository…">{query}</textarea>
            <hr class="gh-divider">
            <button type="submit" class="run"><span class="spinner"></span><span class="run-label">▶  Run Query</span></button>
        </form>
        "#,
        repo = escape_html(&form.repository),
        query = escape_html(&form.query),
    )
}

fn panel_section(panel: &Panel) -> String {
    match panel {
        Panel::GettingStarted => GETTING_STARTED.to_string(),
        Panel::Error(message) => format!(
            r#"<div class="error-panel" role="alert">{}</div>"#,
            escape_html(message)
        ),
        Panel::Result {
            full_query,
            response,
        } => {
            let body = if response.is_error() {
                format!(
                    r#"<pre class="diagnostic">{}</pre>"#,
                    escape_html(&response.content)
                )
            } else {
                render_markdown(&response.content)
            };
            format!(
                r#"
        <div class="result-card">
            <h3>⬡ result</h3>
            <div class="query-badge">▸ {}</div>
            <div class="result-body">{body}</div>
        </div>
        "#,
                escape_html(full_query)
            )
        }
    }
}

const GETTING_STARTED: &str = r#"
        <div class="info-box">
            <h4>// getting started</h4>
            <ol>
                <li>Set <strong>GITHUB_TOKEN</strong> and <strong>OPENAI_API_KEY</strong> in your <code>.env</code> file</li>
                <li>Enter a repository in <strong>owner/repo</strong> format</li>
                <li>Pick a query preset or write your own</li>
                <li>Hit <strong>Run Query</strong></li>
            </ol>
            <hr class="gh-divider">
            <p><strong>// notes</strong></p>
            <ul>
                <li>MCP provides live, real-time access with no cached data</li>
                <li>Specific queries return sharper results than broad ones</li>
                <li>Node.js must be installed for the <code>npx</code> command to work</li>
            </ul>
        </div>
        "#;

const SCRIPT: &str = r#"
(function () {
    const form = document.getElementById('query-form');
    const repo = document.getElementById('repo');
    const preset = document.getElementById('preset');
    const query = document.getElementById('query');

    async function refill() {
        const params = new URLSearchParams({ preset: preset.value, repo: repo.value });
        const res = await fetch('/template?' + params.toString());
        if (res.ok) {
            query.value = await res.text();
        }
    }

    preset.addEventListener('change', refill);
    repo.addEventListener('change', function () {
        if (preset.value !== 'Custom') {
            refill();
        }
    });

    form.addEventListener('submit', function () {
        form.classList.add('loading');
        const button = form.querySelector('button.run');
        button.disabled = true;
        button.querySelector('.run-label').textContent = 'Querying GitHub via MCP…';
    });
})();
"#;
