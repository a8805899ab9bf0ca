//! Provider-specific URL and authentication differences.

use url::Url;

/// Default Azure `OpenAI` API version.
pub const AZURE_API_VERSION: &str = "2024-08-01-preview";

/// Supported LLM providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    /// `OpenAI` (api.openai.com)
    OpenAI,
    /// Azure `OpenAI` Service
    AzureOpenAI {
        deployment_name: String,
        api_version: String,
    },
    /// `OpenRouter` (openrouter.ai)
    OpenRouter,
    /// Groq (groq.com)
    Groq,
    /// Any other OpenAI-compatible endpoint.
    Generic,
}

impl Provider {
    /// Detect provider from the host of `base_url`.
    ///
    /// Azure needs a deployment name, which is taken from `azure_deployment`
    /// and falls back to the model id.
    #[must_use]
    pub fn detect(base_url: &str, model: &str, azure_deployment: Option<&str>) -> Self {
        let host = Url::parse(base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
            .unwrap_or_default();

        if host.ends_with("openai.azure.com") || host.ends_with(".azure.com") {
            Self::AzureOpenAI {
                deployment_name: azure_deployment.unwrap_or(model).to_string(),
                api_version: AZURE_API_VERSION.to_string(),
            }
        } else if host.ends_with("openrouter.ai") {
            Self::OpenRouter
        } else if host.ends_with("groq.com") {
            Self::Groq
        } else if host.ends_with("openai.com") {
            Self::OpenAI
        } else {
            Self::Generic
        }
    }

    /// Build the chat completions URL for this provider.
    #[must_use]
    pub fn chat_url(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');

        match self {
            Self::AzureOpenAI {
                deployment_name,
                api_version,
            } => format!(
                "{base}/openai/deployments/{deployment_name}/chat/completions?api-version={api_version}"
            ),
            _ => format!("{base}/v1/chat/completions"),
        }
    }

    /// Azure authenticates with an `api-key` header instead of a bearer token.
    #[must_use]
    pub fn uses_api_key_header(&self) -> bool {
        matches!(self, Self::AzureOpenAI { .. })
    }
}
