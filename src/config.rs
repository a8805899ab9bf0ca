use crate::llm::{LlmSettings, Provider};
use crate::mcp::ServerParams;
use crate::mcp::config::{DEFAULT_ARGS, DEFAULT_COMMAND};
use crate::runner::RunnerSettings;
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// Prefix of layered environment overrides, e.g. `GHLENS_SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "GHLENS";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Address to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// GitHub access token forwarded to the MCP server
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Model provider API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// Model provider base URL
    #[arg(long, env = "LLM_BASE_URL")]
    pub llm_base_url: Option<String>,

    /// Model identifier
    #[arg(long, env = "LLM_MODEL")]
    pub llm_model: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub github: GithubConfig,
    pub llm: LlmConfig,
    pub agent: AgentConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Zero disables the request timeout.
    pub request_timeout_secs: u64,
}

#[derive(Deserialize, Clone)]
pub struct GithubConfig {
    #[serde(default)]
    pub token: Option<String>,
    pub command: String,
    pub args: Vec<String>,
}

#[derive(Deserialize, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub azure_deployment: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    pub max_iterations: usize,
    /// Zero waits indefinitely.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for GithubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("command", &self.command)
            .field("args", &self.args)
            .finish()
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("azure_deployment", &self.azure_deployment)
            .finish()
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    /// Priority: CLI flag > flag env var > `GHLENS_` env > config file > defaults.
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let default_args: Vec<String> = DEFAULT_ARGS.iter().map(ToString::to_string).collect();

        let mut builder = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8501)?
            .set_default("server.request_timeout_secs", 600)?
            .set_default("github.command", DEFAULT_COMMAND)?
            .set_default("github.args", default_args)?
            .set_default("llm.base_url", "https://api.openai.com")?
            .set_default("llm.model", "gpt-4o")?
            .set_default("agent.max_iterations", 10)?
            .set_default("agent.timeout_secs", 300)?;

        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path)),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(token) = cli.github_token {
            builder = builder.set_override("github.token", token)?;
        }
        if let Some(key) = cli.llm_api_key {
            builder = builder.set_override("llm.api_key", key)?;
        }
        if let Some(url) = cli.llm_base_url {
            builder = builder.set_override("llm.base_url", url)?;
        }
        if let Some(model) = cli.llm_model {
            builder = builder.set_override("llm.model", model)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Model driver settings; an empty API key counts as absent.
    pub fn llm_settings(&self) -> LlmSettings {
        let provider = Provider::detect(
            &self.llm.base_url,
            &self.llm.model,
            self.llm.azure_deployment.as_deref(),
        );
        LlmSettings {
            base_url: self.llm.base_url.clone(),
            api_key: self
                .llm
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty()),
            model: self.llm.model.clone(),
            provider,
        }
    }

    pub fn runner_settings(&self) -> RunnerSettings {
        RunnerSettings {
            github_token: self.github.token.clone(),
            server: ServerParams::new(&self.github.command, self.github.args.clone()),
            max_iterations: self.agent.max_iterations,
            timeout: (self.agent.timeout_secs > 0)
                .then(|| Duration::from_secs(self.agent.timeout_secs)),
            ..RunnerSettings::default()
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.server.request_timeout_secs > 0)
            .then(|| Duration::from_secs(self.server.request_timeout_secs))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
