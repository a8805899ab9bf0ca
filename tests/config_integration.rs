use gh_lens::config::AppConfig;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::time::Duration;

const VARS: &[&str] = &[
    "CONFIG_FILE",
    "HOST",
    "PORT",
    "GITHUB_TOKEN",
    "OPENAI_API_KEY",
    "LLM_BASE_URL",
    "LLM_MODEL",
    "GHLENS_SERVER__PORT",
    "GHLENS_AGENT__MAX_ITERATIONS",
    "GHLENS_GITHUB__TOKEN",
];

// Clear environment variables that would otherwise leak into clap or the env source
fn clear_env_vars() {
    for var in VARS {
        unsafe {
            env::remove_var(var);
        }
    }
}

fn config_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("Failed to create temp config");
    file.write_all(content.as_bytes())
        .expect("Failed to write temp config");
    file
}

#[test]
#[serial]
fn test_default_config() {
    clear_env_vars();

    let config = AppConfig::load_from_args(["gh-lens"]).expect("Failed to load defaults");
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8501);
    assert_eq!(config.github.command, "npx");
    assert_eq!(
        config.github.args,
        vec!["-y", "@modelcontextprotocol/server-github"]
    );
    assert!(config.github.token.is_none());
    assert_eq!(config.llm.model, "gpt-4o");
    assert_eq!(config.agent.max_iterations, 10);
    assert_eq!(config.request_timeout(), Some(Duration::from_secs(600)));
    assert_eq!(config.bind_address(), "127.0.0.1:8501");
}

#[test]
#[serial]
fn test_env_override() {
    clear_env_vars();
    unsafe {
        env::set_var("GHLENS_SERVER__PORT", "9090");
        env::set_var("GHLENS_AGENT__MAX_ITERATIONS", "4");
    }

    let config = AppConfig::load_from_args(["gh-lens"]).expect("Failed to load config");
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.agent.max_iterations, 4);

    clear_env_vars();
}

#[test]
#[serial]
fn test_file_load() {
    clear_env_vars();

    let file = config_file(
        r#"
[server]
port = 7070
request_timeout_secs = 0

[github]
command = "docker"
args = ["run", "-i", "--rm", "ghcr.io/github/github-mcp-server"]
"#,
    );
    let path = file.path().to_str().expect("utf-8 temp path");

    let config =
        AppConfig::load_from_args(["gh-lens", "--config", path]).expect("Failed to load file");
    assert_eq!(config.server.port, 7070);
    assert_eq!(config.request_timeout(), None);
    assert_eq!(config.github.command, "docker");

    let runner = config.runner_settings();
    assert_eq!(
        runner.server.display_command(),
        "docker run -i --rm ghcr.io/github/github-mcp-server"
    );
}

#[test]
#[serial]
fn test_cli_flags_beat_file_and_env() {
    clear_env_vars();
    let file = config_file("[server]\nport = 7070\n");
    unsafe {
        env::set_var("GHLENS_SERVER__PORT", "9090");
    }

    let path = file.path().to_str().expect("utf-8 temp path");
    let config = AppConfig::load_from_args(["gh-lens", "--config", path, "--port", "6060"])
        .expect("Failed to load config");
    assert_eq!(config.server.port, 6060);

    clear_env_vars();
}

#[test]
#[serial]
fn test_credentials_from_environment() {
    clear_env_vars();
    unsafe {
        env::set_var("GITHUB_TOKEN", "ghp_from_env");
        env::set_var("OPENAI_API_KEY", "sk-test");
    }

    let config = AppConfig::load_from_args(["gh-lens"]).expect("Failed to load config");
    assert_eq!(config.runner_settings().github_token(), Some("ghp_from_env"));
    assert_eq!(config.llm_settings().api_key.as_deref(), Some("sk-test"));

    clear_env_vars();
}

#[test]
#[serial]
fn test_blank_credentials_count_as_missing() {
    clear_env_vars();

    let config = AppConfig::load_from_args(["gh-lens", "--github-token", "  ", "--llm-api-key", ""])
        .expect("Failed to load config");
    assert_eq!(config.runner_settings().github_token(), None);
    assert!(config.llm_settings().api_key.is_none());
}

#[test]
#[serial]
fn test_debug_output_redacts_secrets() {
    clear_env_vars();

    let config = AppConfig::load_from_args(["gh-lens", "--github-token", "ghp_secret"])
        .expect("Failed to load config");
    let rendered = format!("{config:?} {:?}", config.runner_settings());
    assert!(!rendered.contains("ghp_secret"));
}
