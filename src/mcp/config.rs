use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default package runner for the GitHub MCP server.
pub const DEFAULT_COMMAND: &str = "npx";

/// Default arguments: the published GitHub MCP server package.
pub const DEFAULT_ARGS: [&str; 2] = ["-y", "@modelcontextprotocol/server-github"];

/// Environment names under which the GitHub credential is forwarded.
///
/// The published server reads `GITHUB_PERSONAL_ACCESS_TOKEN`.
pub const TOKEN_ENV_VARS: [&str; 2] = ["GITHUB_TOKEN", "GITHUB_PERSONAL_ACCESS_TOKEN"];

/// How to start the MCP server subprocess.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerParams {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra variables set on the child on top of the inherited environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl Default for ServerParams {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_string(),
            args: DEFAULT_ARGS.iter().map(ToString::to_string).collect(),
            env: BTreeMap::new(),
        }
    }
}

impl ServerParams {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            env: BTreeMap::new(),
        }
    }

    /// Copy of these params with the GitHub credential forwarded to the child.
    #[must_use]
    pub fn with_github_token(&self, token: &str) -> Self {
        let mut params = self.clone();
        for name in TOKEN_ENV_VARS {
            params.env.insert(name.to_string(), token.to_string());
        }
        params
    }

    /// Command line for logs. Never includes environment values.
    #[must_use]
    pub fn display_command(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
