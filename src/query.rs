//! Query composition.
//!
//! Maps a preset selection and a repository identifier to the starting text
//! of the query box, and derives the full query that is sent to the agent.

use std::fmt;
use std::str::FromStr;

/// A fixed query template keyed by a category label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Preset {
    /// Open bug reports.
    #[default]
    Issues,
    /// Recently merged pull requests.
    PullRequests,
    /// Commit activity and code quality trends.
    RepositoryActivity,
    /// Free-form query, no template.
    Custom,
}

impl Preset {
    /// All presets in selector order.
    pub const ALL: [Preset; 4] = [
        Preset::Issues,
        Preset::PullRequests,
        Preset::RepositoryActivity,
        Preset::Custom,
    ];

    /// Label shown in the preset selector.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Issues => "Issues",
            Self::PullRequests => "Pull Requests",
            Self::RepositoryActivity => "Repository Activity",
            Self::Custom => "Custom",
        }
    }

    /// Render the starting query for this preset.
    ///
    /// The repository identifier is interpolated as-is; an empty identifier
    /// yields a template with a blank substitution.
    #[must_use]
    pub fn template(self, repository: &str) -> String {
        match self {
            Self::Issues => format!("Find all open issues labeled as bugs in {repository}"),
            Self::PullRequests => format!("Show me recently merged pull requests in {repository}"),
            Self::RepositoryActivity => format!(
                "Summarise recent commit activity and code quality trends in {repository}"
            ),
            Self::Custom => String::new(),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Preset {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.label() == s.trim())
            .ok_or_else(|| QueryError::UnknownPreset(s.to_string()))
    }
}

/// Validation failures raised before the agent runner is invoked.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("Please enter a query before running.")]
    Empty,
    #[error("unknown query preset: {0}")]
    UnknownPreset(String),
}

/// A single form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryRequest {
    /// Repository identifier, expected as `owner/repo` but not enforced.
    pub repository: String,
    /// Free-text query as typed (or pre-filled from a preset).
    pub query: String,
}

impl QueryRequest {
    pub fn new(repository: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            query: query.into(),
        }
    }

    /// Reject queries that are empty or whitespace-only.
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.query.trim().is_empty() {
            return Err(QueryError::Empty);
        }
        Ok(())
    }

    /// The query sent downstream.
    ///
    /// Appends ` (repository: R)` when a repository is set and the query does
    /// not already mention it.
    #[must_use]
    pub fn full_query(&self) -> String {
        let repo = self.repository.as_str();
        if !repo.is_empty() && !self.query.contains(repo) {
            format!("{} (repository: {repo})", self.query)
        } else {
            self.query.clone()
        }
    }
}
