//! Failure kinds of a single agent round trip.
//!
//! Every failure is converted to display text at the runner boundary; none of
//! them terminate the process.

use std::fmt;

/// Message shown when no GitHub credential is configured.
pub const CREDENTIAL_MISSING_MESSAGE: &str = "GITHUB_TOKEN is not set in your environment.";

/// Header line of an aggregate diagnostic.
pub const AGGREGATE_HEADER: &str = "Errors encountered:";

/// Discriminant of a [`RunError`], for callers that only care about the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    CredentialMissing,
    SubprocessLaunch,
    Protocol,
    Model,
    Aggregate,
}

impl ErrorKind {
    /// Name used in diagnostic text.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::CredentialMissing => "CredentialMissingError",
            Self::SubprocessLaunch => "SubprocessLaunchError",
            Self::Protocol => "ProtocolError",
            Self::Model => "ModelError",
            Self::Aggregate => "AggregateError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A failed round trip.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// No GitHub credential; detected before any subprocess launch.
    #[error("GITHUB_TOKEN is not set in your environment.")]
    CredentialMissing,

    /// The MCP server process could not be started.
    #[error("SubprocessLaunchError: {0}")]
    SubprocessLaunch(String),

    /// Session negotiation, tool discovery or session teardown failed.
    #[error("ProtocolError: {0}")]
    Protocol(String),

    /// The model provider failed or the agent could not settle on an answer.
    #[error("ModelError: {0}")]
    Model(String),

    /// Several failures surfaced from the same round trip.
    #[error("{}", render_aggregate(.0))]
    Aggregate(Vec<RunError>),
}

impl RunError {
    pub fn launch(err: impl fmt::Display) -> Self {
        Self::SubprocessLaunch(err.to_string())
    }

    pub fn protocol(err: impl fmt::Display) -> Self {
        Self::Protocol(err.to_string())
    }

    pub fn model(err: impl fmt::Display) -> Self {
        Self::Model(err.to_string())
    }

    /// Combine several failures, flattening nested aggregates.
    ///
    /// A single failure is returned unwrapped.
    #[must_use]
    pub fn aggregate(errors: Vec<RunError>) -> Self {
        let mut flat = Vec::with_capacity(errors.len());
        for e in errors {
            match e {
                Self::Aggregate(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            if let Some(only) = flat.pop() {
                return only;
            }
        }
        Self::Aggregate(flat)
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CredentialMissing => ErrorKind::CredentialMissing,
            Self::SubprocessLaunch(_) => ErrorKind::SubprocessLaunch,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Model(_) => ErrorKind::Model,
            Self::Aggregate(_) => ErrorKind::Aggregate,
        }
    }

    /// The message without its kind prefix.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::CredentialMissing => CREDENTIAL_MISSING_MESSAGE.to_string(),
            Self::SubprocessLaunch(m) | Self::Protocol(m) | Self::Model(m) => m.clone(),
            Self::Aggregate(_) => self.to_string(),
        }
    }

    /// Text shown in place of an answer.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        match self {
            Self::CredentialMissing | Self::Aggregate(_) => self.to_string(),
            _ => format!("Error: {self}"),
        }
    }
}

fn render_aggregate(errors: &[RunError]) -> String {
    let mut out = String::from(AGGREGATE_HEADER);
    for e in errors {
        out.push('\n');
        out.push_str(e.kind().name());
        out.push_str(": ");
        out.push_str(&single_line(&e.message()));
    }
    out
}

/// Collapse a multi-line message so each failure keeps to one line.
fn single_line(message: &str) -> String {
    message
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
