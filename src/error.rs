use std::io;

use thiserror::Error;

/// Errors produced while provisioning a repository.
///
/// Validation variants are raised before any remote call. `Api` carries the
/// HTTP status so callers can tell credential failures from everything else.
#[derive(Error, Debug)]
pub enum Error {
    /// The repository name is empty or breaks the naming convention.
    #[error("Invalid repository name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// A collaborator entry could not be parsed.
    #[error("Invalid collaborator entry '{0}': expected 'user:role'")]
    InvalidCollaborator(String),

    /// A collaborator entry names a role outside the supported set.
    #[error("Unknown role '{role}' for collaborator '{username}'. Roles: read, write, admin, maintain, triage")]
    UnknownRole { username: String, role: String },

    /// Authentication could not be completed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The GitHub API rejected a request.
    #[error("GitHub API error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Api { status: Option<u16>, message: String },

    /// The ruleset document could not be loaded.
    #[error("Failed to load branch rules from {source_ref}: {message}")]
    Ruleset { source_ref: String, message: String },

    /// Interactive input failed or was cancelled.
    #[error("Prompt failed: {0}")]
    Prompt(String),

    /// Settings could not be resolved.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// True for 401/403 responses, which mean the credential is expired or invalid.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Error::Api { status: Some(401 | 403), .. })
    }
}

impl From<octocrab::Error> for Error {
    fn from(e: octocrab::Error) -> Self {
        match e {
            octocrab::Error::GitHub { source, .. } => Error::Api {
                status: Some(source.status_code.as_u16()),
                message: source.message.clone(),
            },
            other => Error::Api {
                status: None,
                message: other.to_string(),
            },
        }
    }
}

impl From<inquire::InquireError> for Error {
    fn from(e: inquire::InquireError) -> Self {
        Error::Prompt(e.to_string())
    }
}
