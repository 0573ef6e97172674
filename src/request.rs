use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::collaborators::CollaboratorEntry;
use crate::config::TemplateRef;
use crate::error::Error;

const MAX_NAME_LEN: usize = 100;

static NAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("static regex"));

/// Where the new repository lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerScope {
    Personal,
    Organization(String),
}

impl OwnerScope {
    /// Empty or whitespace-only org means personal scope
    pub fn from_org(org: &str) -> Self {
        let org = org.trim();
        if org.is_empty() {
            OwnerScope::Personal
        } else {
            OwnerScope::Organization(org.to_string())
        }
    }

    pub fn is_organization(&self) -> bool {
        matches!(self, OwnerScope::Organization(_))
    }
}

impl fmt::Display for OwnerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnerScope::Personal => f.write_str("Personal"),
            OwnerScope::Organization(org) => f.write_str(org),
        }
    }
}

/// Everything needed to provision one repository
#[derive(Debug, Clone)]
pub struct RepositoryRequest {
    pub name: String,
    pub description: Option<String>,
    pub private: bool,
    pub owner: OwnerScope,
    pub template: TemplateRef,
    /// `None` when the collaborator phase is skipped
    pub collaborators: Option<Vec<CollaboratorEntry>>,
    /// `None` when the branch rules phase is skipped
    pub ruleset: Option<String>,
}

/// Check a repository name against the prefix convention and GitHub's alphabet
pub fn validate_name(name: &str, prefix: &str) -> Result<(), Error> {
    let invalid = |reason: String| Error::InvalidName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("Repository name is required".to_string()));
    }
    if !name.starts_with(prefix) {
        return Err(invalid(format!(
            "must start with '{}' (e.g., '{}my-workflow')",
            prefix, prefix
        )));
    }
    if name.len() == prefix.len() {
        return Err(invalid(format!("needs a name after the '{}' prefix", prefix)));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid(format!("must be at most {} characters", MAX_NAME_LEN)));
    }
    if !NAME_CHARS.is_match(name) {
        return Err(invalid(
            "may only contain letters, digits, '-', '_' and '.'".to_string(),
        ));
    }
    Ok(())
}
