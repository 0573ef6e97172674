use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::Error;

/// Repository permission granted to a collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Read,
    Write,
    Admin,
    Maintain,
    Triage,
}

impl Role {
    /// Permission name understood by the GitHub collaborators API
    pub fn api_name(self) -> &'static str {
        match self {
            Role::Read => "pull",
            Role::Write => "push",
            Role::Admin => "admin",
            Role::Maintain => "maintain",
            Role::Triage => "triage",
        }
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "read" | "pull" => Ok(Role::Read),
            "write" | "push" => Ok(Role::Write),
            "admin" => Ok(Role::Admin),
            "maintain" => Ok(Role::Maintain),
            "triage" => Ok(Role::Triage),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Read => "read",
            Role::Write => "write",
            Role::Admin => "admin",
            Role::Maintain => "maintain",
            Role::Triage => "triage",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaboratorEntry {
    pub username: String,
    pub role: Role,
}

impl CollaboratorEntry {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }

    /// Case-insensitive username comparison, matching GitHub's login semantics
    pub fn is_user(&self, login: &str) -> bool {
        self.username.eq_ignore_ascii_case(login)
    }
}

impl fmt::Display for CollaboratorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.username, self.role)
    }
}

/// Parse `user1:role1,user2:role2`.
///
/// Blank entries are ignored, an entry without a role defaults to `write`,
/// and a repeated username keeps its first entry.
pub fn parse_collaborators(list: &str) -> Result<Vec<CollaboratorEntry>, Error> {
    let mut entries: Vec<CollaboratorEntry> = Vec::new();

    for raw in list.split(',').map(str::trim).filter(|raw| !raw.is_empty()) {
        let (username, role) = match raw.split_once(':') {
            Some((username, role)) => (username.trim(), role.trim()),
            None => (raw, "write"),
        };

        if username.is_empty() || username.contains(char::is_whitespace) {
            return Err(Error::InvalidCollaborator(raw.to_string()));
        }

        let role = role.parse::<Role>().map_err(|_| Error::UnknownRole {
            username: username.to_string(),
            role: role.to_string(),
        })?;

        if entries.iter().any(|existing| existing.is_user(username)) {
            debug!(username, "Ignoring repeated collaborator entry");
            continue;
        }
        entries.push(CollaboratorEntry::new(username, role));
    }

    Ok(entries)
}

/// Put the requesting user first as admin unless they are already listed
pub fn with_requesting_user(entries: Vec<CollaboratorEntry>, login: &str) -> Vec<CollaboratorEntry> {
    if entries.iter().any(|entry| entry.is_user(login)) {
        return entries;
    }

    let mut planned = Vec::with_capacity(entries.len() + 1);
    planned.push(CollaboratorEntry::new(login, Role::Admin));
    planned.extend(entries);
    planned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_mapping_is_exhaustive() {
        let cases = [
            ("read", "pull"),
            ("pull", "pull"),
            ("write", "push"),
            ("push", "push"),
            ("admin", "admin"),
            ("maintain", "maintain"),
            ("triage", "triage"),
            ("ADMIN", "admin"),
        ];
        for (input, expected) in cases {
            let role: Role = input.parse().unwrap();
            assert_eq!(role.api_name(), expected, "role {}", input);
        }
    }

    #[test]
    fn test_parse_collaborators() {
        let entries = parse_collaborators("alice:write, bob:read ,carol:admin").unwrap();
        assert_eq!(
            entries,
            vec![
                CollaboratorEntry::new("alice", Role::Write),
                CollaboratorEntry::new("bob", Role::Read),
                CollaboratorEntry::new("carol", Role::Admin),
            ]
        );
    }

    #[test]
    fn test_parse_collaborators_empty_and_blank_entries() {
        assert!(parse_collaborators("").unwrap().is_empty());
        assert!(parse_collaborators(" , ,").unwrap().is_empty());
        assert_eq!(parse_collaborators("alice:read,,").unwrap().len(), 1);
    }

    #[test]
    fn test_entry_without_role_defaults_to_write() {
        let entries = parse_collaborators("alice").unwrap();
        assert_eq!(entries, vec![CollaboratorEntry::new("alice", Role::Write)]);
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        match parse_collaborators("alice:write,bob:owner") {
            Err(Error::UnknownRole { username, role }) => {
                assert_eq!(username, "bob");
                assert_eq!(role, "owner");
            }
            other => panic!("expected UnknownRole, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_entry_is_rejected() {
        assert!(matches!(parse_collaborators(":admin"), Err(Error::InvalidCollaborator(_))));
        assert!(matches!(parse_collaborators("al ice:read"), Err(Error::InvalidCollaborator(_))));
    }

    #[test]
    fn test_repeated_username_keeps_first() {
        let entries = parse_collaborators("alice:read,ALICE:admin").unwrap();
        assert_eq!(entries, vec![CollaboratorEntry::new("alice", Role::Read)]);
    }

    #[test]
    fn test_requesting_user_prepended_as_admin() {
        let entries = parse_collaborators("alice:write").unwrap();
        let planned = with_requesting_user(entries, "octocat");
        assert_eq!(planned[0], CollaboratorEntry::new("octocat", Role::Admin));
        assert_eq!(planned[1], CollaboratorEntry::new("alice", Role::Write));
    }

    #[test]
    fn test_requesting_user_with_explicit_role_not_duplicated() {
        let entries = parse_collaborators("alice:write,OctoCat:maintain").unwrap();
        let planned = with_requesting_user(entries, "octocat");

        let matching: Vec<_> = planned.iter().filter(|e| e.is_user("octocat")).collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].role, Role::Maintain);
        assert_eq!(planned.len(), 2);
    }
}
