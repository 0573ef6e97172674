use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::client_factory::ClientFactory;
use crate::collaborators::Role;
use crate::config::TemplateRef;
use crate::error::Error;
use crate::github::{Account, GenerateRepository, GitHubClientTrait, RepositoryInfo};
use crate::ruleset::RulesetPayload;

/// A remote call recorded by the mock client
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    CurrentUser { token: String },
    GetRepository { owner: String, name: String },
    CreateFromTemplate { template: TemplateRef, request: GenerateRepository },
    AddCollaborator { owner: String, repo: String, username: String, role: Role },
    CreateRuleset { owner: String, repo: String, ruleset: RulesetPayload },
}

/// How the mock answers the identity check for a token
#[derive(Debug, Clone)]
enum TokenBehavior {
    Accept(String),
    Reject(u16),
}

/// State shared by every client a `MockClientFactory` hands out
#[derive(Debug, Default)]
pub struct MockGitHubState {
    calls: Mutex<Vec<RemoteCall>>,
    connects: Mutex<usize>,
    failing_collaborators: Mutex<HashMap<String, u16>>,
    create_failure: Mutex<Option<u16>>,
    ruleset_failure: Mutex<Option<u16>>,
    missing_templates: Mutex<HashSet<String>>,
}

impl MockGitHubState {
    fn record(&self, call: RemoteCall) {
        self.calls.lock().unwrap().push(call);
    }

    /// Every remote call, in order
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Number of clients built by the factory
    pub fn connects(&self) -> usize {
        *self.connects.lock().unwrap()
    }

    pub fn identity_checks(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, RemoteCall::CurrentUser { .. }))
            .count()
    }

    pub fn created_repositories(&self) -> Vec<GenerateRepository> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RemoteCall::CreateFromTemplate { request, .. } => Some(request),
                _ => None,
            })
            .collect()
    }

    /// `(username, role)` for every add attempt, including failed ones
    pub fn collaborator_adds(&self) -> Vec<(String, Role)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RemoteCall::AddCollaborator { username, role, .. } => Some((username, role)),
                _ => None,
            })
            .collect()
    }

    pub fn rulesets(&self) -> Vec<RulesetPayload> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RemoteCall::CreateRuleset { ruleset, .. } => Some(ruleset),
                _ => None,
            })
            .collect()
    }
}

/// Mock GitHub client for testing that records operations in memory
#[derive(Debug, Clone)]
pub struct MockGitHubClient {
    token: String,
    behavior: TokenBehavior,
    state: Arc<MockGitHubState>,
}

#[async_trait]
impl GitHubClientTrait for MockGitHubClient {
    async fn current_user(&self) -> Result<String, Error> {
        self.state.record(RemoteCall::CurrentUser {
            token: self.token.clone(),
        });
        match &self.behavior {
            TokenBehavior::Accept(login) => Ok(login.clone()),
            TokenBehavior::Reject(status) => Err(Error::Api {
                status: Some(*status),
                message: "Bad credentials".to_string(),
            }),
        }
    }

    async fn get_repository(&self, owner: &str, name: &str) -> Result<RepositoryInfo, Error> {
        self.state.record(RemoteCall::GetRepository {
            owner: owner.to_string(),
            name: name.to_string(),
        });

        let full_name = format!("{}/{}", owner, name);
        if self.state.missing_templates.lock().unwrap().contains(&full_name) {
            return Err(Error::Api {
                status: Some(404),
                message: "Not Found".to_string(),
            });
        }

        Ok(RepositoryInfo {
            name: name.to_string(),
            html_url: Some(format!("https://github.com/{}", full_name)),
            full_name,
            owner: Account {
                login: owner.to_string(),
            },
            private: false,
            is_template: true,
        })
    }

    async fn create_from_template(
        &self,
        template: &TemplateRef,
        request: &GenerateRepository,
    ) -> Result<RepositoryInfo, Error> {
        self.state.record(RemoteCall::CreateFromTemplate {
            template: template.clone(),
            request: request.clone(),
        });

        if let Some(status) = *self.state.create_failure.lock().unwrap() {
            return Err(Error::Api {
                status: Some(status),
                message: "name already exists on this account".to_string(),
            });
        }

        let full_name = format!("{}/{}", request.owner, request.name);
        Ok(RepositoryInfo {
            name: request.name.clone(),
            html_url: Some(format!("https://github.com/{}", full_name)),
            full_name,
            owner: Account {
                login: request.owner.clone(),
            },
            private: request.private,
            is_template: false,
        })
    }

    async fn add_collaborator(
        &self,
        owner: &str,
        repo: &str,
        username: &str,
        role: Role,
    ) -> Result<(), Error> {
        self.state.record(RemoteCall::AddCollaborator {
            owner: owner.to_string(),
            repo: repo.to_string(),
            username: username.to_string(),
            role,
        });

        let failing = self.state.failing_collaborators.lock().unwrap();
        match failing.get(&username.to_lowercase()) {
            Some(status) => Err(Error::Api {
                status: Some(*status),
                message: "Not Found".to_string(),
            }),
            None => Ok(()),
        }
    }

    async fn create_ruleset(
        &self,
        owner: &str,
        repo: &str,
        ruleset: &RulesetPayload,
    ) -> Result<(), Error> {
        self.state.record(RemoteCall::CreateRuleset {
            owner: owner.to_string(),
            repo: repo.to_string(),
            ruleset: ruleset.clone(),
        });

        match *self.state.ruleset_failure.lock().unwrap() {
            Some(status) => Err(Error::Api {
                status: Some(status),
                message: "Validation Failed".to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Hands out `MockGitHubClient`s whose identity check depends on the token.
///
/// Tokens not registered with `accept_token` or `reject_token` are rejected
/// with 401.
#[derive(Debug, Default)]
pub struct MockClientFactory {
    tokens: HashMap<String, TokenBehavior>,
    state: Arc<MockGitHubState>,
}

impl MockClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept_token(mut self, token: &str, login: &str) -> Self {
        self.tokens
            .insert(token.to_string(), TokenBehavior::Accept(login.to_string()));
        self
    }

    pub fn reject_token(mut self, token: &str, status: u16) -> Self {
        self.tokens
            .insert(token.to_string(), TokenBehavior::Reject(status));
        self
    }

    /// Make adding `username` fail with `status`
    pub fn fail_collaborator(self, username: &str, status: u16) -> Self {
        self.state
            .failing_collaborators
            .lock()
            .unwrap()
            .insert(username.to_lowercase(), status);
        self
    }

    pub fn fail_create(self, status: u16) -> Self {
        *self.state.create_failure.lock().unwrap() = Some(status);
        self
    }

    pub fn fail_ruleset(self, status: u16) -> Self {
        *self.state.ruleset_failure.lock().unwrap() = Some(status);
        self
    }

    /// Make the template lookup for `owner/name` return 404
    pub fn missing_template(self, full_name: &str) -> Self {
        self.state
            .missing_templates
            .lock()
            .unwrap()
            .insert(full_name.to_string());
        self
    }

    pub fn state(&self) -> Arc<MockGitHubState> {
        Arc::clone(&self.state)
    }
}

impl ClientFactory for MockClientFactory {
    fn connect(&self, token: &SecretString) -> Result<Box<dyn GitHubClientTrait>, Error> {
        *self.state.connects.lock().unwrap() += 1;
        let token = token.expose_secret().to_string();
        let behavior = self
            .tokens
            .get(&token)
            .cloned()
            .unwrap_or(TokenBehavior::Reject(401));

        Ok(Box::new(MockGitHubClient {
            token,
            behavior,
            state: Arc::clone(&self.state),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_identity_by_token() {
        let factory = MockClientFactory::new()
            .accept_token("good", "octocat")
            .reject_token("bad", 403);

        let good = factory.connect(&SecretString::from("good")).unwrap();
        assert_eq!(good.current_user().await.unwrap(), "octocat");

        let bad = factory.connect(&SecretString::from("bad")).unwrap();
        assert!(bad.current_user().await.unwrap_err().is_auth_failure());

        let unknown = factory.connect(&SecretString::from("unknown")).unwrap();
        assert!(unknown.current_user().await.unwrap_err().is_auth_failure());

        assert_eq!(factory.state().identity_checks(), 3);
        assert_eq!(factory.state().connects(), 3);
    }

    #[tokio::test]
    async fn test_mock_create_from_template() {
        let factory = MockClientFactory::new().accept_token("t", "octocat");
        let client = factory.connect(&SecretString::from("t")).unwrap();
        let template = TemplateRef::default();

        let repo = client
            .create_from_template(
                &template,
                &GenerateRepository {
                    owner: "octocat".to_string(),
                    name: "wt-demo".to_string(),
                    description: None,
                    private: true,
                    include_all_branches: false,
                },
            )
            .await
            .unwrap();

        assert_eq!(repo.full_name, "octocat/wt-demo");
        assert!(repo.private);
        assert_eq!(factory.state().created_repositories().len(), 1);
    }

    #[tokio::test]
    async fn test_mock_collaborator_failure_is_case_insensitive() {
        let factory = MockClientFactory::new()
            .accept_token("t", "octocat")
            .fail_collaborator("Ghost", 404);
        let client = factory.connect(&SecretString::from("t")).unwrap();

        assert!(client.add_collaborator("org", "wt-demo", "ghost", Role::Read).await.is_err());
        assert!(client.add_collaborator("org", "wt-demo", "alice", Role::Write).await.is_ok());
        assert_eq!(factory.state().collaborator_adds().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_missing_template() {
        let factory = MockClientFactory::new()
            .accept_token("t", "octocat")
            .missing_template("acme/gone");
        let client = factory.connect(&SecretString::from("t")).unwrap();

        let err = client.get_repository("acme", "gone").await.unwrap_err();
        assert!(matches!(err, Error::Api { status: Some(404), .. }));
        assert!(client.get_repository("acme", "present").await.is_ok());
    }
}
