use async_trait::async_trait;
use octocrab::Octocrab;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::collaborators::Role;
use crate::config::TemplateRef;
use crate::error::Error;
use crate::ruleset::RulesetPayload;

/// Minimal view of `GET /user`
#[derive(Debug, Clone, Deserialize)]
struct Identity {
    login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub login: String,
}

/// The repository fields `wt` reads back from GitHub
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub name: String,
    pub full_name: String,
    pub owner: Account,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub is_template: bool,
}

/// Body of `POST /repos/{template_owner}/{template_repo}/generate`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateRepository {
    pub owner: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub private: bool,
    pub include_all_branches: bool,
}

/// Trait for GitHub API operations to enable dependency injection and mocking
#[async_trait]
pub trait GitHubClientTrait: Send + Sync {
    /// Login of the authenticated user; doubles as credential validation
    async fn current_user(&self) -> Result<String, Error>;

    async fn get_repository(&self, owner: &str, name: &str) -> Result<RepositoryInfo, Error>;

    async fn create_from_template(
        &self,
        template: &TemplateRef,
        request: &GenerateRepository,
    ) -> Result<RepositoryInfo, Error>;

    async fn add_collaborator(
        &self,
        owner: &str,
        repo: &str,
        username: &str,
        role: Role,
    ) -> Result<(), Error>;

    async fn create_ruleset(
        &self,
        owner: &str,
        repo: &str,
        ruleset: &RulesetPayload,
    ) -> Result<(), Error>;
}

/// GitHub API client wrapper
pub struct GitHubClient {
    octocrab: Octocrab,
}

impl GitHubClient {
    /// Create a client authenticated with a personal access token
    pub fn new(token: &SecretString, api_base: Option<&str>) -> Result<Self, Error> {
        let mut builder = Octocrab::builder().personal_token(token.expose_secret().to_string());
        if let Some(base) = api_base {
            builder = builder.base_uri(base)?;
        }
        Ok(Self {
            octocrab: builder.build()?,
        })
    }
}

#[async_trait]
impl GitHubClientTrait for GitHubClient {
    #[instrument(skip(self))]
    async fn current_user(&self) -> Result<String, Error> {
        let identity: Identity = self.octocrab.get("/user", None::<&()>).await?;
        Ok(identity.login)
    }

    #[instrument(skip(self))]
    async fn get_repository(&self, owner: &str, name: &str) -> Result<RepositoryInfo, Error> {
        let route = format!("/repos/{}/{}", owner, name);
        Ok(self.octocrab.get(route, None::<&()>).await?)
    }

    #[instrument(skip(self, request), fields(owner = %request.owner, name = %request.name))]
    async fn create_from_template(
        &self,
        template: &TemplateRef,
        request: &GenerateRepository,
    ) -> Result<RepositoryInfo, Error> {
        let route = format!("/repos/{}/{}/generate", template.owner, template.name);
        let repo: RepositoryInfo = self.octocrab.post(route, Some(request)).await?;
        debug!(full_name = %repo.full_name, "Repository generated from template");
        Ok(repo)
    }

    #[instrument(skip(self))]
    async fn add_collaborator(
        &self,
        owner: &str,
        repo: &str,
        username: &str,
        role: Role,
    ) -> Result<(), Error> {
        let route = format!("/repos/{}/{}/collaborators/{}", owner, repo, username);
        let body = serde_json::json!({ "permission": role.api_name() });

        // 201 carries an invitation, 204 means already a collaborator; neither body is needed.
        let response = self.octocrab._put(route, Some(&body)).await?;
        octocrab::map_github_error(response).await?;
        Ok(())
    }

    #[instrument(skip(self, ruleset), fields(ruleset = %ruleset.name))]
    async fn create_ruleset(
        &self,
        owner: &str,
        repo: &str,
        ruleset: &RulesetPayload,
    ) -> Result<(), Error> {
        let route = format!("/repos/{}/{}/rulesets", owner, repo);
        let _created: serde_json::Value = self.octocrab.post(route, Some(ruleset)).await?;
        Ok(())
    }
}
