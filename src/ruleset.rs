//! Branch ruleset documents.
//!
//! A ruleset document is a JSON object in the shape GitHub exports from the
//! ruleset settings page. Only the fields needed to recreate the ruleset are
//! read; the rest (ids, links, timestamps) are ignored. Missing fields fall
//! back to a conservative default that protects the default branch.
//!
//! See: https://docs.github.com/en/rest/repos/rules

use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument};
use url::Url;

use crate::error::Error;

pub const DEFAULT_RULESET_NAME: &str = "default-branch-protection";

/// Hosts allowed to receive the bearer token when fetching a document
const TOKEN_HOSTS: [&str; 3] = ["github.com", "api.github.com", "raw.githubusercontent.com"];

/// Target type for a ruleset.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RulesetTarget {
    #[default]
    Branch,
    Tag,
    Push,
}

/// Enforcement level for a ruleset.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RulesetEnforcement {
    Disabled,
    #[default]
    Active,
    Evaluate,
}

/// Ruleset as read from a document; every field is optional
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct RulesetDocument {
    pub name: Option<String>,
    pub target: Option<RulesetTarget>,
    pub enforcement: Option<RulesetEnforcement>,
    pub conditions: Option<Value>,
    pub rules: Option<Vec<Value>>,
    pub bypass_actors: Option<Vec<Value>>,
}

/// Body of `POST /repos/{owner}/{repo}/rulesets`
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct RulesetPayload {
    pub name: String,
    pub target: RulesetTarget,
    pub enforcement: RulesetEnforcement,
    pub conditions: Value,
    pub rules: Vec<Value>,
    pub bypass_actors: Vec<Value>,
}

impl From<RulesetDocument> for RulesetPayload {
    fn from(doc: RulesetDocument) -> Self {
        Self {
            name: doc
                .name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_RULESET_NAME.to_string()),
            target: doc.target.unwrap_or_default(),
            enforcement: doc.enforcement.unwrap_or_default(),
            conditions: doc.conditions.unwrap_or_else(default_conditions),
            rules: doc.rules.unwrap_or_default(),
            bypass_actors: doc.bypass_actors.unwrap_or_default(),
        }
    }
}

fn default_conditions() -> Value {
    json!({
        "ref_name": {
            "include": ["~DEFAULT_BRANCH"],
            "exclude": []
        }
    })
}

/// Load a ruleset document from an http(s) URL or a local file path
#[instrument(skip(token))]
pub async fn load_ruleset(source: &str, token: &SecretString) -> Result<RulesetDocument, Error> {
    let fail = |message: String| Error::Ruleset {
        source_ref: source.to_string(),
        message,
    };

    let body = match Url::parse(source) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => fetch(&url, token).await.map_err(fail)?,
        _ => tokio::fs::read_to_string(Path::new(source))
            .await
            .map_err(|e| fail(e.to_string()))?,
    };

    serde_json::from_str(&body).map_err(|e| fail(format!("invalid ruleset JSON: {}", e)))
}

async fn fetch(url: &Url, token: &SecretString) -> Result<String, String> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("wt/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| e.to_string())?;

    let mut request = client.get(url.clone());
    if sends_token(url) {
        request = request.bearer_auth(token.expose_secret());
    }

    let response = request.send().await.map_err(|e| e.to_string())?;
    let status = response.status();
    debug!(%url, %status, "Fetched ruleset document");
    if !status.is_success() {
        return Err(format!("HTTP {}", status));
    }
    response.text().await.map_err(|e| e.to_string())
}

fn sends_token(url: &Url) -> bool {
    url.scheme() == "https"
        && url
            .host_str()
            .is_some_and(|host| TOKEN_HOSTS.contains(&host))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token() -> SecretString {
        SecretString::from("ghp_test")
    }

    #[test]
    fn test_empty_document_gets_safe_defaults() {
        let payload = RulesetPayload::from(RulesetDocument::default());
        assert_eq!(payload.name, DEFAULT_RULESET_NAME);
        assert_eq!(payload.target, RulesetTarget::Branch);
        assert_eq!(payload.enforcement, RulesetEnforcement::Active);
        assert_eq!(payload.conditions["ref_name"]["include"][0], "~DEFAULT_BRANCH");
        assert!(payload.rules.is_empty());
        assert!(payload.bypass_actors.is_empty());
    }

    #[test]
    fn test_recognized_fields_are_kept_and_extras_ignored() {
        let doc: RulesetDocument = serde_json::from_value(json!({
            "id": 42,
            "source_type": "Repository",
            "name": "main protection",
            "target": "branch",
            "enforcement": "evaluate",
            "conditions": { "ref_name": { "include": ["refs/heads/main"], "exclude": [] } },
            "rules": [
                { "type": "deletion" },
                { "type": "pull_request", "parameters": { "required_approving_review_count": 1 } }
            ],
            "bypass_actors": [
                { "actor_id": 5, "actor_type": "RepositoryRole", "bypass_mode": "always" }
            ]
        }))
        .unwrap();

        let payload = RulesetPayload::from(doc);
        assert_eq!(payload.name, "main protection");
        assert_eq!(payload.enforcement, RulesetEnforcement::Evaluate);
        assert_eq!(payload.rules.len(), 2);
        assert_eq!(payload.rules[1]["parameters"]["required_approving_review_count"], 1);
        assert_eq!(payload.bypass_actors[0]["actor_id"], 5);

        let body = serde_json::to_value(&payload).unwrap();
        assert!(body.get("id").is_none());
        assert_eq!(body["target"], "branch");
    }

    #[test]
    fn test_token_only_sent_to_github_hosts() {
        assert!(sends_token(&Url::parse("https://raw.githubusercontent.com/a/b/main/x.json").unwrap()));
        assert!(!sends_token(&Url::parse("http://raw.githubusercontent.com/a/b/main/x.json").unwrap()));
        assert!(!sends_token(&Url::parse("https://example.com/rules.json").unwrap()));
        assert!(!sends_token(&Url::parse("http://127.0.0.1:8080/rules.json").unwrap()));
    }

    #[tokio::test]
    async fn test_load_ruleset_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("rules.json");
        std::fs::write(&file, r#"{"name": "from-file", "enforcement": "disabled"}"#).unwrap();

        let doc = load_ruleset(file.to_str().unwrap(), &token()).await.unwrap();
        assert_eq!(doc.name.as_deref(), Some("from-file"));
        assert_eq!(doc.enforcement, Some(RulesetEnforcement::Disabled));
    }

    #[tokio::test]
    async fn test_load_ruleset_missing_file_is_ruleset_error() {
        let result = load_ruleset("/nonexistent/rules.json", &token()).await;
        assert!(matches!(result, Err(Error::Ruleset { .. })));
    }

    #[tokio::test]
    async fn test_load_ruleset_from_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rules.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"name": "remote"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/rules.json", server.uri());
        let doc = load_ruleset(&url, &token()).await.unwrap();
        assert_eq!(doc.name.as_deref(), Some("remote"));

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_load_ruleset_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/missing.json", server.uri());
        match load_ruleset(&url, &token()).await {
            Err(Error::Ruleset { message, .. }) => assert!(message.contains("404")),
            other => panic!("expected ruleset error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_load_ruleset_invalid_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let url = format!("{}/rules.json", server.uri());
        assert!(matches!(load_ruleset(&url, &token()).await, Err(Error::Ruleset { .. })));
    }
}
