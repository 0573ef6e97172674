use secrecy::SecretString;

use crate::error::Error;
use crate::github::{GitHubClient, GitHubClientTrait};

/// Builds GitHub clients from a credential
pub trait ClientFactory: Send + Sync {
    fn connect(&self, token: &SecretString) -> Result<Box<dyn GitHubClientTrait>, Error>;
}

/// Factory for the real octocrab-backed client
#[derive(Debug, Clone, Default)]
pub struct OctocrabClientFactory {
    api_base: Option<String>,
}

impl OctocrabClientFactory {
    pub fn new(api_base: Option<String>) -> Self {
        Self { api_base }
    }
}

impl ClientFactory for OctocrabClientFactory {
    fn connect(&self, token: &SecretString) -> Result<Box<dyn GitHubClientTrait>, Error> {
        let client = GitHubClient::new(token, self.api_base.as_deref())?;
        Ok(Box::new(client))
    }
}
