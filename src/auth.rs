//! GitHub credential resolution and validation.
//!
//! A token is taken from `GITHUB_TOKEN`, then `GH_TOKEN`, then the token
//! store, and finally from an interactive prompt whose answer is stored for
//! later runs. The token is validated by fetching the current user; a 401 or
//! 403 answer triggers a single re-prompt before giving up.

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::client_factory::ClientFactory;
use crate::config::TOKEN_ENV_VARS;
use crate::error::Error;
use crate::github::GitHubClientTrait;
use crate::prompt::Prompter;
use crate::token_store::TokenStore;
use crate::ui::Console;

/// Re-prompts allowed after the first credential is rejected
pub const MAX_REAUTH_ATTEMPTS: usize = 1;

const TOKEN_URL: &str = "https://github.com/settings/tokens/new";

/// Looks up an environment variable; swapped out in tests
pub type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// A validated client together with the identity it authenticated as
pub struct AuthenticatedClient {
    client: Box<dyn GitHubClientTrait>,
    login: String,
    token: SecretString,
}

impl AuthenticatedClient {
    pub fn client(&self) -> &dyn GitHubClientTrait {
        self.client.as_ref()
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    /// The bearer token, for callers that must make raw HTTP requests
    pub fn bearer_token(&self) -> &SecretString {
        &self.token
    }
}

/// Progress of credential validation
enum AuthState {
    Unauthenticated { token: SecretString, reprompts: usize },
    Authenticated(AuthenticatedClient),
    Failed(Error),
}

pub struct AuthManager<'a> {
    store: TokenStore,
    factory: &'a dyn ClientFactory,
    prompter: &'a dyn Prompter,
    console: &'a Console,
    env: EnvLookup,
}

impl<'a> AuthManager<'a> {
    pub fn new(
        store: TokenStore,
        factory: &'a dyn ClientFactory,
        prompter: &'a dyn Prompter,
        console: &'a Console,
    ) -> Self {
        Self {
            store,
            factory,
            prompter,
            console,
            env: Box::new(|key| std::env::var(key).ok()),
        }
    }

    /// Replace the process environment lookup
    pub fn with_env(mut self, env: EnvLookup) -> Self {
        self.env = env;
        self
    }

    /// Resolve a token: environment, then stored file, then prompt
    pub fn resolve(&self, force_prompt: bool) -> Result<SecretString, Error> {
        if !force_prompt {
            for key in TOKEN_ENV_VARS {
                if let Some(token) = (self.env)(key).filter(|value| !value.trim().is_empty()) {
                    debug!(source = key, "Using token from environment");
                    self.console.info("Using token from environment variable");
                    return Ok(SecretString::from(token.trim().to_string()));
                }
            }

            if let Some(token) = self.store.read() {
                self.console.info(&format!(
                    "Using stored token from {}",
                    self.store.path().display()
                ));
                return Ok(token);
            }
        }

        let token = self.prompt_for_token()?;
        self.store.write(&token)?;
        self.console.info(&format!(
            "Token stored securely in {}",
            self.store.path().display()
        ));
        Ok(token)
    }

    /// Resolve a token and validate it
    pub async fn authenticate(&self) -> Result<AuthenticatedClient, Error> {
        let token = self.resolve(false)?;
        self.build_client(token).await
    }

    /// Validate `token` by fetching the current user, re-prompting once on 401/403
    pub async fn build_client(&self, token: SecretString) -> Result<AuthenticatedClient, Error> {
        let mut state = AuthState::Unauthenticated { token, reprompts: 0 };

        loop {
            state = match state {
                AuthState::Unauthenticated { token, reprompts } => {
                    self.attempt(token, reprompts).await
                }
                AuthState::Authenticated(client) => return Ok(client),
                AuthState::Failed(e) => return Err(e),
            };
        }
    }

    async fn attempt(&self, token: SecretString, reprompts: usize) -> AuthState {
        let client = match self.factory.connect(&token) {
            Ok(client) => client,
            Err(e) => return AuthState::Failed(Error::Auth(e.to_string())),
        };

        match client.current_user().await {
            Ok(login) => {
                info!(login = %login, "Authenticated");
                self.console.info(&format!("Authenticated as: {}", login));
                AuthState::Authenticated(AuthenticatedClient { client, login, token })
            }
            Err(e) if e.is_auth_failure() && reprompts < MAX_REAUTH_ATTEMPTS => {
                warn!(error = %e, "Credential rejected");
                self.console.error(&format!("Authentication failed: {}", e));
                self.console.warning("Your token may be expired or invalid.");
                self.console.blank();

                match self.replace_token() {
                    Ok(token) => AuthState::Unauthenticated {
                        token,
                        reprompts: reprompts + 1,
                    },
                    Err(e) => AuthState::Failed(e),
                }
            }
            Err(e) => {
                warn!(error = %e, reprompts, "Authentication failed");
                AuthState::Failed(Error::Auth(e.to_string()))
            }
        }
    }

    fn replace_token(&self) -> Result<SecretString, Error> {
        let token = self.prompt_for_token()?;
        self.store.write(&token)?;
        self.console.info(&format!(
            "New token stored in {}",
            self.store.path().display()
        ));
        Ok(token)
    }

    fn prompt_for_token(&self) -> Result<SecretString, Error> {
        self.console.blank();
        self.console.line("GitHub Token Required");
        self.console.blank();
        self.console.line(format!("Create a token at: {}", TOKEN_URL));
        self.console.blank();
        self.console.line("Required scopes:");
        self.console.line("  • repo - Full control of private repositories");
        self.console.line("  • admin:org - Full control of organizations (if creating org repos)");
        self.console.blank();

        let token = self.prompter.password("Enter your GitHub token")?;
        self.console.blank();

        if token.trim().is_empty() {
            return Err(Error::Auth("no token entered".to_string()));
        }
        let token = SecretString::from(token);
        debug!(length = token.expose_secret().len(), "Read token from prompt");
        Ok(token)
    }
}
