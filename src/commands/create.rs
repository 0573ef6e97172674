use tracing::{debug, error, info, instrument, warn};

use crate::auth::{AuthManager, AuthenticatedClient};
use crate::client_factory::ClientFactory;
use crate::collaborators::{parse_collaborators, with_requesting_user, CollaboratorEntry};
use crate::config::Settings;
use crate::error::Error;
use crate::github::{GenerateRepository, RepositoryInfo};
use crate::prompt::Prompter;
use crate::request::{validate_name, OwnerScope, RepositoryRequest};
use crate::ruleset::{load_ruleset, RulesetPayload};
use crate::token_store::TokenStore;
use crate::ui::Console;

const TOTAL_STEPS: usize = 4;

/// Options collected from the command line
#[derive(Debug, Clone)]
pub struct CreateOptions {
    pub name: String,
    pub description: String,
    pub private: bool,
    pub org: String,
    pub collaborators: String,
    pub skip_collaborators: bool,
    pub branch_rules: String,
    pub skip_branch_rules: bool,
    pub dry_run: bool,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            private: true,
            org: String::new(),
            collaborators: String::new(),
            skip_collaborators: false,
            branch_rules: String::new(),
            skip_branch_rules: false,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CollaboratorOutcome {
    Added(CollaboratorEntry),
    /// The entry names the repository owner, who cannot be a collaborator
    SkippedOwner(CollaboratorEntry),
    Failed { entry: CollaboratorEntry, error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RulesetOutcome {
    Applied { name: String },
    SkippedByFlag,
    /// Personal repositories need a paid plan for rulesets
    SkippedPersonal,
    Failed(String),
}

/// What a completed run did
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    pub request: RepositoryRequest,
    /// `None` for dry runs
    pub repository: Option<RepositoryInfo>,
    pub collaborators: Vec<CollaboratorOutcome>,
    pub ruleset: Option<RulesetOutcome>,
}

impl ProvisionReport {
    pub fn is_dry_run(&self) -> bool {
        self.repository.is_none()
    }
}

/// Runs the four provisioning phases in order
pub struct Provisioner<'a> {
    settings: &'a Settings,
    console: &'a Console,
    prompter: &'a dyn Prompter,
    auth: AuthManager<'a>,
}

impl<'a> Provisioner<'a> {
    pub fn new(
        settings: &'a Settings,
        factory: &'a dyn ClientFactory,
        prompter: &'a dyn Prompter,
        console: &'a Console,
    ) -> Self {
        let store = TokenStore::new(settings.config_path.clone());
        Self {
            settings,
            console,
            prompter,
            auth: AuthManager::new(store, factory, prompter, console),
        }
    }

    /// Use a custom auth manager, e.g. one with a fake environment
    pub fn with_auth(mut self, auth: AuthManager<'a>) -> Self {
        self.auth = auth;
        self
    }

    /// Validate, create, add collaborators, apply branch rules.
    ///
    /// Only validation, authentication and creation failures are returned as
    /// errors; collaborator and ruleset failures are recorded in the report.
    pub async fn run(&self, options: CreateOptions) -> Result<ProvisionReport, Error> {
        self.console.header("Ecoscope Workflow Repository Creator");

        let request = self.collect(options.clone())?;
        self.print_summary(&request);

        if options.dry_run {
            self.console.warning("Dry run - no changes will be made");
            return Ok(ProvisionReport {
                request,
                repository: None,
                collaborators: Vec::new(),
                ruleset: None,
            });
        }

        self.console.step(2, TOTAL_STEPS, "Creating Repository");
        let session = self.auth.authenticate().await?;
        let repository = self.create_repository(&session, &request).await?;

        self.console.step(3, TOTAL_STEPS, "Adding Collaborators");
        let collaborators = self.add_collaborators(&session, &request, &repository).await;

        self.console.step(4, TOTAL_STEPS, "Applying Branch Rules");
        let ruleset = self.apply_ruleset(&session, &request, &repository).await;

        self.console.blank();
        self.console.success("Repository setup complete!");
        if let Some(url) = &repository.html_url {
            self.console.field("URL", url);
        }

        Ok(ProvisionReport {
            request,
            repository: Some(repository),
            collaborators,
            ruleset: Some(ruleset),
        })
    }

    /// Phase 1: gather and validate everything before touching the network
    fn collect(&self, options: CreateOptions) -> Result<RepositoryRequest, Error> {
        let interactive = options.name.trim().is_empty();
        let prefix = &self.settings.name_prefix;

        let (name, description, private, org) = if interactive {
            self.console.step(1, TOTAL_STEPS, "Repository Details");
            let name = self.ask_name()?;
            validate_name(&name, prefix)?;
            let description = self.prompter.text("Repository description", "")?;
            let private = self.prompter.confirm("Make repository private?", true)?;
            let org = self
                .prompter
                .text("Organization (leave empty for personal repo)", "")?;
            (name, description, private, org)
        } else {
            self.console.line("Non-interactive mode");
            let name = options.name.trim().to_string();
            validate_name(&name, prefix)?;
            (
                name,
                options.description,
                options.private,
                options.org,
            )
        };

        let collaborators = if options.skip_collaborators {
            None
        } else {
            Some(parse_collaborators(&options.collaborators)?)
        };

        let ruleset = if options.skip_branch_rules {
            None
        } else if options.branch_rules.trim().is_empty() {
            Some(self.settings.ruleset_source.clone())
        } else {
            Some(options.branch_rules.trim().to_string())
        };

        let description = description.trim().to_string();
        Ok(RepositoryRequest {
            name,
            description: (!description.is_empty()).then_some(description),
            private,
            owner: OwnerScope::from_org(&org),
            template: self.settings.template.clone(),
            collaborators,
            ruleset,
        })
    }

    /// Ask for a name until it carries the prefix; an empty answer is fatal
    fn ask_name(&self) -> Result<String, Error> {
        let prefix = &self.settings.name_prefix;
        loop {
            let name = self
                .prompter
                .text(&format!("Repository name (must start with '{}')", prefix), "")?;
            if name.is_empty() {
                return Ok(name);
            }
            match validate_name(&name, prefix) {
                Ok(()) => return Ok(name),
                Err(e) => {
                    debug!(name = %name, "Rejected repository name");
                    self.console.warning(&e.to_string());
                }
            }
        }
    }

    fn print_summary(&self, request: &RepositoryRequest) {
        let collaborators = match &request.collaborators {
            None => "(skipped)".to_string(),
            Some(entries) if entries.is_empty() => "(none)".to_string(),
            Some(entries) => entries
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        };

        self.console.blank();
        self.console.line("Summary:");
        self.console.field("Name", &request.name);
        self.console
            .field("Description", request.description.as_deref().unwrap_or("(none)"));
        self.console
            .field("Visibility", if request.private { "Private" } else { "Public" });
        self.console.field("Owner", &request.owner.to_string());
        self.console.field("Template", &request.template.to_string());
        self.console.field("Collaborators", &collaborators);
        self.console
            .field("Branch rules", request.ruleset.as_deref().unwrap_or("(skipped)"));
        self.console.blank();
    }

    /// Phase 2: any failure here ends the run
    #[instrument(skip_all, fields(name = %request.name, owner = %request.owner))]
    async fn create_repository(
        &self,
        session: &AuthenticatedClient,
        request: &RepositoryRequest,
    ) -> Result<RepositoryInfo, Error> {
        let client = session.client();
        let template = &request.template;

        let template_repo = client
            .get_repository(&template.owner, &template.name)
            .await
            .inspect_err(|e| error!(template = %template, error = %e, "Template lookup failed"))?;
        if !template_repo.is_template {
            warn!(template = %template, "Repository is not marked as a template");
        }

        let owner = match &request.owner {
            OwnerScope::Organization(org) => org.clone(),
            OwnerScope::Personal => session.login().to_string(),
        };
        let generate = GenerateRepository {
            owner,
            name: request.name.clone(),
            description: request.description.clone(),
            private: request.private,
            include_all_branches: false,
        };

        let repository = client
            .create_from_template(template, &generate)
            .await
            .inspect_err(|e| error!(error = %e, "Repository creation failed"))?;

        info!(full_name = %repository.full_name, "Repository created");
        self.console
            .success(&format!("Created repository {}", repository.full_name));
        Ok(repository)
    }

    /// Phase 3: each entry is attempted independently
    #[instrument(skip_all, fields(repo = %repository.full_name))]
    async fn add_collaborators(
        &self,
        session: &AuthenticatedClient,
        request: &RepositoryRequest,
        repository: &RepositoryInfo,
    ) -> Vec<CollaboratorOutcome> {
        let Some(entries) = &request.collaborators else {
            self.console.info("Skipping collaborators (--skip-collaborators)");
            return Vec::new();
        };

        let owner = &repository.owner.login;
        let planned = with_requesting_user(entries.clone(), session.login());
        let mut outcomes = Vec::with_capacity(planned.len());

        for entry in planned {
            if entry.is_user(owner) {
                self.console.info(&format!(
                    "Skipping {} (repository owner)",
                    entry.username
                ));
                outcomes.push(CollaboratorOutcome::SkippedOwner(entry));
                continue;
            }

            match session
                .client()
                .add_collaborator(owner, &repository.name, &entry.username, entry.role)
                .await
            {
                Ok(()) => {
                    self.console
                        .success(&format!("Added {} as {}", entry.username, entry.role));
                    outcomes.push(CollaboratorOutcome::Added(entry));
                }
                Err(e) => {
                    warn!(username = %entry.username, error = %e, "Failed to add collaborator");
                    self.console
                        .error(&format!("Failed to add {}: {}", entry.username, e));
                    outcomes.push(CollaboratorOutcome::Failed {
                        entry,
                        error: e.to_string(),
                    });
                }
            }
        }

        outcomes
    }

    /// Phase 4: organization repositories only; failures are reported, not returned
    #[instrument(skip_all, fields(repo = %repository.full_name))]
    async fn apply_ruleset(
        &self,
        session: &AuthenticatedClient,
        request: &RepositoryRequest,
        repository: &RepositoryInfo,
    ) -> RulesetOutcome {
        let Some(source) = &request.ruleset else {
            self.console.info("Skipping branch rules (--skip-branch-rules)");
            return RulesetOutcome::SkippedByFlag;
        };

        if !request.owner.is_organization() {
            self.console.info(
                "Skipping branch rules: rulesets on personal repositories require a paid plan",
            );
            return RulesetOutcome::SkippedPersonal;
        }

        let payload = match load_ruleset(source, session.bearer_token()).await {
            Ok(document) => RulesetPayload::from(document),
            Err(e) => return self.ruleset_failed(e),
        };

        match session
            .client()
            .create_ruleset(&repository.owner.login, &repository.name, &payload)
            .await
        {
            Ok(()) => {
                self.console
                    .success(&format!("Applied ruleset '{}'", payload.name));
                RulesetOutcome::Applied { name: payload.name }
            }
            Err(e) => self.ruleset_failed(e),
        }
    }

    fn ruleset_failed(&self, e: Error) -> RulesetOutcome {
        warn!(error = %e, "Failed to apply branch rules");
        self.console
            .error(&format!("Failed to apply branch rules: {}", e));
        self.console
            .warning("The repository was created; apply branch rules manually.");
        RulesetOutcome::Failed(e.to_string())
    }
}
