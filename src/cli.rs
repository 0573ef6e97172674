use clap::{Args, Parser, Subcommand};

use crate::commands::create::CreateOptions;

#[derive(Parser)]
#[command(name = "wt")]
#[command(version)]
#[command(about = "Ecoscope Workflow Management CLI - Tool for managing ecoscope repositories")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new ecoscope workflow repository from template
    ///
    /// Creates a repository from wildlife-dynamics/wt-template with optional
    /// collaborators and branch protection rules. Omit --name for interactive mode.
    Create(CreateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    /// Repository name (must start with 'wt-', e.g., 'wt-my-workflow')
    #[arg(short, long, default_value = "")]
    pub name: String,

    /// Short description of the workflow repository
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Make the repository private (default)
    #[arg(long, overrides_with = "public")]
    pub private: bool,

    /// Make the repository public
    #[arg(long, overrides_with = "private")]
    pub public: bool,

    /// Organization name (leave empty for personal repo)
    #[arg(short, long, default_value = "")]
    pub org: String,

    /// Comma-separated list: 'user1:role1,user2:role2'. Roles: read, write, admin, maintain, triage
    #[arg(short, long, default_value = "")]
    pub collaborators: String,

    /// Skip the collaborator addition step
    #[arg(long)]
    pub skip_collaborators: bool,

    /// URL or path of a JSON file with branch protection rules
    #[arg(short, long, default_value = "")]
    pub branch_rules: String,

    /// Skip applying branch protection rules
    #[arg(long)]
    pub skip_branch_rules: bool,

    /// Show detailed output for debugging
    #[arg(long)]
    pub verbose: bool,

    /// Preview actions without making changes
    #[arg(long)]
    pub dry_run: bool,
}

impl From<CreateArgs> for CreateOptions {
    fn from(args: CreateArgs) -> Self {
        Self {
            name: args.name,
            description: args.description,
            private: !args.public,
            org: args.org,
            collaborators: args.collaborators,
            skip_collaborators: args.skip_collaborators,
            branch_rules: args.branch_rules,
            skip_branch_rules: args.skip_branch_rules,
            dry_run: args.dry_run,
        }
    }
}
