use clap::Parser;
use tracing_subscriber::EnvFilter;

use wt::cli::{Cli, Commands};
use wt::client_factory::OctocrabClientFactory;
use wt::commands::create::Provisioner;
use wt::config::{Settings, LOG_ENV};
use wt::prompt::InquirePrompter;
use wt::ui::Console;

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("wt=debug,octocrab=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let console = Console::stdout();

    let result = match cli.command {
        Commands::Create(args) => {
            init_logging(args.verbose);
            match Settings::from_env() {
                Ok(settings) => {
                    let factory = OctocrabClientFactory::new(settings.api_base.clone());
                    let prompter = InquirePrompter;
                    Provisioner::new(&settings, &factory, &prompter, &console)
                        .run(args.into())
                        .await
                        .map(|_| ())
                }
                Err(e) => Err(e),
            }
        }
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "wt failed");
        console.error(&e.to_string());
        std::process::exit(1);
    }
}
