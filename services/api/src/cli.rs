use crate::demo::{run_demo, DemoArgs};
use crate::infra::wizard_defaults;
use crate::server;
use clap::{Args, Parser, Subcommand};
use onboarding_wizard::config::AppConfig;
use onboarding_wizard::error::AppError;
use onboarding_wizard::workflows::onboarding::{
    to_backend, validate_draft, DraftPersistence, FileStore, ValidationContext, WizardSettings,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "Onboarding Wizard",
    about = "Serve and inspect the candidate onboarding wizard",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Inspect or discard a saved draft
    Draft {
        #[command(subcommand)]
        command: DraftCommand,
    },
    /// Walk a sample candidate through the wizard in-process
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum DraftCommand {
    /// Print the saved draft and current step
    Show(DraftArgs),
    /// Print the backend payload the saved draft would produce
    Payload(DraftArgs),
    /// Delete the saved draft
    Reset(DraftArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct DraftArgs {
    /// Candidate whose draft to open
    #[arg(long)]
    pub(crate) owner: String,
    /// Override the configured data directory
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Draft { command } => run_draft(command),
        Command::Demo(args) => run_demo(args).await,
    }
}

fn open_draft(config: &AppConfig, args: &DraftArgs) -> DraftPersistence<FileStore> {
    let root = match &args.data_dir {
        Some(dir) => dir.join("drafts"),
        None => config.storage.drafts_dir(),
    };
    let settings = WizardSettings::for_owner(args.owner.as_str());
    DraftPersistence::new(Arc::new(FileStore::new(root)), &settings.namespace)
}

fn run_draft(command: DraftCommand) -> Result<(), AppError> {
    let config = AppConfig::load()?;

    match command {
        DraftCommand::Show(args) => {
            let persistence = open_draft(&config, &args);
            match persistence.load()? {
                Some(snapshot) => {
                    let view = json!({
                        "owner_id": args.owner,
                        "step": snapshot.step.number(),
                        "section": snapshot.step.label(),
                        "draft": snapshot.draft,
                    });
                    println!("{}", serde_json::to_string_pretty(&view)?);
                }
                None => println!("No saved draft for `{}`.", args.owner),
            }
        }
        DraftCommand::Payload(args) => {
            let persistence = open_draft(&config, &args);
            let Some(snapshot) = persistence.load()? else {
                println!("No saved draft for `{}`.", args.owner);
                return Ok(());
            };

            let ctx = ValidationContext::current()
                .with_all_family_members(config.wizard.validate_all_family_members);
            for report in validate_draft(&snapshot.draft, &ctx) {
                if let Some(message) = report.list_message() {
                    eprintln!("step {}: {message}", report.step.number());
                }
                for message in report.field_messages() {
                    eprintln!("step {}: {message}", report.step.number());
                }
            }

            let defaults = wizard_defaults(&config);
            let payload = to_backend(&snapshot.draft, &defaults.transform)?;
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        DraftCommand::Reset(args) => {
            let persistence = open_draft(&config, &args);
            persistence.clear()?;
            println!("Cleared saved draft for `{}`.", args.owner);
        }
    }

    Ok(())
}
