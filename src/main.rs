use chrono::Utc;
use clap::Parser;
use coffee_match::cli::{Cli, Command};
use coffee_match::config::{LoggingSettings, Settings};
use coffee_match::jobs::{JobError, MonthlyCycle};
use coffee_match::services::{CoffeeStore, InMemoryStore, PostgresClient, ReportBuilder, WebhookClient};
use coffee_match::Matcher;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Initialize logging; `RUST_LOG` wins over the configured level
fn init_tracing(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    match logging.format.as_str() {
        "pretty" => subscriber.pretty().init(),
        "compact" => subscriber.compact().init(),
        _ => subscriber.init(),
    }
}

async fn open_store(settings: &Settings, fixture: Option<&Path>) -> Result<Arc<dyn CoffeeStore>, JobError> {
    let store: Arc<dyn CoffeeStore> = match fixture {
        Some(path) => {
            info!("Using fixture store from {}", path.display());
            Arc::new(InMemoryStore::from_fixture_file(path).await?)
        }
        None => Arc::new(PostgresClient::from_settings(&settings.database).await?),
    };
    Ok(store)
}

async fn execute(settings: &Settings, command: Command) -> Result<(), JobError> {
    let notifier = WebhookClient::from_settings(&settings.webhook)?;
    if notifier.is_none() {
        info!("No webhook configured, messages will only be logged");
    }

    let matcher = Matcher::new(settings.ranking_weights(), settings.matching.unfavourable());
    info!(
        "Matcher initialized with weights: {:?}, {} unfavourable pairs",
        matcher.weights(),
        matcher.unfavourable().len()
    );
    let reports = ReportBuilder::from_settings(&settings.report);

    match command {
        Command::Run(args) => {
            let store = open_store(settings, args.fixture.as_deref()).await?;
            let job = MonthlyCycle::new(store, matcher, reports, notifier);
            let options = args.cycle_options();

            let outcome = job.run(Utc::now(), &options).await?;
            info!(
                "Cycle complete: {} matches, {} recorded, posted: {}",
                outcome.matches.len(),
                outcome.recorded.len(),
                outcome.posted
            );
            if outcome.ignored_records > 0 {
                info!("{} history records were ignored as inconsistent", outcome.ignored_records);
            }
            if args.json {
                println!("{}", serde_json::to_string_pretty(&outcome.matches)?);
            } else if options.dry_run || !outcome.posted {
                println!("{}", outcome.message);
            }
        }
        Command::Announce { meeting_id, fixture } => {
            let store = open_store(settings, fixture.as_deref()).await?;
            let job = MonthlyCycle::new(store, matcher, reports, notifier);

            let message = job.announce_success(meeting_id).await?;
            println!("{}", message);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let settings = match Settings::load_with(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            init_tracing(&LoggingSettings::default());
            error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&settings.logging);
    info!("Configuration loaded successfully");

    match execute(&settings, cli.command_or_default()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
