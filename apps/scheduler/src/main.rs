use std::time::Duration;

use clap::Parser;
use dotenv::dotenv;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod runner;

use runner::{Passes, RunOptions};
use shared_config::AppConfig;
use shared_utils::ConsolePrompt;

/// Books pending home visits in Amplimed from the management spreadsheet
#[derive(Parser, Debug)]
#[command(name = "home-visit-scheduler")]
#[command(about = "Books first and follow-up home visits in Amplimed and records them in the visits sheet")]
struct Args {
    /// Resolve every visit and log the booking without submitting it or writing to the sheet
    #[arg(long)]
    dry_run: bool,

    /// Ask before moving on after every booking (also ALWAYS_CONFIRM_BEFORE_PROCEED=SIM)
    #[arg(long)]
    confirm_each: bool,

    /// Which pass to run
    #[arg(long, value_enum, default_value_t = Passes::All)]
    only: Passes,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    info!("Starting home visit scheduler");

    // Load configuration
    let config = AppConfig::from_env();
    config.validate(!args.dry_run)?;
    info!("Environment: {}", config.environment);

    let options = RunOptions {
        dry_run: args.dry_run,
        confirm_each: args.confirm_each || config.always_confirm_before_proceed,
        passes: args.only,
        wait: Duration::from_secs(config.wait_time_seconds),
    };

    let summary = runner::run(&config, &options, &ConsolePrompt).await?;
    summary.log();

    if summary.aborted {
        error!("Run stopped before every visit was processed");
        std::process::exit(1);
    }

    info!("Run finished");
    Ok(())
}
