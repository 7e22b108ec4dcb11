use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use shared::{Bot, Config, RunReport};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "post-tweet")]
#[command(about = "Draft a post from today's headlines and publish it")]
struct Args {
    /// Log the post instead of publishing it
    #[arg(long)]
    dry_run: bool,

    /// Path to the state file
    #[arg(long, default_value = shared::state::DEFAULT_STATE_PATH)]
    state: PathBuf,
}

async fn run(args: Args) -> Result<RunReport> {
    let config = Config::from_env()?;

    tracing::info!(
        app_env = %config.app_env,
        timezone = %config.timezone,
        dry_run = config.dry_run || args.dry_run,
        timestamp = %Utc::now().to_rfc3339(),
        "=== Headline poster starting ==="
    );

    let bot = Bot::from_config(&config, args.state)?;
    Ok(bot.run(args.dry_run).await?)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // A panic anywhere still ends the run with a plain failure exit code.
    std::panic::set_hook(Box::new(|info| {
        tracing::error!(panic = %info, "Unhandled panic");
        std::process::exit(1);
    }));

    let args = Args::parse();

    match run(args).await {
        Ok(report) => {
            tracing::info!(
                url = report.url.as_deref().unwrap_or("(dry run)"),
                too_similar = report.too_similar,
                "=== Headline poster completed successfully ==="
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            let message = format!("{:#}", e);
            tracing::error!(error = %message, "=== Headline poster failed ===");
            ExitCode::FAILURE
        }
    }
}
