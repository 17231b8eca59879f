//! Wishline: birthday and anniversary reminder dispatch.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use wishline_channels::HttpDeliveryGateway;
use wishline_core::config::WishlineConfig;
use wishline_core::traits::GreetingGenerator;
use wishline_gateway::AppState;
use wishline_scheduler::ReminderScheduler;
use wishline_store::ReminderStore;

#[derive(Parser)]
#[command(name = "wishline", version, about = "Reminder dispatch engine")]
struct Cli {
    /// Config file path (defaults to ~/.wishline/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP gateway, plus the internal trigger when configured
    Serve,
    /// Execute a single dispatch run and print the summary as JSON
    RunOnce,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => WishlineConfig::load_from(path)?,
        None => WishlineConfig::load()?,
    };

    let store = Arc::new(ReminderStore::open(&config.store.resolve_path())?);
    let generator: Arc<dyn GreetingGenerator> =
        Arc::from(wishline_providers::create_generator(&config.llm)?);
    let deliverer = Arc::new(HttpDeliveryGateway::new());
    let scheduler = Arc::new(ReminderScheduler::new(
        store.clone(),
        generator,
        deliverer,
        &config.scheduler,
    ));

    match cli.command {
        Command::RunOnce => {
            let summary = scheduler.run().await;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Serve => {
            if config.scheduler.tick_interval_secs > 0 {
                let tick = config.scheduler.tick_interval_secs;
                let scheduler = scheduler.clone();
                tokio::spawn(async move {
                    let mut interval =
                        tokio::time::interval(std::time::Duration::from_secs(tick));
                    loop {
                        interval.tick().await;
                        let summary = scheduler.run().await;
                        tracing::info!(
                            "Scheduled run: {} sent, {} errors",
                            summary.messages_sent,
                            summary.errors.len()
                        );
                    }
                });
                tracing::info!("Internal trigger enabled (every {tick}s)");
            }

            let state = AppState { store, scheduler };
            wishline_gateway::serve(state, &config.gateway.host, config.gateway.port).await?;
        }
    }

    Ok(())
}
