use std::sync::Arc;

use clap::Parser;
use cryptostation::{
    analyzer::{AlertSink, NullSink},
    bot::CommandBot,
    collectors::{HardwareSampler, MarketClient},
    config::Config,
    monitor::MonitorLoop,
    telegram::TelegramClient,
};
use tokio::spawn;
use tracing::{info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Thresholds file (overrides SETTINGS_FILE)
    #[arg(short, long)]
    settings: Option<String>,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("cryptostation", LevelFilter::DEBUG),
        ("cstm", LevelFilter::DEBUG),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();

    let args = Args::parse();
    trace!("started with args: {args:?}");

    let mut config = Config::from_env();
    if let Some(settings) = args.settings {
        config.settings_file = settings.into();
    }

    let sampler = Arc::new(HardwareSampler::new());
    let market = MarketClient::new();

    // Without credentials the system degrades to sampling, logging and
    // persistence; alerts are dropped and no command loop runs.
    let (sink, bot): (Arc<dyn AlertSink>, Option<CommandBot>) = match &config.telegram {
        Some(telegram) => {
            let client = TelegramClient::new(telegram.clone());
            let bot = CommandBot::new(
                client.clone(),
                sampler.clone(),
                market.clone(),
                config.database.clone(),
                config.settings_file.clone(),
            );
            (Arc::new(client), Some(bot))
        }
        None => {
            warn!("Telegram credentials missing, running without notifications");
            (Arc::new(NullSink), None)
        }
    };

    let monitor = MonitorLoop::new(&config, sampler, market, sink);
    spawn(monitor.run());

    match bot {
        Some(bot) => {
            tokio::select! {
                _ = bot.run() => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("graceful shutdown initiated");
                }
            }
        }
        None => {
            tokio::signal::ctrl_c().await?;
            info!("graceful shutdown initiated");
        }
    }

    Ok(())
}
