use clap::{Parser, Subcommand};
use pair_trade_alpaca::AlpacaVenue;
use pair_trade_bybit::BybitVenue;
use pair_trade_core::config::AppConfig;
use pair_trade_core::config_loader::ConfigLoader;
use pair_trade_core::orchestrator::PairTradeOrchestrator;
use pair_trade_kucoin::KucoinVenue;
use pair_trade_ledger::InMemoryLedger;
use pair_trade_web_api::{ApiServer, AppState};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pair-trade")]
#[command(about = "Webhook-driven pair-trade order router", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the order router with web API
    Run {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
    },
    /// Load and validate a config file, then exit
    CheckConfig {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Run { config } => {
            let config = ConfigLoader::load_from(&config)?;
            run(config).await
        }
        Commands::CheckConfig { config } => {
            let config = ConfigLoader::load_from(&config)?;
            tracing::info!(
                development_mode = config.trading.development_mode,
                alpaca_pairs = config.alpaca.pairs.len(),
                bybit_pairs = config.bybit.pairs.len(),
                kucoin_pairs = config.kucoin.pairs.len(),
                "configuration is valid"
            );
            Ok(())
        }
    }
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    let ledger = Arc::new(InMemoryLedger::new());

    let state = AppState {
        alpaca: build_alpaca(&config, ledger.clone()),
        bybit: build_bybit(&config),
        kucoin: build_kucoin(&config),
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    ApiServer::new(state).serve(&addr).await
}

fn build_alpaca(
    config: &AppConfig,
    ledger: Arc<InMemoryLedger>,
) -> Option<PairTradeOrchestrator<AlpacaVenue>> {
    if config.alpaca.pairs.is_empty() {
        tracing::warn!("no alpaca pairs configured, equities routes are inert");
        return None;
    }
    match AlpacaVenue::new(config.alpaca.clone(), config.trading.clone(), ledger) {
        Ok(venue) => Some(PairTradeOrchestrator::new(
            Arc::new(venue),
            config.trading.clone(),
        )),
        Err(err) => {
            tracing::error!(error = %err, "alpaca venue unavailable");
            None
        }
    }
}

fn build_bybit(config: &AppConfig) -> Option<PairTradeOrchestrator<BybitVenue>> {
    if config.bybit.pairs.is_empty() {
        tracing::warn!("no bybit pairs configured, bybit routes are inert");
        return None;
    }
    match BybitVenue::new(config.bybit.clone(), config.trading.clone()) {
        Ok(venue) => Some(PairTradeOrchestrator::new(
            Arc::new(venue),
            config.trading.clone(),
        )),
        Err(err) => {
            tracing::error!(error = %err, "bybit venue unavailable");
            None
        }
    }
}

fn build_kucoin(config: &AppConfig) -> Option<PairTradeOrchestrator<KucoinVenue>> {
    if config.kucoin.pairs.is_empty() {
        tracing::warn!("no kucoin pairs configured, kucoin routes are inert");
        return None;
    }
    match KucoinVenue::new(config.kucoin.clone(), config.trading.clone()) {
        Ok(venue) => Some(PairTradeOrchestrator::new(
            Arc::new(venue),
            config.trading.clone(),
        )),
        Err(err) => {
            tracing::error!(error = %err, "kucoin venue unavailable");
            None
        }
    }
}
