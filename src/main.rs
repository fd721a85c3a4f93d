use std::collections::HashMap;

use chrono::Utc;
use clap::Parser;
use rand::Rng;
use signalforge::application::analyzer::{FeatureFlags, SignalAnalyzer};
use signalforge::config::EngineConfig;
use signalforge::domain::market::timeframe::Timeframe;
use signalforge::domain::strategy::StrategyId;
use signalforge::domain::trading::types::{Candle, CoinDescriptor};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Runs a single Signal Analyzer pass over synthetic candles and prints the
/// resulting signal. A real deployment wires this same analyzer against
/// live candle/price sources, the Position Manager, the Stop/TP Loop and
/// the Recheck Engine on their own scheduled ticks.
#[derive(Parser, Debug)]
#[command(name = "signalforge", about = "Multi-timeframe crypto signal engine")]
struct Cli {
    /// Trading symbol, e.g. BTCUSDT
    #[arg(long, default_value = "BTCUSDT")]
    symbol: String,

    /// Number of synthetic hourly candles to generate per timeframe
    #[arg(long, default_value_t = 300)]
    candles: usize,

    /// Random walk seed price
    #[arg(long, default_value_t = 100.0)]
    price: f64,
}

fn synthetic_candles(n: usize, start_price: f64, step_minutes: i64) -> Vec<Candle> {
    let mut rng = rand::rng();
    let mut price = start_price;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let drift = rng.random_range(-0.01..0.012);
        let open = price;
        price = (price * (1.0 + drift)).max(0.01);
        let close = price;
        let high = open.max(close) * (1.0 + rng.random_range(0.0..0.004));
        let low = open.min(close) * (1.0 - rng.random_range(0.0..0.004));
        let volume = rng.random_range(50.0..500.0);
        out.push(Candle { open, high, low, close, volume, open_time: i as i64 * step_minutes * 60_000 });
    }
    out
}

fn build_candle_map(symbol_seed: f64, candle_count: usize) -> HashMap<Timeframe, Vec<Candle>> {
    let mut map = HashMap::new();
    map.insert(Timeframe::D1, synthetic_candles(candle_count, symbol_seed, 24 * 60));
    map.insert(Timeframe::H4, synthetic_candles(candle_count, symbol_seed, 4 * 60));
    map.insert(Timeframe::H1, synthetic_candles(candle_count, symbol_seed, 60));
    map.insert(Timeframe::M15, synthetic_candles(candle_count, symbol_seed, 15));
    map
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    info!(symbol = %cli.symbol, candles = cli.candles, "starting signal analysis pass");

    let config = EngineConfig::from_env()?;
    let coin = CoinDescriptor { id: cli.symbol.to_lowercase(), symbol: cli.symbol.clone() };
    let candle_map = build_candle_map(cli.price, cli.candles);

    let analyzer = SignalAnalyzer::new(&config);
    let trade_counts: HashMap<StrategyId, u32> = HashMap::new();
    let signal = analyzer.analyze(
        &coin,
        &candle_map,
        None,
        None,
        Utc::now(),
        FeatureFlags::default(),
        &trade_counts,
        None,
    );

    println!("{}", serde_json::to_string_pretty(&signal)?);
    Ok(())
}
