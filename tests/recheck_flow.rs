//! S6: the Recheck Engine's `take_partial` action ladder requires the trade
//! to not be in profit, stricter than the `Consider partial` message trigger.
//! A weakening long sitting comfortably in profit gets nudged towards
//! `lock_in_profit` instead; the same setup at or below breakeven takes the
//! `take_partial` branch and profit-protection lets it auto-fire.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use signalforge::application::analyzer::FeatureFlags;
use signalforge::application::learning_store::LearningStore;
use signalforge::application::position_manager::PositionManager;
use signalforge::application::recheck_engine::{RecheckEngine, SuggestedAction};
use signalforge::config::EngineConfig;
use signalforge::domain::errors::TradeError;
use signalforge::domain::market::regime::Regime;
use signalforge::domain::market::timeframe::Timeframe;
use signalforge::domain::signal::ScoreBreakdown;
use signalforge::domain::strategy::StrategyId;
use signalforge::domain::trading::types::{Candle, CoinDescriptor, ExecutionStatus, Owner, Side, Trade, TradeStatus};
use signalforge::infrastructure::memory::{InMemoryCandleSource, InMemoryTradeRepository, NullExchangeAdapter};
use signalforge::infrastructure::ports::PriceSource;

struct FixedPriceSource(Decimal);

#[async_trait]
impl PriceSource for FixedPriceSource {
    fn price_for(&self, _coin_id: &str) -> Option<Decimal> {
        Some(self.0)
    }
    async fn fetch_live_price(&self, _coin_id: &str) -> Result<Decimal, TradeError> {
        Ok(self.0)
    }
}

fn owner() -> Owner {
    Owner {
        id: "owner-1".into(),
        balance: dec!(10000),
        max_open_trades: 3,
        max_balance_percent_per_trade: dec!(25),
        risk_per_trade_percent: dec!(2),
        cooldown_hours: 4,
        leverage_enabled: true,
        live_trading_enabled: false,
        auto_execute_enabled: true,
        maker_fee: dec!(0.001),
        taker_fee: dec!(0.001),
        current_streak: 0,
        total_trades: 0,
        total_pnl: dec!(0),
    }
}

fn flat_candles(n: usize, price: f64) -> Vec<Candle> {
    (0..n)
        .map(|i| Candle { open: price, high: price * 1.001, low: price * 0.999, close: price, volume: 100.0, open_time: i as i64 * 3_600_000 })
        .collect()
}

fn weakening_long_near_tp1(entry_time_minutes_ago: i64, take_profit1: Decimal) -> Trade {
    Trade {
        id: "t1".into(),
        owner_id: "owner-1".into(),
        coin: CoinDescriptor { id: "btc".into(), symbol: "BTCUSDT".into() },
        side: Side::Long,
        status: TradeStatus::Open,
        entry_price: dec!(100),
        entry_time: Utc::now() - Duration::minutes(entry_time_minutes_ago),
        position_size: dec!(1000),
        original_position_size: dec!(1000),
        leverage: 1,
        stop_loss: dec!(97),
        original_stop_loss: Some(dec!(97)),
        take_profit1: Some(take_profit1),
        take_profit2: None,
        take_profit3: None,
        trailing_activated: false,
        breakeven_hit: false,
        partial_taken_at_tp1: false,
        partial_taken_at_tp2: false,
        partial_pnl: dec!(0),
        fees_paid: dec!(0),
        score_at_entry: 50.0,
        score_breakdown_at_entry: ScoreBreakdown { trend: 15.0, momentum: 12.0, volume: 10.0, structure: 10.0, volatility: 5.0, risk_quality: 5.0 },
        strategy_type: StrategyId::TrendFollow,
        regime: Regime::Trending,
        score_history: VecDeque::new(),
        score_check: None,
        actions: Vec::new(),
        max_price_seen: dec!(104),
        min_price_seen: dec!(100),
        execution_status: ExecutionStatus::Paper,
        exit_price: None,
        exit_time: None,
        close_reason: None,
        pnl: None,
        pnl_percent: None,
        last_executed_action_id: None,
    }
}

// Fewer than 10 hourly candles forces the flat basic-fallback path, which
// zeroes every score dimension and so reads as a sharp weakening against
// this trade's non-zero entry breakdown, regardless of the fill price.

#[tokio::test]
async fn weakening_long_in_profit_locks_in_instead_of_taking_partial() {
    let config = Arc::new(EngineConfig::from_env().unwrap());
    let repository = Arc::new(InMemoryTradeRepository::new());
    // Price sits 4% above entry: in profit, and within 2% of take_profit1 (106).
    let price_source = Arc::new(FixedPriceSource(dec!(104)));
    let candle_source = Arc::new(InMemoryCandleSource::new());
    let mut candles = HashMap::new();
    candles.insert(Timeframe::H1, flat_candles(5, 100.0));
    candle_source.set("btc", candles).await;
    let exchange = Arc::new(NullExchangeAdapter);
    let learning_store = Arc::new(LearningStore::new());
    let position_manager = Arc::new(PositionManager::new(
        config.clone(),
        repository.clone(),
        exchange,
        price_source.clone(),
        learning_store.clone(),
    ));
    let engine = RecheckEngine::new(config, position_manager, repository, price_source, candle_source, learning_store);

    let mut owner = owner();
    let mut trade = weakening_long_near_tp1(30, dec!(106));
    let bar_time = Utc::now();

    let outcome = engine
        .recheck_one(&mut owner, &mut trade, None, None, FeatureFlags::default(), bar_time)
        .await
        .unwrap()
        .expect("open trade should produce a recheck outcome");

    // `take_partial`'s action-ladder condition additionally requires
    // pnl_pct <= 0.0, stricter than the `Consider partial` message trigger,
    // so a trade sitting 4% in profit falls through to lock-in instead.
    assert_eq!(outcome.suggested_action, SuggestedAction::LockInProfit);
    assert!(outcome.auto_executed);
    assert_eq!(trade.status, TradeStatus::Open);
    assert_eq!(trade.position_size, dec!(1000), "no partial close should have fired while in profit");
    assert_eq!(trade.stop_loss, dec!(101.5), "lock-in should have ratcheted the stop up instead");
}

#[tokio::test]
async fn weakening_long_at_a_loss_takes_partial_and_auto_executes() {
    let config = Arc::new(EngineConfig::from_env().unwrap());
    let repository = Arc::new(InMemoryTradeRepository::new());
    // Price sits 0.5% below entry: a small loss, but still within 2% of take_profit1 (101).
    let price_source = Arc::new(FixedPriceSource(dec!(99.5)));
    let candle_source = Arc::new(InMemoryCandleSource::new());
    let mut candles = HashMap::new();
    candles.insert(Timeframe::H1, flat_candles(5, 100.0));
    candle_source.set("btc", candles).await;
    let exchange = Arc::new(NullExchangeAdapter);
    let learning_store = Arc::new(LearningStore::new());
    let position_manager = Arc::new(PositionManager::new(
        config.clone(),
        repository.clone(),
        exchange,
        price_source.clone(),
        learning_store.clone(),
    ));
    let engine = RecheckEngine::new(config, position_manager, repository, price_source, candle_source, learning_store);

    let mut owner = owner();
    let mut trade = weakening_long_near_tp1(30, dec!(101));
    let bar_time = Utc::now();

    let outcome = engine
        .recheck_one(&mut owner, &mut trade, None, None, FeatureFlags::default(), bar_time)
        .await
        .unwrap()
        .expect("open trade should produce a recheck outcome");

    assert_eq!(outcome.suggested_action, SuggestedAction::TakePartial);
    assert!(outcome.auto_executed, "profit-protection only blocks take_partial while pnl is non-negative");
    assert_eq!(trade.position_size, dec!(500), "half the position should have been closed out");
}
