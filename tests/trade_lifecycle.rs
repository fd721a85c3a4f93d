//! S4: open → partial close → full close cascade, plus the reject paths
//! around it (duplicate coin, cooldown-free balance debit).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use signalforge::application::learning_store::LearningStore;
use signalforge::application::position_manager::PositionManager;
use signalforge::config::EngineConfig;
use signalforge::domain::errors::TradeError;
use signalforge::domain::market::regime::Regime;
use signalforge::domain::market::timeframe::Timeframe;
use signalforge::domain::signal::{ScoreBreakdown, Signal, SignalKind};
use signalforge::domain::strategy::StrategyId;
use signalforge::domain::trading::types::{Bias, CloseReason, CoinDescriptor, Owner, Side, TradeStatus};
use signalforge::infrastructure::memory::{InMemoryTradeRepository, NullExchangeAdapter};
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

fn sample_signal() -> Signal {
    Signal {
        coin: CoinDescriptor { id: "btc".into(), symbol: "BTCUSDT".into() },
        generated_at: Utc::now(),
        final_score: 70.0,
        signal: SignalKind::Buy,
        direction: Bias::Bull,
        confidence: 70.0,
        confluence_level: 3,
        best_timeframe: Timeframe::H1,
        regime: Regime::Trending,
        chosen_strategy: StrategyId::TrendFollow,
        top_strategies: vec![],
        entry: dec!(100),
        take_profit1: dec!(106),
        take_profit2: Some(dec!(110)),
        take_profit3: Some(dec!(116)),
        stop_loss: dec!(97),
        risk_reward: 2.5,
        suggested_leverage: 5,
        reasoning: vec![],
        score_breakdown: ScoreBreakdown { trend: 15.0, momentum: 12.0, volume: 10.0, structure: 10.0, volatility: 5.0, risk_quality: 5.0 },
        timeframe_summaries: vec![],
    }
}

fn manager(price: Decimal) -> PositionManager<InMemoryTradeRepository, NullExchangeAdapter, FixedPriceSource> {
    PositionManager::new(
        Arc::new(EngineConfig::from_env().unwrap()),
        Arc::new(InMemoryTradeRepository::new()),
        Arc::new(NullExchangeAdapter),
        Arc::new(FixedPriceSource(price)),
        Arc::new(LearningStore::new()),
    )
}

#[tokio::test]
async fn open_partial_close_then_full_close_cascade() {
    let mgr = manager(dec!(100));
    let mut own = owner();
    let signal = sample_signal();

    let mut trade = mgr.open(&mut own, &signal).await.unwrap();
    assert_eq!(trade.status, TradeStatus::Open);
    let balance_after_open = own.balance;
    assert!(balance_after_open < dec!(10000));

    let half = trade.position_size / dec!(2);
    mgr.partial_close(&mut own, &mut trade, half, dec!(108)).await.unwrap();
    assert_eq!(trade.status, TradeStatus::Open);
    assert!(trade.partial_taken_at_tp1);
    assert!(own.balance > balance_after_open, "partial close at a profit should credit more than it locked up");

    mgr.close(&mut own, &mut trade, dec!(112), CloseReason::Manual).await.unwrap();
    assert_eq!(trade.status, TradeStatus::Closed);
    assert_eq!(trade.close_reason, Some(CloseReason::Manual));
    assert!(trade.pnl.unwrap() > Decimal::ZERO, "long trade closed above entry should realize a profit");
    assert_eq!(own.total_trades, 1);
}

#[tokio::test]
async fn duplicate_open_for_same_coin_is_rejected() {
    let mgr = manager(dec!(100));
    let mut own = owner();
    let signal = sample_signal();
    mgr.open(&mut own, &signal).await.unwrap();
    let err = mgr.open(&mut own, &signal).await;
    assert!(matches!(err, Err(TradeError::DuplicateOpenTrade { .. })));
}

#[tokio::test]
async fn stop_wider_than_max_distance_is_rejected() {
    let mgr = manager(dec!(100));
    let mut own = owner();
    let mut signal = sample_signal();
    signal.stop_loss = dec!(50); // 50% away, far past the configured 15% ceiling
    let err = mgr.open(&mut own, &signal).await;
    assert!(matches!(err, Err(TradeError::StopTooWide { .. })));
}

#[tokio::test]
async fn partial_close_remainder_under_dust_floor_promotes_to_full_close() {
    let mgr = manager(dec!(100));
    let mut own = owner();
    let signal = sample_signal();
    let mut trade = mgr.open(&mut own, &signal).await.unwrap();

    let almost_all = trade.position_size - dec!(0.01);
    mgr.partial_close(&mut own, &mut trade, almost_all, dec!(105)).await.unwrap();
    assert_eq!(trade.status, TradeStatus::Closed);
    assert_eq!(trade.close_reason, Some(CloseReason::DustCleanup));
}
