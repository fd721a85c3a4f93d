//! S5: breakeven advances the stop on a 1R move, then a subsequent pullback
//! to that stop closes the trade as STOPPED_OUT.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock as StdRwLock};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use signalforge::application::learning_store::LearningStore;
use signalforge::application::position_manager::PositionManager;
use signalforge::application::stop_tp_loop::StopTpLoop;
use signalforge::config::EngineConfig;
use signalforge::domain::errors::TradeError;
use signalforge::domain::market::regime::Regime;
use signalforge::domain::signal::ScoreBreakdown;
use signalforge::domain::strategy::StrategyId;
use signalforge::domain::trading::types::{CloseReason, CoinDescriptor, ExecutionStatus, Owner, Side, Trade, TradeStatus};
use signalforge::infrastructure::memory::{InMemoryTradeRepository, NullExchangeAdapter};
use signalforge::infrastructure::ports::{PriceSource, TradeRepository};
use tokio::sync::Mutex;

struct SettablePriceSource(StdRwLock<Decimal>);

impl SettablePriceSource {
    fn new(initial: Decimal) -> Self {
        Self(StdRwLock::new(initial))
    }
    fn set(&self, price: Decimal) {
        *self.0.write().unwrap() = price;
    }
}

#[async_trait]
impl PriceSource for SettablePriceSource {
    fn price_for(&self, _coin_id: &str) -> Option<Decimal> {
        Some(*self.0.read().unwrap())
    }
    async fn fetch_live_price(&self, _coin_id: &str) -> Result<Decimal, TradeError> {
        Ok(*self.0.read().unwrap())
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

fn long_trade_no_tps() -> Trade {
    Trade {
        id: "t1".into(),
        owner_id: "owner-1".into(),
        coin: CoinDescriptor { id: "btc".into(), symbol: "BTCUSDT".into() },
        side: Side::Long,
        status: TradeStatus::Open,
        entry_price: dec!(100),
        entry_time: Utc::now() - Duration::minutes(10),
        position_size: dec!(1000),
        original_position_size: dec!(1000),
        leverage: 1,
        stop_loss: dec!(97),
        original_stop_loss: Some(dec!(97)),
        take_profit1: None,
        take_profit2: None,
        take_profit3: None,
        trailing_activated: false,
        breakeven_hit: false,
        partial_taken_at_tp1: false,
        partial_taken_at_tp2: false,
        partial_pnl: dec!(0),
        fees_paid: dec!(0),
        score_at_entry: 70.0,
        score_breakdown_at_entry: ScoreBreakdown { trend: 15.0, momentum: 12.0, volume: 10.0, structure: 10.0, volatility: 5.0, risk_quality: 5.0 },
        strategy_type: StrategyId::TrendFollow,
        regime: Regime::Trending,
        score_history: VecDeque::new(),
        score_check: None,
        actions: Vec::new(),
        max_price_seen: dec!(100),
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

#[tokio::test]
async fn breakeven_advance_then_pullback_stops_out() {
    let config = Arc::new(EngineConfig::from_env().unwrap());
    let repository = Arc::new(InMemoryTradeRepository::new());
    let price_source = Arc::new(SettablePriceSource::new(dec!(100)));
    let exchange = Arc::new(NullExchangeAdapter);
    let learning_store = Arc::new(LearningStore::new());
    let position_manager = Arc::new(PositionManager::new(
        config.clone(),
        repository.clone(),
        exchange,
        price_source.clone(),
        learning_store,
    ));
    let loop_ = StopTpLoop::new(config, position_manager, repository.clone(), price_source.clone());

    let trade = long_trade_no_tps();
    repository.insert(trade.clone()).await.unwrap();

    let mut owners = HashMap::new();
    owners.insert("owner-1".to_string(), Arc::new(Mutex::new(owner())));

    // One R above entry (entry + 3): breakeven should fire, trailing should not yet.
    price_source.set(dec!(104));
    loop_.tick(&owners).await;
    let after_first = repository.get("t1").await.unwrap().unwrap();
    assert_eq!(after_first.status, TradeStatus::Open);
    assert!(after_first.breakeven_hit);
    assert_eq!(after_first.stop_loss, dec!(100));
    assert!(!after_first.trailing_activated);

    // Pull back through the new breakeven stop.
    price_source.set(dec!(99));
    loop_.tick(&owners).await;
    let after_second = repository.get("t1").await.unwrap().unwrap();
    assert_eq!(after_second.status, TradeStatus::Closed);
    assert_eq!(after_second.close_reason, Some(CloseReason::StoppedOut));
}
