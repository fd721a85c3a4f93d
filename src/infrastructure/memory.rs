use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::errors::TradeError;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::trading::types::{Candle, Owner, Side, Trade, TradeStatus};
use crate::infrastructure::ports::{CandleSource, ExchangeAdapter, ExecutionResult, TradeRepository};

/// In-memory stand-in for the out-of-scope durable store. Explicitly test
/// and demo infrastructure, not a production persistence layer.
#[derive(Default, Clone)]
pub struct InMemoryTradeRepository {
    trades: Arc<RwLock<HashMap<String, Trade>>>,
}

impl InMemoryTradeRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TradeRepository for InMemoryTradeRepository {
    async fn insert(&self, trade: Trade) -> Result<(), TradeError> {
        self.trades.write().await.insert(trade.id.clone(), trade);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Trade>, TradeError> {
        Ok(self.trades.read().await.get(id).cloned())
    }

    async fn update(&self, trade: Trade) -> Result<(), TradeError> {
        let mut guard = self.trades.write().await;
        if !guard.contains_key(&trade.id) {
            return Err(TradeError::NotFound { id: trade.id });
        }
        guard.insert(trade.id.clone(), trade);
        Ok(())
    }

    async fn open_trades_for_owner(&self, owner_id: &str) -> Result<Vec<Trade>, TradeError> {
        Ok(self
            .trades
            .read()
            .await
            .values()
            .filter(|t| t.owner_id == owner_id && t.status == TradeStatus::Open)
            .cloned()
            .collect())
    }

    async fn all_open(&self) -> Result<Vec<Trade>, TradeError> {
        Ok(self
            .trades
            .read()
            .await
            .values()
            .filter(|t| t.status == TradeStatus::Open)
            .cloned()
            .collect())
    }

    async fn recently_closed_for_coin(
        &self,
        owner_id: &str,
        coin_id: &str,
        side: Side,
        since: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<Trade>, TradeError> {
        Ok(self
            .trades
            .read()
            .await
            .values()
            .filter(|t| {
                t.owner_id == owner_id
                    && t.coin.id == coin_id
                    && t.side == side
                    && t.status == TradeStatus::Closed
                    && t.exit_time.map(|et| et >= since).unwrap_or(false)
            })
            .cloned()
            .collect())
    }
}

/// Always-paper adapter: `is_live` is always false, and every execute call
/// is a no-op success. Lets the crate run and test standalone without a
/// real exchange connection.
#[derive(Default, Clone, Copy)]
pub struct NullExchangeAdapter;

#[async_trait]
impl ExchangeAdapter for NullExchangeAdapter {
    fn is_live(&self, _owner: &Owner) -> bool {
        false
    }

    async fn execute_open(
        &self,
        _owner: &Owner,
        _trade: &Trade,
        _signal: &crate::domain::signal::Signal,
    ) -> ExecutionResult {
        ExecutionResult {
            accepted: true,
            exchange_order_id: None,
            detail: "paper mode: no live order submitted".into(),
        }
    }

    async fn execute_partial_close(&self, _owner: &Owner, _trade: &Trade, _portion: Decimal) -> ExecutionResult {
        ExecutionResult {
            accepted: true,
            exchange_order_id: None,
            detail: "paper mode: no live order submitted".into(),
        }
    }

    async fn execute_close(&self, _owner: &Owner, _trade: &Trade) -> ExecutionResult {
        ExecutionResult {
            accepted: true,
            exchange_order_id: None,
            detail: "paper mode: no live order submitted".into(),
        }
    }

    async fn execute_stop_update(&self, _owner: &Owner, _trade: &Trade, _new_stop: Decimal) -> ExecutionResult {
        ExecutionResult {
            accepted: true,
            exchange_order_id: None,
            detail: "paper mode: no live order submitted".into(),
        }
    }
}

/// Fixed-snapshot candle source keyed by coin id. Test and demo
/// infrastructure - a live deployment backs `CandleSource` with an
/// exchange's REST/websocket candle feed instead.
#[derive(Default, Clone)]
pub struct InMemoryCandleSource {
    by_coin: Arc<RwLock<HashMap<String, HashMap<Timeframe, Vec<Candle>>>>>,
}

impl InMemoryCandleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, coin_id: &str, candles: HashMap<Timeframe, Vec<Candle>>) {
        self.by_coin.write().await.insert(coin_id.to_string(), candles);
    }
}

#[async_trait]
impl CandleSource for InMemoryCandleSource {
    async fn candles(&self, coin_id: &str) -> Result<HashMap<Timeframe, Vec<Candle>>, TradeError> {
        Ok(self.by_coin.read().await.get(coin_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::regime::Regime;
    use crate::domain::strategy::StrategyId;
    use crate::domain::trading::types::{CoinDescriptor, ExecutionStatus, Side};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::collections::VecDeque;

    fn sample_trade(id: &str) -> Trade {
        Trade {
            id: id.into(),
            owner_id: "owner-1".into(),
            coin: CoinDescriptor { id: "btc".into(), symbol: "BTCUSDT".into() },
            side: Side::Long,
            status: TradeStatus::Open,
            entry_price: dec!(100),
            entry_time: Utc::now(),
            position_size: dec!(1000),
            original_position_size: dec!(1000),
            leverage: 1,
            stop_loss: dec!(97),
            original_stop_loss: Some(dec!(97)),
            take_profit1: Some(dec!(106)),
            take_profit2: None,
            take_profit3: None,
            trailing_activated: false,
            breakeven_hit: false,
            partial_taken_at_tp1: false,
            partial_taken_at_tp2: false,
            partial_pnl: dec!(0),
            fees_paid: dec!(0),
            score_at_entry: 70.0,
            score_breakdown_at_entry: crate::domain::signal::ScoreBreakdown {
                trend: 15.0,
                momentum: 12.0,
                volume: 10.0,
                structure: 10.0,
                volatility: 5.0,
                risk_quality: 5.0,
            },
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
    async fn insert_then_get_round_trips() {
        let repo = InMemoryTradeRepository::new();
        repo.insert(sample_trade("t1")).await.unwrap();
        let fetched = repo.get("t1").await.unwrap();
        assert!(fetched.is_some());
    }

    #[tokio::test]
    async fn update_missing_trade_errors() {
        let repo = InMemoryTradeRepository::new();
        let err = repo.update(sample_trade("missing")).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn null_adapter_is_never_live() {
        let adapter = NullExchangeAdapter;
        let owner = Owner {
            id: "owner-1".into(),
            balance: dec!(10000),
            max_open_trades: 3,
            max_balance_percent_per_trade: dec!(25),
            risk_per_trade_percent: dec!(2),
            cooldown_hours: 4,
            leverage_enabled: true,
            live_trading_enabled: true,
            auto_execute_enabled: true,
            maker_fee: dec!(0.001),
            taker_fee: dec!(0.001),
            current_streak: 0,
            total_trades: 0,
            total_pnl: dec!(0),
        };
        assert!(!adapter.is_live(&owner));
    }
}
