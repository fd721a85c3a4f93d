use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::domain::errors::TradeError;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::signal::Signal;
use crate::domain::trading::types::{Owner, Side, Trade};

/// Synchronous cached price lookup plus an async fresh fetch, per spec.md §6.
#[async_trait]
pub trait PriceSource: Send + Sync {
    fn price_for(&self, coin_id: &str) -> Option<Decimal>;
    async fn fetch_live_price(&self, coin_id: &str) -> Result<Decimal, TradeError>;
}

/// Supplies the per-timeframe candle maps the Signal Analyzer consumes.
#[async_trait]
pub trait CandleSource: Send + Sync {
    async fn candles(
        &self,
        coin_id: &str,
    ) -> Result<HashMap<Timeframe, Vec<crate::domain::trading::types::Candle>>, TradeError>;
}

#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub accepted: bool,
    pub exchange_order_id: Option<String>,
    pub detail: String,
}

/// Five-operation live-exchange boundary. Failures here never roll back the
/// paper-side trade - they are logged and the paper state stays authoritative.
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    fn is_live(&self, owner: &Owner) -> bool;
    async fn execute_open(&self, owner: &Owner, trade: &Trade, signal: &Signal) -> ExecutionResult;
    async fn execute_partial_close(&self, owner: &Owner, trade: &Trade, portion: Decimal) -> ExecutionResult;
    async fn execute_close(&self, owner: &Owner, trade: &Trade) -> ExecutionResult;
    async fn execute_stop_update(&self, owner: &Owner, trade: &Trade, new_stop: Decimal) -> ExecutionResult;
}

/// Document-like persistence boundary over the Trade entity. No schema is
/// prescribed beyond field presence.
#[async_trait]
pub trait TradeRepository: Send + Sync {
    async fn insert(&self, trade: Trade) -> Result<(), TradeError>;
    async fn get(&self, id: &str) -> Result<Option<Trade>, TradeError>;
    async fn update(&self, trade: Trade) -> Result<(), TradeError>;
    async fn open_trades_for_owner(&self, owner_id: &str) -> Result<Vec<Trade>, TradeError>;
    async fn all_open(&self) -> Result<Vec<Trade>, TradeError>;
    async fn recently_closed_for_coin(
        &self,
        owner_id: &str,
        coin_id: &str,
        side: Side,
        since: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<Trade>, TradeError>;
}
