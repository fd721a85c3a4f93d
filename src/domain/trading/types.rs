use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// A single OHLCV bar. `open_time` is the bar's opening timestamp in ms.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub open_time: i64,
}

impl Candle {
    /// `high >= max(open, close, low)`, `low <= min(open, close, high)`, all positive finite.
    pub fn is_valid(&self) -> bool {
        let values = [self.open, self.high, self.low, self.close, self.volume];
        if values.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return false;
        }
        let body_high = self.open.max(self.close);
        let body_low = self.open.min(self.close);
        self.high >= body_high.max(self.low) && self.low <= body_low.min(self.high)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for Long, -1 for Short. Centralizes the sign flip so scoring, SL/TP
    /// processing and recheck share one piece of direction-aware arithmetic.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    pub fn is_favorable_move(self, reference: f64, candidate: f64) -> bool {
        match self {
            Side::Long => candidate > reference,
            Side::Short => candidate < reference,
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

/// Analyzer-resolved market bias. Distinct from a trade's `Side` because a
/// trade can be held against a bias that has since flipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bias {
    Bull,
    Bear,
    Neutral,
}

impl fmt::Display for Bias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bias::Bull => write!(f, "BULL"),
            Bias::Bear => write!(f, "BEAR"),
            Bias::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

impl Bias {
    pub fn as_side(self) -> Option<Side> {
        match self {
            Bias::Bull => Some(Side::Long),
            Bias::Bear => Some(Side::Short),
            Bias::Neutral => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Paper,
    Pending,
    Filled,
    Partial,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    Manual,
    StoppedOut,
    Tp1,
    Tp2,
    Tp3,
    ScoreExit,
    TrailingTpExit,
    DustCleanup,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    Open,
    BreakevenStop,
    TrailingStop,
    StepLockIn,
    PartialExit,
    ReducePosition,
    Exit,
    StopAdvance,
    TpScrub,
}

/// A single append-only entry in a trade's action log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    pub kind: ActionKind,
    pub description: String,
    pub old_value: Option<Decimal>,
    pub new_value: Option<Decimal>,
    pub market_price: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Identifies a tradable coin independent of any single exchange's symbol spelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CoinDescriptor {
    pub id: String,
    pub symbol: String,
}

/// Per-account risk and execution preferences, passed into operations rather
/// than held as ambient mutable global state.
#[derive(Debug, Clone)]
pub struct Owner {
    pub id: String,
    pub balance: Decimal,
    pub max_open_trades: usize,
    pub max_balance_percent_per_trade: Decimal,
    pub risk_per_trade_percent: Decimal,
    pub cooldown_hours: i64,
    pub leverage_enabled: bool,
    pub live_trading_enabled: bool,
    pub auto_execute_enabled: bool,
    pub maker_fee: Decimal,
    pub taker_fee: Decimal,
    pub current_streak: i64,
    pub total_trades: u64,
    pub total_pnl: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Heat {
    Green,
    Yellow,
    Red,
}

/// Scalar progress snapshot persisted on a trade at every recheck tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreCheckSnapshot {
    pub score: f64,
    pub effective_diff: f64,
    pub heat: Heat,
    pub suggested_action: String,
    pub timestamp: DateTime<Utc>,
}

pub const MAX_SCORE_HISTORY: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub owner_id: String,
    pub coin: CoinDescriptor,
    pub side: Side,
    pub status: TradeStatus,
    pub entry_price: Decimal,
    pub entry_time: DateTime<Utc>,
    pub position_size: Decimal,
    pub original_position_size: Decimal,
    pub leverage: u32,
    pub stop_loss: Decimal,
    pub original_stop_loss: Option<Decimal>,
    pub take_profit1: Option<Decimal>,
    pub take_profit2: Option<Decimal>,
    pub take_profit3: Option<Decimal>,
    pub trailing_activated: bool,
    pub breakeven_hit: bool,
    pub partial_taken_at_tp1: bool,
    pub partial_taken_at_tp2: bool,
    pub partial_pnl: Decimal,
    pub fees_paid: Decimal,
    pub score_at_entry: f64,
    pub score_breakdown_at_entry: crate::domain::signal::ScoreBreakdown,
    pub strategy_type: crate::domain::strategy::StrategyId,
    pub regime: crate::domain::market::regime::Regime,
    pub score_history: VecDeque<ScoreCheckSnapshot>,
    pub score_check: Option<ScoreCheckSnapshot>,
    pub actions: Vec<Action>,
    pub max_price_seen: Decimal,
    pub min_price_seen: Decimal,
    pub execution_status: ExecutionStatus,
    pub exit_price: Option<Decimal>,
    pub exit_time: Option<DateTime<Utc>>,
    pub close_reason: Option<CloseReason>,
    pub pnl: Option<Decimal>,
    pub pnl_percent: Option<f64>,
    pub last_executed_action_id: Option<String>,
}

impl Trade {
    pub fn margin(&self) -> Decimal {
        if self.leverage == 0 {
            return self.position_size;
        }
        self.position_size / Decimal::from(self.leverage)
    }

    pub fn push_score_snapshot(&mut self, snapshot: ScoreCheckSnapshot) {
        self.score_check = Some(snapshot.clone());
        self.score_history.push_back(snapshot);
        while self.score_history.len() > MAX_SCORE_HISTORY {
            self.score_history.pop_front();
        }
    }

    /// One unit of risk in price terms. Falls back to a TP-derived estimate
    /// when the original stop was never recorded (e.g. trade predates the field).
    pub fn one_r(&self) -> Decimal {
        match self.original_stop_loss {
            Some(osl) => (self.entry_price - osl).abs(),
            None => match self.take_profit1.or(self.take_profit2).or(self.take_profit3) {
                Some(tp) => (tp - self.entry_price).abs() / Decimal::from(2),
                None => (self.entry_price - self.stop_loss).abs(),
            },
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }
}
