use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::level_planner::Levels;
use crate::domain::market::regime::Regime;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::scoring::Scores;
use crate::domain::strategy::StrategyId;
use crate::domain::trading::types::{Bias, CoinDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalKind {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

/// Maps a final 0-100 score plus direction onto the five-way signal kind.
/// Thresholds: >=75 strong, >=55 normal, >=48 weak (HOLD-adjacent but still
/// directional in `label`), below that HOLD.
pub fn score_to_signal(final_score: f64, direction: Bias) -> SignalKind {
    match direction {
        Bias::Bull => {
            if final_score >= 75.0 {
                SignalKind::StrongBuy
            } else if final_score >= 55.0 {
                SignalKind::Buy
            } else {
                SignalKind::Hold
            }
        }
        Bias::Bear => {
            if final_score >= 75.0 {
                SignalKind::StrongSell
            } else if final_score >= 55.0 {
                SignalKind::Sell
            } else {
                SignalKind::Hold
            }
        }
        Bias::Neutral => SignalKind::Hold,
    }
}

/// Confluence bonus added to the blended score when multiple timeframes
/// agree on direction: full agreement +10, majority +5, otherwise +0.
pub fn confluence_bonus(confluence_level: u8) -> f64 {
    match confluence_level {
        3 => 10.0,
        2 => 5.0,
        _ => 0.0,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeframeSummary {
    pub timeframe: Timeframe,
    pub score: f64,
    pub direction: Bias,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub trend: f64,
    pub momentum: f64,
    pub volume: f64,
    pub structure: f64,
    pub volatility: f64,
    pub risk_quality: f64,
}

impl From<&Scores> for ScoreBreakdown {
    fn from(s: &Scores) -> Self {
        Self {
            trend: s.trend,
            momentum: s.momentum,
            volume: s.volume,
            structure: s.structure,
            volatility: s.volatility,
            risk_quality: s.risk_quality,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyRanking {
    pub id: StrategyId,
    pub display_score: f64,
    pub direction: Bias,
    pub levels: Levels,
}

/// The Signal Analyzer's final output for one coin. Immutable once produced;
/// the Recheck engine consumes the entry/stop/TP levels it recorded here as
/// the baseline against which drift is measured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub coin: CoinDescriptor,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub final_score: f64,
    pub signal: SignalKind,
    pub direction: Bias,
    pub confidence: f64,
    pub confluence_level: u8,
    pub best_timeframe: Timeframe,
    pub regime: Regime,
    pub chosen_strategy: StrategyId,
    pub top_strategies: Vec<StrategyRanking>,
    pub entry: Decimal,
    pub take_profit1: Decimal,
    pub take_profit2: Option<Decimal>,
    pub take_profit3: Option<Decimal>,
    pub stop_loss: Decimal,
    pub risk_reward: f64,
    pub suggested_leverage: u32,
    pub reasoning: Vec<String>,
    pub score_breakdown: ScoreBreakdown,
    pub timeframe_summaries: Vec<TimeframeSummary>,
}

impl Signal {
    pub fn risk_reward_of(entry: Decimal, stop: Decimal, take_profit: Decimal) -> f64 {
        let risk = (entry - stop).abs();
        if risk.is_zero() {
            return 0.0;
        }
        let reward = (take_profit - entry).abs();
        (reward / risk).to_string().parse::<f64>().unwrap_or(0.0)
    }
}
