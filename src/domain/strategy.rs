use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::domain::market::regime::Regime;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::scoring::Scores;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyId {
    TrendFollow,
    Breakout,
    MeanRevert,
    Momentum,
    Scalping,
    Swing,
    Position,
}

impl StrategyId {
    pub fn name(self) -> &'static str {
        match self {
            StrategyId::TrendFollow => "trend_follow",
            StrategyId::Breakout => "breakout",
            StrategyId::MeanRevert => "mean_revert",
            StrategyId::Momentum => "momentum",
            StrategyId::Scalping => "scalping",
            StrategyId::Swing => "swing",
            StrategyId::Position => "position",
        }
    }

    pub fn all() -> [StrategyId; 7] {
        [
            StrategyId::TrendFollow,
            StrategyId::Breakout,
            StrategyId::MeanRevert,
            StrategyId::Momentum,
            StrategyId::Scalping,
            StrategyId::Swing,
            StrategyId::Position,
        ]
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Static per-strategy definition: level-planner table (§4.4) plus the
/// regime gating rules used by selection. A data table with small function
/// bodies, not a class hierarchy per strategy.
#[derive(Debug, Clone, Copy)]
pub struct StrategyDef {
    pub id: StrategyId,
    pub atr_mult: f64,
    pub tp1_r: f64,
    pub tp2_r: f64,
    pub tp3_r: f64,
    pub tp_count: u8,
    /// Six-dimension weighting template (trend, momentum, volume, structure,
    /// volatility, riskQuality), normalized to sum 100, used to compute the
    /// strategy's raw and display scores from a timeframe's Scores.
    pub dim_weights: [f64; 6],
    pub blocked_regimes: &'static [Regime],
    pub soft_penalty: fn(Regime) -> f64,
    pub fit_bonus: fn(Regime) -> f64,
}

fn no_penalty(_: Regime) -> f64 {
    0.0
}

fn no_bonus(_: Regime) -> f64 {
    0.0
}

fn mean_revert_penalty(r: Regime) -> f64 {
    if r == Regime::Compression { -10.0 } else { 0.0 }
}

fn mean_revert_bonus(r: Regime) -> f64 {
    if r == Regime::Ranging { 8.0 } else { 0.0 }
}

fn scalping_penalty(r: Regime) -> f64 {
    match r {
        Regime::Ranging => -8.0,
        Regime::Trending => 8.0,
        _ => 0.0,
    }
}

fn trend_follow_bonus(r: Regime) -> f64 {
    if r == Regime::Trending { 8.0 } else { 0.0 }
}

fn breakout_bonus(r: Regime) -> f64 {
    if r == Regime::Compression { 8.0 } else { 0.0 }
}

pub static STRATEGY_TABLE: [StrategyDef; 7] = [
    StrategyDef {
        id: StrategyId::TrendFollow,
        atr_mult: 2.0,
        tp1_r: 1.5,
        tp2_r: 2.5,
        tp3_r: 4.0,
        tp_count: 3,
        dim_weights: [30.0, 20.0, 15.0, 20.0, 5.0, 10.0],
        blocked_regimes: &[Regime::Ranging],
        soft_penalty: no_penalty,
        fit_bonus: trend_follow_bonus,
    },
    StrategyDef {
        id: StrategyId::Breakout,
        atr_mult: 1.5,
        tp1_r: 1.5,
        tp2_r: 2.5,
        tp3_r: 3.0,
        tp_count: 2,
        dim_weights: [20.0, 20.0, 25.0, 20.0, 10.0, 5.0],
        blocked_regimes: &[Regime::Trending],
        soft_penalty: no_penalty,
        fit_bonus: breakout_bonus,
    },
    StrategyDef {
        id: StrategyId::MeanRevert,
        atr_mult: 1.5,
        tp1_r: 1.5,
        tp2_r: 2.5,
        tp3_r: 3.0,
        tp_count: 2,
        dim_weights: [10.0, 25.0, 15.0, 30.0, 10.0, 10.0],
        blocked_regimes: &[Regime::Trending],
        soft_penalty: mean_revert_penalty,
        fit_bonus: mean_revert_bonus,
    },
    StrategyDef {
        id: StrategyId::Momentum,
        atr_mult: 1.5,
        tp1_r: 1.5,
        tp2_r: 2.5,
        tp3_r: 3.0,
        tp_count: 2,
        dim_weights: [20.0, 35.0, 20.0, 15.0, 5.0, 5.0],
        blocked_regimes: &[],
        soft_penalty: no_penalty,
        fit_bonus: no_bonus,
    },
    StrategyDef {
        id: StrategyId::Scalping,
        atr_mult: 1.2,
        tp1_r: 1.0,
        tp2_r: 1.5,
        tp3_r: 2.0,
        tp_count: 1,
        dim_weights: [15.0, 30.0, 25.0, 15.0, 5.0, 10.0],
        blocked_regimes: &[],
        soft_penalty: scalping_penalty,
        fit_bonus: no_bonus,
    },
    StrategyDef {
        id: StrategyId::Swing,
        atr_mult: 2.0,
        tp1_r: 1.5,
        tp2_r: 2.5,
        tp3_r: 4.0,
        tp_count: 3,
        dim_weights: [25.0, 15.0, 15.0, 25.0, 10.0, 10.0],
        blocked_regimes: &[],
        soft_penalty: no_penalty,
        fit_bonus: no_bonus,
    },
    StrategyDef {
        id: StrategyId::Position,
        atr_mult: 2.5,
        tp1_r: 2.0,
        tp2_r: 3.0,
        tp3_r: 5.0,
        tp_count: 3,
        dim_weights: [35.0, 10.0, 10.0, 20.0, 10.0, 15.0],
        blocked_regimes: &[Regime::Volatile],
        soft_penalty: no_penalty,
        fit_bonus: no_bonus,
    },
];

pub const MIN_TRADES_FOR_STRATEGY: u32 = 5;

fn weighted_score(scores: &Scores, weights: [f64; 6]) -> f64 {
    let sum_weights: f64 = weights.iter().sum();
    if sum_weights <= 0.0 {
        return scores.total;
    }
    let weighted = scores.trend * weights[0]
        + scores.momentum * weights[1]
        + scores.volume * weights[2]
        + scores.structure * weights[3]
        + scores.volatility * weights[4]
        + scores.risk_quality * weights[5];
    // Each dimension's own ceiling differs; normalize against the combined
    // ceiling so weighted_score lands on the same 0-100 scale as `total`.
    let ceiling = 20.0 * weights[0]
        + 20.0 * weights[1]
        + 20.0 * weights[2]
        + 20.0 * weights[3]
        + 10.0 * weights[4]
        + 10.0 * weights[5];
    if ceiling <= 0.0 {
        scores.total
    } else {
        (weighted / ceiling) * 100.0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StrategyCandidate {
    pub id: StrategyId,
    pub raw_score: f64,
    pub display_score: f64,
}

/// Scores every strategy against the available per-timeframe scores (keyed
/// by the timeframes the caller actually analyzed), applying regime
/// block-lists, soft penalties, the scalping noise discount, and the
/// minimum-experience gate. Candidates below `MIN_TRADES_FOR_STRATEGY` are
/// considered only when no alternative clears the bar.
pub fn rank_strategies(
    scores_by_tf: &HashMap<Timeframe, Scores>,
    regime: Regime,
    has_15m: bool,
    trade_counts: &HashMap<StrategyId, u32>,
    learned_weights: Option<&HashMap<StrategyId, [f64; 6]>>,
) -> Vec<StrategyCandidate> {
    let avg_scores = average_scores(scores_by_tf);
    let mut experienced = Vec::new();
    let mut inexperienced = Vec::new();

    for def in STRATEGY_TABLE.iter() {
        if def.blocked_regimes.contains(&regime) {
            continue;
        }
        let weights = learned_weights
            .and_then(|m| m.get(&def.id))
            .copied()
            .unwrap_or(def.dim_weights);

        let mut raw = weighted_score(&avg_scores, def.dim_weights);
        let mut display = weighted_score(&avg_scores, weights);

        raw += (def.soft_penalty)(regime);
        display += (def.soft_penalty)(regime);
        raw += (def.fit_bonus)(regime);

        if def.id == StrategyId::Scalping {
            let discount = if has_15m { 0.92 } else { 0.90 };
            raw *= discount;
            display *= discount;
        }

        let candidate = StrategyCandidate {
            id: def.id,
            raw_score: raw,
            display_score: display,
        };

        let trades = trade_counts.get(&def.id).copied().unwrap_or(0);
        if trades >= MIN_TRADES_FOR_STRATEGY {
            experienced.push(candidate);
        } else {
            inexperienced.push(candidate);
        }
    }

    experienced.sort_by(|a, b| b.raw_score.partial_cmp(&a.raw_score).unwrap());
    if experienced.is_empty() {
        inexperienced.sort_by(|a, b| b.raw_score.partial_cmp(&a.raw_score).unwrap());
        inexperienced
    } else {
        experienced
    }
}

fn average_scores(scores_by_tf: &HashMap<Timeframe, Scores>) -> Scores {
    let n = scores_by_tf.len().max(1) as f64;
    let mut trend = 0.0;
    let mut momentum = 0.0;
    let mut volume = 0.0;
    let mut structure = 0.0;
    let mut volatility = 0.0;
    let mut risk_quality = 0.0;
    let mut bull = 0i32;
    let mut bear = 0i32;

    for scores in scores_by_tf.values() {
        trend += scores.trend;
        momentum += scores.momentum;
        volume += scores.volume;
        structure += scores.structure;
        volatility += scores.volatility;
        risk_quality += scores.risk_quality;
        match scores.direction {
            crate::domain::trading::types::Bias::Bull => bull += 1,
            crate::domain::trading::types::Bias::Bear => bear += 1,
            crate::domain::trading::types::Bias::Neutral => {}
        }
    }
    let direction = if bull > bear {
        crate::domain::trading::types::Bias::Bull
    } else if bear > bull {
        crate::domain::trading::types::Bias::Bear
    } else {
        crate::domain::trading::types::Bias::Neutral
    };
    let trend = trend / n;
    let momentum = momentum / n;
    let volume = volume / n;
    let structure = structure / n;
    let volatility = volatility / n;
    let risk_quality = risk_quality / n;
    Scores {
        trend,
        momentum,
        volume,
        structure,
        volatility,
        risk_quality,
        total: trend + momentum + volume + structure + volatility + risk_quality,
        direction,
        label: crate::domain::scoring::ScoreLabel::Neutral,
    }
}
