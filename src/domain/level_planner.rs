use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::indicators::profile::Fibonacci;
use crate::domain::indicators::volatility::VolState;
use crate::domain::market::regime::Regime;
use crate::domain::scoring::Scores;
use crate::domain::strategy::StrategyDef;
use crate::domain::trading::types::Side;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Levels {
    pub stop_loss: Decimal,
    pub take_profit1: Decimal,
    pub take_profit2: Option<Decimal>,
    pub take_profit3: Option<Decimal>,
    pub suggested_leverage: u32,
}

fn to_decimal(v: f64) -> Decimal {
    Decimal::from_f64_retain(v).unwrap_or(Decimal::ZERO)
}

fn from_decimal(v: Decimal) -> f64 {
    v.to_f64().unwrap_or(0.0)
}

/// Plans stop-loss, take-profits, and leverage for a new trade.
///
/// The stop is the tighter of a support/resistance-bound stop and an
/// ATR-multiple-bound stop, but a floor of `max(0.5*ATR, 0.3*ATR*mult)`
/// always wins even if that widens the stop past the S/R-bound candidate
/// (Open Question resolved: floor always wins).
pub struct LevelPlanner;

impl LevelPlanner {
    pub fn plan(
        entry: Decimal,
        atr: f64,
        nearest_support: Option<f64>,
        nearest_resistance: Option<f64>,
        fibonacci: Option<Fibonacci>,
        strategy: &StrategyDef,
        direction: Side,
        scores: &Scores,
        regime: Regime,
        vol_state: VolState,
        leverage_enabled: bool,
    ) -> Levels {
        let entry_f = from_decimal(entry);
        let atr_mult = strategy.atr_mult;

        let sr_bound = match direction {
            Side::Long => nearest_support.map(|s| entry_f - s),
            Side::Short => nearest_resistance.map(|r| r - entry_f),
        };
        let atr_bound = atr * atr_mult;

        let mut stop_distance = match sr_bound {
            Some(d) if d > 0.0 && d < atr_bound => d,
            _ => atr_bound,
        };

        let floor = (0.5 * atr).max(0.3 * atr * atr_mult);
        if stop_distance < floor {
            stop_distance = floor;
        }

        let mut stop_price = match direction {
            Side::Long => entry_f - stop_distance,
            Side::Short => entry_f + stop_distance,
        };

        // Guard against a stop that has been pushed through the entry.
        let through_entry = match direction {
            Side::Long => stop_price >= entry_f,
            Side::Short => stop_price <= entry_f,
        };
        if through_entry {
            stop_distance = floor.max(atr.max(entry_f * 0.001));
            stop_price = match direction {
                Side::Long => entry_f - stop_distance,
                Side::Short => entry_f + stop_distance,
            };
        }

        if let Some(fib) = fibonacci {
            stop_price = refine_with_fibonacci(stop_price, entry_f, fib, direction);
            let refined_distance = match direction {
                Side::Long => entry_f - stop_price,
                Side::Short => stop_price - entry_f,
            };
            stop_distance = refined_distance.max(floor);
            stop_price = match direction {
                Side::Long => entry_f - stop_distance,
                Side::Short => entry_f + stop_distance,
            };
        }

        let one_r = stop_distance;
        let sign = direction.sign();
        let tp1 = entry_f + sign * one_r * strategy.tp1_r;
        let tp2 = if strategy.tp_count >= 2 {
            Some(entry_f + sign * one_r * strategy.tp2_r)
        } else {
            None
        };
        let tp3 = if strategy.tp_count >= 3 {
            Some(entry_f + sign * one_r * strategy.tp3_r)
        } else {
            None
        };

        let leverage = suggested_leverage(scores.total, regime, vol_state, leverage_enabled);

        Levels {
            stop_loss: to_decimal(stop_price),
            take_profit1: to_decimal(tp1),
            take_profit2: tp2.map(to_decimal),
            take_profit3: tp3.map(to_decimal),
            suggested_leverage: leverage,
        }
    }
}

fn refine_with_fibonacci(stop_price: f64, entry_f: f64, fib: Fibonacci, direction: Side) -> f64 {
    // Nudge the stop to the nearest fib level if that level sits strictly
    // between the raw stop and the entry, tightening risk without crossing it.
    let levels = [fib.level_236, fib.level_382, fib.level_500, fib.level_618, fib.level_786];
    match direction {
        Side::Long => levels
            .iter()
            .cloned()
            .filter(|&l| l > stop_price && l < entry_f)
            .min_by(|a, b| a.partial_cmp(b).unwrap())
            .unwrap_or(stop_price),
        Side::Short => levels
            .iter()
            .cloned()
            .filter(|&l| l > entry_f && l < stop_price)
            .max_by(|a, b| a.partial_cmp(b).unwrap())
            .unwrap_or(stop_price),
    }
}

/// Score-tiered leverage: higher conviction unlocks more leverage, subdued
/// in ranging/volatile regimes, capped at 1x in extreme volatility, and
/// forced to 1x whenever the owner has leverage disabled.
fn suggested_leverage(score: f64, regime: Regime, vol_state: VolState, leverage_enabled: bool) -> u32 {
    if !leverage_enabled {
        return 1;
    }
    if vol_state == VolState::Extreme {
        return 1;
    }
    let base = if score >= 85.0 {
        10
    } else if score >= 75.0 {
        7
    } else if score >= 65.0 {
        5
    } else if score >= 55.0 {
        3
    } else if score >= 45.0 {
        2
    } else {
        1
    };
    let tempered = match regime {
        Regime::Ranging | Regime::Volatile | Regime::Mixed => (base / 2).max(1),
        _ => base,
    };
    tempered.max(1)
}
