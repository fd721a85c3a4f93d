use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::indicators::volatility::VolState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Regime {
    Compression,
    Volatile,
    Trending,
    Ranging,
    Mixed,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Regime::Compression => "compression",
            Regime::Volatile => "volatile",
            Regime::Trending => "trending",
            Regime::Ranging => "ranging",
            Regime::Mixed => "mixed",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RegimeInputs {
    pub daily_adx: f64,
    pub h4_adx: f64,
    pub daily_trend_directional: bool,
    pub h4_bb_inside_kc: bool,
    pub daily_vol_state: VolState,
    pub h4_vol_state: VolState,
}

/// Compression and volatility are checked before trend/range so a squeeze on
/// 4h always wins even if the daily ADX also happens to be high.
pub fn detect_regime(inputs: RegimeInputs) -> Regime {
    if inputs.h4_bb_inside_kc {
        return Regime::Compression;
    }
    if matches!(inputs.daily_vol_state, VolState::High | VolState::Extreme)
        || matches!(inputs.h4_vol_state, VolState::High | VolState::Extreme)
    {
        return Regime::Volatile;
    }
    let max_adx = inputs.daily_adx.max(inputs.h4_adx);
    if max_adx >= 30.0 && inputs.daily_trend_directional {
        return Regime::Trending;
    }
    if max_adx >= 25.0 {
        // Strong ADX alone (direction unclear) still counts as trending.
        return Regime::Trending;
    }
    if max_adx < 20.0 {
        return Regime::Ranging;
    }
    Regime::Mixed
}
