use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("failed to parse {key}")),
        Err(_) => Ok(default),
    }
}

/// One lock-in tier: progress fraction toward the primary TP, and the
/// R-multiple the stop should be raised to once that progress is reached.
#[derive(Debug, Clone, Copy)]
pub struct LockInLevel {
    pub progress: f64,
    pub lock_r: f64,
}

/// Every tunable enumerated in spec.md §6, built once at startup. Per-owner
/// overrides (risk%, leverage toggle, live-trading flag, fee overrides) live
/// on `Owner`, not here - this struct is process-wide and immutable.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub min_signal_score: f64,
    pub min_confluence_for_signal: u8,
    pub mtf_divergence_penalty: f64,
    pub session_penalty: f64,
    pub session_window_start_utc: u32,
    pub session_window_end_utc: u32,
    pub max_total_penalty: f64,
    pub slippage_bps: u32,
    pub maker_fee: Decimal,
    pub taker_fee: Decimal,
    pub default_cooldown_hours: i64,
    pub max_open_trades: usize,
    pub max_balance_percent_per_trade: Decimal,
    pub risk_per_trade_percent: Decimal,
    pub tp1_pct: Decimal,
    pub tp2_pct: Decimal,
    pub tp3_pct: Decimal,
    pub lock_in_levels: [LockInLevel; 3],
    pub max_sl_distance_pct: f64,
    pub stop_check_grace_minutes: i64,
    pub score_check_grace_minutes: i64,
    pub score_recheck_minutes: i64,
    pub min_trades_for_strategy: u32,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            min_signal_score: env_or("MIN_SIGNAL_SCORE", 52.0)?,
            min_confluence_for_signal: env_or("MIN_CONFLUENCE_FOR_SIGNAL", 2u8)?,
            mtf_divergence_penalty: env_or("MTF_DIVERGENCE_PENALTY", 10.0)?,
            session_penalty: env_or("SESSION_PENALTY", 5.0)?,
            session_window_start_utc: env_or("SESSION_WINDOW_START_UTC", 12u32)?,
            session_window_end_utc: env_or("SESSION_WINDOW_END_UTC", 22u32)?,
            max_total_penalty: env_or("MAX_TOTAL_PENALTY", 25.0)?,
            slippage_bps: env_or("SLIPPAGE_BPS", 5u32)?,
            maker_fee: env_or("MAKER_FEE", Decimal::new(1, 3))?,
            taker_fee: env_or("TAKER_FEE", Decimal::new(1, 3))?,
            default_cooldown_hours: env_or("DEFAULT_COOLDOWN_HOURS", 4i64)?,
            max_open_trades: env_or("MAX_OPEN_TRADES", 3usize)?,
            max_balance_percent_per_trade: env_or("MAX_BALANCE_PERCENT_PER_TRADE", Decimal::new(25, 0))?,
            risk_per_trade_percent: env_or("RISK_PER_TRADE_PERCENT", Decimal::new(2, 0))?,
            tp1_pct: env_or("TP1_PCT", Decimal::new(4, 1))?,
            tp2_pct: env_or("TP2_PCT", Decimal::new(3, 1))?,
            tp3_pct: env_or("TP3_PCT", Decimal::new(3, 1))?,
            lock_in_levels: [
                LockInLevel { progress: 0.5, lock_r: 0.5 },
                LockInLevel { progress: 0.75, lock_r: 0.75 },
                LockInLevel { progress: 0.9, lock_r: 1.0 },
            ],
            max_sl_distance_pct: env_or("MAX_SL_DISTANCE_PCT", 0.15)?,
            stop_check_grace_minutes: env_or("STOP_CHECK_GRACE_MINUTES", 2i64)?,
            score_check_grace_minutes: env_or("SCORE_CHECK_GRACE_MINUTES", 5i64)?,
            score_recheck_minutes: env_or("SCORE_RECHECK_MINUTES", 5i64)?,
            min_trades_for_strategy: env_or("MIN_TRADES_FOR_STRATEGY", 5u32)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = EngineConfig::from_env().unwrap();
        assert_eq!(cfg.min_signal_score, 52.0);
        assert_eq!(cfg.max_open_trades, 3);
        assert_eq!(cfg.lock_in_levels[2].lock_r, 1.0);
    }
}
