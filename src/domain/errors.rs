use rust_decimal::Decimal;
use thiserror::Error;

/// Errors surfaced by the Signal Analyzer pipeline. Per spec.md, analysis
/// itself never throws past the degraded/fallback paths it defines - these
/// variants exist for the boundary layers (data fetch, validation) that
/// feed it.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("no candle data available for {symbol} on {timeframe}")]
    NoCandleData { symbol: String, timeframe: String },

    #[error("insufficient candle history for {symbol}: have {have}, need at least {need}")]
    InsufficientHistory { symbol: String, have: usize, need: usize },

    #[error("invalid candle in {symbol} series at index {index}")]
    InvalidCandle { symbol: String, index: usize },

    #[error("candle source error: {0}")]
    Source(String),
}

/// Errors from Position Manager trade lifecycle operations.
#[derive(Debug, Error)]
pub enum TradeError {
    #[error("insufficient balance: need {need}, available {available}")]
    InsufficientBalance { need: Decimal, available: Decimal },

    #[error("max open trades reached: {current}/{max}")]
    MaxOpenTradesReached { current: usize, max: usize },

    #[error("duplicate open trade for {symbol}")]
    DuplicateOpenTrade { symbol: String },

    #[error("symbol {symbol} is in cooldown until {until}")]
    InCooldown { symbol: String, until: chrono::DateTime<chrono::Utc> },

    #[error("trade {id} not found")]
    NotFound { id: String },

    #[error("trade {id} is already closed")]
    AlreadyClosed { id: String },

    #[error("stop-loss distance {distance_pct:.2}% exceeds max allowed {max_pct:.2}%")]
    StopTooWide { distance_pct: f64, max_pct: f64 },

    #[error("slippage {observed_pct:.3}% exceeds allowed {max_pct:.3}%")]
    ExcessiveSlippage { observed_pct: f64, max_pct: f64 },

    #[error("exchange adapter error: {0}")]
    Exchange(String),

    #[error("repository error: {0}")]
    Repository(String),
}

/// Errors from the Score-Recheck & Action Engine.
#[derive(Debug, Error)]
pub enum RecheckError {
    #[error("no live price available for {symbol}")]
    NoLivePrice { symbol: String },

    #[error("trade {id} is not open")]
    NotOpen { id: String },

    #[error("re-analysis failed for {symbol}: {reason}")]
    ReanalysisFailed { symbol: String, reason: String },

    #[error("auto-execution blocked: {reason}")]
    AutoExecutionBlocked { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyzer_error_messages_include_symbol() {
        let err = AnalyzerError::NoCandleData {
            symbol: "BTCUSDT".into(),
            timeframe: "1h".into(),
        };
        assert!(err.to_string().contains("BTCUSDT"));
    }

    #[test]
    fn trade_error_formats_cooldown() {
        let err = TradeError::InCooldown {
            symbol: "ETHUSDT".into(),
            until: chrono::Utc::now(),
        };
        assert!(err.to_string().contains("ETHUSDT"));
    }
}
