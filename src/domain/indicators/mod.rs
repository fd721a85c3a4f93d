pub mod correlation;
pub mod moving_average;
pub mod oscillators;
pub mod patterns;
pub mod profile;
pub mod smc;
pub mod structure;
pub mod trend;
pub mod volatility;

use crate::domain::trading::types::Candle;

/// All indicator outputs computed once per (coin, timeframe) candle window.
/// Built once and treated as read-only afterward — no hidden state, no I/O.
#[derive(Debug, Clone)]
pub struct TimeframeAnalysis {
    pub closes: Vec<f64>,
    pub rsi: f64,
    pub macd: oscillators::Macd,
    pub stochastic: oscillators::Stochastic,
    pub atr: f64,
    pub atr_pct: f64,
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
    pub bollinger: volatility::Bollinger,
    pub keltner: volatility::Keltner,
    pub squeeze: bool,
    pub vol_state: volatility::VolState,
    pub swing_highs: Vec<structure::Swing>,
    pub swing_lows: Vec<structure::Swing>,
    pub structure: structure::MarketStructure,
    pub rsi_divergence: Option<structure::DivergenceDirection>,
    pub macd_divergence: Option<structure::DivergenceDirection>,
    pub stochastic_divergence: Option<structure::DivergenceDirection>,
    pub obv_divergence: Option<structure::DivergenceDirection>,
    pub order_block: Option<smc::OrderBlock>,
    pub fair_value_gaps: Vec<smc::FairValueGap>,
    pub liquidity_above: Option<smc::LiquidityCluster>,
    pub liquidity_below: Option<smc::LiquidityCluster>,
    pub pattern: Option<patterns::PatternMatch>,
    pub vwap: f64,
    pub poc: f64,
    pub fibonacci: profile::Fibonacci,
    pub relative_volume: f64,
    pub sma_20: f64,
    pub sma_50: f64,
    /// HTF trend hint injected from the next-wider timeframe, used as context
    /// for pattern/structure scoring rather than recomputed here.
    pub htf_trend_hint: Option<MarketDirectionHint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketDirectionHint {
    Up,
    Down,
    Flat,
}

/// Builds a complete `TimeframeAnalysis` from a raw candle window. Returns
/// `None` only when the window is empty — every other degenerate case
/// (flat series, short history) is absorbed by the individual indicators'
/// own neutral-default fallbacks.
pub fn analyze_candles(
    candles: &[Candle],
    atr_pct_history: &[f64],
    htf_trend_hint: Option<MarketDirectionHint>,
) -> Option<TimeframeAnalysis> {
    if candles.is_empty() {
        return None;
    }
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
    let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();

    let rsi = oscillators::rsi(&closes, 14);
    let macd = oscillators::macd(&closes);
    let stochastic = oscillators::stochastic(&highs, &lows, &closes, 14);
    let atr = volatility::atr(candles, 14);
    let last_close = *closes.last().unwrap();
    let atr_pct = if last_close > 0.0 {
        atr / last_close * 100.0
    } else {
        0.0
    };
    let adx = trend::adx(candles, 14);
    let (plus_di, minus_di) = trend::directional_indicators(candles, 14);
    let bollinger = volatility::bollinger(&closes, 20, 2.0);
    let keltner = volatility::keltner(candles, 20, 1.5);
    let squeeze = volatility::is_squeeze(bollinger, keltner);
    let vol_state = volatility::classify_volatility(atr_pct_history, atr_pct);

    let swing_highs_v = structure::swing_highs(&highs);
    let swing_lows_v = structure::swing_lows(&lows);
    let structure_class = structure::classify_structure(&swing_highs_v, &swing_lows_v);

    // RSI/stochastic indicator series aligned 1:1 to candle index for divergence checks.
    let rsi_series: Vec<f64> = (0..closes.len())
        .map(|i| oscillators::rsi(&closes[..=i], 14))
        .collect();
    let rsi_divergence = structure::detect_divergence(&swing_lows_v, &rsi_series, 14, 2.0)
        .or_else(|| structure::detect_divergence(&swing_highs_v, &rsi_series, 14, 2.0));

    let macd_hist_series: Vec<f64> = (0..closes.len())
        .map(|i| oscillators::macd(&closes[..=i]).histogram)
        .collect();
    let macd_divergence = structure::detect_divergence(&swing_lows_v, &macd_hist_series, 26, 0.0)
        .or_else(|| structure::detect_divergence(&swing_highs_v, &macd_hist_series, 26, 0.0));

    let stochastic_k_series = oscillators::stochastic_k_series(&highs, &lows, &closes, 14);
    let stochastic_divergence =
        structure::detect_divergence(&swing_lows_v, &stochastic_k_series, 14, 2.0)
            .or_else(|| structure::detect_divergence(&swing_highs_v, &stochastic_k_series, 14, 2.0));

    let obv_series = profile::obv_series(candles);
    let obv_divergence = structure::detect_divergence(&swing_lows_v, &obv_series, 0, 0.0)
        .or_else(|| structure::detect_divergence(&swing_highs_v, &obv_series, 0, 0.0));

    let order_block = smc::find_last_order_block(candles, atr, 30);
    let fair_value_gaps = smc::detect_fair_value_gaps(candles);
    let swing_prices: Vec<f64> = swing_highs_v
        .iter()
        .chain(swing_lows_v.iter())
        .map(|s| s.price)
        .collect();
    let (liquidity_above, liquidity_below) =
        smc::find_liquidity_clusters(&swing_prices, last_close);

    let pattern = patterns::detect_last_pattern(candles);
    let vwap = profile::vwap(candles);
    let poc = profile::point_of_control(candles);
    let fibonacci = profile::fibonacci_retracement(candles, 50);

    let avg_volume: f64 = candles.iter().map(|c| c.volume).sum::<f64>() / candles.len() as f64;
    let last_volume = candles.last().unwrap().volume;
    let relative_volume = if avg_volume > 0.0 {
        last_volume / avg_volume
    } else {
        1.0
    };

    let sma_20 = moving_average::sma(&closes, 20);
    let sma_50 = moving_average::sma(&closes, 50);

    Some(TimeframeAnalysis {
        closes,
        rsi,
        macd,
        stochastic,
        atr,
        atr_pct,
        adx,
        plus_di,
        minus_di,
        bollinger,
        keltner,
        squeeze,
        vol_state,
        swing_highs: swing_highs_v,
        swing_lows: swing_lows_v,
        structure: structure_class,
        rsi_divergence,
        macd_divergence,
        stochastic_divergence,
        obv_divergence,
        order_block,
        fair_value_gaps,
        liquidity_above,
        liquidity_below,
        pattern,
        vwap,
        poc,
        fibonacci,
        relative_volume,
        sma_20,
        sma_50,
        htf_trend_hint,
    })
}
