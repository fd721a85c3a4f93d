use crate::domain::indicators::structure::MarketStructure;
use crate::domain::indicators::volatility::VolState;
use crate::domain::indicators::{MarketDirectionHint, TimeframeAnalysis};
use crate::domain::trading::types::Bias;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreLabel {
    StrongBullish,
    Bullish,
    StrongBearish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy)]
pub struct Scores {
    pub trend: f64,
    pub momentum: f64,
    pub volume: f64,
    pub structure: f64,
    pub volatility: f64,
    pub risk_quality: f64,
    pub total: f64,
    pub direction: Bias,
    pub label: ScoreLabel,
}

struct Accumulator {
    value: f64,
    ceiling: f64,
    bull_points: f64,
    bear_points: f64,
}

impl Accumulator {
    fn new(ceiling: f64) -> Self {
        Self {
            value: 0.0,
            ceiling,
            bull_points: 0.0,
            bear_points: 0.0,
        }
    }

    fn add(&mut self, amount: f64) {
        self.value = (self.value + amount).clamp(0.0, self.ceiling);
    }

    fn add_bull(&mut self, amount: f64, points: f64) {
        self.add(amount);
        self.bull_points += points;
    }

    fn add_bear(&mut self, amount: f64, points: f64) {
        self.add(amount);
        self.bear_points += points;
    }
}

/// Pure six-dimension scoring for one timeframe's already-computed indicators.
/// `htf_hint` is the direction hint carried down from the next-wider timeframe.
pub fn score_timeframe(ta: &TimeframeAnalysis, htf_hint: Option<MarketDirectionHint>) -> Scores {
    let mut trend = Accumulator::new(20.0);
    let mut momentum = Accumulator::new(20.0);
    let mut volume = Accumulator::new(20.0);
    let mut structure = Accumulator::new(20.0);
    let mut volatility = Accumulator::new(10.0);
    let mut risk_quality = Accumulator::new(10.0);

    // --- Trend ---
    match ta.structure {
        MarketStructure::Bullish => trend.add_bull(6.0, 2.0),
        MarketStructure::Bearish => trend.add_bear(6.0, 2.0),
        MarketStructure::BreakUp => trend.add_bull(3.0, 1.0),
        MarketStructure::BreakDown => trend.add_bear(3.0, 1.0),
        MarketStructure::Ranging | MarketStructure::Unknown => {}
    }
    if ta.adx >= 30.0 {
        if ta.plus_di > ta.minus_di {
            trend.add_bull(6.0, 2.0);
        } else {
            trend.add_bear(6.0, 2.0);
        }
    } else if ta.adx >= 20.0 {
        if ta.plus_di > ta.minus_di {
            trend.add_bull(3.0, 1.0);
        } else {
            trend.add_bear(3.0, 1.0);
        }
    }
    let last_close = ta.closes.last().copied().unwrap_or(0.0);
    if last_close > ta.sma_20 && ta.sma_20 > ta.sma_50 {
        trend.add_bull(5.0, 2.0);
    } else if last_close < ta.sma_20 && ta.sma_20 < ta.sma_50 {
        trend.add_bear(5.0, 2.0);
    }
    if let Some(hint) = ta.htf_trend_hint.or(htf_hint) {
        match hint {
            MarketDirectionHint::Up => trend.add_bull(3.0, 1.0),
            MarketDirectionHint::Down => trend.add_bear(3.0, 1.0),
            MarketDirectionHint::Flat => {}
        }
    }

    // --- Momentum ---
    if ta.rsi >= 70.0 {
        momentum.add_bull(3.0, 1.0); // strong but extended: weighed less than mid-range breakout
    } else if ta.rsi >= 55.0 {
        momentum.add_bull(6.0, 2.0);
    } else if ta.rsi <= 30.0 {
        momentum.add_bear(3.0, 1.0);
    } else if ta.rsi <= 45.0 {
        momentum.add_bear(6.0, 2.0);
    }
    if ta.macd.line > ta.macd.signal {
        momentum.add_bull(4.0, 1.0);
    } else {
        momentum.add_bear(4.0, 1.0);
    }
    if ta.stochastic.k >= 80.0 && ta.stochastic.k < ta.stochastic.d {
        momentum.add_bear(2.0, 1.0);
    } else if ta.stochastic.k <= 20.0 && ta.stochastic.k > ta.stochastic.d {
        momentum.add_bull(2.0, 1.0);
    } else if ta.stochastic.k > ta.stochastic.d {
        momentum.add_bull(2.0, 0.0);
    } else {
        momentum.add_bear(2.0, 0.0);
    }
    if ta.macd.histogram > 0.0 {
        momentum.add_bull(3.0, 1.0);
    } else {
        momentum.add_bear(3.0, 1.0);
    }
    if let Some(pattern) = ta.pattern {
        let bonus = pattern.strength * 2.0;
        if pattern.bullish {
            momentum.add_bull(bonus, 1.0);
        } else {
            momentum.add_bear(bonus, 1.0);
        }
    }

    // --- Volume ---
    if ta.relative_volume >= 2.0 {
        volume.add(8.0);
    } else if ta.relative_volume >= 1.5 {
        volume.add(5.0);
    } else if ta.relative_volume >= 1.0 {
        volume.add(2.0);
    }
    match ta.structure {
        MarketStructure::Bullish => volume.add_bull(3.0, 1.0),
        MarketStructure::Bearish => volume.add_bear(3.0, 1.0),
        _ => {}
    }
    if ta.relative_volume >= 3.0 {
        volume.add(3.0); // climax volume
    }
    if last_close >= ta.vwap {
        volume.add_bull(3.0, 1.0);
    } else {
        volume.add_bear(3.0, 1.0);
    }
    if ta.atr > 0.0 && (last_close - ta.vwap).abs() <= 0.5 * ta.atr {
        volume.add(3.0);
    }

    // --- Structure ---
    match ta.structure {
        MarketStructure::Bullish => structure.add_bull(6.0, 2.0),
        MarketStructure::Bearish => structure.add_bear(6.0, 2.0),
        MarketStructure::BreakUp => structure.add_bull(4.0, 1.0),
        MarketStructure::BreakDown => structure.add_bear(4.0, 1.0),
        _ => {}
    }
    if let (Some(lo), Some(hi)) = (ta.swing_lows.last(), ta.swing_highs.last()) {
        let range = (hi.price - lo.price).max(1e-9);
        let position = (last_close - lo.price) / range;
        if position <= 0.3 {
            structure.add_bull(4.0, 1.0);
        } else if position >= 0.7 {
            structure.add_bear(4.0, 1.0);
        }
    }
    let bb_width = (ta.bollinger.upper - ta.bollinger.lower).max(1e-9);
    let bb_position = (last_close - ta.bollinger.lower) / bb_width;
    if bb_position <= 0.2 {
        structure.add_bull(3.0, 1.0);
    } else if bb_position >= 0.8 {
        structure.add_bear(3.0, 1.0);
    }
    if let Some(ob) = ta.order_block {
        match ob.side {
            crate::domain::indicators::smc::BlockSide::Bullish => structure.add_bull(2.0, 1.0),
            crate::domain::indicators::smc::BlockSide::Bearish => structure.add_bear(2.0, 1.0),
        }
    }
    if !ta.fair_value_gaps.is_empty() {
        structure.add(2.0);
    }
    if ta.liquidity_above.is_some() || ta.liquidity_below.is_some() {
        structure.add(1.0);
    }
    if let Some(pattern) = ta.pattern {
        let bonus = pattern.strength * 2.0;
        if pattern.bullish {
            structure.add_bull(bonus, 1.0);
        } else {
            structure.add_bear(bonus, 1.0);
        }
    }

    // --- Volatility ---
    if ta.squeeze {
        volatility.add(3.0);
    }
    match ta.vol_state {
        VolState::Low => volatility.add(3.0),
        VolState::Normal => volatility.add(2.0),
        VolState::High => volatility.add(0.5),
        VolState::Extreme => {}
    }
    if ta.adx >= 25.0 && matches!(ta.vol_state, VolState::Low | VolState::Normal) {
        volatility.add(3.0);
    }

    // --- Risk quality ---
    if let (Some(lo), Some(hi)) = (ta.swing_lows.last(), ta.swing_highs.last()) {
        let range_pct = (hi.price - lo.price).abs() / last_close.max(1e-9) * 100.0;
        if range_pct > 0.0 && range_pct <= 8.0 {
            risk_quality.add(3.0);
        }
    }
    if ta.atr > 0.0 {
        risk_quality.add(2.0);
    }
    if ta.adx >= 20.0 {
        risk_quality.add(2.0);
    }
    if ta.closes.len() >= 50 {
        risk_quality.add(3.0);
    } else if ta.closes.len() >= 20 {
        risk_quality.add(1.5);
    }

    let total_bull = trend.bull_points + momentum.bull_points + volume.bull_points + structure.bull_points;
    let total_bear = trend.bear_points + momentum.bear_points + volume.bear_points + structure.bear_points;

    let direction = if total_bull > total_bear + 1.0 {
        Bias::Bull
    } else if total_bear > total_bull + 1.0 {
        Bias::Bear
    } else {
        Bias::Neutral
    };

    let total =
        trend.value + momentum.value + volume.value + structure.value + volatility.value + risk_quality.value;

    let label = match direction {
        Bias::Bull if total >= 70.0 => ScoreLabel::StrongBullish,
        Bias::Bull if total >= 50.0 => ScoreLabel::Bullish,
        Bias::Bear if total >= 70.0 => ScoreLabel::StrongBearish,
        Bias::Bear if total >= 50.0 => ScoreLabel::Bearish,
        _ => ScoreLabel::Neutral,
    };

    Scores {
        trend: trend.value,
        momentum: momentum.value,
        volume: volume.value,
        structure: structure.value,
        volatility: volatility.value,
        risk_quality: risk_quality.value,
        total,
        direction,
        label,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicators::analyze_candles;
    use crate::domain::trading::types::Candle;
    use chrono::Utc;

    fn uptrend_candles(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let base = 100.0 + i as f64 * 1.5;
                Candle {
                    open: base,
                    high: base + 1.0,
                    low: base - 1.0,
                    close: base + 0.8,
                    volume: 100.0 + i as f64,
                    open_time: Utc::now().timestamp_millis() + i as i64 * 3_600_000,
                }
            })
            .collect()
    }

    #[test]
    fn dimension_sum_equals_total() {
        let candles = uptrend_candles(60);
        let ta = analyze_candles(&candles, &[], None).unwrap();
        let scores = score_timeframe(&ta, None);
        let sum = scores.trend
            + scores.momentum
            + scores.volume
            + scores.structure
            + scores.volatility
            + scores.risk_quality;
        assert!((sum - scores.total).abs() < 1e-9);
    }

    #[test]
    fn strong_uptrend_scores_bullish() {
        let candles = uptrend_candles(60);
        let ta = analyze_candles(&candles, &[], None).unwrap();
        let scores = score_timeframe(&ta, None);
        assert_eq!(scores.direction, Bias::Bull);
    }
}
