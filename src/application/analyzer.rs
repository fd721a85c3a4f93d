use std::collections::HashMap;

use chrono::{DateTime, Timelike, Utc};

use crate::config::EngineConfig;
use crate::domain::indicators::correlation::{pearson_correlation, returns};
use crate::domain::indicators::structure::DivergenceDirection;
use crate::domain::indicators::volatility::VolState;
use crate::domain::indicators::{analyze_candles, MarketDirectionHint, TimeframeAnalysis};
use crate::domain::level_planner::LevelPlanner;
use crate::domain::market::regime::{detect_regime, Regime, RegimeInputs};
use crate::domain::market::timeframe::Timeframe;
use crate::domain::scoring::{score_timeframe, Scores};
use crate::domain::signal::{confluence_bonus, score_to_signal, ScoreBreakdown, Signal, SignalKind, StrategyRanking, TimeframeSummary};
use crate::domain::strategy::{rank_strategies, StrategyId};
use crate::domain::trading::types::{Bias, Candle, CoinDescriptor};

#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureFlags {
    pub price_action_confluence: bool,
    pub volatility_filter: bool,
    pub volume_confirmation: bool,
}

/// Builds a trailing ATR% history (up to the last 100 points) by recomputing
/// ATR over progressively larger prefixes of the window, feeding the
/// Indicator Kernel's adaptive volatility classifier.
fn atr_pct_history(candles: &[Candle]) -> Vec<f64> {
    let start = candles.len().saturating_sub(115).max(15);
    let mut history = Vec::new();
    for end in start..candles.len() {
        let window = &candles[..end];
        if window.len() < 15 {
            continue;
        }
        let atr = crate::domain::indicators::volatility::atr(window, 14);
        let close = window.last().unwrap().close;
        if close > 0.0 {
            history.push(atr / close * 100.0);
        }
    }
    if history.len() > 100 {
        history.split_off(history.len() - 100)
    } else {
        history
    }
}

fn htf_direction(scores: &Scores) -> Option<MarketDirectionHint> {
    match scores.direction {
        Bias::Bull => Some(MarketDirectionHint::Up),
        Bias::Bear => Some(MarketDirectionHint::Down),
        Bias::Neutral => Some(MarketDirectionHint::Flat),
    }
}

struct TfResult {
    ta: TimeframeAnalysis,
    scores: Scores,
}

fn analyze_one(
    candles: &[Candle],
    htf_hint: Option<MarketDirectionHint>,
) -> Option<TfResult> {
    let ta = analyze_candles(candles, &atr_pct_history(candles), htf_hint)?;
    let scores = score_timeframe(&ta, htf_hint);
    Some(TfResult { ta, scores })
}

pub struct SignalAnalyzer<'a> {
    pub config: &'a EngineConfig,
}

impl<'a> SignalAnalyzer<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Pure analysis of a single coin. Degrades gracefully rather than
    /// erroring: <20 hourly candles falls back to a close-price-only path,
    /// <10 points of history produces a basic 24h-change signal at reduced
    /// confidence. Never returns `Err`.
    pub fn analyze(
        &self,
        coin: &CoinDescriptor,
        candles_by_tf: &HashMap<Timeframe, Vec<Candle>>,
        btc_candles: Option<&[Candle]>,
        funding_rate: Option<f64>,
        bar_time: DateTime<Utc>,
        flags: FeatureFlags,
        trade_counts: &HashMap<StrategyId, u32>,
        learned_weights: Option<&HashMap<StrategyId, [f64; 6]>>,
    ) -> Signal {
        let hourly = candles_by_tf.get(&Timeframe::H1).cloned().unwrap_or_default();
        if hourly.len() < 10 {
            return self.basic_fallback(coin, &hourly, bar_time);
        }
        if hourly.len() < 20 {
            return self.close_price_fallback(coin, &hourly, bar_time);
        }

        let daily = analyze_one(candles_by_tf.get(&Timeframe::D1).map(|v| v.as_slice()).unwrap_or(&hourly), None);
        let daily_hint = daily.as_ref().and_then(|r| htf_direction(&r.scores));

        let h4 = analyze_one(candles_by_tf.get(&Timeframe::H4).map(|v| v.as_slice()).unwrap_or(&hourly), daily_hint);
        let h4_hint = h4.as_ref().and_then(|r| htf_direction(&r.scores));

        let h1 = analyze_one(&hourly, h4_hint);
        let h1_hint = h1.as_ref().and_then(|r| htf_direction(&r.scores));

        let m15 = candles_by_tf
            .get(&Timeframe::M15)
            .and_then(|c| analyze_one(c, h1_hint));
        let w1 = candles_by_tf
            .get(&Timeframe::W1)
            .and_then(|c| analyze_one(c, daily_hint));

        let (daily, h4, h1) = match (daily, h4, h1) {
            (Some(d), Some(f), Some(h)) => (d, f, h),
            _ => return self.close_price_fallback(coin, &hourly, bar_time),
        };

        let mut scores_by_tf: HashMap<Timeframe, Scores> = HashMap::new();
        scores_by_tf.insert(Timeframe::D1, daily.scores);
        scores_by_tf.insert(Timeframe::H4, h4.scores);
        scores_by_tf.insert(Timeframe::H1, h1.scores);
        if let Some(r) = &m15 {
            scores_by_tf.insert(Timeframe::M15, r.scores);
        }
        if let Some(r) = &w1 {
            scores_by_tf.insert(Timeframe::W1, r.scores);
        }

        let pre_penalty = (daily.scores.total * 0.40 + h4.scores.total * 0.35 + h1.scores.total * 0.25).round();

        let (dominant_dir, confluence_level) = Self::confluence(&daily.scores, &h4.scores, &h1.scores, pre_penalty);

        let mut penalty = 0.0f64;
        let mut reasoning = Vec::new();

        if h1.scores.direction != Bias::Neutral
            && h4.scores.direction != Bias::Neutral
            && h1.scores.direction != h4.scores.direction
        {
            penalty -= self.config.mtf_divergence_penalty;
            reasoning.push("1h/4h timeframe divergence".to_string());
        }

        let hour = bar_time.hour();
        if hour < self.config.session_window_start_utc || hour >= self.config.session_window_end_utc {
            penalty -= self.config.session_penalty;
            reasoning.push("outside primary session window".to_string());
        }

        penalty += Self::divergence_modifier(&h1.ta, dominant_dir, &mut reasoning);
        penalty += Self::top_bottom_modifier(&h1.ta, dominant_dir, &mut reasoning);

        if let Some(rate) = funding_rate {
            penalty += Self::funding_modifier(rate, dominant_dir, &mut reasoning);
        }

        if let Some(btc) = btc_candles {
            penalty += self.btc_correlation_modifier(&hourly, btc, dominant_dir, &mut reasoning);
        }

        if h1.ta.atr > 0.0 && h1.ta.poc > 0.0 {
            let last_close = *h1.ta.closes.last().unwrap_or(&0.0);
            if last_close > 0.0 && ((last_close - h1.ta.poc).abs() / last_close) <= 0.005 {
                penalty += 3.0;
                reasoning.push("price near volume point of control".to_string());
            }
        }

        let penalty = penalty.clamp(-self.config.max_total_penalty, self.config.max_total_penalty);
        let final_score = (pre_penalty + penalty).clamp(0.0, 100.0);

        let regime = detect_regime(RegimeInputs {
            daily_adx: daily.ta.adx,
            h4_adx: h4.ta.adx,
            daily_trend_directional: daily.scores.direction != Bias::Neutral,
            h4_bb_inside_kc: h4.ta.squeeze,
            daily_vol_state: daily.ta.vol_state,
            h4_vol_state: h4.ta.vol_state,
        });

        let has_15m = m15.is_some();
        let ranked = rank_strategies(&scores_by_tf, regime, has_15m, trade_counts, learned_weights);
        let chosen = ranked.first().map(|c| c.id).unwrap_or(StrategyId::Swing);

        let bonus = confluence_bonus(confluence_level);
        let adjusted = (final_score + bonus).clamp(0.0, 100.0);
        let mut signal_kind = score_to_signal(adjusted, dominant_dir);

        let min_conf = if final_score >= 58.0 { 1 } else { 2 };
        if final_score < self.config.min_signal_score || confluence_level < min_conf {
            signal_kind = SignalKind::Hold;
            reasoning.push("quality gate: below minimum score/confluence".to_string());
        }

        if flags.price_action_confluence
            && h1.ta.order_block.is_none()
            && h1.ta.fair_value_gaps.is_empty()
            && h1.ta.liquidity_above.is_none()
            && h1.ta.liquidity_below.is_none()
        {
            signal_kind = SignalKind::Hold;
            reasoning.push("no price-action confluence".to_string());
        }
        if flags.volatility_filter
            && (h1.ta.vol_state == VolState::Extreme || h4.ta.vol_state == VolState::Extreme)
        {
            signal_kind = SignalKind::Hold;
            reasoning.push("volatility filter: extreme volatility".to_string());
        }
        if flags.volume_confirmation && h1.ta.relative_volume < 1.0 {
            signal_kind = SignalKind::Hold;
            reasoning.push("volume confirmation: below average volume".to_string());
        }

        let direction = dominant_dir;

        let def = crate::domain::strategy::STRATEGY_TABLE
            .iter()
            .find(|d| d.id == chosen)
            .unwrap_or(&crate::domain::strategy::STRATEGY_TABLE[5]);

        let side = direction.as_side().unwrap_or(crate::domain::trading::types::Side::Long);
        let entry = rust_decimal::Decimal::from_f64_retain(*h1.ta.closes.last().unwrap_or(&0.0))
            .unwrap_or_default();

        let levels = LevelPlanner::plan(
            entry,
            h1.ta.atr,
            h1.ta.liquidity_below.map(|c| c.price),
            h1.ta.liquidity_above.map(|c| c.price),
            Some(h1.ta.fibonacci),
            def,
            side,
            &h1.scores,
            regime,
            h1.ta.vol_state,
            true,
        );

        let risk_reward = Signal::risk_reward_of(
            entry,
            levels.stop_loss,
            levels.take_profit2.or(levels.take_profit1).unwrap_or(levels.take_profit1),
        );

        let top_strategies = ranked
            .iter()
            .take(3)
            .map(|c| {
                let strategy_def = crate::domain::strategy::STRATEGY_TABLE
                    .iter()
                    .find(|d| d.id == c.id)
                    .unwrap_or(def);
                let strategy_levels = LevelPlanner::plan(
                    entry,
                    h1.ta.atr,
                    h1.ta.liquidity_below.map(|c| c.price),
                    h1.ta.liquidity_above.map(|c| c.price),
                    Some(h1.ta.fibonacci),
                    strategy_def,
                    side,
                    &h1.scores,
                    regime,
                    h1.ta.vol_state,
                    true,
                );
                StrategyRanking {
                    id: c.id,
                    display_score: c.display_score,
                    direction,
                    levels: strategy_levels,
                }
            })
            .collect();

        let best_timeframe = [
            (Timeframe::D1, daily.scores.total),
            (Timeframe::H4, h4.scores.total),
            (Timeframe::H1, h1.scores.total),
        ]
        .into_iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .map(|(tf, _)| tf)
        .unwrap_or(Timeframe::H1);

        let confidence = match signal_kind {
            SignalKind::Hold => final_score.min(50.0),
            _ => adjusted,
        };

        Signal {
            coin: coin.clone(),
            generated_at: bar_time,
            final_score,
            signal: signal_kind,
            direction,
            confidence,
            confluence_level,
            best_timeframe,
            regime,
            chosen_strategy: chosen,
            top_strategies,
            entry,
            take_profit1: levels.take_profit1,
            take_profit2: levels.take_profit2,
            take_profit3: levels.take_profit3,
            stop_loss: levels.stop_loss,
            risk_reward,
            suggested_leverage: levels.suggested_leverage,
            reasoning,
            score_breakdown: ScoreBreakdown::from(&h1.scores),
            timeframe_summaries: vec![
                TimeframeSummary { timeframe: Timeframe::D1, score: daily.scores.total, direction: daily.scores.direction },
                TimeframeSummary { timeframe: Timeframe::H4, score: h4.scores.total, direction: h4.scores.direction },
                TimeframeSummary { timeframe: Timeframe::H1, score: h1.scores.total, direction: h1.scores.direction },
            ],
        }
    }

    /// Applies the fleet-level BTC regime override: a STRONG_SELL BTC signal
    /// suppresses every alt long to HOLD, a STRONG_BUY suppresses every alt
    /// short, leaving BTC's own signal untouched.
    pub fn apply_btc_override(btc_signal: &Signal, alt_signals: &mut [Signal]) {
        for signal in alt_signals.iter_mut() {
            match (btc_signal.signal, signal.direction) {
                (SignalKind::StrongSell, Bias::Bull) => signal.signal = SignalKind::Hold,
                (SignalKind::StrongBuy, Bias::Bear) => signal.signal = SignalKind::Hold,
                _ => {}
            }
        }
    }

    fn confluence(daily: &Scores, h4: &Scores, h1: &Scores, final_score: f64) -> (Bias, u8) {
        let dirs = [h1.direction, h4.direction, daily.direction];
        let bull = dirs.iter().filter(|d| **d == Bias::Bull).count();
        let bear = dirs.iter().filter(|d| **d == Bias::Bear).count();

        if bull >= 2 {
            return (Bias::Bull, bull as u8);
        }
        if bear >= 2 {
            return (Bias::Bear, bear as u8);
        }
        // 1-1 tie (or all neutral): defer to daily direction with score gates.
        if daily.direction == Bias::Bull && final_score >= 52.0 {
            return (Bias::Bull, 1);
        }
        if daily.direction == Bias::Bear && final_score <= 48.0 {
            return (Bias::Bear, 1);
        }
        if final_score >= 58.0 {
            return (daily.direction, 1);
        }
        (Bias::Neutral, bull.max(bear) as u8)
    }

    fn divergence_modifier(ta: &TimeframeAnalysis, direction: Bias, reasoning: &mut Vec<String>) -> f64 {
        let mut count = 0;
        let mut aligned = 0;
        for div in [
            ta.rsi_divergence,
            ta.macd_divergence,
            ta.stochastic_divergence,
            ta.obv_divergence,
        ]
        .into_iter()
        .flatten()
        {
            count += 1;
            let matches_bull = div == DivergenceDirection::Bullish && direction == Bias::Bull;
            let matches_bear = div == DivergenceDirection::Bearish && direction == Bias::Bear;
            if matches_bull || matches_bear {
                aligned += 1;
            }
        }
        if count == 0 {
            return 0.0;
        }
        let base = if aligned > 0 { 4.0 } else { -4.0 };
        let confluence = if count >= 2 { 2.0 } else { 0.0 };
        let total = (base + confluence.copysign(base)).clamp(-10.0, 10.0);
        if total != 0.0 {
            reasoning.push(format!("divergence modifier {total:+.0}"));
        }
        total
    }

    fn top_bottom_modifier(ta: &TimeframeAnalysis, direction: Bias, reasoning: &mut Vec<String>) -> f64 {
        let has_bearish_div = ta.rsi_divergence == Some(DivergenceDirection::Bearish);
        let has_bullish_div = ta.rsi_divergence == Some(DivergenceDirection::Bullish);
        if ta.rsi >= 80.0 && direction == Bias::Bull {
            let magnitude = if has_bearish_div { -12.0 } else { -6.0 };
            reasoning.push("potential top forming".to_string());
            return magnitude;
        }
        if ta.rsi <= 20.0 && direction == Bias::Bear {
            let magnitude = if has_bullish_div { -12.0 } else { -6.0 };
            reasoning.push("potential bottom forming".to_string());
            return magnitude;
        }
        0.0
    }

    fn funding_modifier(rate: f64, direction: Bias, reasoning: &mut Vec<String>) -> f64 {
        let tier = if rate.abs() > 0.001 {
            8.0
        } else if rate.abs() > 0.0005 {
            4.0
        } else {
            return 0.0;
        };
        let crowded_long = rate > 0.0 && direction == Bias::Bull;
        let crowded_short = rate < 0.0 && direction == Bias::Bear;
        let value = if crowded_long || crowded_short { -tier } else { tier };
        reasoning.push(format!("funding rate modifier {value:+.0}"));
        value
    }

    fn btc_correlation_modifier(
        &self,
        coin_candles: &[Candle],
        btc_candles: &[Candle],
        direction: Bias,
        reasoning: &mut Vec<String>,
    ) -> f64 {
        let coin_closes: Vec<f64> = coin_candles.iter().map(|c| c.close).collect();
        let btc_closes: Vec<f64> = btc_candles.iter().map(|c| c.close).collect();
        let corr = pearson_correlation(&returns(&coin_closes), &returns(&btc_closes));
        if corr <= 0.7 {
            return 0.0;
        }
        let btc_returns = returns(&btc_closes);
        let btc_trend_up = btc_returns.iter().rev().take(10).sum::<f64>() > 0.0;
        let btc_direction = if btc_trend_up { Bias::Bull } else { Bias::Bear };
        if btc_direction == direction {
            return 0.0;
        }
        let penalty = -(corr * 8.0).round();
        reasoning.push("BTC correlation penalty (opposing BTC trend)".to_string());
        penalty
    }

    fn close_price_fallback(&self, coin: &CoinDescriptor, candles: &[Candle], bar_time: DateTime<Utc>) -> Signal {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let first = *closes.first().unwrap_or(&0.0);
        let last = *closes.last().unwrap_or(&0.0);
        let change_pct = if first > 0.0 { (last - first) / first * 100.0 } else { 0.0 };
        let direction = if change_pct > 1.0 {
            Bias::Bull
        } else if change_pct < -1.0 {
            Bias::Bear
        } else {
            Bias::Neutral
        };
        let final_score = (50.0 + change_pct.clamp(-20.0, 20.0)).clamp(0.0, 100.0);
        self.degraded_signal(coin, bar_time, final_score, direction, 40.0, last, "reduced path: fewer than 20 hourly candles")
    }

    fn basic_fallback(&self, coin: &CoinDescriptor, candles: &[Candle], bar_time: DateTime<Utc>) -> Signal {
        let last = candles.last().map(|c| c.close).unwrap_or(0.0);
        let first = candles.first().map(|c| c.close).unwrap_or(last);
        let change_pct = if first > 0.0 { (last - first) / first * 100.0 } else { 0.0 };
        let direction = if change_pct > 0.0 { Bias::Bull } else if change_pct < 0.0 { Bias::Bear } else { Bias::Neutral };
        let final_score = (50.0 + change_pct.clamp(-10.0, 10.0)).clamp(0.0, 100.0);
        self.degraded_signal(coin, bar_time, final_score, direction, 25.0, last, "basic path: fewer than 10 candles")
    }

    fn degraded_signal(
        &self,
        coin: &CoinDescriptor,
        bar_time: DateTime<Utc>,
        final_score: f64,
        direction: Bias,
        confidence: f64,
        last_price: f64,
        reason: &str,
    ) -> Signal {
        let entry = rust_decimal::Decimal::from_f64_retain(last_price).unwrap_or_default();
        let atr_guess = (last_price * 0.02).max(0.0001);
        let def = &crate::domain::strategy::STRATEGY_TABLE[5];
        let side = direction.as_side().unwrap_or(crate::domain::trading::types::Side::Long);
        let scores = Scores {
            trend: 0.0,
            momentum: 0.0,
            volume: 0.0,
            structure: 0.0,
            volatility: 0.0,
            risk_quality: 0.0,
            total: final_score,
            direction,
            label: crate::domain::scoring::ScoreLabel::Neutral,
        };
        let levels = LevelPlanner::plan(
            entry,
            atr_guess,
            None,
            None,
            None,
            def,
            side,
            &scores,
            Regime::Mixed,
            VolState::Normal,
            true,
        );
        Signal {
            coin: coin.clone(),
            generated_at: bar_time,
            final_score,
            signal: score_to_signal(final_score, direction),
            direction,
            confidence,
            confluence_level: 1,
            best_timeframe: Timeframe::H1,
            regime: Regime::Mixed,
            chosen_strategy: def.id,
            top_strategies: vec![],
            entry,
            take_profit1: levels.take_profit1,
            take_profit2: levels.take_profit2,
            take_profit3: levels.take_profit3,
            stop_loss: levels.stop_loss,
            risk_reward: Signal::risk_reward_of(entry, levels.stop_loss, levels.take_profit1),
            suggested_leverage: 1,
            reasoning: vec![reason.to_string()],
            score_breakdown: ScoreBreakdown::from(&scores),
            timeframe_summaries: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn flat_candles(n: usize, price: f64) -> Vec<Candle> {
        (0..n)
            .map(|i| Candle {
                open: price,
                high: price * 1.001,
                low: price * 0.999,
                close: price,
                volume: 100.0,
                open_time: i as i64 * 3_600_000,
            })
            .collect()
    }

    fn sample_coin() -> CoinDescriptor {
        CoinDescriptor { id: "btc".into(), symbol: "BTCUSDT".into() }
    }

    #[test]
    fn hold_gate_blocks_weak_score() {
        let cfg = EngineConfig::from_env().unwrap();
        let analyzer = SignalAnalyzer::new(&cfg);
        let mut map = HashMap::new();
        map.insert(Timeframe::H1, flat_candles(60, 100.0));
        map.insert(Timeframe::H4, flat_candles(60, 100.0));
        map.insert(Timeframe::D1, flat_candles(60, 100.0));
        let bar_time = Utc.with_ymd_and_hms(2026, 1, 1, 15, 0, 0).unwrap();
        let signal = analyzer.analyze(
            &sample_coin(),
            &map,
            None,
            None,
            bar_time,
            FeatureFlags::default(),
            &HashMap::new(),
            None,
        );
        assert_eq!(signal.signal, SignalKind::Hold);
    }

    #[test]
    fn fewer_than_10_candles_uses_basic_path() {
        let cfg = EngineConfig::from_env().unwrap();
        let analyzer = SignalAnalyzer::new(&cfg);
        let mut map = HashMap::new();
        map.insert(Timeframe::H1, flat_candles(5, 100.0));
        let bar_time = Utc.with_ymd_and_hms(2026, 1, 1, 15, 0, 0).unwrap();
        let signal = analyzer.analyze(
            &sample_coin(),
            &map,
            None,
            None,
            bar_time,
            FeatureFlags::default(),
            &HashMap::new(),
            None,
        );
        assert_eq!(signal.confidence, 25.0);
    }

    fn signal_with(signal_kind: SignalKind, direction: Bias) -> Signal {
        Signal {
            coin: sample_coin(),
            generated_at: Utc.with_ymd_and_hms(2026, 1, 1, 15, 0, 0).unwrap(),
            final_score: 0.0,
            signal: signal_kind,
            direction,
            confidence: 0.0,
            confluence_level: 0,
            best_timeframe: Timeframe::H1,
            regime: crate::domain::market::regime::Regime::Trending,
            chosen_strategy: crate::domain::strategy::StrategyId::Swing,
            top_strategies: vec![],
            entry: rust_decimal_macros::dec!(100),
            take_profit1: rust_decimal_macros::dec!(105),
            take_profit2: None,
            take_profit3: None,
            stop_loss: rust_decimal_macros::dec!(95),
            risk_reward: 1.0,
            suggested_leverage: 1,
            reasoning: vec![],
            score_breakdown: ScoreBreakdown::from(&Scores {
                trend: 0.0,
                momentum: 0.0,
                volume: 0.0,
                structure: 0.0,
                volatility: 0.0,
                risk_quality: 0.0,
                total: 0.0,
                direction,
                label: crate::domain::scoring::ScoreLabel::Neutral,
            }),
            timeframe_summaries: vec![],
        }
    }

    #[test]
    fn btc_strong_sell_suppresses_alt_longs_but_not_shorts_or_btc_itself() {
        let btc_signal = signal_with(SignalKind::StrongSell, Bias::Bear);
        let mut alts = vec![
            signal_with(SignalKind::Buy, Bias::Bull),
            signal_with(SignalKind::Sell, Bias::Bear),
        ];
        SignalAnalyzer::apply_btc_override(&btc_signal, &mut alts);
        assert_eq!(alts[0].signal, SignalKind::Hold);
        assert_eq!(alts[1].signal, SignalKind::Sell);
        assert_eq!(btc_signal.signal, SignalKind::StrongSell);
    }

    #[test]
    fn btc_strong_buy_suppresses_alt_shorts_but_not_longs() {
        let btc_signal = signal_with(SignalKind::StrongBuy, Bias::Bull);
        let mut alts = vec![
            signal_with(SignalKind::Buy, Bias::Bull),
            signal_with(SignalKind::Sell, Bias::Bear),
        ];
        SignalAnalyzer::apply_btc_override(&btc_signal, &mut alts);
        assert_eq!(alts[0].signal, SignalKind::Buy);
        assert_eq!(alts[1].signal, SignalKind::Hold);
    }
}
