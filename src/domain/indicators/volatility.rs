use crate::domain::trading::types::Candle;

/// True range using the previous close, mean over the trailing `period`.
pub fn atr(candles: &[Candle], period: usize) -> f64 {
    if candles.len() < 2 {
        return 0.0;
    }
    let trs: Vec<f64> = candles
        .windows(2)
        .map(|pair| {
            let prev_close = pair[0].close;
            let c = pair[1];
            (c.high - c.low)
                .max((c.high - prev_close).abs())
                .max((c.low - prev_close).abs())
        })
        .collect();
    let window = if trs.len() > period {
        &trs[trs.len() - period..]
    } else {
        &trs[..]
    };
    if window.is_empty() {
        return 0.0;
    }
    window.iter().sum::<f64>() / window.len() as f64
}

#[derive(Debug, Clone, Copy)]
pub struct Bollinger {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

pub fn bollinger(closes: &[f64], period: usize, std_mult: f64) -> Bollinger {
    if closes.is_empty() {
        return Bollinger {
            upper: 0.0,
            middle: 0.0,
            lower: 0.0,
        };
    }
    let window = if closes.len() > period {
        &closes[closes.len() - period..]
    } else {
        closes
    };
    let mean = window.iter().sum::<f64>() / window.len() as f64;
    let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / window.len() as f64;
    let std = variance.sqrt();
    Bollinger {
        upper: mean + std_mult * std,
        middle: mean,
        lower: mean - std_mult * std,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Keltner {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

pub fn keltner(candles: &[Candle], period: usize, atr_mult: f64) -> Keltner {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let middle = super::moving_average::ema(&closes, period);
    let a = atr(candles, period);
    Keltner {
        upper: middle + atr_mult * a,
        middle,
        lower: middle - atr_mult * a,
    }
}

/// True when Bollinger bands sit strictly inside the Keltner channel — the
/// classic TTM squeeze condition.
pub fn is_squeeze(bb: Bollinger, kc: Keltner) -> bool {
    bb.upper < kc.upper && bb.lower > kc.lower
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolState {
    Low,
    Normal,
    High,
    Extreme,
}

/// Classifies current ATR% against its own recent history using both a
/// z-score and a percentile rank, so a coin whose natural ATR% runs high is
/// not permanently flagged volatile. Falls back to fixed cutoffs when there
/// isn't at least 20 points of history.
pub fn classify_volatility(atr_pct_history: &[f64], current_atr_pct: f64) -> VolState {
    let history = if atr_pct_history.len() > 100 {
        &atr_pct_history[atr_pct_history.len() - 100..]
    } else {
        atr_pct_history
    };

    if history.len() < 20 {
        return if current_atr_pct > 8.0 {
            VolState::Extreme
        } else if current_atr_pct > 4.0 {
            VolState::High
        } else if current_atr_pct < 1.0 {
            VolState::Low
        } else {
            VolState::Normal
        };
    }

    let mean = history.iter().sum::<f64>() / history.len() as f64;
    let variance = history.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / history.len() as f64;
    let std = variance.sqrt();
    let z = if std > 0.0 {
        (current_atr_pct - mean) / std
    } else {
        0.0
    };
    let below = history.iter().filter(|&&v| v <= current_atr_pct).count();
    let percentile = below as f64 / history.len() as f64;

    if z > 2.0 && percentile > 0.95 {
        VolState::Extreme
    } else if z > 1.2 && percentile > 0.80 {
        VolState::High
    } else if z < -1.0 && percentile < 0.20 {
        VolState::Low
    } else {
        VolState::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn candle(o: f64, h: f64, l: f64, c: f64) -> Candle {
        Candle {
            open: o,
            high: h,
            low: l,
            close: c,
            volume: 100.0,
            open_time: Utc::now().timestamp_millis(),
        }
    }

    #[test]
    fn atr_zero_on_single_candle() {
        let candles = vec![candle(1.0, 1.0, 1.0, 1.0)];
        assert_eq!(atr(&candles, 14), 0.0);
    }

    #[test]
    fn squeeze_detected_when_bb_inside_kc() {
        let bb = Bollinger {
            upper: 105.0,
            middle: 100.0,
            lower: 95.0,
        };
        let kc = Keltner {
            upper: 110.0,
            middle: 100.0,
            lower: 90.0,
        };
        assert!(is_squeeze(bb, kc));
    }

    #[test]
    fn classify_falls_back_under_20_points() {
        let history = vec![2.0; 5];
        assert_eq!(classify_volatility(&history, 9.0), VolState::Extreme);
        assert_eq!(classify_volatility(&history, 0.5), VolState::Low);
    }

    #[test]
    fn classify_normal_for_natural_high_baseline() {
        let history = vec![5.0; 30];
        assert_eq!(classify_volatility(&history, 5.0), VolState::Normal);
    }
}
