use crate::domain::trading::types::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandlePattern {
    Doji,
    Hammer,
    ShootingStar,
    BullishEngulfing,
    BearishEngulfing,
    MorningStar,
    EveningStar,
}

#[derive(Debug, Clone, Copy)]
pub struct PatternMatch {
    pub pattern: CandlePattern,
    pub bullish: bool,
    pub strength: f64,
}

fn body(c: &Candle) -> f64 {
    (c.close - c.open).abs()
}

fn range(c: &Candle) -> f64 {
    (c.high - c.low).max(1e-9)
}

fn upper_wick(c: &Candle) -> f64 {
    c.high - c.open.max(c.close)
}

fn lower_wick(c: &Candle) -> f64 {
    c.open.min(c.close) - c.low
}

/// Detects the strongest pattern ending at the last candle of the slice, if any.
/// Scored from a small closed table of {pattern, bullish/bearish, strength}
/// rather than string-keyed dispatch.
pub fn detect_last_pattern(candles: &[Candle]) -> Option<PatternMatch> {
    let last = candles.last()?;
    let body_ratio = body(last) / range(last);

    if body_ratio < 0.1 {
        return Some(PatternMatch {
            pattern: CandlePattern::Doji,
            bullish: last.close >= last.open,
            strength: 0.3,
        });
    }

    if lower_wick(last) > body(last) * 2.0 && upper_wick(last) < body(last) * 0.5 {
        let bullish = last.close >= last.open;
        return Some(PatternMatch {
            pattern: CandlePattern::Hammer,
            bullish,
            strength: 0.6,
        });
    }
    if upper_wick(last) > body(last) * 2.0 && lower_wick(last) < body(last) * 0.5 {
        return Some(PatternMatch {
            pattern: CandlePattern::ShootingStar,
            bullish: false,
            strength: 0.6,
        });
    }

    if candles.len() >= 2 {
        let prev = &candles[candles.len() - 2];
        let prev_bearish = prev.close < prev.open;
        let prev_bullish = prev.close > prev.open;
        let last_bullish = last.close > last.open;

        if last_bullish && prev_bearish && last.close > prev.open && last.open < prev.close {
            return Some(PatternMatch {
                pattern: CandlePattern::BullishEngulfing,
                bullish: true,
                strength: 0.75,
            });
        }
        if !last_bullish && prev_bullish && last.open > prev.close && last.close < prev.open {
            return Some(PatternMatch {
                pattern: CandlePattern::BearishEngulfing,
                bullish: false,
                strength: 0.75,
            });
        }
    }

    if candles.len() >= 3 {
        let a = &candles[candles.len() - 3];
        let b = &candles[candles.len() - 2];
        let c = last;
        let a_bearish = a.close < a.open;
        let a_bullish = a.close > a.open;
        let b_small = body(b) < body(a) * 0.5;
        let c_bullish = c.close > c.open;
        let c_bearish = c.close < c.open;

        if a_bearish && b_small && c_bullish && c.close > (a.open + a.close) / 2.0 {
            return Some(PatternMatch {
                pattern: CandlePattern::MorningStar,
                bullish: true,
                strength: 0.85,
            });
        }
        if a_bullish && b_small && c_bearish && c.close < (a.open + a.close) / 2.0 {
            return Some(PatternMatch {
                pattern: CandlePattern::EveningStar,
                bullish: false,
                strength: 0.85,
            });
        }
    }

    None
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
            volume: 10.0,
            open_time: Utc::now().timestamp_millis(),
        }
    }

    #[test]
    fn detects_hammer() {
        let candles = vec![candle(100.0, 101.0, 90.0, 100.5)];
        let m = detect_last_pattern(&candles).unwrap();
        assert_eq!(m.pattern, CandlePattern::Hammer);
        assert!(m.bullish);
    }

    #[test]
    fn detects_bullish_engulfing() {
        let candles = vec![candle(100.0, 101.0, 95.0, 96.0), candle(95.0, 105.0, 94.0, 104.0)];
        let m = detect_last_pattern(&candles).unwrap();
        assert_eq!(m.pattern, CandlePattern::BullishEngulfing);
    }
}
