use super::moving_average::{ema, ema_series};

/// Wilder-style RSI(14) over closes. Neutral at 50 when both average gain and
/// average loss are zero (a flat series), not when only one side is zero.
pub fn rsi(closes: &[f64], period: usize) -> f64 {
    if closes.len() < 2 {
        return 50.0;
    }
    let window = if closes.len() > period + 1 {
        &closes[closes.len() - (period + 1)..]
    } else {
        closes
    };
    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;
    for pair in window.windows(2) {
        let delta = pair[1] - pair[0];
        if delta > 0.0 {
            gain_sum += delta;
        } else {
            loss_sum += -delta;
        }
    }
    let n = (window.len() - 1) as f64;
    let avg_gain = gain_sum / n;
    let avg_loss = loss_sum / n;

    if avg_gain == 0.0 && avg_loss == 0.0 {
        return 50.0;
    }
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

#[derive(Debug, Clone, Copy)]
pub struct Macd {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// line = EMA(12) - EMA(26); signal = EMA(9) of the line's own history.
pub fn macd(closes: &[f64]) -> Macd {
    if closes.is_empty() {
        return Macd {
            line: 0.0,
            signal: 0.0,
            histogram: 0.0,
        };
    }
    let fast = ema_series(closes, 12);
    let slow = ema_series(closes, 26);
    let line_series: Vec<f64> = fast.iter().zip(slow.iter()).map(|(f, s)| f - s).collect();
    let signal = ema(&line_series, 9);
    let line = *line_series.last().unwrap_or(&0.0);
    Macd {
        line,
        signal,
        histogram: line - signal,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Stochastic {
    pub k: f64,
    pub d: f64,
}

/// %K from the trailing `period` window's high/low, %D = mean of the last 3 %K values.
pub fn stochastic(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Stochastic {
    let n = closes.len();
    if n == 0 {
        return Stochastic { k: 50.0, d: 50.0 };
    }
    let k_of = |end: usize| -> f64 {
        let start = end.saturating_sub(period);
        let hh = highs[start..end].iter().cloned().fold(f64::MIN, f64::max);
        let ll = lows[start..end].iter().cloned().fold(f64::MAX, f64::min);
        if (hh - ll).abs() < f64::EPSILON {
            50.0
        } else {
            100.0 * (closes[end - 1] - ll) / (hh - ll)
        }
    };
    let k = k_of(n);
    let d_count = 3.min(n);
    let d_sum: f64 = (0..d_count).map(|i| k_of(n - i)).sum();
    let d = d_sum / d_count as f64;
    Stochastic { k, d }
}

/// %K aligned 1:1 to candle index, for divergence checks against price swings.
pub fn stochastic_k_series(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<f64> {
    (0..closes.len())
        .map(|i| stochastic(&highs[..=i], &lows[..=i], &closes[..=i], period).k)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_all_equal_is_neutral() {
        let closes = vec![100.0; 30];
        assert_eq!(rsi(&closes, 14), 50.0);
    }

    #[test]
    fn rsi_pure_gains_is_100() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        assert_eq!(rsi(&closes, 14), 100.0);
    }

    #[test]
    fn rsi_bounded() {
        let closes = vec![
            100.0, 102.0, 101.0, 99.0, 98.0, 103.0, 104.0, 100.0, 97.0, 96.0, 95.0, 99.0, 101.0,
            102.0, 103.0,
        ];
        let v = rsi(&closes, 14);
        assert!((0.0..=100.0).contains(&v));
    }

    #[test]
    fn stochastic_flat_range_is_neutral() {
        let highs = vec![100.0; 20];
        let lows = vec![100.0; 20];
        let closes = vec![100.0; 20];
        let s = stochastic(&highs, &lows, &closes, 14);
        assert_eq!(s.k, 50.0);
    }
}
