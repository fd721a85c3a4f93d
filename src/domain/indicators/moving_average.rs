/// Simple moving average over the last `period` closes. Falls back to
/// averaging whatever is available when the series is shorter than `period`.
pub fn sma(closes: &[f64], period: usize) -> f64 {
    if closes.is_empty() {
        return 0.0;
    }
    let window = if closes.len() < period {
        closes
    } else {
        &closes[closes.len() - period..]
    };
    window.iter().sum::<f64>() / window.len() as f64
}

/// Exponential moving average series. Seeds the first value from the
/// period-length SMA, then applies the standard 2/(period+1) smoothing.
/// Returns one EMA value per input close once warmed up (shorter at the
/// front while the seed accumulates).
pub fn ema_series(closes: &[f64], period: usize) -> Vec<f64> {
    if closes.is_empty() || period == 0 {
        return Vec::new();
    }
    if closes.len() < period {
        return closes.iter().map(|_| sma(closes, period)).collect();
    }
    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(closes.len());
    let seed = sma(&closes[..period], period);
    let mut prev = seed;
    for (i, &price) in closes.iter().enumerate() {
        if i < period - 1 {
            out.push(sma(&closes[..=i], period));
            continue;
        }
        if i == period - 1 {
            out.push(seed);
            prev = seed;
            continue;
        }
        let value = (price - prev) * k + prev;
        out.push(value);
        prev = value;
    }
    out
}

/// Last value of the EMA series (the "current" EMA reading).
pub fn ema(closes: &[f64], period: usize) -> f64 {
    ema_series(closes, period).last().copied().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_falls_back_when_short() {
        let closes = [1.0, 2.0, 3.0];
        assert_eq!(sma(&closes, 10), 2.0);
    }

    #[test]
    fn sma_uses_trailing_window() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(sma(&closes, 2), 4.5);
    }

    #[test]
    fn ema_seeds_from_sma() {
        let closes = vec![10.0; 20];
        let value = ema(&closes, 10);
        assert!((value - 10.0).abs() < 1e-9);
    }

    #[test]
    fn ema_reacts_to_trend() {
        let mut closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        closes.push(1000.0);
        let value = ema(&closes, 12);
        assert!(value > 130.0);
    }
}
