use crate::domain::trading::types::Candle;

/// Volume-weighted average price over the given window.
pub fn vwap(candles: &[Candle]) -> f64 {
    let mut pv = 0.0;
    let mut v = 0.0;
    for c in candles {
        let typical = (c.high + c.low + c.close) / 3.0;
        pv += typical * c.volume;
        v += c.volume;
    }
    if v <= 0.0 { 0.0 } else { pv / v }
}

/// On-balance volume, running cumulative: adds the bar's volume on an up
/// close, subtracts it on a down close, carries forward unchanged on a flat
/// close. Returns one value per candle, seeded at 0 before the first bar.
pub fn obv_series(candles: &[Candle]) -> Vec<f64> {
    let mut out = Vec::with_capacity(candles.len());
    let mut running = 0.0;
    let mut prev_close: Option<f64> = None;
    for c in candles {
        if let Some(prev) = prev_close {
            if c.close > prev {
                running += c.volume;
            } else if c.close < prev {
                running -= c.volume;
            }
        }
        out.push(running);
        prev_close = Some(c.close);
    }
    out
}

const POC_BUCKETS: usize = 50;

/// Price at the center of the bucket holding the most volume, bucketing the
/// candle window's price range into 50 equal buckets.
pub fn point_of_control(candles: &[Candle]) -> f64 {
    if candles.is_empty() {
        return 0.0;
    }
    let hi = candles.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    let lo = candles.iter().map(|c| c.low).fold(f64::MAX, f64::min);
    if hi <= lo {
        return candles.last().unwrap().close;
    }
    let bucket_size = (hi - lo) / POC_BUCKETS as f64;
    let mut buckets = vec![0.0f64; POC_BUCKETS];
    for c in candles {
        let typical = (c.high + c.low + c.close) / 3.0;
        let mut idx = ((typical - lo) / bucket_size) as usize;
        if idx >= POC_BUCKETS {
            idx = POC_BUCKETS - 1;
        }
        buckets[idx] += c.volume;
    }
    let (max_idx, _) = buckets
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        .unwrap();
    lo + bucket_size * (max_idx as f64 + 0.5)
}

#[derive(Debug, Clone, Copy)]
pub struct Fibonacci {
    pub level_236: f64,
    pub level_382: f64,
    pub level_500: f64,
    pub level_618: f64,
    pub level_786: f64,
}

/// Retracement levels from the swing high/low over the trailing window
/// (lookback capped at 50 candles).
pub fn fibonacci_retracement(candles: &[Candle], lookback: usize) -> Fibonacci {
    let lookback = lookback.min(50);
    let window = if candles.len() > lookback {
        &candles[candles.len() - lookback..]
    } else {
        candles
    };
    if window.is_empty() {
        return Fibonacci {
            level_236: 0.0,
            level_382: 0.0,
            level_500: 0.0,
            level_618: 0.0,
            level_786: 0.0,
        };
    }
    let hi = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    let lo = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
    let range = hi - lo;
    Fibonacci {
        level_236: hi - range * 0.236,
        level_382: hi - range * 0.382,
        level_500: hi - range * 0.5,
        level_618: hi - range * 0.618,
        level_786: hi - range * 0.786,
    }
}
