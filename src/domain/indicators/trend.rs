use crate::domain::trading::types::Candle;

#[derive(Debug, Clone, Copy)]
pub struct DirectionalMovement {
    pub plus_di: f64,
    pub minus_di: f64,
    pub dx: f64,
}

fn directional_series(candles: &[Candle], period: usize) -> Vec<DirectionalMovement> {
    if candles.len() < period + 1 {
        return Vec::new();
    }
    let mut plus_dm = Vec::with_capacity(candles.len());
    let mut minus_dm = Vec::with_capacity(candles.len());
    let mut tr = Vec::with_capacity(candles.len());

    for pair in candles.windows(2) {
        let (prev, cur) = (pair[0], pair[1]);
        let up_move = cur.high - prev.high;
        let down_move = prev.low - cur.low;
        plus_dm.push(if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        });
        minus_dm.push(if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        });
        tr.push(
            (cur.high - cur.low)
                .max((cur.high - prev.close).abs())
                .max((cur.low - prev.close).abs()),
        );
    }

    let mut out = Vec::new();
    for i in period - 1..tr.len() {
        let start = i + 1 - period;
        let tr_sum: f64 = tr[start..=i].iter().sum();
        let plus_sum: f64 = plus_dm[start..=i].iter().sum();
        let minus_sum: f64 = minus_dm[start..=i].iter().sum();

        let (plus_di, minus_di) = if tr_sum > 0.0 {
            (100.0 * plus_sum / tr_sum, 100.0 * minus_sum / tr_sum)
        } else {
            (0.0, 0.0)
        };
        let di_sum = plus_di + minus_di;
        // DI-sum zero means no directional movement at all: DX is 0, not NaN.
        let dx = if di_sum > 0.0 {
            100.0 * (plus_di - minus_di).abs() / di_sum
        } else {
            0.0
        };
        out.push(DirectionalMovement {
            plus_di,
            minus_di,
            dx,
        });
    }
    out
}

/// ADX(14): average DX over the trailing period once the DI series has warmed up.
pub fn adx(candles: &[Candle], period: usize) -> f64 {
    let series = directional_series(candles, period);
    if series.is_empty() {
        return 0.0;
    }
    let window = if series.len() > period {
        &series[series.len() - period..]
    } else {
        &series[..]
    };
    window.iter().map(|d| d.dx).sum::<f64>() / window.len() as f64
}

/// Current +DI/-DI pair, used by trend-class checks elsewhere.
pub fn directional_indicators(candles: &[Candle], period: usize) -> (f64, f64) {
    directional_series(candles, period)
        .last()
        .map(|d| (d.plus_di, d.minus_di))
        .unwrap_or((0.0, 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn candle(h: f64, l: f64, c: f64) -> Candle {
        Candle {
            open: c,
            high: h,
            low: l,
            close: c,
            volume: 100.0,
            open_time: Utc::now().timestamp_millis(),
        }
    }

    #[test]
    fn adx_zero_on_flat_series() {
        let candles: Vec<Candle> = (0..30).map(|_| candle(100.0, 99.0, 99.5)).collect();
        assert_eq!(adx(&candles, 14), 0.0);
    }

    #[test]
    fn adx_rises_on_strong_trend() {
        let candles: Vec<Candle> = (0..40)
            .map(|i| {
                let base = 100.0 + i as f64 * 3.0;
                candle(base + 1.0, base - 1.0, base)
            })
            .collect();
        assert!(adx(&candles, 14) > 10.0);
    }
}
