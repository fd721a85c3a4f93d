#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwingKind {
    High,
    Low,
}

#[derive(Debug, Clone, Copy)]
pub struct Swing {
    pub index: usize,
    pub price: f64,
    pub kind: SwingKind,
}

/// A swing point is a local extremum with two bars on each side strictly exceeded.
pub fn swing_highs(highs: &[f64]) -> Vec<Swing> {
    let mut out = Vec::new();
    if highs.len() < 5 {
        return out;
    }
    for i in 2..highs.len() - 2 {
        let v = highs[i];
        if v > highs[i - 1] && v > highs[i - 2] && v > highs[i + 1] && v > highs[i + 2] {
            out.push(Swing {
                index: i,
                price: v,
                kind: SwingKind::High,
            });
        }
    }
    out
}

pub fn swing_lows(lows: &[f64]) -> Vec<Swing> {
    let mut out = Vec::new();
    if lows.len() < 5 {
        return out;
    }
    for i in 2..lows.len() - 2 {
        let v = lows[i];
        if v < lows[i - 1] && v < lows[i - 2] && v < lows[i + 1] && v < lows[i + 2] {
            out.push(Swing {
                index: i,
                price: v,
                kind: SwingKind::Low,
            });
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketStructure {
    Bullish,
    Bearish,
    BreakUp,
    BreakDown,
    Ranging,
    Unknown,
}

/// Classifies the last two swing highs and lows. HH/HL -> Bullish, LL/LH ->
/// Bearish, HH/LL -> BreakUp, LH/HL -> BreakDown, otherwise Ranging.
pub fn classify_structure(highs: &[Swing], lows: &[Swing]) -> MarketStructure {
    if highs.len() < 2 || lows.len() < 2 {
        return MarketStructure::Unknown;
    }
    let (prev_h, last_h) = (highs[highs.len() - 2].price, highs[highs.len() - 1].price);
    let (prev_l, last_l) = (lows[lows.len() - 2].price, lows[lows.len() - 1].price);

    let hh = last_h > prev_h;
    let lh = last_h < prev_h;
    let hl = last_l > prev_l;
    let ll = last_l < prev_l;

    if hh && hl {
        MarketStructure::Bullish
    } else if ll && lh {
        MarketStructure::Bearish
    } else if hh && ll {
        MarketStructure::BreakUp
    } else if lh && hl {
        MarketStructure::BreakDown
    } else {
        MarketStructure::Ranging
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivergenceDirection {
    Bullish,
    Bearish,
}

/// Compares the two most recent swing lows (bullish candidate) or swing highs
/// (bearish candidate) against an indicator series aligned 1:1 with candle
/// index. `indicator_start_offset` marks the first candle index the
/// indicator has a meaningful value for (its warmup/startup length).
pub fn detect_divergence(
    price_swings: &[Swing],
    indicator: &[f64],
    indicator_start_offset: usize,
    threshold: f64,
) -> Option<DivergenceDirection> {
    if price_swings.len() < 2 {
        return None;
    }
    let older = price_swings[price_swings.len() - 2];
    let newer = price_swings[price_swings.len() - 1];
    if older.index < indicator_start_offset
        || newer.index < indicator_start_offset
        || newer.index >= indicator.len()
        || older.index >= indicator.len()
    {
        return None;
    }
    let ind_older = indicator[older.index];
    let ind_newer = indicator[newer.index];

    match older.kind {
        SwingKind::Low => {
            // bullish: price makes a lower low, indicator makes a higher low
            if newer.price < older.price && ind_newer >= ind_older + threshold {
                return Some(DivergenceDirection::Bullish);
            }
            None
        }
        SwingKind::High => {
            // bearish: price makes a higher high, indicator makes a lower high
            if newer.price > older.price && ind_newer <= ind_older - threshold {
                return Some(DivergenceDirection::Bearish);
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swing_high_requires_two_bars_each_side() {
        let highs = vec![1.0, 2.0, 5.0, 2.0, 1.0];
        let swings = swing_highs(&highs);
        assert_eq!(swings.len(), 1);
        assert_eq!(swings[0].index, 2);
    }

    #[test]
    fn structure_bullish_on_hh_hl() {
        let highs = vec![
            Swing { index: 0, price: 10.0, kind: SwingKind::High },
            Swing { index: 5, price: 12.0, kind: SwingKind::High },
        ];
        let lows = vec![
            Swing { index: 2, price: 8.0, kind: SwingKind::Low },
            Swing { index: 7, price: 9.0, kind: SwingKind::Low },
        ];
        assert_eq!(classify_structure(&highs, &lows), MarketStructure::Bullish);
    }

    #[test]
    fn bullish_divergence_detected() {
        let swings = vec![
            Swing { index: 10, price: 100.0, kind: SwingKind::Low },
            Swing { index: 20, price: 95.0, kind: SwingKind::Low },
        ];
        let mut indicator = vec![0.0; 25];
        indicator[10] = 30.0;
        indicator[20] = 35.0;
        let result = detect_divergence(&swings, &indicator, 0, 2.0);
        assert_eq!(result, Some(DivergenceDirection::Bullish));
    }
}
