use crate::domain::trading::types::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSide {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, Copy)]
pub struct OrderBlock {
    pub index: usize,
    pub side: BlockSide,
    pub high: f64,
    pub low: f64,
}

/// The last opposing candle before a displacement whose body exceeds
/// 0.4*ATR, searched over a bounded lookback window from the end.
pub fn find_last_order_block(candles: &[Candle], atr: f64, lookback: usize) -> Option<OrderBlock> {
    if candles.len() < 2 || atr <= 0.0 {
        return None;
    }
    let start = candles.len().saturating_sub(lookback).max(1);
    for i in (start..candles.len()).rev() {
        let displacement = &candles[i];
        let prior = &candles[i - 1];
        let body = (displacement.close - displacement.open).abs();
        if body <= 0.4 * atr {
            continue;
        }
        let displacement_bullish = displacement.close > displacement.open;
        let prior_bearish = prior.close < prior.open;
        let prior_bullish = prior.close > prior.open;

        if displacement_bullish && prior_bearish {
            return Some(OrderBlock {
                index: i - 1,
                side: BlockSide::Bullish,
                high: prior.high,
                low: prior.low,
            });
        }
        if !displacement_bullish && prior_bullish {
            return Some(OrderBlock {
                index: i - 1,
                side: BlockSide::Bearish,
                high: prior.high,
                low: prior.low,
            });
        }
    }
    None
}

#[derive(Debug, Clone, Copy)]
pub struct FairValueGap {
    pub index: usize,
    pub side: BlockSide,
    pub top: f64,
    pub bottom: f64,
}

/// Three-candle imbalance: bullish when candle[i+2].low > candle[i].high,
/// bearish when candle[i+2].high < candle[i].low.
pub fn detect_fair_value_gaps(candles: &[Candle]) -> Vec<FairValueGap> {
    let mut out = Vec::new();
    if candles.len() < 3 {
        return out;
    }
    for i in 0..candles.len() - 2 {
        let a = &candles[i];
        let c = &candles[i + 2];
        if c.low > a.high {
            out.push(FairValueGap {
                index: i,
                side: BlockSide::Bullish,
                top: c.low,
                bottom: a.high,
            });
        } else if c.high < a.low {
            out.push(FairValueGap {
                index: i,
                side: BlockSide::Bearish,
                top: a.low,
                bottom: c.high,
            });
        }
    }
    out
}

#[derive(Debug, Clone, Copy)]
pub struct LiquidityCluster {
    pub price: f64,
    pub touches: usize,
}

/// Groups swing extrema within 0.5% proximity of each other into clusters,
/// then returns the nearest cluster above and below the current price.
pub fn find_liquidity_clusters(
    swing_prices: &[f64],
    current_price: f64,
) -> (Option<LiquidityCluster>, Option<LiquidityCluster>) {
    if swing_prices.is_empty() {
        return (None, None);
    }
    let mut sorted: Vec<f64> = swing_prices.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let mut clusters: Vec<LiquidityCluster> = Vec::new();
    for price in sorted {
        if let Some(last) = clusters.last_mut() {
            if (price - last.price).abs() / last.price <= 0.005 {
                let total_touches = last.touches + 1;
                last.price = (last.price * last.touches as f64 + price) / total_touches as f64;
                last.touches = total_touches;
                continue;
            }
        }
        clusters.push(LiquidityCluster { price, touches: 1 });
    }

    let above = clusters
        .iter()
        .filter(|c| c.price > current_price)
        .min_by(|a, b| a.price.partial_cmp(&b.price).unwrap())
        .copied();
    let below = clusters
        .iter()
        .filter(|c| c.price < current_price)
        .max_by(|a, b| a.price.partial_cmp(&b.price).unwrap())
        .copied();
    (above, below)
}
