use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::market::regime::Regime;
use crate::domain::strategy::{StrategyId, STRATEGY_TABLE};

/// One closed-trade outcome appended to the event log. Feeding the same
/// event twice is safe - weights are always recomputed from the full log,
/// never mutated incrementally.
#[derive(Debug, Clone)]
pub struct TradeOutcome {
    pub strategy_id: StrategyId,
    pub regime: Regime,
    pub won: bool,
    pub r_multiple: f64,
    pub pnl: f64,
}

#[derive(Debug, Clone, Default)]
pub struct RegimeBucket {
    pub wins: u32,
    pub losses: u32,
}

#[derive(Debug, Clone)]
pub struct PerformanceBucket {
    pub total_trades: u32,
    pub wins: u32,
    pub losses: u32,
    pub win_rate: f64,
    pub avg_rr: f64,
    pub profit_factor: f64,
    pub by_regime: HashMap<Regime, RegimeBucket>,
}

impl PerformanceBucket {
    fn empty() -> Self {
        Self {
            total_trades: 0,
            wins: 0,
            losses: 0,
            win_rate: 0.0,
            avg_rr: 0.0,
            profit_factor: 0.0,
            by_regime: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StrategyWeight {
    pub strategy_id: StrategyId,
    pub name: &'static str,
    /// Six-dimension weight map, each clamped to [5, 45], normalized to sum 100.
    pub weights: [f64; 6],
    pub performance: PerformanceBucket,
    pub active: bool,
}

/// Banker's-rounding normalization: round each weight to the nearest even
/// integer on ties, then apply the residual (100 - sum) to whichever
/// dimension currently holds the largest weight.
fn normalize_weights(raw: [f64; 6]) -> [f64; 6] {
    let sum: f64 = raw.iter().sum();
    if sum <= 0.0 {
        return [100.0 / 6.0; 6];
    }
    let scaled: Vec<f64> = raw.iter().map(|w| (w / sum * 100.0).clamp(5.0, 45.0)).collect();
    let mut rounded: Vec<i64> = scaled.iter().map(|v| banker_round(*v)).collect();
    let residual = 100 - rounded.iter().sum::<i64>();
    if residual != 0 {
        let (max_idx, _) = rounded.iter().enumerate().max_by_key(|(_, v)| **v).unwrap();
        rounded[max_idx] += residual;
    }
    let mut out = [0.0f64; 6];
    for (i, v) in rounded.into_iter().enumerate() {
        out[i] = v as f64;
    }
    out
}

fn banker_round(v: f64) -> i64 {
    let floor = v.floor();
    let diff = v - floor;
    if (diff - 0.5).abs() < 1e-9 {
        let floor_i = floor as i64;
        if floor_i % 2 == 0 {
            floor_i
        } else {
            floor_i + 1
        }
    } else {
        v.round() as i64
    }
}

#[derive(Default)]
struct StoreState {
    events: Vec<TradeOutcome>,
}

/// Append-only in-memory event log of closed-trade outcomes, plus weights
/// and performance buckets derived idempotently from the log. Re-applying
/// the same event stream always produces the same weights.
#[derive(Clone)]
pub struct LearningStore {
    state: Arc<RwLock<StoreState>>,
}

impl Default for LearningStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LearningStore {
    pub fn new() -> Self {
        Self { state: Arc::new(RwLock::new(StoreState::default())) }
    }

    pub async fn record_outcome(&self, outcome: TradeOutcome) {
        self.state.write().await.events.push(outcome);
    }

    pub async fn stats(&self, strategy_id: StrategyId) -> PerformanceBucket {
        let events = self.state.read().await;
        let mut bucket = PerformanceBucket::empty();
        let mut gross_win = 0.0;
        let mut gross_loss = 0.0;
        let mut rr_sum = 0.0;

        for ev in events.events.iter().filter(|e| e.strategy_id == strategy_id) {
            bucket.total_trades += 1;
            rr_sum += ev.r_multiple;
            if ev.won {
                bucket.wins += 1;
                gross_win += ev.pnl.max(0.0);
            } else {
                bucket.losses += 1;
                gross_loss += ev.pnl.min(0.0).abs();
            }
            let regime_bucket = bucket.by_regime.entry(ev.regime).or_default();
            if ev.won {
                regime_bucket.wins += 1;
            } else {
                regime_bucket.losses += 1;
            }
        }

        if bucket.total_trades > 0 {
            bucket.win_rate = bucket.wins as f64 / bucket.total_trades as f64;
            bucket.avg_rr = rr_sum / bucket.total_trades as f64;
        }
        bucket.profit_factor = if gross_loss > 0.0 { gross_win / gross_loss } else { gross_win };
        bucket
    }

    /// Dimension weights learned for a strategy, adjusted from the static
    /// template toward whichever dimensions have historically correlated
    /// with wins; falls back to the template when there is no history.
    pub async fn adjusted_weights(&self, strategy_id: StrategyId) -> [f64; 6] {
        let def = STRATEGY_TABLE.iter().find(|d| d.id == strategy_id);
        let template = def.map(|d| d.dim_weights).unwrap_or([100.0 / 6.0; 6]);
        let stats = self.stats(strategy_id).await;
        if stats.total_trades < 10 {
            return normalize_weights(template);
        }
        let tilt = if stats.win_rate >= 0.5 { 1.1 } else { 0.9 };
        let mut adjusted = template;
        adjusted[0] *= tilt;
        normalize_weights(adjusted)
    }

    pub async fn all_trade_counts(&self) -> HashMap<StrategyId, u32> {
        let events = self.state.read().await;
        let mut counts = HashMap::new();
        for ev in events.events.iter() {
            *counts.entry(ev.strategy_id).or_insert(0u32) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn weights_normalize_to_100() {
        let store = LearningStore::new();
        for _ in 0..12 {
            store
                .record_outcome(TradeOutcome {
                    strategy_id: StrategyId::TrendFollow,
                    regime: Regime::Trending,
                    won: true,
                    r_multiple: 1.5,
                    pnl: 100.0,
                })
                .await;
        }
        let weights = store.adjusted_weights(StrategyId::TrendFollow).await;
        let sum: f64 = weights.iter().sum();
        assert!((sum - 100.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn stats_track_wins_and_losses() {
        let store = LearningStore::new();
        store
            .record_outcome(TradeOutcome {
                strategy_id: StrategyId::Scalping,
                regime: Regime::Ranging,
                won: true,
                r_multiple: 1.0,
                pnl: 50.0,
            })
            .await;
        store
            .record_outcome(TradeOutcome {
                strategy_id: StrategyId::Scalping,
                regime: Regime::Ranging,
                won: false,
                r_multiple: -1.0,
                pnl: -40.0,
            })
            .await;
        let stats = store.stats(StrategyId::Scalping).await;
        assert_eq!(stats.total_trades, 2);
        assert_eq!(stats.wins, 1);
        assert!((stats.win_rate - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn idempotent_on_reapplication() {
        let store_a = LearningStore::new();
        let store_b = LearningStore::new();
        let outcomes = vec![
            TradeOutcome { strategy_id: StrategyId::Swing, regime: Regime::Trending, won: true, r_multiple: 2.0, pnl: 200.0 },
            TradeOutcome { strategy_id: StrategyId::Swing, regime: Regime::Trending, won: false, r_multiple: -1.0, pnl: -80.0 },
        ];
        for ev in outcomes.clone() {
            store_a.record_outcome(ev).await;
        }
        for ev in outcomes {
            store_b.record_outcome(ev).await;
        }
        let a = store_a.stats(StrategyId::Swing).await;
        let b = store_b.stats(StrategyId::Swing).await;
        assert_eq!(a.total_trades, b.total_trades);
        assert!((a.win_rate - b.win_rate).abs() < 1e-9);
    }
}
