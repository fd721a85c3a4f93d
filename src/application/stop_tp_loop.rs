use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::position_manager::PositionManager;
use crate::config::EngineConfig;
use crate::domain::trading::types::{Action, ActionKind, CloseReason, Owner, Side, Trade};
use crate::infrastructure::ports::{ExchangeAdapter, PriceSource, TradeRepository};

fn to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

fn from_f64(v: f64) -> Decimal {
    Decimal::from_f64_retain(v).unwrap_or_default()
}

/// Per-trade state carried only within a single tick; nothing here survives
/// across ticks except what gets written back onto the `Trade`.
struct TickContext {
    one_r: Decimal,
    trade_age_minutes: i64,
}

/// Walks every OPEN trade once per tick, advancing stops (breakeven,
/// trailing, stepped lock-in) and firing partial/full exits on TP or SL
/// hits. Each trade's mutation is serialized by an owning `Mutex` so a
/// per-tick implementation can fan trades out concurrently.
pub struct StopTpLoop<R: TradeRepository, X: ExchangeAdapter, P: PriceSource> {
    config: Arc<EngineConfig>,
    position_manager: Arc<PositionManager<R, X, P>>,
    repository: Arc<R>,
    price_source: Arc<P>,
}

impl<R: TradeRepository, X: ExchangeAdapter, P: PriceSource> StopTpLoop<R, X, P> {
    pub fn new(
        config: Arc<EngineConfig>,
        position_manager: Arc<PositionManager<R, X, P>>,
        repository: Arc<R>,
        price_source: Arc<P>,
    ) -> Self {
        Self { config, position_manager, repository, price_source }
    }

    pub async fn tick(&self, owners: &HashMap<String, Arc<Mutex<Owner>>>) {
        let trades = match self.repository.all_open().await {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "failed to list open trades for stop/tp tick");
                return;
            }
        };
        let futures = trades.into_iter().map(|trade| {
            let owner_mutex = owners.get(&trade.owner_id).cloned();
            self.process_trade(trade, owner_mutex)
        });
        join_all(futures).await;
    }

    async fn process_trade(&self, mut trade: Trade, owner_mutex: Option<Arc<Mutex<Owner>>>) {
        let Some(owner_mutex) = owner_mutex else {
            warn!(trade_id = %trade.id, "no owner record for trade, skipping tick");
            return;
        };
        let price = match self.price_source.price_for(&trade.coin.id) {
            Some(p) => p,
            None => return,
        };

        let dust_floor = trade.original_position_size * Decimal::new(1, 2);
        if trade.position_size < dust_floor {
            let mut owner = owner_mutex.lock().await;
            let _ = self
                .position_manager
                .close(&mut owner, &mut trade, price, CloseReason::DustCleanup)
                .await;
            return;
        }

        let drift = (to_f64(price) - to_f64(trade.entry_price)).abs() / to_f64(trade.entry_price).max(1e-9);
        if drift > 0.5 {
            warn!(trade_id = %trade.id, drift, "price sanity check failed, skipping tick");
            return;
        }

        if price > trade.max_price_seen {
            trade.max_price_seen = price;
        }
        if price < trade.min_price_seen {
            trade.min_price_seen = price;
        }

        if trade.original_stop_loss.is_none() {
            trade.original_stop_loss = Some(trade.stop_loss);
        }

        let stop_passed_entry = match trade.side {
            Side::Long => trade.stop_loss >= trade.entry_price,
            Side::Short => trade.stop_loss <= trade.entry_price,
        };
        if trade.trailing_activated && !stop_passed_entry {
            trade.trailing_activated = false;
        }

        let ctx = TickContext {
            one_r: trade.one_r(),
            trade_age_minutes: (Utc::now() - trade.entry_time).num_minutes(),
        };

        if ctx.trade_age_minutes >= self.config.stop_check_grace_minutes {
            self.apply_breakeven(&mut trade, price, &ctx);
            self.apply_trailing(&mut trade, price, &ctx);
            self.apply_stepped_lock_in(&mut trade, price, &ctx);
        }

        self.scrub_wrong_side_tps(&mut trade);

        let mut owner = owner_mutex.lock().await;
        if let Some(reason) = self.process_tp_sl(&mut owner, &mut trade, price).await {
            info!(trade_id = %trade.id, ?reason, "trade closed by stop/tp processing");
            return;
        }
        drop(owner);

        if let Err(e) = self.repository.update(trade).await {
            warn!(error = %e, "failed to persist stop/tp loop state");
        }
    }

    fn apply_breakeven(&self, trade: &mut Trade, price: Decimal, ctx: &TickContext) {
        if trade.trailing_activated || trade.stop_loss == trade.entry_price || ctx.one_r.is_zero() {
            return;
        }
        let target = match trade.side {
            Side::Long => trade.entry_price + ctx.one_r,
            Side::Short => trade.entry_price - ctx.one_r,
        };
        let reached = match trade.side {
            Side::Long => price >= target,
            Side::Short => price <= target,
        };
        if !reached {
            return;
        }
        let old = trade.stop_loss;
        trade.stop_loss = trade.entry_price;
        trade.breakeven_hit = true;
        trade.actions.push(Action {
            id: Uuid::new_v4().to_string(),
            kind: ActionKind::BreakevenStop,
            description: "stop moved to breakeven".into(),
            old_value: Some(old),
            new_value: Some(trade.stop_loss),
            market_price: price,
            timestamp: Utc::now(),
        });
    }

    fn apply_trailing(&self, trade: &mut Trade, price: Decimal, ctx: &TickContext) {
        if ctx.one_r.is_zero() {
            return;
        }
        let stop_passed_entry = match trade.side {
            Side::Long => trade.stop_loss >= trade.entry_price,
            Side::Short => trade.stop_loss <= trade.entry_price,
        };
        if !(stop_passed_entry || trade.trailing_activated) {
            return;
        }
        let threshold = ctx.one_r * Decimal::new(15, 1);
        let target = match trade.side {
            Side::Long => trade.entry_price + threshold,
            Side::Short => trade.entry_price - threshold,
        };
        let reached = match trade.side {
            Side::Long => price >= target,
            Side::Short => price <= target,
        };
        if !reached {
            return;
        }
        trade.trailing_activated = true;
        let candidate = match trade.side {
            Side::Long => trade.max_price_seen - ctx.one_r,
            Side::Short => trade.min_price_seen + ctx.one_r,
        };
        let improves = match trade.side {
            Side::Long => candidate > trade.stop_loss,
            Side::Short => candidate < trade.stop_loss,
        };
        let correct_side = match trade.side {
            Side::Long => candidate < price,
            Side::Short => candidate > price,
        };
        if improves && correct_side {
            let old = trade.stop_loss;
            trade.stop_loss = candidate;
            trade.actions.push(Action {
                id: Uuid::new_v4().to_string(),
                kind: ActionKind::TrailingStop,
                description: "trailing stop advanced".into(),
                old_value: Some(old),
                new_value: Some(candidate),
                market_price: price,
                timestamp: Utc::now(),
            });
        }
    }

    fn apply_stepped_lock_in(&self, trade: &mut Trade, price: Decimal, ctx: &TickContext) {
        if ctx.one_r.is_zero() {
            return;
        }
        let primary_tp = trade.take_profit2.or(trade.take_profit1).or(trade.take_profit3);
        let progress = match primary_tp {
            Some(tp) => {
                let total = (tp - trade.entry_price).abs();
                if total.is_zero() {
                    0.0
                } else {
                    let moved = match trade.side {
                        Side::Long => price - trade.entry_price,
                        Side::Short => trade.entry_price - price,
                    };
                    (to_f64(moved) / to_f64(total)).clamp(0.0, 1.5)
                }
            }
            None => {
                let pnl_pct = to_f64(price - trade.entry_price) / to_f64(trade.entry_price).max(1e-9)
                    * trade.side.sign()
                    * trade.leverage as f64
                    * 100.0;
                if pnl_pct >= 5.0 {
                    0.9
                } else if pnl_pct >= 2.0 {
                    0.5
                } else {
                    0.0
                }
            }
        };

        let current_lock_r = if ctx.one_r.is_zero() {
            0.0
        } else {
            let moved = match trade.side {
                Side::Long => trade.stop_loss - trade.entry_price,
                Side::Short => trade.entry_price - trade.stop_loss,
            };
            to_f64(moved) / to_f64(ctx.one_r)
        };

        for level in self.config.lock_in_levels.iter() {
            if progress >= level.progress && current_lock_r < level.lock_r {
                let candidate = match trade.side {
                    Side::Long => trade.entry_price + ctx.one_r * from_f64(level.lock_r),
                    Side::Short => trade.entry_price - ctx.one_r * from_f64(level.lock_r),
                };
                let improves = match trade.side {
                    Side::Long => candidate > trade.stop_loss,
                    Side::Short => candidate < trade.stop_loss,
                };
                if improves {
                    let old = trade.stop_loss;
                    trade.stop_loss = candidate;
                    trade.actions.push(Action {
                        id: Uuid::new_v4().to_string(),
                        kind: ActionKind::StepLockIn,
                        description: format!("locked in {}R", level.lock_r),
                        old_value: Some(old),
                        new_value: Some(candidate),
                        market_price: price,
                        timestamp: Utc::now(),
                    });
                }
            }
        }
    }

    fn scrub_wrong_side_tps(&self, trade: &mut Trade) {
        let scrub = |tp: Option<Decimal>, side: Side, entry: Decimal| -> Option<Decimal> {
            tp.filter(|&v| match side {
                Side::Long => v > entry,
                Side::Short => v < entry,
            })
        };
        trade.take_profit1 = scrub(trade.take_profit1, trade.side, trade.entry_price);
        trade.take_profit2 = scrub(trade.take_profit2, trade.side, trade.entry_price);
        trade.take_profit3 = scrub(trade.take_profit3, trade.side, trade.entry_price);
    }

    /// Processes SL then TP1/TP2/TP3 lowest-to-highest in the favorable
    /// direction, so a price gap that clears every level fires all of them
    /// within the same tick. Returns the close reason if the trade ended up
    /// fully closed.
    async fn process_tp_sl(
        &self,
        owner: &mut Owner,
        trade: &mut Trade,
        price: Decimal,
    ) -> Option<CloseReason> {
        let stop_breached = match trade.side {
            Side::Long => price <= trade.stop_loss,
            Side::Short => price >= trade.stop_loss,
        };
        if stop_breached {
            let slip = match trade.side {
                Side::Long => price.min(trade.stop_loss),
                Side::Short => price.max(trade.stop_loss),
            };
            let _ = self.position_manager.close(owner, trade, slip, CloseReason::StoppedOut).await;
            return Some(CloseReason::StoppedOut);
        }

        if let Some(tp1) = trade.take_profit1 {
            let hit = match trade.side {
                Side::Long => price >= tp1,
                Side::Short => price <= tp1,
            };
            if hit && !trade.partial_taken_at_tp1 {
                if trade.take_profit2.is_none() && trade.take_profit3.is_none() {
                    let _ = self.position_manager.close(owner, trade, tp1, CloseReason::Tp1).await;
                    return Some(CloseReason::Tp1);
                }
                let portion = trade.original_position_size * self.config.tp1_pct;
                let _ = self.position_manager.partial_close(owner, trade, portion, tp1).await;
            }
        }

        if let Some(tp2) = trade.take_profit2 {
            let hit = match trade.side {
                Side::Long => price >= tp2,
                Side::Short => price <= tp2,
            };
            if hit && !trade.partial_taken_at_tp2 {
                if trade.take_profit3.is_none() {
                    let _ = self.position_manager.close(owner, trade, tp2, CloseReason::Tp2).await;
                    return Some(CloseReason::Tp2);
                }
                let portion = trade.original_position_size * self.config.tp2_pct;
                let _ = self.position_manager.partial_close(owner, trade, portion, tp2).await;
            }
        }

        if let Some(tp3) = trade.take_profit3 {
            let hit = match trade.side {
                Side::Long => price >= tp3,
                Side::Short => price <= tp3,
            };
            if hit && trade.is_open() {
                let _ = self.position_manager.close(owner, trade, tp3, CloseReason::Tp3).await;
                return Some(CloseReason::Tp3);
            }
        }

        None
    }
}
