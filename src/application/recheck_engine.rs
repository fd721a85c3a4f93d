use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::application::analyzer::{FeatureFlags, SignalAnalyzer};
use crate::application::learning_store::LearningStore;
use crate::application::position_manager::PositionManager;
use crate::config::EngineConfig;
use crate::domain::signal::{ScoreBreakdown, Signal, SignalKind};
use crate::domain::strategy::{StrategyId, STRATEGY_TABLE};
use crate::domain::trading::types::{Bias, Candle, CloseReason, Heat, Owner, ScoreCheckSnapshot, Side, Trade};
use crate::infrastructure::ports::{CandleSource, ExchangeAdapter, PriceSource, TradeRepository};

fn to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageCategory {
    Info,
    Positive,
    Warning,
    Danger,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub category: MessageCategory,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestedAction {
    ConsiderExit,
    ReducePosition,
    TakePartial,
    LockInProfit,
    TightenStop,
    Hold,
}

impl SuggestedAction {
    pub fn id(self) -> &'static str {
        match self {
            SuggestedAction::ConsiderExit => "consider_exit",
            SuggestedAction::ReducePosition => "reduce_position",
            SuggestedAction::TakePartial => "take_partial",
            SuggestedAction::LockInProfit => "lock_in_profit",
            SuggestedAction::TightenStop => "tighten_stop",
            SuggestedAction::Hold => "hold",
        }
    }
}

pub struct RecheckOutcome {
    pub heat: Heat,
    pub effective_diff: f64,
    pub messages: Vec<Message>,
    pub change_reasons: Vec<String>,
    pub suggested_action: SuggestedAction,
    pub auto_executed: bool,
}

const HIGH_LEVERAGE_THRESHOLD: u32 = 10;

/// Direction-relative read of a fresh signal against the trade's own bias:
/// full credit when the signal agrees, mirrored when it flips, midpoint
/// when it's flat. This is what "direction-agnostic effectiveDiff" means -
/// the same arithmetic regardless of whether the trade is LONG or SHORT.
fn directional_score(signal: &Signal, trade_bias: Bias) -> f64 {
    match (signal.direction, trade_bias) {
        (Bias::Neutral, _) => 50.0,
        (dir, bias) if dir == bias => signal.final_score,
        _ => 100.0 - signal.final_score,
    }
}

fn unrealized_pnl_pct(trade: &Trade, price: Decimal) -> f64 {
    (to_f64(price) - to_f64(trade.entry_price)) / to_f64(trade.entry_price).max(1e-9)
        * trade.side.sign()
        * trade.leverage as f64
        * 100.0
}

fn progress_to_tp2(trade: &Trade, price: Decimal) -> f64 {
    let Some(tp2) = trade.take_profit2 else { return 0.0 };
    let total = (tp2 - trade.entry_price).abs();
    if total.is_zero() {
        return 0.0;
    }
    let moved = match trade.side {
        Side::Long => price - trade.entry_price,
        Side::Short => trade.entry_price - price,
    };
    (to_f64(moved) / to_f64(total)).clamp(0.0, 2.0)
}

fn dimension_deltas(entry: &ScoreBreakdown, current: &ScoreBreakdown) -> Vec<(&'static str, f64)> {
    vec![
        ("trend", current.trend - entry.trend),
        ("momentum", current.momentum - entry.momentum),
        ("volume", current.volume - entry.volume),
        ("structure", current.structure - entry.structure),
        ("volatility", current.volatility - entry.volatility),
        ("risk_quality", current.risk_quality - entry.risk_quality),
    ]
}

/// Re-analyzes every open trade against a fresh Signal, deriving heat,
/// messages, change reasons and a suggested action, then optionally
/// invoking Position Manager to act on it.
pub struct RecheckEngine<R: TradeRepository, X: ExchangeAdapter, P: PriceSource, C: CandleSource> {
    config: Arc<EngineConfig>,
    position_manager: Arc<PositionManager<R, X, P>>,
    repository: Arc<R>,
    price_source: Arc<P>,
    candle_source: Arc<C>,
    learning_store: Arc<LearningStore>,
}

impl<R: TradeRepository, X: ExchangeAdapter, P: PriceSource, C: CandleSource> RecheckEngine<R, X, P, C> {
    pub fn new(
        config: Arc<EngineConfig>,
        position_manager: Arc<PositionManager<R, X, P>>,
        repository: Arc<R>,
        price_source: Arc<P>,
        candle_source: Arc<C>,
        learning_store: Arc<LearningStore>,
    ) -> Self {
        Self { config, position_manager, repository, price_source, candle_source, learning_store }
    }

    pub async fn tick(
        &self,
        owners: &HashMap<String, Arc<Mutex<Owner>>>,
        funding_rates: &HashMap<String, f64>,
        btc_candles: Option<&[Candle]>,
        flags: FeatureFlags,
        bar_time: DateTime<Utc>,
    ) {
        let trades = match self.repository.all_open().await {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "failed to list open trades for recheck tick");
                return;
            }
        };
        for mut trade in trades {
            let Some(owner_mutex) = owners.get(&trade.owner_id).cloned() else {
                warn!(trade_id = %trade.id, "no owner record for trade, skipping recheck");
                continue;
            };
            let funding_rate = funding_rates.get(&trade.coin.id).copied();
            let mut owner = owner_mutex.lock().await;
            if let Err(e) = self
                .recheck_one(&mut owner, &mut trade, funding_rate, btc_candles, flags, bar_time)
                .await
            {
                warn!(trade_id = %trade.id, error = %e, "recheck failed for trade");
            }
        }
    }

    pub async fn recheck_one(
        &self,
        owner: &mut Owner,
        trade: &mut Trade,
        funding_rate: Option<f64>,
        btc_candles: Option<&[Candle]>,
        flags: FeatureFlags,
        bar_time: DateTime<Utc>,
    ) -> anyhow::Result<Option<RecheckOutcome>> {
        if !trade.is_open() {
            return Ok(None);
        }

        let price = self.price_source.fetch_live_price(&trade.coin.id).await.unwrap_or_else(|_| {
            self.price_source.price_for(&trade.coin.id).unwrap_or(trade.entry_price)
        });
        let drift = (to_f64(price) - to_f64(trade.entry_price)).abs() / to_f64(trade.entry_price).max(1e-9);
        if drift > 0.5 {
            warn!(trade_id = %trade.id, drift, "recheck sanity check failed, skipping");
            return Ok(None);
        }

        let candles_by_tf = self.candle_source.candles(&trade.coin.id).await?;
        let trade_counts = self.learning_store.all_trade_counts().await;
        let mut learned_weights: HashMap<StrategyId, [f64; 6]> = HashMap::new();
        for def in STRATEGY_TABLE.iter() {
            learned_weights.insert(def.id, self.learning_store.adjusted_weights(def.id).await);
        }

        let analyzer = SignalAnalyzer::new(&self.config);
        let fresh = analyzer.analyze(
            &trade.coin,
            &candles_by_tf,
            btc_candles,
            funding_rate,
            bar_time,
            flags,
            &trade_counts,
            Some(&learned_weights),
        );

        let trade_bias = match trade.side {
            Side::Long => Bias::Bull,
            Side::Short => Bias::Bear,
        };
        let raw_diff = directional_score(&fresh, trade_bias) - trade.score_at_entry;
        let flipped = fresh.direction != Bias::Neutral && fresh.direction != trade_bias;
        let is_hold = fresh.signal == SignalKind::Hold;
        let effective_diff = raw_diff + if flipped { -15.0 } else { 0.0 } + if is_hold { -4.0 } else { 0.0 };

        let pnl_pct = unrealized_pnl_pct(trade, price);
        let high_leverage = trade.leverage >= HIGH_LEVERAGE_THRESHOLD;

        let mut messages = Vec::new();
        let mut change_reasons = Vec::new();

        let significant_loss = pnl_pct <= -5.0;
        let opposing_extreme = matches!(
            (trade_bias, fresh.signal),
            (Bias::Bull, SignalKind::StrongSell) | (Bias::Bear, SignalKind::StrongBuy)
        );
        if (flipped && effective_diff <= -20.0) || opposing_extreme {
            messages.push(Message { category: MessageCategory::Danger, text: "Setup invalidated".into() });
        }

        for (name, delta) in dimension_deltas(&trade.score_breakdown_at_entry, &fresh.score_breakdown) {
            if delta.abs() >= 3.0 {
                let direction = if delta > 0.0 { "strengthened" } else { "weakened" };
                change_reasons.push(format!("{name} {direction} ({delta:+.1})"));
            }
        }
        let structure_breaking = (fresh.score_breakdown.structure - trade.score_breakdown_at_entry.structure) <= -8.0;
        if structure_breaking {
            messages.push(Message { category: MessageCategory::Warning, text: "Structure breaking".into() });
        }
        let momentum_weakening = (fresh.score_breakdown.momentum - trade.score_breakdown_at_entry.momentum) <= -5.0;
        if momentum_weakening {
            messages.push(Message { category: MessageCategory::Warning, text: "Momentum weakening".into() });
        }
        if flipped {
            change_reasons.push("signal direction flipped against trade".into());
        }
        if is_hold {
            change_reasons.push("signal moved to HOLD".into());
        }

        let aligned = !flipped && !is_hold;
        if effective_diff >= 5.0 && aligned && !significant_loss {
            messages.push(Message { category: MessageCategory::Positive, text: "Confidence increasing".into() });
        }
        let tp2_progress = progress_to_tp2(trade, price);
        if tp2_progress >= 0.5 && aligned && !significant_loss {
            messages.push(Message { category: MessageCategory::Positive, text: "TP probability rising".into() });
        }

        let near_tp1 = trade.take_profit1.map(|tp1| {
            let dist = (tp1 - price).abs() / price.max(Decimal::new(1, 8));
            to_f64(dist) <= 0.02
        }).unwrap_or(false);
        let solid_long_profit = trade.side == Side::Long && pnl_pct >= 5.0;
        let weakening = structure_breaking || momentum_weakening;
        let consider_partial = near_tp1 && weakening && !solid_long_profit;
        if consider_partial {
            messages.push(Message { category: MessageCategory::Info, text: "Consider partial".into() });
        }

        let one_r_profit = {
            let moved = match trade.side {
                Side::Long => price - trade.entry_price,
                Side::Short => trade.entry_price - price,
            };
            !trade.one_r().is_zero() && moved >= trade.one_r()
        };
        let consider_be = one_r_profit && !trade.breakeven_hit;
        if consider_be {
            messages.push(Message { category: MessageCategory::Info, text: "Consider BE stop".into() });
        }

        let progress = tp2_progress.max({
            trade.take_profit1.map(|tp1| {
                let total = (tp1 - trade.entry_price).abs();
                if total.is_zero() { 0.0 } else {
                    let moved = match trade.side { Side::Long => price - trade.entry_price, Side::Short => trade.entry_price - price };
                    to_f64(moved) / to_f64(total)
                }
            }).unwrap_or(0.0)
        });
        let current_lock_r = if trade.one_r().is_zero() {
            0.0
        } else {
            let moved = match trade.side {
                Side::Long => trade.stop_loss - trade.entry_price,
                Side::Short => trade.entry_price - trade.stop_loss,
            };
            to_f64(moved) / to_f64(trade.one_r())
        };
        let lock_in_available = self
            .config
            .lock_in_levels
            .iter()
            .any(|level| progress >= level.progress && current_lock_r < level.lock_r);
        if lock_in_available {
            messages.push(Message { category: MessageCategory::Positive, text: "Lock in profit available".into() });
        }
        if current_lock_r > 0.0 {
            messages.push(Message {
                category: MessageCategory::Info,
                text: format!("Profit locked: {current_lock_r}R"),
            });
        }
        if high_leverage {
            messages.push(Message { category: MessageCategory::Warning, text: "High leverage warning".into() });
        }
        if let Some(rate) = funding_rate {
            if rate.abs() > 0.0005 {
                messages.push(Message { category: MessageCategory::Warning, text: "Funding rate warning".into() });
            }
        }
        if fresh.reasoning.iter().any(|r| r.contains("BTC correlation")) {
            messages.push(Message { category: MessageCategory::Warning, text: "BTC correlation warning".into() });
        }
        let age_minutes = (bar_time - trade.entry_time).num_minutes();
        if age_minutes > 24 * 60 {
            messages.push(Message { category: MessageCategory::Info, text: "Stale trade".into() });
        }

        let has_danger = messages.iter().any(|m| m.category == MessageCategory::Danger);
        let has_warning = messages.iter().any(|m| m.category == MessageCategory::Warning);

        let mut heat = if (has_danger && effective_diff <= -15.0) || effective_diff <= -25.0 {
            Heat::Red
        } else if has_warning || effective_diff <= -8.0 {
            Heat::Yellow
        } else {
            Heat::Green
        };
        if has_danger && effective_diff >= 15.0 && !flipped {
            heat = Heat::Yellow;
        }
        if pnl_pct <= -20.0 {
            heat = Heat::Red;
        } else if pnl_pct <= -10.0 && heat == Heat::Green {
            heat = Heat::Yellow;
        }

        let exit_threshold = if high_leverage { -25.0 } else { -30.0 };
        let reduce_threshold = if high_leverage { -20.0 } else { -25.0 };
        let hard_exit = if high_leverage { -35.0 } else { -45.0 };

        let near_tp2 = progress_to_tp2(trade, price) >= 0.8;
        let in_profit = pnl_pct > 0.0;

        let mut action = SuggestedAction::Hold;

        let consider_exit_raw = (pnl_pct <= -25.0 && effective_diff < 10.0)
            || (heat == Heat::Red && has_danger && effective_diff <= exit_threshold)
            || effective_diff <= hard_exit;
        if consider_exit_raw {
            action = if in_profit || near_tp2 { SuggestedAction::TightenStop } else { SuggestedAction::ConsiderExit };
        } else {
            let reduce_raw = (pnl_pct <= -20.0 && high_leverage)
                || (pnl_pct <= -15.0 && effective_diff < 10.0)
                || effective_diff <= reduce_threshold
                || (structure_breaking && effective_diff <= -10.0);
            if reduce_raw {
                action = if in_profit { SuggestedAction::TightenStop } else { SuggestedAction::ReducePosition };
            } else if consider_partial && pnl_pct <= 0.0 {
                action = SuggestedAction::TakePartial;
            } else if lock_in_available {
                action = SuggestedAction::LockInProfit;
            } else if (heat == Heat::Red && effective_diff <= -10.0)
                || (heat == Heat::Yellow && effective_diff < 0.0)
                || consider_be
            {
                action = SuggestedAction::TightenStop;
            }
        }

        let snapshot = ScoreCheckSnapshot {
            score: fresh.final_score,
            effective_diff,
            heat,
            suggested_action: action.id().to_string(),
            timestamp: bar_time,
        };
        trade.push_score_snapshot(snapshot);

        let auto_executed = self
            .maybe_auto_execute(owner, trade, action, pnl_pct, price, age_minutes)
            .await;

        self.repository.update(trade.clone()).await?;

        info!(trade_id = %trade.id, ?heat, effective_diff, action = action.id(), auto_executed, "recheck complete");

        Ok(Some(RecheckOutcome { heat, effective_diff, messages, change_reasons, suggested_action: action, auto_executed }))
    }

    /// Profit protection: exit/reduce/partial never auto-fire while
    /// unrealized PnL >= 0 - stop/TP automation alone handles winners.
    async fn maybe_auto_execute(
        &self,
        owner: &mut Owner,
        trade: &mut Trade,
        action: SuggestedAction,
        pnl_pct: f64,
        price: Decimal,
        age_minutes: i64,
    ) -> bool {
        if !owner.auto_execute_enabled {
            return false;
        }
        if age_minutes < self.config.score_check_grace_minutes {
            return false;
        }
        let action_id = action.id().to_string();
        let is_repeat = trade.last_executed_action_id.as_deref() == Some(action_id.as_str());

        match action {
            SuggestedAction::ConsiderExit | SuggestedAction::ReducePosition | SuggestedAction::TakePartial => {
                if pnl_pct >= 0.0 {
                    return false;
                }
                if is_repeat {
                    return false;
                }
                let result = match action {
                    SuggestedAction::ConsiderExit => {
                        self.position_manager.close(owner, trade, price, CloseReason::ScoreExit).await
                    }
                    SuggestedAction::ReducePosition | SuggestedAction::TakePartial => {
                        let portion = trade.position_size * Decimal::new(5, 1);
                        self.position_manager.partial_close(owner, trade, portion, price).await
                    }
                    _ => unreachable!(),
                };
                if result.is_ok() {
                    trade.last_executed_action_id = Some(action_id);
                    true
                } else {
                    false
                }
            }
            SuggestedAction::TightenStop => {
                let moved = match trade.side {
                    Side::Long => price - trade.entry_price,
                    Side::Short => trade.entry_price - price,
                };
                if trade.breakeven_hit || trade.one_r().is_zero() || moved < trade.one_r() {
                    return false;
                }
                trade.stop_loss = trade.entry_price;
                trade.breakeven_hit = true;
                trade.last_executed_action_id = Some(action_id);
                true
            }
            SuggestedAction::LockInProfit => {
                if is_repeat || trade.one_r().is_zero() {
                    return false;
                }
                let moved = match trade.side {
                    Side::Long => price - trade.entry_price,
                    Side::Short => trade.entry_price - price,
                };
                let current_r = to_f64(moved) / to_f64(trade.one_r());
                let existing_lock = {
                    let stop_moved = match trade.side {
                        Side::Long => trade.stop_loss - trade.entry_price,
                        Side::Short => trade.entry_price - trade.stop_loss,
                    };
                    to_f64(stop_moved) / to_f64(trade.one_r())
                };
                let next_level = self
                    .config
                    .lock_in_levels
                    .iter()
                    .find(|l| current_r / l.progress.max(1e-9) >= 1.0 && existing_lock < l.lock_r);
                if let Some(level) = next_level {
                    let candidate = match trade.side {
                        Side::Long => trade.entry_price + trade.one_r() * Decimal::from_f64_retain(level.lock_r).unwrap_or_default(),
                        Side::Short => trade.entry_price - trade.one_r() * Decimal::from_f64_retain(level.lock_r).unwrap_or_default(),
                    };
                    trade.stop_loss = candidate;
                    trade.last_executed_action_id = Some(action_id);
                    true
                } else {
                    false
                }
            }
            SuggestedAction::Hold => false,
        }
    }
}
