use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::application::learning_store::{LearningStore, TradeOutcome};
use crate::config::EngineConfig;
use crate::domain::errors::TradeError;
use crate::domain::signal::Signal;
use crate::domain::trading::fees::{FeeModel, StandardFeeModel};
use crate::domain::trading::types::{
    Action, ActionKind, CloseReason, ExecutionStatus, Owner, Side, Trade, TradeStatus,
};
use crate::infrastructure::ports::{ExchangeAdapter, PriceSource, TradeRepository};

pub struct PositionManager<R: TradeRepository, X: ExchangeAdapter, P: PriceSource> {
    config: Arc<EngineConfig>,
    repository: Arc<R>,
    exchange: Arc<X>,
    price_source: Arc<P>,
    learning_store: Arc<LearningStore>,
}

fn to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

fn from_f64(v: f64) -> Decimal {
    Decimal::from_f64_retain(v).unwrap_or_default()
}

impl<R: TradeRepository, X: ExchangeAdapter, P: PriceSource> PositionManager<R, X, P> {
    pub fn new(
        config: Arc<EngineConfig>,
        repository: Arc<R>,
        exchange: Arc<X>,
        price_source: Arc<P>,
        learning_store: Arc<LearningStore>,
    ) -> Self {
        Self { config, repository, exchange, price_source, learning_store }
    }

    /// Opens a new trade from a Signal, applying the spec's reject/slippage/
    /// scrub/sizing-cascade pipeline. Debits the owner's balance and persists
    /// the paper trade unconditionally; live submission never rolls it back.
    pub async fn open(&self, owner: &mut Owner, signal: &Signal) -> Result<Trade, TradeError> {
        let open_trades = self.repository.open_trades_for_owner(&owner.id).await?;
        if open_trades.iter().any(|t| t.coin.id == signal.coin.id) {
            return Err(TradeError::DuplicateOpenTrade { symbol: signal.coin.symbol.clone() });
        }
        if open_trades.len() >= owner.max_open_trades {
            return Err(TradeError::MaxOpenTradesReached { current: open_trades.len(), max: owner.max_open_trades });
        }
        let side = signal.direction.as_side().unwrap_or(Side::Long);
        let cooldown_cutoff = Utc::now() - Duration::hours(owner.cooldown_hours);
        let recent = self.repository.recently_closed_for_coin(&owner.id, &signal.coin.id, side, cooldown_cutoff).await?;
        if !recent.is_empty() {
            return Err(TradeError::InCooldown { symbol: signal.coin.symbol.clone(), until: cooldown_cutoff + Duration::hours(owner.cooldown_hours) });
        }

        let slippage_frac = self.config.slippage_bps as f64 / 10_000.0;
        let raw_entry = to_f64(signal.entry);
        let entry_price = match side {
            Side::Long => from_f64(raw_entry * (1.0 + slippage_frac)),
            Side::Short => from_f64(raw_entry / (1.0 + slippage_frac)),
        };

        let stop_distance_pct = (to_f64(entry_price) - to_f64(signal.stop_loss)).abs() / to_f64(entry_price).max(1e-9);
        if stop_distance_pct > self.config.max_sl_distance_pct {
            return Err(TradeError::StopTooWide { distance_pct: stop_distance_pct * 100.0, max_pct: self.config.max_sl_distance_pct * 100.0 });
        }

        let scrub = |tp: Decimal| -> Option<Decimal> {
            let wrong_side = match side {
                Side::Long => tp <= entry_price,
                Side::Short => tp >= entry_price,
            };
            if wrong_side { None } else { Some(tp) }
        };
        let tp1 = scrub(signal.take_profit1);
        let tp2 = signal.take_profit2.and_then(scrub);
        let tp3 = signal.take_profit3.and_then(scrub);

        let strategy_stats = self.learning_store.stats(signal.chosen_strategy).await;
        let position_size = self.size_position(owner, &entry_price, stop_distance_pct, signal, side, &strategy_stats)?;

        let fee_model = StandardFeeModel::new(crate::domain::trading::fees::FeeConfig {
            maker_fee: owner.maker_fee,
            taker_fee: owner.taker_fee,
            slippage_pct: Decimal::ZERO, // already captured by the fill-price slippage shift
            commission_fixed: Decimal::ZERO,
        });
        let leverage = signal.suggested_leverage.max(1);
        let margin = position_size / Decimal::from(leverage);
        let entry_fees = fee_model.calculate_entry_cost(entry_price, position_size / entry_price.max(Decimal::new(1, 8)));

        if margin + entry_fees > owner.balance {
            return Err(TradeError::InsufficientBalance { need: margin + entry_fees, available: owner.balance });
        }

        let now = Utc::now();
        let trade = Trade {
            id: Uuid::new_v4().to_string(),
            owner_id: owner.id.clone(),
            coin: signal.coin.clone(),
            side,
            status: TradeStatus::Open,
            entry_price,
            entry_time: now,
            position_size,
            original_position_size: position_size,
            leverage,
            stop_loss: signal.stop_loss,
            original_stop_loss: Some(signal.stop_loss),
            take_profit1: tp1,
            take_profit2: tp2,
            take_profit3: tp3,
            trailing_activated: false,
            breakeven_hit: false,
            partial_taken_at_tp1: false,
            partial_taken_at_tp2: false,
            partial_pnl: Decimal::ZERO,
            fees_paid: entry_fees,
            score_at_entry: signal.final_score,
            score_breakdown_at_entry: signal.score_breakdown.clone(),
            strategy_type: signal.chosen_strategy,
            regime: signal.regime,
            score_history: VecDeque::new(),
            score_check: None,
            actions: vec![Action {
                id: Uuid::new_v4().to_string(),
                kind: ActionKind::Open,
                description: format!("opened {side} at {entry_price}"),
                old_value: None,
                new_value: Some(entry_price),
                market_price: entry_price,
                timestamp: now,
            }],
            max_price_seen: entry_price,
            min_price_seen: entry_price,
            execution_status: ExecutionStatus::Paper,
            exit_price: None,
            exit_time: None,
            close_reason: None,
            pnl: None,
            pnl_percent: None,
            last_executed_action_id: None,
        };

        owner.balance -= margin + entry_fees;
        self.repository.insert(trade.clone()).await?;
        info!(trade_id = %trade.id, coin = %trade.coin.symbol, %entry_price, "trade opened");

        if self.exchange.is_live(owner) {
            let result = self.exchange.execute_open(owner, &trade, signal).await;
            if !result.accepted {
                tracing::warn!(trade_id = %trade.id, detail = %result.detail, "live open not accepted, paper trade remains authoritative");
            }
        }

        Ok(trade)
    }

    fn size_position(
        &self,
        owner: &Owner,
        entry_price: &Decimal,
        stop_distance_pct: f64,
        signal: &Signal,
        _side: Side,
        strategy_stats: &crate::application::learning_store::PerformanceBucket,
    ) -> Result<Decimal, TradeError> {
        let balance = to_f64(owner.balance);
        let risk_pct = to_f64(owner.risk_per_trade_percent) / 100.0;
        let leverage = signal.suggested_leverage.max(1) as f64;

        let risk_based = (balance * risk_pct / stop_distance_pct.max(1e-9)) * leverage;
        let notional_cap = balance * leverage * 0.95;
        let mut size = risk_based.min(notional_cap);
        info!(step = "risk_based", size, "sizing cascade");

        let confidence_mult = (0.5 + signal.final_score / 100.0).min(1.2);
        size *= confidence_mult;
        info!(step = "confidence", size, "sizing cascade");

        let streak_mult = if owner.current_streak <= -3 {
            0.6
        } else if owner.current_streak <= -2 {
            0.75
        } else if owner.current_streak >= 3 {
            (1.0 + 0.03 * owner.current_streak as f64).min(1.15)
        } else {
            1.0
        };
        size *= streak_mult;
        info!(step = "streak", size, "sizing cascade");

        // Fractional-Kelly overlay: only meaningful once a strategy has
        // enough closed trades that win rate and average R are not noise.
        if strategy_stats.total_trades >= 15 && strategy_stats.avg_rr != 0.0 {
            let win_rate = strategy_stats.win_rate;
            let avg_win_r = strategy_stats.avg_rr.max(0.01);
            let kelly_full = win_rate - (1.0 - win_rate) / avg_win_r;
            let mut kelly_fraction = kelly_full * 0.25;
            if kelly_fraction < -0.1 {
                kelly_fraction *= 0.5;
            }
            let kelly_size = balance * leverage * kelly_fraction.max(0.0);
            if kelly_fraction > 0.0 {
                size = size.min(kelly_size);
            }
            info!(step = "kelly", size, kelly_full, kelly_fraction, "sizing cascade");
        }

        let max_balance_pct = to_f64(owner.max_balance_percent_per_trade) / 100.0;
        let margin_cap = balance * max_balance_pct * leverage;
        size = size.min(margin_cap);
        info!(step = "max_balance_pct", size, "sizing cascade");

        let mut affordable = balance - 0.50;
        let mut margin_needed = size / leverage;
        let fee_rate = to_f64(owner.taker_fee);
        while margin_needed + margin_needed * fee_rate > affordable && size > 0.0 {
            size *= 0.95;
            margin_needed = size / leverage;
        }
        if affordable < 0.0 {
            affordable = 0.0;
        }
        info!(step = "affordability", size, affordable, "sizing cascade");

        if size <= 0.0 {
            return Err(TradeError::InsufficientBalance { need: *entry_price, available: owner.balance });
        }
        Ok(from_f64(size))
    }

    /// Clamps the requested portion to remaining size, promotes to a full
    /// close with reason DUST_CLEANUP when the remainder would fall below
    /// max(1% of original, $1).
    pub async fn partial_close(
        &self,
        owner: &mut Owner,
        trade: &mut Trade,
        portion: Decimal,
        current_price: Decimal,
    ) -> Result<(), TradeError> {
        if !trade.is_open() {
            return Err(TradeError::AlreadyClosed { id: trade.id.clone() });
        }
        let portion = portion.min(trade.position_size);
        let remainder = trade.position_size - portion;
        let dust_floor = (trade.original_position_size * Decimal::new(1, 2)).max(Decimal::ONE);

        if remainder < dust_floor {
            return self.close(owner, trade, current_price, CloseReason::DustCleanup).await;
        }

        let slippage_frac = self.config.slippage_bps as f64 / 10_000.0;
        let fill_price = match trade.side {
            Side::Long => from_f64(to_f64(current_price) * (1.0 - slippage_frac)),
            Side::Short => from_f64(to_f64(current_price) * (1.0 + slippage_frac)),
        };

        let fee_model = StandardFeeModel::new(crate::domain::trading::fees::FeeConfig {
            maker_fee: owner.maker_fee,
            taker_fee: owner.taker_fee,
            slippage_pct: Decimal::ZERO, // already captured by the fill-price slippage shift
            commission_fixed: Decimal::ZERO,
        });
        let qty = portion / trade.entry_price.max(Decimal::new(1, 8));
        let fee = fee_model.calculate_exit_cost(fill_price, qty);
        let sign = Decimal::from(trade.side.sign() as i64);
        let realized = (fill_price - trade.entry_price) * sign * qty;

        trade.position_size = remainder;
        trade.partial_pnl += realized;
        trade.fees_paid += fee;

        let credited_margin = portion / Decimal::from(trade.leverage);
        owner.balance += credited_margin + realized - fee;

        if !trade.partial_taken_at_tp1 {
            trade.partial_taken_at_tp1 = true;
        } else {
            trade.partial_taken_at_tp2 = true;
        }

        trade.actions.push(Action {
            id: Uuid::new_v4().to_string(),
            kind: ActionKind::PartialExit,
            description: format!("partial close of {portion} at {fill_price}"),
            old_value: Some(trade.position_size + portion),
            new_value: Some(trade.position_size),
            market_price: fill_price,
            timestamp: Utc::now(),
        });

        self.repository.update(trade.clone()).await?;
        if self.exchange.is_live(owner) {
            let _ = self.exchange.execute_partial_close(owner, trade, portion).await;
        }
        info!(trade_id = %trade.id, %portion, %remainder, "partial close executed");
        Ok(())
    }

    /// Full close with a price-sanity re-fetch guard for non-manual reasons,
    /// exit slippage, fee application, PnL computation, owner stat update,
    /// and an asynchronous feed into the Learning Store.
    pub async fn close(
        &self,
        owner: &mut Owner,
        trade: &mut Trade,
        mut current_price: Decimal,
        reason: CloseReason,
    ) -> Result<(), TradeError> {
        if !trade.is_open() {
            return Err(TradeError::AlreadyClosed { id: trade.id.clone() });
        }

        let drift = (to_f64(current_price) - to_f64(trade.entry_price)).abs() / to_f64(trade.entry_price).max(1e-9);
        if drift > 0.5 && reason != CloseReason::Manual {
            let refetched = self.price_source.fetch_live_price(&trade.coin.id).await?;
            let refetched_drift = (to_f64(refetched) - to_f64(trade.entry_price)).abs() / to_f64(trade.entry_price).max(1e-9);
            if refetched_drift > 0.5 {
                return Err(TradeError::ExcessiveSlippage { observed_pct: refetched_drift * 100.0, max_pct: 50.0 });
            }
            current_price = refetched;
        }

        let slippage_frac = self.config.slippage_bps as f64 / 10_000.0;
        let exit_price = match trade.side {
            Side::Long => from_f64(to_f64(current_price) * (1.0 - slippage_frac)),
            Side::Short => from_f64(to_f64(current_price) * (1.0 + slippage_frac)),
        };

        let fee_model = StandardFeeModel::new(crate::domain::trading::fees::FeeConfig {
            maker_fee: owner.maker_fee,
            taker_fee: owner.taker_fee,
            slippage_pct: Decimal::ZERO, // already captured by the fill-price slippage shift
            commission_fixed: Decimal::ZERO,
        });
        let qty = trade.position_size / trade.entry_price.max(Decimal::new(1, 8));
        let fee = fee_model.calculate_exit_cost(exit_price, qty);
        let realized = (exit_price - trade.entry_price) * Decimal::from(trade.side.sign() as i64) * qty;
        let total_pnl = trade.partial_pnl + realized - fee;
        let original_margin = trade.original_position_size / Decimal::from(trade.leverage);
        let pnl_pct = if !original_margin.is_zero() {
            to_f64(total_pnl) / to_f64(original_margin) * 100.0
        } else {
            0.0
        };

        trade.fees_paid += fee;
        trade.status = TradeStatus::Closed;
        trade.exit_price = Some(exit_price);
        trade.exit_time = Some(Utc::now());
        trade.close_reason = Some(reason);
        trade.pnl = Some(total_pnl);
        trade.pnl_percent = Some(pnl_pct);
        trade.actions.push(Action {
            id: Uuid::new_v4().to_string(),
            kind: ActionKind::Exit,
            description: format!("closed at {exit_price}, reason {reason:?}"),
            old_value: Some(trade.entry_price),
            new_value: Some(exit_price),
            market_price: exit_price,
            timestamp: Utc::now(),
        });

        let margin = trade.position_size / Decimal::from(trade.leverage);
        owner.balance += margin + realized - fee;
        owner.total_trades += 1;
        owner.total_pnl += total_pnl;
        owner.current_streak = if total_pnl.is_sign_positive() && !total_pnl.is_zero() {
            owner.current_streak.max(0) + 1
        } else {
            owner.current_streak.min(0) - 1
        };

        self.repository.update(trade.clone()).await?;
        if self.exchange.is_live(owner) {
            let _ = self.exchange.execute_close(owner, trade).await;
        }

        let r_multiple = if trade.one_r().is_zero() {
            0.0
        } else {
            to_f64(total_pnl) / to_f64(trade.one_r() * qty.max(Decimal::new(1, 8)))
        };
        let learning_store = self.learning_store.clone();
        let outcome = TradeOutcome {
            strategy_id: trade.strategy_type,
            regime: trade.regime,
            won: total_pnl.is_sign_positive(),
            r_multiple,
            pnl: to_f64(total_pnl),
        };
        tokio::spawn(async move {
            learning_store.record_outcome(outcome).await;
        });

        info!(trade_id = %trade.id, %exit_price, ?reason, "trade closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::regime::Regime;
    use crate::domain::signal::{ScoreBreakdown, SignalKind};
    use crate::domain::strategy::StrategyId;
    use crate::domain::trading::types::{Bias, CoinDescriptor};
    use crate::infrastructure::memory::{InMemoryTradeRepository, NullExchangeAdapter};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    struct FixedPriceSource(Decimal);

    #[async_trait]
    impl PriceSource for FixedPriceSource {
        fn price_for(&self, _coin_id: &str) -> Option<Decimal> {
            Some(self.0)
        }
        async fn fetch_live_price(&self, _coin_id: &str) -> Result<Decimal, TradeError> {
            Ok(self.0)
        }
    }

    fn owner() -> Owner {
        Owner {
            id: "owner-1".into(),
            balance: dec!(10000),
            max_open_trades: 3,
            max_balance_percent_per_trade: dec!(25),
            risk_per_trade_percent: dec!(2),
            cooldown_hours: 4,
            leverage_enabled: true,
            live_trading_enabled: false,
            auto_execute_enabled: true,
            maker_fee: dec!(0.001),
            taker_fee: dec!(0.001),
            current_streak: 0,
            total_trades: 0,
            total_pnl: dec!(0),
        }
    }

    fn sample_signal() -> Signal {
        Signal {
            coin: CoinDescriptor { id: "btc".into(), symbol: "BTCUSDT".into() },
            generated_at: Utc::now(),
            final_score: 70.0,
            signal: SignalKind::Buy,
            direction: Bias::Bull,
            confidence: 70.0,
            confluence_level: 3,
            best_timeframe: crate::domain::market::timeframe::Timeframe::H1,
            regime: Regime::Trending,
            chosen_strategy: StrategyId::TrendFollow,
            top_strategies: vec![],
            entry: dec!(100),
            take_profit1: dec!(106),
            take_profit2: Some(dec!(110)),
            take_profit3: Some(dec!(116)),
            stop_loss: dec!(97),
            risk_reward: 2.5,
            suggested_leverage: 5,
            reasoning: vec![],
            score_breakdown: ScoreBreakdown { trend: 15.0, momentum: 12.0, volume: 10.0, structure: 10.0, volatility: 5.0, risk_quality: 5.0 },
            timeframe_summaries: vec![],
        }
    }

    fn manager() -> PositionManager<InMemoryTradeRepository, NullExchangeAdapter, FixedPriceSource> {
        PositionManager::new(
            Arc::new(EngineConfig::from_env().unwrap()),
            Arc::new(InMemoryTradeRepository::new()),
            Arc::new(NullExchangeAdapter),
            Arc::new(FixedPriceSource(dec!(100))),
            Arc::new(LearningStore::new()),
        )
    }

    #[tokio::test]
    async fn open_debits_balance_and_persists() {
        let mgr = manager();
        let mut own = owner();
        let signal = sample_signal();
        let trade = mgr.open(&mut own, &signal).await.unwrap();
        assert!(own.balance < dec!(10000));
        assert_eq!(trade.side, Side::Long);
        assert!(trade.take_profit2.is_some());
    }

    #[tokio::test]
    async fn duplicate_open_is_rejected() {
        let mgr = manager();
        let mut own = owner();
        let signal = sample_signal();
        mgr.open(&mut own, &signal).await.unwrap();
        let err = mgr.open(&mut own, &signal).await;
        assert!(matches!(err, Err(TradeError::DuplicateOpenTrade { .. })));
    }

    #[tokio::test]
    async fn full_close_twice_errors_second_time() {
        let mgr = manager();
        let mut own = owner();
        let signal = sample_signal();
        let mut trade = mgr.open(&mut own, &signal).await.unwrap();
        mgr.close(&mut own, &mut trade, dec!(105), CloseReason::Manual).await.unwrap();
        let err = mgr.close(&mut own, &mut trade, dec!(105), CloseReason::Manual).await;
        assert!(matches!(err, Err(TradeError::AlreadyClosed { .. })));
    }
}
