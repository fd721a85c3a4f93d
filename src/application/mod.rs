// Signal Analyzer: multi-timeframe scoring and strategy selection.
pub mod analyzer;

// Append-only strategy-performance feedback loop.
pub mod learning_store;

// Trade lifecycle: open, partial close, close.
pub mod position_manager;

// Per-tick stop-loss / take-profit automation for open trades.
pub mod stop_tp_loop;

// Periodic re-analysis and auto-execution ladder for open trades.
pub mod recheck_engine;
