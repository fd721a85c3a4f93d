pub mod memory;
pub mod ports;

pub use memory::{InMemoryCandleSource, InMemoryTradeRepository, NullExchangeAdapter};
