//! Bar sources: the supply trait, the Yahoo chart provider, the synthetic
//! generator, and the circuit breaker guarding network access.

pub mod circuit_breaker;
pub mod provider;
pub mod synthetic;
pub mod yahoo;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use provider::{BarSource, DataError};
pub use synthetic::SyntheticSource;
pub use yahoo::YahooSource;
