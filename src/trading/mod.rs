//! Order types and execution.

pub mod executor;
pub mod order;

pub use executor::{parse_minimum_size, OrderExecutor};
pub use order::{OrderArgs, OrderOutcome, OrderResult, Side, SignedOrder, TimeInForce};
