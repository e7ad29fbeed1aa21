//! Polymarket NO-token scanner and order bot.
//!
//! The bot continuously scans Polymarket for binary markets whose NO side
//! trades near zero, alerts subscribed chats, and can place limit buy orders
//! against what it finds:
//!
//! ```text
//! catalog fetch → tradability filter → NO-price derivation
//!     → token resolution → opportunity list → (alerts, orders)
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`market`]: Catalog fetch, normalization, filtering, price derivation
//!   and token resolution
//! - [`scanner`]: Opportunity aggregation, scan sessions and the session
//!   registry
//! - [`trading`]: Order types and the batch executor
//! - [`monitor`]: Bounded trade/order monitoring
//! - [`exchange`]: CLOB client capability and implementations
//! - [`notify`]: Chat notification delivery
//! - [`settings`]: Per-chat settings persistence
//! - [`api`]: HTTP API for health/status

pub mod api;
pub mod config;
pub mod error;
pub mod exchange;
pub mod market;
pub mod metrics;
pub mod monitor;
pub mod notify;
pub mod scanner;
pub mod settings;
pub mod signing;
pub mod trading;

pub use config::Config;
pub use error::{BotError, Result};
