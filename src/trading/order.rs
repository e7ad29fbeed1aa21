//! Order types shared by the executor and the exchange client.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::scanner::opportunity::Opportunity;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order.
    #[strum(serialize = "BUY", serialize = "buy")]
    Buy,
    /// Sell order.
    #[strum(serialize = "SELL", serialize = "sell")]
    Sell,
}

/// Order time-in-force.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    /// Good-till-cancelled: stays on book until filled or cancelled.
    #[default]
    #[strum(serialize = "GTC", serialize = "gtc")]
    GTC,
    /// Fill-or-kill: must fill entirely or cancel.
    #[strum(serialize = "FOK", serialize = "fok")]
    FOK,
    /// Fill-and-kill: fill what's available, cancel rest.
    #[strum(serialize = "FAK", serialize = "fak")]
    FAK,
}

/// Parameters for one order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderArgs {
    /// Token id to trade.
    pub token_id: String,
    /// Order side.
    pub side: Side,
    /// Limit price.
    pub price: Decimal,
    /// Order size in shares.
    pub size: Decimal,
}

impl OrderArgs {
    /// Create buy-order arguments.
    pub fn buy(token_id: impl Into<String>, price: Decimal, size: Decimal) -> Self {
        Self {
            token_id: token_id.into(),
            side: Side::Buy,
            price,
            size,
        }
    }

    /// Validate order arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.token_id.is_empty() {
            return Err("token_id is required".to_string());
        }
        if self.price <= Decimal::ZERO {
            return Err("price must be positive".to_string());
        }
        if self.size <= Decimal::ZERO {
            return Err("size must be positive".to_string());
        }
        Ok(())
    }
}

/// An order signed and ready for submission.
///
/// The payload is opaque to callers; only the exchange client that produced
/// it knows the wire layout.
#[derive(Debug, Clone)]
pub struct SignedOrder {
    /// Arguments the order was built from.
    pub args: OrderArgs,
    /// Signed wire payload.
    pub payload: serde_json::Value,
}

/// Outcome of one order attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum OrderOutcome {
    /// Order accepted by the exchange.
    #[strum(serialize = "submitted")]
    Submitted,
    /// Order attempt failed terminally.
    #[strum(serialize = "error")]
    Error,
}

/// Record of one order attempt, created once and immutable.
#[derive(Debug, Clone)]
pub struct OrderResult {
    /// The opportunity the order was placed for.
    pub opportunity: Opportunity,
    /// Attempt outcome.
    pub status: OrderOutcome,
    /// Exchange order id, when submission succeeded.
    pub order_id: Option<String>,
    /// Price actually submitted (clamped to the threshold).
    pub price: Decimal,
    /// Size actually submitted.
    pub size: Decimal,
    /// Failure description, when the attempt errored.
    pub error: Option<String>,
    /// Exchange-reported minimum the attempt was retried with, if any.
    pub retried_with_minimum: Option<Decimal>,
    /// Raw exchange response for the successful submission.
    pub raw: Option<serde_json::Value>,
}

impl OrderResult {
    /// Whether the order was accepted.
    pub fn is_submitted(&self) -> bool {
        self.status == OrderOutcome::Submitted
    }
}
