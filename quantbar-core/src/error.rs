//! The backtest error taxonomy.
//!
//! Configuration/validation errors (duplicate order id, bad size, bad
//! state, missing level, size mismatch) are fatal and halt the run. Missing-
//! order cancels and duplicate fills are not represented here at all — they
//! are non-fatal by construction, returning `bool`/`Option` from
//! [`crate::book::OrderBook`] instead of an `Err`.

use crate::domain::order::OrderId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BacktestError {
    #[error("order {0}: {1}")]
    InvalidOrder(OrderId, String),

    #[error("order {0}: invalid state transition: {1}")]
    InvalidState(OrderId, String),

    #[error("malformed bar input: {0}")]
    InvalidBar(String),

    #[error("order {0}: no level available to close at")]
    InvalidLevel(OrderId),

    #[error("order {order} size does not offset position opened by order {parent} (parent size {parent_size}, close size {order_size})")]
    PositionMismatch {
        order: OrderId,
        parent: OrderId,
        parent_size: rust_decimal::Decimal,
        order_size: rust_decimal::Decimal,
    },
}
