//! Order — a mutable state machine with parent/child relationships
//! (triggers, OCO cancels, link-closes).

use crate::decimal::Decimal;
use crate::error::BacktestError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique monotonic id, assigned when the `Order` is constructed —
/// not when it is admitted to an [`crate::book::OrderBook`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

static NEXT_ORDER_ID: AtomicU64 = AtomicU64::new(1);

fn next_order_id() -> OrderId {
    OrderId(NEXT_ORDER_ID.fetch_add(1, Ordering::Relaxed))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Limit,
    Stop,
    Market,
}

/// Order lifecycle state. `Unsub` and `Pending` precede book admission;
/// `Filled`/`Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    Unsub,
    Active,
    Pending,
    Cancelled,
    Filled,
}

impl OrderState {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderState::Cancelled | OrderState::Filled)
    }

    pub fn is_live(self) -> bool {
        matches!(self, OrderState::Active | OrderState::Pending)
    }
}

/// An order: identified by a process-unique id, carrying parent/child
/// relationships to other orders by id (triggers, cancels, link), never by
/// direct reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: String,
    pub direction: Direction,
    pub order_type: OrderType,
    pub level: Option<Decimal>,
    size: Decimal,
    pub(crate) state: OrderState,

    /// Child order ids that become ACTIVE when this order fills.
    pub triggers: Vec<OrderId>,
    /// Parent order id that must fill before this order becomes ACTIVE.
    pub trigger_parent: Option<OrderId>,
    /// Order ids to cancel when this order fills.
    pub cancels: Vec<OrderId>,
    /// Id of the order that caused this one's cancellation, if any.
    pub cancel_parent: Option<OrderId>,
    /// Id of a position's opening order that this order, if filled, closes.
    pub link: Option<OrderId>,
}

impl Order {
    /// Construct a new order in state `Unsub`. Fails if `size`'s sign
    /// contradicts `direction` (BUY requires size >= 0, SELL requires
    /// size <= 0).
    pub fn new(
        symbol: impl Into<String>,
        direction: Direction,
        order_type: OrderType,
        level: Option<Decimal>,
        size: Decimal,
    ) -> Result<Self, BacktestError> {
        let id = next_order_id();
        check_size_matches_direction(id, direction, size)?;
        Ok(Self {
            id,
            symbol: symbol.into(),
            direction,
            order_type,
            level,
            size,
            state: OrderState::Unsub,
            triggers: Vec::new(),
            trigger_parent: None,
            cancels: Vec::new(),
            cancel_parent: None,
            link: None,
        })
    }

    /// Build a closing order linked to `position_order_id`. Linked children
    /// are born eligible to fill immediately, not pending a trigger.
    pub fn with_link(mut self, position_order_id: OrderId) -> Self {
        self.link = Some(position_order_id);
        self
    }

    pub fn size(&self) -> Decimal {
        self.size
    }

    /// Re-set the size, re-checking the direction/sign invariant.
    pub fn set_size(&mut self, size: Decimal) -> Result<(), BacktestError> {
        check_size_matches_direction(self.id, self.direction, size)?;
        self.size = size;
        Ok(())
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    /// Append `other`'s id to this order's `cancels`, and set `other`'s
    /// `cancel_parent` to this order's id. Fired on fill, not on cancel.
    pub fn cancel(&mut self, other: &mut Order) {
        self.cancels.push(other.id);
        other.cancel_parent = Some(self.id);
    }

    /// `cancel` over a batch of orders.
    pub fn cancel_all<'a>(&mut self, others: impl IntoIterator<Item = &'a mut Order>) {
        for o in others {
            self.cancel(o);
        }
    }

    /// Append `other`'s id to this order's `triggers`, and set `other`'s
    /// `trigger_parent` to this order's id. `other` becomes ACTIVE once
    /// this order fills.
    pub fn trigger(&mut self, other: &mut Order) {
        self.triggers.push(other.id);
        other.trigger_parent = Some(self.id);
    }

    /// `trigger` over a batch of orders.
    pub fn trigger_all<'a>(&mut self, others: impl IntoIterator<Item = &'a mut Order>) {
        for o in others {
            self.trigger(o);
        }
    }

    /// True if this order is a child of some parent via `trigger`.
    pub fn triggered(&self) -> bool {
        self.trigger_parent.is_some()
    }

    /// Bind `a` and `b` as a one-cancels-other pair: each cancels the
    /// other when it fills.
    pub fn oco(a: &mut Order, b: &mut Order) {
        a.cancel(b);
        b.cancel(a);
    }

    /// Check that `order`'s level is consistent with the current market
    /// quote `mark`. MARKET orders bypass the level/mark comparison.
    pub fn validate(order: &Order, mark: Decimal) -> Result<(), BacktestError> {
        match order.order_type {
            OrderType::Market => Ok(()),
            OrderType::Limit | OrderType::Stop => {
                let level = order.level.ok_or_else(|| {
                    BacktestError::InvalidOrder(order.id, "validate: no level set".to_string())
                })?;
                let is_limit = matches!(order.order_type, OrderType::Limit);
                let inconsistent = match order.direction {
                    Direction::Buy if is_limit => level > mark,
                    Direction::Buy => level < mark,
                    Direction::Sell if is_limit => level < mark,
                    Direction::Sell => level > mark,
                };
                if inconsistent {
                    Err(BacktestError::InvalidOrder(
                        order.id,
                        format!(
                            "validate: level {level} inconsistent with mark {mark} for {:?} {:?}",
                            order.direction, order.order_type
                        ),
                    ))
                } else {
                    Ok(())
                }
            }
        }
    }
}

fn check_size_matches_direction(
    id: OrderId,
    direction: Direction,
    size: Decimal,
) -> Result<(), BacktestError> {
    match direction {
        Direction::Buy if size < Decimal::ZERO => Err(BacktestError::InvalidOrder(
            id,
            format!("BUY order size must be >= 0, got {size}"),
        )),
        Direction::Sell if size > Decimal::ZERO => Err(BacktestError::InvalidOrder(
            id,
            format!("SELL order size must be <= 0, got {size}"),
        )),
        _ => Ok(()),
    }
}
