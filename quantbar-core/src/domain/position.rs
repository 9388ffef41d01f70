//! Position — one open or closed exposure, created only by
//! [`crate::positions::PositionList::add`] from a filled opening order.

use crate::decimal::Decimal;
use crate::domain::order::OrderId;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub entry_timestamp: NaiveDateTime,
    pub entry: Decimal,
    /// Signed size; sign matches the opening order's direction.
    pub size: Decimal,
    pub mark: Decimal,
    pub exit: Option<Decimal>,
    /// Bars observed while open.
    pub nbars: u64,
    /// Id of the order that opened this position.
    pub order_id: OrderId,
}

impl Position {
    pub fn new(
        symbol: impl Into<String>,
        entry_timestamp: NaiveDateTime,
        entry: Decimal,
        size: Decimal,
        order_id: OrderId,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            entry_timestamp,
            entry,
            size,
            mark: entry,
            exit: None,
            nbars: 0,
            order_id,
        }
    }

    /// `(mark - entry) * size`, recomputed on demand.
    pub fn value(&self) -> Decimal {
        (self.mark - self.entry) * self.size
    }

    pub fn closed(&self) -> bool {
        self.exit.is_some()
    }

    /// Mark to a new price, incrementing the bars-observed counter.
    pub fn mark_to(&mut self, price: Decimal) {
        self.mark = price;
        self.nbars += 1;
    }

    /// Set the exit exactly once; forces `mark` to equal `exit`.
    pub(crate) fn close_at(&mut self, price: Decimal) {
        self.exit = Some(price);
        self.mark = price;
    }
}
