//! PositionList — turns filled orders into open/closed positions, tracking
//! rewinds for bars where an in-bar conflict voided a fill.

use crate::decimal::Decimal;
use crate::domain::bar::Bar;
use crate::domain::order::{Order, OrderId};
use crate::domain::position::Position;
use crate::error::BacktestError;
use chrono::NaiveDateTime;

/// What [`PositionList::add`] did with a filled order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new position was opened; carries the opening order's id.
    Opened(OrderId),
    /// An existing position was closed; carries the id of the order that
    /// originally opened it.
    Closed(OrderId),
}

/// Tracks exposure derived from the order book's fills. Holds three lists:
/// `open` (currently exposed), `closed` (exited), and `rewinded` (opened,
/// then retracted because the bar that opened them turned out to contain a
/// conflicting fill — see [`PositionList::rewind`]).
pub struct PositionList {
    open: Vec<Position>,
    closed: Vec<Position>,
    rewinded: Vec<Position>,
    close_cb: Option<Box<dyn FnMut(&Position)>>,
}

impl PositionList {
    pub fn new() -> Self {
        Self {
            open: Vec::new(),
            closed: Vec::new(),
            rewinded: Vec::new(),
            close_cb: None,
        }
    }

    /// Install a callback invoked with every position as it closes (via
    /// [`PositionList::add`], [`PositionList::close`], or
    /// [`PositionList::close_all`]).
    pub fn with_close_cb(mut self, cb: Box<dyn FnMut(&Position)>) -> Self {
        self.close_cb = Some(cb);
        self
    }

    pub fn open(&self) -> &[Position] {
        &self.open
    }

    pub fn closed(&self) -> &[Position] {
        &self.closed
    }

    pub fn rewinded(&self) -> &[Position] {
        &self.rewinded
    }

    /// Mark every open position for `bar.symbol` to `bar.close`.
    pub fn mark(&mut self, bar: &Bar) {
        for p in self.open.iter_mut() {
            if p.symbol == bar.symbol {
                p.mark_to(bar.close);
            }
        }
    }

    fn find_open_index(&self, order_id: OrderId) -> Option<usize> {
        self.open.iter().position(|p| p.order_id == order_id)
    }

    /// Retract a still-open position that turned out to have been opened by
    /// an order whose fill should not have counted for this bar — the
    /// engine's way of backing out a fill made moot by a same-bar conflict.
    /// Returns `None` if no open position with this id exists.
    pub fn rewind(&mut self, order_id: OrderId) -> Option<Position> {
        let idx = self.find_open_index(order_id)?;
        let p = self.open.remove(idx);
        self.rewinded.push(p);
        self.rewinded.last()
    }

    fn fire_close_cb(&mut self, p: &Position) {
        if let Some(cb) = self.close_cb.as_mut() {
            cb(p);
        }
    }

    /// Take a filled order and turn it into a position event: if the order
    /// is a trigger child or a linked closer, it closes the position
    /// opened by its parent/linked order; otherwise it opens a new
    /// position.
    pub fn add(
        &mut self,
        order: &Order,
        timestamp: NaiveDateTime,
        level: Option<Decimal>,
    ) -> Result<AddOutcome, BacktestError> {
        if order.triggered() || order.link.is_some() {
            let clsid = if order.triggered() {
                order.trigger_parent.unwrap()
            } else {
                order.link.unwrap()
            };
            let idx = self.find_open_index(clsid).ok_or_else(|| {
                BacktestError::InvalidState(
                    order.id,
                    format!("cannot find open position for parent {clsid}"),
                )
            })?;
            if self.open[idx].size + order.size() != Decimal::ZERO {
                return Err(BacktestError::PositionMismatch {
                    order: order.id,
                    parent: clsid,
                    parent_size: self.open[idx].size,
                    order_size: order.size(),
                });
            }
            let final_level = order
                .level
                .or(level)
                .ok_or(BacktestError::InvalidLevel(order.id))?;

            let mut p = self.open.remove(idx);
            p.close_at(final_level);
            self.fire_close_cb(&p);
            self.closed.push(p);
            Ok(AddOutcome::Closed(clsid))
        } else {
            let entry_level = level
                .or(order.level)
                .ok_or(BacktestError::InvalidLevel(order.id))?;
            let p = Position::new(
                order.symbol.clone(),
                timestamp,
                entry_level,
                order.size(),
                order.id,
            );
            self.open.push(p);
            Ok(AddOutcome::Opened(order.id))
        }
    }

    /// Close every open position, each at its current mark unless
    /// `mark_level` overrides it.
    pub fn close_all(&mut self, mark_level: Option<Decimal>) {
        let ids: Vec<OrderId> = self.open.iter().map(|p| p.order_id).collect();
        for id in ids {
            self.close(id, mark_level);
        }
    }

    /// Close one open position by the id of the order that opened it.
    /// No-op if the id is not currently open.
    pub fn close(&mut self, order_id: OrderId, mark_level: Option<Decimal>) {
        let Some(idx) = self.find_open_index(order_id) else {
            return;
        };
        let mut p = self.open.remove(idx);
        let exit = mark_level.unwrap_or(p.mark);
        p.close_at(exit);
        self.fire_close_cb(&p);
        self.closed.push(p);
    }

    pub fn net_size(&self) -> Decimal {
        self.open.iter().fold(Decimal::ZERO, |acc, p| acc + p.size)
    }

    pub fn value(&self) -> Decimal {
        self.open.iter().fold(Decimal::ZERO, |acc, p| acc + p.value())
    }

    pub fn sym_open(&self, symbol: &str) -> Vec<&Position> {
        self.open.iter().filter(|p| p.symbol == symbol).collect()
    }
}

impl Default for PositionList {
    fn default() -> Self {
        Self::new()
    }
}
