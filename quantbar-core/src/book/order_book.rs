//! OrderBook — holds active/pending orders; matches bars to fills;
//! cascades triggers and cancels.

use crate::domain::bar::Bar;
use crate::domain::order::{Order, OrderId, OrderState, OrderType};
use std::collections::HashMap;

/// Holds two partitions, `live` (ACTIVE or PENDING) and `done` (FILLED or
/// CANCELLED). An order is in exactly one partition at any moment.
pub struct OrderBook {
    live: HashMap<OrderId, Order>,
    done: HashMap<OrderId, Order>,
    /// Mirrors the original's `OrderBook(debug=False)` flag: gates
    /// `eprintln!` diagnostics on add/cancel/fill.
    pub debug: bool,
}

impl OrderBook {
    pub fn new() -> Self {
        Self {
            live: HashMap::new(),
            done: HashMap::new(),
            debug: false,
        }
    }

    pub fn with_debug(debug: bool) -> Self {
        Self {
            debug,
            ..Self::new()
        }
    }

    /// Add a single order. Sets state to PENDING if the order has a
    /// `trigger_parent`, else ACTIVE. Fails if the id is already known to
    /// this book (live or done).
    pub fn add(&mut self, mut order: Order) -> Result<OrderId, crate::error::BacktestError> {
        if self.live.contains_key(&order.id) || self.done.contains_key(&order.id) {
            return Err(crate::error::BacktestError::InvalidOrder(
                order.id,
                format!("duplicate order id: {}", order.id),
            ));
        }
        order.state = if order.triggered() {
            OrderState::Pending
        } else {
            OrderState::Active
        };
        let id = order.id;
        if self.debug {
            eprintln!("OrderBook: added {id} state={:?}", order.state);
        }
        self.live.insert(id, order);
        Ok(id)
    }

    /// Add many orders (flattened). The first failure aborts the batch;
    /// orders already inserted before the failing one remain in the book.
    pub fn add_all(
        &mut self,
        orders: impl IntoIterator<Item = Order>,
    ) -> Result<Vec<OrderId>, crate::error::BacktestError> {
        orders.into_iter().map(|o| self.add(o)).collect()
    }

    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.live.get(&id).or_else(|| self.done.get(&id))
    }

    pub fn active(&self) -> impl Iterator<Item = &Order> {
        self.live.values().filter(|o| o.state() == OrderState::Active)
    }

    pub fn pending(&self) -> impl Iterator<Item = &Order> {
        self.live.values().filter(|o| o.state() == OrderState::Pending)
    }

    pub fn filled(&self) -> impl Iterator<Item = &Order> {
        self.done.values().filter(|o| o.state() == OrderState::Filled)
    }

    pub fn cancelled(&self) -> impl Iterator<Item = &Order> {
        self.done
            .values()
            .filter(|o| o.state() == OrderState::Cancelled)
    }

    /// Cancel an order by id. Returns `false` (no-op) if the id is unknown
    /// or already terminal — never an error, since this tolerates benign
    /// race-like sequences (a cancel that raced a fill).
    pub fn cancel(&mut self, id: OrderId) -> bool {
        let Some(mut order) = self.live.remove(&id) else {
            return false;
        };
        order.state = OrderState::Cancelled;
        if self.debug {
            eprintln!("OrderBook: cancelled {id}");
        }
        let children = order.triggers.clone();
        self.done.insert(id, order);
        // Cancels on a parent propagate to would-be PENDING children. The
        // cascade does not walk `cancels` — those fire only on fill.
        for child in children {
            self.cancel(child);
        }
        true
    }

    /// Cancel every order currently live. Snapshots the id set first since
    /// the cascade mutates `live` while iterating.
    pub fn cancel_all(&mut self) {
        let ids: Vec<OrderId> = self.live.keys().copied().collect();
        for id in ids {
            self.cancel(id);
        }
    }

    /// Mark an order filled. Returns `false` if the order is unknown.
    pub fn fill(&mut self, id: OrderId) -> bool {
        let Some(mut order) = self.live.remove(&id) else {
            return false;
        };
        order.state = OrderState::Filled;
        if self.debug {
            eprintln!("OrderBook: filled {id}");
        }
        let triggers = order.triggers.clone();
        let cancels = order.cancels.clone();
        self.done.insert(id, order);

        for t in triggers {
            if let Some(child) = self.live.get_mut(&t) {
                child.state = OrderState::Active;
                if self.debug {
                    eprintln!("OrderBook: {t} pending -> active (parent {id} filled)");
                }
            }
        }
        for c in cancels {
            self.cancel(c);
        }
        true
    }

    /// Which orders resting in this book would this bar fill. MARKET
    /// orders always fill; LIMIT and STOP fill under the same predicate
    /// (`bar.low <= level <= bar.high`) — distinguishing them only matters
    /// for `Order::validate` and strategy-layer semantics.
    pub fn get_fills(&self, bar: &Bar) -> Vec<OrderId> {
        self.active()
            .filter(|o| o.symbol == bar.symbol)
            .filter(|o| match o.order_type {
                OrderType::Market => true,
                OrderType::Limit | OrderType::Stop => {
                    o.level.is_some_and(|level| bar.contains(level))
                }
            })
            .map(|o| o.id)
            .collect()
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{Direction, OrderType};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn bar(lo: &str, hi: &str) -> Bar {
        Bar::new(
            NaiveDate::from_ymd_opt(2001, 1, 2)
                .unwrap()
                .and_hms_opt(23, 0, 0)
                .unwrap(),
            "EURUSD",
            dec!(0.9507),
            hi.parse().unwrap(),
            lo.parse().unwrap(),
            dec!(0.9506),
        )
        .unwrap()
    }

    fn market_buy() -> Order {
        Order::new("EURUSD", Direction::Buy, OrderType::Market, None, dec!(10000)).unwrap()
    }

    #[test]
    fn add_rejects_duplicate_id() {
        let mut book = OrderBook::new();
        let o = market_buy();
        let dup = o.clone();
        book.add(o).unwrap();
        assert!(book.add(dup).is_err());
    }

    #[test]
    fn add_sets_active_for_untriggered_and_pending_for_triggered() {
        let mut book = OrderBook::new();
        let mut parent = market_buy();
        let mut child = Order::new(
            "EURUSD",
            Direction::Sell,
            OrderType::Stop,
            Some(dec!(0.9)),
            dec!(-10000),
        )
        .unwrap();
        parent.trigger(&mut child);

        let parent_id = book.add(parent).unwrap();
        let child_id = book.add(child).unwrap();

        assert_eq!(book.get(parent_id).unwrap().state(), OrderState::Active);
        assert_eq!(book.get(child_id).unwrap().state(), OrderState::Pending);
    }

    #[test]
    fn fill_activates_triggers_and_cancels_cancel_list() {
        let mut book = OrderBook::new();
        let mut parent = market_buy();
        let mut sl = Order::new(
            "EURUSD",
            Direction::Sell,
            OrderType::Stop,
            Some(dec!(0.9499)),
            dec!(-10000),
        )
        .unwrap();
        let mut tp = Order::new(
            "EURUSD",
            Direction::Sell,
            OrderType::Limit,
            Some(dec!(0.9510)),
            dec!(-10000),
        )
        .unwrap();
        Order::oco(&mut sl, &mut tp);
        parent.trigger_all([&mut sl, &mut tp]);

        let parent_id = book.add(parent).unwrap();
        let sl_id = book.add(sl).unwrap();
        let tp_id = book.add(tp).unwrap();

        assert!(book.fill(parent_id));
        assert_eq!(book.get(sl_id).unwrap().state(), OrderState::Active);
        assert_eq!(book.get(tp_id).unwrap().state(), OrderState::Active);

        assert!(book.fill(tp_id));
        assert_eq!(book.get(sl_id).unwrap().state(), OrderState::Cancelled);
    }

    #[test]
    fn cancel_cascades_through_triggers_not_cancels() {
        let mut book = OrderBook::new();
        let mut parent = market_buy();
        let mut child = Order::new(
            "EURUSD",
            Direction::Sell,
            OrderType::Stop,
            Some(dec!(0.9)),
            dec!(-10000),
        )
        .unwrap();
        parent.trigger(&mut child);
        let parent_id = book.add(parent).unwrap();
        let child_id = book.add(child).unwrap();

        assert!(book.cancel(parent_id));
        assert_eq!(book.get(child_id).unwrap().state(), OrderState::Cancelled);
    }

    #[test]
    fn cancel_unknown_id_is_noop_false() {
        let mut book = OrderBook::new();
        assert!(!book.cancel(OrderId(999_999)));
    }

    #[test]
    fn fill_unknown_order_is_noop_false() {
        let mut book = OrderBook::new();
        assert!(!book.fill(OrderId(999_999)));
    }

    #[test]
    fn get_fills_matches_market_always_and_limit_stop_by_range() {
        let mut book = OrderBook::new();
        let market = market_buy();
        let limit_hit = Order::new(
            "EURUSD",
            Direction::Buy,
            OrderType::Limit,
            Some(dec!(0.9505)),
            dec!(1000),
        )
        .unwrap();
        let limit_miss = Order::new(
            "EURUSD",
            Direction::Buy,
            OrderType::Limit,
            Some(dec!(0.9)),
            dec!(1000),
        )
        .unwrap();
        book.add(market).unwrap();
        let hit_id = book.add(limit_hit).unwrap();
        book.add(limit_miss).unwrap();

        let b = bar("0.9505", "0.9509");
        let fills = book.get_fills(&b);
        assert_eq!(fills.len(), 2);
        assert!(fills.contains(&hit_id));
    }

    #[test]
    fn cancel_all_clears_every_live_order() {
        let mut book = OrderBook::new();
        book.add(market_buy()).unwrap();
        book.add(market_buy()).unwrap();
        book.cancel_all();
        assert_eq!(book.active().count(), 0);
        assert_eq!(book.cancelled().count(), 2);
    }
}
