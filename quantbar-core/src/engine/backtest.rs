//! BackTest driver — sequences bars across symbols, dispatches fills to the
//! order book and position list, marks positions to market, and tracks
//! equity.

use crate::book::OrderBook;
use crate::decimal::Decimal;
use crate::domain::bar::Bar;
use crate::domain::order::OrderId;
use crate::domain::position::Position;
use crate::error::BacktestError;
use crate::io::bar_source::{BarParser, BarSource};
use crate::positions::position_list::PositionList;
use chrono::NaiveDateTime;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// The view a [`Strategy`] gets during its hooks: mutable access to the
/// order book (to submit new orders), read access to open positions and
/// bar history, and the current realized equity.
pub struct BackTestContext<'a> {
    pub book: &'a mut OrderBook,
    pub poslist: &'a PositionList,
    pub equity: Decimal,
    pub bars: &'a HashMap<String, Vec<Bar>>,
}

/// Override point for a trading strategy driven by [`BackTest`].
pub trait Strategy {
    /// Called once per bar, after fills/marks for that bar have been
    /// applied. The strategy may submit new orders via `ctx.book`.
    fn on_bar_close(&mut self, ctx: &mut BackTestContext, symbol: &str, bar: &Bar);

    /// Called once per position closed, with its final (realized) value
    /// already reflected in the driver's equity.
    fn on_position_close(&mut self, _position: &Position) {}
}

/// Equity and watermarks, shared (via `Rc<RefCell<_>>`) between the driver
/// and the close callback installed on its `PositionList`, so that every
/// transition into `closed` — whether from `next_bar`'s fill loop or from
/// a caller invoking `poslist_mut().close()/close_all()` directly —
/// updates the same state.
struct EquityState {
    equity: Decimal,
    min_equity: Decimal,
    max_equity: Decimal,
}

impl EquityState {
    fn apply_close(&mut self, value: Decimal) {
        self.equity += value;
        if self.equity > self.max_equity {
            self.max_equity = self.equity;
        }
        if self.equity < self.min_equity {
            self.min_equity = self.equity;
        }
    }
}

/// Sequences bar delivery across one or more registered inputs, applying
/// the seven-step per-bar cycle: weekend filter, fill matching, in-bar
/// conflict resolution, fill application, marking, the strategy hook, and
/// history recording.
pub struct BackTest<S: Strategy> {
    equity_state: Rc<RefCell<EquityState>>,
    eqvals: Vec<(NaiveDateTime, Decimal)>,
    inputs: Vec<(String, Box<dyn BarSource>, BarParser)>,
    bars: HashMap<String, Vec<Bar>>,
    book: OrderBook,
    poslist: PositionList,
    strategy: Rc<RefCell<S>>,
}

impl<S: Strategy + 'static> BackTest<S> {
    pub fn new(initial_equity: Decimal, strategy: S) -> Self {
        let equity_state = Rc::new(RefCell::new(EquityState {
            equity: initial_equity,
            min_equity: initial_equity,
            max_equity: initial_equity,
        }));
        let strategy = Rc::new(RefCell::new(strategy));

        let cb_state = equity_state.clone();
        let cb_strategy = strategy.clone();
        let poslist = PositionList::new().with_close_cb(Box::new(move |p: &Position| {
            cb_state.borrow_mut().apply_close(p.value());
            cb_strategy.borrow_mut().on_position_close(p);
        }));

        Self {
            equity_state,
            eqvals: Vec::new(),
            inputs: Vec::new(),
            bars: HashMap::new(),
            book: OrderBook::new(),
            poslist,
            strategy,
        }
    }

    pub fn equity(&self) -> Decimal {
        self.equity_state.borrow().equity
    }

    pub fn min_equity(&self) -> Decimal {
        self.equity_state.borrow().min_equity
    }

    pub fn max_equity(&self) -> Decimal {
        self.equity_state.borrow().max_equity
    }

    pub fn eqvals(&self) -> &[(NaiveDateTime, Decimal)] {
        &self.eqvals
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    pub fn book_mut(&mut self) -> &mut OrderBook {
        &mut self.book
    }

    pub fn poslist(&self) -> &PositionList {
        &self.poslist
    }

    pub fn poslist_mut(&mut self) -> &mut PositionList {
        &mut self.poslist
    }

    pub fn bars(&self, symbol: &str) -> &[Bar] {
        self.bars.get(symbol).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Register a bar stream for `symbol`. `source` yields one trimmed
    /// line at a time; `parser` turns `(symbol, line)` into a `Bar`.
    pub fn add_input(&mut self, symbol: impl Into<String>, source: Box<dyn BarSource>, parser: BarParser) {
        let symbol = symbol.into();
        self.bars.entry(symbol.clone()).or_default();
        self.inputs.push((symbol, source, parser));
    }

    /// Round-robin over registered inputs, dispatching each line through
    /// [`BackTest::next_bar`]. Updates the equity curve once per round,
    /// using the last bar read that round. Terminates when any source
    /// yields end-of-stream.
    pub fn run(&mut self) -> Result<(), BacktestError> {
        let mut last_bar: Option<Bar> = None;
        'rounds: loop {
            for i in 0..self.inputs.len() {
                let (symbol, bar) = {
                    let (symbol, source, parser) = &mut self.inputs[i];
                    let Some(line) = source.read_line() else {
                        break 'rounds;
                    };
                    let bar = parser(symbol, &line)?;
                    (symbol.clone(), bar)
                };
                self.next_bar(&symbol, bar.clone())?;
                last_bar = Some(bar);
            }
            if let Some(bar) = &last_bar {
                self.update_eqvals(bar);
            }
        }
        Ok(())
    }

    fn update_eqvals(&mut self, bar: &Bar) {
        let total = self.equity() + self.poslist.value();
        self.eqvals.push((bar.timestamp, total));
    }

    /// The per-bar cycle described at the module level. Mutates `self` and
    /// the order book/position list in place.
    pub fn next_bar(&mut self, symbol: &str, bar: Bar) -> Result<(), BacktestError> {
        if bar.is_weekend() {
            return Ok(());
        }

        let mut fills = self.book.get_fills(&bar);
        if fills.len() > 1 {
            self.resolve_conflicts(&mut fills);
        }

        for order_id in fills {
            let Some(order) = self.book.get(order_id).cloned() else {
                continue;
            };
            // `add` fires the close callback (equity/watermarks/on_close)
            // synchronously for closing fills, before the book reflects the
            // fill below — matching the spec's atomicity note.
            self.poslist.add(&order, bar.timestamp, None)?;
            self.book.fill(order_id);
        }

        self.poslist.mark(&bar);

        {
            let equity = self.equity();
            let mut ctx = BackTestContext {
                book: &mut self.book,
                poslist: &self.poslist,
                equity,
                bars: &self.bars,
            };
            self.strategy.borrow_mut().on_bar_close(&mut ctx, symbol, &bar);
        }

        self.bars.entry(symbol.to_string()).or_default().push(bar);
        Ok(())
    }

    /// Step 3 of the per-bar cycle: for each fill with a same-bar
    /// cancel-counterpart also present in `fills`, rewind its parent
    /// position (if it has one) and cancel every participant. Re-scans
    /// from the shrunk list after each resolution so a shared parent is
    /// rewound only once even under a three-or-more-way conflict.
    fn resolve_conflicts(&mut self, fills: &mut Vec<OrderId>) {
        let mut i = 0;
        while i < fills.len() {
            let order_id = fills[i];
            let Some(order) = self.book.get(order_id) else {
                fills.remove(i);
                continue;
            };
            let trigger_parent = order.trigger_parent;
            let dups: Vec<OrderId> = fills
                .iter()
                .copied()
                .filter(|&other| other != order_id)
                .filter(|&other| {
                    self.book
                        .get(other)
                        .is_some_and(|o| o.cancels.contains(&order_id))
                })
                .collect();

            if dups.is_empty() {
                i += 1;
                continue;
            }

            if let Some(parent) = trigger_parent {
                self.poslist.rewind(parent);
            }
            self.book.cancel(order_id);
            for &d in &dups {
                self.book.cancel(d);
            }
            fills.retain(|&x| x != order_id && !dups.contains(&x));
            i = 0;
        }
    }
}
