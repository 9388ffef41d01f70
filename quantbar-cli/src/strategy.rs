//! Reference strategy: a 200-bar SMA crossover, all-in on the way up,
//! flat on the way down.

use quantbar_core::decimal::Decimal;
use quantbar_core::domain::bar::Bar;
use quantbar_core::domain::order::{Direction, Order, OrderId, OrderType};
use quantbar_core::engine::backtest::{BackTestContext, Strategy};
use quantbar_core::domain::position::Position;

const MA_PERIOD: usize = 200;
const ROUND_LOT: u32 = 100;

/// Goes long with the whole account, in round lots of 100 shares, when the
/// close crosses above its 200-bar simple moving average; closes out (via
/// a linked MARKET order) when it crosses back below.
pub struct MaCrossoverStrategy;

impl Strategy for MaCrossoverStrategy {
    fn on_bar_close(&mut self, ctx: &mut BackTestContext, symbol: &str, bar: &Bar) {
        let history = ctx.bars.get(symbol).map(Vec::as_slice).unwrap_or(&[]);
        if history.len() < MA_PERIOD {
            return;
        }

        let window = &history[history.len() - MA_PERIOD..];
        let sum: Decimal = window.iter().map(|b| b.close).sum();
        let close_ma = sum / Decimal::from(MA_PERIOD as u64);

        if bar.close > close_ma {
            if !ctx.poslist.sym_open(symbol).is_empty() {
                return;
            }
            let base_size = ctx.equity / bar.close;
            let odd_lot = base_size % Decimal::from(ROUND_LOT);
            let trade_size = base_size - odd_lot;
            if trade_size < Decimal::from(ROUND_LOT) {
                println!(
                    "{symbol}: trade_size {trade_size} below one round lot, equity {}",
                    ctx.equity
                );
                return;
            }
            match Order::new(symbol, Direction::Buy, OrderType::Market, Some(bar.close), trade_size) {
                Ok(order) => {
                    println!("{symbol}: crossed over, going long {trade_size} @ {}", bar.close);
                    if let Err(e) = ctx.book.add(order) {
                        eprintln!("{symbol}: failed to submit long entry: {e}");
                    }
                }
                Err(e) => eprintln!("{symbol}: failed to build long entry: {e}"),
            }
        } else {
            let closers: Vec<(OrderId, Decimal)> = ctx
                .poslist
                .sym_open(symbol)
                .iter()
                .map(|p| (p.order_id, p.size))
                .collect();
            for (order_id, size) in closers {
                match Order::new(symbol, Direction::Sell, OrderType::Market, Some(bar.close), -size) {
                    Ok(order) => {
                        println!("{symbol}: gone under MA, closing position for order {order_id}");
                        if let Err(e) = ctx.book.add(order.with_link(order_id)) {
                            eprintln!("{symbol}: failed to submit exit: {e}");
                        }
                    }
                    Err(e) => eprintln!("{symbol}: failed to build exit order: {e}"),
                }
            }
        }
    }

    fn on_position_close(&mut self, position: &Position) {
        println!(
            "{}: closed position entry={} exit={:?} value={}",
            position.symbol,
            position.entry,
            position.exit,
            position.value()
        );
    }
}
