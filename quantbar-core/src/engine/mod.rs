//! Backtest engine: sequences bars across symbols and drives the order
//! book / position list through the per-bar fill cycle.

pub mod backtest;

pub use backtest::{BackTest, BackTestContext, Strategy};
