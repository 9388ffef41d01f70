//! Order book: tracks live (active/pending) and done (filled/cancelled)
//! orders, matches bars to fills, and cascades trigger/cancel relationships.

pub mod order_book;

pub use order_book::OrderBook;
