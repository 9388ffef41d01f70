//! Bar — one OHLC observation for a symbol at a timestamp.

use crate::decimal::Decimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BarError {
    #[error("bar invariant violated: low ({low}) must be <= open/close/high")]
    LowExceedsRange { low: Decimal },
    #[error("bar invariant violated: high ({high}) must be >= open/close/low")]
    HighBelowRange { high: Decimal },
}

/// One OHLC observation for a symbol at a timestamp. Immutable after
/// construction except through [`Bar::merge`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub symbol: String,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

impl Bar {
    /// Construct a bar, checking the `low <= open,close <= high` invariant.
    pub fn new(
        timestamp: NaiveDateTime,
        symbol: impl Into<String>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
    ) -> Result<Self, BarError> {
        if low > high {
            return Err(BarError::LowExceedsRange { low });
        }
        if low > open || low > close {
            return Err(BarError::LowExceedsRange { low });
        }
        if high < open || high < close {
            return Err(BarError::HighBelowRange { high });
        }
        Ok(Self {
            timestamp,
            symbol: symbol.into(),
            open,
            high,
            low,
            close,
        })
    }

    /// Aggregate another bar into this one: high becomes the max, low the
    /// min, close is replaced. Timestamp and open are preserved.
    pub fn merge_bar(&mut self, other: &Bar) {
        self.merge(other.close, Some(other.high), Some(other.low));
    }

    /// Aggregate a raw close (and optionally high/low) into this bar.
    /// Mirrors the original's `Bar.merge(c, h=None, l=None)`.
    pub fn merge(&mut self, close: Decimal, high: Option<Decimal>, low: Option<Decimal>) {
        if let Some(h) = high {
            if h > self.high {
                self.high = h;
            }
        }
        if let Some(l) = low {
            if l < self.low {
                self.low = l;
            }
        }
        self.close = close;
    }

    /// True if `level` falls within this bar's `[low, high]` range,
    /// inclusive — the shared fill predicate for LIMIT and STOP orders.
    pub fn contains(&self, level: Decimal) -> bool {
        level >= self.low && level <= self.high
    }

    /// Saturday or Sunday — the weekend filter in `BackTest::next_bar`.
    pub fn is_weekend(&self) -> bool {
        use chrono::Datelike;
        matches!(
            self.timestamp.weekday(),
            chrono::Weekday::Sat | chrono::Weekday::Sun
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn dt(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn sample() -> Bar {
        Bar::new(
            dt(2001, 1, 2, 23),
            "EURUSD",
            dec!(0.9507),
            dec!(0.9509),
            dec!(0.9505),
            dec!(0.9506),
        )
        .unwrap()
    }

    #[test]
    fn rejects_low_above_high() {
        let err = Bar::new(
            dt(2001, 1, 2, 23),
            "EURUSD",
            dec!(0.95),
            dec!(0.94),
            dec!(0.96),
            dec!(0.95),
        );
        assert!(err.is_err());
    }

    #[test]
    fn merge_bar_replaces_close_and_preserves_open_and_timestamp() {
        let mut b1 = sample();
        let b2 = Bar::new(
            dt(2001, 1, 3, 0),
            "EURUSD",
            dec!(0.9506),
            dec!(0.9510),
            dec!(0.9492),
            dec!(0.9496),
        )
        .unwrap();

        let orig_ts = b1.timestamp;
        let orig_open = b1.open;
        b1.merge_bar(&b2);

        assert_eq!(b1.timestamp, orig_ts);
        assert_eq!(b1.open, orig_open);
        assert_eq!(b1.high, b2.high);
        assert_eq!(b1.low, b2.low);
        assert_eq!(b1.close, b2.close);
    }

    #[test]
    fn merge_direct_only_widens_extremes() {
        let bc = sample();
        let mut b1 = sample();
        // merge a close only: high/low untouched
        b1.merge(dec!(0.9600), None, None);
        assert_eq!(b1.high, bc.high);
        assert_eq!(b1.low, bc.low);
        assert_eq!(b1.close, dec!(0.9600));
    }

    #[test]
    fn contains_uses_inclusive_bounds() {
        let b = sample();
        assert!(b.contains(b.low));
        assert!(b.contains(b.high));
        assert!(!b.contains(b.low - dec!(0.0001)));
    }

    #[test]
    fn weekend_detection() {
        // 2001-01-06 is a Saturday
        let b = Bar::new(
            dt(2001, 1, 6, 0),
            "EURUSD",
            dec!(1),
            dec!(1),
            dec!(1),
            dec!(1),
        )
        .unwrap();
        assert!(b.is_weekend());
    }
}
