//! Bar input: a source of raw lines plus the two parsers this crate ships.

use crate::decimal::Decimal;
use crate::domain::bar::Bar;
use crate::error::BacktestError;
use chrono::NaiveDate;
use std::io::BufRead;

/// Yields one trimmed line at a time. An empty line (or EOF) signals the
/// end of the stream — mirrors the original's `f.readline().strip()`
/// contract.
pub trait BarSource {
    fn read_line(&mut self) -> Option<String>;
}

/// A `BarSource` backed by anything implementing `BufRead` (a file, a
/// cursor over an in-memory buffer, stdin, ...).
pub struct BufReadSource<R> {
    reader: R,
}

impl<R: BufRead> BufReadSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> BarSource for BufReadSource<R> {
    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => {
                let trimmed = line.trim().to_string();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed)
                }
            }
            Err(_) => None,
        }
    }
}

/// `fn(symbol, raw_line) -> Result<Bar, BacktestError>` — a parser is a
/// first-class parameter per input, not a class hierarchy.
pub type BarParser = fn(&str, &str) -> Result<Bar, BacktestError>;

fn field(fields: &[&str], idx: usize, line: &str) -> Result<Decimal, BacktestError> {
    let raw = fields
        .get(idx)
        .ok_or_else(|| BacktestError::InvalidBar(format!("missing field {idx} in {line:?}")))?;
    crate::decimal::parse_decimal(raw).map_err(|e| BacktestError::InvalidBar(format!("{e} in {line:?}")))
}

/// `YYYYMMDD-HHMMSS,SYMBOL,open,high,low,close`. Hour is chars 9-10;
/// minutes and seconds are discarded (timestamp truncated to the hour).
pub fn parse_intraday_bar(symbol: &str, line: &str) -> Result<Bar, BacktestError> {
    let fields: Vec<&str> = line.split(',').collect();
    let dt = fields
        .first()
        .ok_or_else(|| BacktestError::InvalidBar(format!("empty line: {line:?}")))?;
    if dt.len() < 11 {
        return Err(BacktestError::InvalidBar(format!(
            "timestamp too short: {dt:?}"
        )));
    }
    let year: i32 = dt[0..4]
        .parse()
        .map_err(|_| BacktestError::InvalidBar(format!("bad year in {dt:?}")))?;
    let month: u32 = dt[4..6]
        .parse()
        .map_err(|_| BacktestError::InvalidBar(format!("bad month in {dt:?}")))?;
    let day: u32 = dt[6..8]
        .parse()
        .map_err(|_| BacktestError::InvalidBar(format!("bad day in {dt:?}")))?;
    let hour: u32 = dt[9..11]
        .parse()
        .map_err(|_| BacktestError::InvalidBar(format!("bad hour in {dt:?}")))?;

    let timestamp = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .ok_or_else(|| BacktestError::InvalidBar(format!("invalid timestamp: {dt:?}")))?;

    let open = field(&fields, 2, line)?;
    let high = field(&fields, 3, line)?;
    let low = field(&fields, 4, line)?;
    let close = field(&fields, 5, line)?;

    Bar::new(timestamp, symbol, open, high, low, close)
        .map_err(|e| BacktestError::InvalidBar(e.to_string()))
}

/// Yahoo-like daily form: `YYYY-MM-DD,open,high,low,close,volume,adj_close`.
/// Hour is zero; symbol is supplied externally; volume/adj_close are
/// parsed (to validate the line shape) then discarded.
pub fn parse_daily_bar(symbol: &str, line: &str) -> Result<Bar, BacktestError> {
    let fields: Vec<&str> = line.split(',').collect();
    let dt = fields
        .first()
        .ok_or_else(|| BacktestError::InvalidBar(format!("empty line: {line:?}")))?;
    if dt.len() < 10 {
        return Err(BacktestError::InvalidBar(format!(
            "date too short: {dt:?}"
        )));
    }
    let year: i32 = dt[0..4]
        .parse()
        .map_err(|_| BacktestError::InvalidBar(format!("bad year in {dt:?}")))?;
    let month: u32 = dt[5..7]
        .parse()
        .map_err(|_| BacktestError::InvalidBar(format!("bad month in {dt:?}")))?;
    let day: u32 = dt[8..10]
        .parse()
        .map_err(|_| BacktestError::InvalidBar(format!("bad day in {dt:?}")))?;

    let timestamp = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| BacktestError::InvalidBar(format!("invalid date: {dt:?}")))?;

    let open = field(&fields, 1, line)?;
    let high = field(&fields, 2, line)?;
    let low = field(&fields, 3, line)?;
    let close = field(&fields, 4, line)?;
    let _volume = field(&fields, 5, line)?;
    let _adj_close = field(&fields, 6, line)?;

    Bar::new(timestamp, symbol, open, high, low, close)
        .map_err(|e| BacktestError::InvalidBar(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Cursor;

    #[test]
    fn intraday_parses_hour_and_discards_minutes_seconds() {
        let bar = parse_intraday_bar("EURUSD", "20010102-230000,EURUSD,0.9507,0.9509,0.9505,0.9506").unwrap();
        assert_eq!(bar.timestamp.format("%Y-%m-%d %H").to_string(), "2001-01-02 23");
        assert_eq!(bar.open, dec!(0.9507));
        assert_eq!(bar.close, dec!(0.9506));
    }

    #[test]
    fn daily_parses_hour_zero_and_discards_volume_adj_close() {
        let bar = parse_daily_bar("AAPL", "2001-01-02,10.0,10.5,9.9,10.2,1000000,10.1").unwrap();
        assert_eq!(bar.timestamp.format("%Y-%m-%d %H").to_string(), "2001-01-02 00");
        assert_eq!(bar.symbol, "AAPL");
        assert_eq!(bar.close, dec!(10.2));
    }

    #[test]
    fn intraday_rejects_malformed_timestamp() {
        assert!(parse_intraday_bar("EURUSD", "bad,EURUSD,1,2,0,1").is_err());
    }

    #[test]
    fn bufread_source_yields_trimmed_lines_and_none_at_empty_line() {
        let mut src = BufReadSource::new(Cursor::new(b"line one\nline two\n\nline three\n".to_vec()));
        assert_eq!(src.read_line(), Some("line one".to_string()));
        assert_eq!(src.read_line(), Some("line two".to_string()));
        assert_eq!(src.read_line(), None);
    }
}
