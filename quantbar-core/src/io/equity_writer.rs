//! Equity curve output: one `timestamp,equity` row per recorded point.

use crate::decimal::Decimal;
use chrono::NaiveDateTime;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Write `timestamp,equity` rows, one per entry in `eqvals`.
pub fn write_eqvals<W: Write>(mut out: W, eqvals: &[(NaiveDateTime, Decimal)]) -> io::Result<()> {
    for (timestamp, equity) in eqvals {
        writeln!(out, "{},{}", timestamp.format("%Y%m%d-%H%M%S"), equity)?;
    }
    Ok(())
}

/// Probe `base-01.ext`, `base-02.ext`, ... and return the first path that
/// does not already exist. Mirrors the original's `unq_name`.
pub fn unique_path(base: &str, ext: &str) -> PathBuf {
    let mut i: u32 = 1;
    loop {
        let candidate = PathBuf::from(format!("{base}-{i:02}.{ext}"));
        if !Path::new(&candidate).exists() {
            return candidate;
        }
        i += 1;
    }
}
