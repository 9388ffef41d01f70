//! Fixed-precision arithmetic facility.
//!
//! All prices, sizes, values and equity in this crate are [`Decimal`] —
//! floating point never touches a computation that affects P&L.

use std::sync::OnceLock;

pub use rust_decimal::Decimal;

/// Minimum significant digits `spec.md` requires. `rust_decimal` natively
/// carries far more than this, so the floor is met unconditionally; the
/// precision setting below only controls the *rounding* applied at
/// reporting boundaries (bar parsing, equity curve output), not the
/// arithmetic itself.
pub const DEFAULT_SIGNIFICANT_DIGITS: u32 = 6;

static PRECISION: OnceLock<u32> = OnceLock::new();

/// Set the process-wide significant-digit precision. Only the first call
/// has any effect — later calls are no-ops, so the setting holds constant
/// for the duration of a run regardless of how many times a caller (e.g. a
/// test harness) invokes it.
pub fn init_precision(significant_digits: u32) {
    let _ = PRECISION.set(significant_digits);
}

/// The active precision, defaulting to [`DEFAULT_SIGNIFICANT_DIGITS`] if
/// nothing has called [`init_precision`] yet.
pub fn precision() -> u32 {
    *PRECISION.get_or_init(|| DEFAULT_SIGNIFICANT_DIGITS)
}

/// Round `value` to the active significant-digit precision.
///
/// `rust_decimal` rounds to a fixed number of *decimal places*, not
/// significant digits, so this counts the integer-part digits and derives
/// the equivalent decimal-place scale from them.
pub fn round_to_precision(value: Decimal) -> Decimal {
    if value.is_zero() {
        return value;
    }
    let digits = precision();
    let int_digits = integer_digit_count(value.abs());
    let scale = digits.saturating_sub(int_digits);
    value.round_dp(scale)
}

fn integer_digit_count(value: Decimal) -> u32 {
    let truncated = value.trunc();
    if truncated.is_zero() {
        0
    } else {
        truncated.to_string().trim_start_matches('-').len() as u32
    }
}

/// Parse a Decimal from a string, as used at every CSV field boundary.
pub fn parse_decimal(s: &str) -> Result<Decimal, rust_decimal::Error> {
    s.trim().parse::<Decimal>()
}
