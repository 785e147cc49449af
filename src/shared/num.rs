//! Decimal-string arithmetic helpers.
//!
//! The scanner protocol carries every price, volume, and supply figure as a decimal
//! string. Merges parse them into [`rust_decimal::Decimal`] for exact accumulation and
//! render the result back as a string.

use std::str::FromStr;

use rust_decimal::Decimal;

/// Parse a decimal string, treating empty or malformed input as zero.
///
/// Merges must never fail on a bad numeric field; a malformed value is logged and
/// contributes nothing.
pub fn decimal_or_zero(value: &str) -> Decimal {
    if value.is_empty() {
        return Decimal::ZERO;
    }
    match Decimal::from_str(value) {
        Ok(d) => d,
        Err(_) => {
            tracing::warn!("Malformed decimal value: {:?}", value);
            Decimal::ZERO
        }
    }
}

/// Parse an optional decimal string, absent or malformed input becoming zero.
pub fn decimal_or_zero_opt(value: Option<&str>) -> Decimal {
    value.map(decimal_or_zero).unwrap_or(Decimal::ZERO)
}

/// Render a decimal as a string with trailing fractional zeros stripped.
pub fn decimal_to_string(value: Decimal) -> String {
    value.normalize().to_string()
}
