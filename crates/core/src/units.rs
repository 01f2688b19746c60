//! Conversion between human-readable decimal amounts and integer base units.
//!
//! Everything here is exact integer arithmetic on `U256`; floating point never
//! touches an amount.

use alloy_primitives::U256;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::errors::DomainError;

/// Parses a decimal string such as `"0.1"` or `"1000"` into base units.
///
/// Fractional digits beyond `decimals` are accepted only when they are zeros.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256, DomainError> {
    let trimmed = amount.trim();
    let invalid = |reason: &'static str| DomainError::InvalidAmount {
        value: amount.to_string(),
        reason,
    };

    if trimmed.is_empty() {
        return Err(invalid("amount is empty"));
    }
    if trimmed.starts_with('-') || trimmed.starts_with('+') {
        return Err(invalid("signed amounts are not accepted"));
    }
    if trimmed.contains(['e', 'E']) {
        return Err(invalid("exponent notation is not accepted"));
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid("amount has no digits"));
    }
    if !whole.chars().chain(fraction.chars()).all(|ch| ch.is_ascii_digit()) {
        return Err(invalid("amount must contain only digits and one decimal point"));
    }

    let scale = usize::from(decimals);
    let fraction = if fraction.len() > scale {
        let (kept, dropped) = fraction.split_at(scale);
        if dropped.chars().any(|ch| ch != '0') {
            return Err(invalid("amount has more fractional digits than the token supports"));
        }
        kept
    } else {
        fraction
    };

    let mut digits = String::with_capacity(whole.len() + scale);
    digits.push_str(whole);
    digits.push_str(fraction);
    digits.extend(std::iter::repeat('0').take(scale - fraction.len()));

    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }

    U256::from_str_radix(digits, 10).map_err(|_| invalid("amount does not fit in 256 bits"))
}

/// Formats base units as a decimal string, always with at least one fractional digit.
pub fn format_units(value: U256, decimals: u8) -> String {
    let scale = usize::from(decimals);
    let digits = value.to_string();
    let padded = if digits.len() <= scale {
        format!("{}{digits}", "0".repeat(scale - digits.len() + 1))
    } else {
        digits
    };

    let (whole, fraction) = padded.split_at(padded.len() - scale);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        format!("{whole}.0")
    } else {
        format!("{whole}.{fraction}")
    }
}

/// Base units as a `Decimal`, when the value fits in its 96-bit mantissa.
pub fn to_decimal(value: U256, decimals: u8) -> Option<Decimal> {
    Decimal::from_str(&format_units(value, decimals)).ok()
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;
    use rust_decimal::Decimal;

    use super::{format_units, parse_units, to_decimal};
    use crate::errors::DomainError;

    #[test]
    fn parses_whole_and_fractional_amounts() {
        assert_eq!(parse_units("1", 18), Ok(U256::from(10u64).pow(U256::from(18u64))));
        assert_eq!(parse_units("0.1", 6), Ok(U256::from(100_000u64)));
        assert_eq!(parse_units(".5", 6), Ok(U256::from(500_000u64)));
        assert_eq!(parse_units("1000", 6), Ok(U256::from(1_000_000_000u64)));
        assert_eq!(parse_units("000.000", 6), Ok(U256::ZERO));
        assert_eq!(parse_units("42", 0), Ok(U256::from(42u64)));
    }

    #[test]
    fn trailing_zero_precision_beyond_decimals_is_tolerated() {
        assert_eq!(parse_units("1.2300000", 2), Ok(U256::from(123u64)));
    }

    #[test]
    fn rejects_inputs_that_would_lose_precision_or_are_malformed() {
        for input in ["", "  ", "-1", "1e18", "1.2.3", "abc", ".", "1.0000001"] {
            let result = parse_units(input, 6);
            assert!(
                matches!(result, Err(DomainError::InvalidAmount { .. })),
                "`{input}` should be rejected, got {result:?}"
            );
        }
    }

    #[test]
    fn formats_with_trimmed_fraction() {
        assert_eq!(format_units(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_units(U256::from(1_000_000u64), 6), "1.0");
        assert_eq!(format_units(U256::from(1u64), 18), "0.000000000000000001");
        assert_eq!(format_units(U256::ZERO, 6), "0.0");
        assert_eq!(format_units(U256::from(7u64), 0), "7.0");
    }

    #[test]
    fn conversion_round_trip_is_lossless_for_every_decimal_count() {
        let samples = ["0", "1", "0.1", "123.456", "999999.000001", "0.000000000000000001"];
        for decimals in 0u8..=18 {
            for sample in samples {
                let Ok(units) = parse_units(sample, decimals) else {
                    continue;
                };
                let formatted = format_units(units, decimals);
                assert_eq!(
                    parse_units(&formatted, decimals),
                    Ok(units),
                    "{sample} with {decimals} decimals"
                );
                let expected = sample.parse::<Decimal>().ok();
                assert_eq!(
                    formatted.parse::<Decimal>().ok(),
                    expected,
                    "{sample} with {decimals} decimals"
                );
            }
        }
    }

    #[test]
    fn converts_to_decimal_for_display_math() {
        assert_eq!(to_decimal(U256::from(2_500_000u64), 6), Some(Decimal::new(25, 1)));
        assert_eq!(to_decimal(U256::MAX, 0), None);
    }
}
