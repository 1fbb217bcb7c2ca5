//! Numeric Normalizer
//!
//! Locale-tolerant decimal parsing and exact price computation. All
//! arithmetic uses `rust_decimal::Decimal`; no `f64` touches a monetary value.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;
use thiserror::Error;

/// Fractional digits carried by every computed item price.
pub const PRICE_SCALE: u32 = 2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NumericError {
    #[error("not a decimal number: '{input}'")]
    Format { input: String },

    #[error("decimal overflow while computing price")]
    Overflow,
}

impl NumericError {
    fn format(input: &str) -> Self {
        Self::Format {
            input: input.to_string(),
        }
    }
}

/// Parse a decimal that uses either `.` or `,` as fractional separator.
///
/// Surrounding whitespace and a single leading sign are accepted. The first
/// separator is the decimal point; a second one (thousands grouping,
/// `1.234,5`) is rejected, as are exponents and empty input.
pub fn parse_decimal(text: &str) -> Result<Decimal, NumericError> {
    let trimmed = text.trim();
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let (integer, fraction) = match unsigned.find(['.', ',']) {
        Some(pos) => (&unsigned[..pos], &unsigned[pos + 1..]),
        None => (unsigned, ""),
    };
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (integer.is_empty() && fraction.is_empty()) || !all_digits(integer) || !all_digits(fraction) {
        return Err(NumericError::format(text));
    }

    let mut normalized = String::with_capacity(unsigned.len() + 2);
    if negative {
        normalized.push('-');
    }
    normalized.push_str(if integer.is_empty() { "0" } else { integer });
    if !fraction.is_empty() {
        normalized.push('.');
        normalized.push_str(fraction);
    }
    Decimal::from_str(&normalized).map_err(|_| NumericError::format(text))
}

/// Like [`parse_decimal`], but a blank field reads as zero.
pub fn parse_decimal_or_zero(text: &str) -> Result<Decimal, NumericError> {
    if text.trim().is_empty() {
        Ok(Decimal::ZERO)
    } else {
        parse_decimal(text)
    }
}

/// Round to [`PRICE_SCALE`] digits, half to even, always with that scale.
pub fn quantize_price(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(PRICE_SCALE);
    rounded
}

/// Sum of `coeff * unit_cost` over an item's breakdown, quantized to two
/// fractional digits. An empty breakdown prices to `0.00`.
///
/// Only the final sum is rounded, so the result does not depend on the
/// order of the lines.
pub fn compute_price<I>(breakdown: I) -> Result<Decimal, NumericError>
where
    I: IntoIterator<Item = (Decimal, Decimal)>,
{
    let total = breakdown
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, (coeff, unit_cost)| {
            coeff
                .checked_mul(unit_cost)
                .and_then(|product| acc.checked_add(product))
        })
        .ok_or(NumericError::Overflow)?;

    Ok(quantize_price(total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_accepts_both_separators() {
        assert_eq!(parse_decimal("12,5").unwrap(), dec("12.5"));
        assert_eq!(parse_decimal("12.5").unwrap(), dec("12.5"));
        assert_eq!(parse_decimal(" 3 ").unwrap(), dec("3"));
        assert_eq!(parse_decimal("-0,25").unwrap(), dec("-0.25"));
        assert_eq!(parse_decimal(",5").unwrap(), dec("0.5"));
        assert_eq!(parse_decimal("7.").unwrap(), dec("7"));
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        for input in ["", "  ", "abc", "1.234,5", "1,2,3", "1e3", "12 5", "-", ".", "1_000"] {
            assert!(
                matches!(parse_decimal(input), Err(NumericError::Format { .. })),
                "expected format error for {:?}",
                input
            );
        }
    }

    #[test]
    fn test_parse_or_zero_treats_blank_as_zero() {
        assert_eq!(parse_decimal_or_zero("").unwrap(), Decimal::ZERO);
        assert_eq!(parse_decimal_or_zero("  ").unwrap(), Decimal::ZERO);
        assert_eq!(parse_decimal_or_zero("4,5").unwrap(), dec("4.5"));
        assert!(parse_decimal_or_zero("x").is_err());
    }

    #[test]
    fn test_compute_price_scenario() {
        let price = compute_price(vec![(dec("2"), dec("10")), (dec("0.5"), dec("100"))]).unwrap();
        assert_eq!(price, dec("70.00"));
        assert_eq!(price.to_string(), "70.00");
    }

    #[test]
    fn test_compute_price_empty_is_zero() {
        let price = compute_price(Vec::new()).unwrap();
        assert_eq!(price, Decimal::ZERO);
        assert_eq!(price.to_string(), "0.00");
    }

    #[test]
    fn test_rounding_is_half_to_even() {
        assert_eq!(compute_price(vec![(dec("1"), dec("0.125"))]).unwrap(), dec("0.12"));
        assert_eq!(compute_price(vec![(dec("1"), dec("0.135"))]).unwrap(), dec("0.14"));
        assert_eq!(compute_price(vec![(dec("1"), dec("-0.125"))]).unwrap(), dec("-0.12"));
        assert_eq!(compute_price(vec![(dec("1"), dec("0.1251"))]).unwrap(), dec("0.13"));
    }

    #[test]
    fn test_compute_price_overflow() {
        let result = compute_price(vec![(Decimal::MAX, dec("2"))]);
        assert_eq!(result, Err(NumericError::Overflow));
    }

    prop_compose! {
        fn arb_line()(coeff in 0i64..1_000_000i64, coeff_scale in 0u32..6,
                      cost in 0i64..10_000_000i64, cost_scale in 0u32..4) -> (Decimal, Decimal) {
            (Decimal::new(coeff, coeff_scale), Decimal::new(cost, cost_scale))
        }
    }

    proptest! {
        /// Price is commutative under reordering of the breakdown lines
        #[test]
        fn prop_compute_price_commutative(lines in prop::collection::vec(arb_line(), 0..20)) {
            let forward = compute_price(lines.clone()).unwrap();
            let mut reversed = lines.clone();
            reversed.reverse();
            prop_assert_eq!(forward, compute_price(reversed).unwrap());

            let mut rotated = lines;
            if !rotated.is_empty() {
                rotated.rotate_left(1);
            }
            prop_assert_eq!(forward, compute_price(rotated).unwrap());
            prop_assert_eq!(forward.scale(), PRICE_SCALE);
        }

        /// Comma and dot spell the same number
        #[test]
        fn prop_separators_are_equivalent(int in 0u32..1_000_000u32, frac in "[0-9]{1,6}") {
            let dotted = parse_decimal(&format!("{}.{}", int, frac)).unwrap();
            let comma = parse_decimal(&format!("{},{}", int, frac)).unwrap();
            prop_assert_eq!(dotted, comma);
        }
    }
}
