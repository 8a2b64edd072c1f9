//! Token amount formatting and parsing (6-decimal mUSDC).

use alloy::primitives::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

use crate::contracts::TOKEN_DECIMALS;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("not a number: {0}")]
    NotANumber(String),
    #[error("amount cannot be negative")]
    Negative,
    #[error("amount too large")]
    TooLarge,
}

fn unit() -> U256 {
    U256::from(10u64.pow(TOKEN_DECIMALS))
}

/// Format token units as dollars with two decimals and thousands separators,
/// e.g. `1_234_567_890` → `"1,234.57"`. Cents are rounded half-up.
pub fn format_usdc(amount: U256) -> String {
    let cent = unit() / U256::from(100u64);
    let mut whole = amount / unit();
    let frac = amount % unit();
    let mut cents = (frac + cent / U256::from(2u64)) / cent;
    if cents >= U256::from(100u64) {
        whole += U256::from(1u64);
        cents -= U256::from(100u64);
    }
    format!("{}.{:02}", group_thousands(&whole.to_string()), cents.to::<u64>())
}

/// Parse a dollar string into an exact non-negative `Decimal`.
/// Thousands separators and surrounding whitespace are accepted.
pub fn parse_dollars(input: &str) -> Result<Decimal, AmountError> {
    let cleaned: String = input.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return Err(AmountError::NotANumber(input.to_string()));
    }
    let value =
        Decimal::from_str(&cleaned).map_err(|_| AmountError::NotANumber(input.to_string()))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(AmountError::Negative);
    }
    Ok(value)
}

/// Dollars to token units, flooring anything below one unit.
pub fn dollars_to_units(value: Decimal) -> Result<U256, AmountError> {
    let scaled = value
        .checked_mul(Decimal::from(10u64.pow(TOKEN_DECIMALS)))
        .ok_or(AmountError::TooLarge)?
        .floor();
    let units = scaled.to_u128().ok_or(AmountError::TooLarge)?;
    Ok(U256::from(units))
}

/// Parse a dollar string into token units, flooring anything below one unit,
/// so that `parse_usdc(&format_usdc(x))` works.
pub fn parse_usdc(input: &str) -> Result<U256, AmountError> {
    dollars_to_units(parse_dollars(input)?)
}

/// Compact K/M/B rendering for counters.
pub fn format_large_number(num: f64) -> String {
    if num >= 1e9 {
        format!("{:.1}B", num / 1e9)
    } else if num >= 1e6 {
        format!("{:.1}M", num / 1e6)
    } else if num >= 1e3 {
        format!("{:.1}K", num / 1e3)
    } else {
        format!("{num}")
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usdc(units: u64) -> U256 {
        U256::from(units)
    }

    #[test]
    fn test_format_usdc() {
        assert_eq!(format_usdc(U256::ZERO), "0.00");
        assert_eq!(format_usdc(usdc(1_000_000)), "1.00");
        assert_eq!(format_usdc(usdc(500_000)), "0.50");
        assert_eq!(format_usdc(usdc(1_234_567_890)), "1,234.57");
        assert_eq!(format_usdc(usdc(999_995)), "1.00");
        assert_eq!(format_usdc(usdc(100_000_000_000_000)), "100,000,000.00");
    }

    #[test]
    fn test_parse_usdc() {
        assert_eq!(parse_usdc("10").unwrap(), usdc(10_000_000));
        assert_eq!(parse_usdc("0.50").unwrap(), usdc(500_000));
        assert_eq!(parse_usdc(" 1,234.56 ").unwrap(), usdc(1_234_560_000));
        // below one unit is floored
        assert_eq!(parse_usdc("0.0000019").unwrap(), usdc(1));
        assert_eq!(parse_usdc("-0").unwrap(), U256::ZERO);
    }

    #[test]
    fn test_parse_usdc_errors() {
        assert!(matches!(parse_usdc("abc"), Err(AmountError::NotANumber(_))));
        assert!(matches!(parse_usdc(""), Err(AmountError::NotANumber(_))));
        assert_eq!(parse_usdc("-5"), Err(AmountError::Negative));
    }

    #[test]
    fn test_format_parse_recovers_cent_amounts() {
        for units in [0u64, 10_000, 1_000_000, 25_500_000, 1_234_560_000, 987_654_320_000] {
            let x = usdc(units);
            assert_eq!(parse_usdc(&format_usdc(x)).unwrap(), x, "units={units}");
        }
    }

    #[test]
    fn test_parse_dollars_keeps_sub_unit_precision() {
        let tiny = parse_dollars("0.0000001").unwrap();
        assert!(tiny > Decimal::ZERO);
        assert_eq!(dollars_to_units(tiny).unwrap(), U256::ZERO);
        assert_eq!(parse_dollars("1,500.5").unwrap(), Decimal::from_str("1500.5").unwrap());
    }

    #[test]
    fn test_format_large_number() {
        assert_eq!(format_large_number(999.0), "999");
        assert_eq!(format_large_number(1_500.0), "1.5K");
        assert_eq!(format_large_number(2_000_000.0), "2.0M");
        assert_eq!(format_large_number(3_100_000_000.0), "3.1B");
    }
}
