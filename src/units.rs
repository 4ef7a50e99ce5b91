//! Decimal amount strings to token base units.

use ethers::types::U256;
use thiserror::Error;

/// Used when a token's decimals cannot be determined
pub const DEFAULT_TOKEN_DECIMALS: u8 = 6;

#[derive(Error, Debug)]
pub enum AmountError {
    #[error("Amount is empty")]
    Empty,

    #[error("Amount must not be negative")]
    Negative,

    #[error("Amount {0:?} is not a decimal number")]
    Invalid(String),

    #[error("Amount does not fit in 256 bits")]
    TooLarge,
}

/// Scales `amount` by `10^decimals`. Fraction digits past `decimals` are truncated.
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, AmountError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(AmountError::Empty);
    }
    if amount.starts_with('-') {
        return Err(AmountError::Negative);
    }

    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    let is_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
        return Err(AmountError::Invalid(amount.to_string()));
    }

    let scale =
        U256::from(10u8).checked_pow(U256::from(decimals)).ok_or(AmountError::TooLarge)?;
    let whole = digits(whole)?;
    let fraction = &fraction[..fraction.len().min(decimals as usize)];
    let fraction = digits(&format!("{fraction:0<width$}", width = decimals as usize))?;

    whole
        .checked_mul(scale)
        .and_then(|value| value.checked_add(fraction))
        .ok_or(AmountError::TooLarge)
}

// Input is known to be ASCII digits, so parsing only fails on overflow.
fn digits(part: &str) -> Result<U256, AmountError> {
    if part.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_dec_str(part).map_err(|_| AmountError::TooLarge)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_amounts_scale_by_decimals() {
        assert_eq!(parse_amount("50", 6).unwrap(), U256::from(50_000_000u64));
        assert_eq!(parse_amount("10", 6).unwrap(), U256::from(10_000_000u64));
        assert_eq!(parse_amount("1", 18).unwrap(), U256::exp10(18));
        assert_eq!(parse_amount("0", 6).unwrap(), U256::zero());
    }

    #[test]
    fn fractions_scale_and_truncate() {
        assert_eq!(parse_amount("1.5", 6).unwrap(), U256::from(1_500_000u64));
        assert_eq!(parse_amount("0.000001", 6).unwrap(), U256::one());
        assert_eq!(parse_amount(".25", 6).unwrap(), U256::from(250_000u64));
        assert_eq!(parse_amount("2.", 6).unwrap(), U256::from(2_000_000u64));
        assert_eq!(parse_amount("1.1234567", 6).unwrap(), U256::from(1_123_456u64));
        assert_eq!(parse_amount(" 3 ", 6).unwrap(), U256::from(3_000_000u64));
    }

    #[test]
    fn decimals_are_a_parameter() {
        assert_eq!(parse_amount("5", 0).unwrap(), U256::from(5u64));
        assert_eq!(parse_amount("5.9", 0).unwrap(), U256::from(5u64));
        assert_eq!(parse_amount("5", 8).unwrap(), U256::from(500_000_000u64));
    }

    #[test]
    fn rejects_what_is_not_an_amount() {
        assert!(matches!(parse_amount("", 6), Err(AmountError::Empty)));
        assert!(matches!(parse_amount("   ", 6), Err(AmountError::Empty)));
        assert!(matches!(parse_amount("-1", 6), Err(AmountError::Negative)));
        assert!(matches!(parse_amount("abc", 6), Err(AmountError::Invalid(_))));
        assert!(matches!(parse_amount("1.2.3", 6), Err(AmountError::Invalid(_))));
        assert!(matches!(parse_amount(".", 6), Err(AmountError::Invalid(_))));
        assert!(matches!(parse_amount("1e6", 6), Err(AmountError::Invalid(_))));
    }

    #[test]
    fn amounts_overflowing_once_scaled_are_too_large() {
        let huge = "1".repeat(75);
        assert!(matches!(parse_amount(&huge, 6), Err(AmountError::TooLarge)));
        assert!(matches!(parse_amount(&"9".repeat(80), 0), Err(AmountError::TooLarge)));
        assert!(matches!(parse_amount("1", 78), Err(AmountError::TooLarge)));

        let largest_power = format!("1{}", "0".repeat(71));
        assert_eq!(parse_amount(&largest_power, 6).unwrap(), U256::exp10(77));
        assert_eq!(parse_amount(&"1".repeat(75), 0).unwrap(), U256::from_dec_str(&huge).unwrap());
    }
}
