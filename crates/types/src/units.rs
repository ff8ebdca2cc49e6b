//! Decimal fixed-point conversions for token amounts, mirroring the
//! `parseUnits`/`formatUnits` helpers wallets use for ERC20 values.

use ethereum_types::U256;
use thiserror::Error;

/// Decimals used by ether and by default ERC20 tokens.
pub const DEFAULT_DECIMALS: u32 = 18;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UnitsError {
    #[error("empty amount")]
    Empty,

    #[error("invalid decimal amount {0:?}")]
    InvalidAmount(String),

    #[error("amount {amount:?} has more than {decimals} fractional digits")]
    TooPrecise { amount: String, decimals: u32 },

    #[error("amount {0:?} does not fit in 256 bits")]
    Overflow(String),
}

fn ten_pow(decimals: u32) -> Result<U256, UnitsError> {
    U256::from(10u64)
        .checked_pow(U256::from(decimals))
        .ok_or_else(|| UnitsError::Overflow(format!("10^{decimals}")))
}

/// Parses a decimal string such as `"10"` or `"0.5"` into base units.
pub fn parse_units(amount: &str, decimals: u32) -> Result<U256, UnitsError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(UnitsError::Empty);
    }

    let (whole, fraction) = match amount.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (amount, ""),
    };

    let is_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !is_digits(whole) || !is_digits(fraction) || (whole.is_empty() && fraction.is_empty()) {
        return Err(UnitsError::InvalidAmount(amount.to_string()));
    }

    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > decimals as usize {
        return Err(UnitsError::TooPrecise {
            amount: amount.to_string(),
            decimals,
        });
    }

    let whole = if whole.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(whole).map_err(|_| UnitsError::Overflow(amount.to_string()))?
    };

    let padded = format!("{:0<width$}", fraction, width = decimals as usize);
    let fraction = if padded.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(&padded).map_err(|_| UnitsError::Overflow(amount.to_string()))?
    };

    whole
        .checked_mul(ten_pow(decimals)?)
        .and_then(|w| w.checked_add(fraction))
        .ok_or_else(|| UnitsError::Overflow(amount.to_string()))
}

/// Formats base units as a decimal string. The result always carries at
/// least one fractional digit, so ten whole tokens render as `10.0`.
pub fn format_units(value: U256, decimals: u32) -> String {
    let Ok(unit) = ten_pow(decimals) else {
        return value.to_string();
    };
    if decimals == 0 {
        return format!("{value}.0");
    }

    let whole = value / unit;
    let fraction = value % unit;
    let fraction = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        format!("{whole}.0")
    } else {
        format!("{whole}.{fraction}")
    }
}

/// Shorthand for [`parse_units`] with 18 decimals.
pub fn parse_ether(amount: &str) -> Result<U256, UnitsError> {
    parse_units(amount, DEFAULT_DECIMALS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_and_fractional_amounts() {
        let ten = parse_ether("10").unwrap();
        assert_eq!(ten, U256::from(10u64) * U256::exp10(18));

        let half = parse_ether("0.5").unwrap();
        assert_eq!(half, U256::exp10(17) * U256::from(5u64));

        assert_eq!(parse_units("1.25", 2).unwrap(), U256::from(125u64));
        assert_eq!(parse_units(".5", 1).unwrap(), U256::from(5u64));
    }

    #[test]
    fn rejects_malformed_amounts() {
        assert_eq!(parse_ether(""), Err(UnitsError::Empty));
        assert!(matches!(parse_ether("1e18"), Err(UnitsError::InvalidAmount(_))));
        assert!(matches!(parse_ether("."), Err(UnitsError::InvalidAmount(_))));
        assert!(matches!(
            parse_units("0.001", 2),
            Err(UnitsError::TooPrecise { .. })
        ));
    }

    #[test]
    fn formats_like_a_wallet() {
        let ten = parse_ether("10").unwrap();
        assert_eq!(format_units(ten, DEFAULT_DECIMALS), "10.0");
        assert_eq!(format_units(ten / 2, DEFAULT_DECIMALS), "5.0");
        assert_eq!(format_units(U256::from(50u64), DEFAULT_DECIMALS), "0.00000000000000005");
        assert_eq!(format_units(U256::zero(), DEFAULT_DECIMALS), "0.0");
        assert_eq!(format_units(U256::from(7u64), 0), "7.0");
    }
}
