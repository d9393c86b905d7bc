//! Money conversion
//!
//! Unified conversion between the internal scaled-`u64` representation and
//! the client-facing decimal string representation. All conversions MUST go
//! through this module.
//!
//! ## Internal representation
//! - Amounts are stored as `u64`, scaled by `10^decimals` per asset
//!   (e.g. decimals=6 stores 100 as 100_000_000).
//! - Prices carry the quote asset's scale, so `price * qty / qty_unit`
//!   lands directly in quote units.
//!
//! ## Precision rule
//! Input precision is bounded by `display_decimals`, which is strictly
//! smaller than `decimals`. Keeping price precision within the quote
//! display decimals and quantity precision within the base display decimals
//! guarantees every `price * qty` settlement amount is exact, so no
//! rounding dust can strand in a locked balance.
//!
//! Excess precision is rejected, never truncated.

use rust_decimal::prelude::*;
use thiserror::Error;

/// Money conversion errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("precision overflow: provided {provided} decimals, max allowed {max}")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("amount must be positive")]
    InvalidAmount,

    #[error("amount too large, would overflow")]
    Overflow,

    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

/// Scale unit for an asset: `10^decimals`.
#[inline]
pub fn unit_amount(decimals: u32) -> u64 {
    10u64.pow(decimals)
}

/// Parse a client decimal string into the internal scaled `u64`.
///
/// Rejects zero, negatives, excess precision and overflow.
///
/// ```
/// use spotx::money::parse_amount;
/// assert_eq!(parse_amount("1.5", 8, 4), Ok(150_000_000));
/// ```
pub fn parse_amount(amount_str: &str, decimals: u32, display_decimals: u32) -> Result<u64, MoneyError> {
    let amount_str = amount_str.trim();
    if amount_str.is_empty() {
        return Err(MoneyError::InvalidFormat("empty string".into()));
    }
    if amount_str.starts_with('-') || amount_str.starts_with('+') {
        return Err(MoneyError::InvalidAmount);
    }

    let (whole, frac) = match amount_str.split_once('.') {
        None => (amount_str, ""),
        Some((w, f)) => {
            // Require both sides of the dot; ".5" and "5." are ambiguous
            if w.is_empty() || f.is_empty() {
                return Err(MoneyError::InvalidFormat(
                    "missing digits around decimal point".into(),
                ));
            }
            if f.contains('.') {
                return Err(MoneyError::InvalidFormat("multiple decimal points".into()));
            }
            (w, f)
        }
    };

    if frac.len() as u32 > display_decimals {
        return Err(MoneyError::PrecisionOverflow {
            provided: frac.len() as u32,
            max: display_decimals,
        });
    }

    let whole_num: u64 = whole
        .parse::<u64>()
        .map_err(|e| match e.kind() {
            std::num::IntErrorKind::PosOverflow => MoneyError::Overflow,
            _ => MoneyError::InvalidFormat(format!("invalid whole part: {whole}")),
        })?;

    let frac_num: u64 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{frac:0<width$}", width = decimals as usize);
        padded
            .parse::<u64>()
            .map_err(|_| MoneyError::InvalidFormat(format!("invalid fractional part: {frac}")))?
    };

    let scaled = whole_num
        .checked_mul(unit_amount(decimals))
        .and_then(|w| w.checked_add(frac_num))
        .ok_or(MoneyError::Overflow)?;

    if scaled == 0 {
        return Err(MoneyError::InvalidAmount);
    }
    Ok(scaled)
}

/// Parse an already-decoded `Decimal` into the internal scaled `u64`.
///
/// Boundary hook for adapters that decode amounts into `Decimal` before
/// handing commands to the engine (a gateway deserializing JSON
/// numbers, for instance). The engine's own command path receives
/// strings and goes through [`parse_amount`].
pub fn parse_decimal(d: Decimal, decimals: u32, display_decimals: u32) -> Result<u64, MoneyError> {
    if d <= Decimal::ZERO {
        return Err(MoneyError::InvalidAmount);
    }
    let normalized = d.normalize();
    if normalized.scale() > display_decimals {
        return Err(MoneyError::PrecisionOverflow {
            provided: normalized.scale(),
            max: display_decimals,
        });
    }
    let scaled = normalized
        .checked_mul(Decimal::from(unit_amount(decimals)))
        .ok_or(MoneyError::Overflow)?;
    scaled.to_u64().ok_or(MoneyError::Overflow)
}

/// Format an internal scaled `u64` as a decimal string with exactly
/// `display_decimals` fractional digits (none when it is 0).
///
/// ```
/// use spotx::money::format_amount;
/// assert_eq!(format_amount(150_000_000, 8, 4), "1.5000");
/// assert_eq!(format_amount(500, 2, 0), "5");
/// ```
pub fn format_amount(value: u64, decimals: u32, display_decimals: u32) -> String {
    let unit = unit_amount(decimals);
    let whole = value / unit;
    if display_decimals == 0 {
        return whole.to_string();
    }
    let frac = value % unit;
    let frac_str = format!("{frac:0>width$}", width = decimals as usize);
    let shown = display_decimals.min(decimals) as usize;
    format!("{whole}.{}", &frac_str[..shown])
}

/// `price * qty / qty_unit` with a u128 intermediate.
///
/// The product of two in-range u64 amounts can exceed u64::MAX; a naive
/// multiplication would silently under-lock funds.
#[inline]
pub fn quote_amount(price: u64, qty: u64, qty_unit: u64) -> Result<u64, MoneyError> {
    let wide = (price as u128) * (qty as u128) / (qty_unit as u128);
    u64::try_from(wide).map_err(|_| MoneyError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_and_fractional() {
        assert_eq!(parse_amount("100", 6, 2), Ok(100_000_000));
        assert_eq!(parse_amount("100.50", 6, 2), Ok(100_500_000));
        assert_eq!(parse_amount("0.5", 8, 4), Ok(50_000_000));
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(parse_amount("0", 6, 2), Err(MoneyError::InvalidAmount));
        assert_eq!(parse_amount("-5", 6, 2), Err(MoneyError::InvalidAmount));
        assert_eq!(
            parse_amount(".5", 6, 2),
            Err(MoneyError::InvalidFormat(
                "missing digits around decimal point".into()
            ))
        );
        assert!(matches!(
            parse_amount("1.234", 6, 2),
            Err(MoneyError::PrecisionOverflow { provided: 3, max: 2 })
        ));
        assert!(matches!(parse_amount("abc", 6, 2), Err(MoneyError::InvalidFormat(_))));
    }

    #[test]
    fn rejects_overflow() {
        assert_eq!(
            parse_amount("99999999999999999999999", 6, 2),
            Err(MoneyError::Overflow)
        );
    }

    #[test]
    fn parse_decimal_rejects_excess_precision() {
        let d = Decimal::from_str("1.23456").unwrap();
        assert!(matches!(
            parse_decimal(d, 8, 4),
            Err(MoneyError::PrecisionOverflow { .. })
        ));
        let ok = Decimal::from_str("1.2345").unwrap();
        assert_eq!(parse_decimal(ok, 8, 4), Ok(123_450_000));
    }

    #[test]
    fn formats_with_display_decimals() {
        assert_eq!(format_amount(100_000_000, 6, 2), "100.00");
        assert_eq!(format_amount(100_500_000, 6, 2), "100.50");
        assert_eq!(format_amount(50_000_000, 8, 4), "0.5000");
        assert_eq!(format_amount(0, 6, 2), "0.00");
    }

    #[test]
    fn round_trips_within_display_precision() {
        let v = parse_amount("42.37", 6, 2).unwrap();
        assert_eq!(format_amount(v, 6, 2), "42.37");
    }

    #[test]
    fn quote_amount_uses_wide_intermediate() {
        // price and qty whose product exceeds u64::MAX
        let price = 84_956_010_000u64;
        let qty = 256_284_400u64;
        let qty_unit = 100_000_000u64;
        assert!(price.checked_mul(qty).is_none());
        assert_eq!(quote_amount(price, qty, qty_unit), Ok(217_729_000_492));
    }
}
