// src/money.rs

use crate::error::BillingError;
use num_format::{Locale, ToFormattedString as _};
use rust_decimal::prelude::ToPrimitive as _;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr as _;

/// Parse a user-supplied unit price. Rejects non-numeric and negative input.
pub fn parse_unit_price(raw: &str) -> Result<Decimal, BillingError> {
    let cleaned = raw.trim().trim_start_matches('$').replace(',', "");
    let price = Decimal::from_str(&cleaned).map_err(|e| {
        BillingError::InvalidConfiguration(format!("price per listing '{raw}' is not a number ({e})"))
    })?;
    validate_unit_price(price)
}

pub fn validate_unit_price(price: Decimal) -> Result<Decimal, BillingError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(BillingError::InvalidConfiguration(format!(
            "price per listing must not be negative (got {price})"
        )));
    }
    Ok(price)
}

/// Exact `count × unit_price`; no rounding happens here.
///
/// A product outside `Decimal`'s range is rejected as `InvalidConfiguration`,
/// since only an oversized price can get it there.
pub fn total_for(count: usize, unit_price: Decimal) -> Result<Decimal, BillingError> {
    Decimal::from(count as u64)
        .checked_mul(unit_price)
        .ok_or_else(|| {
            BillingError::InvalidConfiguration(format!(
                "total for {count} listings at ${unit_price} overflows"
            ))
        })
}

fn to_cents(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Per-line currency cell: `$200.00`, `$1000.00`.
pub fn format_plain(amount: Decimal) -> String {
    let cents = to_cents(amount);
    if cents.is_sign_negative() && !cents.is_zero() {
        format!("-${}", cents.abs())
    } else {
        format!("${}", cents.abs())
    }
}

/// Summary currency cell with thousands separators: `$1,000.00`.
///
/// Uses en locale grouping regardless of the user's locale.
pub fn format_grouped(amount: Decimal) -> String {
    let cents = to_cents(amount);
    let negative = cents.is_sign_negative() && !cents.is_zero();
    let cents = cents.abs();

    let whole = cents.trunc();
    let fraction = ((cents - whole) * Decimal::ONE_HUNDRED).to_u64().unwrap_or(0);
    let whole = match whole.to_u64() {
        Some(w) => w.to_formatted_string(&Locale::en),
        // Beyond u64 range: fall back to the ungrouped digits.
        None => whole.to_string(),
    };

    format!("{}${}.{:02}", if negative { "-" } else { "" }, whole, fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_unit_price() {
        assert_eq!(parse_unit_price("200").unwrap(), dec("200"));
        assert_eq!(parse_unit_price(" $1,250.50 ").unwrap(), dec("1250.50"));
        assert_eq!(parse_unit_price("0").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_parse_unit_price_rejects_bad_input() {
        assert!(matches!(
            parse_unit_price("two hundred"),
            Err(BillingError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            parse_unit_price("-5"),
            Err(BillingError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_total_is_exact() {
        assert_eq!(total_for(5, dec("200.00")).unwrap(), dec("1000.00"));
        // 3 × 0.1 must not drift the way binary floats do.
        assert_eq!(total_for(3, dec("0.1")).unwrap(), dec("0.3"));
        assert_eq!(total_for(0, dec("200")).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_total_overflow_is_rejected() {
        let price = parse_unit_price("79228162514264337593543950335").unwrap();
        assert_eq!(price, Decimal::MAX);
        assert_eq!(total_for(1, price).unwrap(), Decimal::MAX);

        let err = total_for(2, price).unwrap_err();
        match err {
            BillingError::InvalidConfiguration(msg) => {
                assert!(msg.starts_with("total for 2 listings at $"), "{msg}");
                assert!(msg.ends_with("overflows"), "{msg}");
            }
            other => panic!("expected InvalidConfiguration, got {other:?}"),
        }
    }

    #[test]
    fn test_format_plain() {
        assert_eq!(format_plain(dec("200")), "$200.00");
        assert_eq!(format_plain(dec("1000")), "$1000.00");
        assert_eq!(format_plain(dec("19.999")), "$20.00");
        assert_eq!(format_plain(dec("0.005")), "$0.01");
    }

    #[test]
    fn test_format_grouped() {
        assert_eq!(format_grouped(dec("1000.00")), "$1,000.00");
        assert_eq!(format_grouped(dec("1234567.891")), "$1,234,567.89");
        assert_eq!(format_grouped(dec("200")), "$200.00");
        assert_eq!(format_grouped(Decimal::ZERO), "$0.00");
        assert_eq!(format_grouped(dec("-1500.5")), "-$1,500.50");
    }
}
