use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{BankError, Result};

/// Fractional digits accepted for amounts and used when rendering them.
pub const AMOUNT_SCALE: u32 = 2;

/// Parse a non-negative decimal literal: digits, optionally followed by `.` and digits.
///
/// Signs, exponents and separators are rejected. Returns `None` for anything that is
/// not such a literal or that does not fit in a `Decimal`.
pub fn parse_amount(token: &str) -> Option<Decimal> {
    let (whole, fraction) = match token.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (token, None),
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(whole) || !fraction.is_none_or(digits) {
        return None;
    }
    Decimal::from_str(token).ok()
}

/// Check that `amount` can be moved in or out of an account.
pub fn validate_amount(amount: Decimal) -> Result<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(BankError::InvalidAmount(format!(
            "{amount} is not a positive amount"
        )));
    }
    let amount = amount.normalize();
    if amount.scale() > AMOUNT_SCALE {
        return Err(BankError::InvalidAmount(format!(
            "{amount} has more than {AMOUNT_SCALE} decimal places"
        )));
    }
    Ok(amount)
}

/// Render an amount the way it appears on the wire, e.g. `100.00`.
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(AMOUNT_SCALE))
}
