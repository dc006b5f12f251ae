//! Monetary types for stake and balance representation.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::{Error, Result};

/// Amount of funds in micro-USDC (1 USDC = 1_000_000).
pub type Amount = u64;

/// Payout multiplier quoted to bettors.
pub type OddsValue = Decimal;

/// Micro-units per whole USDC.
pub const MICROS_PER_USDC: Amount = 1_000_000;

/// Render an amount as whole USDC with six decimal places.
#[must_use]
pub fn format_usdc(amount: Amount) -> String {
    format!(
        "{}.{:06}",
        amount / MICROS_PER_USDC,
        amount % MICROS_PER_USDC
    )
}

/// Parse a whole-USDC string such as `"12.5"` into micro-units.
///
/// # Errors
/// `Validation` for malformed, negative, or sub-micro amounts.
pub fn parse_usdc(raw: &str) -> Result<Amount> {
    let value: Decimal = raw
        .trim()
        .parse()
        .map_err(|_| Error::Validation(format!("'{raw}' is not a USDC amount")))?;
    if value.is_sign_negative() {
        return Err(Error::Validation(format!("amount '{raw}' is negative")));
    }
    let micros = value * Decimal::from(MICROS_PER_USDC);
    if micros.fract() != Decimal::ZERO {
        return Err(Error::Validation(format!(
            "amount '{raw}' has more than six decimal places"
        )));
    }
    micros
        .to_u64()
        .ok_or_else(|| Error::Validation(format!("amount '{raw}' is out of range")))
}
