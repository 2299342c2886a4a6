//! Fee split arithmetic.
//!
//! Amounts are handled as exact decimal text and converted to integer token
//! units by truncation toward zero. The fee is floored; the recipient gets
//! the remainder, so no unit is ever lost or created.

use alloy::primitives::U256;

use crate::payments::types::PaymentError;

/// Basis points in 100%.
pub const BPS_DENOMINATOR: u16 = 10_000;

/// Bound on the decimal exponent accepted in scientific notation.
const MAX_EXPONENT: i64 = 1_000;

/// A non-negative decimal number kept as its digits and a scale.
///
/// The value is `digits × 10^(-scale)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecimalAmount {
    digits: String,
    scale: i64,
}

impl DecimalAmount {
    /// Parse plain (`12.5`) or scientific (`1.25e1`) notation.
    pub fn parse(text: &str) -> Result<Self, PaymentError> {
        let text = text.trim();
        let invalid = || PaymentError::InvalidAmount(format!("'{}' is not a decimal amount", text));

        if text.starts_with('-') {
            return Err(PaymentError::InvalidAmount("amount must be positive".to_string()));
        }

        let (mantissa, exponent) = match text.find(['e', 'E']) {
            Some(pos) => {
                let exponent: i64 = text[pos + 1..].parse().map_err(|_| invalid())?;
                if exponent.abs() > MAX_EXPONENT {
                    return Err(invalid());
                }
                (&text[..pos], exponent)
            }
            None => (text, 0),
        };

        let (int_part, frac_part) = match mantissa.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (mantissa, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let digits = format!("{}{}", int_part, frac_part);
        if digits.bytes().all(|b| b == b'0') {
            return Err(PaymentError::InvalidAmount("amount must be positive".to_string()));
        }

        Ok(Self {
            digits,
            scale: frac_part.len() as i64 - exponent,
        })
    }

    /// `trunc(self × 10^decimals)` as integer token units.
    pub fn to_units(&self, decimals: u8) -> Result<U256, PaymentError> {
        // Number of leading digits that land left of the decimal point
        let whole = self.digits.len() as i64 - self.scale + decimals as i64;
        if whole <= 0 {
            return Ok(U256::ZERO);
        }

        let whole = whole as usize;
        let mut units: String = self.digits.chars().take(whole).collect();
        if whole > self.digits.len() {
            units.extend(std::iter::repeat('0').take(whole - self.digits.len()));
        }

        let units = units.trim_start_matches('0');
        if units.is_empty() {
            return Ok(U256::ZERO);
        }
        U256::from_str_radix(units, 10)
            .map_err(|_| PaymentError::InvalidAmount("amount is too large".to_string()))
    }
}

impl std::fmt::Display for DecimalAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}e{}", self.digits, -self.scale)
    }
}

/// Token-unit amounts for both legs of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitResult {
    pub total_units: U256,
    pub recipient_units: U256,
    pub fee_units: U256,
    pub decimals: u8,
}

impl SplitResult {
    pub fn recipient_amount(&self) -> String {
        format_units(self.recipient_units, self.decimals)
    }

    pub fn fee_amount(&self) -> String {
        format_units(self.fee_units, self.decimals)
    }
}

/// Split `amount` into recipient and fee units at `fee_rate_bps`.
pub fn split(amount: &DecimalAmount, decimals: u8, fee_rate_bps: u16) -> Result<SplitResult, PaymentError> {
    if fee_rate_bps > BPS_DENOMINATOR {
        return Err(PaymentError::InvalidAmount(format!(
            "fee rate {} bps exceeds 100%",
            fee_rate_bps
        )));
    }

    let total_units = amount.to_units(decimals)?;
    if total_units < U256::from(1) {
        return Err(PaymentError::InvalidAmount(
            "amount is smaller than one token unit".to_string(),
        ));
    }

    let fee_units = fee_floor(total_units, fee_rate_bps);
    Ok(SplitResult {
        total_units,
        recipient_units: total_units - fee_units,
        fee_units,
        decimals,
    })
}

/// `floor(total × bps / 10_000)` without intermediate overflow.
fn fee_floor(total: U256, bps: u16) -> U256 {
    let denom = U256::from(BPS_DENOMINATOR);
    let bps = U256::from(bps);
    (total / denom) * bps + (total % denom) * bps / denom
}

/// Render integer units as a decimal string without trailing zeros.
pub fn format_units(units: U256, decimals: u8) -> String {
    let digits = units.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals - digits.len() + 1), digits)
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, frac_part)
    }
}
