//! Conversion between decimal major-unit strings and integer minor units.

use rust_decimal::Decimal;

use crate::error::{ConnectorError, ConnectorResult};

/// Decimals of TON itself (1 TON = 10^9 nanotons).
pub const TON_DECIMALS: u32 = 9;

/// Parse a non-negative decimal string into minor units.
///
/// `"1.5"` with 9 decimals is `1_500_000_000`. Negative values, more
/// fractional digits than `decimals`, and results above `u128::MAX` are
/// rejected rather than rounded or clamped.
pub fn parse_amount(text: &str, decimals: u32) -> ConnectorResult<u128> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ConnectorError::InvalidAmount("empty amount".into()));
    }

    let value = Decimal::from_str_exact(trimmed)
        .map_err(|e| ConnectorError::InvalidAmount(format!("{trimmed:?}: {e}")))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ConnectorError::InvalidAmount(format!(
            "{trimmed:?} is negative"
        )));
    }

    let value = value.normalize();
    let scale = value.scale();
    if scale > decimals {
        return Err(ConnectorError::InvalidAmount(format!(
            "{trimmed:?} has {scale} fractional digits, at most {decimals} allowed"
        )));
    }

    let mantissa = value.mantissa().unsigned_abs();
    10u128
        .checked_pow(decimals - scale)
        .and_then(|factor| mantissa.checked_mul(factor))
        .ok_or_else(|| ConnectorError::InvalidAmount(format!("{trimmed:?} overflows")))
}

/// Render minor units as a decimal string without trailing zeros.
pub fn format_amount(value: u128, decimals: u32) -> String {
    let Some(unit) = 10u128.checked_pow(decimals) else {
        return value.to_string();
    };
    let whole = value / unit;
    let frac = value % unit;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:0width$}", width = decimals as usize);
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

pub fn parse_ton(text: &str) -> ConnectorResult<u128> {
    parse_amount(text, TON_DECIMALS)
}

pub fn format_ton(nanotons: u128) -> String {
    format_amount(nanotons, TON_DECIMALS)
}
