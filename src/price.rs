//! Price codec: transfer-market value strings to integer labels and back

use crate::error::{Error, Result};

/// Currency symbols stripped from either end of a price string.
const CURRENCY_SYMBOLS: [char; 3] = ['€', '£', '$'];

/// Encode a currency-formatted price string such as `"€45.5m"` or `"€500k"`.
///
/// The magnitude suffix decides how many zero digits are appended to the
/// digit groups: `m` concatenates the integer and fractional groups and
/// appends four zeros, `k` appends three. No multiplication takes place,
/// so `"€45.5m"` encodes to `4550000`.
///
/// A millions value without a fractional group is treated as having a
/// single `0` fractional digit.
pub fn encode_price(raw: &str) -> Result<i64> {
    let invalid = || Error::InvalidPrice {
        raw: raw.to_string(),
    };

    let price = raw.trim().trim_matches(|c: char| CURRENCY_SYMBOLS.contains(&c));

    let digits = if let Some(millions) = price.strip_suffix('m') {
        let (whole, fraction) = millions.split_once('.').unwrap_or((millions, "0"));
        format!("{whole}{fraction}0000")
    } else if let Some(thousands) = price.strip_suffix('k') {
        format!("{thousands}000")
    } else {
        price.to_string()
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    digits.parse::<i64>().map_err(|_| invalid())
}

/// Decode one boundary token of the range file into a price in millions.
///
/// The first four characters are read as a float and scaled by the
/// token's last character: `'5'` ×0.1, `'7'` ×10, `'8'` ×100, anything
/// else ×1. Range files are written in `%.18e` layout, where the last
/// character is the final exponent digit.
pub fn decode_range_boundary(raw: &str) -> Result<f64> {
    let token = raw.trim();
    let head: String = token.chars().take(4).collect();

    let value: f64 = head.parse().map_err(|_| Error::InvalidBoundary {
        raw: raw.to_string(),
    })?;

    let scale = match token.chars().last() {
        Some('5') => 0.1,
        Some('7') => 10.0,
        Some('8') => 100.0,
        _ => 1.0,
    };

    Ok(value * scale)
}
