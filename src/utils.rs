use primitive_types::U256;

use crate::error::CodecError;

/// Strip the mandatory `0x` prefix and validate that the remainder is
/// non-empty hexadecimal. Raw values without the prefix are rejected, never
/// silently treated as zero.
fn strip_prefix(value: &str) -> Result<&str, CodecError> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(|| CodecError::MissingHexPrefix(value.to_owned()))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(CodecError::InvalidHex(value.to_owned()));
    }
    Ok(digits)
}

/// Canonical form of a hex byte string: `0x`-prefixed, lowercase, even digit
/// count (odd counts get a leading zero). `0x` alone is the empty byte
/// string and is legal here, unlike for quantities.
pub fn canonicalize_hex(value: &str) -> Result<String, CodecError> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(|| CodecError::MissingHexPrefix(value.to_owned()))?;
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(CodecError::InvalidHex(value.to_owned()));
    }
    let mut out = String::with_capacity(2 + digits.len() + 1);
    out.push_str("0x");
    if digits.len() % 2 != 0 {
        out.push('0');
    }
    out.extend(digits.chars().map(|c| c.to_ascii_lowercase()));
    Ok(out)
}

/// Decode a hex quantity into a U256.
pub fn hex_to_u256(value: &str) -> Result<U256, CodecError> {
    let digits = strip_prefix(value)?;
    if digits.len() > 64 {
        return Err(CodecError::Overflow(value.to_owned()));
    }
    U256::from_str_radix(digits, 16).map_err(|_| CodecError::InvalidHex(value.to_owned()))
}

/// Decode a hex quantity into a u64.
pub fn hex_to_u64(value: &str) -> Result<u64, CodecError> {
    let digits = strip_prefix(value)?;
    u64::from_str_radix(digits, 16).map_err(|_| CodecError::Overflow(value.to_owned()))
}

/// Decode a boolean quantity. Nodes encode these as `0x0`/`0x1`; the padded
/// forms `0x00`/`0x01` are accepted as well. Anything else is a failure.
pub fn hex_to_bool(value: &str) -> Result<bool, CodecError> {
    let digits = strip_prefix(value)?;
    match digits.trim_start_matches('0') {
        "" => Ok(false),
        "1" => Ok(true),
        _ => Err(CodecError::InvalidBoolean(value.to_owned())),
    }
}

/// Minimal hex encoding of a U256 quantity (`0x0` for zero).
pub fn u256_to_hex(value: U256) -> String {
    format!("{:#x}", value)
}

pub fn u64_to_hex(value: u64) -> String {
    format!("{:#x}", value)
}

/// Decode `0x`-prefixed hex into raw bytes. Odd digit counts are
/// canonicalized with a leading zero first.
pub fn hex_to_bytes(value: &str) -> Result<Vec<u8>, CodecError> {
    let canonical = canonicalize_hex(value)?;
    hex::decode(&canonical[2..]).map_err(|_| CodecError::InvalidHex(value.to_owned()))
}

/// Parse a decimal amount of the native currency into base units, exactly.
///
/// "1" with 18 decimals is 10^18 base units; "1.5" is 15 * 10^17. The
/// conversion never rounds: amounts with more fractional digits than the
/// currency supports fail with a precision error.
pub fn from_units(amount: &str, decimals: u8) -> Result<U256, CodecError> {
    let invalid = || CodecError::InvalidDecimal(amount.to_owned());

    let (integer, fraction) = match amount.split_once('.') {
        Some((i, f)) => (i, f),
        None => (amount, ""),
    };
    if integer.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !integer.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid());
    }
    if fraction.len() > decimals as usize {
        // Reject non-representable amounts instead of rounding, unless the
        // excess digits are all zeros
        if fraction[decimals as usize..].bytes().any(|b| b != b'0') {
            return Err(CodecError::Precision {
                value: amount.to_owned(),
                decimals,
            });
        }
    }

    let scale = U256::from(10u8)
        .checked_pow(U256::from(decimals))
        .ok_or_else(|| CodecError::Overflow(amount.to_owned()))?;

    let integer_part = if integer.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(integer).map_err(|_| invalid())?
    };

    let fraction = &fraction[..fraction.len().min(decimals as usize)];
    let fraction_part = if fraction.is_empty() {
        U256::zero()
    } else {
        let parsed = U256::from_dec_str(fraction).map_err(|_| invalid())?;
        let shift = U256::from(10u8)
            .checked_pow(U256::from(decimals as usize - fraction.len()))
            .ok_or_else(|| CodecError::Overflow(amount.to_owned()))?;
        parsed
            .checked_mul(shift)
            .ok_or_else(|| CodecError::Overflow(amount.to_owned()))?
    };

    integer_part
        .checked_mul(scale)
        .and_then(|v| v.checked_add(fraction_part))
        .ok_or_else(|| CodecError::Overflow(amount.to_owned()))
}

/// Render a base-unit amount as a decimal string, exactly. Trailing zeros of
/// the fractional part are trimmed; whole amounts carry no decimal point.
pub fn to_units(value: U256, decimals: u8) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    let scale = U256::from(10u8).pow(U256::from(decimals));
    let integer = value / scale;
    let remainder = value % scale;
    if remainder.is_zero() {
        return integer.to_string();
    }
    let mut fraction = format!("{:0>width$}", remainder.to_string(), width = decimals as usize);
    while fraction.ends_with('0') {
        fraction.pop();
    }
    format!("{}.{}", integer, fraction)
}
