//! Codec for the dump's hexadecimal object addresses.
//!
//! Addresses are serialized as `0x`-prefixed hex strings, almost always the
//! fixed 14-character form (`0x` + 12 digits). Decoding walks the digits
//! through a 256-entry nibble table, which keeps the hot path branch-free.

use crate::errors::{DumpError, Result};

// Bytes outside [0-9a-fA-F] map to nibble 0 rather than failing. That is the
// historical contract of this codec (a corrupted address decodes to a
// wrong-but-stable value); `parse` is the validated entry point.
const NIBBLES: [u8; 256] = nibble_table();

const fn nibble_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut digit = 0u8;
    while digit < 10 {
        table[(b'0' + digit) as usize] = digit;
        digit += 1;
    }
    let mut letter = 0u8;
    while letter < 6 {
        table[(b'a' + letter) as usize] = 10 + letter;
        table[(b'A' + letter) as usize] = 10 + letter;
        letter += 1;
    }
    table
}

/// Decodes a `0x`-prefixed address to its 64-bit value.
///
/// Length-tolerant: the 14-character dump form and longer or shorter
/// payloads all decode the same way, equivalent to `String#to_i(16)` on
/// well-formed input.
#[inline]
pub fn decode(address: &[u8]) -> u64 {
    decode_digits(address.get(2..).unwrap_or_default())
}

/// Decodes a bare digit run with no `0x` prefix.
#[inline]
pub fn decode_digits(digits: &[u8]) -> u64 {
    let mut value = 0u64;
    for &byte in digits {
        value = (value << 4) | NIBBLES[byte as usize] as u64;
    }
    value
}

/// Parses a caller-provided address string, validating its shape.
///
/// Accepts `0x` followed by 1 to 16 hex digits; everything else fails with
/// [`DumpError::InvalidAddress`].
pub fn parse(address: &str) -> Result<u64> {
    let digits = address
        .strip_prefix("0x")
        .ok_or_else(|| invalid(address))?
        .as_bytes();
    if digits.is_empty() || digits.len() > 16 || !digits.iter().all(u8::is_ascii_hexdigit) {
        return Err(invalid(address));
    }
    Ok(decode_digits(digits))
}

fn invalid(address: &str) -> DumpError {
    DumpError::InvalidAddress {
        address: address.to_string(),
    }
}
