// Paw Swap Engine — DEX Ethereum Primitives
// Core hex, keccak, address, and base-unit amount conversion utilities.

use crate::atoms::error::{SwapError, SwapResult};
use crate::atoms::types::Amount;
use num_bigint::BigUint;
use num_traits::{Num, Zero};

/// Keccak-256 hash (Ethereum's hash function)
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    use tiny_keccak::{Hasher, Keccak};
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    output
}

/// Hex-encode bytes with 0x prefix
pub fn hex_encode(data: &[u8]) -> String {
    format!("0x{}", data.iter().map(|b| format!("{:02x}", b)).collect::<String>())
}

/// Hex-decode a 0x-prefixed string.
/// Handles Ethereum RPC's minimal hex encoding (e.g. "0x0", "0x1a3")
/// by left-padding to even length. "0x" decodes to an empty vector, which is
/// what `eth_call` returns for an address with no code.
pub fn hex_decode(s: &str) -> Result<Vec<u8>, String> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.is_empty() {
        return Ok(Vec::new());
    }
    let padded;
    let hex_str = if s.len() % 2 != 0 {
        padded = format!("0{}", s);
        &padded
    } else {
        s
    };
    (0..hex_str.len())
        .step_by(2)
        .map(|i| {
            hex_str
                .get(i..i + 2)
                .ok_or_else(|| "Hex decode: non-ASCII input".to_string())
                .and_then(|pair| u8::from_str_radix(pair, 16).map_err(|e| format!("Hex decode: {}", e)))
        })
        .collect()
}

/// EIP-55 mixed-case checksum address
pub fn eip55_checksum(addr_bytes: &[u8]) -> String {
    let hex_addr: String = addr_bytes.iter().map(|b| format!("{:02x}", b)).collect();
    let hash = keccak256(hex_addr.as_bytes());
    let mut checksummed = String::with_capacity(42);
    checksummed.push_str("0x");
    for (i, c) in hex_addr.chars().enumerate() {
        let hash_nibble = if i % 2 == 0 { hash[i / 2] >> 4 } else { hash[i / 2] & 0x0f };
        if hash_nibble >= 8 {
            checksummed.push(c.to_ascii_uppercase());
        } else {
            checksummed.push(c);
        }
    }
    checksummed
}

/// Parse an address string to 20 bytes
pub fn parse_address(addr: &str) -> Result<[u8; 20], String> {
    let addr = addr.trim();
    let digits = addr.strip_prefix("0x").unwrap_or(addr);
    if digits.len() != 40 {
        return Err(format!("Invalid address length: {} hex chars (expected 40). Address: '{}'", digits.len(), addr));
    }
    let bytes = hex_decode(digits)?;
    let mut arr = [0u8; 20];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

/// Parse a 32-byte hash (transaction hash, log topic)
pub fn parse_hash(s: &str) -> Result<[u8; 32], String> {
    let digits = s.trim().strip_prefix("0x").unwrap_or(s.trim());
    if digits.len() != 64 {
        return Err(format!("Invalid hash length: {} hex chars (expected 64)", digits.len()));
    }
    let bytes = hex_decode(digits)?;
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

/// Parse a JSON-RPC quantity ("0x1a") into an amount
pub fn parse_quantity(hex: &str) -> Result<Amount, String> {
    let digits = hex.trim().strip_prefix("0x").unwrap_or(hex.trim());
    if digits.is_empty() {
        return Ok(Amount::zero());
    }
    BigUint::from_str_radix(digits, 16).map_err(|e| format!("Parse quantity '{}': {}", hex, e))
}

/// Parse a JSON-RPC quantity that must fit in a u64 (block numbers, chain ids)
pub fn parse_quantity_u64(hex: &str) -> Result<u64, String> {
    let digits = hex.trim().strip_prefix("0x").unwrap_or(hex.trim());
    u64::from_str_radix(digits, 16).map_err(|e| format!("Parse quantity '{}': {}", hex, e))
}

/// Big-endian 32-byte word for an amount. Fails above 2^256 - 1.
pub fn amount_to_word(amount: &Amount) -> Result<[u8; 32], String> {
    let bytes = amount.to_bytes_be();
    if bytes.len() > 32 {
        return Err(format!("Amount {} does not fit in uint256", amount));
    }
    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(word)
}

/// Amount from big-endian bytes (any length)
pub fn word_to_amount(bytes: &[u8]) -> Amount {
    BigUint::from_bytes_be(bytes)
}

/// 10^exp as an arbitrary-precision integer
pub fn pow10(exp: u32) -> Amount {
    num_traits::pow(Amount::from(10u8), exp as usize)
}

/// Convert a human-readable token amount to base units.
/// e.g., "1.5" with 18 decimals → 1500000000000000000
///
/// This is the only place human amounts enter the engine.
pub fn parse_units(amount: &str, decimals: u8) -> SwapResult<Amount> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(SwapError::InvalidAmount("amount is empty".into()));
    }
    if amount.starts_with('-') {
        return Err(SwapError::InvalidAmount(format!("'{}' is negative", amount)));
    }
    if amount.contains('e') || amount.contains('E') {
        return Err(SwapError::InvalidAmount("Scientific notation not supported, use plain decimal".into()));
    }

    let parts: Vec<&str> = amount.split('.').collect();
    if parts.len() > 2 {
        return Err(SwapError::InvalidAmount(format!("'{}' has more than one decimal point", amount)));
    }
    let integer_part = parts[0];
    let decimal_part = if parts.len() == 2 { parts[1] } else { "" };

    if integer_part.is_empty() && decimal_part.is_empty() {
        return Err(SwapError::InvalidAmount(format!("'{}' has no digits", amount)));
    }
    if !integer_part.chars().chain(decimal_part.chars()).all(|c| c.is_ascii_digit()) {
        return Err(SwapError::InvalidAmount(format!("'{}' is not a decimal number", amount)));
    }
    if decimal_part.len() > decimals as usize {
        return Err(SwapError::InvalidAmount(format!(
            "Too many decimal places (max {} for this token)",
            decimals
        )));
    }

    let padded_decimals = format!("{:0<width$}", decimal_part, width = decimals as usize);
    let raw = format!("{}{}", integer_part, padded_decimals);
    let trimmed = raw.trim_start_matches('0');
    if trimmed.is_empty() {
        return Ok(Amount::zero());
    }
    BigUint::from_str_radix(trimmed, 10).map_err(|e| SwapError::InvalidAmount(e.to_string()))
}

/// Convert base units to an exact human-readable amount (no rounding,
/// trailing zeros trimmed).
pub fn format_units(amount: &Amount, decimals: u8) -> String {
    let decimal_str = amount.to_str_radix(10);
    if decimals == 0 {
        return decimal_str;
    }

    let dec = decimals as usize;
    let padded = if decimal_str.len() <= dec {
        format!("{:0>width$}", decimal_str, width = dec + 1)
    } else {
        decimal_str
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - dec);
    let trimmed_frac = frac_part.trim_end_matches('0');
    if trimmed_frac.is_empty() {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, trimmed_frac)
    }
}

/// Presentation-only rounding: half-up to `max_fraction_digits`.
/// Never feed the result back into quote math.
pub fn display_amount(amount: &Amount, decimals: u8, max_fraction_digits: u8) -> String {
    if max_fraction_digits >= decimals {
        return format_units(amount, decimals);
    }
    let drop = (decimals - max_fraction_digits) as u32;
    let unit = pow10(drop);
    let half = &unit / Amount::from(2u8);
    let rounded = (amount + half) / &unit;
    format_units(&rounded, max_fraction_digits)
}
