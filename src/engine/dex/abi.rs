// Paw Swap Engine — DEX ABI Encoding
// EVM ABI encoding and decoding for ERC-20, the fixed-rate swap contract and
// the Uniswap V2 factory / pair / router.

use super::primitives::{keccak256, word_to_amount};
use crate::atoms::types::{Address, Amount, LogEntry};

/// Compute 4-byte function selector from signature
pub fn function_selector(sig: &str) -> [u8; 4] {
    let hash = keccak256(sig.as_bytes());
    let mut sel = [0u8; 4];
    sel.copy_from_slice(&hash[..4]);
    sel
}

/// Topic-0 hash of an event signature
pub fn event_topic(sig: &str) -> [u8; 32] {
    keccak256(sig.as_bytes())
}

// ── Signatures ─────────────────────────────────────────────────────────────

pub const SIG_BALANCE_OF: &str = "balanceOf(address)";
pub const SIG_DECIMALS: &str = "decimals()";
pub const SIG_SYMBOL: &str = "symbol()";
pub const SIG_ALLOWANCE: &str = "allowance(address,address)";
pub const SIG_APPROVE: &str = "approve(address,uint256)";
pub const SIG_TRANSFER_EVENT: &str = "Transfer(address,address,uint256)";

pub const SIG_CONVERSION_RATE: &str = "conversionRate()";
pub const SIG_SWAP_FIXED: &str = "swapEURTtoTASK(uint256)";
pub const SIG_FIXED_INPUT_TOKEN: &str = "eurt()";
pub const SIG_FIXED_OUTPUT_TOKEN: &str = "task()";
pub const SIG_SWAP_EXECUTED_EVENT: &str = "SwapExecuted(address,uint256,uint256)";

pub const SIG_GET_PAIR: &str = "getPair(address,address)";
pub const SIG_GET_RESERVES: &str = "getReserves()";
pub const SIG_TOKEN0: &str = "token0()";
pub const SIG_TOKEN1: &str = "token1()";
pub const SIG_ROUTER_FACTORY: &str = "factory()";
pub const SIG_GET_AMOUNTS_OUT: &str = "getAmountsOut(uint256,address[])";
pub const SIG_SWAP_EXACT_TOKENS: &str = "swapExactTokensForTokens(uint256,uint256,address[],address,uint256)";

// ── Word encoding ──────────────────────────────────────────────────────────

/// ABI-encode an address (left-padded to 32 bytes)
pub fn abi_encode_address(addr: &[u8; 20]) -> Vec<u8> {
    let mut encoded = vec![0u8; 12];
    encoded.extend_from_slice(addr);
    encoded
}

/// ABI-encode a uint256 from big-endian bytes
pub fn abi_encode_uint256(val: &[u8; 32]) -> Vec<u8> {
    val.to_vec()
}

/// ABI-encode a u64 as uint256
pub fn abi_encode_u64(val: u64) -> Vec<u8> {
    let mut encoded = vec![0u8; 24];
    encoded.extend_from_slice(&val.to_be_bytes());
    encoded
}

/// ABI-encode the tail of a dynamic `address[]`: length word + one word per item
pub fn abi_encode_address_array(items: &[[u8; 20]]) -> Vec<u8> {
    let mut data = abi_encode_u64(items.len() as u64);
    for item in items {
        data.extend_from_slice(&abi_encode_address(item));
    }
    data
}

fn call_with(sig: &str, words: &[Vec<u8>]) -> Vec<u8> {
    let mut data = function_selector(sig).to_vec();
    for w in words {
        data.extend_from_slice(w);
    }
    data
}

// ── ERC-20 ─────────────────────────────────────────────────────────────────

/// Encode ERC-20 balanceOf(address)
pub fn encode_balance_of(address: &[u8; 20]) -> Vec<u8> {
    call_with(SIG_BALANCE_OF, &[abi_encode_address(address)])
}

/// Encode ERC-20 approve(address, uint256)
pub fn encode_approve(spender: &[u8; 20], amount: &[u8; 32]) -> Vec<u8> {
    call_with(SIG_APPROVE, &[abi_encode_address(spender), abi_encode_uint256(amount)])
}

/// Encode ERC-20 allowance(owner, spender)
pub fn encode_allowance(owner: &[u8; 20], spender: &[u8; 20]) -> Vec<u8> {
    call_with(SIG_ALLOWANCE, &[abi_encode_address(owner), abi_encode_address(spender)])
}

/// ABI-encode ERC-20 symbol() call
pub fn encode_symbol() -> Vec<u8> {
    function_selector(SIG_SYMBOL).to_vec()
}

/// ABI-encode ERC-20 decimals() call
pub fn encode_decimals() -> Vec<u8> {
    function_selector(SIG_DECIMALS).to_vec()
}

// ── Fixed-rate swap contract ───────────────────────────────────────────────

pub fn encode_conversion_rate() -> Vec<u8> {
    function_selector(SIG_CONVERSION_RATE).to_vec()
}

/// swapEURTtoTASK(uint256 amount)
pub fn encode_swap_fixed(amount: &[u8; 32]) -> Vec<u8> {
    call_with(SIG_SWAP_FIXED, &[abi_encode_uint256(amount)])
}

pub fn encode_fixed_input_token() -> Vec<u8> {
    function_selector(SIG_FIXED_INPUT_TOKEN).to_vec()
}

pub fn encode_fixed_output_token() -> Vec<u8> {
    function_selector(SIG_FIXED_OUTPUT_TOKEN).to_vec()
}

// ── Uniswap V2 ─────────────────────────────────────────────────────────────

/// IUniswapV2Factory.getPair(tokenA, tokenB)
pub fn encode_get_pair(token_a: &[u8; 20], token_b: &[u8; 20]) -> Vec<u8> {
    call_with(SIG_GET_PAIR, &[abi_encode_address(token_a), abi_encode_address(token_b)])
}

pub fn encode_get_reserves() -> Vec<u8> {
    function_selector(SIG_GET_RESERVES).to_vec()
}

pub fn encode_token0() -> Vec<u8> {
    function_selector(SIG_TOKEN0).to_vec()
}

pub fn encode_token1() -> Vec<u8> {
    function_selector(SIG_TOKEN1).to_vec()
}

pub fn encode_router_factory() -> Vec<u8> {
    function_selector(SIG_ROUTER_FACTORY).to_vec()
}

/// IUniswapV2Router02.getAmountsOut(uint256 amountIn, address[] path)
pub fn encode_get_amounts_out(amount_in: &[u8; 32], path: &[[u8; 20]]) -> Vec<u8> {
    // head: amountIn, offset to path (2 words)
    let mut data = call_with(SIG_GET_AMOUNTS_OUT, &[abi_encode_uint256(amount_in), abi_encode_u64(64)]);
    data.extend_from_slice(&abi_encode_address_array(path));
    data
}

/// IUniswapV2Router02.swapExactTokensForTokens(amountIn, amountOutMin, path, to, deadline)
pub fn encode_swap_exact_tokens_for_tokens(
    amount_in: &[u8; 32],
    amount_out_min: &[u8; 32],
    path: &[[u8; 20]],
    to: &[u8; 20],
    deadline: u64,
) -> Vec<u8> {
    // head: amountIn, amountOutMin, offset to path (5 words), to, deadline
    let mut data = call_with(
        SIG_SWAP_EXACT_TOKENS,
        &[
            abi_encode_uint256(amount_in),
            abi_encode_uint256(amount_out_min),
            abi_encode_u64(5 * 32),
            abi_encode_address(to),
            abi_encode_u64(deadline),
        ],
    );
    data.extend_from_slice(&abi_encode_address_array(path));
    data
}

// ── Decoding ───────────────────────────────────────────────────────────────

/// The `index`-th 32-byte word of ABI-encoded data
pub fn word_at(data: &[u8], index: usize) -> Result<&[u8], String> {
    index
        .checked_mul(32)
        .and_then(|start| data.get(start..start.checked_add(32)?))
        .ok_or_else(|| format!("ABI data too short: need word {} but have {} bytes", index, data.len()))
}

/// Decode a uint256 at word `index`
pub fn decode_uint256(data: &[u8], index: usize) -> Result<Amount, String> {
    word_at(data, index).map(word_to_amount)
}

/// Decode a word that must fit in a u64 (offsets, lengths, timestamps)
pub fn decode_u64(data: &[u8], index: usize) -> Result<u64, String> {
    let word = word_at(data, index)?;
    if word[..24].iter().any(|&b| b != 0) {
        return Err(format!("ABI word {} overflows u64", index));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[24..]);
    Ok(u64::from_be_bytes(buf))
}

/// Decode a `uint8` return value such as `decimals()`
pub fn decode_u8(data: &[u8], index: usize) -> Result<u8, String> {
    let v = decode_u64(data, index)?;
    u8::try_from(v).map_err(|_| format!("value {} does not fit in uint8", v))
}

/// Decode an address at word `index`. The 12 padding bytes must be zero.
pub fn decode_address(data: &[u8], index: usize) -> Result<Address, String> {
    let word = word_at(data, index)?;
    if word[..12].iter().any(|&b| b != 0) {
        return Err(format!("ABI word {} is not a left-padded address", index));
    }
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&word[12..]);
    Ok(Address(addr))
}

fn dynamic_tail(data: &[u8], head_index: usize) -> Result<(usize, usize), String> {
    let offset = usize::try_from(decode_u64(data, head_index)?).map_err(|_| "dynamic offset overflows".to_string())?;
    if offset % 32 != 0 {
        return Err(format!("unaligned dynamic offset {}", offset));
    }
    let len_index = offset / 32;
    let len = usize::try_from(decode_u64(data, len_index)?).map_err(|_| "dynamic length overflows".to_string())?;
    let end = len_index
        .checked_add(1)
        .and_then(|i| i.checked_add(len))
        .and_then(|words| words.checked_mul(32))
        .ok_or_else(|| format!("dynamic array length {} overflows", len))?;
    if end > data.len() {
        return Err(format!("dynamic array of {} items exceeds {} bytes", len, data.len()));
    }
    Ok((len_index + 1, len))
}

/// Decode a dynamic `uint256[]` whose offset sits at word `head_index`
pub fn decode_uint256_array(data: &[u8], head_index: usize) -> Result<Vec<Amount>, String> {
    let (first, len) = dynamic_tail(data, head_index)?;
    (first..first + len).map(|i| decode_uint256(data, i)).collect()
}

/// Decode a dynamic `address[]` whose offset sits at word `head_index`
pub fn decode_address_array(data: &[u8], head_index: usize) -> Result<Vec<Address>, String> {
    let (first, len) = dynamic_tail(data, head_index)?;
    (first..first + len).map(|i| decode_address(data, i)).collect()
}

/// Decode an ABI-encoded string (dynamic type at offset 0). Falls back to a
/// `bytes32` string for older tokens that return fixed-size symbols.
pub fn decode_abi_string(bytes: &[u8]) -> Result<String, String> {
    if bytes.is_empty() {
        return Err("empty response (no contract code?)".into());
    }
    if bytes.len() < 64 {
        let trimmed: Vec<u8> = bytes.iter().copied().filter(|&b| b != 0).collect();
        return String::from_utf8(trimmed).map_err(|_| "Cannot decode string".to_string());
    }

    let offset = match decode_u64(bytes, 0).ok().and_then(|o| usize::try_from(o).ok()) {
        Some(o) if o.checked_add(32).is_some_and(|end| end <= bytes.len()) => o,
        _ => {
            let trimmed: Vec<u8> = bytes[..32].iter().copied().filter(|&b| b != 0).collect();
            return String::from_utf8(trimmed).map_err(|_| "Cannot decode string".to_string());
        }
    };

    let len_bytes = &bytes[offset..offset + 32];
    if len_bytes[..24].iter().any(|&b| b != 0) {
        return Err("String length overflows".into());
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&len_bytes[24..]);
    let len = usize::try_from(u64::from_be_bytes(buf)).map_err(|_| "String length overflows".to_string())?;

    let data_start = offset + 32;
    match data_start.checked_add(len) {
        Some(end) if end <= bytes.len() => {}
        _ => return Err("String data exceeds response".into()),
    }

    String::from_utf8(bytes[data_start..data_start + len].to_vec()).map_err(|_| "Invalid UTF-8 in string".to_string())
}

/// ABI-encode a string return value (used by simulators and fixtures)
pub fn abi_encode_string(s: &str) -> Vec<u8> {
    let mut data = abi_encode_u64(32);
    data.extend_from_slice(&abi_encode_u64(s.len() as u64));
    data.extend_from_slice(s.as_bytes());
    let pad = (32 - (s.len() % 32)) % 32;
    data.extend(vec![0u8; pad]);
    data
}

// ── Event logs ─────────────────────────────────────────────────────────────

fn topic_address(topic: &[u8; 32]) -> Address {
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&topic[12..]);
    Address(addr)
}

/// Decode an ERC-20 `Transfer(from, to, value)` log.
pub fn decode_transfer_log(log: &LogEntry) -> Option<(Address, Address, Amount)> {
    if log.topics.len() != 3 || log.topics[0] != event_topic(SIG_TRANSFER_EVENT) {
        return None;
    }
    let value = decode_uint256(&log.data, 0).ok()?;
    Some((topic_address(&log.topics[1]), topic_address(&log.topics[2]), value))
}

/// Decode `SwapExecuted(account, amountIn, amountOut)`, with or without the
/// account indexed.
pub fn decode_swap_executed_log(log: &LogEntry) -> Option<(Address, Amount, Amount)> {
    if log.topics.first() != Some(&event_topic(SIG_SWAP_EXECUTED_EVENT)) {
        return None;
    }
    match log.topics.len() {
        2 => Some((
            topic_address(&log.topics[1]),
            decode_uint256(&log.data, 0).ok()?,
            decode_uint256(&log.data, 1).ok()?,
        )),
        1 => Some((
            decode_address(&log.data, 0).ok()?,
            decode_uint256(&log.data, 1).ok()?,
            decode_uint256(&log.data, 2).ok()?,
        )),
        _ => None,
    }
}
