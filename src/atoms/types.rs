// ── Paw Atoms: Swap Data Model ─────────────────────────────────────────────
// Addresses, base-unit amounts, token descriptors, quotes, requests and
// outcomes. Everything here is plain data; I/O lives in engine::dex.

use super::constants::{BPS_DENOMINATOR, DEFAULT_DEADLINE_SECS, DEFAULT_SLIPPAGE_BPS};
use super::error::{SwapError, SwapResult};
use crate::engine::dex::primitives::{eip55_checksum, hex_encode, parse_address, parse_hash};
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Token amount in base units (the token's smallest indivisible unit).
pub type Amount = BigUint;

// ── Address ────────────────────────────────────────────────────────────────

/// 20-byte EVM address. Displays as an EIP-55 checksummed string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

/// Externally-owned account obtained from the wallet collaborator.
pub type Account = Address;

impl Address {
    /// The zero-address sentinel returned by factories for missing pairs.
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Lowercase 0x-prefixed hex, the form JSON-RPC expects.
    pub fn to_hex(&self) -> String {
        hex_encode(&self.0)
    }
}

impl FromStr for Address {
    type Err = SwapError;

    fn from_str(s: &str) -> SwapResult<Self> {
        parse_address(s).map(Address).map_err(SwapError::InvalidAddress)
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&eip55_checksum(&self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ── Transaction hash ───────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash(pub [u8; 32]);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex_encode(&self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self)
    }
}

impl FromStr for TxHash {
    type Err = SwapError;

    fn from_str(s: &str) -> SwapResult<Self> {
        parse_hash(s).map(TxHash).map_err(|e| SwapError::call("rpc", format!("bad transaction hash: {e}")))
    }
}

// ── Receipts ───────────────────────────────────────────────────────────────

/// One event log emitted by a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<[u8; 32]>,
    pub data: Vec<u8>,
}

/// Receipt of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    /// `true` when execution succeeded (`status == 0x1`).
    pub success: bool,
    pub block_number: Option<u64>,
    /// Revert reason when the provider reports one.
    pub revert_reason: Option<String>,
    pub logs: Vec<LogEntry>,
}

// ── Tokens ─────────────────────────────────────────────────────────────────

/// Static token metadata. `address` is the identity key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenDescriptor {
    pub address: Address,
    pub decimals: u8,
    pub symbol: String,
}

/// Balance of one token for one account, as of the latest observed state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBalance {
    pub token: TokenDescriptor,
    pub balance: Amount,
}

/// Allowance snapshot read from a token contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allowance {
    pub owner: Address,
    pub spender: Address,
    pub amount: Amount,
}

impl Allowance {
    pub fn covers(&self, required: &Amount) -> bool {
        &self.amount >= required
    }
}

// ── AMM pair state ─────────────────────────────────────────────────────────

/// Point-in-time reserves of a two-token pool. `as_of` is the pair's own
/// last-update timestamp and is advisory only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairReserves {
    pub pair: Address,
    pub token_a: Address,
    pub reserve_a: Amount,
    pub token_b: Address,
    pub reserve_b: Amount,
    pub as_of: u32,
}

impl PairReserves {
    /// Reorder so that `token_a` is `first`. Fails if `first` is not a member.
    pub fn oriented(&self, first: &Address) -> SwapResult<PairReserves> {
        if &self.token_a == first {
            Ok(self.clone())
        } else if &self.token_b == first {
            Ok(PairReserves {
                pair: self.pair,
                token_a: self.token_b,
                reserve_a: self.reserve_b.clone(),
                token_b: self.token_a,
                reserve_b: self.reserve_a.clone(),
                as_of: self.as_of,
            })
        } else {
            Err(SwapError::InvalidPath(format!("token {} is not part of pair {}", first, self.pair)))
        }
    }

    /// A pool that exists but was never seeded (or was drained).
    pub fn is_empty(&self) -> bool {
        self.reserve_a.is_zero() || self.reserve_b.is_zero()
    }
}

// ── Quotes, requests, outcomes ─────────────────────────────────────────────

/// Derived pricing for one request. Never persisted; recomputed on every
/// input change. `minimum_output <= expected_output` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapQuote {
    pub input_amount: Amount,
    pub expected_output: Amount,
    pub minimum_output: Amount,
    pub path: Vec<Address>,
}

/// AMM swap direction over the configured pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapDirection {
    AToB,
    BToA,
}

impl SwapDirection {
    pub fn reversed(self) -> Self {
        match self {
            SwapDirection::AToB => SwapDirection::BToA,
            SwapDirection::BToA => SwapDirection::AToB,
        }
    }
}

/// The unit of work submitted to an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    pub account: Account,
    pub path: Vec<TokenDescriptor>,
    pub input_amount: Amount,
    pub slippage_bps: u32,
    /// Unix timestamp (seconds) after which the chain must reject the swap.
    pub deadline: u64,
}

impl SwapRequest {
    /// Request with the default 0.5% tolerance and a deadline 20 minutes out.
    pub fn new(account: Account, path: Vec<TokenDescriptor>, input_amount: Amount) -> Self {
        SwapRequest {
            account,
            path,
            input_amount,
            slippage_bps: DEFAULT_SLIPPAGE_BPS,
            deadline: deadline_from_now(DEFAULT_DEADLINE_SECS),
        }
    }

    pub fn with_slippage_bps(mut self, slippage_bps: u32) -> Self {
        self.slippage_bps = slippage_bps;
        self
    }

    pub fn with_deadline(mut self, deadline: u64) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn input_token(&self) -> &TokenDescriptor {
        &self.path[0]
    }

    pub fn output_token(&self) -> &TokenDescriptor {
        &self.path[self.path.len() - 1]
    }

    pub fn path_addresses(&self) -> Vec<Address> {
        self.path.iter().map(|t| t.address).collect()
    }

    /// Local pre-flight checks. Nothing here touches the network.
    pub fn validate(&self, max_slippage_bps: u32) -> SwapResult<()> {
        if self.input_amount.is_zero() {
            return Err(SwapError::InvalidAmount("amount must be greater than 0".into()));
        }
        if self.path.len() < 2 {
            return Err(SwapError::InvalidPath(format!("path needs at least 2 tokens, got {}", self.path.len())));
        }
        for (i, token) in self.path.iter().enumerate() {
            if self.path[..i].iter().any(|t| t.address == token.address) {
                return Err(SwapError::InvalidPath(format!("token {} appears twice in path", token.address)));
            }
        }
        if self.slippage_bps > max_slippage_bps || self.slippage_bps >= BPS_DENOMINATOR {
            return Err(SwapError::SlippageTooHigh {
                requested_bps: self.slippage_bps,
                max_bps: max_slippage_bps,
            });
        }
        Ok(())
    }
}

/// Tagged result of one swap attempt.
#[derive(Debug)]
pub enum SwapOutcome {
    Success { amount_out: Amount, tx_hash: TxHash },
    Failure { reason: SwapError },
}

impl SwapOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SwapOutcome::Success { .. })
    }

    pub fn amount_out(&self) -> Option<&Amount> {
        match self {
            SwapOutcome::Success { amount_out, .. } => Some(amount_out),
            SwapOutcome::Failure { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<&SwapError> {
        match self {
            SwapOutcome::Success { .. } => None,
            SwapOutcome::Failure { reason } => Some(reason),
        }
    }
}

/// Unix timestamp `secs` seconds from now.
pub fn deadline_from_now(secs: u64) -> u64 {
    let now = chrono::Utc::now().timestamp().max(0) as u64;
    now + secs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(byte: u8, symbol: &str, decimals: u8) -> TokenDescriptor {
        TokenDescriptor { address: Address([byte; 20]), decimals, symbol: symbol.into() }
    }

    #[test]
    fn address_roundtrips_through_checksum_string() {
        let addr: Address = "0xb0ebd04aca1c317ddf75277fad3e2090a41ded4e".parse().unwrap();
        assert_eq!(addr.to_string(), "0xB0eBD04Aca1C317ddf75277Fad3E2090a41deD4e");
        let again: Address = addr.to_string().parse().unwrap();
        assert_eq!(addr, again);
    }

    #[test]
    fn address_rejects_short_input() {
        let err = "0x1234".parse::<Address>().unwrap_err();
        assert!(matches!(err, SwapError::InvalidAddress(_)));
    }

    #[test]
    fn reserves_orient_to_requested_token() {
        let reserves = PairReserves {
            pair: Address([9; 20]),
            token_a: Address([1; 20]),
            reserve_a: Amount::from(10_000u32),
            token_b: Address([2; 20]),
            reserve_b: Amount::from(20_000u32),
            as_of: 7,
        };
        let flipped = reserves.oriented(&Address([2; 20])).unwrap();
        assert_eq!(flipped.token_a, Address([2; 20]));
        assert_eq!(flipped.reserve_a, Amount::from(20_000u32));
        assert_eq!(flipped.reserve_b, Amount::from(10_000u32));
        assert!(reserves.oriented(&Address([3; 20])).is_err());
    }

    #[test]
    fn validate_rejects_zero_amount() {
        let req = SwapRequest::new(Address([7; 20]), vec![token(1, "A", 6), token(2, "B", 18)], Amount::zero());
        assert!(matches!(req.validate(500), Err(SwapError::InvalidAmount(_))));
    }

    #[test]
    fn validate_rejects_duplicate_path() {
        let req = SwapRequest::new(Address([7; 20]), vec![token(1, "A", 6), token(1, "A", 6)], Amount::from(5u8));
        assert!(matches!(req.validate(500), Err(SwapError::InvalidPath(_))));

        let req = SwapRequest::new(Address([7; 20]), vec![token(1, "A", 6)], Amount::from(5u8));
        assert!(matches!(req.validate(500), Err(SwapError::InvalidPath(_))));
    }

    #[test]
    fn validate_enforces_slippage_ceiling() {
        let req = SwapRequest::new(Address([7; 20]), vec![token(1, "A", 6), token(2, "B", 18)], Amount::from(5u8))
            .with_slippage_bps(600);
        assert!(matches!(req.validate(500), Err(SwapError::SlippageTooHigh { requested_bps: 600, max_bps: 500 })));
        assert!(req.with_slippage_bps(50).validate(500).is_ok());
    }

    #[test]
    fn new_request_uses_defaults() {
        let req = SwapRequest::new(Address([7; 20]), vec![token(1, "A", 6), token(2, "B", 18)], Amount::from(5u8));
        assert_eq!(req.slippage_bps, 50);
        let now = chrono::Utc::now().timestamp() as u64;
        assert!(req.deadline > now + 1100 && req.deadline <= now + 1200);
    }
}
