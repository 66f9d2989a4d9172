// ── Paw Atoms: Error Types ─────────────────────────────────────────────────
// Single canonical error enum for the swap engine, built with `thiserror`.
//
// Design rules:
//   • Variants follow the swap failure taxonomy: local input errors,
//     read failures, and on-chain rejections never share a variant.
//   • Every variant carries a human-readable cause so a calling surface can
//     render an actionable message from `Display` alone.
//   • `ErrorKind` is the copyable discriminant for callers that branch on
//     the failure class without matching on payloads.
//   • No variant carries secret material in its message.

use super::types::{Address, Amount, TxHash};
use std::fmt;
use thiserror::Error;

// ── Primary error enum ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SwapError {
    /// Non-positive or unparseable input. Never reaches the network.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// An address string that is not 20 bytes of hex.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Swap path shorter than two tokens or containing duplicates.
    #[error("Invalid swap path: {0}")]
    InvalidPath(String),

    /// Requested slippage tolerance above the configured ceiling.
    #[error("Slippage {requested_bps}bps exceeds maximum allowed {max_bps}bps")]
    SlippageTooHigh { requested_bps: u32, max_bps: u32 },

    /// Local balance pre-check failed.
    #[error("Insufficient {symbol} balance: need {required}, have {available} (base units)")]
    InsufficientBalance { symbol: String, required: Amount, available: Amount },

    /// The chain rejected a transfer because the spender allowance was too low.
    /// Only surfaced when an approval was skipped or raced.
    #[error("Insufficient allowance: {reason}")]
    InsufficientAllowance { tx: Option<TxHash>, reason: String },

    /// No liquidity market exists for the requested tokens.
    #[error("No liquidity pair exists for {token_a} / {token_b}")]
    PairNotFound { token_a: Address, token_b: Address },

    /// A pool exists but its reserves cannot satisfy the trade.
    #[error("Pool {pair} has insufficient liquidity: {reason}")]
    InsufficientLiquidity { pair: Address, reason: String },

    /// A path member did not answer `symbol()` / `decimals()`.
    #[error("Token {token} did not answer standard token queries: {cause}")]
    UnverifiedToken { token: Address, cause: String },

    /// Transient read failure: provider unreachable or malformed response.
    #[error("Contract call to {contract} failed: {cause}")]
    ContractCallError { contract: String, cause: String },

    /// On-chain execution rejected the transaction (includes expired
    /// deadline and exceeded slippage).
    #[error("Transaction reverted{}: {reason}", tx_suffix(.tx))]
    ContractRevert { tx: Option<TxHash>, reason: String },

    /// Engine configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem or OS-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ── Error kinds ────────────────────────────────────────────────────────────

/// Copyable discriminant of [`SwapError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidAmount,
    InvalidAddress,
    InvalidPath,
    SlippageTooHigh,
    InsufficientBalance,
    InsufficientAllowance,
    PairNotFound,
    InsufficientLiquidity,
    UnverifiedToken,
    ContractCallError,
    ContractRevert,
    Config,
    Io,
    Serialization,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidAmount => "invalid_amount",
            ErrorKind::InvalidAddress => "invalid_address",
            ErrorKind::InvalidPath => "invalid_path",
            ErrorKind::SlippageTooHigh => "slippage_too_high",
            ErrorKind::InsufficientBalance => "insufficient_balance",
            ErrorKind::InsufficientAllowance => "insufficient_allowance",
            ErrorKind::PairNotFound => "pair_not_found",
            ErrorKind::InsufficientLiquidity => "insufficient_liquidity",
            ErrorKind::UnverifiedToken => "unverified_token",
            ErrorKind::ContractCallError => "contract_call_error",
            ErrorKind::ContractRevert => "contract_revert",
            ErrorKind::Config => "config",
            ErrorKind::Io => "io",
            ErrorKind::Serialization => "serialization",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Convenience constructors ───────────────────────────────────────────────

impl SwapError {
    /// Create a read-failure error for a contract (or RPC endpoint).
    pub fn call(contract: impl fmt::Display, cause: impl Into<String>) -> Self {
        Self::ContractCallError { contract: contract.to_string(), cause: cause.into() }
    }

    /// Classify an on-chain rejection. Allowance failures get their own
    /// variant; everything else is a plain revert.
    pub fn revert(tx: Option<TxHash>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        if is_allowance_revert(&reason) {
            Self::InsufficientAllowance { tx, reason }
        } else {
            Self::ContractRevert { tx, reason }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SwapError::InvalidAmount(_) => ErrorKind::InvalidAmount,
            SwapError::InvalidAddress(_) => ErrorKind::InvalidAddress,
            SwapError::InvalidPath(_) => ErrorKind::InvalidPath,
            SwapError::SlippageTooHigh { .. } => ErrorKind::SlippageTooHigh,
            SwapError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            SwapError::InsufficientAllowance { .. } => ErrorKind::InsufficientAllowance,
            SwapError::PairNotFound { .. } => ErrorKind::PairNotFound,
            SwapError::InsufficientLiquidity { .. } => ErrorKind::InsufficientLiquidity,
            SwapError::UnverifiedToken { .. } => ErrorKind::UnverifiedToken,
            SwapError::ContractCallError { .. } => ErrorKind::ContractCallError,
            SwapError::ContractRevert { .. } => ErrorKind::ContractRevert,
            SwapError::Config(_) => ErrorKind::Config,
            SwapError::Io(_) => ErrorKind::Io,
            SwapError::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// Only transient reads may be retried as-is. Local pre-checks are caller
    /// errors and reverts require a fresh quote.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SwapError::ContractCallError { .. })
    }

    /// True for failures detected before anything was sent to the provider.
    pub fn is_local(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidAmount
                | ErrorKind::InvalidAddress
                | ErrorKind::InvalidPath
                | ErrorKind::SlippageTooHigh
                | ErrorKind::InsufficientBalance
                | ErrorKind::Config
        )
    }
}

fn tx_suffix(tx: &Option<TxHash>) -> String {
    tx.as_ref().map(|t| format!(" ({})", t)).unwrap_or_default()
}

fn is_allowance_revert(reason: &str) -> bool {
    let lower = reason.to_lowercase();
    lower.contains("insufficientallowance")
        || lower.contains("insufficient allowance")
        || lower.contains("transfer amount exceeds allowance")
}

// ── External conversions ───────────────────────────────────────────────────

impl From<reqwest::Error> for SwapError {
    fn from(e: reqwest::Error) -> Self {
        let endpoint = e.url().map(|u| u.host_str().unwrap_or("rpc").to_string()).unwrap_or_else(|| "rpc".into());
        SwapError::ContractCallError { contract: endpoint, cause: e.to_string() }
    }
}

impl From<toml::de::Error> for SwapError {
    fn from(e: toml::de::Error) -> Self {
        SwapError::Config(format!("TOML parse error: {e}"))
    }
}

// ── Convenience alias ──────────────────────────────────────────────────────

/// All engine operations return this type.
pub type SwapResult<T> = Result<T, SwapError>;

impl From<SwapError> for String {
    fn from(e: SwapError) -> Self {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revert_classifies_allowance_failures() {
        let err = SwapError::revert(None, "execution reverted: ERC20InsufficientAllowance(0x1, 0, 50)");
        assert_eq!(err.kind(), ErrorKind::InsufficientAllowance);

        let err = SwapError::revert(None, "execution reverted: UniswapV2Router: EXPIRED");
        assert_eq!(err.kind(), ErrorKind::ContractRevert);
    }

    #[test]
    fn only_call_errors_are_retryable() {
        assert!(SwapError::call("rpc", "connection refused").is_retryable());
        assert!(!SwapError::revert(None, "EXPIRED").is_retryable());
        assert!(!SwapError::InvalidAmount("0".into()).is_retryable());
    }

    #[test]
    fn local_errors_are_flagged() {
        assert!(SwapError::InvalidAmount("-1".into()).is_local());
        assert!(SwapError::InsufficientBalance {
            symbol: "EURT".into(),
            required: Amount::from(2u8),
            available: Amount::from(1u8),
        }
        .is_local());
        assert!(!SwapError::call("rpc", "timeout").is_local());
    }

    #[test]
    fn revert_display_includes_tx_hash() {
        let tx = TxHash([0xab; 32]);
        let err = SwapError::revert(Some(tx), "EXPIRED");
        let msg = err.to_string();
        assert!(msg.starts_with("Transaction reverted (0xabab"));
        assert!(msg.ends_with(": EXPIRED"));
    }

    #[test]
    fn kind_strings_are_snake_case() {
        assert_eq!(ErrorKind::PairNotFound.to_string(), "pair_not_found");
        assert_eq!(ErrorKind::ContractRevert.as_str(), "contract_revert");
    }
}
