// ── Paw Atoms: Constants ───────────────────────────────────────────────────
// All protocol-level named constants for the crate live here.
// Contract addresses for the default deployment live in engine/dex/constants.rs.

// ── Slippage ───────────────────────────────────────────────────────────────
/// Basis-point denominator (1 bps = 0.01%).
pub const BPS_DENOMINATOR: u32 = 10_000;
/// Default slippage tolerance (0.5%).
pub const DEFAULT_SLIPPAGE_BPS: u32 = 50;
/// Maximum allowed slippage (5%).
pub const MAX_SLIPPAGE_BPS: u32 = 500;

// ── Deadlines ──────────────────────────────────────────────────────────────
/// Swap deadline offset from submission time: 20 minutes.
pub const DEFAULT_DEADLINE_SECS: u64 = 20 * 60;

// ── Constant-product pricing (Uniswap V2) ──────────────────────────────────
// amountOut = reserveOut * amountIn * 997 / (reserveIn * 1000 + amountIn * 997)
pub const AMM_FEE_NUMERATOR: u32 = 997;
pub const AMM_FEE_DENOMINATOR: u32 = 1000;

// ── Configuration ──────────────────────────────────────────────────────────
/// Directory under the platform config dir holding `config.toml`.
pub const CONFIG_DIR_NAME: &str = "paw-swap";
pub const CONFIG_FILE_NAME: &str = "config.toml";
/// Credential names shared with the DEX trading skill.
pub const ENV_RPC_URL: &str = "DEX_RPC_URL";
pub const ENV_WALLET_ADDRESS: &str = "DEX_WALLET_ADDRESS";

// ── Provider polling ───────────────────────────────────────────────────────
pub const DEFAULT_RECEIPT_POLL_MS: u64 = 2_000;
pub const DEFAULT_ACCOUNT_POLL_MS: u64 = 1_000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// ── Read retries ───────────────────────────────────────────────────────────
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;
