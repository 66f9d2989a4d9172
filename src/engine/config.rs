// Paw Swap Engine — Configuration Loader
//
// Reads `<config dir>/paw-swap/config.toml`. Every section is optional and
// falls back to the Sepolia deployment defaults. `DEX_RPC_URL` and
// `DEX_WALLET_ADDRESS` override the file.

use super::dex::amm::PricingSource;
use super::dex::constants::{
    AMM_TOKEN_A, AMM_TOKEN_B, DEFAULT_CHAIN_ID, FIXED_RATE_CONTRACT, FIXED_RATE_INPUT_TOKEN, FIXED_RATE_OUTPUT_TOKEN,
    UNISWAP_V2_ROUTER,
};
use crate::atoms::constants::{
    BPS_DENOMINATOR, CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_ACCOUNT_POLL_MS, DEFAULT_DEADLINE_SECS,
    DEFAULT_MAX_RETRIES, DEFAULT_RECEIPT_POLL_MS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RETRY_DELAY_MS,
    DEFAULT_SLIPPAGE_BPS, ENV_RPC_URL, ENV_WALLET_ADDRESS, MAX_SLIPPAGE_BPS,
};
use crate::atoms::error::{SwapError, SwapResult};
use crate::atoms::types::Address;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

// ── Config Types ───────────────────────────────────────────────────────────

/// Root of `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapConfig {
    pub rpc_url: String,
    /// Expected chain id. Checked against the node when set.
    pub chain_id: Option<u64>,
    /// Account to trade from when the wallet exposes none.
    pub wallet: Option<Address>,
    pub fixed_rate: FixedRateConfig,
    pub amm: AmmConfig,
    pub trade: TradeConfig,
    pub retry: RetryConfig,
    pub provider: ProviderConfig,
}

/// `[fixed_rate]` — the fixed-rate swap contract and its token pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedRateConfig {
    pub contract: Address,
    pub input_token: Address,
    pub output_token: Address,
}

/// `[amm]` — Uniswap V2 router and the pair it trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmmConfig {
    pub router: Address,
    /// Read from `router.factory()` when absent.
    pub factory: Option<Address>,
    pub token_a: Address,
    pub token_b: Address,
    pub pricing: PricingSource,
}

/// `[trade]` — slippage and deadline defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeConfig {
    pub slippage_bps: u32,
    pub max_slippage_bps: u32,
    pub deadline_secs: u64,
}

/// `[retry]` — transient read retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
}

/// `[provider]` — polling and request timeouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub receipt_poll_ms: u64,
    pub account_poll_ms: u64,
    pub request_timeout_secs: u64,
}

fn default_address(s: &str) -> Address {
    s.parse().unwrap_or(Address::ZERO)
}

impl Default for SwapConfig {
    fn default() -> Self {
        SwapConfig {
            rpc_url: DEFAULT_RPC_URL.into(),
            chain_id: Some(DEFAULT_CHAIN_ID),
            wallet: None,
            fixed_rate: FixedRateConfig::default(),
            amm: AmmConfig::default(),
            trade: TradeConfig::default(),
            retry: RetryConfig::default(),
            provider: ProviderConfig::default(),
        }
    }
}

impl Default for FixedRateConfig {
    fn default() -> Self {
        FixedRateConfig {
            contract: default_address(FIXED_RATE_CONTRACT),
            input_token: default_address(FIXED_RATE_INPUT_TOKEN),
            output_token: default_address(FIXED_RATE_OUTPUT_TOKEN),
        }
    }
}

impl Default for AmmConfig {
    fn default() -> Self {
        AmmConfig {
            router: default_address(UNISWAP_V2_ROUTER),
            factory: None,
            token_a: default_address(AMM_TOKEN_A),
            token_b: default_address(AMM_TOKEN_B),
            pricing: PricingSource::Router,
        }
    }
}

impl Default for TradeConfig {
    fn default() -> Self {
        TradeConfig {
            slippage_bps: DEFAULT_SLIPPAGE_BPS,
            max_slippage_bps: MAX_SLIPPAGE_BPS,
            deadline_secs: DEFAULT_DEADLINE_SECS,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig { max_retries: DEFAULT_MAX_RETRIES, initial_delay_ms: DEFAULT_RETRY_DELAY_MS }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            receipt_poll_ms: DEFAULT_RECEIPT_POLL_MS,
            account_poll_ms: DEFAULT_ACCOUNT_POLL_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

// ── Loading ────────────────────────────────────────────────────────────────

/// Returns the config file path: `<config dir>/paw-swap/config.toml`
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

impl SwapConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> SwapResult<Self> {
        let config: SwapConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Load from `path`, or from the default location when `None`. A missing
    /// default file is not an error; a missing explicit file is.
    pub fn load(path: Option<&Path>) -> SwapResult<Self> {
        let mut config = match path {
            Some(p) => {
                debug!("[config] Loading {}", p.display());
                Self::from_toml_str(&std::fs::read_to_string(p)?)?
            }
            None => match config_path() {
                Some(p) if p.exists() => {
                    debug!("[config] Loading {}", p.display());
                    Self::from_toml_str(&std::fs::read_to_string(&p)?)?
                }
                _ => {
                    info!("[config] No config file, using Sepolia defaults");
                    SwapConfig::default()
                }
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `DEX_RPC_URL` / `DEX_WALLET_ADDRESS` overrides from `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> SwapResult<()> {
        if let Some(url) = lookup(ENV_RPC_URL).filter(|u| !u.trim().is_empty()) {
            self.rpc_url = url.trim().to_string();
        }
        if let Some(wallet) = lookup(ENV_WALLET_ADDRESS).filter(|w| !w.trim().is_empty()) {
            self.wallet = Some(wallet.parse()?);
        }
        Ok(())
    }

    pub fn validate(&self) -> SwapResult<()> {
        if self.rpc_url.trim().is_empty() {
            return Err(SwapError::Config(format!(
                "Missing rpc_url. Set it in config.toml or via {}.",
                ENV_RPC_URL
            )));
        }
        let t = &self.trade;
        if t.max_slippage_bps >= BPS_DENOMINATOR {
            return Err(SwapError::Config(format!(
                "trade.max_slippage_bps must be below {} (got {})",
                BPS_DENOMINATOR, t.max_slippage_bps
            )));
        }
        if t.slippage_bps > t.max_slippage_bps {
            return Err(SwapError::Config(format!(
                "trade.slippage_bps {} exceeds trade.max_slippage_bps {}",
                t.slippage_bps, t.max_slippage_bps
            )));
        }
        if t.deadline_secs == 0 {
            return Err(SwapError::Config("trade.deadline_secs must be positive".into()));
        }
        if self.amm.token_a == self.amm.token_b {
            return Err(SwapError::Config("amm.token_a and amm.token_b must differ".into()));
        }
        if self.fixed_rate.input_token == self.fixed_rate.output_token {
            return Err(SwapError::Config("fixed_rate.input_token and fixed_rate.output_token must differ".into()));
        }
        if self.provider.receipt_poll_ms == 0 || self.provider.account_poll_ms == 0 {
            return Err(SwapError::Config("provider poll intervals must be positive".into()));
        }
        Ok(())
    }
}
