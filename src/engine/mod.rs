// Paw Swap Engine — client-side swap orchestration and pricing
// Wires configuration, the chain provider, the token client and the two
// pricing venues (fixed-rate contract, Uniswap V2 router) together.

pub mod config;
pub mod dex;
pub mod http;

use crate::atoms::error::{SwapError, SwapResult};
use crate::atoms::traits::SharedProvider;
use crate::atoms::types::{Account, Address};
use config::SwapConfig;
use dex::{
    wallet_overview, watch_accounts, AccountSubscription, AmmEngine, FixedRateEngine, JsonRpcProvider, PairOracle,
    RetryingProvider, SwapEngine, SwapSession, TokenClient, TradeSettings, WalletOverview,
};
use log::info;
use std::sync::Arc;
use std::time::Duration;

/// Shared state for one provider connection. Token metadata cached by the
/// token client is shared by every engine and session built from here.
pub struct SwapContext {
    config: SwapConfig,
    provider: SharedProvider,
    tokens: Arc<TokenClient>,
}

impl SwapContext {
    /// Context over an existing provider (tests, custom wallets).
    pub fn new(config: SwapConfig, provider: SharedProvider) -> Self {
        let tokens = Arc::new(TokenClient::new(provider.clone()));
        SwapContext { config, provider, tokens }
    }

    /// JSON-RPC provider from `config`, with read retries.
    pub fn from_config(config: SwapConfig) -> Self {
        let rpc = JsonRpcProvider::new(config.rpc_url.clone())
            .with_timeout(Duration::from_secs(config.provider.request_timeout_secs))
            .with_receipt_poll(Duration::from_millis(config.provider.receipt_poll_ms));
        let provider: SharedProvider = Arc::new(
            RetryingProvider::new(Arc::new(rpc)).with_policy(config.retry.max_retries, config.retry.initial_delay_ms),
        );
        Self::new(config, provider)
    }

    pub fn config(&self) -> &SwapConfig {
        &self.config
    }

    pub fn provider(&self) -> &SharedProvider {
        &self.provider
    }

    pub fn tokens(&self) -> &Arc<TokenClient> {
        &self.tokens
    }

    pub fn trade_settings(&self) -> TradeSettings {
        TradeSettings { slippage_bps: self.config.trade.slippage_bps, deadline_secs: self.config.trade.deadline_secs }
    }

    /// Node chain id, checked against `config.chain_id` when set.
    pub async fn check_chain(&self) -> SwapResult<u64> {
        let chain_id = self.provider.chain_id().await?;
        match self.config.chain_id {
            Some(expected) if expected != chain_id => Err(SwapError::Config(format!(
                "RPC endpoint is on chain {} but config expects {}",
                chain_id, expected
            ))),
            _ => Ok(chain_id),
        }
    }

    /// The wallet's primary account, falling back to the configured wallet.
    pub async fn account(&self) -> SwapResult<Account> {
        let accounts = self.provider.accounts().await?;
        accounts
            .first()
            .copied()
            .or(self.config.wallet)
            .ok_or_else(|| SwapError::Config("wallet exposes no account and no wallet address is configured".into()))
    }

    pub fn fixed_rate_engine(&self) -> FixedRateEngine {
        let fr = &self.config.fixed_rate;
        FixedRateEngine::new(fr.contract, fr.input_token, fr.output_token, self.tokens.clone())
            .with_max_slippage_bps(self.config.trade.max_slippage_bps)
    }

    /// AMM engine for the configured pair. The factory comes from config or,
    /// failing that, from `router.factory()`.
    pub async fn amm_engine(&self) -> SwapResult<AmmEngine> {
        let amm = &self.config.amm;
        let pairs = match amm.factory {
            Some(factory) => PairOracle::new(self.provider.clone(), factory),
            None => PairOracle::from_router(self.provider.clone(), &amm.router).await?,
        };
        Ok(AmmEngine::new(amm.router, amm.token_a, amm.token_b, pairs, self.tokens.clone())
            .with_pricing(amm.pricing)
            .with_max_slippage_bps(self.config.trade.max_slippage_bps))
    }

    /// Session over `engine` bound to the current wallet account.
    pub async fn session(&self, engine: Arc<dyn SwapEngine>) -> SwapResult<SwapSession> {
        let account = self.account().await?;
        info!("[session] {} session for {}", engine.name(), account);
        Ok(SwapSession::new(engine, self.trade_settings()).with_account(account))
    }

    pub fn watch_accounts(&self) -> AccountSubscription {
        watch_accounts(self.provider.clone(), Duration::from_millis(self.config.provider.account_poll_ms))
    }

    /// Every token either venue trades, without duplicates.
    pub fn known_tokens(&self) -> Vec<Address> {
        let c = &self.config;
        let mut list = Vec::new();
        for token in [c.fixed_rate.input_token, c.fixed_rate.output_token, c.amm.token_a, c.amm.token_b] {
            if !list.contains(&token) {
                list.push(token);
            }
        }
        list
    }

    pub async fn overview(&self, account: &Account) -> SwapResult<WalletOverview> {
        wallet_overview(&self.tokens, account, &self.known_tokens()).await
    }
}
