// Paw Swap Engine — DEX Read Retries
// Decorator that retries transient read failures with backoff. Mutating
// calls pass straight through: resubmitting a transaction is never safe.

use crate::atoms::constants::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_MS};
use crate::atoms::error::SwapResult;
use crate::atoms::traits::{ChainProvider, SharedProvider};
use crate::atoms::types::{Address, Amount, TxHash, TxReceipt};
use crate::engine::http::retry_delay;
use async_trait::async_trait;
use log::warn;
use std::future::Future;

pub struct RetryingProvider {
    inner: SharedProvider,
    max_retries: u32,
    base_delay_ms: u64,
}

impl RetryingProvider {
    pub fn new(inner: SharedProvider) -> Self {
        RetryingProvider { inner, max_retries: DEFAULT_MAX_RETRIES, base_delay_ms: DEFAULT_RETRY_DELAY_MS }
    }

    pub fn with_policy(mut self, max_retries: u32, base_delay_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.base_delay_ms = base_delay_ms;
        self
    }

    async fn with_retries<T, F, Fut>(&self, what: &str, mut op: F) -> SwapResult<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = SwapResult<T>> + Send,
        T: Send,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = retry_delay(self.base_delay_ms, attempt).await;
                    warn!(
                        "[rpc] {} failed (attempt {}/{}), retried after {:?}: {}",
                        what,
                        attempt + 1,
                        self.max_retries,
                        delay,
                        e
                    );
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[async_trait]
impl ChainProvider for RetryingProvider {
    async fn call(&self, to: &Address, data: &[u8]) -> SwapResult<Vec<u8>> {
        self.with_retries("eth_call", move || self.inner.call(to, data)).await
    }

    async fn native_balance(&self, address: &Address) -> SwapResult<Amount> {
        self.with_retries("eth_getBalance", move || self.inner.native_balance(address)).await
    }

    async fn send_transaction(&self, from: &Address, to: &Address, data: &[u8]) -> SwapResult<TxHash> {
        self.inner.send_transaction(from, to, data).await
    }

    async fn wait_for_receipt(&self, tx: &TxHash) -> SwapResult<TxReceipt> {
        self.with_retries("receipt", move || self.inner.wait_for_receipt(tx)).await
    }

    async fn accounts(&self) -> SwapResult<Vec<Address>> {
        self.with_retries("eth_accounts", move || self.inner.accounts()).await
    }

    async fn chain_id(&self) -> SwapResult<u64> {
        self.with_retries("eth_chainId", move || self.inner.chain_id()).await
    }
}
