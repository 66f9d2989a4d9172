// ── Paw Atoms: Golden Traits ───────────────────────────────────────────────
// `ChainProvider` is the single seam between the swap engine and the chain.
// The JSON-RPC client, the retrying decorator and the test simulator all
// implement it; engine code only ever sees `Arc<dyn ChainProvider>`.

use super::error::SwapResult;
use super::types::{Address, Amount, TxHash, TxReceipt};
use async_trait::async_trait;
use std::sync::Arc;

/// Wallet / node capability the engine depends on.
///
/// Read failures must be reported as `ContractCallError` (transient) unless
/// the node says the call itself reverted, in which case `ContractRevert`.
/// Signing and nonce assignment belong to the implementation.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// Read-only contract call against the latest block.
    async fn call(&self, to: &Address, data: &[u8]) -> SwapResult<Vec<u8>>;

    /// Native (ETH) balance in wei.
    async fn native_balance(&self, address: &Address) -> SwapResult<Amount>;

    /// Submit a mutating call signed by `from`. Returns once the provider
    /// accepted it, not once it is mined.
    async fn send_transaction(&self, from: &Address, to: &Address, data: &[u8]) -> SwapResult<TxHash>;

    /// Wait until `tx` is mined. No engine-side timeout: the provider decides
    /// how long a pending transaction is worth waiting for.
    async fn wait_for_receipt(&self, tx: &TxHash) -> SwapResult<TxReceipt>;

    /// Accounts the wallet currently exposes, primary account first.
    async fn accounts(&self) -> SwapResult<Vec<Address>>;

    async fn chain_id(&self) -> SwapResult<u64>;
}

pub type SharedProvider = Arc<dyn ChainProvider>;
