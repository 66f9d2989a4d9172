// Paw Swap Engine — DEX Pending Transactions
// Handle for a submitted transaction: wait for it to be mined and turn a
// failed receipt into a typed revert.

use super::constants::explorer_tx_url;
use crate::atoms::error::{SwapError, SwapResult};
use crate::atoms::traits::SharedProvider;
use crate::atoms::types::{TxHash, TxReceipt};
use log::{info, warn};

pub struct PendingTx {
    provider: SharedProvider,
    hash: TxHash,
    label: &'static str,
}

impl PendingTx {
    pub fn new(provider: SharedProvider, hash: TxHash, label: &'static str) -> Self {
        PendingTx { provider, hash, label }
    }

    pub fn hash(&self) -> TxHash {
        self.hash
    }

    /// Wait for inclusion. A mined-but-failed transaction becomes
    /// `ContractRevert` (or `InsufficientAllowance` when the reason says so).
    pub async fn confirm(self) -> SwapResult<TxReceipt> {
        info!("[tx] {} tx broadcast: {}", self.label, self.hash);
        let receipt = self.provider.wait_for_receipt(&self.hash).await?;
        if receipt.success {
            let link = match self.provider.chain_id().await {
                Ok(chain_id) => format!("{}{}", explorer_tx_url(chain_id), self.hash),
                Err(_) => self.hash.to_string(),
            };
            info!("[tx] {} confirmed in block {:?}: {}", self.label, receipt.block_number, link);
            Ok(receipt)
        } else {
            let reason = receipt.revert_reason.clone().unwrap_or_else(|| "execution reverted".into());
            warn!("[tx] {} reverted ({}): {}", self.label, self.hash, reason);
            Err(SwapError::revert(Some(self.hash), reason))
        }
    }
}
