// Paw Swap Engine — DEX Allowance Coordinator
// Approve exactly what a swap needs, and only when the current allowance
// does not already cover it.

use super::tokens::TokenClient;
use crate::atoms::error::SwapResult;
use crate::atoms::types::{Address, Amount, TxHash};
use log::info;
use std::sync::Arc;

/// What `ensure_allowance` had to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowanceAction {
    AlreadySufficient { current: Amount },
    Approved { tx: TxHash, amount: Amount },
}

impl AllowanceAction {
    pub fn approval_tx(&self) -> Option<TxHash> {
        match self {
            AllowanceAction::AlreadySufficient { .. } => None,
            AllowanceAction::Approved { tx, .. } => Some(*tx),
        }
    }
}

pub struct AllowanceCoordinator {
    tokens: Arc<TokenClient>,
}

impl AllowanceCoordinator {
    pub fn new(tokens: Arc<TokenClient>) -> Self {
        AllowanceCoordinator { tokens }
    }

    /// Read the live allowance; if it is short, approve exactly `required`
    /// and return only after the approval is mined. Calling this again with
    /// the same amount is a no-op.
    pub async fn ensure_allowance(
        &self,
        token: &Address,
        owner: &Address,
        spender: &Address,
        required: &Amount,
    ) -> SwapResult<AllowanceAction> {
        let current = self.tokens.allowance(token, owner, spender).await?;
        if current.covers(required) {
            info!("[allowance] {} already allows {} (need {})", spender, current.amount, required);
            return Ok(AllowanceAction::AlreadySufficient { current: current.amount });
        }

        info!("[allowance] Allowance {} < {}, approving {}", current.amount, required, spender);
        let pending = self.tokens.approve(token, owner, spender, required).await?;
        let receipt = pending.confirm().await?;
        info!("[allowance] Token approval confirmed: {}", receipt.tx_hash);
        Ok(AllowanceAction::Approved { tx: receipt.tx_hash, amount: required.clone() })
    }
}
