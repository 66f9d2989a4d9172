// Paw Swap Engine — DEX Token Client
// ERC-20 reads and approvals. Symbol and decimals are cached per address;
// balances and allowances are always re-read.

use super::abi::{
    decode_abi_string, decode_u8, decode_uint256, encode_allowance, encode_approve, encode_balance_of, encode_decimals,
    encode_symbol,
};
use super::primitives::amount_to_word;
use super::tx::PendingTx;
use crate::atoms::error::{SwapError, SwapResult};
use crate::atoms::traits::SharedProvider;
use crate::atoms::types::{Address, Allowance, Amount, TokenBalance, TokenDescriptor};
use log::{info, warn};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Clone)]
enum CachedMetadata {
    Verified(TokenDescriptor),
    /// The address answered, but not like a token. Never re-queried.
    Unusable(String),
}

enum MetadataError {
    Transient(SwapError),
    Unusable(String),
}

pub struct TokenClient {
    provider: SharedProvider,
    metadata: RwLock<HashMap<Address, CachedMetadata>>,
}

impl TokenClient {
    pub fn new(provider: SharedProvider) -> Self {
        TokenClient { provider, metadata: RwLock::new(HashMap::new()) }
    }

    pub fn provider(&self) -> &SharedProvider {
        &self.provider
    }

    /// Token metadata. A non-token address fails with `ContractCallError`.
    pub async fn descriptor(&self, token: &Address) -> SwapResult<TokenDescriptor> {
        match self.metadata(token).await {
            Ok(desc) => Ok(desc),
            Err(MetadataError::Transient(e)) => Err(e),
            Err(MetadataError::Unusable(cause)) => Err(SwapError::call(token, cause)),
        }
    }

    /// Token verification before quoting: a path member that does not answer
    /// `symbol()` / `decimals()` is `UnverifiedToken`. Transport failures stay
    /// `ContractCallError` so the caller can retry.
    pub async fn verify(&self, token: &Address) -> SwapResult<TokenDescriptor> {
        match self.metadata(token).await {
            Ok(desc) => Ok(desc),
            Err(MetadataError::Transient(e)) => Err(e),
            Err(MetadataError::Unusable(cause)) => {
                warn!("[swap] Token {} flagged unusable: {}", token, cause);
                Err(SwapError::UnverifiedToken { token: *token, cause })
            }
        }
    }

    async fn metadata(&self, token: &Address) -> Result<TokenDescriptor, MetadataError> {
        let cached = self.metadata.read().get(token).cloned();
        if let Some(cached) = cached {
            return match cached {
                CachedMetadata::Verified(desc) => Ok(desc),
                CachedMetadata::Unusable(cause) => Err(MetadataError::Unusable(cause)),
            };
        }

        let fetched = self.fetch_metadata(token).await;
        match &fetched {
            Ok(desc) => {
                self.metadata.write().insert(*token, CachedMetadata::Verified(desc.clone()));
            }
            Err(MetadataError::Unusable(cause)) => {
                self.metadata.write().insert(*token, CachedMetadata::Unusable(cause.clone()));
            }
            Err(MetadataError::Transient(_)) => {}
        }
        fetched
    }

    async fn fetch_metadata(&self, token: &Address) -> Result<TokenDescriptor, MetadataError> {
        let symbol_raw = self.read_metadata_call(token, &encode_symbol(), "symbol()").await?;
        let symbol = decode_abi_string(&symbol_raw)
            .map_err(|e| MetadataError::Unusable(format!("symbol(): {}", e)))?;

        let decimals_raw = self.read_metadata_call(token, &encode_decimals(), "decimals()").await?;
        let decimals = decode_u8(&decimals_raw, 0).map_err(|e| MetadataError::Unusable(format!("decimals(): {}", e)))?;

        Ok(TokenDescriptor { address: *token, decimals, symbol })
    }

    async fn read_metadata_call(&self, token: &Address, data: &[u8], what: &str) -> Result<Vec<u8>, MetadataError> {
        match self.provider.call(token, data).await {
            Ok(raw) => Ok(raw),
            Err(e) if e.is_retryable() => Err(MetadataError::Transient(e)),
            Err(e) => Err(MetadataError::Unusable(format!("{} {}", what, e))),
        }
    }

    /// Current balance in base units. Never cached; a failed or empty read is
    /// an error, never zero.
    pub async fn balance_of(&self, token: &Address, account: &Address) -> SwapResult<Amount> {
        let raw = self.provider.call(token, &encode_balance_of(account.as_bytes())).await?;
        decode_uint256(&raw, 0).map_err(|e| SwapError::call(token, format!("balanceOf: {}", e)))
    }

    /// `{balance, decimals, symbol}` for one account.
    pub async fn snapshot(&self, token: &Address, account: &Address) -> SwapResult<TokenBalance> {
        let descriptor = self.descriptor(token).await?;
        let balance = self.balance_of(token, account).await?;
        Ok(TokenBalance { token: descriptor, balance })
    }

    pub async fn allowance(&self, token: &Address, owner: &Address, spender: &Address) -> SwapResult<Allowance> {
        let raw = self.provider.call(token, &encode_allowance(owner.as_bytes(), spender.as_bytes())).await?;
        let amount = decode_uint256(&raw, 0).map_err(|e| SwapError::call(token, format!("allowance: {}", e)))?;
        Ok(Allowance { owner: *owner, spender: *spender, amount })
    }

    /// Submit `approve(spender, amount)` from `owner`. The returned handle
    /// must be confirmed before the allowance can be relied on.
    pub async fn approve(
        &self,
        token: &Address,
        owner: &Address,
        spender: &Address,
        amount: &Amount,
    ) -> SwapResult<PendingTx> {
        let word = amount_to_word(amount).map_err(SwapError::InvalidAmount)?;
        info!("[swap] Approving {} base units of {} for {}", amount, token, spender);
        let hash = self.provider.send_transaction(owner, token, &encode_approve(spender.as_bytes(), &word)).await?;
        Ok(PendingTx::new(self.provider.clone(), hash, "approval"))
    }
}
