// Paw Swap Engine — DEX Portfolio / Balance Queries

use super::constants::chain_name;
use super::primitives::display_amount;
use super::tokens::TokenClient;
use crate::atoms::error::{SwapError, SwapResult};
use crate::atoms::types::{Account, Address, Amount, TokenBalance};
use log::warn;

/// Fraction digits shown for balances.
const DISPLAY_DIGITS: u8 = 6;

/// One row of the overview. A failed read stays an error for that token
/// only; it is never shown as a zero balance.
#[derive(Debug)]
pub struct Holding {
    pub token: Address,
    pub balance: SwapResult<TokenBalance>,
}

#[derive(Debug)]
pub struct WalletOverview {
    pub account: Account,
    pub chain_id: u64,
    pub native_balance: Amount,
    pub holdings: Vec<Holding>,
}

impl WalletOverview {
    /// Plain-text report in the same shape the DEX balance command prints.
    pub fn render(&self) -> String {
        let mut output = format!("Wallet: {}\nNetwork: {}\n\n", self.account, chain_name(self.chain_id));
        output.push_str(&format!("ETH: {}\n", display_amount(&self.native_balance, 18, DISPLAY_DIGITS)));
        for holding in &self.holdings {
            match &holding.balance {
                Ok(b) => output.push_str(&format!(
                    "{}: {}\n",
                    b.token.symbol,
                    display_amount(&b.balance, b.token.decimals, DISPLAY_DIGITS)
                )),
                Err(e) => output.push_str(&format!("{}: Error ({})\n", holding.token, e.kind())),
            }
        }
        output
    }

    pub fn failed(&self) -> impl Iterator<Item = (&Address, &SwapError)> {
        self.holdings.iter().filter_map(|h| h.balance.as_ref().err().map(|e| (&h.token, e)))
    }
}

/// Native balance plus every token in `token_list` for `account`.
pub async fn wallet_overview(tokens: &TokenClient, account: &Account, token_list: &[Address]) -> SwapResult<WalletOverview> {
    let provider = tokens.provider();
    let chain_id = provider.chain_id().await?;
    let native_balance = provider.native_balance(account).await?;

    let mut holdings = Vec::with_capacity(token_list.len());
    for token in token_list {
        let balance = tokens.snapshot(token, account).await;
        if let Err(e) = &balance {
            warn!("[swap] Balance of {} for {} failed: {}", token, account, e);
        }
        holdings.push(Holding { token: *token, balance });
    }

    Ok(WalletOverview { account: *account, chain_id, native_balance, holdings })
}
