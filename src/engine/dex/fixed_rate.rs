// Paw Swap Engine — DEX Fixed-Rate Engine
// Swaps against a contract holding an owner-set integer conversion rate.
// The rate is read live for every quote; the contract only swaps one way.

use super::abi::{
    decode_address, decode_swap_executed_log, decode_transfer_log, decode_uint256, encode_conversion_rate,
    encode_fixed_input_token, encode_fixed_output_token, encode_swap_fixed,
};
use super::allowance::AllowanceCoordinator;
use super::primitives::{amount_to_word, pow10};
use super::session::{Submission, SwapEngine};
use super::tokens::TokenClient;
use super::tx::PendingTx;
use crate::atoms::constants::MAX_SLIPPAGE_BPS;
use crate::atoms::error::{SwapError, SwapResult};
use crate::atoms::types::{Address, Amount, SwapDirection, SwapQuote, SwapRequest, TokenDescriptor, TxReceipt};
use async_trait::async_trait;
use log::info;
use num_traits::Zero;
use std::sync::Arc;

/// `amount_in × 10^(out_decimals − in_decimals) / rate`, floored. Negative
/// decimal gaps divide instead of multiply so the result is still a single
/// floor of the exact rational. `None` when `rate` is zero.
pub fn quote_output(amount_in: &Amount, in_decimals: u8, out_decimals: u8, rate: &Amount) -> Option<Amount> {
    if rate.is_zero() {
        return None;
    }
    if out_decimals >= in_decimals {
        let scale = pow10((out_decimals - in_decimals) as u32);
        Some(amount_in * scale / rate)
    } else {
        let scale = pow10((in_decimals - out_decimals) as u32);
        Some(amount_in / (scale * rate))
    }
}

pub struct FixedRateEngine {
    contract: Address,
    input_token: Address,
    output_token: Address,
    tokens: Arc<TokenClient>,
    allowances: AllowanceCoordinator,
    max_slippage_bps: u32,
}

impl FixedRateEngine {
    pub fn new(contract: Address, input_token: Address, output_token: Address, tokens: Arc<TokenClient>) -> Self {
        FixedRateEngine {
            contract,
            input_token,
            output_token,
            allowances: AllowanceCoordinator::new(tokens.clone()),
            tokens,
            max_slippage_bps: MAX_SLIPPAGE_BPS,
        }
    }

    pub fn with_max_slippage_bps(mut self, max_slippage_bps: u32) -> Self {
        self.max_slippage_bps = max_slippage_bps;
        self
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Live `conversionRate()`. Zero is a malformed answer, not a price.
    pub async fn conversion_rate(&self) -> SwapResult<Amount> {
        let raw = self.tokens.provider().call(&self.contract, &encode_conversion_rate()).await?;
        let rate = decode_uint256(&raw, 0)
            .map_err(|e| SwapError::call(self.contract, format!("conversionRate(): {}", e)))?;
        if rate.is_zero() {
            return Err(SwapError::call(self.contract, "conversionRate() returned 0"));
        }
        Ok(rate)
    }

    /// The `(input, output)` token addresses the contract itself reports.
    pub async fn token_addresses(&self) -> SwapResult<(Address, Address)> {
        let provider = self.tokens.provider();
        let input_raw = provider.call(&self.contract, &encode_fixed_input_token()).await?;
        let output_raw = provider.call(&self.contract, &encode_fixed_output_token()).await?;
        let input = decode_address(&input_raw, 0).map_err(|e| SwapError::call(self.contract, e))?;
        let output = decode_address(&output_raw, 0).map_err(|e| SwapError::call(self.contract, e))?;
        Ok((input, output))
    }

    /// Fail with `Config` when the configured tokens disagree with the contract.
    pub async fn check_deployment(&self) -> SwapResult<()> {
        let (input, output) = self.token_addresses().await?;
        if input != self.input_token || output != self.output_token {
            return Err(SwapError::Config(format!(
                "fixed-rate contract {} trades {} → {}, configured {} → {}",
                self.contract, input, output, self.input_token, self.output_token
            )));
        }
        Ok(())
    }

    /// Price `amount_in` of `input` at the live rate.
    pub async fn quote_amount(
        &self,
        amount_in: &Amount,
        input: &TokenDescriptor,
        output: &TokenDescriptor,
    ) -> SwapResult<SwapQuote> {
        if amount_in.is_zero() {
            return Err(SwapError::InvalidAmount("amount must be greater than 0".into()));
        }
        let rate = self.conversion_rate().await?;
        let expected = quote_output(amount_in, input.decimals, output.decimals, &rate)
            .ok_or_else(|| SwapError::call(self.contract, "conversionRate() returned 0"))?;
        info!(
            "[fixed-rate] Quote: {} {} → {} {} at rate {}",
            amount_in, input.symbol, expected, output.symbol, rate
        );
        // The contract takes no minimum-output guard; the quote is exact at
        // the rate read above.
        Ok(SwapQuote {
            input_amount: amount_in.clone(),
            expected_output: expected.clone(),
            minimum_output: expected,
            path: vec![input.address, output.address],
        })
    }
}

#[async_trait]
impl SwapEngine for FixedRateEngine {
    fn name(&self) -> &'static str {
        "fixed-rate"
    }

    fn tokens(&self) -> &Arc<TokenClient> {
        &self.tokens
    }

    fn allowances(&self) -> &AllowanceCoordinator {
        &self.allowances
    }

    fn spender(&self) -> Address {
        self.contract
    }

    fn max_slippage_bps(&self) -> u32 {
        self.max_slippage_bps
    }

    async fn resolve_path(&self, direction: SwapDirection) -> SwapResult<Vec<TokenDescriptor>> {
        if direction != SwapDirection::AToB {
            return Err(SwapError::InvalidPath(format!(
                "fixed-rate contract {} only swaps {} → {}",
                self.contract, self.input_token, self.output_token
            )));
        }
        let input = self.tokens.descriptor(&self.input_token).await?;
        let output = self.tokens.descriptor(&self.output_token).await?;
        Ok(vec![input, output])
    }

    fn check_request(&self, request: &SwapRequest) -> SwapResult<()> {
        let path = request.path_addresses();
        if path != [self.input_token, self.output_token] {
            return Err(SwapError::InvalidPath(format!(
                "fixed-rate contract {} only swaps {} → {}",
                self.contract, self.input_token, self.output_token
            )));
        }
        Ok(())
    }

    async fn quote(&self, request: &SwapRequest) -> SwapResult<SwapQuote> {
        self.quote_amount(&request.input_amount, request.input_token(), request.output_token()).await
    }

    async fn submit(&self, request: &SwapRequest, quoted: &SwapQuote) -> SwapResult<Submission> {
        let word = amount_to_word(&request.input_amount).map_err(SwapError::InvalidAmount)?;
        info!("[fixed-rate] Swap: {} {} via {}", request.input_amount, request.input_token().symbol, self.contract);
        let provider = self.tokens.provider();
        let hash = provider.send_transaction(&request.account, &self.contract, &encode_swap_fixed(&word)).await?;
        Ok(Submission { quote: quoted.clone(), pending: PendingTx::new(provider.clone(), hash, "fixed-rate swap") })
    }

    /// Prefers the contract's own `SwapExecuted` event, then the output
    /// token's transfer to the account.
    fn settled_amount(&self, request: &SwapRequest, receipt: &TxReceipt) -> Option<Amount> {
        let executed = receipt
            .logs
            .iter()
            .filter(|log| log.address == self.contract)
            .filter_map(decode_swap_executed_log)
            .find(|(account, _, _)| *account == request.account)
            .map(|(_, _, amount_out)| amount_out);
        executed.or_else(|| {
            let received: Vec<Amount> = receipt
                .logs
                .iter()
                .filter(|log| log.address == self.output_token)
                .filter_map(decode_transfer_log)
                .filter(|(_, to, _)| *to == request.account)
                .map(|(_, _, value)| value)
                .collect();
            if received.is_empty() {
                None
            } else {
                Some(received.into_iter().sum())
            }
        })
    }
}
