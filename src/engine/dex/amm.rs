// Paw Swap Engine — DEX AMM Engine (Uniswap V2)
//
// Quote flow for a two-token path:
//   1. verify both tokens answer symbol()/decimals()
//   2. factory.getPair — zero address short-circuits to "no pool"
//   3. pair reserves, oriented to the path
//   4. price via router.getAmountsOut (or the local 997/1000 formula)
//   5. minimum output = expected × (10000 − bps) / 10000, floored

use super::abi::{
    decode_transfer_log, decode_uint256_array, encode_get_amounts_out, encode_swap_exact_tokens_for_tokens,
};
use super::allowance::AllowanceCoordinator;
use super::pair::{PairLookup, PairOracle};
use super::primitives::amount_to_word;
use super::session::{Submission, SwapEngine};
use super::tokens::TokenClient;
use super::tx::PendingTx;
use crate::atoms::constants::{AMM_FEE_DENOMINATOR, AMM_FEE_NUMERATOR, BPS_DENOMINATOR, MAX_SLIPPAGE_BPS};
use crate::atoms::error::{ErrorKind, SwapError, SwapResult};
use crate::atoms::types::{
    Address, Amount, PairReserves, SwapDirection, SwapQuote, SwapRequest, TokenDescriptor, TxReceipt,
};
use async_trait::async_trait;
use log::{info, warn};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ── Pure pricing ───────────────────────────────────────────────────────────

/// Constant-product output with the 0.3% fee:
/// `reserve_out × amount_in × 997 / (reserve_in × 1000 + amount_in × 997)`.
/// `None` for an empty pool or zero input.
pub fn get_amount_out(amount_in: &Amount, reserve_in: &Amount, reserve_out: &Amount) -> Option<Amount> {
    if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
        return None;
    }
    let amount_in_with_fee = amount_in * AMM_FEE_NUMERATOR;
    let numerator = reserve_out * &amount_in_with_fee;
    let denominator = reserve_in * AMM_FEE_DENOMINATOR + amount_in_with_fee;
    Some(numerator / denominator)
}

/// Input required to receive exactly `amount_out`, rounded up.
/// `None` when the pool cannot pay `amount_out` at any price.
pub fn get_amount_in(amount_out: &Amount, reserve_in: &Amount, reserve_out: &Amount) -> Option<Amount> {
    if amount_out.is_zero() || reserve_in.is_zero() || amount_out >= reserve_out {
        return None;
    }
    let numerator = reserve_in * amount_out * AMM_FEE_DENOMINATOR;
    let denominator = (reserve_out - amount_out) * AMM_FEE_NUMERATOR;
    Some(numerator / denominator + 1u32)
}

/// `expected × (10000 − slippage_bps) / 10000`, floored.
pub fn minimum_output(expected: &Amount, slippage_bps: u32) -> Amount {
    let keep = BPS_DENOMINATOR.saturating_sub(slippage_bps);
    expected * keep / BPS_DENOMINATOR
}

// ── Quotes ─────────────────────────────────────────────────────────────────

/// Where expected output comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingSource {
    /// The router's own `getAmountsOut`, bit-exact with execution.
    #[default]
    Router,
    /// The local 997/1000 formula over freshly read reserves.
    Local,
}

/// A quote attempt. Only `Available` carries a price; the other two are
/// legitimate market states, not failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmmQuote {
    Available { quote: SwapQuote, reserves: PairReserves },
    PairNotFound { token_a: Address, token_b: Address },
    NoLiquidity { reserves: PairReserves },
}

impl AmmQuote {
    pub fn quote(&self) -> Option<&SwapQuote> {
        match self {
            AmmQuote::Available { quote, .. } => Some(quote),
            _ => None,
        }
    }

    /// Turn a non-priceable state into the matching error.
    pub fn into_quote(self) -> SwapResult<SwapQuote> {
        match self {
            AmmQuote::Available { quote, reserves } => {
                if quote.expected_output.is_zero() {
                    Err(SwapError::InsufficientLiquidity {
                        pair: reserves.pair,
                        reason: format!("{} base units in buys nothing", quote.input_amount),
                    })
                } else {
                    Ok(quote)
                }
            }
            AmmQuote::PairNotFound { token_a, token_b } => Err(SwapError::PairNotFound { token_a, token_b }),
            AmmQuote::NoLiquidity { reserves } => Err(SwapError::InsufficientLiquidity {
                pair: reserves.pair,
                reason: "pool has no reserves".into(),
            }),
        }
    }
}

// ── Engine ─────────────────────────────────────────────────────────────────

pub struct AmmEngine {
    router: Address,
    token_a: Address,
    token_b: Address,
    pairs: PairOracle,
    tokens: Arc<TokenClient>,
    allowances: AllowanceCoordinator,
    pricing: PricingSource,
    max_slippage_bps: u32,
}

impl AmmEngine {
    pub fn new(router: Address, token_a: Address, token_b: Address, pairs: PairOracle, tokens: Arc<TokenClient>) -> Self {
        AmmEngine {
            router,
            token_a,
            token_b,
            pairs,
            allowances: AllowanceCoordinator::new(tokens.clone()),
            tokens,
            pricing: PricingSource::Router,
            max_slippage_bps: MAX_SLIPPAGE_BPS,
        }
    }

    pub fn with_pricing(mut self, pricing: PricingSource) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_max_slippage_bps(mut self, max_slippage_bps: u32) -> Self {
        self.max_slippage_bps = max_slippage_bps;
        self
    }

    pub fn router(&self) -> Address {
        self.router
    }

    pub fn pairs(&self) -> &PairOracle {
        &self.pairs
    }

    /// Fixed two-token path for `direction` over the configured pair.
    pub fn path(&self, direction: SwapDirection) -> Vec<Address> {
        match direction {
            SwapDirection::AToB => vec![self.token_a, self.token_b],
            SwapDirection::BToA => vec![self.token_b, self.token_a],
        }
    }

    /// Current state of the configured pair, reserves oriented A/B.
    pub async fn pool(&self) -> SwapResult<PoolState> {
        match self.pairs.find_pair(&self.token_a, &self.token_b).await? {
            PairLookup::NotFound => Ok(PoolState::Missing),
            PairLookup::Found(pair) => {
                let reserves = self.pairs.get_reserves(&pair).await?.oriented(&self.token_a)?;
                if reserves.is_empty() {
                    Ok(PoolState::Empty(reserves))
                } else {
                    Ok(PoolState::Funded(reserves))
                }
            }
        }
    }

    /// Quote `amount_in` along `path` at `slippage_bps`.
    pub async fn quote_path(&self, amount_in: &Amount, path: &[Address], slippage_bps: u32) -> SwapResult<AmmQuote> {
        if amount_in.is_zero() {
            return Err(SwapError::InvalidAmount("amount must be greater than 0".into()));
        }
        let (input, output) = match path {
            [input, output] => (*input, *output),
            _ => return Err(SwapError::InvalidPath(format!("expected a two-token path, got {}", path.len()))),
        };

        for token in path {
            self.tokens.verify(token).await?;
        }

        let pair = match self.pairs.find_pair(&input, &output).await? {
            PairLookup::Found(pair) => pair,
            PairLookup::NotFound => {
                info!("[amm] No pool for {} / {}", input, output);
                return Ok(AmmQuote::PairNotFound { token_a: input, token_b: output });
            }
        };

        let reserves = self.pairs.get_reserves(&pair).await?.oriented(&input)?;
        if reserves.is_empty() {
            info!("[amm] Pool {} exists but has no liquidity", pair);
            return Ok(AmmQuote::NoLiquidity { reserves });
        }

        let expected = match self.pricing {
            PricingSource::Router => self.router_amount_out(amount_in, path, &pair).await?,
            PricingSource::Local => get_amount_out(amount_in, &reserves.reserve_a, &reserves.reserve_b)
                .ok_or_else(|| SwapError::InsufficientLiquidity { pair, reason: "pool has no reserves".into() })?,
        };
        let minimum = minimum_output(&expected, slippage_bps);
        info!(
            "[amm] Quote: {} → {} (min {} at {}bps) via pool {}",
            amount_in, expected, minimum, slippage_bps, pair
        );

        Ok(AmmQuote::Available {
            quote: SwapQuote {
                input_amount: amount_in.clone(),
                expected_output: expected,
                minimum_output: minimum,
                path: path.to_vec(),
            },
            reserves,
        })
    }

    async fn router_amount_out(&self, amount_in: &Amount, path: &[Address], pair: &Address) -> SwapResult<Amount> {
        let word = amount_to_word(amount_in).map_err(SwapError::InvalidAmount)?;
        let path_bytes: Vec<[u8; 20]> = path.iter().map(|a| a.0).collect();
        let raw = match self.tokens.provider().call(&self.router, &encode_get_amounts_out(&word, &path_bytes)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::ContractRevert && e.to_string().contains("INSUFFICIENT_LIQUIDITY") => {
                return Err(SwapError::InsufficientLiquidity { pair: *pair, reason: e.to_string() });
            }
            Err(e) => return Err(e),
        };
        let amounts =
            decode_uint256_array(&raw, 0).map_err(|e| SwapError::call(self.router, format!("getAmountsOut: {}", e)))?;
        if amounts.len() != path.len() {
            return Err(SwapError::call(
                self.router,
                format!("getAmountsOut returned {} amounts for a {}-token path", amounts.len(), path.len()),
            ));
        }
        amounts
            .last()
            .cloned()
            .ok_or_else(|| SwapError::call(self.router, "getAmountsOut returned no amounts"))
    }
}

/// Pool inspection result: no pool, a pool never seeded, or a live pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolState {
    Missing,
    Empty(PairReserves),
    Funded(PairReserves),
}

#[async_trait]
impl SwapEngine for AmmEngine {
    fn name(&self) -> &'static str {
        "amm"
    }

    fn tokens(&self) -> &Arc<TokenClient> {
        &self.tokens
    }

    fn allowances(&self) -> &AllowanceCoordinator {
        &self.allowances
    }

    fn spender(&self) -> Address {
        self.router
    }

    fn max_slippage_bps(&self) -> u32 {
        self.max_slippage_bps
    }

    async fn resolve_path(&self, direction: SwapDirection) -> SwapResult<Vec<TokenDescriptor>> {
        let mut path = Vec::with_capacity(2);
        for token in self.path(direction) {
            path.push(self.tokens.verify(&token).await?);
        }
        Ok(path)
    }

    fn check_request(&self, request: &SwapRequest) -> SwapResult<()> {
        let path = request.path_addresses();
        if path != self.path(SwapDirection::AToB) && path != self.path(SwapDirection::BToA) {
            return Err(SwapError::InvalidPath(format!(
                "path must be {} ↔ {} (multi-hop routing is not supported)",
                self.token_a, self.token_b
            )));
        }
        Ok(())
    }

    async fn quote(&self, request: &SwapRequest) -> SwapResult<SwapQuote> {
        self.quote_path(&request.input_amount, &request.path_addresses(), request.slippage_bps)
            .await?
            .into_quote()
    }

    /// Re-quotes immediately before submission; `minimum_output` and the
    /// request deadline are enforced by the router, not here.
    async fn submit(&self, request: &SwapRequest, quoted: &SwapQuote) -> SwapResult<Submission> {
        let quote = self.quote(request).await?;
        if quote.expected_output != quoted.expected_output {
            warn!("[amm] Price moved since quote: {} → {}", quoted.expected_output, quote.expected_output);
        }

        let amount_in = amount_to_word(&quote.input_amount).map_err(SwapError::InvalidAmount)?;
        let min_out = amount_to_word(&quote.minimum_output).map_err(SwapError::InvalidAmount)?;
        let path_bytes: Vec<[u8; 20]> = quote.path.iter().map(|a| a.0).collect();
        let data = encode_swap_exact_tokens_for_tokens(
            &amount_in,
            &min_out,
            &path_bytes,
            request.account.as_bytes(),
            request.deadline,
        );

        info!(
            "[amm] Swap: {} {} → min {} {} (deadline {})",
            quote.input_amount,
            request.input_token().symbol,
            quote.minimum_output,
            request.output_token().symbol,
            request.deadline
        );
        let provider = self.tokens.provider();
        let hash = provider.send_transaction(&request.account, &self.router, &data).await?;
        Ok(Submission { quote, pending: PendingTx::new(provider.clone(), hash, "router swap") })
    }

    /// Sum of output-token transfers to the account in the receipt.
    fn settled_amount(&self, request: &SwapRequest, receipt: &TxReceipt) -> Option<Amount> {
        let output = request.output_token().address;
        let received: Vec<Amount> = receipt
            .logs
            .iter()
            .filter(|log| log.address == output)
            .filter_map(decode_transfer_log)
            .filter(|(_, to, _)| *to == request.account)
            .map(|(_, _, value)| value)
            .collect();
        if received.is_empty() {
            None
        } else {
            Some(received.into_iter().sum())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_out_matches_canonical_formula() {
        // reserves 10_000 / 20_000, 100 in:
        // 20000 × 99700 / (10_000_000 + 99_700) = 1_994_000_000 / 10_099_700 = 197
        let out = get_amount_out(&Amount::from(100u32), &Amount::from(10_000u32), &Amount::from(20_000u32)).unwrap();
        assert_eq!(out, Amount::from(197u32));
    }

    #[test]
    fn amount_out_rejects_empty_pool() {
        assert!(get_amount_out(&Amount::from(100u32), &Amount::zero(), &Amount::from(20_000u32)).is_none());
        assert!(get_amount_out(&Amount::zero(), &Amount::from(1u32), &Amount::from(1u32)).is_none());
    }

    #[test]
    fn amount_in_inverts_amount_out() {
        let reserve_in = Amount::from(1_000_000u32);
        let reserve_out = Amount::from(2_000_000u32);
        let needed = get_amount_in(&Amount::from(1_000u32), &reserve_in, &reserve_out).unwrap();
        let got = get_amount_out(&needed, &reserve_in, &reserve_out).unwrap();
        assert!(got >= Amount::from(1_000u32));
        let short = get_amount_out(&(needed - 1u32), &reserve_in, &reserve_out).unwrap();
        assert!(short < Amount::from(1_000u32));

        assert!(get_amount_in(&reserve_out, &reserve_in, &reserve_out).is_none());
    }

    #[test]
    fn minimum_output_floors_at_default_tolerance() {
        assert_eq!(minimum_output(&Amount::from(197u32), 50), Amount::from(196u32));
        assert_eq!(minimum_output(&Amount::from(10_000u32), 50), Amount::from(9_950u32));
        assert_eq!(minimum_output(&Amount::from(1u32), 50), Amount::zero());
        assert_eq!(minimum_output(&Amount::from(1u32), 0), Amount::from(1u32));
    }

    #[test]
    fn minimum_output_never_exceeds_expected() {
        for expected in [0u64, 1, 199, 10_000, 123_456_789] {
            for bps in [0u32, 1, 50, 500, 9_999] {
                let e = Amount::from(expected);
                let min = minimum_output(&e, bps);
                assert!(min <= e);
                // difference is the ceiling of expected × bps / 10000
                let diff = &e - &min;
                let scaled = &e * bps;
                let ceil = (&scaled + (BPS_DENOMINATOR - 1)) / BPS_DENOMINATOR;
                assert_eq!(diff, ceil, "expected {expected} bps {bps}");
            }
        }
    }

    #[test]
    fn non_priceable_states_map_to_errors() {
        let a = Address([1; 20]);
        let b = Address([2; 20]);
        let err = AmmQuote::PairNotFound { token_a: a, token_b: b }.into_quote().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PairNotFound);

        let reserves = PairReserves {
            pair: Address([3; 20]),
            token_a: a,
            reserve_a: Amount::zero(),
            token_b: b,
            reserve_b: Amount::zero(),
            as_of: 0,
        };
        let err = AmmQuote::NoLiquidity { reserves }.into_quote().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientLiquidity);
    }
}
