// Paw Swap Engine — DEX Pair Oracle
// Uniswap V2 factory lookup and pair reserve reads.

use super::abi::{
    decode_address, decode_u64, decode_uint256, encode_get_pair, encode_get_reserves, encode_router_factory,
    encode_token0, encode_token1,
};
use crate::atoms::error::{SwapError, SwapResult};
use crate::atoms::traits::SharedProvider;
use crate::atoms::types::{Address, PairReserves};
use log::{debug, info};

/// Result of a factory lookup. The zero-address sentinel maps to `NotFound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairLookup {
    Found(Address),
    NotFound,
}

impl PairLookup {
    pub fn address(&self) -> Option<Address> {
        match self {
            PairLookup::Found(pair) => Some(*pair),
            PairLookup::NotFound => None,
        }
    }
}

pub struct PairOracle {
    provider: SharedProvider,
    factory: Address,
}

impl PairOracle {
    pub fn new(provider: SharedProvider, factory: Address) -> Self {
        PairOracle { provider, factory }
    }

    /// Build an oracle for the factory a router was deployed against.
    pub async fn from_router(provider: SharedProvider, router: &Address) -> SwapResult<Self> {
        let raw = provider.call(router, &encode_router_factory()).await?;
        let factory = decode_address(&raw, 0).map_err(|e| SwapError::call(router, format!("factory(): {}", e)))?;
        if factory.is_zero() {
            return Err(SwapError::call(router, "factory() returned the zero address"));
        }
        info!("[amm] Router {} uses factory {}", router, factory);
        Ok(PairOracle::new(provider, factory))
    }

    pub fn factory(&self) -> Address {
        self.factory
    }

    pub async fn find_pair(&self, token_a: &Address, token_b: &Address) -> SwapResult<PairLookup> {
        let raw = self.provider.call(&self.factory, &encode_get_pair(token_a.as_bytes(), token_b.as_bytes())).await?;
        let pair = decode_address(&raw, 0).map_err(|e| SwapError::call(self.factory, format!("getPair: {}", e)))?;
        if pair.is_zero() {
            debug!("[amm] No pair for {} / {}", token_a, token_b);
            Ok(PairLookup::NotFound)
        } else {
            Ok(PairLookup::Found(pair))
        }
    }

    /// Reserves in the pair's own storage order (`token0`, `token1`).
    /// Use [`PairReserves::oriented`] to match a swap path.
    pub async fn get_reserves(&self, pair: &Address) -> SwapResult<PairReserves> {
        let token0 = self.read_address(pair, &encode_token0(), "token0()").await?;
        let token1 = self.read_address(pair, &encode_token1(), "token1()").await?;

        let raw = self.provider.call(pair, &encode_get_reserves()).await?;
        let malformed = |e: String| SwapError::call(pair, format!("getReserves: {}", e));
        let reserve0 = decode_uint256(&raw, 0).map_err(malformed)?;
        let reserve1 = decode_uint256(&raw, 1).map_err(malformed)?;
        let as_of = decode_u64(&raw, 2).map_err(malformed)? as u32;

        debug!("[amm] Pair {} reserves: {} {} / {} {}", pair, reserve0, token0, reserve1, token1);
        Ok(PairReserves { pair: *pair, token_a: token0, reserve_a: reserve0, token_b: token1, reserve_b: reserve1, as_of })
    }

    async fn read_address(&self, contract: &Address, data: &[u8], what: &str) -> SwapResult<Address> {
        let raw = self.provider.call(contract, data).await?;
        decode_address(&raw, 0).map_err(|e| SwapError::call(contract, format!("{}: {}", what, e)))
    }
}
