// Paw Swap — token swaps for EVM wallets against a fixed-rate contract or a
// Uniswap V2 router.
//
//   atoms  — constants, errors, the swap data model, the ChainProvider trait
//   engine — configuration, JSON-RPC provider, token/pair clients, engines,
//            swap sessions

pub mod atoms;
pub mod engine;

pub use atoms::error::{ErrorKind, SwapError, SwapResult};
pub use atoms::traits::{ChainProvider, SharedProvider};
pub use atoms::types::{
    Account, Address, Allowance, Amount, PairReserves, SwapDirection, SwapOutcome, SwapQuote, SwapRequest,
    TokenBalance, TokenDescriptor, TxHash, TxReceipt,
};
pub use engine::config::SwapConfig;
pub use engine::SwapContext;
