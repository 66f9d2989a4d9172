// Paw Swap Engine — DEX Swap Module (fixed-rate + Uniswap V2 / EVM)
//
// Submodules:
//   constants  — default deployment addresses, explorer links
//   primitives — keccak256, hex, address parsing, base-unit conversion
//   abi        — ABI encoding/decoding for ERC-20, fixed-rate, Uniswap V2
//   rpc        — JSON-RPC ChainProvider
//   retry      — read-retry decorator
//   tx         — pending transaction handle
//   tokens     — TokenClient (metadata cache, balances, approvals)
//   pair       — PairOracle (factory lookup, reserves)
//   allowance  — AllowanceCoordinator
//   fixed_rate — FixedRateEngine
//   amm        — AmmEngine + pure constant-product pricing
//   session    — SwapEngine pipeline + SwapSession state
//   accounts   — wallet account-change subscription
//   portfolio  — wallet overview

pub mod abi;
pub mod accounts;
pub mod allowance;
pub mod amm;
pub mod constants;
pub mod fixed_rate;
pub mod pair;
pub mod portfolio;
pub mod primitives;
pub mod retry;
pub mod rpc;
pub mod session;
pub mod tokens;
pub mod tx;

pub use accounts::{watch_accounts, AccountEvent, AccountSubscription};
pub use allowance::{AllowanceAction, AllowanceCoordinator};
pub use amm::{AmmEngine, AmmQuote, PoolState, PricingSource};
pub use fixed_rate::FixedRateEngine;
pub use pair::{PairLookup, PairOracle};
pub use portfolio::{wallet_overview, Holding, WalletOverview};
pub use retry::RetryingProvider;
pub use rpc::JsonRpcProvider;
pub use session::{Settlement, Submission, SwapEngine, SwapPhase, SwapSession, TradeSettings};
pub use tokens::TokenClient;
pub use tx::PendingTx;
