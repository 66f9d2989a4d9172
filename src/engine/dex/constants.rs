// Paw Swap Engine — DEX Constants
// Default deployment addresses (Sepolia) and chain presentation helpers.

/// Sepolia chain id, the network the default deployment lives on.
pub const DEFAULT_CHAIN_ID: u64 = 11_155_111;

/// Fixed-rate swap contract and its two tokens.
pub const FIXED_RATE_CONTRACT: &str = "0xcE969bA324d60A602e8EB330B242d3cb2D477c10";
pub const FIXED_RATE_INPUT_TOKEN: &str = "0xB0eBD04Aca1C317ddf75277Fad3E2090a41deD4e";
pub const FIXED_RATE_OUTPUT_TOKEN: &str = "0x1Ab193C1Be11C64654896390f0ed550c59E041e4";

/// Uniswap V2 router on Sepolia. The factory is read from `router.factory()`
/// unless configured explicitly.
pub const UNISWAP_V2_ROUTER: &str = "0x320565d880a1979Af45589D0fe48BbE6673D51D3";

/// Default AMM pair members (TATA / EURT pool).
pub const AMM_TOKEN_A: &str = "0xF9B68BF808d59d53f42defd09Ef355fE29EeCcA2";
pub const AMM_TOKEN_B: &str = "0x2963EB3234cdE23de571d65Cfa32b491AEbafcEb";

/// Returns the block explorer base TX URL for a given EVM chain ID.
/// Used to build transaction links in log output.
pub fn explorer_tx_url(chain_id: u64) -> &'static str {
    match chain_id {
        1 => "https://etherscan.io/tx/",
        11155111 => "https://sepolia.etherscan.io/tx/",
        137 => "https://polygonscan.com/tx/",
        42161 => "https://arbiscan.io/tx/",
        10 => "https://optimistic.etherscan.io/tx/",
        8453 => "https://basescan.org/tx/",
        _ => "https://etherscan.io/tx/",
    }
}

/// Returns a human-readable network name for a given EVM chain ID.
pub fn chain_name(chain_id: u64) -> &'static str {
    match chain_id {
        1 => "Ethereum Mainnet",
        11155111 => "Sepolia Testnet",
        137 => "Polygon",
        42161 => "Arbitrum One",
        10 => "Optimism",
        8453 => "Base",
        31337 => "Local Devnet",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::Address;

    #[test]
    fn default_addresses_parse() {
        for addr in [
            FIXED_RATE_CONTRACT,
            FIXED_RATE_INPUT_TOKEN,
            FIXED_RATE_OUTPUT_TOKEN,
            UNISWAP_V2_ROUTER,
            AMM_TOKEN_A,
            AMM_TOKEN_B,
        ] {
            assert!(addr.parse::<Address>().is_ok(), "{addr}");
        }
    }

    #[test]
    fn sepolia_links() {
        assert_eq!(chain_name(DEFAULT_CHAIN_ID), "Sepolia Testnet");
        assert!(explorer_tx_url(DEFAULT_CHAIN_ID).contains("sepolia"));
        assert_eq!(chain_name(424242), "Unknown");
    }
}
