use alloy_primitives::{address, Address};
use tracing::warn;

/// Decimals assumed for any address missing from the registry.
pub const FALLBACK_DECIMALS: u8 = 18;

pub const NATIVE_ETH: Address = address!("0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");
pub const WETH: Address = address!("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
pub const USDC: Address = address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
pub const USDT: Address = address!("0xdAC17F958D2ee523a2206206994597C13D831ec7");

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token {
    pub symbol: &'static str,
    pub address: Address,
    pub decimals: u8,
    pub name: Option<&'static str>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenPair {
    pub token_in: Token,
    pub token_out: Token,
}

/// Small static set of mainnet tokens the agent can quote.
#[derive(Clone, Debug)]
pub struct TokenRegistry {
    tokens: Vec<Token>,
    aliases: Vec<(&'static str, &'static str)>,
}

impl Default for TokenRegistry {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl TokenRegistry {
    pub fn mainnet() -> Self {
        Self {
            tokens: vec![
                Token { symbol: "ETH", address: NATIVE_ETH, decimals: 18, name: Some("Ether") },
                Token { symbol: "WETH", address: WETH, decimals: 18, name: None },
                Token { symbol: "USDC", address: USDC, decimals: 6, name: None },
                Token { symbol: "USDT", address: USDT, decimals: 6, name: None },
            ],
            aliases: vec![("ETHER", "ETH")],
        }
    }

    pub fn wrapped_native(&self) -> Address {
        WETH
    }

    pub fn by_symbol(&self, symbol: &str) -> Option<Token> {
        let upper = symbol.trim().to_ascii_uppercase();
        let canonical = self
            .aliases
            .iter()
            .find(|(alias, _)| *alias == upper)
            .map(|(_, target)| *target)
            .unwrap_or(upper.as_str());
        self.tokens.iter().copied().find(|token| token.symbol == canonical)
    }

    pub fn by_address(&self, address: Address) -> Option<Token> {
        self.tokens.iter().copied().find(|token| token.address == address)
    }

    /// Resolves user symbols to on-chain tokens. Native ETH is sold as WETH.
    pub fn resolve_pair(&self, base: &str, quote: &str) -> Option<TokenPair> {
        let base = self.by_symbol(base)?;
        let quote = self.by_symbol(quote)?;
        let token_in = if base.address == NATIVE_ETH { self.by_address(WETH)? } else { base };
        Some(TokenPair { token_in, token_out: quote })
    }

    pub fn decimals(&self, address: Address) -> u8 {
        match self.by_address(address) {
            Some(token) => token.decimals,
            None => {
                warn!(
                    event_name = "swap.token.decimals_fallback",
                    token = %address,
                    assumed_decimals = FALLBACK_DECIMALS,
                    "token missing from registry; assuming fallback decimals"
                );
                FALLBACK_DECIMALS
            }
        }
    }

    pub fn display_symbol(&self, address: Address) -> String {
        if address == WETH || address == NATIVE_ETH {
            return "ETH".to_string();
        }
        match self.by_address(address) {
            Some(token) => token.symbol.to_string(),
            None => short_address(address),
        }
    }
}

/// `0x1234…abcd` form used when a token has no registered symbol.
pub fn short_address(address: Address) -> String {
    let full = address.to_checksum(None);
    format!("{}…{}", &full[..6], &full[full.len() - 4..])
}
