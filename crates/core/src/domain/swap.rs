use alloy_primitives::{aliases::U24, Address, U256};
use serde::{Deserialize, Serialize};

/// Fee tiers quoted for every pair, lowest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeTier {
    Lowest,
    Medium,
    High,
}

impl FeeTier {
    pub const ALL: [FeeTier; 3] = [FeeTier::Lowest, FeeTier::Medium, FeeTier::High];

    /// Pool fee in hundredths of a basis point.
    pub fn pips(self) -> u32 {
        match self {
            Self::Lowest => 500,
            Self::Medium => 3_000,
            Self::High => 10_000,
        }
    }

    pub fn as_u24(self) -> U24 {
        U24::from(self.pips())
    }

    pub fn from_pips(pips: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|tier| tier.pips() == pips)
    }
}

impl std::fmt::Display for FeeTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lowest => write!(f, "0.05%"),
            Self::Medium => write!(f, "0.30%"),
            Self::High => write!(f, "1.00%"),
        }
    }
}

/// Immutable description of what the user asked to swap.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub chain_id: u64,
    pub token_in: Address,
    pub token_out: Address,
    /// Human-readable input amount, kept as the decimal string the user typed.
    pub amount_in: String,
    pub slippage_bps: u32,
}

impl SwapRequest {
    pub fn with_slippage_bps(&self, slippage_bps: u32) -> Self {
        Self { slippage_bps, ..self.clone() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSummary {
    pub token_in_symbol: String,
    pub token_out_symbol: String,
    pub amount_out: String,
    pub execution_price: String,
    pub fee_summary: String,
}

/// What a transaction needs from a quote: the pool and the raw output in base units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawQuote {
    pub fee_tier: FeeTier,
    pub amount_out: U256,
}

impl RawQuote {
    pub fn amount_out_base_units(&self) -> String {
        self.amount_out.to_string()
    }
}

/// A quote is a snapshot. Any change to slippage or amount needs a fresh one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub request: SwapRequest,
    pub summary: QuoteSummary,
    pub raw: RawQuote,
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;

    use super::{FeeTier, RawQuote};

    #[test]
    fn fee_tiers_cover_the_three_pools_in_order() {
        let pips: Vec<u32> = FeeTier::ALL.iter().map(|tier| tier.pips()).collect();
        assert_eq!(pips, vec![500, 3_000, 10_000]);
        assert_eq!(FeeTier::from_pips(3_000), Some(FeeTier::Medium));
        assert_eq!(FeeTier::from_pips(100), None);
        assert_eq!(FeeTier::High.to_string(), "1.00%");
    }

    #[test]
    fn raw_amount_is_rendered_in_base_units() {
        let raw = RawQuote { fee_tier: FeeTier::Lowest, amount_out: U256::from(294_123_456u64) };
        assert_eq!(raw.amount_out_base_units(), "294123456");
    }
}
