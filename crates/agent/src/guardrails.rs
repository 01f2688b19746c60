use swapdesk_core::domain::session::MAX_SLIPPAGE_PERCENT;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailIntent {
    AcceptQuote,
    AdjustSlippage { level: u8 },
}

impl GuardrailIntent {
    pub fn action_key(&self) -> &'static str {
        match self {
            Self::AcceptQuote => "swap.accept",
            Self::AdjustSlippage { .. } => "swap.adjust_slippage",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    Deny { reason_code: &'static str, user_message: String, fallback_path: &'static str },
    Degrade { reason_code: &'static str, user_message: String, fallback_path: &'static str },
}

pub const CLIENT_SIGNING_PATH: &str = "client_signing";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardrailPolicy {
    pub custodial_execution_enabled: bool,
    pub signing_app_configured: bool,
    pub max_slippage_percent: u8,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self {
            custodial_execution_enabled: false,
            signing_app_configured: false,
            max_slippage_percent: MAX_SLIPPAGE_PERCENT,
        }
    }
}

impl GuardrailPolicy {
    pub fn evaluate(&self, intent: &GuardrailIntent) -> GuardrailDecision {
        match intent {
            GuardrailIntent::AcceptQuote if self.custodial_execution_enabled => {
                GuardrailDecision::Allow
            }
            GuardrailIntent::AcceptQuote if self.signing_app_configured => {
                GuardrailDecision::Degrade {
                    reason_code: "custodial_execution_disabled",
                    user_message: "Sign the swap in your own wallet.".to_string(),
                    fallback_path: CLIENT_SIGNING_PATH,
                }
            }
            GuardrailIntent::AcceptQuote => GuardrailDecision::Deny {
                reason_code: "signing_app_unconfigured",
                user_message: "Signing app URL not configured (APP_BASE_URL).".to_string(),
                fallback_path: "configure_app_base_url",
            },
            GuardrailIntent::AdjustSlippage { level }
                if (1..=self.max_slippage_percent).contains(level) =>
            {
                GuardrailDecision::Allow
            }
            GuardrailIntent::AdjustSlippage { .. } => GuardrailDecision::Deny {
                reason_code: "slippage_out_of_range",
                user_message: format!(
                    "Slippage must be between 1% and {}%.",
                    self.max_slippage_percent
                ),
                fallback_path: "choose_listed_slippage",
            },
        }
    }
}
