//! Fixed command grammar for chat input.
//!
//! Anything that does not match re-presents the menu; parsing never fails.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;

use crate::news::NewsTimeframe;

pub const COMMAND_PREFIX: char = '!';

const MENU_WORDS: [&str; 4] = ["hi", "hello", "start", "menu"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    ShowMenu,
    /// `swap` with no arguments.
    SwapUsage,
    RequestSwap { amount: Decimal, base: String, quote: String, slippage: Option<u8> },
    ShowNews { timeframe: Option<NewsTimeframe> },
    AdjustSlippage { level: u8 },
    Accept,
    Confirm,
    Cancel,
    Back,
}

impl Command {
    /// `Confirm` is an alias of `Accept`.
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept | Self::Confirm)
    }
}

struct Patterns {
    news: Regex,
    slippage: Regex,
    swap_to: Regex,
    pair_slash: Regex,
    pair_to: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        const AMOUNT: &str = r"([0-9]*\.?[0-9]+)";
        const SYMBOL: &str = r"([a-z0-9\-\.]+)";
        const SLIPPAGE_SUFFIX: &str = r"(?:\s+slippage\s+([1-5]))?";
        let compile = |pattern: String| match Regex::new(&pattern) {
            Ok(regex) => regex,
            Err(error) => unreachable!("static command pattern `{pattern}` is invalid: {error}"),
        };
        Patterns {
            news: compile(r"^news\s+(1h|24h|7d|1m)$".to_string()),
            slippage: compile(r"^slippage\s+([1-5])$".to_string()),
            swap_to: compile(format!(r"^swap\s+{AMOUNT}\s+{SYMBOL}\s+to\s+{SYMBOL}{SLIPPAGE_SUFFIX}$")),
            pair_slash: compile(format!(r"^{SYMBOL}/{SYMBOL}\s+{AMOUNT}{SLIPPAGE_SUFFIX}$")),
            pair_to: compile(format!(r"^{SYMBOL}\s+to\s+{SYMBOL}\s+{AMOUNT}{SLIPPAGE_SUFFIX}$")),
        }
    })
}

pub fn parse(text: &str) -> Command {
    let trimmed = text.trim();
    let stripped = trimmed.strip_prefix(COMMAND_PREFIX).unwrap_or(trimmed).trim();
    let normalized = stripped.to_lowercase();
    let t = normalized.as_str();

    if t.is_empty() || MENU_WORDS.contains(&t) {
        return Command::ShowMenu;
    }
    match t {
        "swap" => return Command::SwapUsage,
        "news" => return Command::ShowNews { timeframe: None },
        "accept" => return Command::Accept,
        "confirm" => return Command::Confirm,
        "cancel" => return Command::Cancel,
        "back" => return Command::Back,
        _ => {}
    }

    let patterns = patterns();
    if let Some(caps) = patterns.news.captures(t) {
        return Command::ShowNews { timeframe: caps.get(1).and_then(|m| m.as_str().parse().ok()) };
    }
    if let Some(level) = patterns.slippage.captures(t).and_then(|caps| digit(caps.get(1))) {
        return Command::AdjustSlippage { level };
    }

    if let Some(caps) = patterns.swap_to.captures(t) {
        return swap(caps.get(1), caps.get(2), caps.get(3), caps.get(4));
    }
    if let Some(caps) = patterns.pair_slash.captures(t) {
        return swap(caps.get(3), caps.get(1), caps.get(2), caps.get(4));
    }
    if let Some(caps) = patterns.pair_to.captures(t) {
        return swap(caps.get(3), caps.get(1), caps.get(2), caps.get(4));
    }

    Command::ShowMenu
}

fn digit(capture: Option<regex::Match<'_>>) -> Option<u8> {
    capture.and_then(|m| m.as_str().parse().ok())
}

fn swap(
    amount: Option<regex::Match<'_>>,
    base: Option<regex::Match<'_>>,
    quote: Option<regex::Match<'_>>,
    slippage: Option<regex::Match<'_>>,
) -> Command {
    let parsed = amount.and_then(|m| Decimal::from_str(m.as_str()).ok()).zip(base).zip(quote);
    match parsed {
        Some(((amount, base), quote)) => Command::RequestSwap {
            amount,
            base: base.as_str().to_ascii_uppercase(),
            quote: quote.as_str().to_ascii_uppercase(),
            slippage: digit(slippage),
        },
        None => Command::ShowMenu,
    }
}
