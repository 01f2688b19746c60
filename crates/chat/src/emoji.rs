//! Emoji shortcuts. Keys are compared without variation selectors, so
//! `1⃣` and `1️⃣` both map to slippage 1.

const VARIATION_SELECTOR: char = '\u{FE0F}';

const SHORTCUTS: [(&str, &str); 8] = [
    ("\u{2705}", "!accept"),
    ("\u{1F6AB}", "!cancel"),
    ("\u{1F519}", "!back"),
    ("1\u{20E3}", "!slippage 1"),
    ("2\u{20E3}", "!slippage 2"),
    ("3\u{20E3}", "!slippage 3"),
    ("4\u{20E3}", "!slippage 4"),
    ("5\u{20E3}", "!slippage 5"),
];

pub fn command_for(key: &str) -> Option<&'static str> {
    let stripped: String = key.trim().chars().filter(|ch| *ch != VARIATION_SELECTOR).collect();
    SHORTCUTS.iter().find(|(emoji, _)| *emoji == stripped).map(|(_, command)| *command)
}

/// A message consisting only of a shortcut emoji becomes its command.
pub fn translate_body(body: &str) -> &str {
    command_for(body).unwrap_or(body)
}
