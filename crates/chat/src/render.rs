//! Agent replies as chat messages: a plain-text body plus an HTML body.

use std::fmt::Write as _;

use swapdesk_agent::news::NewsItem;
use swapdesk_agent::reply::{ActionLink, AgentReply, MenuActions, QuoteActions};
use swapdesk_core::domain::swap::QuoteSummary;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedMessage {
    pub body: String,
    /// `None` for plain notices.
    pub html: Option<String>,
}

impl RenderedMessage {
    fn plain(body: impl Into<String>) -> Self {
        Self { body: body.into(), html: None }
    }

    fn rich(body: String, html: String) -> Self {
        Self { body, html: Some(html) }
    }
}

pub fn render(reply: &AgentReply) -> RenderedMessage {
    match reply {
        AgentReply::Menu(menu) => render_menu(menu),
        AgentReply::SwapUsage { examples } => render_usage(examples),
        AgentReply::QuoteCard { summary, slippage_percent, actions } => {
            render_quote_card(summary, *slippage_percent, actions)
        }
        AgentReply::News { timeframe, items, back } => render_news(timeframe.as_str(), items, back),
        AgentReply::SigningLink { href } => RenderedMessage::rich(
            format!("Tap SIGN to open your wallet and confirm: {href}"),
            format!(
                "Tap <a href=\"{}\"><b>SIGN</b></a> to open your wallet and confirm.",
                escape_html(href)
            ),
        ),
        AgentReply::Submitting { signer } => {
            RenderedMessage::plain(format!("Submitting on-chain swap from {signer}…"))
        }
        AgentReply::Submitted { tx_hash, explorer_url } => RenderedMessage::rich(
            format!("✅ Swap submitted. Tx: {explorer_url}"),
            format!("✅ Swap submitted. Tx: {}", link(explorer_url, tx_hash)),
        ),
        AgentReply::Pending { tx_hash, explorer_url } => RenderedMessage::rich(
            format!("Swap submitted and still pending. Track it: {explorer_url}"),
            format!("Swap submitted and still pending. Track it: {}", link(explorer_url, tx_hash)),
        ),
        AgentReply::Echo(text) | AgentReply::Notice(text) => RenderedMessage::plain(text.clone()),
    }
}

fn render_menu(menu: &MenuActions) -> RenderedMessage {
    let controls = &menu.controls;
    let html = format!(
        "<p><b>Hey!</b> What do you need today?</p>\
         <p>{} | {}</p>\
         <p>SLIPPAGE % {} | {} | {} | {}</p>",
        bold_link(&menu.swap.href, &menu.swap.label),
        bold_link(&menu.news.href, &menu.news.label),
        links(&controls.slippage),
        bold_link(&controls.accept.href, &controls.accept.label),
        link(&controls.cancel.href, &controls.cancel.label),
        link(&controls.back.href, &controls.back.label),
    );
    let body = format!(
        "Hey! What do you need today?\n{}\n{}\n{}",
        plain_link(&menu.swap),
        plain_link(&menu.news),
        plain_actions(controls),
    );
    RenderedMessage::rich(body, html)
}

fn render_usage(examples: &[ActionLink]) -> RenderedMessage {
    let intro = "Tell me what to swap, e.g. `!swap 0.5 ETH to USDC` or `!eth/usdt 1000`";
    let html = format!(
        "<p>{}</p><p>Try: {}</p>",
        escape_html(intro),
        examples.iter().map(|l| bold_link(&l.href, &l.label)).collect::<Vec<_>>().join(" | ")
    );
    let body = format!(
        "{intro}\nTry: {}",
        examples.iter().map(plain_link).collect::<Vec<_>>().join(" | ")
    );
    RenderedMessage::rich(body, html)
}

fn render_quote_card(summary: &QuoteSummary, slippage_percent: u8, actions: &QuoteActions) -> RenderedMessage {
    let html = format!(
        "<div><p><b>Quote</b></p>\
         <p>{token_in} → {token_out}</p>\
         <p>Rate: {rate}</p>\
         <p>Est. receive: <b>{amount} {token_out}</b></p>\
         <p>Fees/Gas (est): {fee}</p>\
         <p>Slippage: <b>{slippage_percent}%</b></p>\
         <p><b>Actions:</b> {accept} | SLIPPAGE % {slippage} | {cancel} | {back}</p></div>",
        token_in = escape_html(&summary.token_in_symbol),
        token_out = escape_html(&summary.token_out_symbol),
        rate = escape_html(&summary.execution_price),
        amount = escape_html(&summary.amount_out),
        fee = escape_html(&summary.fee_summary),
        accept = bold_link(&actions.accept.href, &actions.accept.label),
        slippage = links(&actions.slippage),
        cancel = link(&actions.cancel.href, &actions.cancel.label),
        back = link(&actions.back.href, &actions.back.label),
    );
    let body = format!(
        "Quote\n{} → {}\nRate: {}\nEst. receive: {} {}\nFees/Gas (est): {}\nSlippage: {}%\n{}",
        summary.token_in_symbol,
        summary.token_out_symbol,
        summary.execution_price,
        summary.amount_out,
        summary.token_out_symbol,
        summary.fee_summary,
        slippage_percent,
        plain_actions(actions),
    );
    RenderedMessage::rich(body, html)
}

fn render_news(timeframe: &str, items: &[NewsItem], back: &ActionLink) -> RenderedMessage {
    let heading = format!("Top headlines (last {timeframe})");
    let mut html = format!("<div><p><b>{heading}</b></p><p>");
    let mut body = heading.clone();
    if items.is_empty() {
        html.push_str("No headlines right now.");
        body.push_str("\nNo headlines right now.");
    }
    for (index, item) in items.iter().enumerate() {
        let when = item
            .published_at
            .map(|at| at.format("%-d %b %Y %H:%M").to_string())
            .unwrap_or_default();
        if index > 0 {
            html.push_str("<br/>");
        }
        let _ = write!(
            html,
            "{}. {} {} <i>({})</i>",
            index + 1,
            item.icon(),
            bold_link(&item.link, &item.title),
            when
        );
        let _ = write!(body, "\n{}. {} {} ({}) {}", index + 1, item.icon(), item.title, when, item.link);
    }
    let _ = write!(html, "</p><p>{}</p></div>", bold_link(&back.href, &back.label));
    let _ = write!(body, "\n{}", plain_link(back));
    RenderedMessage::rich(body, html)
}

fn plain_actions(actions: &QuoteActions) -> String {
    let slippage = actions
        .slippage
        .iter()
        .map(|l| format!("{} {}", l.label, l.href))
        .collect::<Vec<_>>()
        .join("  ");
    format!(
        "{}\nSLIPPAGE % {slippage}\n{}\n{}",
        plain_link(&actions.accept),
        plain_link(&actions.cancel),
        plain_link(&actions.back)
    )
}

fn plain_link(link: &ActionLink) -> String {
    format!("{}: {}", link.label, link.href)
}

fn links(links: &[ActionLink]) -> String {
    links.iter().map(|l| link(&l.href, &l.label)).collect::<Vec<_>>().join(" ")
}

fn link(href: &str, label: &str) -> String {
    format!("<a href=\"{}\">{}</a>", escape_html(href), escape_html(label))
}

fn bold_link(href: &str, label: &str) -> String {
    format!("<a href=\"{}\"><b>{}</b></a>", escape_html(href), escape_html(label))
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use swapdesk_agent::news::{NewsItem, NewsTimeframe};
    use swapdesk_agent::reply::{ActionLink, AgentReply, QuoteActions};
    use swapdesk_core::domain::swap::QuoteSummary;

    use super::{escape_html, render};

    fn action(label: &str, id: &str) -> ActionLink {
        ActionLink { label: label.to_owned(), href: format!("http://localhost:8080/act?id={id}") }
    }

    fn actions() -> QuoteActions {
        QuoteActions {
            accept: action("ACCEPT", "a"),
            slippage: (1..=5).map(|level| action(&level.to_string(), &format!("s{level}"))).collect(),
            cancel: action("CANCEL", "c"),
            back: action("BACK", "b"),
        }
    }

    #[test]
    fn quote_card_shows_rate_receive_fee_slippage_and_actions() {
        let reply = AgentReply::QuoteCard {
            summary: QuoteSummary {
                token_in_symbol: "ETH".to_owned(),
                token_out_symbol: "USDC".to_owned(),
                amount_out: "294.123456".to_owned(),
                execution_price: "2941.23456".to_owned(),
                fee_summary: "gasPrice≈12.35 gwei".to_owned(),
            },
            slippage_percent: 2,
            actions: actions(),
        };

        let message = render(&reply);
        let html = message.html.expect("html");

        assert!(html.contains("<p>ETH → USDC</p>"));
        assert!(html.contains("<p>Rate: 2941.23456</p>"));
        assert!(html.contains("Est. receive: <b>294.123456 USDC</b>"));
        assert!(html.contains("Fees/Gas (est): gasPrice≈12.35 gwei"));
        assert!(html.contains("Slippage: <b>2%</b>"));
        assert!(html.contains("<a href=\"http://localhost:8080/act?id=a\"><b>ACCEPT</b></a>"));
        assert!(html.contains("<a href=\"http://localhost:8080/act?id=s3\">3</a>"));
        assert!(message.body.starts_with("Quote\nETH → USDC\nRate: 2941.23456"));
    }

    #[test]
    fn news_items_are_numbered_escaped_and_dated() {
        let reply = AgentReply::News {
            timeframe: NewsTimeframe::OneDay,
            items: vec![NewsItem {
                title: "Bitcoin <surges>".to_owned(),
                link: "https://news.example/btc".to_owned(),
                published_at: Some(Utc.with_ymd_and_hms(2026, 3, 7, 9, 5, 0).unwrap()),
            }],
            back: action("BACK", "b"),
        };

        let html = render(&reply).html.expect("html");

        assert!(html.contains("Top headlines (last 24h)"));
        assert!(html.contains(
            "1. 🟠 <a href=\"https://news.example/btc\"><b>Bitcoin &lt;surges&gt;</b></a> <i>(7 Mar 2026 09:05)</i>"
        ));
        assert!(html.contains("<b>BACK</b>"));
    }

    #[test]
    fn signing_link_and_notices() {
        let sign = render(&AgentReply::SigningLink { href: "https://app.example/sign/swap?a=1&b=2".to_owned() });
        assert_eq!(
            sign.html.as_deref(),
            Some("Tap <a href=\"https://app.example/sign/swap?a=1&amp;b=2\"><b>SIGN</b></a> to open your wallet and confirm.")
        );

        let notice = render(&AgentReply::Notice("No quote to accept. Try a swap first.".to_owned()));
        assert_eq!(notice.body, "No quote to accept. Try a swap first.");
        assert!(notice.html.is_none());
    }

    #[test]
    fn escapes_all_html_metacharacters() {
        assert_eq!(escape_html(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }
}
