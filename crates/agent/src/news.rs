//! Headline feed seam. Fetching is left to deployments; the default feed is empty.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

pub const MAX_HEADLINES: usize = 10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NewsTimeframe {
    OneHour,
    #[default]
    OneDay,
    SevenDays,
    OneMonth,
}

impl NewsTimeframe {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneHour => "1h",
            Self::OneDay => "24h",
            Self::SevenDays => "7d",
            Self::OneMonth => "1m",
        }
    }

    pub fn window(self) -> Duration {
        match self {
            Self::OneHour => Duration::hours(1),
            Self::OneDay => Duration::hours(24),
            Self::SevenDays => Duration::days(7),
            Self::OneMonth => Duration::days(30),
        }
    }
}

impl FromStr for NewsTimeframe {
    type Err = NewsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "1h" => Ok(Self::OneHour),
            "24h" => Ok(Self::OneDay),
            "7d" => Ok(Self::SevenDays),
            "1m" => Ok(Self::OneMonth),
            other => Err(NewsError::UnknownTimeframe(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    pub published_at: Option<DateTime<Utc>>,
}

impl NewsItem {
    pub fn icon(&self) -> &'static str {
        headline_icon(&self.title)
    }
}

#[derive(Debug, Error)]
pub enum NewsError {
    #[error("unknown news timeframe `{0}`")]
    UnknownTimeframe(String),
    #[error("news feed unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait NewsFeed: Send + Sync {
    /// Candidate headlines in any order; callers narrow them with [`select_headlines`].
    async fn latest(&self, timeframe: NewsTimeframe) -> Result<Vec<NewsItem>, NewsError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNewsFeed;

#[async_trait]
impl NewsFeed for NoopNewsFeed {
    async fn latest(&self, _timeframe: NewsTimeframe) -> Result<Vec<NewsItem>, NewsError> {
        Ok(Vec::new())
    }
}

/// Keeps items inside the timeframe window, newest first, at most [`MAX_HEADLINES`].
pub fn select_headlines(
    mut items: Vec<NewsItem>,
    timeframe: NewsTimeframe,
    now: DateTime<Utc>,
) -> Vec<NewsItem> {
    let cutoff = now - timeframe.window();
    items.retain(|item| item.published_at.is_some_and(|at| at > cutoff));
    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    items.truncate(MAX_HEADLINES);
    items
}

pub fn headline_icon(title: &str) -> &'static str {
    let title = title.to_lowercase();
    if title.contains("bitcoin") || title.contains("btc") {
        "🟠"
    } else if title.contains("ethereum") || title.contains("eth") {
        "🟣"
    } else if title.contains("defi") {
        "🧱"
    } else if title.contains("regulation") || title.contains("sec") {
        "🏛️"
    } else {
        "📰"
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{headline_icon, select_headlines, NewsItem, NewsTimeframe, MAX_HEADLINES};

    fn item(title: &str, hours_ago: i64) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            link: format!("https://news.example/{hours_ago}"),
            published_at: Some(Utc::now() - Duration::hours(hours_ago)),
        }
    }

    #[test]
    fn icons_follow_headline_topics() {
        assert_eq!(headline_icon("Bitcoin tops 100k"), "🟠");
        assert_eq!(headline_icon("Ethereum upgrade ships"), "🟣");
        assert_eq!(headline_icon("New DeFi protocol"), "🧱");
        assert_eq!(headline_icon("SEC files suit"), "🏛️");
        assert_eq!(headline_icon("Markets are calm"), "📰");
    }

    #[test]
    fn selection_applies_window_order_and_limit() {
        let mut items: Vec<NewsItem> = (0..15).map(|hour| item("headline", hour)).collect();
        items.push(item("too old", 30));
        items.push(NewsItem { published_at: None, ..item("undated", 0) });

        let selected = select_headlines(items, NewsTimeframe::OneDay, Utc::now());

        assert_eq!(selected.len(), MAX_HEADLINES);
        assert!(selected.windows(2).all(|pair| pair[0].published_at >= pair[1].published_at));
        assert!(selected.iter().all(|item| item.title == "headline"));
    }

    #[test]
    fn one_month_means_thirty_days() {
        assert_eq!(NewsTimeframe::OneMonth.window(), Duration::days(30));
        assert_eq!("24h".parse::<NewsTimeframe>().ok(), Some(NewsTimeframe::OneDay));
        assert!("2w".parse::<NewsTimeframe>().is_err());
    }
}
