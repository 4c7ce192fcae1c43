use crate::domain::market::NewsItem;
use crate::domain::ports::NewsProvider;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

const HEADLINES: &[(&str, &str)] = &[
    (
        "{name} reports strong quarterly profit growth",
        "Results beat analyst expectations on higher margins.",
    ),
    (
        "Analysts upgrade {name} after investor day",
        "Brokers raise price targets citing improved outlook.",
    ),
    (
        "{name} shares drop on regulatory concerns",
        "Investors weigh the risk of new sector rules.",
    ),
    (
        "{name} announces board meeting date",
        "The company will publish its calendar next month.",
    ),
    (
        "{name} extends partnership with European operator",
        "The agreement covers the next three years.",
    ),
    (
        "Weak demand weighs on {name} outlook",
        "Management flags a decline in volumes for the quarter.",
    ),
];

/// Canned headlines, one every 18 hours, cycling through a fixed set.
#[derive(Debug, Clone, Default)]
pub struct MockNewsProvider {
    now: Option<DateTime<Utc>>,
    max_items: Option<usize>,
}

impl MockNewsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the reference time instead of using the current time.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    pub fn items(&self, symbol: &str, days: u32) -> Vec<NewsItem> {
        let now = self.now.unwrap_or_else(Utc::now);
        let cutoff = now - Duration::days(i64::from(days));
        let name = symbol.split('.').next().unwrap_or(symbol);
        let offset = symbol.bytes().map(usize::from).sum::<usize>() % HEADLINES.len();

        let items: Vec<NewsItem> = (0..)
            .map(|i| (i, now - Duration::hours(18 * i as i64 + 1)))
            .take_while(|(_, published_at)| *published_at > cutoff)
            .take(self.max_items.unwrap_or(usize::MAX))
            .map(|(i, published_at)| {
                let (headline, summary) = HEADLINES[(offset + i) % HEADLINES.len()];
                NewsItem {
                    headline: headline.replace("{name}", name),
                    summary: summary.to_string(),
                    source: "MockWire".to_string(),
                    url: None,
                    published_at,
                }
            })
            .collect();

        debug!("Generated {} mock news items for {}", items.len(), symbol);
        items
    }
}

#[async_trait]
impl NewsProvider for MockNewsProvider {
    async fn get_news(&self, symbol: &str, days: u32) -> Result<Vec<NewsItem>> {
        Ok(self.items(symbol, days))
    }
}
