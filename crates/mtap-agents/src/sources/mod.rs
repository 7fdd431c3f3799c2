pub mod market;
pub mod rss;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mtap_models::DailyBar;

use crate::error::AgentError;

pub use market::AlphaVantageProvider;
pub use rss::RssFeedSource;

/// One entry from a news feed, as provided by the source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub url: Option<String>,
    pub summary: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// A source of news feed entries. Mockable for testing.
#[async_trait]
pub trait NewsFeedSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_entries(&self) -> Result<Vec<FeedEntry>, AgentError>;
}

/// A provider of daily OHLCV bars. Mockable for testing.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn name(&self) -> &str;

    /// The most recent daily bar available for `symbol`. Its market date may
    /// trail the session date (weekends, holidays).
    async fn fetch_latest_daily(&self, symbol: &str) -> Result<DailyBar, AgentError>;
}
