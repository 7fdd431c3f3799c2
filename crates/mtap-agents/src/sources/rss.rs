use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rss::Channel;

use super::{FeedEntry, NewsFeedSource};
use crate::error::AgentError;

/// An RSS feed fetched over HTTP.
pub struct RssFeedSource {
    name: String,
    url: String,
    client: reqwest::Client,
}

impl RssFeedSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

/// Feeds disagree on date formats; try RFC 2822 (the RSS standard) first,
/// then RFC 3339.
fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

fn channel_to_entries(channel: &Channel) -> Vec<FeedEntry> {
    channel
        .items()
        .iter()
        .map(|item| FeedEntry {
            title: item.title().map(str::to_string),
            url: item.link().map(str::to_string),
            summary: item.description().map(str::to_string),
            published_at: item.pub_date().and_then(parse_pub_date),
        })
        .collect()
}

#[async_trait]
impl NewsFeedSource for RssFeedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_entries(&self) -> Result<Vec<FeedEntry>, AgentError> {
        let bytes = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let channel = Channel::read_from(&bytes[..])
            .map_err(|e| AgentError::Feed(format!("{}: {e}", self.name)))?;

        Ok(channel_to_entries(&channel))
    }
}
