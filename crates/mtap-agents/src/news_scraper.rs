use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use mtap_bus::{Agent, EventBus};
use mtap_models::warehouse_schema::blob_paths;
use mtap_models::{Event, EventKind, RawArticle, SessionId};
use mtap_store::BlobStore;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::AgentError;
use crate::sources::{FeedEntry, NewsFeedSource};

/// Scrapes every configured news feed at the start of a session.
///
/// Publishes one `news_article_raw` per entry as soon as it is persisted,
/// then exactly one `all_raw_news_gathered_for_session` with the total count.
/// The terminal signal fires regardless of partial failure: a feed that
/// errors is logged and skipped, never silencing the session.
pub struct NewsScraperAgent {
    bus: Arc<EventBus>,
    sources: Vec<Arc<dyn NewsFeedSource>>,
    blobs: Arc<BlobStore>,
}

impl NewsScraperAgent {
    pub fn new(
        bus: Arc<EventBus>,
        sources: Vec<Arc<dyn NewsFeedSource>>,
        blobs: Arc<BlobStore>,
    ) -> Self {
        Self { bus, sources, blobs }
    }

    async fn scrape_all(&self, session_id: SessionId) {
        let mut scraped = 0usize;

        for source in &self.sources {
            let feed = source.name().to_string();
            info!(session = %session_id, feed = %feed, "Scraping feed");

            let entries = match source.fetch_entries().await {
                Ok(entries) => entries,
                Err(e) => {
                    error!(session = %session_id, feed = %feed, error = %e, "Feed scrape failed");
                    continue;
                }
            };
            let found = entries.len();

            for entry in entries {
                match self.publish_article(session_id, &feed, entry).await {
                    Ok(()) => scraped += 1,
                    Err(e) => {
                        warn!(session = %session_id, feed = %feed, error = %e, "Skipping article");
                    }
                }
            }
            info!(session = %session_id, feed = %feed, found, "Finished feed");
        }

        info!(session = %session_id, count = scraped, "All scraping finished");
        self.bus
            .publish(Event::AllRawNewsGathered {
                session_id,
                count: scraped,
            })
            .await;
    }

    async fn publish_article(
        &self,
        session_id: SessionId,
        feed_source: &str,
        entry: FeedEntry,
    ) -> Result<(), AgentError> {
        let article_id = Uuid::new_v4();
        let published_at = entry
            .published_at
            .unwrap_or_else(Utc::now)
            .to_rfc3339();

        // Raw blob first; the event carries the path it landed at.
        let payload = serde_json::json!({
            "article_id": article_id,
            "title": entry.title,
            "url": entry.url,
            "summary": entry.summary,
            "published_at": published_at,
            "feed_source": feed_source,
            "scraped_at": Utc::now().to_rfc3339(),
        });
        let path = self
            .blobs
            .put_json(&blob_paths::raw_news(session_id, article_id), &payload)?;

        let article = RawArticle {
            article_id,
            title: entry.title,
            url: entry.url,
            summary: entry.summary,
            published_at,
            feed_source: feed_source.to_string(),
            raw_path: path.display().to_string(),
        };

        self.bus
            .publish(Event::NewsArticleRaw {
                session_id,
                article,
            })
            .await;
        Ok(())
    }
}

#[async_trait]
impl Agent for NewsScraperAgent {
    fn name(&self) -> &'static str {
        "news_scraper"
    }

    fn subscriptions(&self) -> &'static [EventKind] {
        &[EventKind::StartDailyJob]
    }

    async fn handle(&self, event: Event) -> anyhow::Result<()> {
        if let Event::StartDailyJob { session_id } = event {
            self.scrape_all(session_id).await;
        }
        Ok(())
    }
}
