//! Mock sources and a capture subscriber for exercising the pipeline without
//! any network or real feeds.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use mtap_bus::EventBus;
use mtap_models::{DailyBar, Event, EventKind};
use rust_decimal::Decimal;

use crate::error::AgentError;
use crate::sources::{FeedEntry, MarketDataProvider, NewsFeedSource};

/// Feed source returning canned entries, or failing on demand.
pub struct MockFeedSource {
    name: String,
    entries: Vec<FeedEntry>,
    fail: bool,
}

impl MockFeedSource {
    pub fn new(name: &str, entries: Vec<FeedEntry>) -> Self {
        Self {
            name: name.to_string(),
            entries,
            fail: false,
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl NewsFeedSource for MockFeedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_entries(&self) -> Result<Vec<FeedEntry>, AgentError> {
        if self.fail {
            return Err(AgentError::Feed(format!("{}: mock failure", self.name)));
        }
        Ok(self.entries.clone())
    }
}

/// Provider returning canned bars per symbol; unknown symbols fail.
pub struct MockMarketDataProvider {
    bars: HashMap<String, DailyBar>,
}

impl MockMarketDataProvider {
    pub fn new(bars: Vec<DailyBar>) -> Self {
        Self {
            bars: bars.into_iter().map(|b| (b.symbol.clone(), b)).collect(),
        }
    }
}

#[async_trait]
impl MarketDataProvider for MockMarketDataProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_latest_daily(&self, symbol: &str) -> Result<DailyBar, AgentError> {
        self.bars
            .get(symbol)
            .cloned()
            .ok_or_else(|| AgentError::Provider(format!("{symbol}: no mock data")))
    }
}

/// Records every event of the subscribed kinds, in delivery order.
pub struct CaptureSubscriber {
    events: Mutex<Vec<Event>>,
}

impl CaptureSubscriber {
    pub fn attach(bus: &EventBus, kinds: &'static [EventKind]) -> Arc<Self> {
        let subscriber = Arc::new(Self {
            events: Mutex::new(Vec::new()),
        });
        for kind in kinds {
            let subscriber_for_handler = Arc::clone(&subscriber);
            bus.register(
                *kind,
                "capture",
                Arc::new(move |event| {
                    let subscriber = Arc::clone(&subscriber_for_handler);
                    Box::pin(async move {
                        subscriber
                            .events
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner())
                            .push(event);
                        Ok(())
                    })
                }),
            );
        }
        subscriber
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events().iter().map(Event::kind).collect()
    }

    pub fn count_of(&self, kind: EventKind) -> usize {
        self.events().iter().filter(|e| e.kind() == kind).count()
    }
}

/// Feed entry with just a title and summary, published now.
pub fn sample_entry(title: &str, summary: &str) -> FeedEntry {
    FeedEntry {
        title: Some(title.to_string()),
        url: Some(format!("https://example.com/{}", title.to_lowercase().replace(' ', "-"))),
        summary: Some(summary.to_string()),
        published_at: Some(Utc::now()),
    }
}

/// Daily bar with the given close; open/high/low derived from it.
pub fn sample_bar(symbol: &str, date: NaiveDate, close: Decimal) -> DailyBar {
    DailyBar {
        symbol: symbol.to_string(),
        date,
        open: close - Decimal::ONE,
        high: close + Decimal::ONE,
        low: close - Decimal::TWO,
        close,
        volume: 1_000_000,
        fetched_at: Utc::now(),
    }
}
