use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mtap_bus::{Agent, CompletionTracker, EventBus};
use mtap_models::{DailyBar, Event, EventKind, FinancialRow, NewsRow, RawArticle, SessionId};
use mtap_store::Warehouse;
use tracing::{debug, info, warn};

use crate::clean::clean_text;
use crate::error::AgentError;

/// Flags the raw stage waits on before declaring a session processed.
const RAW_FLAGS: &[&str] = &["news", "financial"];

/// Cleans and persists raw items, and tracks per-session completion of the
/// two gathering signals.
///
/// Persisting is best-effort: a bad item is logged and skipped. Gathering and
/// processing are decoupled, so the completion flags follow the gathered
/// signals, not the row inserts. When both signals have arrived the agent
/// publishes `news_processed_for_session` and
/// `financial_processed_for_session` and forgets the session.
pub struct DataProcessorAgent {
    bus: Arc<EventBus>,
    warehouse: Arc<Mutex<Warehouse>>,
    tracker: CompletionTracker,
}

impl DataProcessorAgent {
    pub fn new(bus: Arc<EventBus>, warehouse: Arc<Mutex<Warehouse>>) -> Self {
        Self {
            bus,
            warehouse,
            tracker: CompletionTracker::new(RAW_FLAGS),
        }
    }

    fn warehouse(&self) -> MutexGuard<'_, Warehouse> {
        self.warehouse
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn store_news(&self, session_id: SessionId, article: RawArticle) -> Result<(), AgentError> {
        let published_at = DateTime::parse_from_rfc3339(&article.published_at)
            .map_err(|e| {
                AgentError::Parse(format!(
                    "published_at {:?}: {e}",
                    article.published_at
                ))
            })?
            .with_timezone(&Utc);

        let row = NewsRow {
            session_id,
            article_id: article.article_id,
            title: clean_text(article.title.as_deref().unwrap_or_default()),
            url: article.url,
            summary_cleaned: clean_text(article.summary.as_deref().unwrap_or_default()),
            published_at,
            feed_source: article.feed_source,
            raw_path: article.raw_path,
            processed_at: Utc::now(),
            sentiment_score: None,
            sentiment_label: None,
        };

        self.warehouse().insert_news(&row)?;
        debug!(session = %session_id, article = %row.article_id, "Stored processed article");
        Ok(())
    }

    fn store_financial(&self, session_id: SessionId, bar: DailyBar) -> Result<(), AgentError> {
        let row = FinancialRow {
            session_id,
            symbol: bar.symbol,
            date: bar.date,
            open_price: bar.open,
            high_price: bar.high,
            low_price: bar.low,
            close_price: bar.close,
            volume: bar.volume,
            processed_at: Utc::now(),
            daily_change_pct: None,
            is_anomaly: None,
        };

        self.warehouse().insert_financial(&row)?;
        debug!(session = %session_id, symbol = %row.symbol, date = %row.date, "Stored processed bar");
        Ok(())
    }

    async fn mark_gathered(&self, session_id: SessionId, flag: &'static str, count: usize) {
        info!(session = %session_id, flag, count, "Raw data gathered signal received");

        if self.tracker.mark(session_id, flag, true).is_some() {
            info!(
                session = %session_id,
                "News and financial raw data both gathered; publishing processed events"
            );
            self.bus
                .publish(Event::NewsProcessed { session_id })
                .await;
            self.bus
                .publish(Event::FinancialProcessed { session_id })
                .await;
        }
    }
}

#[async_trait]
impl Agent for DataProcessorAgent {
    fn name(&self) -> &'static str {
        "data_processor"
    }

    fn subscriptions(&self) -> &'static [EventKind] {
        &[
            EventKind::NewsArticleRaw,
            EventKind::FinancialDataPointRaw,
            EventKind::AllRawNewsGathered,
            EventKind::AllRawFinancialGathered,
        ]
    }

    async fn handle(&self, event: Event) -> anyhow::Result<()> {
        match event {
            Event::NewsArticleRaw {
                session_id,
                article,
            } => {
                // Item-granularity error handling: log, skip, keep going.
                if let Err(e) = self.store_news(session_id, article) {
                    warn!(session = %session_id, error = %e, "Failed to process raw article");
                }
            }
            Event::FinancialDataPointRaw { session_id, bar } => {
                if let Err(e) = self.store_financial(session_id, bar) {
                    warn!(session = %session_id, error = %e, "Failed to process raw bar");
                }
            }
            Event::AllRawNewsGathered { session_id, count } => {
                self.mark_gathered(session_id, "news", count).await;
            }
            Event::AllRawFinancialGathered { session_id, count } => {
                self.mark_gathered(session_id, "financial", count).await;
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_bar, CaptureSubscriber};
    use chrono::NaiveDate;
    use mtap_bus::register_agent;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn session() -> SessionId {
        SessionId::parse("2024-05-01").unwrap()
    }

    fn build() -> (
        Arc<EventBus>,
        Arc<DataProcessorAgent>,
        Arc<Mutex<Warehouse>>,
        Arc<CaptureSubscriber>,
    ) {
        let bus = Arc::new(EventBus::new());
        let warehouse = Arc::new(Mutex::new(Warehouse::open_in_memory().unwrap()));
        let agent = Arc::new(DataProcessorAgent::new(
            Arc::clone(&bus),
            Arc::clone(&warehouse),
        ));
        let capture = CaptureSubscriber::attach(
            &bus,
            &[EventKind::NewsProcessed, EventKind::FinancialProcessed],
        );
        register_agent(&bus, Arc::clone(&agent) as Arc<dyn Agent>);
        (bus, agent, warehouse, capture)
    }

    fn raw_article(title: &str) -> RawArticle {
        RawArticle {
            article_id: Uuid::new_v4(),
            title: Some(format!("<b>{title}</b>")),
            url: Some("https://example.com/a".to_string()),
            summary: Some("Some &amp; escaped <i>text</i>".to_string()),
            published_at: "2024-05-01T09:30:00+00:00".to_string(),
            feed_source: "Test Feed".to_string(),
            raw_path: "/blobs/raw.json".to_string(),
        }
    }

    #[tokio::test]
    async fn both_gathered_signals_publish_both_processed_events() {
        let (bus, agent, _warehouse, capture) = build();

        bus.publish(Event::AllRawNewsGathered {
            session_id: session(),
            count: 12,
        })
        .await;
        assert!(capture.events().is_empty());

        bus.publish(Event::AllRawFinancialGathered {
            session_id: session(),
            count: 5,
        })
        .await;

        let events = capture.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            Event::NewsProcessed { session_id } if *session_id == session()
        ));
        assert!(matches!(
            &events[1],
            Event::FinancialProcessed { session_id } if *session_id == session()
        ));

        // The session's tracking entry is gone once the events are out.
        assert!(!agent.tracker.contains(session()));
    }

    #[tokio::test]
    async fn order_of_gathered_signals_does_not_matter() {
        let (bus, _agent, _warehouse, capture) = build();

        bus.publish(Event::AllRawFinancialGathered {
            session_id: session(),
            count: 5,
        })
        .await;
        bus.publish(Event::AllRawNewsGathered {
            session_id: session(),
            count: 12,
        })
        .await;

        assert_eq!(capture.count_of(EventKind::NewsProcessed), 1);
        assert_eq!(capture.count_of(EventKind::FinancialProcessed), 1);
    }

    #[tokio::test]
    async fn duplicate_gathered_signal_does_not_double_publish() {
        let (bus, _agent, _warehouse, capture) = build();

        bus.publish(Event::AllRawNewsGathered {
            session_id: session(),
            count: 12,
        })
        .await;
        bus.publish(Event::AllRawNewsGathered {
            session_id: session(),
            count: 12,
        })
        .await;
        bus.publish(Event::AllRawFinancialGathered {
            session_id: session(),
            count: 5,
        })
        .await;

        assert_eq!(capture.count_of(EventKind::NewsProcessed), 1);
        assert_eq!(capture.count_of(EventKind::FinancialProcessed), 1);
    }

    #[tokio::test]
    async fn sessions_are_tracked_independently() {
        let (bus, agent, _warehouse, capture) = build();
        let other = SessionId::parse("2024-05-02").unwrap();

        bus.publish(Event::AllRawNewsGathered {
            session_id: session(),
            count: 1,
        })
        .await;
        bus.publish(Event::AllRawFinancialGathered {
            session_id: other,
            count: 1,
        })
        .await;

        // Neither session has both signals; nothing published.
        assert!(capture.events().is_empty());
        assert!(agent.tracker.contains(session()));
        assert!(agent.tracker.contains(other));

        bus.publish(Event::AllRawFinancialGathered {
            session_id: session(),
            count: 1,
        })
        .await;
        assert_eq!(capture.count_of(EventKind::NewsProcessed), 1);
        assert!(agent.tracker.contains(other));
    }

    #[tokio::test]
    async fn raw_article_is_cleaned_and_stored() {
        let (bus, _agent, warehouse, _capture) = build();

        bus.publish(Event::NewsArticleRaw {
            session_id: session(),
            article: raw_article("Markets rally"),
        })
        .await;

        let warehouse = warehouse.lock().unwrap();
        assert_eq!(warehouse.news_count(session()).unwrap(), 1);
        let unscored = warehouse.unscored_news(session()).unwrap();
        assert_eq!(unscored[0].title, "Markets rally");
        assert_eq!(unscored[0].summary, "Some & escaped text");
    }

    #[tokio::test]
    async fn malformed_published_at_skips_the_item() {
        let (bus, _agent, warehouse, _capture) = build();

        let mut article = raw_article("Bad date");
        article.published_at = "sometime yesterday".to_string();

        bus.publish(Event::NewsArticleRaw {
            session_id: session(),
            article,
        })
        .await;

        assert_eq!(warehouse.lock().unwrap().news_count(session()).unwrap(), 0);
    }

    #[tokio::test]
    async fn raw_bar_is_stored() {
        let (bus, _agent, warehouse, _capture) = build();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        bus.publish(Event::FinancialDataPointRaw {
            session_id: session(),
            bar: sample_bar("SPY", date, dec!(510.00)),
        })
        .await;

        assert_eq!(
            warehouse.lock().unwrap().financial_count(session()).unwrap(),
            1
        );
    }
}
