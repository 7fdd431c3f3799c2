use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::SessionId;

/// Registration key for bus subscriptions: one variant per wire event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    StartDailyJob,
    NewsArticleRaw,
    FinancialDataPointRaw,
    AllRawNewsGathered,
    AllRawFinancialGathered,
    NewsProcessed,
    FinancialProcessed,
    TrendsIdentified,
    ReportGenerated,
}

impl EventKind {
    /// The wire name used for the serialized `kind` tag and in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::StartDailyJob => "start_daily_job",
            EventKind::NewsArticleRaw => "news_article_raw",
            EventKind::FinancialDataPointRaw => "financial_data_point_raw",
            EventKind::AllRawNewsGathered => "all_raw_news_gathered_for_session",
            EventKind::AllRawFinancialGathered => "all_raw_financial_gathered_for_session",
            EventKind::NewsProcessed => "news_processed_for_session",
            EventKind::FinancialProcessed => "financial_processed_for_session",
            EventKind::TrendsIdentified => "trends_identified_for_session",
            EventKind::ReportGenerated => "report_generated_for_session",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw news article exactly as scraped, before cleaning.
///
/// `published_at` stays a string here; normalizing it into a timestamp is the
/// processor's job, so a malformed feed date surfaces as a per-item processing
/// error rather than a scrape failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawArticle {
    pub article_id: Uuid,
    pub title: Option<String>,
    pub url: Option<String>,
    pub summary: Option<String>,
    /// RFC 3339. Producers fall back to the fetch time when the feed omits it.
    pub published_at: String,
    pub feed_source: String,
    /// Where the raw JSON blob was persisted.
    pub raw_path: String,
}

/// One daily OHLCV bar as fetched from the market data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub symbol: String,
    /// The actual market date of the bar, which may trail the session date
    /// (weekends, holidays).
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
    pub fetched_at: DateTime<Utc>,
}

/// The full event catalog. Every payload carries the session id; the variants
/// are the fixed set of wire kinds, so a payload cannot be published with
/// missing or mistyped fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Event {
    #[serde(rename = "start_daily_job")]
    StartDailyJob { session_id: SessionId },

    #[serde(rename = "news_article_raw")]
    NewsArticleRaw {
        session_id: SessionId,
        #[serde(flatten)]
        article: RawArticle,
    },

    #[serde(rename = "financial_data_point_raw")]
    FinancialDataPointRaw {
        session_id: SessionId,
        #[serde(flatten)]
        bar: DailyBar,
    },

    #[serde(rename = "all_raw_news_gathered_for_session")]
    AllRawNewsGathered { session_id: SessionId, count: usize },

    #[serde(rename = "all_raw_financial_gathered_for_session")]
    AllRawFinancialGathered { session_id: SessionId, count: usize },

    #[serde(rename = "news_processed_for_session")]
    NewsProcessed { session_id: SessionId },

    #[serde(rename = "financial_processed_for_session")]
    FinancialProcessed { session_id: SessionId },

    #[serde(rename = "trends_identified_for_session")]
    TrendsIdentified { session_id: SessionId },

    #[serde(rename = "report_generated_for_session")]
    ReportGenerated {
        session_id: SessionId,
        report_path: String,
    },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::StartDailyJob { .. } => EventKind::StartDailyJob,
            Event::NewsArticleRaw { .. } => EventKind::NewsArticleRaw,
            Event::FinancialDataPointRaw { .. } => EventKind::FinancialDataPointRaw,
            Event::AllRawNewsGathered { .. } => EventKind::AllRawNewsGathered,
            Event::AllRawFinancialGathered { .. } => EventKind::AllRawFinancialGathered,
            Event::NewsProcessed { .. } => EventKind::NewsProcessed,
            Event::FinancialProcessed { .. } => EventKind::FinancialProcessed,
            Event::TrendsIdentified { .. } => EventKind::TrendsIdentified,
            Event::ReportGenerated { .. } => EventKind::ReportGenerated,
        }
    }

    pub fn session_id(&self) -> SessionId {
        match self {
            Event::StartDailyJob { session_id }
            | Event::NewsArticleRaw { session_id, .. }
            | Event::FinancialDataPointRaw { session_id, .. }
            | Event::AllRawNewsGathered { session_id, .. }
            | Event::AllRawFinancialGathered { session_id, .. }
            | Event::NewsProcessed { session_id }
            | Event::FinancialProcessed { session_id }
            | Event::TrendsIdentified { session_id }
            | Event::ReportGenerated { session_id, .. } => *session_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn session() -> SessionId {
        SessionId::parse("2024-05-01").unwrap()
    }

    #[test]
    fn start_event_wire_format() {
        let event = Event::StartDailyJob {
            session_id: session(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "start_daily_job");
        assert_eq!(json["session_id"], "2024-05-01");
    }

    #[test]
    fn gathered_event_carries_count() {
        let event = Event::AllRawNewsGathered {
            session_id: session(),
            count: 12,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "all_raw_news_gathered_for_session");
        assert_eq!(json["count"], 12);
    }

    #[test]
    fn raw_article_fields_are_flattened() {
        let event = Event::NewsArticleRaw {
            session_id: session(),
            article: RawArticle {
                article_id: Uuid::new_v4(),
                title: Some("Markets rally".to_string()),
                url: Some("https://example.com/a".to_string()),
                summary: None,
                published_at: "2024-05-01T09:30:00+00:00".to_string(),
                feed_source: "Test Feed".to_string(),
                raw_path: "/blobs/raw_data/news/2024-05-01/x.json".to_string(),
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "news_article_raw");
        assert_eq!(json["title"], "Markets rally");
        assert_eq!(json["feed_source"], "Test Feed");
    }

    #[test]
    fn financial_event_roundtrip() {
        let event = Event::FinancialDataPointRaw {
            session_id: session(),
            bar: DailyBar {
                symbol: "SPY".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
                open: dec!(500.10),
                high: dec!(505.00),
                low: dec!(499.25),
                close: dec!(503.40),
                volume: 75_000_000,
                fetched_at: Utc::now(),
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
        assert_eq!(parsed.kind(), EventKind::FinancialDataPointRaw);
    }

    #[test]
    fn session_id_accessor_covers_all_variants() {
        let events = vec![
            Event::StartDailyJob {
                session_id: session(),
            },
            Event::NewsProcessed {
                session_id: session(),
            },
            Event::FinancialProcessed {
                session_id: session(),
            },
            Event::TrendsIdentified {
                session_id: session(),
            },
            Event::ReportGenerated {
                session_id: session(),
                report_path: "/blobs/reports/2024-05-01_market_trend_report.html".to_string(),
            },
        ];
        for event in events {
            assert_eq!(event.session_id(), session());
        }
    }

    #[test]
    fn kind_names_match_wire_tags() {
        let event = Event::TrendsIdentified {
            session_id: session(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], event.kind().as_str());
    }
}
