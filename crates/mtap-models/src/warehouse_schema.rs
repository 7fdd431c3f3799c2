use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::session::SessionId;

/// Warehouse table schema.
///
/// Two tables keyed by `(session_id, <item key>)`. The trailing enrichment
/// columns start NULL and are populated by the trend agent's batch UPDATEs
/// keyed on the same session + item key. `IS NULL` on an enrichment column is
/// what makes analysis re-runs idempotent.
pub const WAREHOUSE_DDL: &str = "\
CREATE TABLE IF NOT EXISTS processed_news (
    session_id      TEXT NOT NULL,
    article_id      TEXT NOT NULL,
    title           TEXT,
    url             TEXT,
    summary_cleaned TEXT,
    published_at    TEXT NOT NULL,
    feed_source     TEXT NOT NULL,
    raw_path        TEXT NOT NULL,
    processed_at    TEXT NOT NULL,
    sentiment_score REAL,
    sentiment_label TEXT,
    PRIMARY KEY (session_id, article_id)
);
CREATE INDEX IF NOT EXISTS idx_news_session ON processed_news(session_id);

CREATE TABLE IF NOT EXISTS processed_financials (
    session_id       TEXT NOT NULL,
    symbol           TEXT NOT NULL,
    date             TEXT NOT NULL,
    open_price       TEXT NOT NULL,
    high_price       TEXT NOT NULL,
    low_price        TEXT NOT NULL,
    close_price      TEXT NOT NULL,
    volume           INTEGER NOT NULL,
    processed_at     TEXT NOT NULL,
    daily_change_pct REAL,
    is_anomaly       INTEGER,
    PRIMARY KEY (session_id, symbol, date)
);
CREATE INDEX IF NOT EXISTS idx_financials_session ON processed_financials(session_id);
CREATE INDEX IF NOT EXISTS idx_financials_symbol_date ON processed_financials(symbol, date);
";

/// Blob store layout conventions.
///
/// - Raw articles: `raw_data/news/{session}/{article_id}.json`
/// - Rendered reports: `reports/{session}_market_trend_report.html`
pub mod blob_paths {
    use super::SessionId;
    use uuid::Uuid;

    pub fn raw_news(session_id: SessionId, article_id: Uuid) -> String {
        format!("raw_data/news/{session_id}/{article_id}.json")
    }

    pub fn report(session_id: SessionId) -> String {
        format!("reports/{session_id}_market_trend_report.html")
    }
}

/// A processed news article row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewsRow {
    pub session_id: SessionId,
    pub article_id: Uuid,
    pub title: String,
    pub url: Option<String>,
    pub summary_cleaned: String,
    pub published_at: DateTime<Utc>,
    pub feed_source: String,
    pub raw_path: String,
    pub processed_at: DateTime<Utc>,
    pub sentiment_score: Option<f64>,
    pub sentiment_label: Option<String>,
}

/// A processed daily price bar row.
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialRow {
    pub session_id: SessionId,
    pub symbol: String,
    pub date: NaiveDate,
    pub open_price: Decimal,
    pub high_price: Decimal,
    pub low_price: Decimal,
    pub close_price: Decimal,
    pub volume: i64,
    pub processed_at: DateTime<Utc>,
    pub daily_change_pct: Option<f64>,
    pub is_anomaly: Option<bool>,
}
