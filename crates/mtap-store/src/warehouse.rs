use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use mtap_models::{FinancialRow, NewsRow, SessionId, WAREHOUSE_DDL};
use rusqlite::Connection;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::StoreError;

/// A news article still awaiting a sentiment score.
#[derive(Debug, Clone)]
pub struct UnscoredArticle {
    pub article_id: Uuid,
    pub title: String,
    pub summary: String,
}

/// Sentiment enrichment for one article.
#[derive(Debug, Clone)]
pub struct SentimentUpdate {
    pub article_id: Uuid,
    pub score: f64,
    pub label: String,
}

/// A price bar paired with the previous close, still awaiting anomaly
/// enrichment.
#[derive(Debug, Clone)]
pub struct PriceChangeRow {
    pub symbol: String,
    pub date: NaiveDate,
    pub close: Decimal,
    pub prev_close: Decimal,
}

/// Anomaly enrichment for one price bar.
#[derive(Debug, Clone)]
pub struct AnomalyUpdate {
    pub symbol: String,
    pub date: NaiveDate,
    pub daily_change_pct: f64,
    pub is_anomaly: bool,
}

/// An article as queried for the report, enrichment included.
#[derive(Debug, Clone)]
pub struct ReportArticleRow {
    pub title: String,
    pub url: Option<String>,
    pub summary: String,
    pub sentiment_score: Option<f64>,
    pub sentiment_label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentimentCounts {
    pub positive: i64,
    pub negative: i64,
    pub neutral: i64,
}

/// A flagged anomaly as queried for the report.
#[derive(Debug, Clone)]
pub struct AnomalyRow {
    pub symbol: String,
    pub date: NaiveDate,
    pub daily_change_pct: f64,
}

/// The analytical warehouse: one SQLite database holding the processed news
/// and financial tables.
///
/// Rows are inserted by the processor agent with NULL enrichment columns; the
/// trend agent later populates them with batch UPDATEs keyed on
/// `(session_id, <item key>)`. Opened read-write with WAL so agents can
/// interleave reads and writes.
pub struct Warehouse {
    conn: Connection,
}

/// Wrap a per-column parse failure into rusqlite's conversion error so it
/// surfaces through the normal query error path.
fn conversion_err(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

impl Warehouse {
    /// Open (or create) the warehouse at `path`. Creates the schema and
    /// enables WAL mode.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(WAREHOUSE_DDL)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self { conn })
    }

    /// In-memory warehouse for testing.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(WAREHOUSE_DDL)?;
        Ok(Self { conn })
    }

    pub fn insert_news(&self, row: &NewsRow) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO processed_news \
             (session_id, article_id, title, url, summary_cleaned, published_at, \
              feed_source, raw_path, processed_at, sentiment_score, sentiment_label) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            rusqlite::params![
                row.session_id.to_string(),
                row.article_id.to_string(),
                row.title,
                row.url,
                row.summary_cleaned,
                row.published_at.to_rfc3339(),
                row.feed_source,
                row.raw_path,
                row.processed_at.to_rfc3339(),
                row.sentiment_score,
                row.sentiment_label,
            ],
        )?;
        Ok(())
    }

    pub fn insert_financial(&self, row: &FinancialRow) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO processed_financials \
             (session_id, symbol, date, open_price, high_price, low_price, \
              close_price, volume, processed_at, daily_change_pct, is_anomaly) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            rusqlite::params![
                row.session_id.to_string(),
                row.symbol,
                row.date.format("%Y-%m-%d").to_string(),
                row.open_price.to_string(),
                row.high_price.to_string(),
                row.low_price.to_string(),
                row.close_price.to_string(),
                row.volume,
                row.processed_at.to_rfc3339(),
                row.daily_change_pct,
                row.is_anomaly,
            ],
        )?;
        Ok(())
    }

    /// Articles in the session that have not been scored yet. This is the
    /// work set for the sentiment pass; already-scored rows are excluded so
    /// repeated triggers are safe.
    pub fn unscored_news(&self, session_id: SessionId) -> Result<Vec<UnscoredArticle>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT article_id, title, summary_cleaned FROM processed_news \
             WHERE session_id = ?1 AND sentiment_score IS NULL",
        )?;

        let rows = stmt
            .query_map(rusqlite::params![session_id.to_string()], |row| {
                let id: String = row.get(0)?;
                Ok(UnscoredArticle {
                    article_id: Uuid::parse_str(&id).map_err(|e| conversion_err(0, e))?,
                    title: row.get(1)?,
                    summary: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Apply sentiment scores in one transaction, keyed on session + article.
    pub fn apply_sentiment(
        &mut self,
        session_id: SessionId,
        updates: &[SentimentUpdate],
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "UPDATE processed_news SET sentiment_score = ?3, sentiment_label = ?4 \
                 WHERE session_id = ?1 AND article_id = ?2",
            )?;
            for update in updates {
                stmt.execute(rusqlite::params![
                    session_id.to_string(),
                    update.article_id.to_string(),
                    update.score,
                    update.label,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Session bars paired with the previous close, for anomaly detection.
    ///
    /// The window is widened by `lookback_days` so the previous close is
    /// found even when it was loaded by an earlier session (market holidays,
    /// retried days). Bars whose change is already computed are excluded, so
    /// repeated triggers are safe; bars with no previous close are skipped.
    pub fn price_changes(
        &self,
        session_id: SessionId,
        lookback_days: i64,
    ) -> Result<Vec<PriceChangeRow>, StoreError> {
        let end = session_id.date();
        let start = end - Duration::days(lookback_days);

        let mut stmt = self.conn.prepare_cached(
            "WITH ranked AS ( \
                 SELECT session_id, symbol, date, close_price, daily_change_pct, \
                        LAG(close_price) OVER (PARTITION BY symbol ORDER BY date ASC) AS prev_close \
                 FROM processed_financials \
                 WHERE date <= ?2 AND date >= ?3 \
             ) \
             SELECT symbol, date, close_price, prev_close FROM ranked \
             WHERE session_id = ?1 AND prev_close IS NOT NULL AND daily_change_pct IS NULL \
             ORDER BY symbol, date",
        )?;

        let rows = stmt
            .query_map(
                rusqlite::params![
                    session_id.to_string(),
                    end.format("%Y-%m-%d").to_string(),
                    start.format("%Y-%m-%d").to_string(),
                ],
                |row| {
                    let close: String = row.get(2)?;
                    let prev: String = row.get(3)?;
                    Ok(PriceChangeRow {
                        symbol: row.get(0)?,
                        date: row.get(1)?,
                        close: Decimal::from_str(&close).map_err(|e| conversion_err(2, e))?,
                        prev_close: Decimal::from_str(&prev).map_err(|e| conversion_err(3, e))?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Apply anomaly results in one transaction, keyed on session + symbol + date.
    pub fn apply_anomalies(
        &mut self,
        session_id: SessionId,
        updates: &[AnomalyUpdate],
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "UPDATE processed_financials SET daily_change_pct = ?4, is_anomaly = ?5 \
                 WHERE session_id = ?1 AND symbol = ?2 AND date = ?3",
            )?;
            for update in updates {
                stmt.execute(rusqlite::params![
                    session_id.to_string(),
                    update.symbol,
                    update.date.format("%Y-%m-%d").to_string(),
                    update.daily_change_pct,
                    update.is_anomaly,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Session articles ordered most-positive first, unscored rows last.
    pub fn news_for_report(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<ReportArticleRow>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT title, url, summary_cleaned, sentiment_score, sentiment_label \
             FROM processed_news WHERE session_id = ?1 \
             ORDER BY sentiment_score DESC NULLS LAST",
        )?;

        let rows = stmt
            .query_map(rusqlite::params![session_id.to_string()], |row| {
                Ok(ReportArticleRow {
                    title: row.get(0)?,
                    url: row.get(1)?,
                    summary: row.get(2)?,
                    sentiment_score: row.get(3)?,
                    sentiment_label: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    pub fn sentiment_counts(&self, session_id: SessionId) -> Result<SentimentCounts, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT sentiment_label, COUNT(*) FROM processed_news \
             WHERE session_id = ?1 AND sentiment_label IS NOT NULL \
             GROUP BY sentiment_label",
        )?;

        let mut counts = SentimentCounts::default();
        let rows = stmt.query_map(rusqlite::params![session_id.to_string()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (label, count) = row?;
            match label.as_str() {
                "positive" => counts.positive = count,
                "negative" => counts.negative = count,
                _ => counts.neutral += count,
            }
        }
        Ok(counts)
    }

    /// Bars flagged anomalous in the session.
    pub fn anomalies(&self, session_id: SessionId) -> Result<Vec<AnomalyRow>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT symbol, date, daily_change_pct FROM processed_financials \
             WHERE session_id = ?1 AND is_anomaly = 1 ORDER BY symbol",
        )?;

        let rows = stmt
            .query_map(rusqlite::params![session_id.to_string()], |row| {
                Ok(AnomalyRow {
                    symbol: row.get(0)?,
                    date: row.get(1)?,
                    daily_change_pct: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    pub fn news_count(&self, session_id: SessionId) -> Result<usize, StoreError> {
        let count: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM processed_news WHERE session_id = ?1",
            rusqlite::params![session_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn financial_count(&self, session_id: SessionId) -> Result<usize, StoreError> {
        let count: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM processed_financials WHERE session_id = ?1",
            rusqlite::params![session_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
