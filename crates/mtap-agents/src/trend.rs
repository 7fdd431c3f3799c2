use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use mtap_bus::{Agent, CompletionTracker, EventBus};
use mtap_models::{AnalysisConfig, Event, EventKind, SessionId};
use mtap_store::{AnomalyUpdate, SentimentUpdate, Warehouse};
use rust_decimal::prelude::ToPrimitive;
use tracing::{error, info, warn};

use crate::error::AgentError;
use crate::sentiment::SentimentAnalyzer;

/// Flags the analysis stage waits on before declaring trends identified.
const ANALYSIS_FLAGS: &[&str] = &["news_analyzed", "financial_analyzed"];

/// How far back to look for a previous close when the prior market day
/// belongs to an earlier session (weekends, holidays, retried days).
const PREV_CLOSE_LOOKBACK_DAYS: i64 = 7;

/// Runs the two enrichment passes and tracks per-session completion of both.
///
/// Each pass reports a success boolean into the tracker. Under the default
/// policy a failed pass still counts as "reported in": the session finalizes
/// degraded and the failure is only logged. Setting
/// `analysis.require_analysis_success` holds such sessions open instead.
pub struct TrendIdentificationAgent {
    bus: Arc<EventBus>,
    warehouse: Arc<Mutex<Warehouse>>,
    tracker: CompletionTracker,
    analyzer: SentimentAnalyzer,
    anomaly_threshold_percent: f64,
}

impl TrendIdentificationAgent {
    pub fn new(
        bus: Arc<EventBus>,
        warehouse: Arc<Mutex<Warehouse>>,
        analysis: &AnalysisConfig,
    ) -> Self {
        Self {
            bus,
            warehouse,
            tracker: CompletionTracker::with_policy(
                ANALYSIS_FLAGS,
                analysis.require_analysis_success,
            ),
            analyzer: SentimentAnalyzer::new(),
            anomaly_threshold_percent: analysis.anomaly_threshold_percent,
        }
    }

    fn warehouse(&self) -> MutexGuard<'_, Warehouse> {
        self.warehouse
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Score every not-yet-scored article in the session. Returns whether the
    /// whole pass succeeded.
    fn analyze_sentiment(&self, session_id: SessionId) -> bool {
        let result = (|| -> Result<usize, AgentError> {
            let mut warehouse = self.warehouse();
            let articles = warehouse.unscored_news(session_id)?;

            let updates: Vec<SentimentUpdate> = articles
                .iter()
                .map(|article| {
                    let text = format!("{} {}", article.title, article.summary);
                    let score = self.analyzer.score(&text);
                    SentimentUpdate {
                        article_id: article.article_id,
                        score,
                        label: SentimentAnalyzer::label(score).to_string(),
                    }
                })
                .collect();

            warehouse.apply_sentiment(session_id, &updates)?;
            Ok(updates.len())
        })();

        match result {
            Ok(count) => {
                info!(session = %session_id, count, "Sentiment scores applied");
                true
            }
            Err(e) => {
                error!(session = %session_id, error = %e, "Sentiment analysis failed");
                false
            }
        }
    }

    /// Compute daily change and anomaly flags for every session bar that has
    /// a previous close and no change computed yet. Returns whether the whole
    /// pass succeeded.
    fn detect_anomalies(&self, session_id: SessionId) -> bool {
        let result = (|| -> Result<usize, AgentError> {
            let mut warehouse = self.warehouse();
            let changes = warehouse.price_changes(session_id, PREV_CLOSE_LOOKBACK_DAYS)?;

            let updates: Vec<AnomalyUpdate> = changes
                .iter()
                .map(|row| {
                    let change = if row.prev_close.is_zero() {
                        0.0
                    } else {
                        ((row.close - row.prev_close) / row.prev_close)
                            .to_f64()
                            .unwrap_or(0.0)
                    };
                    AnomalyUpdate {
                        symbol: row.symbol.clone(),
                        date: row.date,
                        daily_change_pct: change,
                        is_anomaly: (change * 100.0).abs() > self.anomaly_threshold_percent,
                    }
                })
                .collect();

            warehouse.apply_anomalies(session_id, &updates)?;
            Ok(updates.len())
        })();

        match result {
            Ok(count) => {
                info!(session = %session_id, count, "Anomaly flags applied");
                true
            }
            Err(e) => {
                error!(session = %session_id, error = %e, "Anomaly detection failed");
                false
            }
        }
    }

    async fn mark_analyzed(&self, session_id: SessionId, flag: &'static str, ok: bool) {
        if !ok {
            error!(
                session = %session_id,
                flag,
                "Analysis step failed; trend identification may be incomplete"
            );
        }

        if let Some(record) = self.tracker.mark(session_id, flag, ok) {
            let failed: Vec<&str> = record
                .iter()
                .filter(|(_, ok)| !**ok)
                .map(|(flag, _)| *flag)
                .collect();
            if failed.is_empty() {
                info!(
                    session = %session_id,
                    "News and financial analysis complete; publishing trends identified"
                );
            } else {
                warn!(
                    session = %session_id,
                    failed = ?failed,
                    "Finalizing session despite failed analysis steps"
                );
            }
            self.bus
                .publish(Event::TrendsIdentified { session_id })
                .await;
        }
    }
}

#[async_trait]
impl Agent for TrendIdentificationAgent {
    fn name(&self) -> &'static str {
        "trend_identification"
    }

    fn subscriptions(&self) -> &'static [EventKind] {
        &[EventKind::NewsProcessed, EventKind::FinancialProcessed]
    }

    async fn handle(&self, event: Event) -> anyhow::Result<()> {
        match event {
            Event::NewsProcessed { session_id } => {
                info!(session = %session_id, "News processed; starting sentiment analysis");
                let ok = self.analyze_sentiment(session_id);
                self.mark_analyzed(session_id, "news_analyzed", ok).await;
            }
            Event::FinancialProcessed { session_id } => {
                info!(session = %session_id, "Financial data processed; starting anomaly detection");
                let ok = self.detect_anomalies(session_id);
                self.mark_analyzed(session_id, "financial_analyzed", ok)
                    .await;
            }
            _ => {}
        }
        Ok(())
    }
}
