use std::sync::{Arc, Mutex, MutexGuard};

use askama::Template;
use async_trait::async_trait;
use chrono::Utc;
use mtap_bus::{Agent, EventBus};
use mtap_models::warehouse_schema::blob_paths;
use mtap_models::{Event, EventKind, SessionId};
use mtap_store::{BlobStore, Warehouse};
use tracing::{error, info};

use crate::error::AgentError;

/// How many of the highest-scored articles the report lists.
const TOP_ARTICLE_COUNT: usize = 5;

#[derive(Template)]
#[template(path = "report.html")]
struct ReportTemplate {
    session_id: String,
    generated_at: String,
    positive: i64,
    negative: i64,
    neutral: i64,
    top_articles: Vec<ReportArticle>,
    anomalies: Vec<ReportAnomaly>,
}

struct ReportArticle {
    title: String,
    url: String,
    label: String,
    score: String,
}

struct ReportAnomaly {
    symbol: String,
    date: String,
    change_pct: String,
}

/// Renders and persists the session report once trends are identified, then
/// publishes the terminal `report_generated_for_session` event.
///
/// A render or store failure is logged and terminal for the session: no event
/// is published and the job's own timeout is what surfaces the stall.
pub struct ReportGenerationAgent {
    bus: Arc<EventBus>,
    warehouse: Arc<Mutex<Warehouse>>,
    blobs: Arc<BlobStore>,
}

impl ReportGenerationAgent {
    pub fn new(
        bus: Arc<EventBus>,
        warehouse: Arc<Mutex<Warehouse>>,
        blobs: Arc<BlobStore>,
    ) -> Self {
        Self {
            bus,
            warehouse,
            blobs,
        }
    }

    fn warehouse(&self) -> MutexGuard<'_, Warehouse> {
        self.warehouse
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn generate(&self, session_id: SessionId) -> Result<String, AgentError> {
        let (articles, counts, anomalies) = {
            let warehouse = self.warehouse();
            (
                warehouse.news_for_report(session_id)?,
                warehouse.sentiment_counts(session_id)?,
                warehouse.anomalies(session_id)?,
            )
        };

        let template = ReportTemplate {
            session_id: session_id.to_string(),
            generated_at: Utc::now().to_rfc3339(),
            positive: counts.positive,
            negative: counts.negative,
            neutral: counts.neutral,
            top_articles: articles
                .into_iter()
                .take(TOP_ARTICLE_COUNT)
                .map(|row| ReportArticle {
                    title: row.title,
                    url: row.url.unwrap_or_default(),
                    label: row.sentiment_label.unwrap_or_else(|| "unscored".to_string()),
                    score: row
                        .sentiment_score
                        .map_or_else(|| "-".to_string(), |s| format!("{s:.2}")),
                })
                .collect(),
            anomalies: anomalies
                .into_iter()
                .map(|row| ReportAnomaly {
                    symbol: row.symbol,
                    date: row.date.format("%Y-%m-%d").to_string(),
                    change_pct: format!("{:+.2}%", row.daily_change_pct * 100.0),
                })
                .collect(),
        };

        let html = template.render()?;
        let path = self
            .blobs
            .put_string(&blob_paths::report(session_id), &html)?;
        Ok(path.display().to_string())
    }
}

#[async_trait]
impl Agent for ReportGenerationAgent {
    fn name(&self) -> &'static str {
        "report_generation"
    }

    fn subscriptions(&self) -> &'static [EventKind] {
        &[EventKind::TrendsIdentified]
    }

    async fn handle(&self, event: Event) -> anyhow::Result<()> {
        if let Event::TrendsIdentified { session_id } = event {
            info!(session = %session_id, "Trends identified; generating report");
            match self.generate(session_id) {
                Ok(report_path) => {
                    info!(session = %session_id, report = %report_path, "Report generated");
                    self.bus
                        .publish(Event::ReportGenerated {
                            session_id,
                            report_path,
                        })
                        .await;
                }
                Err(e) => {
                    error!(session = %session_id, error = %e, "Report generation failed");
                }
            }
        }
        Ok(())
    }
}
