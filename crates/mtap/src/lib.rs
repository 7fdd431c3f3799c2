//! MTAP - Market Trend Analysis Pipeline
//!
//! A daily event-driven pipeline: scrape financial news and market data,
//! persist raw and processed records, enrich them with sentiment and anomaly
//! signals, and render an HTML report. Agents coordinate exclusively through
//! the in-process event bus; per-session completion tracking decides when
//! each stage may advance.

pub use mtap_agents as agents;
pub use mtap_bus as bus;
pub use mtap_models as models;
pub use mtap_store as store;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use mtap_agents::{
    AlphaVantageProvider, DataProcessorAgent, FinancialDataAgent, MarketDataProvider,
    NewsFeedSource, NewsScraperAgent, ReportGenerationAgent, RssFeedSource,
    TrendIdentificationAgent,
};
use mtap_bus::{register_agent, EventBus};
use mtap_models::{Event, EventKind, MtapConfig, SessionId};
use mtap_store::{BlobStore, Warehouse};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// How a daily job run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed { report_path: String },
    TimedOut,
    Cancelled,
}

/// Build the full pipeline from configuration: open storage, construct the
/// five agents against real sources, and register them on a fresh bus.
pub fn build_pipeline(config: &MtapConfig) -> anyhow::Result<Arc<EventBus>> {
    let warehouse = Warehouse::open(&config.storage.warehouse_path).with_context(|| {
        format!(
            "Failed to open warehouse: {}",
            config.storage.warehouse_path
        )
    })?;
    let warehouse = Arc::new(Mutex::new(warehouse));
    let blobs = Arc::new(BlobStore::new(&config.storage.blob_root));

    let sources: Vec<Arc<dyn NewsFeedSource>> = config
        .feeds
        .iter()
        .map(|feed| {
            Arc::new(RssFeedSource::new(feed.name.clone(), feed.url.clone()))
                as Arc<dyn NewsFeedSource>
        })
        .collect();
    let provider: Arc<dyn MarketDataProvider> = Arc::new(AlphaVantageProvider::new(
        config.market.base_url.clone(),
        config.market.api_key.clone(),
    ));

    let bus = Arc::new(EventBus::new());
    register_agent(
        &bus,
        Arc::new(NewsScraperAgent::new(
            Arc::clone(&bus),
            sources,
            Arc::clone(&blobs),
        )),
    );
    register_agent(
        &bus,
        Arc::new(FinancialDataAgent::new(
            Arc::clone(&bus),
            provider,
            config.market.symbols.clone(),
            Duration::from_millis(config.market.pause_between_requests_ms),
        )),
    );
    register_agent(
        &bus,
        Arc::new(DataProcessorAgent::new(
            Arc::clone(&bus),
            Arc::clone(&warehouse),
        )),
    );
    register_agent(
        &bus,
        Arc::new(TrendIdentificationAgent::new(
            Arc::clone(&bus),
            Arc::clone(&warehouse),
            &config.analysis,
        )),
    );
    register_agent(
        &bus,
        Arc::new(ReportGenerationAgent::new(
            Arc::clone(&bus),
            warehouse,
            blobs,
        )),
    );

    Ok(bus)
}

/// Kick off the daily job for `session_id` and wait for its report.
///
/// Registers a monitor for the terminal event before publishing the start
/// event, so a cascade that completes synchronously inside `publish` is still
/// observed. Reports for other in-flight sessions are ignored.
pub async fn run_daily_job(
    bus: &Arc<EventBus>,
    session_id: SessionId,
    timeout: Duration,
    cancel: CancellationToken,
) -> JobOutcome {
    let (tx, mut rx) = mpsc::unbounded_channel();
    bus.register(
        EventKind::ReportGenerated,
        "job_monitor",
        Arc::new(move |event| {
            let tx = tx.clone();
            Box::pin(async move {
                if let Event::ReportGenerated {
                    session_id,
                    report_path,
                } = event
                {
                    let _ = tx.send((session_id, report_path));
                }
                Ok(())
            })
        }),
    );

    tracing::info!(session = %session_id, "Publishing start event for daily job");
    bus.publish(Event::StartDailyJob { session_id }).await;

    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return JobOutcome::Cancelled,
            _ = &mut deadline => return JobOutcome::TimedOut,
            received = rx.recv() => match received {
                Some((id, report_path)) if id == session_id => {
                    return JobOutcome::Completed { report_path };
                }
                Some(_) => {} // another session's report; keep waiting
                None => return JobOutcome::TimedOut,
            },
        }
    }
}
