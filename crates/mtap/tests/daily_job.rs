//! Daily job runner lifecycle: completion against a mock pipeline, timeout
//! when a stage never reports, and cancellation.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use mtap::JobOutcome;
use mtap_agents::test_support::{
    sample_bar, sample_entry, MockFeedSource, MockMarketDataProvider,
};
use mtap_agents::{
    DataProcessorAgent, FinancialDataAgent, NewsFeedSource, NewsScraperAgent,
    ReportGenerationAgent, TrendIdentificationAgent,
};
use mtap_bus::{register_agent, EventBus};
use mtap_models::{AnalysisConfig, MtapConfig, SessionId};
use mtap_store::{BlobStore, Warehouse};
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

fn session() -> SessionId {
    SessionId::parse("2024-05-01").unwrap()
}

/// Wire the full pipeline over mock sources. When `with_financial` is false
/// the financial producer is left out, so the raw stage never completes.
fn mock_pipeline(with_financial: bool) -> (Arc<EventBus>, tempfile::TempDir) {
    let bus = Arc::new(EventBus::new());
    let warehouse = Arc::new(Mutex::new(Warehouse::open_in_memory().unwrap()));
    let blob_dir = tempfile::tempdir().unwrap();
    let blobs = Arc::new(BlobStore::new(blob_dir.path()));

    let sources: Vec<Arc<dyn NewsFeedSource>> = vec![Arc::new(MockFeedSource::new(
        "Wire",
        vec![sample_entry("Stocks rally", "Profits surge.")],
    ))];
    register_agent(
        &bus,
        Arc::new(NewsScraperAgent::new(
            Arc::clone(&bus),
            sources,
            Arc::clone(&blobs),
        )),
    );

    if with_financial {
        let provider = MockMarketDataProvider::new(vec![sample_bar(
            "SPY",
            session().date(),
            dec!(510.00),
        )]);
        register_agent(
            &bus,
            Arc::new(FinancialDataAgent::new(
                Arc::clone(&bus),
                Arc::new(provider),
                vec!["SPY".to_string()],
                Duration::ZERO,
            )),
        );
    }

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
            &AnalysisConfig::default(),
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

    (bus, blob_dir)
}

#[tokio::test]
async fn job_completes_and_returns_report_path() {
    let (bus, _blob_dir) = mock_pipeline(true);

    let outcome = mtap::run_daily_job(
        &bus,
        session(),
        Duration::from_secs(5),
        CancellationToken::new(),
    )
    .await;

    match outcome {
        JobOutcome::Completed { report_path } => {
            assert!(report_path.ends_with("2024-05-01_market_trend_report.html"));
            assert!(std::path::Path::new(&report_path).exists());
        }
        other => panic!("expected completion, got {other:?}"),
    }
}

#[tokio::test]
async fn job_times_out_when_a_signal_never_arrives() {
    // No financial producer: the raw-stage tracker waits forever.
    let (bus, _blob_dir) = mock_pipeline(false);

    let outcome = mtap::run_daily_job(
        &bus,
        session(),
        Duration::from_millis(100),
        CancellationToken::new(),
    )
    .await;

    assert_eq!(outcome, JobOutcome::TimedOut);
}

#[tokio::test]
async fn job_reports_cancellation() {
    let (bus, _blob_dir) = mock_pipeline(false);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = mtap::run_daily_job(&bus, session(), Duration::from_secs(5), cancel).await;
    assert_eq!(outcome, JobOutcome::Cancelled);
}

#[tokio::test]
async fn build_pipeline_registers_all_agents() {
    use mtap_models::EventKind;

    let dir = tempfile::tempdir().unwrap();
    let config_toml = format!(
        r#"
[[feeds]]
name = "Wire"
url = "http://127.0.0.1:9/rss"

[market]
symbols = ["SPY"]
api_key = "demo"
base_url = "http://127.0.0.1:9"
pause_between_requests_ms = 0

[storage]
warehouse_path = "{}"
blob_root = "{}"
"#,
        dir.path().join("warehouse.db").display(),
        dir.path().join("blobs").display(),
    );
    let config: MtapConfig = toml::from_str(&config_toml).unwrap();

    let bus = mtap::build_pipeline(&config).unwrap();

    // Both producers listen for the start event; every stage has a consumer.
    assert_eq!(bus.subscriber_count(EventKind::StartDailyJob), 2);
    assert_eq!(bus.subscriber_count(EventKind::NewsArticleRaw), 1);
    assert_eq!(bus.subscriber_count(EventKind::AllRawNewsGathered), 1);
    assert_eq!(bus.subscriber_count(EventKind::NewsProcessed), 1);
    assert_eq!(bus.subscriber_count(EventKind::FinancialProcessed), 1);
    assert_eq!(bus.subscriber_count(EventKind::TrendsIdentified), 1);
}
