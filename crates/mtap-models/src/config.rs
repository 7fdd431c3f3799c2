use serde::{Deserialize, Serialize};

/// Top-level configuration for the MTAP pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MtapConfig {
    /// RSS feeds scraped by the news agent.
    pub feeds: Vec<FeedConfig>,
    pub market: MarketConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub job: JobConfig,
}

/// One RSS news feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Display name, recorded as `feed_source` on every article.
    pub name: String,
    pub url: String,
}

/// Market data provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Symbols to fetch a daily bar for.
    pub symbols: Vec<String>,
    pub api_key: String,
    #[serde(default = "default_market_base_url")]
    pub base_url: String,
    /// Pause between per-symbol requests. Free-tier providers rate limit
    /// aggressively (Alpha Vantage: 5 calls/minute).
    #[serde(default = "default_pause_ms")]
    pub pause_between_requests_ms: u64,
}

/// Warehouse and blob store locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite warehouse file.
    pub warehouse_path: String,
    /// Root directory for raw article blobs and rendered reports.
    pub blob_root: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// A daily close-to-close change above this percentage is an anomaly.
    #[serde(default = "default_anomaly_threshold")]
    pub anomaly_threshold_percent: f64,
    /// When true, a failed analysis step holds the session open instead of
    /// letting a degraded session finalize.
    #[serde(default)]
    pub require_analysis_success: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            anomaly_threshold_percent: default_anomaly_threshold(),
            require_analysis_success: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// How long the runner waits for the session's report before giving up.
    #[serde(default = "default_job_timeout")]
    pub timeout_seconds: u64,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_job_timeout(),
        }
    }
}

fn default_market_base_url() -> String {
    "https://www.alphavantage.co".to_string()
}
fn default_pause_ms() -> u64 {
    15_000
}
fn default_anomaly_threshold() -> f64 {
    5.0
}
fn default_job_timeout() -> u64 {
    1800
}
