use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mtap_bus::{Agent, EventBus};
use mtap_models::{Event, EventKind, SessionId};
use tracing::{debug, error, info};

use crate::sources::MarketDataProvider;

/// Fetches the latest daily bar for every configured symbol at the start of a
/// session.
///
/// Publishes one `financial_data_point_raw` per bar, then exactly one
/// `all_raw_financial_gathered_for_session` with the total count. Per-symbol
/// failures are logged and skipped. Requests are spaced out by a configurable
/// pause because free-tier providers rate limit aggressively.
pub struct FinancialDataAgent {
    bus: Arc<EventBus>,
    provider: Arc<dyn MarketDataProvider>,
    symbols: Vec<String>,
    pause: Duration,
}

impl FinancialDataAgent {
    pub fn new(
        bus: Arc<EventBus>,
        provider: Arc<dyn MarketDataProvider>,
        symbols: Vec<String>,
        pause: Duration,
    ) -> Self {
        Self {
            bus,
            provider,
            symbols,
            pause,
        }
    }

    async fn fetch_all(&self, session_id: SessionId) {
        let mut fetched = 0usize;

        for (i, symbol) in self.symbols.iter().enumerate() {
            let symbol = symbol.as_str();
            if i > 0 && !self.pause.is_zero() {
                debug!(session = %session_id, "Pausing between provider requests");
                tokio::time::sleep(self.pause).await;
            }

            info!(session = %session_id, symbol, provider = self.provider.name(), "Fetching daily bar");
            match self.provider.fetch_latest_daily(symbol).await {
                Ok(bar) => {
                    debug!(session = %session_id, symbol, date = %bar.date, "Fetched bar");
                    self.bus
                        .publish(Event::FinancialDataPointRaw { session_id, bar })
                        .await;
                    fetched += 1;
                }
                Err(e) => {
                    error!(session = %session_id, symbol, error = %e, "Failed to fetch daily bar");
                }
            }
        }

        info!(session = %session_id, count = fetched, "All fetching finished");
        self.bus
            .publish(Event::AllRawFinancialGathered {
                session_id,
                count: fetched,
            })
            .await;
    }
}

#[async_trait]
impl Agent for FinancialDataAgent {
    fn name(&self) -> &'static str {
        "financial_data"
    }

    fn subscriptions(&self) -> &'static [EventKind] {
        &[EventKind::StartDailyJob]
    }

    async fn handle(&self, event: Event) -> anyhow::Result<()> {
        if let Event::StartDailyJob { session_id } = event {
            self.fetch_all(session_id).await;
        }
        Ok(())
    }
}
