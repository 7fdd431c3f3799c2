use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use mtap_models::DailyBar;
use rust_decimal::Decimal;

use super::MarketDataProvider;
use crate::error::AgentError;

/// Daily-bar provider backed by the Alpha Vantage `TIME_SERIES_DAILY` API.
pub struct AlphaVantageProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AlphaVantageProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl MarketDataProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        "alpha_vantage"
    }

    async fn fetch_latest_daily(&self, symbol: &str) -> Result<DailyBar, AgentError> {
        let url = format!("{}/query", self.base_url);
        let body: serde_json::Value = self
            .client
            .get(&url)
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol),
                ("apikey", self.api_key.as_str()),
                ("outputsize", "compact"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_latest_bar(symbol, &body)
    }
}

/// Extract the most recent bar from a `TIME_SERIES_DAILY` response body.
///
/// Rate-limited responses return HTTP 200 with a `Note`/`Information` field
/// instead of data; those surface as a provider error for the symbol.
pub(crate) fn parse_latest_bar(
    symbol: &str,
    body: &serde_json::Value,
) -> Result<DailyBar, AgentError> {
    let series = body
        .get("Time Series (Daily)")
        .and_then(|v| v.as_object())
        .ok_or_else(|| {
            let detail = body
                .get("Note")
                .or_else(|| body.get("Information"))
                .and_then(|v| v.as_str())
                .unwrap_or("missing time series");
            AgentError::Provider(format!("{symbol}: {detail}"))
        })?;

    let (date_str, point) = series
        .iter()
        .max_by(|a, b| a.0.cmp(b.0))
        .ok_or_else(|| AgentError::Provider(format!("{symbol}: empty time series")))?;

    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|e| AgentError::Parse(format!("{symbol} date {date_str:?}: {e}")))?;

    let price = |key: &str| -> Result<Decimal, AgentError> {
        let raw = point
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| AgentError::Parse(format!("{symbol}: missing field {key:?}")))?;
        Decimal::from_str(raw).map_err(|e| AgentError::Parse(format!("{symbol} {key}: {e}")))
    };

    let volume = point
        .get("5. volume")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(0);

    Ok(DailyBar {
        symbol: symbol.to_string(),
        date,
        open: price("1. open")?,
        high: price("2. high")?,
        low: price("3. low")?,
        close: price("4. close")?,
        volume,
        fetched_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_body() -> serde_json::Value {
        serde_json::json!({
            "Meta Data": {"2. Symbol": "SPY"},
            "Time Series (Daily)": {
                "2024-04-30": {
                    "1. open": "500.10",
                    "2. high": "505.00",
                    "3. low": "499.25",
                    "4. close": "503.40",
                    "5. volume": "75000000"
                },
                "2024-05-01": {
                    "1. open": "503.50",
                    "2. high": "512.00",
                    "3. low": "503.00",
                    "4. close": "510.25",
                    "5. volume": "82000000"
                }
            }
        })
    }

    #[test]
    fn picks_the_latest_date() {
        let bar = parse_latest_bar("SPY", &sample_body()).unwrap();
        assert_eq!(bar.date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(bar.open, dec!(503.50));
        assert_eq!(bar.close, dec!(510.25));
        assert_eq!(bar.volume, 82_000_000);
    }

    #[test]
    fn rate_limit_note_is_a_provider_error() {
        let body = serde_json::json!({
            "Note": "Thank you for using Alpha Vantage! Our standard API rate limit is 25 requests per day."
        });
        let err = parse_latest_bar("SPY", &body).unwrap_err();
        assert!(matches!(err, AgentError::Provider(_)));
        assert!(err.to_string().contains("rate limit"));
    }

    #[test]
    fn missing_series_is_a_provider_error() {
        let err = parse_latest_bar("SPY", &serde_json::json!({})).unwrap_err();
        assert!(matches!(err, AgentError::Provider(_)));
    }

    #[test]
    fn malformed_price_is_a_parse_error() {
        let body = serde_json::json!({
            "Time Series (Daily)": {
                "2024-05-01": {
                    "1. open": "not a number",
                    "2. high": "1",
                    "3. low": "1",
                    "4. close": "1",
                    "5. volume": "1"
                }
            }
        });
        let err = parse_latest_bar("SPY", &body).unwrap_err();
        assert!(matches!(err, AgentError::Parse(_)));
    }
}
