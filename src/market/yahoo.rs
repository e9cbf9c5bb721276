//! Yahoo Finance v8 chart endpoint client.
//!
//! A single GET per ticker, fixed to the trailing 60 calendar days at daily
//! granularity. Unknown or delisted symbols come back from Yahoo as an error
//! payload (often with a 404 status); those and genuinely empty result sets
//! all surface as an empty bar list so the caller owns the empty-result
//! handling. Network and decode faults are real errors.

use super::DailyBar;
use anyhow::{Context, Result};
use chrono::DateTime;
use serde::Deserialize;
use tracing::{debug, info};

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const RANGE: &str = "60d";
const INTERVAL: &str = "1d";

// Yahoo rejects requests without a browser-looking user agent.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";

pub struct YahooClient {
    client: reqwest::Client,
    base_url: String,
}

impl YahooClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client, base_url }
    }

    /// Fetches the trailing 60 days of daily OHLCV bars for `ticker`.
    ///
    /// Returns an empty vector when the provider has no data for the symbol.
    pub async fn daily_history(&self, ticker: &str) -> Result<Vec<DailyBar>> {
        let url = format!(
            "{}/v8/finance/chart/{}?range={}&interval={}",
            self.base_url, ticker, RANGE, INTERVAL
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch daily history from Yahoo")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read Yahoo chart response")?;

        // Error payloads for bad symbols arrive with a non-success status but
        // still carry the chart envelope, so try to decode before giving up.
        let envelope: ChartEnvelope = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(err) => {
                if !status.is_success() {
                    anyhow::bail!("Yahoo chart request for {} failed: {}", ticker, status);
                }
                return Err(err).context("Failed to parse Yahoo chart response");
            }
        };

        let bars = bars_from_envelope(envelope, ticker);
        info!("YahooClient: fetched {} daily bars for {}", bars.len(), ticker);
        Ok(bars)
    }
}

impl Default for YahooClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

fn bars_from_envelope(envelope: ChartEnvelope, ticker: &str) -> Vec<DailyBar> {
    if let Some(error) = envelope.chart.error {
        debug!(
            "Yahoo reported {} for {}: {}",
            error.code, ticker, error.description
        );
        return Vec::new();
    }

    let Some(result) = envelope
        .chart
        .result
        .and_then(|mut results| (!results.is_empty()).then(|| results.remove(0)))
    else {
        return Vec::new();
    };

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    // Rows without a close (halted days) are skipped, matching the
    // provider's own CSV rendering of the same data.
    result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let close = quote.close.get(i).copied().flatten()?;
            let date = DateTime::from_timestamp(ts, 0)?.date_naive();

            Some(DailyBar {
                date,
                open: quote.open.get(i).copied().flatten().unwrap_or(close),
                high: quote.high.get(i).copied().flatten().unwrap_or(close),
                low: quote.low.get(i).copied().flatten().unwrap_or(close),
                close,
                volume: quote.volume.get(i).copied().flatten().unwrap_or(0),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn decode(body: &str) -> Vec<DailyBar> {
        let envelope: ChartEnvelope = serde_json::from_str(body).unwrap();
        bars_from_envelope(envelope, "TEST")
    }

    #[test]
    fn parses_chart_payload_and_skips_null_closes() {
        // 2024-01-02, 2024-01-03, 2024-01-04 in epoch seconds; the middle
        // row has a null close and must be dropped.
        let body = r#"{
            "chart": {
                "result": [{
                    "meta": {"symbol": "TEST"},
                    "timestamp": [1704188400, 1704274800, 1704361200],
                    "indicators": {
                        "quote": [{
                            "open": [100.0, null, 102.5],
                            "high": [101.0, null, 103.0],
                            "low": [99.5, null, 101.5],
                            "close": [100.5, null, 102.0],
                            "volume": [1000, null, 2000]
                        }]
                    }
                }],
                "error": null
            }
        }"#;

        let bars = decode(body);
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 100.5);
        assert_eq!(bars[0].volume, 1000);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[1].close, 102.0);
        assert_eq!(bars[1].date, NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
    }

    #[test]
    fn error_payload_yields_no_bars() {
        let body = r#"{
            "chart": {
                "result": null,
                "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}
            }
        }"#;

        assert!(decode(body).is_empty());
    }

    #[test]
    fn empty_result_yields_no_bars() {
        let body = r#"{"chart": {"result": [], "error": null}}"#;
        assert!(decode(body).is_empty());
    }
}
