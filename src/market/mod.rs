//! Market data types and the Yahoo Finance chart client.

mod yahoo;

pub use yahoo::YahooClient;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One trading day of OHLCV history.
///
/// Serialized verbatim as a CSV row; the field order here is the column
/// order of the output file, with the date index first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}
