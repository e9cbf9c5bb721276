//! CSV persistence and windowed dataset construction.
//!
//! The CSV written here is the only handoff between the two pipeline stages:
//! a header row `Date,Open,High,Low,Close,Volume` followed by one row per
//! trading day, in provider order.

use crate::error::PipelineError;
use crate::market::DailyBar;
use ndarray::{Array1, Array3};
use std::fs;
use std::path::Path;

/// Writes the full bar history as CSV, creating parent directories as
/// needed. Returns the number of rows written.
pub fn save_history(bars: &[DailyBar], path: &Path) -> Result<usize, PipelineError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    for bar in bars {
        writer.serialize(bar)?;
    }
    writer.flush()?;

    Ok(bars.len())
}

/// Reads the closing-price column from a history CSV.
pub fn load_close_series(path: &Path) -> Result<Vec<f32>, PipelineError> {
    let mut reader = csv::Reader::from_path(path)?;

    let close_idx = reader
        .headers()?
        .iter()
        .position(|header| header == "Close")
        .ok_or(PipelineError::MissingClose)?;

    let mut closes = Vec::new();
    for record in reader.records() {
        let record = record?;
        let value = record.get(close_idx).ok_or(PipelineError::MissingClose)?;
        closes.push(value.trim().parse::<f32>()?);
    }

    Ok(closes)
}

/// Slides a fixed-size window over the close series.
///
/// Sample `i` is `closes[i..i + window]` (with a trailing single-feature
/// axis) and its target is `closes[i + window]`, so a series of length `L`
/// yields exactly `L - window` samples. Windowing is purely positional:
/// missing trading days are spanned as if contiguous.
pub fn make_windows(
    closes: &[f32],
    window: usize,
) -> Result<(Array3<f32>, Array1<f32>), PipelineError> {
    if window == 0 || window >= closes.len() {
        return Err(PipelineError::WindowTooLarge {
            rows: closes.len(),
            window,
        });
    }

    let n_samples = closes.len() - window;
    let mut inputs = Array3::zeros((n_samples, window, 1));
    let mut targets = Array1::zeros(n_samples);

    for i in 0..n_samples {
        for t in 0..window {
            inputs[[i, t, 0]] = closes[i + t];
        }
        targets[i] = closes[i + window];
    }

    Ok((inputs, targets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_bars(n: usize) -> Vec<DailyBar> {
        (0..n)
            .map(|i| DailyBar {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64),
                open: 100.0 + i as f64,
                high: 101.0 + i as f64,
                low: 99.0 + i as f64,
                close: 100.5 + i as f64,
                volume: 1_000 + i as u64,
            })
            .collect()
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("pricecast-dataset-{}-{}", std::process::id(), name))
    }

    #[test]
    fn save_writes_header_and_rows() {
        let path = temp_path("save/nested/history.csv");
        let bars = sample_bars(3);

        let written = save_history(&bars, &path).unwrap();
        assert_eq!(written, 3);

        let contents = fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("Date,Open,High,Low,Close,Volume"));
        assert_eq!(lines.clone().count(), 3);
        assert!(lines.next().unwrap().starts_with("2024-01-01,"));

        fs::remove_file(&path).ok();
    }

    #[test]
    fn close_series_round_trips() {
        let path = temp_path("roundtrip.csv");
        let bars = sample_bars(5);
        save_history(&bars, &path).unwrap();

        let closes = load_close_series(&path).unwrap();
        assert_eq!(closes, vec![100.5, 101.5, 102.5, 103.5, 104.5]);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_close_column_is_a_lookup_error() {
        let path = temp_path("noclose.csv");
        fs::write(&path, "Date,Open\n2024-01-01,100.0\n").unwrap();

        let err = load_close_series(&path).unwrap_err();
        assert!(matches!(err, PipelineError::MissingClose));

        fs::remove_file(&path).ok();
    }

    #[test]
    fn windows_are_exact() {
        let closes: Vec<f32> = (0..8).map(|i| i as f32).collect();
        let (inputs, targets) = make_windows(&closes, 3).unwrap();

        assert_eq!(inputs.shape(), &[5, 3, 1]);
        assert_eq!(targets.len(), 5);

        for i in 0..5 {
            for t in 0..3 {
                assert_eq!(inputs[[i, t, 0]], closes[i + t]);
            }
            assert_eq!(targets[i], closes[i + 3]);
        }
    }

    #[test]
    fn oversized_window_is_rejected() {
        let closes: Vec<f32> = (0..4).map(|i| i as f32).collect();

        for window in [4, 10] {
            let err = make_windows(&closes, window).unwrap_err();
            assert!(matches!(
                err,
                PipelineError::WindowTooLarge { rows: 4, window: w } if w == window
            ));
        }
    }

    #[test]
    fn zero_window_is_rejected() {
        let closes = [1.0_f32, 2.0];
        assert!(matches!(
            make_windows(&closes, 0),
            Err(PipelineError::WindowTooLarge { .. })
        ));
    }
}
