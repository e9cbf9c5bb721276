//! Trains the windowed LSTM regressor on a price-history CSV and exports
//! it as ONNX.
//!
//! # Usage
//! ```sh
//! train_export data/aapl.csv 10 models/aapl.onnx
//! ```
//!
//! Runs a single linear pass: load -> window -> train -> export. Wrong
//! arguments exit 1 with a usage message; every other failure propagates
//! with its diagnostic.

use clap::Parser;
use pricecast::model::{DEFAULT_EPOCHS, PriceModel};
use pricecast::{dataset, onnx};
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(about = "Train a windowed LSTM price regressor and export it as ONNX")]
struct Args {
    /// Input CSV with a "Close" column, as written by `fetch`
    input_csv: PathBuf,

    /// Sliding-window length in trading days
    window: usize,

    /// Output ONNX path; parent directories are created as needed
    onnx_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    // Setup logging
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            err.print().ok();
            process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };

    let closes = dataset::load_close_series(&args.input_csv)?;
    let (inputs, targets) = dataset::make_windows(&closes, args.window)?;
    println!(
        "Loaded {} closes from {} -> {} training samples",
        closes.len(),
        args.input_csv.display(),
        targets.len()
    );

    let mut model = PriceModel::new();
    model.fit(&inputs, &targets, DEFAULT_EPOCHS)?;

    onnx::export_model(&model, &args.onnx_path, args.window)?;
    println!("Exported ONNX model to {}", args.onnx_path.display());

    Ok(())
}
