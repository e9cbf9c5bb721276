//! Fetches the trailing 60 days of daily price history for a ticker and
//! persists it as CSV.
//!
//! # Usage
//! ```sh
//! fetch AAPL data/aapl.csv
//! ```
//!
//! Exits 1 with a diagnostic when the provider has no data for the symbol
//! or the arguments are wrong; network and filesystem faults propagate.

use clap::Parser;
use pricecast::dataset;
use pricecast::market::YahooClient;
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(about = "Fetch daily price history into a CSV")]
struct Args {
    /// Ticker symbol recognized by the market-data provider
    ticker: String,

    /// Output CSV path; parent directories are created as needed
    output_csv: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
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
            // Usage problems exit 1; --help stays informational.
            process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };

    let client = YahooClient::new();
    let bars = client.daily_history(&args.ticker).await?;

    if bars.is_empty() {
        println!("No data for {}", args.ticker);
        process::exit(1);
    }

    let written = dataset::save_history(&bars, &args.output_csv)?;
    println!("Saved {} rows to {}", written, args.output_csv.display());

    Ok(())
}
