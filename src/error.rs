use thiserror::Error;

/// Errors raised by the ingestion and training pipeline.
///
/// Only conditions the pipeline explicitly guards against get a variant;
/// everything else (network, filesystem, encoding) propagates through the
/// transparent conversions or as `anyhow` errors in the binaries.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("CSV has no \"Close\" column")]
    MissingClose,

    #[error("window {window} requires more than {rows} rows of history")]
    WindowTooLarge { rows: usize, window: usize },

    #[error("training dataset is empty, refusing to fit")]
    EmptyDataset,

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("non-numeric value in Close column: {0}")]
    BadClose(#[from] std::num::ParseFloatError),
}
