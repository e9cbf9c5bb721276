pub mod dataset;
pub mod error;
pub mod market;
pub mod model;
pub mod onnx;

pub use error::PipelineError;
