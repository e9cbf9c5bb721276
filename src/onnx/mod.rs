//! ONNX interchange export for the trained model.

mod export;
pub mod proto;

pub use export::export_model;
