//! Builds and writes the ONNX graph for a trained [`PriceModel`].
//!
//! The graph declares the batch-major input `input : float32[batch, window, 1]`
//! and runs `Transpose -> LSTM -> Squeeze -> Gemm`: ONNX LSTM consumes
//! time-major sequences, its `Y_h` output carries a leading num_directions
//! axis that gets squeezed away, and the Gemm is the linear head. ONNX packs
//! LSTM gates in i/o/f/c order, so the learned i/f/g/o blocks are re-packed
//! on the way out.

use super::proto::{
    AttributeProto, GraphProto, ModelProto, NodeProto, OperatorSetIdProto, TensorProto,
    TensorShapeProto, TypeProto, ValueInfoProto, attribute_proto, data_type, tensor_shape_proto,
    type_proto,
};
use crate::error::PipelineError;
use crate::model::PriceModel;
use ndarray::{Array1, Array2, s};
use prost::Message;
use std::fs;
use std::path::Path;

const IR_VERSION: i64 = 8;
const OPSET_VERSION: i64 = 13;

// Block order of the packed i/f/g/o weights when re-packed as ONNX i/o/f/c.
const ONNX_GATE_ORDER: [usize; 4] = [0, 3, 1, 2];

/// Serializes the model to `path`, creating parent directories as needed.
/// The file is written in one shot; a failed export leaves no partial state
/// to clean up beyond whatever the filesystem call itself did.
pub fn export_model(model: &PriceModel, path: &Path, window: usize) -> Result<(), PipelineError> {
    let model_proto = ModelProto {
        ir_version: IR_VERSION,
        producer_name: env!("CARGO_PKG_NAME").to_string(),
        producer_version: env!("CARGO_PKG_VERSION").to_string(),
        graph: Some(build_graph(model, window)),
        opset_import: vec![OperatorSetIdProto {
            domain: String::new(),
            version: OPSET_VERSION,
        }],
        ..Default::default()
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, model_proto.encode_to_vec())?;

    Ok(())
}

fn build_graph(model: &PriceModel, window: usize) -> GraphProto {
    let hidden = model.lstm.hidden_size as i64;
    let input_size = model.lstm.input_size as i64;

    let nodes = vec![
        node(
            "transpose_input",
            "Transpose",
            &["input"],
            &["input_time_major"],
            vec![ints_attribute("perm", &[1, 0, 2])],
        ),
        node(
            "lstm",
            "LSTM",
            &["input_time_major", "lstm_w", "lstm_r", "lstm_b"],
            // Y is unused; Y_h is the final hidden state.
            &["", "lstm_h"],
            vec![int_attribute("hidden_size", hidden)],
        ),
        node(
            "squeeze_directions",
            "Squeeze",
            &["lstm_h", "squeeze_axes"],
            &["last_hidden"],
            vec![],
        ),
        node(
            "head",
            "Gemm",
            &["last_hidden", "head_w", "head_b"],
            &["output"],
            vec![],
        ),
    ];

    let initializers = vec![
        float_tensor(
            "lstm_w",
            &[1, 4 * hidden, input_size],
            gate_blocks(&model.lstm.w_x, model.lstm.hidden_size),
        ),
        float_tensor(
            "lstm_r",
            &[1, 4 * hidden, hidden],
            gate_blocks(&model.lstm.w_h, model.lstm.hidden_size),
        ),
        float_tensor(
            "lstm_b",
            &[1, 8 * hidden],
            lstm_bias(&model.lstm.b, model.lstm.hidden_size),
        ),
        int64_tensor("squeeze_axes", &[1], &[0]),
        float_tensor(
            "head_w",
            &[hidden, 1],
            model.head.weights.iter().copied().collect(),
        ),
        float_tensor("head_b", &[1], model.head.biases.to_vec()),
    ];

    GraphProto {
        name: "pricecast".to_string(),
        node: nodes,
        initializer: initializers,
        input: vec![value_info(
            "input",
            vec![
                dim_param("batch"),
                dim_value(window as i64),
                dim_value(input_size),
            ],
        )],
        output: vec![value_info("output", vec![dim_param("batch"), dim_value(1)])],
        ..Default::default()
    }
}

/// Re-packs `[4 * hidden, cols]` gate rows from i/f/g/o into ONNX i/o/f/c
/// order, flattened row-major.
fn gate_blocks(weights: &Array2<f32>, hidden: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(weights.len());
    for block in ONNX_GATE_ORDER {
        out.extend(
            weights
                .slice(s![block * hidden..(block + 1) * hidden, ..])
                .iter()
                .copied(),
        );
    }
    out
}

/// ONNX carries separate input and recurrence biases; the model trains a
/// single combined bias, exported as Wb with Rb all zero.
fn lstm_bias(bias: &Array1<f32>, hidden: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(8 * hidden);
    for block in ONNX_GATE_ORDER {
        out.extend(
            bias.slice(s![block * hidden..(block + 1) * hidden])
                .iter()
                .copied(),
        );
    }
    out.resize(8 * hidden, 0.0);
    out
}

fn node(
    name: &str,
    op_type: &str,
    inputs: &[&str],
    outputs: &[&str],
    attribute: Vec<AttributeProto>,
) -> NodeProto {
    NodeProto {
        input: inputs.iter().map(|s| s.to_string()).collect(),
        output: outputs.iter().map(|s| s.to_string()).collect(),
        name: name.to_string(),
        op_type: op_type.to_string(),
        attribute,
        ..Default::default()
    }
}

fn int_attribute(name: &str, value: i64) -> AttributeProto {
    AttributeProto {
        name: name.to_string(),
        i: value,
        r#type: attribute_proto::AttributeType::Int as i32,
        ..Default::default()
    }
}

fn ints_attribute(name: &str, values: &[i64]) -> AttributeProto {
    AttributeProto {
        name: name.to_string(),
        ints: values.to_vec(),
        r#type: attribute_proto::AttributeType::Ints as i32,
        ..Default::default()
    }
}

fn float_tensor(name: &str, dims: &[i64], values: Vec<f32>) -> TensorProto {
    let mut raw_data = Vec::with_capacity(values.len() * 4);
    for value in &values {
        raw_data.extend_from_slice(&value.to_le_bytes());
    }

    TensorProto {
        dims: dims.to_vec(),
        data_type: data_type::FLOAT,
        name: name.to_string(),
        raw_data,
        ..Default::default()
    }
}

fn int64_tensor(name: &str, dims: &[i64], values: &[i64]) -> TensorProto {
    let mut raw_data = Vec::with_capacity(values.len() * 8);
    for value in values {
        raw_data.extend_from_slice(&value.to_le_bytes());
    }

    TensorProto {
        dims: dims.to_vec(),
        data_type: data_type::INT64,
        name: name.to_string(),
        raw_data,
        ..Default::default()
    }
}

fn value_info(name: &str, dims: Vec<tensor_shape_proto::dimension::Value>) -> ValueInfoProto {
    ValueInfoProto {
        name: name.to_string(),
        r#type: Some(TypeProto {
            tensor_type: Some(type_proto::Tensor {
                elem_type: data_type::FLOAT,
                shape: Some(TensorShapeProto {
                    dim: dims
                        .into_iter()
                        .map(|value| tensor_shape_proto::Dimension { value: Some(value) })
                        .collect(),
                }),
            }),
        }),
        ..Default::default()
    }
}

fn dim_value(value: i64) -> tensor_shape_proto::dimension::Value {
    tensor_shape_proto::dimension::Value::DimValue(value)
}

fn dim_param(name: &str) -> tensor_shape_proto::dimension::Value {
    tensor_shape_proto::dimension::Value::DimParam(name.to_string())
}
