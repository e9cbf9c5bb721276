//! End-to-end pipeline test: synthetic history CSV -> windowed dataset ->
//! training -> ONNX export -> inference through a real ONNX runtime.

use chrono::NaiveDate;
use ndarray::Array3;
use pricecast::PipelineError;
use pricecast::dataset::{load_close_series, make_windows, save_history};
use pricecast::market::DailyBar;
use pricecast::model::PriceModel;
use pricecast::onnx::export_model;
use std::fs;
use std::path::PathBuf;

const WINDOW: usize = 10;

fn workdir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("pricecast-e2e-{}-{}", std::process::id(), name));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn synthetic_history(rows: usize) -> Vec<DailyBar> {
    (0..rows)
        .map(|i| {
            let close = 100.0 + i as f64;
            DailyBar {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64),
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 10_000 + i as u64,
            }
        })
        .collect()
}

#[test]
fn csv_to_trained_onnx_model() {
    let dir = workdir("full");
    let csv_path = dir.join("history.csv");
    let onnx_path = dir.join("model.onnx");

    let written = save_history(&synthetic_history(30), &csv_path).unwrap();
    assert_eq!(written, 30);

    let closes = load_close_series(&csv_path).unwrap();
    assert_eq!(closes.len(), 30);
    assert!(closes.windows(2).all(|pair| pair[0] < pair[1]));

    let (inputs, targets) = make_windows(&closes, WINDOW).unwrap();
    assert_eq!(inputs.shape(), &[20, WINDOW, 1]);
    assert_eq!(targets.len(), 20);

    let mut model = PriceModel::new();
    model.fit(&inputs, &targets, 5).unwrap();

    export_model(&model, &onnx_path, WINDOW).unwrap();
    assert!(fs::metadata(&onnx_path).unwrap().len() > 0);

    // Round trip through the runtime: an all-zero (1, window, 1) input must
    // produce a single finite scalar that agrees with the native forward
    // pass.
    let native = model.predict(&Array3::zeros((1, WINDOW, 1)))[0];

    let mut session = ort::session::Session::builder()
        .unwrap()
        .commit_from_file(&onnx_path)
        .unwrap();

    let shape = vec![1usize, WINDOW, 1];
    let input_value = ort::value::Value::from_array((shape.as_slice(), vec![0.0_f32; WINDOW]))
        .unwrap();
    let outputs = session.run(ort::inputs![input_value]).unwrap();

    let output = outputs.iter().next().map(|(_, value)| value).unwrap();
    let (_, data) = output.try_extract_tensor::<f32>().unwrap();

    assert_eq!(data.len(), 1);
    assert!(data[0].is_finite());
    assert!(
        (data[0] - native).abs() < 1e-3,
        "runtime output {} diverges from native {}",
        data[0],
        native
    );

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn short_series_fails_loudly_instead_of_training_on_nothing() {
    let closes: Vec<f32> = (0..WINDOW as u32).map(|i| i as f32).collect();

    // window == len: zero samples must be an error, not an empty success.
    assert!(matches!(
        make_windows(&closes, WINDOW),
        Err(PipelineError::WindowTooLarge { .. })
    ));

    let mut model = PriceModel::new();
    assert!(matches!(
        model.fit(&Array3::zeros((0, WINDOW, 1)), &ndarray::Array1::zeros(0), 5),
        Err(PipelineError::EmptyDataset)
    ));
}
