//! Write the same `x`/`y` sample as `data.json`, `data.npy` and
//! `data.parquet` into the given directory (default: current directory).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::Float64Array;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

use column_source::data::npy;

/// Field order is the column order of the JSON file.
#[derive(Serialize)]
struct Sample {
    x: Vec<f64>,
    y: Vec<f64>,
}

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

fn sample() -> Sample {
    // Positions 0.0 → 49.5, step 0.5; weights peak at 20.
    let x: Vec<f64> = (0..100).map(|i| i as f64 * 0.5).collect();
    let y = x.iter().map(|&xi| gaussian(xi, 20.0, 5.0, 10.0)).collect();
    Sample { x, y }
}

fn write_json(path: &Path, sample: &Sample) -> Result<()> {
    let text = serde_json::to_string_pretty(sample).context("serializing JSON sample")?;
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

fn write_npy(path: &Path, sample: &Sample) -> Result<()> {
    let data: Vec<f64> = sample
        .x
        .iter()
        .zip(&sample.y)
        .flat_map(|(&x, &y)| [x, y])
        .collect();
    npy::write_matrix(path, &data, sample.x.len(), 2)?;
    Ok(())
}

fn write_parquet(path: &Path, sample: &Sample) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("x", DataType::Float64, false),
        Field::new("y", DataType::Float64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Float64Array::from(sample.x.clone())),
            Arc::new(Float64Array::from(sample.y.clone())),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let sample = sample();
    write_json(&out_dir.join("data.json"), &sample)?;
    write_npy(&out_dir.join("data.npy"), &sample)?;
    write_parquet(&out_dir.join("data.parquet"), &sample)?;

    println!(
        "Wrote {} rows to data.json, data.npy and data.parquet in {}",
        sample.x.len(),
        out_dir.display()
    );
    Ok(())
}
