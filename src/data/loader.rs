use std::fs::File;
use std::path::Path;

use arrow::array::{Array, Float32Array, Float64Array, Int32Array, Int64Array};
use log::debug;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::export::DEFAULT_DELIMITER;
use super::model::Columns;
use super::npy;
use crate::error::{DataError, Result};

// ---------------------------------------------------------------------------
// Decoder – the strategy a data source loads with
// ---------------------------------------------------------------------------

/// Turns a file into named numeric columns.
///
/// Implementations only decode; length validation and state handling live in
/// [`ColumnDataSource`](super::source::ColumnDataSource).
pub trait Decoder: Send + Sync {
    /// Short format name used in log messages.
    fn name(&self) -> &'static str;

    fn decode(&self, path: &Path) -> Result<Columns>;
}

/// Pick a decoder from the file extension.
///
/// Supported formats:
/// * `.json`                 – object of numeric arrays, one column per key
/// * `.npy`                  – NumPy 2-column matrix, columns `x` and `y`
/// * `.csv` / `.txt` / `.tsv` – delimited text with a `#` header comment
/// * `.parquet` / `.pq`      – flat numeric Parquet columns
pub fn decoder_for_path(path: &Path) -> Result<Box<dyn Decoder>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let decoder: Box<dyn Decoder> = match ext.as_str() {
        "json" => Box::new(JsonDecoder),
        "npy" => Box::new(NpyDecoder),
        "csv" | "txt" => Box::new(CsvDecoder::default()),
        "tsv" => Box::new(CsvDecoder::new('\t')),
        "parquet" | "pq" => Box::new(ParquetDecoder),
        _ => {
            return Err(DataError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    };
    Ok(decoder)
}

// ---------------------------------------------------------------------------
// JSON decoder
// ---------------------------------------------------------------------------

/// Expected layout, keys become columns in file order:
///
/// ```json
/// { "x": [1, 2, 3], "y": [4.0, 5.5, 6.0] }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl Decoder for JsonDecoder {
    fn name(&self) -> &'static str {
        "json"
    }

    fn decode(&self, path: &Path) -> Result<Columns> {
        let text = std::fs::read_to_string(path).map_err(|e| DataError::from_read(path, e))?;
        let root: JsonValue = serde_json::from_str(&text)
            .map_err(|e| DataError::decode(path, format!("invalid JSON: {e}")))?;

        let object = root
            .as_object()
            .ok_or_else(|| DataError::decode(path, "expected a top-level JSON object"))?;

        let mut columns = Columns::new();
        for (key, val) in object {
            columns.push(key.clone(), json_array_to_f64(val, key, path)?);
        }
        debug!("Decoded {} JSON column(s) from {}", columns.len(), path.display());
        Ok(columns)
    }
}

fn json_array_to_f64(val: &JsonValue, key: &str, path: &Path) -> Result<Vec<f64>> {
    let arr = val
        .as_array()
        .ok_or_else(|| DataError::decode(path, format!("'{key}' is not an array")))?;

    arr.iter()
        .enumerate()
        .map(|(j, v)| {
            v.as_f64()
                .ok_or_else(|| DataError::decode(path, format!("{key}[{j}]: not a number")))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// NumPy decoder
// ---------------------------------------------------------------------------

/// A `(rows, 2)` `.npy` matrix; column 0 becomes `x`, column 1 becomes `y`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NpyDecoder;

impl Decoder for NpyDecoder {
    fn name(&self) -> &'static str {
        "npy"
    }

    fn decode(&self, path: &Path) -> Result<Columns> {
        let buf = std::fs::read(path).map_err(|e| DataError::from_read(path, e))?;
        let matrix = npy::read_matrix(&buf, path)?;

        if matrix.cols != 2 || matrix.rows == 0 {
            return Err(DataError::shape(
                path,
                "(rows >= 1, 2)",
                format!("({}, {})", matrix.rows, matrix.cols),
            ));
        }

        let mut columns = Columns::new();
        columns.push("x", matrix.column(0));
        columns.push("y", matrix.column(1));
        debug!("Decoded ({}, 2) matrix from {}", matrix.rows, path.display());
        Ok(columns)
    }
}

// ---------------------------------------------------------------------------
// Delimited text decoder
// ---------------------------------------------------------------------------

/// Reads the layout written by `write_csv`:
///
/// ```text
/// # x,y
/// 1.00,4.00
/// 2.00,5.00
/// ```
///
/// The first line must be a `#` comment holding the column names.
#[derive(Debug, Clone, Copy)]
pub struct CsvDecoder {
    delimiter: char,
}

impl CsvDecoder {
    pub fn new(delimiter: char) -> Self {
        CsvDecoder { delimiter }
    }
}

impl Default for CsvDecoder {
    fn default() -> Self {
        CsvDecoder::new(DEFAULT_DELIMITER)
    }
}

impl Decoder for CsvDecoder {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn decode(&self, path: &Path) -> Result<Columns> {
        let delim = delimiter_byte(self.delimiter)?;
        let text = std::fs::read_to_string(path).map_err(|e| DataError::from_read(path, e))?;

        let (header, body) = text.split_once('\n').unwrap_or((text.as_str(), ""));
        let header = header
            .trim_end_matches('\r')
            .strip_prefix('#')
            .ok_or_else(|| DataError::decode(path, "first line is not a '#' header comment"))?;
        let names: Vec<String> = header
            .strip_prefix(' ')
            .unwrap_or(header)
            .split(self.delimiter)
            .map(|n| n.trim().to_string())
            .collect();

        let mut values: Vec<Vec<f64>> = vec![Vec::new(); names.len()];
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(delim)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(body.as_bytes());

        for (row_no, result) in reader.records().enumerate() {
            let row = row_no + 1;
            let record = result
                .map_err(|e| DataError::decode(path, format!("row {row}: {e}")))?;
            if record.len() != names.len() {
                return Err(DataError::shape(
                    path,
                    format!("{} fields in row {row}", names.len()),
                    format!("{} fields", record.len()),
                ));
            }
            for (j, field) in record.iter().enumerate() {
                let v = field.parse::<f64>().map_err(|_| {
                    DataError::decode(
                        path,
                        format!("row {row}, {}: '{field}' is not a number", names[j]),
                    )
                })?;
                values[j].push(v);
            }
        }

        let mut columns = Columns::new();
        for (name, vals) in names.into_iter().zip(values) {
            columns.push(name, vals);
        }
        debug!("Decoded {} delimited column(s) from {}", columns.len(), path.display());
        Ok(columns)
    }
}

/// The csv reader works on bytes, so the delimiter has to fit in one.
fn delimiter_byte(delimiter: char) -> Result<u8> {
    if delimiter.is_ascii() && !matches!(delimiter, '\n' | '\r' | '"') {
        Ok(delimiter as u8)
    } else {
        Err(DataError::InvalidDelimiter { delimiter })
    }
}

// ---------------------------------------------------------------------------
// Parquet decoder
// ---------------------------------------------------------------------------

/// Every field must be a flat `Float64`, `Float32`, `Int64` or `Int32`
/// column. Nulls become `NaN`. Works with files written by pandas, polars or
/// arrow directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParquetDecoder;

impl Decoder for ParquetDecoder {
    fn name(&self) -> &'static str {
        "parquet"
    }

    fn decode(&self, path: &Path) -> Result<Columns> {
        let file = File::open(path).map_err(|e| DataError::from_read(path, e))?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(|e| DataError::decode(path, format!("reading parquet metadata: {e}")))?;

        let names: Vec<String> = builder
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        let reader = builder
            .build()
            .map_err(|e| DataError::decode(path, format!("building parquet reader: {e}")))?;

        let mut values: Vec<Vec<f64>> = vec![Vec::new(); names.len()];
        for batch_result in reader {
            let batch = batch_result
                .map_err(|e| DataError::decode(path, format!("reading record batch: {e}")))?;

            for (idx, name) in names.iter().enumerate() {
                let col = batch.column(idx);
                let extracted = extract_f64_values(col.as_ref()).ok_or_else(|| {
                    DataError::decode(
                        path,
                        format!("column '{name}' has non-numeric type {:?}", col.data_type()),
                    )
                })?;
                values[idx].extend(extracted);
            }
        }

        let mut columns = Columns::new();
        for (name, vals) in names.into_iter().zip(values) {
            columns.push(name, vals);
        }
        debug!("Decoded {} parquet column(s) from {}", columns.len(), path.display());
        Ok(columns)
    }
}

/// Flatten a primitive numeric Arrow array to `f64`, or `None` for any other type.
fn extract_f64_values(col: &dyn Array) -> Option<Vec<f64>> {
    let any = col.as_any();
    if let Some(arr) = any.downcast_ref::<Float64Array>() {
        Some(arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(arr) = any.downcast_ref::<Float32Array>() {
        Some(arr.iter().map(|v| v.map_or(f64::NAN, f64::from)).collect())
    } else if let Some(arr) = any.downcast_ref::<Int64Array>() {
        Some(arr.iter().map(|v| v.map_or(f64::NAN, |i| i as f64)).collect())
    } else {
        any.downcast_ref::<Int32Array>()
            .map(|arr| arr.iter().map(|v| v.map_or(f64::NAN, f64::from)).collect())
    }
}
