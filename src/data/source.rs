use std::fmt;
use std::path::{Path, PathBuf};

use log::info;

use super::export::{write_columns, CsvOptions};
use super::loader::{
    decoder_for_path, CsvDecoder, Decoder, JsonDecoder, NpyDecoder, ParquetDecoder,
};
use super::model::Columns;
use crate::error::{DataError, Result};

// ---------------------------------------------------------------------------
// ColumnDataSource
// ---------------------------------------------------------------------------

/// A file bound to a decoding strategy, plus the columns last loaded from it.
///
/// ```no_run
/// use column_source::ColumnDataSource;
///
/// let mut source = ColumnDataSource::json("data.json");
/// source.load()?;
/// println!("{}", source.weighted_mean()?);
/// source.write_csv("data_from_json.csv", ',')?;
/// # Ok::<(), column_source::DataError>(())
/// ```
pub struct ColumnDataSource {
    source_path: PathBuf,
    decoder: Box<dyn Decoder>,
    /// `None` until `load` succeeds.
    columns: Option<Columns>,
}

impl ColumnDataSource {
    pub fn new(path: impl Into<PathBuf>, decoder: Box<dyn Decoder>) -> Self {
        ColumnDataSource {
            source_path: path.into(),
            decoder,
            columns: None,
        }
    }

    /// JSON object of numeric arrays.
    pub fn json(path: impl Into<PathBuf>) -> Self {
        Self::new(path, Box::new(JsonDecoder))
    }

    /// NumPy `(rows, 2)` matrix, loaded as `x` and `y`.
    pub fn npy(path: impl Into<PathBuf>) -> Self {
        Self::new(path, Box::new(NpyDecoder))
    }

    /// Delimited text as written by [`write_csv`](Self::write_csv).
    pub fn csv(path: impl Into<PathBuf>, delimiter: char) -> Self {
        Self::new(path, Box::new(CsvDecoder::new(delimiter)))
    }

    pub fn parquet(path: impl Into<PathBuf>) -> Self {
        Self::new(path, Box::new(ParquetDecoder))
    }

    /// Choose the decoder from the file extension.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let decoder = decoder_for_path(&path)?;
        Ok(Self::new(path, decoder))
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn format(&self) -> &'static str {
        self.decoder.name()
    }

    pub fn columns(&self) -> Option<&Columns> {
        self.columns.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.columns.is_some()
    }

    /// Decode the source file and replace the current columns.
    ///
    /// On failure the previously loaded columns (if any) are left as they were.
    pub fn load(&mut self) -> Result<&Columns> {
        let columns = self.decoder.decode(&self.source_path)?;
        columns.validate_lengths(&self.source_path)?;

        info!(
            "Loaded {} column(s) x {} row(s) from {} ({})",
            columns.len(),
            columns.row_count().unwrap_or(0),
            self.source_path.display(),
            self.decoder.name()
        );
        Ok(&*self.columns.insert(columns))
    }

    /// `sum(x * y) / sum(y)` over the `x` and `y` columns.
    ///
    /// A zero `sum(y)`, which includes empty columns, is reported as
    /// [`DataError::DivisionByZero`] rather than returning NaN or infinity.
    pub fn weighted_mean(&self) -> Result<f64> {
        let columns = self.loaded()?;
        let x = self.required(columns, "x")?;
        let y = self.required(columns, "y")?;

        if x.len() != y.len() {
            return Err(DataError::shape(
                &self.source_path,
                format!("{} values in 'y' (length of 'x')", x.len()),
                format!("{} values", y.len()),
            ));
        }

        let weights: f64 = y.iter().sum();
        if weights == 0.0 {
            return Err(DataError::DivisionByZero {
                path: self.source_path.clone(),
            });
        }
        let weighted: f64 = x.iter().zip(y).map(|(xi, yi)| xi * yi).sum();
        Ok(weighted / weights)
    }

    /// Export every column to `dest` with the default header marker.
    pub fn write_csv(&self, dest: impl AsRef<Path>, delimiter: char) -> Result<()> {
        self.write_csv_with(dest, &CsvOptions::with_delimiter(delimiter))
    }

    pub fn write_csv_with(&self, dest: impl AsRef<Path>, options: &CsvOptions) -> Result<()> {
        let columns = self.loaded()?;
        if columns.is_empty() {
            return Err(self.not_loaded());
        }
        write_columns(columns, dest.as_ref(), options)
    }

    fn loaded(&self) -> Result<&Columns> {
        self.columns.as_ref().ok_or_else(|| self.not_loaded())
    }

    fn required<'a>(&self, columns: &'a Columns, name: &str) -> Result<&'a [f64]> {
        columns.get(name).ok_or_else(|| DataError::MissingColumn {
            path: self.source_path.clone(),
            column: name.to_string(),
        })
    }

    fn not_loaded(&self) -> DataError {
        DataError::NotLoaded {
            path: self.source_path.clone(),
        }
    }
}

impl fmt::Debug for ColumnDataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDataSource")
            .field("source_path", &self.source_path)
            .field("format", &self.decoder.name())
            .field("columns", &self.columns)
            .finish()
    }
}
