//! Load named numeric columns from JSON, NumPy, delimited text or Parquet
//! files, compute the weighted mean of `x` by `y`, and export the columns as
//! delimited text with a commented header.

pub mod data;
pub mod error;

pub use data::export::{CsvOptions, DECIMALS, DEFAULT_DELIMITER};
pub use data::loader::{CsvDecoder, Decoder, JsonDecoder, NpyDecoder, ParquetDecoder};
pub use data::model::{Column, Columns};
pub use data::source::ColumnDataSource;
pub use error::{DataError, Result};
