use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use super::model::Columns;
use crate::error::{DataError, Result};

/// Delimiter used when the caller does not pick one.
pub const DEFAULT_DELIMITER: char = ',';

/// Every exported value is written with this many decimals.
pub const DECIMALS: usize = 2;

// ---------------------------------------------------------------------------
// Export options
// ---------------------------------------------------------------------------

/// How columns are laid out as delimited text.
///
/// Missing fields fall back to the defaults when deserialized, so the struct
/// can sit inside a larger config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// Field separator, any single character.
    pub delimiter: char,
    /// Marker written before the column names on the header line.
    pub comment: String,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            comment: "# ".to_string(),
        }
    }
}

impl CsvOptions {
    pub fn with_delimiter(delimiter: char) -> Self {
        Self {
            delimiter,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Write `columns` to `dest`: a commented header line with the column names,
/// then one row per index with every value at [`DECIMALS`] places.
///
/// The caller is expected to have checked that `columns` is non-empty; the
/// equal-length check is repeated here before the file is touched.
pub fn write_columns(columns: &Columns, dest: &Path, options: &CsvOptions) -> Result<()> {
    columns.validate_lengths(dest)?;
    let rows = columns.row_count().unwrap_or(0);

    let write_err = |source: std::io::Error| DataError::Write {
        path: dest.to_path_buf(),
        source,
    };

    let mut out = BufWriter::new(File::create(dest).map_err(write_err)?);
    let sep = options.delimiter.to_string();
    let header = columns.names().join(sep.as_str());
    writeln!(out, "{}{header}", options.comment).map_err(write_err)?;

    for row in 0..rows {
        let line = columns
            .iter()
            .map(|col| format!("{:.*}", DECIMALS, col.values[row]))
            .collect::<Vec<_>>()
            .join(sep.as_str());
        writeln!(out, "{line}").map_err(write_err)?;
    }
    out.flush().map_err(write_err)?;

    debug!(
        "Exported {rows} row(s) x {} column(s) to {}",
        columns.len(),
        dest.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xy() -> Columns {
        let mut cols = Columns::new();
        cols.push("x", vec![1.0, 2.0, 3.0]);
        cols.push("y", vec![4.0, 5.0, 6.0]);
        cols
    }

    #[test]
    fn writes_header_comment_and_two_decimals() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.csv");
        write_columns(&xy(), &dest, &CsvOptions::default()).unwrap();
        let text = std::fs::read_to_string(&dest).unwrap();
        assert_eq!(text, "# x,y\n1.00,4.00\n2.00,5.00\n3.00,6.00\n");
    }

    #[test]
    fn rounds_to_two_places() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.csv");
        let mut cols = Columns::new();
        cols.push("v", vec![1.23456, -0.001, 1e3]);
        write_columns(&cols, &dest, &CsvOptions::default()).unwrap();
        let text = std::fs::read_to_string(&dest).unwrap();
        assert_eq!(text, "# v\n1.23\n-0.00\n1000.00\n");
    }

    #[test]
    fn custom_delimiter_applies_to_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.tsv");
        write_columns(&xy(), &dest, &CsvOptions::with_delimiter('\t')).unwrap();
        let text = std::fs::read_to_string(&dest).unwrap();
        assert_eq!(text.lines().next(), Some("# x\ty"));
        assert_eq!(text.lines().nth(1), Some("1.00\t4.00"));
    }

    #[test]
    fn multi_byte_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.txt");
        write_columns(&xy(), &dest, &CsvOptions::with_delimiter('§')).unwrap();
        let text = std::fs::read_to_string(&dest).unwrap();
        assert_eq!(text, "# x§y\n1.00§4.00\n2.00§5.00\n3.00§6.00\n");
    }

    #[test]
    fn quote_delimiter_is_written_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.txt");
        write_columns(&xy(), &dest, &CsvOptions::with_delimiter('"')).unwrap();
        let text = std::fs::read_to_string(&dest).unwrap();
        assert_eq!(text.lines().nth(1), Some("1.00\"4.00"));
    }

    #[test]
    fn ragged_columns_fail_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.csv");
        let mut cols = xy();
        cols.push("z", vec![1.0]);
        let err = write_columns(&cols, &dest, &CsvOptions::default()).unwrap_err();
        assert!(matches!(err, DataError::Shape { .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn unwritable_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("missing").join("out.csv");
        let err = write_columns(&xy(), &dest, &CsvOptions::default()).unwrap_err();
        assert!(matches!(err, DataError::Write { .. }));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: CsvOptions = serde_json::from_str(r#"{"delimiter": ";"}"#).unwrap();
        assert_eq!(opts.delimiter, ';');
        assert_eq!(opts.comment, "# ");
    }
}
