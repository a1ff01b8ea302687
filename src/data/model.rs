use std::fmt;
use std::path::Path;

use crate::error::{DataError, Result};

// ---------------------------------------------------------------------------
// Column – one named numeric sequence
// ---------------------------------------------------------------------------

/// A named, fixed-length sequence of numeric values.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Column {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Columns – ordered collection keyed by name
// ---------------------------------------------------------------------------

/// Ordered mapping from column name to values.
///
/// Order is whatever the decoder produced (JSON key order, `x`/`y` for NumPy
/// matrices, header order for CSV, schema order for Parquet) and is the order
/// used on export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Columns {
    columns: Vec<Column>,
}

impl Columns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. A name that already exists keeps its position and
    /// takes the new values.
    pub fn push(&mut self, name: impl Into<String>, values: Vec<f64>) {
        let name = name.into();
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.values = values,
            None => self.columns.push(Column::new(name, values)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Column> {
        self.columns.iter()
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Row count shared by every column, `None` when empty or ragged.
    pub fn row_count(&self) -> Option<usize> {
        let first = self.columns.first()?.len();
        self.columns
            .iter()
            .all(|c| c.len() == first)
            .then_some(first)
    }

    /// Check that every column has the length of the first one.
    ///
    /// `path` only feeds the error message.
    pub fn validate_lengths(&self, path: &Path) -> Result<()> {
        let Some(first) = self.columns.first() else {
            return Ok(());
        };
        for col in &self.columns[1..] {
            if col.len() != first.len() {
                return Err(DataError::shape(
                    path,
                    format!("{} values in '{}' (length of '{}')", first.len(), col.name, first.name),
                    format!("{} values", col.len()),
                ));
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Columns {
    type Item = &'a Column;
    type IntoIter = std::slice::Iter<'a, Column>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

impl fmt::Display for Columns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {:?}", col.name, col.values)?;
        }
        write!(f, "}}")
    }
}
