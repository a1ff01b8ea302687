//! Minimal reader/writer for the NumPy `.npy` array format.
//!
//! Layout: `\x93NUMPY`, major and minor version bytes, a little-endian header
//! length (`u16` for 1.x, `u32` for 2.x/3.x), an ASCII Python dict literal
//! describing `descr`, `fortran_order` and `shape`, then the raw elements.
//!
//! Only what a numeric 2-D matrix needs is supported: integer and float
//! dtypes of either byte order, C or Fortran layout.

use std::io::Write;
use std::path::Path;

use crate::error::{DataError, Result};

const MAGIC: &[u8] = b"\x93NUMPY";
const HEADER_ALIGN: usize = 64;

// ---------------------------------------------------------------------------
// Dtype
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Float,
    Int,
    UInt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Dtype {
    kind: Kind,
    size: usize,
    little_endian: bool,
}

impl Dtype {
    /// Parse a numpy type string such as `<f8`, `|u1` or `>i4`.
    fn parse(descr: &str) -> Option<Self> {
        let mut chars = descr.chars();
        let order = chars.next()?;
        let little_endian = match order {
            '<' | '|' => true,
            '>' => false,
            '=' => cfg!(target_endian = "little"),
            _ => return None,
        };
        let kind = match chars.next()? {
            'f' => Kind::Float,
            'i' => Kind::Int,
            'u' => Kind::UInt,
            _ => return None,
        };
        let size: usize = chars.as_str().parse().ok()?;
        let supported = match kind {
            Kind::Float => matches!(size, 4 | 8),
            Kind::Int | Kind::UInt => matches!(size, 1 | 2 | 4 | 8),
        };
        supported.then_some(Dtype {
            kind,
            size,
            little_endian,
        })
    }

    fn element(&self, chunk: &[u8]) -> f64 {
        let little = self.little_endian;
        macro_rules! read_as {
            ($ty:ty) => {
                if little {
                    <$ty>::from_le_bytes(bytes(chunk)) as f64
                } else {
                    <$ty>::from_be_bytes(bytes(chunk)) as f64
                }
            };
        }
        match (self.kind, self.size) {
            (Kind::Float, 8) => read_as!(f64),
            (Kind::Float, _) => read_as!(f32),
            (Kind::Int, 8) => read_as!(i64),
            (Kind::Int, 4) => read_as!(i32),
            (Kind::Int, 2) => read_as!(i16),
            (Kind::Int, _) => read_as!(i8),
            (Kind::UInt, 8) => read_as!(u64),
            (Kind::UInt, 4) => read_as!(u32),
            (Kind::UInt, 2) => read_as!(u16),
            (Kind::UInt, _) => read_as!(u8),
        }
    }
}

fn bytes<const N: usize>(chunk: &[u8]) -> [u8; N] {
    let mut buf = [0u8; N];
    buf.copy_from_slice(chunk);
    buf
}

// ---------------------------------------------------------------------------
// Matrix
// ---------------------------------------------------------------------------

/// A decoded 2-D array stored row-major as `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// All values of column `c`, top to bottom.
    pub fn column(&self, c: usize) -> Vec<f64> {
        (0..self.rows).map(|r| self.data[r * self.cols + c]).collect()
    }
}

/// Decode the contents of a `.npy` file holding a 2-D numeric array.
///
/// `path` is only used for error messages.
pub fn read_matrix(buf: &[u8], path: &Path) -> Result<Matrix> {
    let bad = |reason: String| DataError::decode(path, reason);

    if buf.len() < MAGIC.len() + 2 || &buf[..MAGIC.len()] != MAGIC {
        return Err(bad("missing NUMPY magic string".into()));
    }
    let major = buf[MAGIC.len()];
    let mut pos = MAGIC.len() + 2;

    let header_len = match major {
        1 => {
            let raw = buf.get(pos..pos + 2).ok_or_else(|| bad("truncated header".into()))?;
            pos += 2;
            u16::from_le_bytes(bytes(raw)) as usize
        }
        2 | 3 => {
            let raw = buf.get(pos..pos + 4).ok_or_else(|| bad("truncated header".into()))?;
            pos += 4;
            u32::from_le_bytes(bytes(raw)) as usize
        }
        other => return Err(bad(format!("unsupported format version {other}"))),
    };

    let header_bytes = buf
        .get(pos..pos + header_len)
        .ok_or_else(|| bad("truncated header".into()))?;
    let header = std::str::from_utf8(header_bytes)
        .map_err(|e| bad(format!("header is not valid text: {e}")))?;
    pos += header_len;

    let descr = dict_value(header, "descr")
        .and_then(quoted)
        .ok_or_else(|| bad("header missing 'descr'".into()))?;
    let dtype = Dtype::parse(descr)
        .ok_or_else(|| bad(format!("unsupported dtype '{descr}'")))?;
    let fortran_order = match dict_value(header, "fortran_order") {
        Some(v) if v.starts_with("True") => true,
        Some(v) if v.starts_with("False") => false,
        _ => return Err(bad("header missing 'fortran_order'".into())),
    };
    let shape = dict_value(header, "shape")
        .and_then(tuple)
        .ok_or_else(|| bad("header missing 'shape'".into()))?;

    let [rows, cols] = shape[..] else {
        return Err(DataError::shape(path, "2-D array", format_shape(&shape)));
    };

    let payload = &buf[pos..];
    let needed = rows
        .checked_mul(cols)
        .and_then(|n| n.checked_mul(dtype.size))
        .ok_or_else(|| bad(format!("shape ({rows}, {cols}) too large")))?;
    if payload.len() < needed {
        return Err(bad(format!(
            "truncated data: expected {needed} bytes, found {}",
            payload.len()
        )));
    }

    let raw: Vec<f64> = payload[..needed]
        .chunks_exact(dtype.size)
        .map(|chunk| dtype.element(chunk))
        .collect();

    let data = if fortran_order && rows > 0 && cols > 0 {
        let mut data = vec![0.0; raw.len()];
        for c in 0..cols {
            for r in 0..rows {
                data[r * cols + c] = raw[c * rows + r];
            }
        }
        data
    } else {
        raw
    };

    Ok(Matrix { rows, cols, data })
}

/// Text following `'key':` in a header dict, leading whitespace trimmed.
fn dict_value<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    let needle = format!("'{key}'");
    let start = header.find(&needle)? + needle.len();
    let rest = header[start..].trim_start().strip_prefix(':')?;
    Some(rest.trim_start())
}

fn quoted(value: &str) -> Option<&str> {
    let quote = value.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let inner = &value[1..];
    inner.find(quote).map(|end| &inner[..end])
}

fn tuple(value: &str) -> Option<Vec<usize>> {
    let inner = value.strip_prefix('(')?;
    let inner = &inner[..inner.find(')')?];
    inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches('L').parse().ok())
        .collect()
}

fn format_shape(shape: &[usize]) -> String {
    match shape {
        [single] => format!("({single},)"),
        dims => format!(
            "({})",
            dims.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")
        ),
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Encode a row-major `rows x cols` matrix of `f64` as a version 1.0 `.npy`.
pub fn encode_matrix(data: &[f64], rows: usize, cols: usize) -> Vec<u8> {
    let mut header =
        format!("{{'descr': '<f8', 'fortran_order': False, 'shape': ({rows}, {cols}), }}");
    // magic + version + u16 length + header + '\n' must land on the alignment
    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    let padding = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
    header.extend(std::iter::repeat(' ').take(padding));
    header.push('\n');

    let mut out = Vec::with_capacity(unpadded + padding + data.len() * 8);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for v in data {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Write a row-major `rows x cols` matrix to `path` in `.npy` format.
pub fn write_matrix(path: &Path, data: &[f64], rows: usize, cols: usize) -> Result<()> {
    if data.len() != rows * cols {
        return Err(DataError::shape(
            path,
            format!("{} values for a ({rows}, {cols}) matrix", rows * cols),
            format!("{} values", data.len()),
        ));
    }
    let encoded = encode_matrix(data, rows, cols);
    let write_err = |source| DataError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = std::fs::File::create(path).map_err(write_err)?;
    file.write_all(&encoded).map_err(write_err)?;
    log::debug!("Wrote ({rows}, {cols}) matrix to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(major: u8, header: &str) -> Vec<u8> {
        let mut out = MAGIC.to_vec();
        out.extend_from_slice(&[major, 0]);
        if major == 1 {
            out.extend_from_slice(&(header.len() as u16).to_le_bytes());
        } else {
            out.extend_from_slice(&(header.len() as u32).to_le_bytes());
        }
        out.extend_from_slice(header.as_bytes());
        out
    }

    #[test]
    fn encoded_header_is_aligned() {
        let encoded = encode_matrix(&[1.0, 2.0, 3.0, 4.0], 2, 2);
        assert_eq!((encoded.len() - 4 * 8) % HEADER_ALIGN, 0);
        assert_eq!(encoded[encoded.len() - 4 * 8 - 1], b'\n');
    }

    #[test]
    fn reads_back_encoded_matrix() {
        let encoded = encode_matrix(&[1.0, 4.0, 2.0, 5.0, 3.0, 6.0], 3, 2);
        let m = read_matrix(&encoded, Path::new("t.npy")).unwrap();
        assert_eq!((m.rows, m.cols), (3, 2));
        assert_eq!(m.column(0), vec![1.0, 2.0, 3.0]);
        assert_eq!(m.column(1), vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn reads_fortran_ordered_int32() {
        let mut buf = header_bytes(
            1,
            "{'descr': '<i4', 'fortran_order': True, 'shape': (2, 2), }\n",
        );
        // column-major: col0 = [1, 2], col1 = [10, 20]
        for v in [1i32, 2, 10, 20] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        let m = read_matrix(&buf, Path::new("t.npy")).unwrap();
        assert_eq!(m.column(0), vec![1.0, 2.0]);
        assert_eq!(m.column(1), vec![10.0, 20.0]);
    }

    #[test]
    fn reads_big_endian_f4_version_two() {
        let mut buf = header_bytes(
            2,
            "{'descr': '>f4', 'fortran_order': False, 'shape': (1, 2), }\n",
        );
        for v in [1.5f32, -2.25] {
            buf.extend_from_slice(&v.to_be_bytes());
        }
        let m = read_matrix(&buf, Path::new("t.npy")).unwrap();
        assert_eq!(m.column(0), vec![1.5]);
        assert_eq!(m.column(1), vec![-2.25]);
    }

    #[test]
    fn rejects_bad_magic() {
        let err = read_matrix(b"not a numpy file", Path::new("t.npy")).unwrap_err();
        assert!(matches!(err, DataError::Decode { .. }));
    }

    #[test]
    fn rejects_unknown_dtype() {
        let buf = header_bytes(
            1,
            "{'descr': '<c16', 'fortran_order': False, 'shape': (1, 2), }\n",
        );
        let err = read_matrix(&buf, Path::new("t.npy")).unwrap_err();
        assert!(err.to_string().contains("unsupported dtype"));
    }

    #[test]
    fn rejects_one_dimensional_shape() {
        let mut buf = header_bytes(
            1,
            "{'descr': '<f8', 'fortran_order': False, 'shape': (3,), }\n",
        );
        buf.extend_from_slice(&[0u8; 24]);
        match read_matrix(&buf, Path::new("t.npy")).unwrap_err() {
            DataError::Shape { found, .. } => assert_eq!(found, "(3,)"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_shape_that_overflows_byte_count() {
        let mut buf = header_bytes(
            1,
            "{'descr': '<f8', 'fortran_order': False, 'shape': (4611686018427387904, 2), }\n",
        );
        buf.extend_from_slice(&[0u8; 16]);
        let err = read_matrix(&buf, Path::new("t.npy")).unwrap_err();
        assert!(matches!(err, DataError::Decode { .. }));
        assert!(err.to_string().contains("too large"), "{err}");
    }

    #[test]
    fn rejects_truncated_payload() {
        let mut encoded = encode_matrix(&[1.0, 2.0, 3.0, 4.0], 2, 2);
        encoded.truncate(encoded.len() - 3);
        let err = read_matrix(&encoded, Path::new("t.npy")).unwrap_err();
        assert!(err.to_string().contains("truncated data"));
    }

    #[test]
    fn write_matrix_checks_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_matrix(&dir.path().join("m.npy"), &[1.0, 2.0, 3.0], 2, 2).unwrap_err();
        assert!(matches!(err, DataError::Shape { .. }));
    }
}
