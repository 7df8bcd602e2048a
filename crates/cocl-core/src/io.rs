// crates/cocl-core/src/io.rs

//! Matrix and label file I/O.
//!
//! Two on-disk formats are supported:
//! - **Matrix**: NPY dense-array binary (versions 1.x/2.x), restricted to
//!   2-D little-endian `f32` in C order, which is what the clustering engine
//!   consumes. Anything else (wrong dtype, Fortran order, other ranks) is
//!   rejected at load time rather than silently reinterpreted.
//! - **Labels**: plain text. The input format carries three
//!   whitespace-separated records: `numRows numCols`, `R C`, then
//!   `numRows + numCols` integers (row labels first). The output format is
//!   one label per line, rows then columns.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::labels::{validate_labels, LabelAxis};
use crate::matrix::DenseMatrix;

const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Parsed contents of an initial-labels file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelSpec {
    /// Declared matrix row count.
    pub num_rows: usize,
    /// Declared matrix column count.
    pub num_cols: usize,
    /// Number of row clusters R.
    pub row_clusters: u32,
    /// Number of column clusters C.
    pub col_clusters: u32,
    /// Initial row labels, length `num_rows`.
    pub row_labels: Vec<u32>,
    /// Initial column labels, length `num_cols`.
    pub col_labels: Vec<u32>,
}

/// Ensure the parent directory for a file exists (no-op if none).
fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating parent directory {}", dir.display()))?;
        }
    }
    Ok(())
}

/// ------------------------------
/// NPY matrix I/O
/// ------------------------------

/// Read a 2-D little-endian `f32` C-order NPY file into a [`DenseMatrix`].
///
/// # Errors
/// Fails on I/O errors, malformed headers, non-`<f4` dtype, Fortran order,
/// non-2-D shape, or a payload that disagrees with the declared shape.
pub fn read_matrix_npy<P: AsRef<Path>>(path: P) -> Result<DenseMatrix> {
    let path_ref = path.as_ref();
    let f = File::open(path_ref).with_context(|| format!("open {}", path_ref.display()))?;
    let mut rdr = BufReader::new(f);

    let mut magic = [0u8; 6];
    rdr.read_exact(&mut magic).context("read NPY magic")?;
    if &magic != NPY_MAGIC {
        bail!("{} is not an NPY file (bad magic)", path_ref.display());
    }

    let major = rdr.read_u8().context("read NPY major version")?;
    let _minor = rdr.read_u8().context("read NPY minor version")?;
    let header_len = match major {
        1 => usize::from(rdr.read_u16::<LittleEndian>().context("read NPY header length")?),
        2 | 3 => rdr.read_u32::<LittleEndian>().context("read NPY header length")? as usize,
        other => bail!("unsupported NPY version {other}"),
    };

    let mut header = vec![0u8; header_len];
    rdr.read_exact(&mut header).context("read NPY header")?;
    let header = std::str::from_utf8(&header).context("NPY header is not valid UTF-8")?;

    let descr = header_str_field(header, "descr")?;
    if descr != "<f4" {
        bail!("unsupported NPY dtype {descr:?} (expected little-endian f32 \"<f4\")");
    }
    if header_bool_field(header, "fortran_order")? {
        bail!("Fortran-ordered NPY input is not supported (expected C order)");
    }
    let shape = header_shape_field(header)?;
    let [num_rows, num_cols] = match shape[..] {
        [r, c] => [r, c],
        _ => bail!("matrix must be 2-D, got {}-D shape {:?}", shape.len(), shape),
    };

    let cells = num_rows
        .checked_mul(num_cols)
        .ok_or_else(|| anyhow!("matrix shape {num_rows}x{num_cols} overflows"))?;
    let mut data = vec![0f32; cells];
    rdr.read_f32_into::<LittleEndian>(&mut data)
        .with_context(|| format!("read {cells} f32 cells"))?;

    // A longer payload means the header lied about the shape.
    let mut probe = [0u8; 1];
    if rdr.read(&mut probe).context("probe for trailing bytes")? != 0 {
        bail!("trailing bytes after {num_rows}x{num_cols} payload");
    }

    DenseMatrix::from_vec(num_rows, num_cols, data).map_err(Into::into)
}

/// Write a [`DenseMatrix`] as an NPY v1.0 file (`<f4`, C order).
///
/// # Errors
/// Fails on I/O errors or if the header would not fit the v1 length field.
pub fn write_matrix_npy<P: AsRef<Path>>(path: P, matrix: &DenseMatrix) -> Result<()> {
    let path_ref = path.as_ref();
    ensure_parent_dir(path_ref)?;
    let f = File::create(path_ref).with_context(|| format!("create {}", path_ref.display()))?;
    let mut w = BufWriter::new(f);

    let mut header = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {}), }}",
        matrix.num_rows(),
        matrix.num_cols()
    );
    // Pad with spaces so magic + version + length + header is 64-aligned,
    // terminated by a newline.
    let unpadded = NPY_MAGIC.len() + 2 + 2 + header.len() + 1;
    header.extend(std::iter::repeat(' ').take(unpadded.next_multiple_of(64) - unpadded));
    header.push('\n');
    let header_len = u16::try_from(header.len()).context("NPY header too long for v1.0")?;

    w.write_all(NPY_MAGIC)?;
    w.write_all(&[1, 0])?;
    w.write_u16::<LittleEndian>(header_len)?;
    w.write_all(header.as_bytes())?;
    for &value in matrix.data() {
        w.write_f32::<LittleEndian>(value)?;
    }
    w.flush().context("flush NPY output")?;
    Ok(())
}

fn header_str_field(header: &str, key: &str) -> Result<String> {
    let rest = field_value(header, key)?;
    let rest = rest.trim_start();
    let quote = rest
        .chars()
        .next()
        .filter(|&c| c == '\'' || c == '"')
        .ok_or_else(|| anyhow!("NPY header field {key:?} is not a string"))?;
    let rest = &rest[1..];
    let end = rest
        .find(quote)
        .ok_or_else(|| anyhow!("unterminated string for NPY header field {key:?}"))?;
    Ok(rest[..end].to_owned())
}

fn header_bool_field(header: &str, key: &str) -> Result<bool> {
    let rest = field_value(header, key)?;
    let rest = rest.trim_start();
    if rest.starts_with("True") {
        Ok(true)
    } else if rest.starts_with("False") {
        Ok(false)
    } else {
        Err(anyhow!("NPY header field {key:?} is not a boolean"))
    }
}

fn header_shape_field(header: &str) -> Result<Vec<usize>> {
    let rest = field_value(header, "shape")?;
    let rest = rest.trim_start();
    let open = rest
        .strip_prefix('(')
        .ok_or_else(|| anyhow!("NPY shape is not a tuple"))?;
    let end = open
        .find(')')
        .ok_or_else(|| anyhow!("unterminated NPY shape tuple"))?;
    open[..end]
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().with_context(|| format!("bad shape entry {s:?}")))
        .collect()
}

/// Locate `key` in the header dict and return the text after its colon.
fn field_value<'a>(header: &'a str, key: &str) -> Result<&'a str> {
    for quote in ['\'', '"'] {
        let needle = format!("{quote}{key}{quote}");
        if let Some(pos) = header.find(&needle) {
            let rest = &header[pos + needle.len()..];
            let rest = rest.trim_start();
            return rest
                .strip_prefix(':')
                .ok_or_else(|| anyhow!("NPY header field {key:?} has no value"));
        }
    }
    Err(anyhow!("NPY header is missing field {key:?}"))
}

/// ------------------------------
/// Label file I/O
/// ------------------------------

/// Read and validate an initial-labels file.
///
/// # Errors
/// Fails on I/O errors, token-count mismatches, zero cluster counts, or
/// labels outside their declared ranges.
pub fn read_label_file<P: AsRef<Path>>(path: P) -> Result<LabelSpec> {
    let path_ref = path.as_ref();
    let text = fs::read_to_string(path_ref)
        .with_context(|| format!("open {}", path_ref.display()))?;
    let mut tokens = text.split_whitespace();

    let mut next_usize = |what: &str| -> Result<usize> {
        tokens
            .next()
            .ok_or_else(|| anyhow!("label file ended before {what}"))?
            .parse::<usize>()
            .with_context(|| format!("parse {what}"))
    };

    let num_rows = next_usize("matrix row count")?;
    let num_cols = next_usize("matrix column count")?;
    let row_clusters = u32::try_from(next_usize("row cluster count R")?)
        .context("row cluster count R out of range")?;
    let col_clusters = u32::try_from(next_usize("column cluster count C")?)
        .context("column cluster count C out of range")?;
    if row_clusters == 0 || col_clusters == 0 {
        bail!("cluster counts must be positive (got R={row_clusters}, C={col_clusters})");
    }

    let mut read_labels = |axis: LabelAxis, n: usize| -> Result<Vec<u32>> {
        let mut out = Vec::with_capacity(n);
        for index in 0..n {
            let token = tokens
                .next()
                .ok_or_else(|| anyhow!("label file ended at {axis} label {index}"))?;
            out.push(
                token
                    .parse::<u32>()
                    .with_context(|| format!("parse {axis} label {index}"))?,
            );
        }
        Ok(out)
    };

    let row_labels = read_labels(LabelAxis::Rows, num_rows)?;
    let col_labels = read_labels(LabelAxis::Columns, num_cols)?;
    if let Some(extra) = tokens.next() {
        bail!("unexpected trailing token {extra:?} in label file");
    }

    validate_labels(LabelAxis::Rows, &row_labels, num_rows, row_clusters)?;
    validate_labels(LabelAxis::Columns, &col_labels, num_cols, col_clusters)?;

    Ok(LabelSpec {
        num_rows,
        num_cols,
        row_clusters,
        col_clusters,
        row_labels,
        col_labels,
    })
}

/// Write a [`LabelSpec`] in the initial-labels input format.
///
/// # Errors
/// Fails on I/O errors.
pub fn write_label_file<P: AsRef<Path>>(path: P, spec: &LabelSpec) -> Result<()> {
    let path_ref = path.as_ref();
    ensure_parent_dir(path_ref)?;
    let f = File::create(path_ref).with_context(|| format!("create {}", path_ref.display()))?;
    let mut w = BufWriter::new(f);

    writeln!(w, "{} {}", spec.num_rows, spec.num_cols)?;
    writeln!(w, "{} {}", spec.row_clusters, spec.col_clusters)?;
    let mut line = String::new();
    for (i, label) in spec
        .row_labels
        .iter()
        .chain(spec.col_labels.iter())
        .enumerate()
    {
        if i > 0 {
            line.push(' ');
        }
        line.push_str(&label.to_string());
    }
    writeln!(w, "{line}")?;
    w.flush().context("flush label file")?;
    Ok(())
}

/// Write final labels: `num_rows` row labels then `num_cols` column labels,
/// one per line.
///
/// # Errors
/// Fails on I/O errors.
pub fn write_final_labels<P: AsRef<Path>>(
    path: P,
    row_labels: &[u32],
    col_labels: &[u32],
) -> Result<()> {
    let path_ref = path.as_ref();
    ensure_parent_dir(path_ref)?;
    let f = File::create(path_ref).with_context(|| format!("create {}", path_ref.display()))?;
    let mut w = BufWriter::new(f);
    for label in row_labels.iter().chain(col_labels.iter()) {
        writeln!(w, "{label}")?;
    }
    w.flush().context("flush label output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_path(name: &str, ext: &str) -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        p.push(format!("cocl_core_io_{name}_{nanos}.{ext}"));
        p
    }

    #[test]
    fn npy_roundtrip() {
        let path = tmp_path("matrix", "npy");
        let m = DenseMatrix::from_rows(vec![vec![1.0, -2.5, 0.0], vec![4.0, 5.5, -6.0]]).unwrap();
        write_matrix_npy(&path, &m).unwrap();
        let got = read_matrix_npy(&path).unwrap();
        assert_eq!(got, m);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn npy_rejects_bad_magic() {
        let path = tmp_path("bogus", "npy");
        fs::write(&path, b"not an npy file").unwrap();
        let err = read_matrix_npy(&path).unwrap_err();
        assert!(err.to_string().contains("bad magic"), "{err}");
        let _ = fs::remove_file(path);
    }

    #[test]
    fn npy_rejects_one_dimensional_shape() {
        let path = tmp_path("onedim", "npy");
        let header = "{'descr': '<f4', 'fortran_order': False, 'shape': (3,), }\n";
        let mut bytes = Vec::new();
        bytes.extend_from_slice(NPY_MAGIC);
        bytes.extend_from_slice(&[1, 0]);
        bytes.extend_from_slice(&u16::try_from(header.len()).unwrap().to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(&[0u8; 12]);
        fs::write(&path, bytes).unwrap();
        let err = read_matrix_npy(&path).unwrap_err();
        assert!(err.to_string().contains("2-D"), "{err}");
        let _ = fs::remove_file(path);
    }

    #[test]
    fn label_file_roundtrip() {
        let path = tmp_path("labels", "txt");
        let spec = LabelSpec {
            num_rows: 4,
            num_cols: 3,
            row_clusters: 2,
            col_clusters: 2,
            row_labels: vec![0, 1, 0, 1],
            col_labels: vec![1, 0, 1],
        };
        write_label_file(&path, &spec).unwrap();
        let got = read_label_file(&path).unwrap();
        assert_eq!(got, spec);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn label_file_rejects_out_of_range_label() {
        let path = tmp_path("badlabel", "txt");
        fs::write(&path, "2 2\n2 2\n0 1 0 2\n").unwrap();
        let err = read_label_file(&path).unwrap_err();
        assert!(err.to_string().contains("outside"), "{err}");
        let _ = fs::remove_file(path);
    }

    #[test]
    fn label_file_rejects_short_file() {
        let path = tmp_path("short", "txt");
        fs::write(&path, "2 2\n2 2\n0 1 0\n").unwrap();
        let err = read_label_file(&path).unwrap_err();
        assert!(err.to_string().contains("ended at"), "{err}");
        let _ = fs::remove_file(path);
    }

    #[test]
    fn final_labels_one_per_line() {
        let path = tmp_path("final", "txt");
        write_final_labels(&path, &[1, 0], &[0, 1, 1]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "1\n0\n0\n1\n1\n");
        let _ = fs::remove_file(path);
    }
}
