//! Tab-separated matrix output

use crate::utils::has_extension;
use crate::SqmResult;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write a matrix with a `\t<col1>\t<col2>...` header and one line per row.
///
/// Rows are emitted sorted by key, whatever order `rows` yields them in.
pub fn write_matrix_to<W, K, R, V, I>(writer: &mut W, columns: &[String], rows: I) -> SqmResult<()>
where
    W: Write,
    K: AsRef<str>,
    R: AsRef<[V]>,
    V: Display,
    I: IntoIterator<Item = (K, R)>,
{
    let mut rows: Vec<(K, R)> = rows.into_iter().collect();
    rows.sort_by(|a, b| a.0.as_ref().cmp(b.0.as_ref()));

    writeln!(writer, "\t{}", columns.join("\t"))?;
    for (key, values) in &rows {
        let values = values.as_ref();
        debug_assert_eq!(values.len(), columns.len());
        write!(writer, "{}", key.as_ref())?;
        for value in values {
            write!(writer, "\t{}", value)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Write a matrix to `path`, gzip-compressed when the path ends in `.gz`
pub fn write_matrix<P, K, R, V, I>(path: P, columns: &[String], rows: I) -> SqmResult<()>
where
    P: AsRef<Path>,
    K: AsRef<str>,
    R: AsRef<[V]>,
    V: Display,
    I: IntoIterator<Item = (K, R)>,
{
    let file = File::create(&path)?;
    if has_extension(&path, "gz") {
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        write_matrix_to(&mut encoder, columns, rows)?;
        encoder.finish()?.flush()?;
    } else {
        let mut writer = BufWriter::new(file);
        write_matrix_to(&mut writer, columns, rows)?;
        writer.flush()?;
    }
    log::debug!("Wrote {:?}", path.as_ref());
    Ok(())
}
