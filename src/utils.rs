//! Utility functions for file handling and common operations

use crate::{SqmError, SqmResult};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::Path;

/// Check if a file is gzip compressed
pub fn is_gzipped<P: AsRef<Path>>(path: P) -> SqmResult<bool> {
    let mut file = File::open(path)?;
    let mut buffer = [0; 2];

    match file.read_exact(&mut buffer) {
        Ok(()) => Ok(buffer == [0x1f, 0x8b]),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(SqmError::Io(e)),
    }
}

/// Open a text table for buffered reading, decompressing gzip input on the fly
pub fn open_table<P: AsRef<Path>>(path: P) -> SqmResult<Box<dyn BufRead>> {
    let file = File::open(&path)
        .map_err(|_| SqmError::FileNotFound(path.as_ref().to_string_lossy().to_string()))?;

    let reader: Box<dyn BufRead> = if is_gzipped(&path)? {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(reader)
}

/// Tab-separated reader over a pipeline table.
///
/// Rows may differ in width and fields are never quoted, so taxonomy strings
/// and annotation descriptions containing `"` pass through untouched. No
/// header is consumed; callers read the comment and header rows themselves.
pub fn tsv_reader<P: AsRef<Path>>(path: P) -> SqmResult<csv::Reader<Box<dyn BufRead>>> {
    let reader = open_table(path)?;
    Ok(csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::All)
        .from_reader(reader))
}

/// Validate file paths and check if they exist
pub fn validate_file_exists<P: AsRef<Path>>(path: P) -> SqmResult<()> {
    if !path.as_ref().exists() {
        return Err(SqmError::FileNotFound(
            path.as_ref().to_string_lossy().to_string(),
        ));
    }
    Ok(())
}

/// Validate that a file is readable
pub fn validate_file_readable<P: AsRef<Path>>(path: P) -> SqmResult<()> {
    validate_file_exists(&path)?;

    File::open(&path)
        .map_err(|_| SqmError::FileNotFound(path.as_ref().to_string_lossy().to_string()))?;

    Ok(())
}

/// Check if a path has a specific extension
pub fn has_extension<P: AsRef<Path>>(path: P, extension: &str) -> bool {
    path.as_ref()
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// Create the output directory. An existing directory is reused; a missing
/// parent or any other failure is an error.
pub fn create_output_dir<P: AsRef<Path>>(path: P) -> SqmResult<()> {
    match std::fs::create_dir(&path) {
        Ok(()) => {
            log::info!("Created output directory {:?}", path.as_ref());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            log::debug!("Output directory {:?} already exists", path.as_ref());
            Ok(())
        }
        Err(e) => Err(SqmError::Io(e)),
    }
}

/// Timer utility for measuring execution time
pub struct Timer {
    start: std::time::Instant,
    name: String,
}

impl Timer {
    pub fn new(name: &str) -> Self {
        log::info!("Starting timer: {}", name);
        Timer {
            start: std::time::Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }

    pub fn log_elapsed(&self) {
        let duration = self.elapsed();
        log::info!("Timer '{}' elapsed: {:.2?}", self.name, duration);
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.log_elapsed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_is_gzipped() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "test content").unwrap();
        assert!(!is_gzipped(temp_file.path()).unwrap());

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(&[0x1f, 0x8b]).unwrap();
        assert!(is_gzipped(temp_file.path()).unwrap());

        let empty = NamedTempFile::new().unwrap();
        assert!(!is_gzipped(empty.path()).unwrap());
    }

    #[test]
    fn test_open_table_reads_gzip() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut encoder = GzEncoder::new(temp_file.reopen().unwrap(), Compression::default());
        writeln!(encoder, "# comment").unwrap();
        writeln!(encoder, "ORF\tLENGTH NT").unwrap();
        encoder.finish().unwrap();

        let lines: Vec<String> = open_table(temp_file.path())
            .unwrap()
            .lines()
            .map(|l| l.unwrap())
            .collect();
        assert_eq!(lines, vec!["# comment", "ORF\tLENGTH NT"]);
    }

    #[test]
    fn test_open_table_missing_file() {
        match open_table("/nonexistent/orftable") {
            Err(SqmError::FileNotFound(path)) => assert_eq!(path, "/nonexistent/orftable"),
            other => panic!("expected FileNotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_tsv_reader_keeps_quotes_and_ragged_rows() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "orf1").unwrap();
        writeln!(temp_file, "orf2\tk_\"Candidatus\" Foo").unwrap();

        let mut reader = tsv_reader(temp_file.path()).unwrap();
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].len(), 1);
        assert_eq!(&records[1][1], "k_\"Candidatus\" Foo");
    }

    #[test]
    fn test_validate_file_exists() {
        let temp_file = NamedTempFile::new().unwrap();
        assert!(validate_file_exists(temp_file.path()).is_ok());
        assert!(validate_file_readable(temp_file.path()).is_ok());

        assert!(validate_file_exists("/nonexistent/file").is_err());
    }

    #[test]
    fn test_has_extension() {
        assert!(has_extension("KO.tpm.tsv.gz", "gz"));
        assert!(has_extension("KO.tpm.tsv.GZ", "gz"));
        assert!(!has_extension("KO.tpm.tsv", "gz"));
        assert!(!has_extension("table", "gz"));
    }

    #[test]
    fn test_create_output_dir_tolerates_existing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("tables");
        create_output_dir(&out).unwrap();
        assert!(out.is_dir());
        create_output_dir(&out).unwrap();

        let orphan = dir.path().join("missing").join("tables");
        assert!(create_output_dir(&orphan).is_err());
    }

    #[test]
    fn test_timer() {
        let timer = Timer::new("test");
        std::thread::sleep(std::time::Duration::from_millis(1));
        assert!(timer.elapsed().as_millis() >= 1);
    }
}
