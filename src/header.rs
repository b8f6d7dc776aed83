//! Two-line table headers shared by the SqueezeMeta tables

use crate::{SqmError, SqmResult};
use csv::StringRecord;
use std::collections::HashMap;
use std::io::Read;

/// Column names of a table, indexed for lookup by name
#[derive(Debug, Clone)]
pub struct TableHeader {
    path: String,
    fields: Vec<String>,
    index: HashMap<String, usize>,
}

impl TableHeader {
    /// Consume the comment line and the column-name line from `reader`
    pub fn read<R: Read>(reader: &mut csv::Reader<R>, path: &str) -> SqmResult<Self> {
        let mut record = StringRecord::new();
        if !reader.read_record(&mut record)? {
            return Err(SqmError::MalformedHeader {
                path: path.to_string(),
                reason: "file is empty".to_string(),
            });
        }
        if !reader.read_record(&mut record)? {
            return Err(SqmError::MalformedHeader {
                path: path.to_string(),
                reason: "missing column header line".to_string(),
            });
        }
        Ok(Self::from_record(&record, path))
    }

    pub fn from_record(record: &StringRecord, path: &str) -> Self {
        let fields: Vec<String> = record.iter().map(str::to_string).collect();
        let mut index = HashMap::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            // First occurrence wins for duplicated names.
            index.entry(field.clone()).or_insert(i);
        }
        TableHeader {
            path: path.to_string(),
            fields,
            index,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Index of a required column
    pub fn column(&self, name: &str) -> SqmResult<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| SqmError::MissingColumn {
                path: self.path.clone(),
                column: name.to_string(),
            })
    }

    /// Sample columns, in header order, whose name contains `marker`.
    /// The returned sample name is the column name with the marker removed.
    pub fn sample_columns(&self, marker: &str) -> SqmResult<Vec<(usize, String)>> {
        let samples: Vec<(usize, String)> = self
            .fields
            .iter()
            .enumerate()
            .filter(|(_, name)| name.contains(marker))
            .map(|(i, name)| (i, name.replace(marker, "").trim().to_string()))
            .collect();

        if samples.is_empty() {
            return Err(SqmError::MalformedHeader {
                path: self.path.clone(),
                reason: format!("no sample columns containing '{}'", marker),
            });
        }
        Ok(samples)
    }
}

/// Line number of a record, for diagnostics
pub fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

/// Field `idx` of a data row, or an `InvalidRecord` naming the missing column
pub fn required_field<'r>(
    record: &'r StringRecord,
    idx: usize,
    header: &TableHeader,
) -> SqmResult<&'r str> {
    record.get(idx).ok_or_else(|| SqmError::InvalidRecord {
        path: header.path().to_string(),
        line: line_of(record),
        reason: format!(
            "row has {} fields, column '{}' is missing",
            record.len(),
            header.fields().get(idx).map(String::as_str).unwrap_or("?")
        ),
    })
}

/// Parse the raw read counts of one row, in sample-column order
pub fn parse_counts(
    record: &StringRecord,
    samples: &[(usize, String)],
    header: &TableHeader,
) -> SqmResult<Vec<u64>> {
    samples
        .iter()
        .map(|(idx, sample)| {
            let raw = required_field(record, *idx, header)?;
            raw.parse::<u64>().map_err(|_| SqmError::InvalidRecord {
                path: header.path().to_string(),
                line: line_of(record),
                reason: format!("invalid read count '{}' for sample {}", raw, sample),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::tsv_reader;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn header_of(line: &str) -> TableHeader {
        TableHeader::from_record(&StringRecord::from(line.split('\t').collect::<Vec<_>>()), "t.tsv")
    }

    #[test]
    fn test_read_consumes_two_lines() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "# Created by SqueezeMeta").unwrap();
        writeln!(temp_file, "ORF\tLENGTH NT\tRAW READ COUNT S1").unwrap();
        writeln!(temp_file, "orf1\t300\t10").unwrap();

        let mut reader = tsv_reader(temp_file.path()).unwrap();
        let header = TableHeader::read(&mut reader, "orftable").unwrap();
        assert_eq!(header.column("LENGTH NT").unwrap(), 1);

        let first: StringRecord = reader.records().next().unwrap().unwrap();
        assert_eq!(&first[0], "orf1");
    }

    #[test]
    fn test_read_rejects_truncated_header() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "# only a comment").unwrap();

        let mut reader = tsv_reader(temp_file.path()).unwrap();
        assert!(matches!(
            TableHeader::read(&mut reader, "orftable"),
            Err(SqmError::MalformedHeader { .. })
        ));
    }

    #[test]
    fn test_missing_column() {
        let header = header_of("ORF\tLENGTH NT");
        match header.column("KEGG ID") {
            Err(SqmError::MissingColumn { path, column }) => {
                assert_eq!(path, "t.tsv");
                assert_eq!(column, "KEGG ID");
            }
            other => panic!("expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_sample_columns_strip_marker() {
        let header = header_of("ORF\tRAW READ COUNT S1\tTPM S1\tRAW READ COUNT gut_2");
        let samples = header.sample_columns("RAW READ COUNT").unwrap();
        assert_eq!(samples, vec![(1, "S1".to_string()), (3, "gut_2".to_string())]);

        assert!(header.sample_columns("Raw").is_err());
    }

    #[test]
    fn test_parse_counts_rejects_non_integer() {
        let header = header_of("ORF\tRAW READ COUNT S1");
        let samples = header.sample_columns("RAW READ COUNT").unwrap();

        let good = StringRecord::from(vec!["orf1", "12"]);
        assert_eq!(parse_counts(&good, &samples, &header).unwrap(), vec![12]);

        let bad = StringRecord::from(vec!["orf1", "1.5"]);
        assert!(matches!(
            parse_counts(&bad, &samples, &header),
            Err(SqmError::InvalidRecord { .. })
        ));

        let short = StringRecord::from(vec!["orf1"]);
        assert!(parse_counts(&short, &samples, &header).is_err());
    }
}
