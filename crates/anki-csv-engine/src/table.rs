//! CSV parsing.
//!
//! Every row must have as many columns as the first one; the csv reader
//! reports the offending line otherwise.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::debug;

use crate::{Error, Result};

/// Parsing options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    /// Field delimiter byte.
    pub delimiter: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

/// Guess the delimiter from the first line: a tab, then `;`, then `,`.
///
/// Falls back to `,` when the line contains none of them.
pub fn detect_delimiter(data: &[u8]) -> u8 {
    let first_line = data.split(|&b| b == b'\n').next().unwrap_or_default();
    [b'\t', b';', b',']
        .into_iter()
        .find(|d| first_line.contains(d))
        .unwrap_or(b',')
}

/// Read every row of a CSV, header included, as plain strings.
pub fn read_records<R: Read>(reader: R, options: CsvOptions) -> Result<Vec<Vec<String>>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(false)
        .delimiter(options.delimiter)
        .from_reader(reader);

    let mut records = Vec::new();
    for record in rdr.records() {
        let record = record?;
        records.push(record.iter().map(str::to_string).collect());
    }
    Ok(records)
}

/// A CSV whose first row names the columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Parse a CSV file.
    pub fn read_path(path: impl AsRef<Path>, options: CsvOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let table = Self::from_reader(file, options)?;
        debug!(
            path = %path.display(),
            columns = table.header.len(),
            rows = table.rows.len(),
            "Parsed CSV"
        );
        Ok(table)
    }

    /// Parse CSV from any reader.
    pub fn from_reader<R: Read>(reader: R, options: CsvOptions) -> Result<Self> {
        let mut records = read_records(reader, options)?.into_iter();
        let header = records.next().ok_or(Error::EmptyCsv)?;
        Ok(Self {
            header,
            rows: records.collect(),
        })
    }

    /// Column names, in file order.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Data rows, header excluded.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_and_rows() {
        let csv = "Front,Back,Tags\nhola,hello,spanish greeting\nadios,bye,\n";
        let table = CsvTable::from_reader(csv.as_bytes(), CsvOptions::default()).unwrap();

        assert_eq!(table.header(), &["Front", "Back", "Tags"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1], vec!["adios", "bye", ""]);
    }

    #[test]
    fn test_quoted_fields_keep_commas_and_newlines() {
        let csv = "Front,Back\n\"a, b\",\"line1\nline2\"\n";
        let table = CsvTable::from_reader(csv.as_bytes(), CsvOptions::default()).unwrap();

        assert_eq!(table.rows()[0], vec!["a, b", "line1\nline2"]);
    }

    #[test]
    fn test_column_count_mismatch_is_an_error() {
        let csv = "Front,Back\nonly-one\n";
        let err = CsvTable::from_reader(csv.as_bytes(), CsvOptions::default()).unwrap_err();

        assert!(matches!(err, Error::Csv(_)));
    }

    #[test]
    fn test_empty_input() {
        let err = CsvTable::from_reader("".as_bytes(), CsvOptions::default()).unwrap_err();
        assert!(matches!(err, Error::EmptyCsv));
    }

    #[test]
    fn test_custom_delimiter() {
        let csv = "Front;Back\nuno;one\n";
        let table = CsvTable::from_reader(csv.as_bytes(), CsvOptions { delimiter: b';' }).unwrap();

        assert_eq!(table.rows()[0], vec!["uno", "one"]);
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter(b"a\tb;c\n"), b'\t');
        assert_eq!(detect_delimiter(b"a;b,c\n"), b';');
        assert_eq!(detect_delimiter(b"a,b\nc;d\n"), b',');
        assert_eq!(detect_delimiter(b"single\nx\ty\n"), b',');
        assert_eq!(detect_delimiter(b""), b',');
    }

    #[test]
    fn test_header_only() {
        let table =
            CsvTable::from_reader("Front,Back\n".as_bytes(), CsvOptions::default()).unwrap();
        assert!(table.is_empty());
    }
}
