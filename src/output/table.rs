//! Delimited table serialization

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, Terminator, WriterBuilder};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// On-disk encoding of a report table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableFormat {
    /// Semicolon-delimited `.csv`
    Csv,
    /// Space-delimited `.dat`, for plotting tools
    Dat,
}

impl TableFormat {
    /// Field delimiter
    pub fn delimiter(self) -> u8 {
        match self {
            TableFormat::Csv => b';',
            TableFormat::Dat => b' ',
        }
    }

    /// File extension, without the dot
    pub fn extension(self) -> &'static str {
        match self {
            TableFormat::Csv => "csv",
            TableFormat::Dat => "dat",
        }
    }
}

/// Ordered named columns plus rows of preformatted cells
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Create an empty table with the given header
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Column names
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Data rows, header excluded
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Append a row; it must have one cell per column
    pub fn push_row(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    /// Serialize header and rows into `writer`
    pub fn to_writer<W: Write>(&self, writer: W, format: TableFormat) -> csv::Result<()> {
        let mut wtr = WriterBuilder::new()
            .delimiter(format.delimiter())
            .quote_style(QuoteStyle::Never)
            .terminator(Terminator::Any(b'\n'))
            .has_headers(false)
            .from_writer(writer);

        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write the table next to `stem`, appending the format's extension
    ///
    /// The file is fully written to a temporary file in the target
    /// directory and then renamed into place.
    pub fn write(&self, stem: &Path, format: TableFormat) -> Result<PathBuf> {
        let mut name = OsString::from(stem.as_os_str());
        name.push(".");
        name.push(format.extension());
        let path = PathBuf::from(name);

        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;

        self.to_writer(&mut tmp, format)
            .map_err(|e| Error::report(&path, e))?;
        tmp.persist(&path).map_err(|e| Error::report(&path, e))?;

        Ok(path)
    }
}

/// Render a value with `precision` fractional digits
///
/// Integral columns round half to even.
pub fn format_value(value: f64, precision: usize) -> String {
    if precision == 0 {
        format!("{:.0}", value.round_ties_even())
    } else {
        format!("{value:.precision$}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Table {
        let mut table = Table::new(["size", "id", "inserts"]);
        table.push_row(vec!["8".into(), "0".into(), "2".into()]);
        table.push_row(vec!["8".into(), "1".into(), "3".into()]);
        table
    }

    #[test]
    fn test_csv_uses_semicolons() {
        let mut buf = Vec::new();
        sample().to_writer(&mut buf, TableFormat::Csv).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "size;id;inserts\n8;0;2\n8;1;3\n"
        );
    }

    #[test]
    fn test_dat_uses_spaces() {
        let mut buf = Vec::new();
        sample().to_writer(&mut buf, TableFormat::Dat).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "size id inserts\n8 0 2\n8 1 3\n"
        );
    }

    #[test]
    fn test_write_appends_extension() {
        let dir = TempDir::new().unwrap();
        let stem = dir.path().join("set.3-freertos_list");

        let path = sample().write(&stem, TableFormat::Csv).unwrap();

        assert_eq!(path, dir.path().join("set.3-freertos_list.csv"));
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("size;id;inserts\n"));
        // only the final file remains
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_into_missing_dir_fails() {
        let dir = TempDir::new().unwrap();
        let stem = dir.path().join("missing").join("summary");
        assert!(sample().write(&stem, TableFormat::Dat).is_err());
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(14.142135623730951, 9), "14.142135624");
        assert_eq!(format_value(14.142135623730951, 0), "14");
        assert_eq!(format_value(2.5, 0), "2");
        assert_eq!(format_value(3.5, 0), "4");
        assert_eq!(format_value(30.0, 0), "30");
    }
}
