//! CSV export of selected and failed workers.
//!
//! Each run writes at most two files sharing one timestamp:
//! `{prefix}_{timestamp}.csv` for the workers selected for removal and
//! `{prefix}_{timestamp}_errors.csv` for the ones that could not be updated
//! or removed.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use csv::Writer;

/// Error type for CSV export operations
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Failed to create export directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// A rendered table: a header row plus string cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(header: Vec<String>) -> Self {
        Self {
            header,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Which export a table belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// Workers selected for removal.
    Selected,
    /// Workers whose update or deletion failed.
    Failures,
}

/// Destination for exported tables.
pub trait ExportSink: Send + Sync {
    /// Write `table` and return where it was written.
    fn write(&self, kind: ExportKind, table: &Table) -> Result<PathBuf, ExportError>;
}

/// Writes tables as CSV files into a directory.
#[derive(Debug, Clone)]
pub struct CsvFileSink {
    directory: PathBuf,
    prefix: String,
    timestamp: String,
}

impl CsvFileSink {
    /// `started_at` fixes the file-name timestamp for every file of the run.
    pub fn new(
        directory: impl Into<PathBuf>,
        prefix: impl Into<String>,
        started_at: DateTime<Local>,
    ) -> Self {
        Self {
            directory: directory.into(),
            prefix: prefix.into(),
            timestamp: file_timestamp(&started_at),
        }
    }

    pub fn path_for(&self, kind: ExportKind) -> PathBuf {
        let name = match kind {
            ExportKind::Selected => format!("{}_{}.csv", self.prefix, self.timestamp),
            ExportKind::Failures => format!("{}_{}_errors.csv", self.prefix, self.timestamp),
        };
        self.directory.join(name)
    }
}

impl ExportSink for CsvFileSink {
    fn write(&self, kind: ExportKind, table: &Table) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(&self.directory).map_err(|source| ExportError::Directory {
            path: self.directory.clone(),
            source,
        })?;

        let path = self.path_for(kind);
        write_csv(&path, table).map_err(|source| ExportError::Write {
            path: path.clone(),
            source,
        })?;

        tracing::info!(path = %path.display(), rows = table.len(), "Wrote CSV export");
        Ok(path)
    }
}

fn write_csv(path: &Path, table: &Table) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_path(path)?;
    wtr.write_record(&table.header)?;
    for row in &table.rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// `2024-03-01T09-15-00+0100`: colons are not allowed in file names on
/// every platform.
fn file_timestamp(at: &DateTime<Local>) -> String {
    at.format("%Y-%m-%dT%H-%M-%S%z").to_string()
}


#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn started_at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 1, 9, 15, 0).unwrap()
    }

    fn sample_table() -> Table {
        let mut table = Table::new(vec!["sid".into(), "friendlyName".into(), "note".into()]);
        table.push(vec!["WK1".into(), "alice".into(), "likes, commas".into()]);
        table.push(vec!["WK2".into(), "bob".into(), String::new()]);
        table
    }

    #[test]
    fn test_file_names_share_timestamp() {
        let sink = CsvFileSink::new("/tmp/out", "inactive_workers", started_at());
        let selected = sink.path_for(ExportKind::Selected);
        let failures = sink.path_for(ExportKind::Failures);

        let selected = selected.file_name().unwrap().to_str().unwrap().to_string();
        let failures = failures.file_name().unwrap().to_str().unwrap().to_string();
        assert!(selected.starts_with("inactive_workers_2024-03-01T09-15-00"));
        assert!(selected.ends_with(".csv") && !selected.contains(':'));
        assert_eq!(
            failures,
            selected.replace(".csv", "_errors.csv"),
            "failure export must reuse the run timestamp"
        );
    }

    #[test]
    fn test_write_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvFileSink::new(dir.path(), "stale", started_at());

        let path = sink.write(ExportKind::Selected, &sample_table()).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "sid,friendlyName,note\nWK1,alice,\"likes, commas\"\nWK2,bob,\n"
        );
    }

    #[test]
    fn test_write_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("exports").join("today");
        let sink = CsvFileSink::new(&nested, "stale", started_at());

        let path = sink.write(ExportKind::Failures, &sample_table()).unwrap();
        assert!(path.starts_with(&nested));
        assert!(path.exists());
    }

    #[test]
    fn test_write_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvFileSink::new(dir.path(), "stale", started_at());

        let path = sink
            .write(ExportKind::Selected, &Table::new(vec!["sid".into()]))
            .unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "sid\n");
    }
}
