//! Failure export.

use std::fmt;

use super::projection::Candidate;
use crate::{export::Table, registry::RemoteError};

/// The pass in which a worker failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Update,
    Delete,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// A worker that could not be updated or removed.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureRecord {
    pub candidate: Candidate,
    pub stage: FailureStage,
    pub error: RemoteError,
}

/// Render failures as the error export, or `None` when nothing failed.
///
/// Columns are the selection columns followed by `error.status` and
/// `error.message`.
pub fn failure_table<'a>(
    columns: &[String],
    failures: impl IntoIterator<Item = &'a FailureRecord>,
) -> Option<Table> {
    let mut header = columns.to_vec();
    header.push("error.status".to_string());
    header.push("error.message".to_string());

    let mut table = Table::new(header);
    for failure in failures {
        let mut row = failure.candidate.row();
        row.push(failure.error.status.map(|s| s.to_string()).unwrap_or_default());
        row.push(failure.error.message.clone());
        table.push(row);
    }

    (!table.is_empty()).then_some(table)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{
        config::ExportConfig,
        sweep::{
            projection::{column_names, project},
            tests::record,
        },
    };

    fn failure(sid: &str, stage: FailureStage, error: RemoteError) -> FailureRecord {
        let export = ExportConfig {
            fields: vec!["sid".into()],
            attributes: vec!["email".into()],
            ..Default::default()
        };
        FailureRecord {
            candidate: project(record(sid, Utc::now(), r#"{"email":"a@example.com"}"#), &export)
                .unwrap(),
            stage,
            error,
        }
    }

    fn columns() -> Vec<String> {
        column_names(&ExportConfig {
            fields: vec!["sid".into()],
            attributes: vec!["email".into()],
            ..Default::default()
        })
    }

    #[test]
    fn test_no_failures_no_table() {
        assert!(failure_table(&columns(), &[]).is_none());
    }

    #[test]
    fn test_failure_rows() {
        let failures = [
            failure("WK1", FailureStage::Update, RemoteError::http(500, "Internal Server Error")),
            failure("WK2", FailureStage::Delete, RemoteError::transport("timed out")),
        ];
        let table = failure_table(&columns(), &failures).unwrap();

        assert_eq!(
            table.header,
            vec!["sid", "email", "error.status", "error.message"]
        );
        assert_eq!(
            table.rows,
            vec![
                vec!["WK1", "a@example.com", "500", "Internal Server Error"],
                vec!["WK2", "a@example.com", "", "timed out"],
            ]
        );
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(FailureStage::Update.to_string(), "update");
        assert_eq!(FailureStage::Delete.to_string(), "delete");
    }
}
