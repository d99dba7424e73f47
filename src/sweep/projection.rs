//! Flattening workers into export columns.
//!
//! Every candidate carries the same columns in the same order: the
//! configured worker fields first, then the configured attribute keys.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;

use crate::{
    attributes::{AttributeError, AttributeValue, Attributes},
    config::ExportConfig,
    export::Table,
    registry::Record,
};

/// Attribute keys holding epoch-millisecond dates.
const TEMPORAL_KEYS: [&str; 2] = ["date_left", "date_joined"];

#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    #[error("worker {sid} has malformed attributes: {source}")]
    MalformedAttributes {
        sid: String,
        #[source]
        source: AttributeError,
    },
}

/// One exported cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Value(AttributeValue),
    /// The field or attribute does not exist on this worker.
    Missing,
}

impl Cell {
    pub fn value(&self) -> Option<&AttributeValue> {
        match self {
            Self::Value(v) => Some(v),
            Self::Missing => None,
        }
    }

    fn string(s: impl Into<String>) -> Self {
        Self::Value(AttributeValue::String(s.into()))
    }

    fn empty() -> Self {
        Self::string("")
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => fmt::Display::fmt(v, f),
            Self::Missing => Ok(()),
        }
    }
}

/// A stale worker in projected form.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub sid: String,
    pub friendly_name: String,
    pub columns: IndexMap<String, Cell>,
    /// Live attributes as listed, the base for the mutation plan.
    pub attributes: Attributes,
}

impl Candidate {
    pub fn cell(&self, column: &str) -> Option<&Cell> {
        self.columns.get(column)
    }

    /// Cells rendered for CSV, in column order.
    pub fn row(&self) -> Vec<String> {
        self.columns.values().map(Cell::to_string).collect()
    }
}

/// Column names, deduplicated in first-seen order.
pub fn column_names(export: &ExportConfig) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for column in export.columns() {
        if !names.contains(column) {
            names.push(column.clone());
        }
    }
    names
}

/// Project one worker.
pub fn project(record: Record, export: &ExportConfig) -> Result<Candidate, ProjectionError> {
    let attributes =
        Attributes::parse(&record.attributes).map_err(|source| ProjectionError::MalformedAttributes {
            sid: record.sid.clone(),
            source,
        })?;

    let mut columns = IndexMap::with_capacity(export.fields.len() + export.attributes.len());
    for field in &export.fields {
        columns.insert(field.clone(), field_cell(&record, field));
    }
    // An attribute key that repeats a field name overwrites the field's value
    // in place.
    for key in &export.attributes {
        columns.insert(key.clone(), attribute_cell(&attributes, key));
    }

    Ok(Candidate {
        sid: record.sid,
        friendly_name: record.friendly_name,
        columns,
        attributes,
    })
}

/// Project every worker, failing on the first malformed attribute blob.
pub fn project_all(
    records: Vec<Record>,
    export: &ExportConfig,
) -> Result<Vec<Candidate>, ProjectionError> {
    records
        .into_iter()
        .map(|record| project(record, export))
        .collect()
}

/// Render candidates as the selection export.
pub fn selection_table(candidates: &[Candidate], export: &ExportConfig) -> Table {
    let mut table = Table::new(column_names(export));
    for candidate in candidates {
        table.push(candidate.row());
    }
    table
}

fn field_cell(record: &Record, field: &str) -> Cell {
    let text = |s: &str| Cell::string(s);
    let optional_text = |s: &Option<String>| match s {
        Some(s) => Cell::string(s.as_str()),
        None => Cell::Value(AttributeValue::Null),
    };
    let timestamp = |t: &Option<DateTime<Utc>>| match t {
        Some(t) => Cell::string(iso_millis(t)),
        None => Cell::Value(AttributeValue::Null),
    };

    match field {
        "sid" => text(&record.sid),
        "friendly_name" | "friendlyName" => text(&record.friendly_name),
        "account_sid" | "accountSid" => optional_text(&record.account_sid),
        "workspace_sid" | "workspaceSid" => optional_text(&record.workspace_sid),
        "activity_name" | "activityName" => optional_text(&record.activity_name),
        "activity_sid" | "activitySid" => optional_text(&record.activity_sid),
        "available" => match record.available {
            Some(b) => Cell::Value(AttributeValue::Bool(b)),
            None => Cell::Value(AttributeValue::Null),
        },
        "attributes" => text(&record.attributes),
        "date_status_changed" | "dateStatusChanged" => timestamp(&record.date_status_changed),
        "date_created" | "dateCreated" => timestamp(&record.date_created),
        "date_updated" | "dateUpdated" => timestamp(&record.date_updated),
        "url" => optional_text(&record.url),
        _ => Cell::Missing,
    }
}

fn attribute_cell(attributes: &Attributes, key: &str) -> Cell {
    if TEMPORAL_KEYS.contains(&key) {
        return match attributes.get(key).and_then(AttributeValue::as_f64) {
            Some(ms) => epoch_millis_to_iso(ms).map_or_else(Cell::empty, Cell::string),
            None => Cell::empty(),
        };
    }

    if key.contains('.') {
        let mut segments = key.split('.');
        let parent = segments.next().unwrap_or_default();
        let child = segments.next().unwrap_or_default();

        return match attributes.get(parent) {
            Some(value) if value.is_truthy() => nested(value, child),
            _ => Cell::empty(),
        };
    }

    match attributes.get(key) {
        Some(value) => Cell::Value(value.clone()),
        None => Cell::Missing,
    }
}

fn nested(parent: &AttributeValue, child: &str) -> Cell {
    let found = match parent {
        AttributeValue::Map(map) => map.get(child),
        AttributeValue::List(items) => child.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    };
    found.map_or(Cell::Missing, |v| Cell::Value(v.clone()))
}

fn iso_millis(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Fractional milliseconds are truncated; out-of-range values yield `None`.
fn epoch_millis_to_iso(ms: f64) -> Option<String> {
    if !ms.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(ms.trunc() as i64).map(|t| iso_millis(&t))
}
