//! Ordering and capping the selected workers.
//!
//! Sorting compares one column as dates. A pair where neither side is a
//! date string, or where either side has no date value, has no defined
//! order and keeps its prior relative order.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::projection::{Candidate, Cell};
use crate::{attributes::AttributeValue, config::SortDirection};

/// Precomputed comparison data for one candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SortKey {
    /// The cell is a string that parses to a non-zero epoch.
    parses: bool,
    /// Epoch milliseconds as a date constructor would read the cell. Null
    /// is the epoch and booleans are 0 or 1; `None` has no date value.
    value: Option<f64>,
}

impl SortKey {
    fn of(cell: Option<&Cell>) -> Self {
        match cell.and_then(Cell::value) {
            Some(AttributeValue::String(s)) => {
                let ms = parse_date_millis(s);
                Self {
                    parses: ms.is_some_and(|ms| ms != 0),
                    value: ms.map(|ms| ms as f64),
                }
            }
            Some(AttributeValue::Number(n)) => Self {
                parses: false,
                value: n.as_f64().filter(|f| f.is_finite()),
            },
            Some(AttributeValue::Null) => Self {
                parses: false,
                value: Some(0.0),
            },
            Some(AttributeValue::Bool(b)) => Self {
                parses: false,
                value: Some(if *b { 1.0 } else { 0.0 }),
            },
            _ => Self {
                parses: false,
                value: None,
            },
        }
    }
}

/// Compare two keys; `None` when the order is undefined.
fn compare(a: &SortKey, b: &SortKey, direction: SortDirection) -> Option<Ordering> {
    if !a.parses && !b.parses {
        return None;
    }
    let (a, b) = (a.value?, b.value?);
    let diff = match direction {
        SortDirection::Asc => a - b,
        SortDirection::Desc => b - a,
    };
    diff.partial_cmp(&0.0)
}

/// Sort by `field` when set, then keep the first `max` candidates.
///
/// Workers past the cap are left out of the run entirely.
pub fn rank(
    candidates: Vec<Candidate>,
    field: Option<&str>,
    direction: SortDirection,
    max: Option<usize>,
) -> Vec<Candidate> {
    let total = candidates.len();
    let mut ranked = match field {
        Some(field) => sort_by_column(candidates, field, direction),
        None => candidates,
    };

    if let Some(max) = max
        && ranked.len() > max
    {
        ranked.truncate(max);
        tracing::info!(kept = max, skipped = total - max, "Capped selected workers");
    }

    ranked
}

fn sort_by_column(
    candidates: Vec<Candidate>,
    field: &str,
    direction: SortDirection,
) -> Vec<Candidate> {
    let keyed: Vec<(SortKey, Candidate)> = candidates
        .into_iter()
        .map(|c| (SortKey::of(c.cell(field)), c))
        .collect();

    merge_sort(keyed, &|a: &(SortKey, Candidate), b: &(SortKey, Candidate)| {
        compare(&a.0, &b.0, direction)
    })
    .into_iter()
    .map(|(_, c)| c)
    .collect()
}

/// Stable top-down merge sort over a partial comparator.
///
/// An element from the right run is taken first only when it compares
/// strictly `Less` than the head of the left run.
fn merge_sort<T>(mut items: Vec<T>, cmp: &impl Fn(&T, &T) -> Option<Ordering>) -> Vec<T> {
    if items.len() <= 1 {
        return items;
    }

    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, cmp);
    let right = merge_sort(right, cmp);

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();

    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => cmp(r, l) == Some(Ordering::Less),
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        let next = if take_right { right.next() } else { left.next() };
        if let Some(item) = next {
            merged.push(item);
        }
    }

    merged
}

/// Parse a date string to epoch milliseconds.
///
/// Accepts RFC 3339, RFC 2822, `YYYY-MM-DDTHH:MM:SS[.fff]`,
/// `YYYY-MM-DD HH:MM:SS` and `YYYY-MM-DD`. Dates without an offset are UTC.
pub(crate) fn parse_date_millis(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.timestamp_millis());
    }
    if let Ok(t) = DateTime::parse_from_rfc2822(raw) {
        return Some(t.timestamp_millis());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(t.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc().timestamp_millis())
}
