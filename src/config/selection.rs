use std::fmt;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Worker selection configuration.
///
/// Controls which workers count as stale, how they are ordered in the
/// export, and how many of them a single run may remove.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectionConfig {
    /// Workers whose last status change is older than this many days are
    /// selected. Accepts a number or a numeric string.
    pub max_days_since_last_status_change: StalenessThreshold,

    /// Exported column to sort by (a field or attribute key).
    /// Default: none (listing order)
    #[serde(default)]
    pub sort_field: Option<String>,

    /// Sort direction, `asc` or `desc`.
    /// Default: asc
    #[serde(default)]
    pub sort_direction: SortDirection,

    /// Maximum number of workers to process in one run, taken from the
    /// start of the sorted list.
    /// Default: unlimited
    #[serde(default)]
    pub max_records: Option<usize>,
}

/// A validated staleness threshold in days.
///
/// Always finite and non-negative; fractional days are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawThreshold")]
pub struct StalenessThreshold(f64);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawThreshold {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl StalenessThreshold {
    pub fn new(days: f64) -> Result<Self, ConfigError> {
        if !days.is_finite() || days < 0.0 {
            return Err(ConfigError::Validation(format!(
                "max_days_since_last_status_change must be a non-negative number of days, got {days}"
            )));
        }
        Ok(Self(days))
    }

    /// Parse a threshold given as text, e.g. from an environment variable.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let days = raw.trim().parse::<f64>().map_err(|_| {
            ConfigError::Validation(format!(
                "max_days_since_last_status_change must be a number of days, got {raw:?}"
            ))
        })?;
        Self::new(days)
    }

    pub fn days(&self) -> f64 {
        self.0
    }

    /// The threshold in milliseconds.
    pub fn as_millis(&self) -> i64 {
        (self.0 * 86_400_000.0).round() as i64
    }
}

impl TryFrom<RawThreshold> for StalenessThreshold {
    type Error = String;

    fn try_from(raw: RawThreshold) -> Result<Self, Self::Error> {
        let result = match raw {
            RawThreshold::Integer(n) => Self::new(n as f64),
            RawThreshold::Float(f) => Self::new(f),
            RawThreshold::Text(s) => Self::parse(&s),
        };
        result.map_err(|e| match e {
            ConfigError::Validation(msg) => msg,
            other => other.to_string(),
        })
    }
}

impl fmt::Display for StalenessThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sort direction for the selected workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// `desc` in any case selects descending; every other value is ascending.
impl From<String> for SortDirection {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<&str> for SortDirection {
    fn from(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "Ascending"),
            Self::Desc => write!(f, "Descending"),
        }
    }
}
