use std::fmt;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Attribute changes applied to every selected worker before it is deleted.
///
/// Applied in order: clear, delete, populate. A key listed in both `clear`
/// and `populate` ends up with the populate value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MutationConfig {
    /// Keys whose truthy values are replaced with an empty string.
    #[serde(default)]
    pub clear: Vec<String>,

    /// Keys removed from the attributes.
    #[serde(default)]
    pub delete: Vec<String>,

    /// `key:value` pairs written as string attributes.
    #[serde(default)]
    pub populate: Vec<PopulateEntry>,
}

impl MutationConfig {
    /// True when no attribute changes are configured.
    pub fn is_empty(&self) -> bool {
        self.clear.is_empty() && self.delete.is_empty() && self.populate.is_empty()
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        for (list, keys) in [("clear", &self.clear), ("delete", &self.delete)] {
            if keys.iter().any(|k| k.trim().is_empty()) {
                return Err(ConfigError::Validation(format!(
                    "mutation.{list} must not contain blank keys"
                )));
            }
        }
        Ok(())
    }
}

/// A `key:value` populate entry.
///
/// Split at the first colon, so the value may itself contain colons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PopulateEntry {
    pub key: String,
    pub value: String,
}

impl PopulateEntry {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let (key, value) = raw.split_once(':').ok_or_else(|| {
            ConfigError::Validation(format!(
                "populate entries must be formatted as key:value, got {raw:?}"
            ))
        })?;

        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::Validation(format!(
                "populate entry {raw:?} has an empty key"
            )));
        }

        Ok(Self {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

impl TryFrom<String> for PopulateEntry {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw).map_err(|e| e.to_string())
    }
}

impl From<PopulateEntry> for String {
    fn from(entry: PopulateEntry) -> Self {
        entry.to_string()
    }
}

impl fmt::Display for PopulateEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key, self.value)
    }
}
