use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// CSV export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportConfig {
    /// File name prefix. Files are named `{prefix}_{timestamp}.csv` and
    /// `{prefix}_{timestamp}_errors.csv`.
    /// Default: "inactive_workers"
    #[serde(default = "default_filename_prefix")]
    pub filename_prefix: String,

    /// Directory the CSV files are written to.
    /// Default: current directory
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// Worker fields to export, e.g. `sid`, `friendlyName`,
    /// `dateStatusChanged`.
    #[serde(default = "default_fields")]
    pub fields: Vec<String>,

    /// Attribute keys to export. `parent.child` reads a nested attribute;
    /// `date_joined` and `date_left` are rendered as ISO-8601 dates.
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            filename_prefix: default_filename_prefix(),
            directory: default_directory(),
            fields: default_fields(),
            attributes: Vec::new(),
        }
    }
}

pub(crate) fn default_filename_prefix() -> String {
    "inactive_workers".to_string()
}

fn default_directory() -> PathBuf {
    PathBuf::from(".")
}

pub(crate) fn default_fields() -> Vec<String> {
    vec![
        "sid".to_string(),
        "friendlyName".to_string(),
        "dateStatusChanged".to_string(),
    ]
}

impl ExportConfig {
    /// Every exported column name, fields first.
    pub fn columns(&self) -> impl Iterator<Item = &String> {
        self.fields.iter().chain(self.attributes.iter())
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.fields.is_empty() && self.attributes.is_empty() {
            return Err(ConfigError::Validation(
                "export must include at least one field or attribute".into(),
            ));
        }

        if let Some(blank) = self.columns().find(|c| c.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "export column names must not be blank, got {blank:?}"
            )));
        }

        if self.filename_prefix.trim().is_empty() {
            return Err(ConfigError::Validation(
                "export.filename_prefix must not be empty".into(),
            ));
        }

        Ok(())
    }
}
