//! Configuration module for the sweeper.
//!
//! The sweeper is configured via a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax. When no file is
//! available the same options can be supplied as flat environment variables
//! (see [`SweeperConfig::from_env`]).
//!
//! # Example
//!
//! ```toml
//! [registry]
//! account_sid = "${TWILIO_ACCOUNT_SID}"
//! auth_token = "${TWILIO_AUTH_TOKEN}"
//! workspace_sid = "${TWILIO_WORKSPACE_SID}"
//!
//! [selection]
//! max_days_since_last_status_change = 90
//! sort_field = "date_left"
//! sort_direction = "asc"
//! max_records = 500
//!
//! [export]
//! filename_prefix = "inactive_workers"
//! fields = ["sid", "friendlyName", "dateStatusChanged"]
//! attributes = ["email", "date_left", "routing.skills"]
//!
//! [mutation]
//! clear = ["email"]
//! populate = ["status:archived"]
//! ```

mod env;
mod export;
mod mutation;
mod observability;
mod registry;
mod selection;

use std::path::Path;

pub use export::*;
pub use mutation::*;
pub use observability::*;
pub use registry::*;
pub use selection::*;
use serde::{Deserialize, Serialize};

/// Root configuration for a sweep run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweeperConfig {
    /// Registry connection and credentials.
    pub registry: RegistryConfig,

    /// Which workers are selected and in what order.
    pub selection: SelectionConfig,

    /// CSV export settings.
    #[serde(default)]
    pub export: ExportConfig,

    /// Attribute changes applied before deletion.
    #[serde(default)]
    pub mutation: MutationConfig,

    /// Safety settings.
    #[serde(default)]
    pub safety: SafetyConfig,

    /// Logging configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Problems found while loading that did not stop it.
    #[serde(skip)]
    pub warnings: Vec<ConfigWarning>,
}

/// A configuration problem that is reported but not fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// `MAX_WORKERS_TO_DELETE` was not a non-negative integer; no cap applies.
    InvalidMaxWorkers(String),
    /// The sort field is not an exported column; listing order is kept.
    SortFieldNotExported(String),
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidMaxWorkers(value) => write!(
                f,
                "MAX_WORKERS_TO_DELETE={value:?} is not a non-negative integer; no cap applied"
            ),
            Self::SortFieldNotExported(field) => write!(
                f,
                "Sort field '{field}' is not an exported column; workers will keep listing order"
            ),
        }
    }
}

/// Safety settings to prevent accidental data loss.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SafetyConfig {
    /// If true, export the selected workers without updating or deleting
    /// anything.
    /// Default: false
    #[serde(default)]
    pub dry_run: bool,
}

impl SweeperConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing variables cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;
        let mut config: SweeperConfig = toml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from flat environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = env::from_vars(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency and completeness.
    fn validate(&mut self) -> Result<(), ConfigError> {
        self.registry.validate()?;
        self.export.validate()?;
        self.mutation.validate()?;

        if let Some(field) = &self.selection.sort_field
            && !self.export.columns().any(|c| c == field)
        {
            self.warnings
                .push(ConfigWarning::SortFieldNotExported(field.clone()));
        }

        Ok(())
    }

    /// A copy safe to print: credentials are masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.registry.auth_token = "********".to_string();
        copy
    }
}

/// Commented configuration written by `sweeper init`.
pub fn default_config_toml() -> &'static str {
    r#"# Stale worker sweeper configuration.
#
# Values in ${...} are read from the environment when the file is loaded.

[registry]
account_sid = "${TWILIO_ACCOUNT_SID}"
auth_token = "${TWILIO_AUTH_TOKEN}"
workspace_sid = "${TWILIO_WORKSPACE_SID}"
# page_size = 1000
# timeout_secs = 30

[selection]
# Workers whose last status change is older than this are selected.
max_days_since_last_status_change = 90
# Exported column to sort by before the cap is applied.
# sort_field = "date_left"
# sort_direction = "asc"
# max_records = 100

[export]
filename_prefix = "inactive_workers"
directory = "."
fields = ["sid", "friendlyName", "dateStatusChanged"]
# attributes = ["email", "date_left", "routing.skills"]

[mutation]
# Attribute changes applied before each worker is deleted.
# clear = ["email"]
# delete = ["phone"]
# populate = ["status:archived"]

[safety]
# Export the selection without updating or deleting anything.
dry_run = false

[observability.logging]
level = "info"
format = "compact"
"#
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Expand environment variables in the format `${VAR_NAME}`.
/// Skips commented lines (lines where content before the variable is a comment).
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| ConfigError::Validation(e.to_string()))?;
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        // Find if there's a comment on this line
        let comment_pos = line.find('#');

        // Process the line, only expanding variables that appear before any comment
        let mut line_result = String::with_capacity(line.len());
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let Some(whole) = cap.get(0) else {
                continue;
            };

            // Skip if this variable is inside a comment
            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            // Add text before this match
            line_result.push_str(&line[last_end..whole.start()]);

            // Expand the variable
            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            line_result.push_str(&value);

            last_end = whole.end();
        }

        // Add remaining text after last match
        line_result.push_str(&line[last_end..]);
        result.push_str(&line_result);
        result.push('\n');
    }

    // Remove trailing newline if input didn't have one
    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}
