//! Flat environment-variable configuration source.
//!
//! Used when no config file is available. Lists are comma-separated.

use super::{
    ConfigError, ConfigWarning, ExportConfig, MutationConfig, ObservabilityConfig, PopulateEntry,
    RegistryConfig, SafetyConfig, SelectionConfig, SortDirection, StalenessThreshold,
    SweeperConfig,
    export::{default_fields, default_filename_prefix},
    registry::{default_api_url, default_page_size, default_taskrouter_url, default_timeout_secs},
};

pub(super) fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<SweeperConfig, ConfigError> {
    let required = |name: &str| {
        get(name)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::EnvVarNotFound(name.to_string()))
    };
    let optional = |name: &str| get(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let list = |name: &str| optional(name).map(|v| split_list(&v)).unwrap_or_default();

    let registry = RegistryConfig {
        account_sid: required("TWILIO_ACCOUNT_SID")?,
        auth_token: required("TWILIO_AUTH_TOKEN")?,
        workspace_sid: required("TWILIO_WORKSPACE_SID")?,
        api_url: default_api_url(),
        taskrouter_url: default_taskrouter_url(),
        page_size: default_page_size(),
        timeout_secs: default_timeout_secs(),
    };

    let threshold = StalenessThreshold::parse(&required("MAX_DAYS_SINCE_LAST_STATUS_CHANGE")?)?;

    let mut warnings = Vec::new();
    let max_records = optional("MAX_WORKERS_TO_DELETE").and_then(|raw| match raw.parse::<usize>() {
        Ok(n) => Some(n),
        Err(_) => {
            warnings.push(ConfigWarning::InvalidMaxWorkers(raw));
            None
        }
    });

    let selection = SelectionConfig {
        max_days_since_last_status_change: threshold,
        sort_field: optional("SORT_WORKER_FIELD"),
        sort_direction: optional("SORT_WORKER_DIRECTION")
            .map(SortDirection::from)
            .unwrap_or_default(),
        max_records,
    };

    let fields = optional("EXPORT_WORKER_PROPERTIES")
        .map(|v| split_list(&v))
        .unwrap_or_else(default_fields);
    let export = ExportConfig {
        filename_prefix: optional("CSV_FILENAME_PREFIX").unwrap_or_else(default_filename_prefix),
        fields,
        attributes: list("EXPORT_WORKER_ATTRIBUTES"),
        ..ExportConfig::default()
    };

    let populate = list("POPULATE_WORKER_ATTRIBUTES")
        .iter()
        .map(|raw| PopulateEntry::parse(raw))
        .collect::<Result<Vec<_>, _>>()?;
    let mutation = MutationConfig {
        clear: list("CLEAR_WORKER_ATTRIBUTES"),
        delete: list("DELETE_WORKER_ATTRIBUTES"),
        populate,
    };

    Ok(SweeperConfig {
        registry,
        selection,
        export,
        mutation,
        safety: SafetyConfig::default(),
        observability: ObservabilityConfig::default(),
        warnings,
    })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
