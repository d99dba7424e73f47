use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Registry connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Account SID, used as the Basic auth username.
    pub account_sid: String,

    /// Auth token, used as the Basic auth password.
    pub auth_token: String,

    /// Workspace whose workers are swept.
    pub workspace_sid: String,

    /// Base URL for account lookups.
    /// Default: https://api.twilio.com
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Base URL for the worker API.
    /// Default: https://taskrouter.twilio.com
    #[serde(default = "default_taskrouter_url")]
    pub taskrouter_url: String,

    /// Workers requested per listing page (1-1000).
    /// Default: 1000
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Per-request timeout in seconds.
    /// Default: 30
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

pub(crate) fn default_api_url() -> String {
    "https://api.twilio.com".to_string()
}

pub(crate) fn default_taskrouter_url() -> String {
    "https://taskrouter.twilio.com".to_string()
}

pub(crate) fn default_page_size() -> u32 {
    1000
}

pub(crate) fn default_timeout_secs() -> u64 {
    30
}

impl RegistryConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("account_sid", &self.account_sid),
            ("auth_token", &self.auth_token),
            ("workspace_sid", &self.workspace_sid),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "registry.{name} must not be empty"
                )));
            }
        }

        if !(1..=1000).contains(&self.page_size) {
            return Err(ConfigError::Validation(format!(
                "registry.page_size must be between 1 and 1000, got {}",
                self.page_size
            )));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "registry.timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}
