//! Worker registry access.
//!
//! The sweep pipeline talks to the registry only through [`RegistryClient`]:
//! list every worker, update one worker's attributes, delete one worker, and
//! look up the account so the operator can confirm the target before anything
//! is read.
//!
//! - [`HttpRegistryClient`]: TaskRouter REST API over `reqwest`
//! - `MemoryRegistry` (tests only): records every call and injects failures

mod http;
#[cfg(test)]
pub(crate) mod memory;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use http::HttpRegistryClient;

/// A worker as returned by the registry.
///
/// `attributes` is kept as the raw JSON string the registry stores; it is
/// parsed during projection so a malformed blob is reported against the
/// worker that carries it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub sid: String,
    #[serde(default)]
    pub friendly_name: String,
    #[serde(default)]
    pub account_sid: Option<String>,
    #[serde(default)]
    pub workspace_sid: Option<String>,
    #[serde(default)]
    pub activity_name: Option<String>,
    #[serde(default)]
    pub activity_sid: Option<String>,
    #[serde(default)]
    pub available: Option<bool>,
    #[serde(default)]
    pub attributes: String,
    /// Missing for workers that never changed status.
    #[serde(default)]
    pub date_status_changed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub url: Option<String>,
}

/// The account that owns the workspace, shown in the target confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Account {
    pub sid: String,
    #[serde(default)]
    pub friendly_name: String,
}

/// A failed registry call.
///
/// `status` is the HTTP status when the registry answered; transport errors
/// (connection refused, timeout) have none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (status {})", self.message, status),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for RemoteError {}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        Self {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

/// Registry operations used by the sweep.
///
/// Calls are issued one at a time by the caller; implementations do not need
/// to coordinate concurrent mutations of the same worker.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Fetch the account the credentials belong to.
    async fn account(&self) -> Result<Account, RemoteError>;

    /// List every worker in the workspace, following pagination.
    async fn list_all(&self) -> Result<Vec<Record>, RemoteError>;

    /// Replace a worker's attribute blob.
    async fn update(&self, sid: &str, attributes: &str) -> Result<(), RemoteError>;

    /// Delete a worker.
    async fn delete(&self, sid: &str) -> Result<(), RemoteError>;
}
