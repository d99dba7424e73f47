use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;

use super::{Account, Record, RegistryClient, RemoteError};
use crate::config::RegistryConfig;

/// TaskRouter worker registry over HTTP.
///
/// Every request authenticates with the account SID and auth token using
/// HTTP Basic auth.
pub struct HttpRegistryClient {
    client: Client,
    api_url: String,
    taskrouter_url: String,
    account_sid: String,
    auth_token: String,
    workspace_sid: String,
    page_size: u32,
}

/// One page of the worker listing.
#[derive(Debug, Deserialize)]
struct WorkerPage {
    #[serde(default)]
    workers: Vec<Record>,
    #[serde(default)]
    meta: Option<PageMeta>,
}

#[derive(Debug, Deserialize)]
struct PageMeta {
    #[serde(default)]
    next_page_url: Option<String>,
}

/// Error body returned by the registry API.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl HttpRegistryClient {
    pub fn from_config(config: &RegistryConfig) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("sweeper/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            taskrouter_url: config.taskrouter_url.trim_end_matches('/').to_string(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            workspace_sid: config.workspace_sid.clone(),
            page_size: config.page_size,
        })
    }

    fn workers_url(&self) -> String {
        format!(
            "{}/v1/Workspaces/{}/Workers",
            self.taskrouter_url, self.workspace_sid
        )
    }

    fn worker_url(&self, sid: &str) -> String {
        format!("{}/{}", self.workers_url(), sid)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.basic_auth(&self.account_sid, Some(&self.auth_token))
    }
}

/// Turn a non-success response into a [`RemoteError`].
///
/// The HTTP status is authoritative. The body's `message` is used when the
/// registry sent one, otherwise the status reason phrase.
async fn error_from_response(response: Response) -> RemoteError {
    let status = response.status();
    let body_message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty());

    let message = body_message.unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });

    RemoteError::http(status.as_u16(), message)
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn account(&self) -> Result<Account, RemoteError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}.json",
            self.api_url, self.account_sid
        );
        let response = self.authed(self.client.get(&url)).send().await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(response.json::<Account>().await?)
    }

    async fn list_all(&self) -> Result<Vec<Record>, RemoteError> {
        let mut workers = Vec::new();
        let mut next = Some(format!(
            "{}?PageSize={}",
            self.workers_url(),
            self.page_size
        ));
        let mut pages = 0u32;

        while let Some(url) = next.take() {
            let response = self.authed(self.client.get(&url)).send().await?;

            if !response.status().is_success() {
                return Err(error_from_response(response).await);
            }

            let page: WorkerPage = response.json().await?;
            pages += 1;
            tracing::debug!(page = pages, count = page.workers.len(), "Fetched worker page");

            workers.extend(page.workers);
            next = page
                .meta
                .and_then(|m| m.next_page_url)
                .filter(|u| !u.is_empty());
        }

        Ok(workers)
    }

    async fn update(&self, sid: &str, attributes: &str) -> Result<(), RemoteError> {
        let response = self
            .authed(self.client.post(self.worker_url(sid)))
            .form(&[("Attributes", attributes)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(())
    }

    async fn delete(&self, sid: &str) -> Result<(), RemoteError> {
        let response = self
            .authed(self.client.delete(self.worker_url(sid)))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(())
    }
}
