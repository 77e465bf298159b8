//! Kernel API client
//!
//! Thin HTTP client over the Kernel's documented contract: existence check
//! (GET), create (PUT), partial update (PATCH), and the journal membership
//! endpoint. Transient transport failures retry a bounded number of times;
//! the reconcile protocol on top is idempotent, so repeats are safe.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tokio::time::sleep;
use tracing::debug;

use crate::config::Settings;
use crate::error::TransportError;

pub const JOURNAL_ENDPOINT: &str = "journals";
pub const BUNDLE_ENDPOINT: &str = "bundles";

/// Outcome of an existence check against the Kernel.
#[derive(Debug, Clone)]
pub enum FetchResult {
    /// 200: the full response body (`{"metadata": ..., "items": ...}`).
    Found(Value),
    /// 404: the entity does not exist yet.
    NotFound,
}

pub struct KernelClient {
    client: Client,
    base_url: String,
    max_retries: u32,
    retry_backoff: Duration,
}

impl KernelClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.kernel_base_url.as_str().trim_end_matches('/').to_string(),
            max_retries: settings.max_retries,
            retry_backoff: settings.retry_backoff,
        })
    }

    fn entity_url(&self, endpoint: &str, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, endpoint, id)
    }

    /// Checks whether an entity exists, returning its current state if so.
    /// Any status other than 200/404 is an unexpected-status error.
    pub async fn get_entity(&self, endpoint: &str, id: &str) -> Result<FetchResult, TransportError> {
        let url = self.entity_url(endpoint, id);
        let response = self.send_with_retry(Method::GET, &url, None).await?;

        match response.status() {
            StatusCode::OK => {
                let body = response
                    .json()
                    .await
                    .map_err(|source| TransportError::Request {
                        url: url.clone(),
                        source,
                    })?;
                Ok(FetchResult::Found(body))
            }
            StatusCode::NOT_FOUND => Ok(FetchResult::NotFound),
            status => Err(TransportError::UnexpectedStatus { url, status }),
        }
    }

    /// Creates an entity.
    pub async fn put_entity(
        &self,
        endpoint: &str,
        id: &str,
        payload: &Value,
    ) -> Result<(), TransportError> {
        let url = self.entity_url(endpoint, id);
        let response = self.send_with_retry(Method::PUT, &url, Some(payload)).await?;
        expect_success(&url, response.status())
    }

    /// Partially updates an entity.
    pub async fn patch_entity(
        &self,
        endpoint: &str,
        id: &str,
        payload: &Value,
    ) -> Result<(), TransportError> {
        let url = self.entity_url(endpoint, id);
        let response = self
            .send_with_retry(Method::PATCH, &url, Some(payload))
            .await?;
        expect_success(&url, response.status())
    }

    /// Replaces the ordered issue membership list of a journal.
    pub async fn put_journal_issues(
        &self,
        journal_id: &str,
        issue_ids: &[String],
    ) -> Result<(), TransportError> {
        let url = format!("{}/{}/{}/issues", self.base_url, JOURNAL_ENDPOINT, journal_id);
        let body = serde_json::json!(issue_ids);
        let response = self.send_with_retry(Method::PUT, &url, Some(&body)).await?;
        expect_success(&url, response.status())
    }

    /// Sends one request, retrying connect errors, timeouts and 5xx
    /// responses up to `max_retries` times with a fixed backoff. 4xx
    /// responses are returned to the caller for interpretation.
    async fn send_with_retry(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Response, TransportError> {
        let mut attempt = 0;
        loop {
            let mut request = self.client.request(method.clone(), url);
            if let Some(body) = body {
                request = request.json(body);
            }
            let result = request.send().await;

            let transient = match &result {
                Ok(response) => response.status().is_server_error(),
                Err(error) => error.is_connect() || error.is_timeout(),
            };

            if transient && attempt < self.max_retries {
                attempt += 1;
                debug!(url, attempt, "retrying kernel request after transient failure");
                sleep(self.retry_backoff).await;
                continue;
            }

            return result.map_err(|source| TransportError::Request {
                url: url.to_string(),
                source,
            });
        }
    }
}

fn expect_success(url: &str, status: StatusCode) -> Result<(), TransportError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(TransportError::UnexpectedStatus {
            url: url.to_string(),
            status,
        })
    }
}
