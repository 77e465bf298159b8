//! Runtime settings for the sync engine.
//!
//! Built once at process start (`Settings::from_env`) and passed by
//! reference into the client and pipeline; no ambient lookups happen
//! anywhere past this boundary.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use url::Url;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the Kernel API, e.g. `http://kernel.scielo.org`.
    pub kernel_base_url: Url,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Bounded retry count for transient transport failures (connect,
    /// timeout, 5xx). Safe because the reconcile protocol is idempotent.
    pub max_retries: u32,
    /// Delay between retry attempts.
    pub retry_backoff: Duration,
    /// JSON dump of the title (journal) base, written by isis2json upstream.
    pub title_json_path: PathBuf,
    /// JSON dump of the issue base.
    pub issue_json_path: PathBuf,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let base = env::var("KERNEL_API_URL").context("KERNEL_API_URL is not set")?;
        let kernel_base_url = Url::parse(&base)
            .with_context(|| format!("KERNEL_API_URL is not a valid URL: {base}"))?;

        let title_json_path =
            PathBuf::from(env::var("TITLE_JSON_PATH").context("TITLE_JSON_PATH is not set")?);
        let issue_json_path =
            PathBuf::from(env::var("ISSUE_JSON_PATH").context("ISSUE_JSON_PATH is not set")?);

        let timeout_secs = match env::var("KERNEL_TIMEOUT_SECS") {
            Ok(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("KERNEL_TIMEOUT_SECS is not a number: {raw}"))?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        let max_retries = match env::var("KERNEL_MAX_RETRIES") {
            Ok(raw) => raw
                .parse::<u32>()
                .with_context(|| format!("KERNEL_MAX_RETRIES is not a number: {raw}"))?,
            Err(_) => DEFAULT_MAX_RETRIES,
        };

        Ok(Self {
            kernel_base_url,
            request_timeout: Duration::from_secs(timeout_secs),
            max_retries,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            title_json_path,
            issue_json_path,
        })
    }

    /// Settings with default timing, for callers that already have the
    /// values in hand (tests, embedding).
    pub fn new(kernel_base_url: Url, title_json_path: PathBuf, issue_json_path: PathBuf) -> Self {
        Self {
            kernel_base_url,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            title_json_path,
            issue_json_path,
        }
    }
}
