//! Kernel REST API integration
//!
//! This module provides:
//! - An HTTP client for the Kernel's journal and bundle endpoints
//! - A typed fetch result distinguishing found / not-found / transport error

pub mod client;

pub use client::{FetchResult, KernelClient, BUNDLE_ENDPOINT, JOURNAL_ENDPOINT};
