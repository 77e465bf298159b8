//! Error taxonomy for the ISIS -> Kernel mirror.
//!
//! Per-record input faults (`RecordError`) are kept apart from registry
//! transport faults (`TransportError`) so the batch driver can isolate the
//! former and decide retry/abort policy for the latter.

use thiserror::Error;

/// A fault in a single raw bibliographic record. Fatal for that record only;
/// the batch continues with the rest.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("journal record has no SciELO ISSN (v400)")]
    MissingScieloIssn,

    #[error("issue record {record} has no parent ISSN (v35)")]
    MissingJournalLink { record: String },

    #[error("issue record {record} has no publication date (v65)")]
    MissingPublicationDate { record: String },

    #[error("unparseable publication date '{date}' on issue record {record}")]
    UnparseableDate { record: String, date: String },

    #[error("invalid cover month '{value}' on issue record {record}")]
    InvalidMonth { record: String, value: String },

    #[error("invalid order field '{value}' (v36) on issue record {record}")]
    InvalidOrder { record: String, value: String },
}

/// A failure talking to the Kernel API. Never swallowed: the caller either
/// retries (transient) or surfaces it against the entity being reconciled.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus {
        url: String,
        status: reqwest::StatusCode,
    },
}
