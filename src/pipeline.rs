//! Batch driver: read the two JSON dumps, mirror journals, then issues,
//! then membership lists, in that fixed order.
//!
//! A fault in one record is logged with the record's identity, counted, and
//! never aborts the batch; the protocol is safe to re-run for the
//! unconverged subset.

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::config::Settings;
use crate::kernel::{KernelClient, BUNDLE_ENDPOINT, JOURNAL_ENDPOINT};
use crate::linker::{self, LinkOutcome};
use crate::mapper;
use crate::reconcile::{reconcile, ReconcileOutcome};
use crate::records::{self, IsisRecord, RawIssue, RawJournal};

/// Per-entity-kind convergence counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Counts {
    fn record(&mut self, outcome: ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Created => self.created += 1,
            ReconcileOutcome::Updated => self.updated += 1,
            ReconcileOutcome::Unchanged => self.unchanged += 1,
        }
    }
}

impl fmt::Display for Counts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created {}, updated {}, unchanged {}, skipped {}, failed {}",
            self.created, self.updated, self.unchanged, self.skipped, self.failed
        )
    }
}

/// End-of-run report. A non-zero `failed` count means those entities did
/// not converge and the run should be repeated once the cause is fixed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub journals: Counts,
    pub issues: Counts,
    pub links: Counts,
}

impl SyncReport {
    pub fn has_failures(&self) -> bool {
        self.journals.failed > 0 || self.issues.failed > 0 || self.links.failed > 0
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "journals: {}", self.journals)?;
        writeln!(f, "issues:   {}", self.issues)?;
        write!(f, "links:    {}", self.links)
    }
}

/// Runs one full mirror pass: journals, issues, then membership links.
pub async fn run(settings: &Settings) -> Result<SyncReport> {
    let client = KernelClient::new(settings)?;
    let mut report = SyncReport::default();

    let journals = load_records(&settings.title_json_path)?;
    info!(
        count = journals.len(),
        path = %settings.title_json_path.display(),
        "loaded title records"
    );
    process_journals(&client, &journals, &mut report.journals).await;

    let issue_records = load_records(&settings.issue_json_path)?;
    info!(
        count = issue_records.len(),
        path = %settings.issue_json_path.display(),
        "loaded issue records"
    );
    let issues = records::filter_issues(issue_records.iter().map(RawIssue::from_isis).collect());
    process_issues(&client, &issues, &mut report.issues).await;

    // Membership depends on the bundle ids derived above, so it runs only
    // after every issue reconciliation has completed.
    let membership = linker::build_membership(&issues);
    for (journal_id, issue_ids) in &membership {
        match linker::reconcile_membership(&client, journal_id, issue_ids).await {
            Ok(LinkOutcome::Updated) => report.links.updated += 1,
            Ok(LinkOutcome::Unchanged) => report.links.unchanged += 1,
            Ok(LinkOutcome::SkippedMissing) => report.links.skipped += 1,
            Err(err) => {
                error!(journal = %journal_id, %err, "membership reconciliation failed");
                report.links.failed += 1;
            }
        }
    }

    info!(%report, "mirror pass finished");
    Ok(report)
}

async fn process_journals(client: &KernelClient, journals: &[IsisRecord], counts: &mut Counts) {
    for record in journals {
        let raw = RawJournal::from_isis(record);
        let (id, payload) = match mapper::journal_as_kernel(&raw) {
            Ok(mapped) => mapped,
            Err(err) => {
                error!(%err, title = raw.title.as_deref().unwrap_or("<untitled>"), "skipping malformed journal record");
                counts.failed += 1;
                continue;
            }
        };

        match payload_map(&payload) {
            Ok(map) => match reconcile(client, JOURNAL_ENDPOINT, &id, &map).await {
                Ok(outcome) => {
                    info!(journal = %id, ?outcome, "journal reconciled");
                    counts.record(outcome);
                }
                Err(err) => {
                    error!(journal = %id, %err, "journal reconciliation failed");
                    counts.failed += 1;
                }
            },
            Err(err) => {
                error!(journal = %id, %err, "journal payload serialization failed");
                counts.failed += 1;
            }
        }
    }
}

async fn process_issues(client: &KernelClient, issues: &[RawIssue], counts: &mut Counts) {
    for issue in issues {
        let (id, payload) = match mapper::issue_as_kernel(issue) {
            Ok(mapped) => mapped,
            Err(err) => {
                error!(%err, "skipping malformed issue record");
                counts.failed += 1;
                continue;
            }
        };

        match payload_map(&payload) {
            Ok(map) => match reconcile(client, BUNDLE_ENDPOINT, &id, &map).await {
                Ok(outcome) => {
                    info!(bundle = %id, ?outcome, "issue reconciled");
                    counts.record(outcome);
                }
                Err(err) => {
                    error!(bundle = %id, %err, "issue reconciliation failed");
                    counts.failed += 1;
                }
            },
            Err(err) => {
                error!(bundle = %id, %err, "issue payload serialization failed");
                counts.failed += 1;
            }
        }
    }
}

fn payload_map<T: Serialize>(payload: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(payload)? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("payload serialized to a non-object: {other}"),
    }
}

fn load_records(path: &Path) -> Result<Vec<IsisRecord>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse {} as a record array", path.display()))
}
