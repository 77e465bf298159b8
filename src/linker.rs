//! Journal -> issue membership lists.
//!
//! Step A rebuilds, per journal, the ordered list of bundle ids from the
//! filtered issue records. Step B reconciles each list against the Kernel,
//! tolerating journals that do not exist there yet.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{RecordError, TransportError};
use crate::kernel::{FetchResult, KernelClient, JOURNAL_ENDPOINT};
use crate::mapper;
use crate::records::RawIssue;

/// Ordered bundle ids per journal id.
pub type Membership = BTreeMap<String, Vec<String>>;

/// Builds the membership lists from already-filtered issues.
///
/// Each bundle id is inserted at its declared position (v36), skipping ids
/// already present. Positions past the end of the list are clamped to an
/// append; the source promises dense positions, so a clamp means dirty data
/// and is logged. Records that cannot be mapped or carry an unusable order
/// field were already reported by the issue phase and are skipped here.
pub fn build_membership(issues: &[RawIssue]) -> Membership {
    let mut membership = Membership::new();

    for issue in issues {
        let (bundle_id, _) = match mapper::issue_as_kernel(issue) {
            Ok(mapped) => mapped,
            Err(error) => {
                warn!(%error, "issue left out of membership lists");
                continue;
            }
        };

        // issue_as_kernel already required the parent link
        let Some(journal_id) = issue.journal_issn.clone() else {
            continue;
        };

        let declared = match issue.order.as_deref().map(str::parse::<usize>) {
            Some(Ok(position)) => position,
            _ => {
                let error = RecordError::InvalidOrder {
                    record: issue.label(),
                    value: issue.order.clone().unwrap_or_default(),
                };
                warn!(%error, "issue left out of membership lists");
                continue;
            }
        };

        let entries = membership.entry(journal_id).or_default();
        if entries.contains(&bundle_id) {
            continue;
        }
        let position = declared.min(entries.len());
        if position < declared {
            debug!(bundle = %bundle_id, declared, clamped = position, "clamped out-of-range issue position");
        }
        entries.insert(position, bundle_id);
    }

    membership
}

/// What happened to one journal's membership list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// List differed; the new ordered list was PUT.
    Updated,
    /// List already matched; no write happened.
    Unchanged,
    /// Journal not present in the Kernel; expected, skipped.
    SkippedMissing,
}

/// Reconciles one journal's issue list against the Kernel.
///
/// The comparison is order-sensitive: membership is an ordered sequence. A
/// journal missing from the registry is a normal condition (issues can be
/// processed before their parent journal exists) and is skipped.
pub async fn reconcile_membership(
    client: &KernelClient,
    journal_id: &str,
    issue_ids: &[String],
) -> Result<LinkOutcome, TransportError> {
    match client.get_entity(JOURNAL_ENDPOINT, journal_id).await? {
        FetchResult::NotFound => {
            warn!(journal = journal_id, "journal cannot be found, skipping issue linking");
            Ok(LinkOutcome::SkippedMissing)
        }
        FetchResult::Found(body) => {
            let current = body
                .get("items")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let desired: Vec<Value> = issue_ids
                .iter()
                .map(|id| Value::String(id.clone()))
                .collect();

            if current == desired {
                Ok(LinkOutcome::Unchanged)
            } else {
                client.put_journal_issues(journal_id, issue_ids).await?;
                info!(journal = journal_id, issues = issue_ids.len(), "updated issue list");
                Ok(LinkOutcome::Updated)
            }
        }
    }
}
