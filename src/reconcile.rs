//! The fetch-diff-patch-or-create protocol.
//!
//! This is the convergence mechanism of the whole mirror: repeated runs over
//! the same or updated source data drive the registry to the same state
//! without deleting registry-side fields the source does not know about.
//!
//! Emptiness is decided by one shared predicate, [`is_empty_value`], used by
//! both the create-path pruning and the update-path comparison payload so
//! the two paths cannot diverge.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::TransportError;
use crate::kernel::{FetchResult, KernelClient};

/// What a reconcile call did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Entity was absent; a pruned payload was PUT.
    Created,
    /// Entity existed and differed; a comparison payload was PATCHed.
    Updated,
    /// Entity existed and was equivalent; no write happened.
    Unchanged,
}

/// True for values that count as "no value": JSON null, `false`, numeric
/// zero, empty string, empty array, empty object.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map(|f| f == 0.0).unwrap_or(false),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}

/// Structural equality that ignores ordering inside arrays, at every depth.
/// Objects compare by key set; scalars compare exactly.
pub fn equivalent(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(xs), Value::Array(ys)) => {
            if xs.len() != ys.len() {
                return false;
            }
            let mut remaining: Vec<&Value> = ys.iter().collect();
            for x in xs {
                match remaining.iter().position(|y| equivalent(x, y)) {
                    Some(index) => {
                        remaining.swap_remove(index);
                    }
                    None => return false,
                }
            }
            true
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).map(|y| equivalent(x, y)).unwrap_or(false))
        }
        _ => a == b,
    }
}

/// Create-path pruning: keys with empty values are not asserted on create,
/// letting the registry apply its own defaults.
fn prune_empty(payload: &Map<String, Value>) -> Map<String, Value> {
    payload
        .iter()
        .filter(|(_, value)| !is_empty_value(value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Update-path payload: a key survives if the remote side already has a
/// value for it, or remote equals local, or the local value is non-empty.
/// Only keys empty locally AND absent (or empty-and-different) remotely are
/// dropped, so a patch never introduces spurious diffs against keys the
/// remote never had.
fn comparison_payload(
    payload: &Map<String, Value>,
    remote: &Map<String, Value>,
) -> Map<String, Value> {
    payload
        .iter()
        .filter(|(key, value)| {
            let remote_value = remote.get(*key);
            remote_value.map(|rv| !is_empty_value(rv)).unwrap_or(false)
                || remote_value.map(|rv| equivalent(rv, value)).unwrap_or(false)
                || !is_empty_value(value)
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Idempotent create-or-update of one entity against the Kernel.
///
/// GET the entity; if absent, PUT the pruned payload; if present, PATCH the
/// comparison payload only when it structurally differs from the remote
/// metadata (array order ignored). Unexpected GET statuses propagate as
/// transport errors.
pub async fn reconcile(
    client: &KernelClient,
    endpoint: &str,
    id: &str,
    payload: &Map<String, Value>,
) -> Result<ReconcileOutcome, TransportError> {
    match client.get_entity(endpoint, id).await? {
        FetchResult::NotFound => {
            let pruned = prune_empty(payload);
            client
                .put_entity(endpoint, id, &Value::Object(pruned))
                .await?;
            Ok(ReconcileOutcome::Created)
        }
        FetchResult::Found(body) => {
            let remote = body
                .get("metadata")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            let candidate = comparison_payload(payload, &remote);

            if equivalent(&Value::Object(remote), &Value::Object(candidate.clone())) {
                debug!(endpoint, id, "entity already converged");
                Ok(ReconcileOutcome::Unchanged)
            } else {
                client
                    .patch_entity(endpoint, id, &Value::Object(candidate))
                    .await?;
                Ok(ReconcileOutcome::Updated)
            }
        }
    }
}
