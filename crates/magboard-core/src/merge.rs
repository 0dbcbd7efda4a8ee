//! Timestamp-based reconciliation of local and remote element collections.
//!
//! The merge is a pure function: no I/O, no hidden state. Remote is the
//! default source of truth; a local element overrides it only when its
//! timestamp is strictly newer, and a local element the remote does not know
//! about survives only while it is younger than the grace window.

use crate::shapes::{Element, ElementId};
use std::collections::HashMap;
use std::time::Duration;

/// Tunables of the merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergePolicy {
    /// How long a local-only element is treated as "not yet propagated"
    /// rather than "deleted remotely".
    pub grace_window: Duration,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            grace_window: Duration::from_millis(5000),
        }
    }
}

impl MergePolicy {
    fn grace_millis(&self) -> i64 {
        i64::try_from(self.grace_window.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Result of one merge.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// Local was empty; the remote collection was taken as is.
    Adopted(Vec<Element>),
    /// The merged collection differs from local.
    Merged(Vec<Element>),
    /// Nothing to apply.
    Unchanged,
}

impl MergeOutcome {
    /// The collection to install, if any.
    pub fn into_elements(self) -> Option<Vec<Element>> {
        match self {
            MergeOutcome::Adopted(e) | MergeOutcome::Merged(e) => Some(e),
            MergeOutcome::Unchanged => None,
        }
    }

    pub fn is_changed(&self) -> bool {
        !matches!(self, MergeOutcome::Unchanged)
    }
}

/// Reconcile `local` with a freshly fetched `remote` collection at time `now`.
pub fn merge(local: &[Element], remote: &[Element], now: i64, policy: &MergePolicy) -> MergeOutcome {
    if local.is_empty() {
        if remote.is_empty() {
            return MergeOutcome::Unchanged;
        }
        return MergeOutcome::Adopted(remote.to_vec());
    }

    let mut merged: Vec<Element> = remote.to_vec();
    let remote_index: HashMap<&str, usize> = remote
        .iter()
        .enumerate()
        .map(|(i, e)| (e.id.as_str(), i))
        .collect();
    let grace = policy.grace_millis();

    for element in local {
        match remote_index.get(element.id.as_str()) {
            Some(&i) => {
                if element.timestamp > merged[i].timestamp {
                    merged[i] = element.clone();
                }
            }
            None => {
                if now.saturating_sub(element.timestamp) < grace {
                    merged.push(element.clone());
                } else {
                    log::debug!("Dropping {} (deleted remotely)", element.id);
                }
            }
        }
    }

    let mut merged = crate::wire::dedupe_by_id(merged);
    merged.sort_by_key(|e| e.timestamp);

    if same_elements(local, &merged) {
        MergeOutcome::Unchanged
    } else {
        MergeOutcome::Merged(merged)
    }
}

/// Element-for-element equality keyed by id, ignoring order.
fn same_elements(a: &[Element], b: &[Element]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let by_id: HashMap<&ElementId, &Element> = a.iter().map(|e| (&e.id, e)).collect();
    by_id.len() == b.len() && b.iter().all(|e| by_id.get(&e.id).is_some_and(|l| *l == e))
}
