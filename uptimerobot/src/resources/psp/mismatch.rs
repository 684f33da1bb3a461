//! Requested vs. applied monitor membership

use crate::api::{ApiError, PspBackend};
use futures::future::join_all;
use std::collections::BTreeSet;
use std::fmt::Write;

/// Splits the symmetric difference into `(missing, extra)`: requested but
/// not applied, and applied but not requested. Both are sorted ascending
/// and free of duplicates.
pub fn diff_monitor_ids(requested: &[i64], applied: &[i64]) -> (Vec<i64>, Vec<i64>) {
    let requested: BTreeSet<i64> = requested.iter().copied().collect();
    let applied: BTreeSet<i64> = applied.iter().copied().collect();

    (
        requested.difference(&applied).copied().collect(),
        applied.difference(&requested).copied().collect(),
    )
}

/// Why a requested monitor is not on the page
#[derive(Debug, Clone, PartialEq)]
pub enum MissingMonitor {
    /// The monitor does not exist (deleted, or a typo)
    NotFound(i64),
    /// The monitor exists but the API did not attach it
    ExistsUnattached(i64),
    /// The lookup itself failed
    CheckFailed {
        id: i64,
        code: Option<String>,
        message: String,
    },
}

impl MissingMonitor {
    pub fn id(&self) -> i64 {
        match self {
            MissingMonitor::NotFound(id) | MissingMonitor::ExistsUnattached(id) => *id,
            MissingMonitor::CheckFailed { id, .. } => *id,
        }
    }

    fn classify(id: i64, lookup: Result<(), ApiError>) -> Self {
        match lookup {
            Ok(()) => MissingMonitor::ExistsUnattached(id),
            Err(e) if e.is_not_found() => MissingMonitor::NotFound(id),
            Err(ApiError::Forbidden { code, message }) => {
                MissingMonitor::CheckFailed { id, code, message }
            }
            Err(e) => MissingMonitor::CheckFailed {
                id,
                code: None,
                message: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct MismatchReport {
    pub requested: Vec<i64>,
    pub applied: Vec<i64>,
    pub missing: Vec<MissingMonitor>,
    pub extra: Vec<i64>,
}

impl MismatchReport {
    /// A mismatch worth failing the operation over
    pub fn is_reportable(&self) -> bool {
        !self.missing.is_empty() || !self.extra.is_empty()
    }

    pub fn summary(&self) -> &'static str {
        "Monitor IDs were not applied as requested"
    }

    /// Human-readable detail with remediation hints
    pub fn detail(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Requested monitor IDs: {}", join(&self.requested));
        let _ = writeln!(out, "Applied monitor IDs:   {}", join(&self.applied));
        let missing: Vec<i64> = self.missing.iter().map(MissingMonitor::id).collect();
        let _ = writeln!(out, "Missing: {}", join(&missing));
        let _ = writeln!(out, "Unexpected: {}", join(&self.extra));

        for missing in &self.missing {
            let _ = match missing {
                MissingMonitor::NotFound(id) => writeln!(
                    out,
                    "- monitor {} does not exist; remove it from monitor_ids or create it first",
                    id
                ),
                MissingMonitor::ExistsUnattached(id) => writeln!(
                    out,
                    "- monitor {} exists but was not attached; check that it belongs to this account and is not paused",
                    id
                ),
                MissingMonitor::CheckFailed {
                    id,
                    code: Some(code),
                    message,
                } => writeln!(
                    out,
                    "- monitor {} could not be checked ({}): {}",
                    id, code, message
                ),
                MissingMonitor::CheckFailed { id, code: None, message } => {
                    writeln!(out, "- monitor {} could not be checked: {}", id, message)
                }
            };
        }
        if !self.extra.is_empty() {
            let _ = writeln!(
                out,
                "- monitors {} are attached but not configured; add them to monitor_ids or detach them",
                join(&self.extra)
            );
        }

        out.trim_end().to_string()
    }
}

fn join(ids: &[i64]) -> String {
    if ids.is_empty() {
        return "(none)".to_string();
    }
    ids.iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Diffs the sets and looks up every missing id to explain the gap.
/// Lookups run concurrently.
pub async fn classify_and_report(
    backend: &dyn PspBackend,
    requested: &[i64],
    applied: &[i64],
) -> MismatchReport {
    let (missing, extra) = diff_monitor_ids(requested, applied);

    let lookups = missing.iter().map(|id| async move {
        let lookup = backend.get_monitor(*id).await.map(|_| ());
        MissingMonitor::classify(*id, lookup)
    });
    let missing = join_all(lookups).await;

    let mut requested: Vec<i64> = requested.to_vec();
    requested.sort_unstable();
    requested.dedup();
    let mut applied: Vec<i64> = applied.to_vec();
    applied.sort_unstable();
    applied.dedup();

    MismatchReport {
        requested,
        applied,
        missing,
        extra,
    }
}
