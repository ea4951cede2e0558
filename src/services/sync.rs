//! Download-side orchestration: list, pull, acknowledge.
//!
//! Pull and acknowledge are separate calls. A file only counts as local once
//! its byte count matches the size the server listed, and acknowledgment only
//! ever names files present in the download directory, so a crash between
//! the two is repaired by running `acknowledge` again.

use crate::domain::errors::{GateError, TransportError};
use crate::domain::models::{AckSummary, ListingResponse, PullReport};
use crate::services::remote::{ListingApi, RemoveOutcome};
use crate::services::storage::is_plain_name;
use crate::services::transport::{TransferSession, Transport};
use std::path::{Path, PathBuf};

pub struct SyncClient<'a, L: ListingApi> {
    api: L,
    transport: &'a dyn Transport,
    download: PathBuf,
}

impl<'a, L: ListingApi> SyncClient<'a, L> {
    pub fn new(api: L, transport: &'a dyn Transport, download: impl Into<PathBuf>) -> Self {
        Self {
            api,
            transport,
            download: download.into(),
        }
    }

    pub fn list(&self) -> Result<ListingResponse, TransportError> {
        self.api.fetch()
    }

    /// Transfers `requested` (every listed file when empty) into the download
    /// directory. Per-file problems are reported in the result; failing to
    /// list or to open the transport aborts the run.
    pub fn pull<S: AsRef<str>>(&self, requested: &[S]) -> Result<Vec<PullReport>, TransportError> {
        let listing = self.api.fetch()?;
        let names: Vec<String> = if requested.is_empty() {
            listing.scanned_files.clone()
        } else {
            requested.iter().map(|n| n.as_ref().to_string()).collect()
        };
        std::fs::create_dir_all(&self.download)?;

        let mut session: Option<Box<dyn TransferSession + 'a>> = None;
        let mut reports = Vec::with_capacity(names.len());
        for name in names {
            let expected = listing.size_of(&name);
            if !is_plain_name(&name) {
                tracing::warn!(file = %name, "refusing unsafe file name");
                reports.push(report(&name, "failed", None, Some("invalid file name".to_string())));
                continue;
            }
            if !listing.contains(&name) {
                tracing::warn!(file = %name, "file is not listed by the server");
                reports.push(report(&name, "not_listed", None, None));
                continue;
            }

            let local = self.download.join(&name);
            if let Ok(meta) = std::fs::metadata(&local) {
                if meta.is_file() && expected.map_or(true, |size| size == meta.len()) {
                    if expected.is_none() {
                        tracing::warn!(file = %name, "listing carries no size, trusting the local copy");
                    }
                    tracing::debug!(file = %name, "already downloaded");
                    reports.push(report(&name, "already_local", Some(meta.len()), None));
                    continue;
                }
                tracing::warn!(file = %name, local = meta.len(), listed = ?expected, "local copy differs, downloading again");
            }

            if session.is_none() {
                session = Some(self.transport.open()?);
            }
            if let Some(s) = session.as_mut() {
                reports.push(self.fetch_one(s.as_mut(), &name, expected, &local));
            }
        }
        Ok(reports)
    }

    fn fetch_one(
        &self,
        session: &mut (dyn TransferSession + 'a),
        name: &str,
        expected: Option<u64>,
        local: &Path,
    ) -> PullReport {
        let part = self.download.join(format!(".{name}.part"));
        if let Err(e) = session.fetch(name, &part) {
            tracing::error!(file = name, error = %e, "transfer failed");
            let _ = std::fs::remove_file(&part);
            return report(name, "failed", None, Some(e.to_string()));
        }
        let got = match std::fs::metadata(&part) {
            Ok(meta) => meta.len(),
            Err(e) => return report(name, "failed", None, Some(e.to_string())),
        };
        if expected.is_none() {
            tracing::warn!(file = name, size = got, "listing carries no size, transfer is unverified");
        }
        if let Some(want) = expected.filter(|want| *want != got) {
            tracing::error!(file = name, expected = want, got, "partial transfer discarded");
            let _ = std::fs::remove_file(&part);
            return report(
                name,
                "incomplete",
                Some(got),
                Some(format!("expected {want} bytes, got {got}")),
            );
        }
        if let Err(e) = std::fs::rename(&part, local) {
            let _ = std::fs::remove_file(&part);
            return report(name, "failed", None, Some(e.to_string()));
        }
        tracing::info!(file = name, size = got, "downloaded");
        report(name, "downloaded", Some(got), None)
    }

    /// Asks the server to archive the given names. Names without a local copy
    /// are never sent.
    pub fn acknowledge<S: AsRef<str>>(&self, names: &[S]) -> Result<AckSummary, GateError> {
        let mut summary = AckSummary::default();
        let mut send = Vec::new();
        for name in names {
            let name = name.as_ref();
            if is_plain_name(name) && self.download.join(name).is_file() {
                send.push(name.to_string());
            } else {
                tracing::warn!(file = name, "not acknowledging a file that is not local");
                summary.not_local.push(name.to_string());
            }
        }
        if send.is_empty() {
            return Ok(summary);
        }

        match self.api.remove(&send)? {
            RemoveOutcome::Removed { archived, missing } => {
                tracing::info!(
                    sent = send.len(),
                    archived = archived.len(),
                    already_gone = missing.len(),
                    "acknowledged"
                );
                summary.acknowledged = send;
                Ok(summary)
            }
            RemoveOutcome::Rejected { errors } => {
                tracing::error!(errors = ?errors, "server rejected part of the acknowledgment");
                Err(GateError::PartialBatch { failed: errors })
            }
        }
    }
}

fn report(name: &str, status: &str, size: Option<u64>, detail: Option<String>) -> PullReport {
    PullReport {
        name: name.to_string(),
        status: status.to_string(),
        size,
        detail,
    }
}
