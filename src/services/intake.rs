//! Scanning-host pipeline: scan, validate, relocate.
//!
//! Files are handled one at a time in name order. Malformed files and
//! inconclusive scans never surface as errors; they become a decision and a
//! log line. Only a scanner that cannot be started aborts the run, because
//! every following file would fail the same way.

use crate::domain::errors::ScanError;
use crate::domain::models::{IntakeReport, ModelFormat, ScanVerdict};
use crate::lifecycle::{decide, Decision, Stage};
use crate::services::clamav::{classify, MalwareScanner};
use crate::services::settings::IntakeConfig;
use crate::services::storage::{audit, move_into, sha256_file};
use crate::services::validate::classify_model;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub struct IntakePipeline<'a, S: MalwareScanner> {
    config: &'a IntakeConfig,
    scanner: S,
}

impl<'a, S: MalwareScanner> IntakePipeline<'a, S> {
    pub fn new(config: &'a IntakeConfig, scanner: S) -> Self {
        Self { config, scanner }
    }

    pub fn run(&self) -> anyhow::Result<Vec<IntakeReport>> {
        let files = self.inbox_files()?;
        tracing::info!(count = files.len(), inbox = %self.config.inbox.display(), "intake run starting");
        let mut reports = Vec::with_capacity(files.len());
        for file in files {
            reports.push(self.process(&file)?);
        }
        Ok(reports)
    }

    fn inbox_files(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.config.inbox)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn process(&self, file: &Path) -> anyhow::Result<IntakeReport> {
        let verdict = self.scan(file)?;
        let decision = decide(verdict, || classify_model(file, &self.config.validation));
        let target = decision.target_stage(self.config.reject_unsupported)?;
        let stage = self.apply(file, &decision, target);

        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (format, count) = match &decision {
            Decision::Accept { format, count } => (Some(*format), Some(*count)),
            _ => (None, None),
        };
        let report = IntakeReport {
            file: name,
            action: decision.action().to_string(),
            stage,
            format,
            count,
            reason: decision.reason(),
        };
        self.record(file, stage, &report);
        Ok(report)
    }

    fn scan(&self, file: &Path) -> Result<ScanVerdict, ScanError> {
        tracing::info!(file = %file.display(), "scan starting");
        match self.scanner.scan(file) {
            Ok(report) => {
                let verdict = classify(&report.summary);
                tracing::info!(file = %file.display(), ?verdict, "scan done");
                Ok(verdict)
            }
            Err(e @ ScanError::Timeout(_)) => {
                tracing::error!(file = %file.display(), error = %e, "scan timed out");
                Ok(ScanVerdict::Inconclusive)
            }
            Err(e) => Err(e),
        }
    }

    /// Performs the move for an already decided transition and returns the
    /// stage the file actually ended up in.
    fn apply(&self, file: &Path, decision: &Decision, target: Stage) -> Stage {
        let dir = match target {
            Stage::Quarantine => &self.config.quarantine,
            Stage::Rejected => &self.config.rejected,
            Stage::SyncReady => &self.config.sync,
            Stage::Inbox => {
                tracing::warn!(
                    file = %file.display(),
                    reason = %decision.reason(),
                    "not a valid binary STL, ASCII STL or OBJ file; leaving in inbox"
                );
                return Stage::Inbox;
            }
        };

        match decision {
            Decision::Quarantine { reason } => {
                tracing::error!(file = %file.display(), %reason, "infected file detected")
            }
            Decision::Reject { reason } | Decision::Unsupported { reason } => {
                tracing::warn!(file = %file.display(), %reason, "rejecting file")
            }
            Decision::Accept { format, count } => log_accept(file, *format, *count),
        }

        match move_into(file, dir) {
            Ok(dst) => {
                tracing::info!(from = %file.display(), to = %dst.display(), "moved file");
                if target.is_terminal() {
                    self.alert(&dst, target, &decision.reason());
                }
                target
            }
            Err(e) => {
                tracing::error!(file = %file.display(), dir = %dir.display(), error = %e, "failed to move file");
                if target.is_terminal() {
                    self.alert(file, Stage::Inbox, &format!("{}; move failed: {e}", decision.reason()));
                }
                Stage::Inbox
            }
        }
    }

    fn alert(&self, file: &Path, stage: Stage, reason: &str) {
        let Some((program, args)) = self.config.alert_command.split_first() else {
            return;
        };
        let stage = serde_json::to_value(stage)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let status = Command::new(program)
            .args(args)
            .env("MODELGATE_FILE", file)
            .env("MODELGATE_STAGE", stage)
            .env("MODELGATE_REASON", reason)
            .stdin(Stdio::null())
            .status();
        match status {
            Ok(s) if s.success() => tracing::info!(file = %file.display(), "alert sent"),
            Ok(s) => tracing::error!(file = %file.display(), code = ?s.code(), "alert command failed"),
            Err(e) => tracing::error!(file = %file.display(), error = %e, "alert command could not start"),
        }
    }

    fn record(&self, file: &Path, stage: Stage, report: &IntakeReport) {
        let Some(log) = &self.config.audit_log else {
            return;
        };
        let located = match stage {
            Stage::Quarantine => self.config.quarantine.join(&report.file),
            Stage::Rejected => self.config.rejected.join(&report.file),
            Stage::SyncReady => self.config.sync.join(&report.file),
            _ => file.to_path_buf(),
        };
        let sha256 = sha256_file(&located).ok();
        audit(
            log,
            &report.action,
            serde_json::json!({
                "file": report.file,
                "stage": stage,
                "reason": report.reason,
                "sha256": sha256,
            }),
        );
    }
}

fn log_accept(file: &Path, format: ModelFormat, count: u64) {
    match format {
        ModelFormat::Obj => {
            tracing::info!(file = %file.display(), faces = count, "valid OBJ file")
        }
        _ => tracing::info!(file = %file.display(), %format, triangles = count, "valid STL file"),
    }
}
