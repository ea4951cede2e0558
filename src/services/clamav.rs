//! Malware scanner invocation and report interpretation.
//!
//! The scanner is an external executable run once per file. Only its stdout
//! matters: per-file lines first, then a block introduced by a line containing
//! `SUMMARY` with `key: value` pairs. The exit code is ignored.

use crate::domain::constants::{INFECTED_FILES_FIELD, SUMMARY_MARKER};
use crate::domain::errors::ScanError;
use crate::domain::models::{ScanReport, ScanVerdict, SummaryValue};
use crate::services::settings::IntakeConfig;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub trait MalwareScanner {
    fn scan(&self, file: &Path) -> Result<ScanReport, ScanError>;
}

#[derive(Debug, Clone)]
pub struct Scanner {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl MalwareScanner for Scanner {
    fn scan(&self, file: &Path) -> Result<ScanReport, ScanError> {
        let output = self.run(file)?;
        Ok(parse_report(&output))
    }
}

impl Scanner {
    pub fn from_config(cfg: &IntakeConfig) -> Self {
        Self {
            program: cfg.scanner.clone(),
            args: cfg.scanner_args.clone(),
            timeout: cfg.scan_timeout,
        }
    }

    /// Runs the scanner against one file and returns its stdout. The child is
    /// killed once `timeout` elapses.
    pub fn run(&self, file: &Path) -> Result<String, ScanError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(file)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ScanError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let out_reader = std::thread::spawn(move || read_all(stdout));
        let err_reader = std::thread::spawn(move || read_all(stderr));

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ScanError::Timeout(self.timeout.as_secs()));
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let stdout = out_reader.join().unwrap_or_default();
        let stderr = err_reader.join().unwrap_or_default();
        if !stderr.trim().is_empty() {
            tracing::debug!(file = %file.display(), stderr = %stderr.trim(), "scanner stderr");
        }
        tracing::debug!(file = %file.display(), code = ?status.code(), "scanner exited");
        Ok(stdout)
    }
}

fn read_all(pipe: Option<impl Read>) -> String {
    let mut buf = Vec::new();
    if let Some(mut p) = pipe {
        let _ = p.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

pub fn parse_report(output: &str) -> ScanReport {
    let mut report = ScanReport::default();
    let mut in_summary = false;
    for line in output.lines() {
        if !in_summary {
            if line.contains(SUMMARY_MARKER) {
                in_summary = true;
            } else if !line.is_empty() {
                report.entries.push(line.split(':').map(str::to_string).collect());
            }
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            tracing::debug!(line, "ignoring summary line without a colon");
            continue;
        };
        report
            .summary
            .insert(key.trim().to_string(), coerce(value.trim()));
    }
    report
}

fn coerce(value: &str) -> SummaryValue {
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = value.parse() {
            return SummaryValue::Int(n);
        }
    }
    SummaryValue::Text(value.to_string())
}

/// Exactly one infected file means infected. A count above one cannot come
/// from a single-file scan and is treated as inconclusive.
pub fn classify(summary: &BTreeMap<String, SummaryValue>) -> ScanVerdict {
    match summary.get(INFECTED_FILES_FIELD) {
        Some(SummaryValue::Int(1)) => ScanVerdict::Infected,
        Some(SummaryValue::Int(0)) => ScanVerdict::Clean,
        _ => ScanVerdict::Inconclusive,
    }
}
