//! Operator-facing error taxonomy.
//!
//! Malformed model files and inconclusive scans never show up here: they are
//! resolved into a lifecycle decision (`Validation::Invalid`,
//! `ScanVerdict::Inconclusive`) and logged. What remains needs someone to fix
//! credentials, connectivity, host trust or configuration.

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum GateError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("acknowledgment failed for some files: {}", failed.join("; "))]
    PartialBatch { failed: Vec<String> },
}

impl GateError {
    pub fn code(&self) -> &'static str {
        match self {
            GateError::Config(_) => "CONFIG",
            GateError::Transport(_) => "TRANSPORT",
            GateError::Scan(_) => "SCAN_FAILED",
            GateError::PartialBatch { .. } => "PARTIAL_BATCH",
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config section [{0}] is required for this command")]
    MissingSection(&'static str),
    #[error("{what} does not exist: {path}")]
    MissingPath { what: &'static str, path: PathBuf },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("listing request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("listing server answered with unexpected status {0}")]
    UnexpectedStatus(u16),
    #[error("host key for {host} is not trusted")]
    HostKeyRejected { host: String },
    #[error("authentication to {host} failed: {detail}")]
    Authentication { host: String, detail: String },
    #[error("could not connect to {host}: {detail}")]
    Connect { host: String, detail: String },
    #[error("transfer of {name} failed: {detail}")]
    Transfer { name: String, detail: String },
    #[error("interactive host trust needs a terminal on stdin")]
    InteractiveUnavailable,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    #[error("failed to start scanner {program}: {source}")]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },
    #[error("scanner did not finish within {0}s")]
    Timeout(u64),
    #[error("scanner i/o failed: {0}")]
    Io(#[from] std::io::Error),
}
