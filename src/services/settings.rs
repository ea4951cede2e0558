//! Configuration file parsing and per-role configuration.
//!
//! One TOML file may carry sections for every role, but each host normally
//! only fills in its own. A command asks for the role config it needs and gets
//! an immutable struct whose paths have been resolved and checked; anything
//! missing is a `ConfigError` at startup rather than a failure halfway
//! through a run.

use crate::domain::constants::{
    DEFAULT_ARCHIVE_DIR, DEFAULT_BIND, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_SCAN_TIMEOUT_SECS, DEFAULT_SSH_PORT,
};
use crate::domain::errors::ConfigError;
use crate::services::storage::{ensure_dir, is_plain_name};
use crate::services::validate::ValidationOptions;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub logging: LoggingSettings,
    pub intake: Option<IntakeSection>,
    pub listing: Option<ListingSection>,
    pub sync: Option<SyncSection>,
    /// Directory relative paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntakeSection {
    pub inbox: PathBuf,
    pub quarantine: PathBuf,
    pub rejected: PathBuf,
    pub sync: PathBuf,
    pub scanner: PathBuf,
    #[serde(default)]
    pub scanner_args: Vec<String>,
    #[serde(default = "default_scan_timeout")]
    pub scan_timeout_secs: u64,
    #[serde(default)]
    pub accept_ascii_stl: bool,
    #[serde(default)]
    pub ascii_extra_keywords: Vec<String>,
    #[serde(default)]
    pub reject_unsupported: bool,
    #[serde(default)]
    pub alert_command: Vec<String>,
    pub audit_log: Option<PathBuf>,
}

fn default_scan_timeout() -> u64 {
    DEFAULT_SCAN_TIMEOUT_SECS
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingSection {
    pub sync: PathBuf,
    #[serde(default = "default_archive")]
    pub archive: String,
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_archive() -> String {
    DEFAULT_ARCHIVE_DIR.to_string()
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Ssh,
    Local,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncSection {
    pub listing_url: String,
    pub download: PathBuf,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub transport: TransportKind,
    pub local_dir: Option<PathBuf>,
    pub ssh: Option<SshSection>,
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

#[derive(Debug, Clone, Deserialize)]
pub struct SshSection {
    pub host: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    pub username: String,
    pub identity_file: PathBuf,
    pub remote_dir: String,
    pub known_hosts: Option<PathBuf>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_ssh_program")]
    pub ssh_program: PathBuf,
    #[serde(default = "default_scp_program")]
    pub scp_program: PathBuf,
}

fn default_ssh_port() -> u16 {
    DEFAULT_SSH_PORT
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_ssh_program() -> PathBuf {
    PathBuf::from("ssh")
}

fn default_scp_program() -> PathBuf {
    PathBuf::from("scp")
}

#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub inbox: PathBuf,
    pub quarantine: PathBuf,
    pub rejected: PathBuf,
    pub sync: PathBuf,
    pub scanner: PathBuf,
    pub scanner_args: Vec<String>,
    pub scan_timeout: Duration,
    pub validation: ValidationOptions,
    pub reject_unsupported: bool,
    pub alert_command: Vec<String>,
    pub audit_log: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ListingConfig {
    pub sync: PathBuf,
    pub archive: String,
    pub bind: SocketAddr,
}

#[derive(Debug, Clone)]
pub enum TransportConfig {
    Local { dir: PathBuf },
    Ssh(SshConfig),
}

#[derive(Debug, Clone)]
pub struct SshConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub identity_file: PathBuf,
    pub remote_dir: String,
    pub known_hosts: Option<PathBuf>,
    pub connect_timeout: Duration,
    pub ssh_program: PathBuf,
    pub scp_program: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub listing_url: reqwest::Url,
    pub download: PathBuf,
    pub request_timeout: Duration,
    pub transport: TransportConfig,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::from_toml(&raw, base)
    }

    /// Like `load`, but a missing file yields defaults. Used by commands that
    /// work without any role section.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::NotFound(_)) => Ok(Self {
                base_dir: PathBuf::from("."),
                ..Self::default()
            }),
            other => other,
        }
    }

    pub fn from_toml(raw: &str, base_dir: PathBuf) -> Result<Self, ConfigError> {
        let mut settings: Settings = toml::from_str(raw)?;
        settings.base_dir = base_dir;
        Ok(settings)
    }

    fn resolve(&self, p: &Path) -> PathBuf {
        let expanded = expand_home(p);
        if expanded.is_absolute() {
            expanded
        } else {
            self.base_dir.join(expanded)
        }
    }

    pub fn log_file(&self) -> Option<PathBuf> {
        self.logging.file.as_deref().map(|p| self.resolve(p))
    }

    pub fn intake_config(&self) -> Result<IntakeConfig, ConfigError> {
        let s = self
            .intake
            .as_ref()
            .ok_or(ConfigError::MissingSection("intake"))?;
        let inbox = existing_dir(self.resolve(&s.inbox), "inbox directory")?;
        let sync = existing_dir(self.resolve(&s.sync), "sync directory")?;
        let quarantine = created_dir(self.resolve(&s.quarantine))?;
        let rejected = created_dir(self.resolve(&s.rejected))?;
        if [&quarantine, &rejected, &sync].contains(&&inbox) {
            return Err(ConfigError::Invalid(
                "inbox must differ from the quarantine, rejected and sync directories".to_string(),
            ));
        }
        let scanner = if s.scanner.components().count() > 1 {
            let p = self.resolve(&s.scanner);
            if !p.exists() {
                return Err(ConfigError::MissingPath {
                    what: "scanner executable",
                    path: p,
                });
            }
            p
        } else {
            // Bare program name, looked up on PATH at spawn time.
            s.scanner.clone()
        };
        if s.scan_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "scan_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(IntakeConfig {
            inbox,
            quarantine,
            rejected,
            sync,
            scanner,
            scanner_args: s.scanner_args.clone(),
            scan_timeout: Duration::from_secs(s.scan_timeout_secs),
            validation: ValidationOptions {
                accept_ascii_stl: s.accept_ascii_stl,
                ascii_extra_keywords: s.ascii_extra_keywords.clone(),
            },
            reject_unsupported: s.reject_unsupported,
            alert_command: s.alert_command.clone(),
            audit_log: s.audit_log.as_deref().map(|p| self.resolve(p)),
        })
    }

    /// Validation options without requiring the rest of the intake section.
    pub fn validation_options(&self) -> ValidationOptions {
        self.intake
            .as_ref()
            .map(|s| ValidationOptions {
                accept_ascii_stl: s.accept_ascii_stl,
                ascii_extra_keywords: s.ascii_extra_keywords.clone(),
            })
            .unwrap_or_default()
    }

    pub fn listing_config(&self, bind_override: Option<&str>) -> Result<ListingConfig, ConfigError> {
        let s = self
            .listing
            .as_ref()
            .ok_or(ConfigError::MissingSection("listing"))?;
        let sync = existing_dir(self.resolve(&s.sync), "sync directory")?;
        if !is_plain_name(&s.archive) {
            return Err(ConfigError::Invalid(format!(
                "archive must be a single directory name, got {:?}",
                s.archive
            )));
        }
        created_dir(sync.join(&s.archive))?;
        let bind_raw = bind_override.unwrap_or(&s.bind);
        let bind = bind_raw
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("bind address {bind_raw:?}: {e}")))?;
        Ok(ListingConfig {
            sync,
            archive: s.archive.clone(),
            bind,
        })
    }

    pub fn sync_config(&self) -> Result<SyncConfig, ConfigError> {
        let s = self
            .sync
            .as_ref()
            .ok_or(ConfigError::MissingSection("sync"))?;
        let listing_url = reqwest::Url::parse(&s.listing_url)
            .map_err(|e| ConfigError::Invalid(format!("listing_url {:?}: {e}", s.listing_url)))?;
        let download = created_dir(self.resolve(&s.download))?;
        let transport = match s.transport {
            TransportKind::Local => {
                let dir = s.local_dir.as_deref().ok_or_else(|| {
                    ConfigError::Invalid("transport = \"local\" needs local_dir".to_string())
                })?;
                TransportConfig::Local {
                    dir: existing_dir(self.resolve(dir), "local sync directory")?,
                }
            }
            TransportKind::Ssh => {
                let ssh = s.ssh.as_ref().ok_or(ConfigError::MissingSection("sync.ssh"))?;
                let identity_file = self.resolve(&ssh.identity_file);
                if !identity_file.is_file() {
                    return Err(ConfigError::MissingPath {
                        what: "ssh identity file",
                        path: identity_file,
                    });
                }
                TransportConfig::Ssh(SshConfig {
                    host: ssh.host.clone(),
                    port: ssh.port,
                    username: ssh.username.clone(),
                    identity_file,
                    remote_dir: ssh.remote_dir.trim_end_matches('/').to_string(),
                    known_hosts: ssh.known_hosts.as_deref().map(|p| self.resolve(p)),
                    connect_timeout: Duration::from_secs(ssh.connect_timeout_secs),
                    ssh_program: ssh.ssh_program.clone(),
                    scp_program: ssh.scp_program.clone(),
                })
            }
        };
        Ok(SyncConfig {
            listing_url,
            download,
            request_timeout: Duration::from_secs(s.request_timeout_secs),
            transport,
        })
    }
}

fn expand_home(p: &Path) -> PathBuf {
    if let Ok(rest) = p.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    p.to_path_buf()
}

fn existing_dir(path: PathBuf, what: &'static str) -> Result<PathBuf, ConfigError> {
    if path.is_dir() {
        Ok(path)
    } else {
        Err(ConfigError::MissingPath { what, path })
    }
}

fn created_dir(path: PathBuf) -> Result<PathBuf, ConfigError> {
    ensure_dir(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
