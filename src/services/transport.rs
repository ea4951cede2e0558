//! File retrieval from the tracking server.
//!
//! A `Transport` opens a scoped `TransferSession`; the connection lives as
//! long as the session value and is torn down in `Drop`, so every exit path
//! (success, auth failure, protocol error, panic unwinding) releases it.
//!
//! Host-key trust is a capability handed to the SSH transport: `FailClosed`
//! for unattended runs, `Interactive` only when an operator asked for it on a
//! terminal.

use crate::domain::errors::TransportError;
use crate::services::settings::{SshConfig, SyncConfig, TransportConfig};
use crate::services::storage::is_plain_name;
use std::ffi::OsString;
use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

const READY_POLL: Duration = Duration::from_millis(100);
const INTERACTIVE_CONNECT_WINDOW: Duration = Duration::from_secs(300);

pub trait HostKeyPolicy {
    fn name(&self) -> &'static str;
    /// Extra `ssh`/`scp` options enforcing the policy.
    fn ssh_options(&self) -> Vec<String>;
    /// Whether the connecting process may talk to the operator.
    fn attach_terminal(&self) -> bool;
}

/// Unknown or changed host keys abort the connection.
pub struct FailClosed;

impl HostKeyPolicy for FailClosed {
    fn name(&self) -> &'static str {
        "fail-closed"
    }

    fn ssh_options(&self) -> Vec<String> {
        vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=yes".to_string(),
        ]
    }

    fn attach_terminal(&self) -> bool {
        false
    }
}

/// Unknown host keys are shown to the operator, who must confirm them.
/// Accepted keys are written to the known-hosts file by ssh itself.
pub struct Interactive;

impl HostKeyPolicy for Interactive {
    fn name(&self) -> &'static str {
        "interactive"
    }

    fn ssh_options(&self) -> Vec<String> {
        vec!["-o".to_string(), "StrictHostKeyChecking=ask".to_string()]
    }

    fn attach_terminal(&self) -> bool {
        true
    }
}

pub fn host_key_policy(interactive: bool) -> Result<Box<dyn HostKeyPolicy>, TransportError> {
    if !interactive {
        return Ok(Box::new(FailClosed));
    }
    if !std::io::stdin().is_terminal() {
        return Err(TransportError::InteractiveUnavailable);
    }
    Ok(Box::new(Interactive))
}

pub trait Transport {
    fn open(&self) -> Result<Box<dyn TransferSession + '_>, TransportError>;
}

pub trait TransferSession {
    /// Copies the remote file `name` to `dest`.
    fn fetch(&mut self, name: &str, dest: &Path) -> Result<(), TransportError>;
}

pub fn build_transport(
    cfg: &SyncConfig,
    policy: Box<dyn HostKeyPolicy>,
) -> Box<dyn Transport> {
    match &cfg.transport {
        TransportConfig::Local { dir } => Box::new(LocalTransport::new(dir.clone())),
        TransportConfig::Ssh(ssh) => Box::new(SshTransport::new(ssh.clone(), policy)),
    }
}

/// The server's sync directory is mounted on the client.
pub struct LocalTransport {
    dir: PathBuf,
}

impl LocalTransport {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

struct LocalSession<'a> {
    dir: &'a Path,
}

impl Transport for LocalTransport {
    fn open(&self) -> Result<Box<dyn TransferSession + '_>, TransportError> {
        if !self.dir.is_dir() {
            return Err(TransportError::Connect {
                host: self.dir.display().to_string(),
                detail: "directory is not available".to_string(),
            });
        }
        Ok(Box::new(LocalSession { dir: &self.dir }))
    }
}

impl TransferSession for LocalSession<'_> {
    fn fetch(&mut self, name: &str, dest: &Path) -> Result<(), TransportError> {
        std::fs::copy(self.dir.join(name), dest).map_err(|e| TransportError::Transfer {
            name: name.to_string(),
            detail: e.to_string(),
        })?;
        Ok(())
    }
}

/// OpenSSH client: one control-master connection per session, reused by
/// `scp` for every file.
pub struct SshTransport {
    cfg: SshConfig,
    policy: Box<dyn HostKeyPolicy>,
}

impl SshTransport {
    pub fn new(cfg: SshConfig, policy: Box<dyn HostKeyPolicy>) -> Self {
        Self { cfg, policy }
    }

    fn destination(&self) -> String {
        format!("{}@{}", self.cfg.username, self.cfg.host)
    }

    fn common_options(&self, port_flag: &str) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            port_flag.into(),
            self.cfg.port.to_string().into(),
            "-i".into(),
            self.cfg.identity_file.clone().into(),
            "-o".into(),
            "IdentitiesOnly=yes".into(),
            "-o".into(),
            format!("ConnectTimeout={}", self.cfg.connect_timeout.as_secs().max(1)).into(),
            "-o".into(),
            "LogLevel=ERROR".into(),
        ];
        if let Some(known) = &self.cfg.known_hosts {
            let mut opt = OsString::from("UserKnownHostsFile=");
            opt.push(known);
            args.push("-o".into());
            args.push(opt);
        }
        args.extend(self.policy.ssh_options().into_iter().map(OsString::from));
        args
    }

    fn control_check(&self, control: &Path) -> bool {
        Command::new(&self.cfg.ssh_program)
            .arg("-S")
            .arg(control)
            .args(["-O", "check"])
            .arg(self.destination())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn classify_failure(&self, stderr: &str) -> TransportError {
        let host = self.cfg.host.clone();
        let detail = stderr.trim().to_string();
        if detail.contains("Host key verification failed")
            || detail.contains("REMOTE HOST IDENTIFICATION HAS CHANGED")
            || detail.contains("No matching host key")
        {
            TransportError::HostKeyRejected { host }
        } else if detail.contains("Permission denied") || detail.contains("Too many authentication") {
            TransportError::Authentication { host, detail }
        } else {
            TransportError::Connect { host, detail }
        }
    }
}

impl Transport for SshTransport {
    fn open(&self) -> Result<Box<dyn TransferSession + '_>, TransportError> {
        let control_dir = tempfile::Builder::new().prefix("modelgate-ssh").tempdir()?;
        let control = control_dir.path().join("ctl");
        let terminal = self.policy.attach_terminal();

        tracing::info!(
            host = %self.cfg.host,
            port = self.cfg.port,
            trust = self.policy.name(),
            "opening ssh session"
        );
        let mut master = Command::new(&self.cfg.ssh_program)
            .args(["-M", "-N", "-S"])
            .arg(&control)
            .args(["-o", "ControlPersist=no"])
            .args(self.common_options("-p"))
            .arg(self.destination())
            .stdin(if terminal { Stdio::inherit() } else { Stdio::null() })
            .stdout(Stdio::null())
            .stderr(if terminal { Stdio::inherit() } else { Stdio::piped() })
            .spawn()?;

        let window = if terminal {
            INTERACTIVE_CONNECT_WINDOW
        } else {
            self.cfg.connect_timeout + Duration::from_secs(5)
        };
        let deadline = Instant::now() + window;
        loop {
            if let Some(status) = master.try_wait()? {
                let mut stderr = String::new();
                if let Some(mut pipe) = master.stderr.take() {
                    let _ = pipe.read_to_string(&mut stderr);
                }
                tracing::error!(host = %self.cfg.host, code = ?status.code(), stderr = %stderr.trim(), "ssh connection failed");
                return Err(self.classify_failure(&stderr));
            }
            if self.control_check(&control) {
                break;
            }
            if Instant::now() >= deadline {
                let _ = master.kill();
                let _ = master.wait();
                return Err(TransportError::Connect {
                    host: self.cfg.host.clone(),
                    detail: format!("not ready after {}s", window.as_secs()),
                });
            }
            std::thread::sleep(READY_POLL);
        }
        tracing::info!(host = %self.cfg.host, "connected");

        Ok(Box::new(SshSession {
            transport: self,
            master,
            control,
            _control_dir: control_dir,
        }))
    }
}

struct SshSession<'a> {
    transport: &'a SshTransport,
    master: Child,
    control: PathBuf,
    _control_dir: tempfile::TempDir,
}

impl TransferSession for SshSession<'_> {
    fn fetch(&mut self, name: &str, dest: &Path) -> Result<(), TransportError> {
        let t = self.transport;
        // scp hands the remote path to a shell or a glob; only plain names may
        // be spliced into it.
        if !is_plain_name(name) {
            return Err(TransportError::Transfer {
                name: name.to_string(),
                detail: "invalid file name".to_string(),
            });
        }
        let remote = format!("{}:{}/{}", t.destination(), t.cfg.remote_dir, name);
        let mut control_opt = OsString::from("ControlPath=");
        control_opt.push(&self.control);
        let out = Command::new(&t.cfg.scp_program)
            .arg("-q")
            .arg("-o")
            .arg(control_opt)
            .args(["-o", "ControlMaster=no"])
            .args(t.common_options("-P"))
            .arg(&remote)
            .arg(dest)
            .stdin(Stdio::null())
            .output()?;
        if !out.status.success() {
            return Err(TransportError::Transfer {
                name: name.to_string(),
                detail: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        tracing::info!(remote = %remote, local = %dest.display(), "downloaded file");
        Ok(())
    }
}

impl Drop for SshSession<'_> {
    fn drop(&mut self) {
        let _ = Command::new(&self.transport.cfg.ssh_program)
            .arg("-S")
            .arg(&self.control)
            .args(["-O", "exit"])
            .arg(self.transport.destination())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if let Ok(None) = self.master.try_wait() {
            let _ = self.master.kill();
        }
        let _ = self.master.wait();
        tracing::info!(host = %self.transport.cfg.host, "ssh session closed");
    }
}
