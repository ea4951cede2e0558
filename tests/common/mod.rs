#![allow(dead_code)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::process::{Child, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Scanner stand-in: reports an infection for any path containing "eicar".
const FAKE_SCANNER: &str = r#"#!/bin/sh
case "$1" in
  *eicar*) echo "$1: Eicar-Test-Signature FOUND"; infected=1 ;;
  *) echo "$1: OK"; infected=0 ;;
esac
echo
echo "----------- SCAN SUMMARY -----------"
echo "Known viruses: 8700000"
echo "Scanned files: 1"
echo "Infected files: $infected"
"#;

/// One scanning host, tracking server and download client sharing a temp
/// directory. The client uses the local transport against the server's sync
/// directory.
pub struct TestEnv {
    _tmp: TempDir,
    pub root: PathBuf,
    pub inbox: PathBuf,
    pub quarantine: PathBuf,
    pub rejected: PathBuf,
    pub sync: PathBuf,
    pub download: PathBuf,
    pub config: PathBuf,
    pub port: u16,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let root = tmp.path().to_path_buf();
        let inbox = root.join("UNSCANNED");
        let sync = root.join("SCANNED");
        fs::create_dir_all(&inbox).expect("create inbox");
        fs::create_dir_all(&sync).expect("create sync dir");

        let scanner = root.join("fake-clamscan.sh");
        fs::write(&scanner, FAKE_SCANNER).expect("write fake scanner");
        make_executable(&scanner);

        let port = free_port();
        let config = root.join("modelgate.toml");
        fs::write(
            &config,
            format!(
                r#"[logging]
level = "warn"
file = "logs/modelgate.log"

[intake]
inbox = "UNSCANNED"
quarantine = "QUARANTINE"
rejected = "REJECTED"
sync = "SCANNED"
scanner = "{scanner}"
scan_timeout_secs = 30
audit_log = "logs/audit.jsonl"

[listing]
sync = "SCANNED"
bind = "127.0.0.1:{port}"

[sync]
listing_url = "http://127.0.0.1:{port}"
download = "downloads"
transport = "local"
local_dir = "SCANNED"
"#,
                scanner = scanner.display()
            ),
        )
        .expect("write config");

        Self {
            inbox,
            quarantine: root.join("QUARANTINE"),
            rejected: root.join("REJECTED"),
            sync,
            download: root.join("downloads"),
            config,
            port,
            root,
            _tmp: tmp,
        }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("modelgate");
        cmd.env_remove("RUST_LOG").arg("--config").arg(&self.config);
        cmd
    }

    pub fn run_json(&self, args: &[&str]) -> Value {
        let mut cmd = self.cmd();
        let out = cmd
            .arg("--json")
            .args(args)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&out).expect("valid json output")
    }

    pub fn drop_in(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.inbox.join(name);
        fs::write(&path, bytes).expect("write inbox file");
        path
    }
}

/// Runs `modelgate serve` for the lifetime of the value.
pub struct ServerGuard(Child);

impl ServerGuard {
    pub fn start(env: &TestEnv) -> Self {
        let child = std::process::Command::new(env!("CARGO_BIN_EXE_modelgate"))
            .arg("--config")
            .arg(&env.config)
            .arg("serve")
            .env_remove("RUST_LOG")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn listing server");
        let guard = ServerGuard(child);
        let deadline = Instant::now() + Duration::from_secs(10);
        while TcpStream::connect(("127.0.0.1", env.port)).is_err() {
            assert!(Instant::now() < deadline, "listing server did not start");
            std::thread::sleep(Duration::from_millis(50));
        }
        guard
    }
}

impl Drop for ServerGuard {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

/// 80-byte header, little-endian triangle count, 50 bytes per triangle.
pub fn binary_stl(triangles: u32) -> Vec<u8> {
    let mut bytes = vec![b' '; 80];
    bytes.extend_from_slice(&triangles.to_le_bytes());
    bytes.resize(84 + 50 * triangles as usize, 0);
    bytes
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .expect("reserve a port")
        .port()
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path).expect("stat scanner").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod scanner");
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}
