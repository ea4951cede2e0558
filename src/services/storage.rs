use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Appends one JSON line to the audit log. Audit failures are logged and
/// otherwise ignored.
pub fn audit(log: &Path, action: &str, data: serde_json::Value) {
    if let Some(parent) = log.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let event = serde_json::json!({
        "ts": chrono::Utc::now().to_rfc3339(),
        "action": action,
        "data": data
    });
    let line = format!("{}\n", event);
    let written = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log)
        .and_then(|mut f| std::io::Write::write_all(&mut f, line.as_bytes()));
    if let Err(e) = written {
        tracing::warn!(log = %log.display(), error = %e, "failed to append audit record");
    }
}

pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Renames `src` into `dir`, keeping its file name. Refuses to replace an
/// existing file because names are the only identity a file has.
pub fn move_into(src: &Path, dir: &Path) -> anyhow::Result<PathBuf> {
    let name = src
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("no file name in {}", src.display()))?;
    let dst = dir.join(name);
    if dst.exists() {
        anyhow::bail!("{} already exists", dst.display());
    }
    std::fs::rename(src, &dst)?;
    Ok(dst)
}

/// A name usable as a cross-host identity: a single path component that
/// cannot be mistaken for an option or a directory reference, and that a
/// remote shell or glob expansion passes through unchanged.
pub fn is_plain_name(name: &str) -> bool {
    name != "."
        && name != ".."
        && !name.starts_with('-')
        && !name.is_empty()
        && name.chars().all(|c| c.is_alphanumeric() || NAME_PUNCTUATION.contains(c))
}

const NAME_PUNCTUATION: &str = "._-+@%,=";

pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn plain_names() {
        assert!(is_plain_name("cube.stl"));
        assert!(is_plain_name("part_v2-final.obj"));
        assert!(is_plain_name("modèle.stl"));
        assert!(!is_plain_name(""));
        assert!(!is_plain_name(".."));
        assert!(!is_plain_name("../etc/passwd"));
        assert!(!is_plain_name("a\\b"));
        assert!(!is_plain_name("-oProxyCommand=x"));
    }

    #[test]
    fn shell_and_glob_characters_are_not_plain() {
        for name in [
            "a;touch x.stl",
            "$(id).stl",
            "`id`.stl",
            "*.stl",
            "cube?.stl",
            "[ab].stl",
            "my model.stl",
            "tab\there.stl",
            "quote'.stl",
            "pipe|.stl",
            "amp&.stl",
            "redir>.stl",
            "brace{a,b}.stl",
            "tilde~.stl",
            "line\nbreak.stl",
        ] {
            assert!(!is_plain_name(name), "{name:?}");
        }
    }

    #[test]
    fn move_into_refuses_to_overwrite() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        std::fs::create_dir_all(&a).unwrap();
        std::fs::create_dir_all(&b).unwrap();
        std::fs::write(a.join("x.stl"), b"one").unwrap();
        std::fs::write(b.join("x.stl"), b"two").unwrap();

        assert!(move_into(&a.join("x.stl"), &b).is_err());
        assert_eq!(std::fs::read(b.join("x.stl")).unwrap(), b"two");

        std::fs::remove_file(b.join("x.stl")).unwrap();
        let dst = move_into(&a.join("x.stl"), &b).unwrap();
        assert_eq!(dst, b.join("x.stl"));
        assert!(!a.join("x.stl").exists());
    }

    #[test]
    fn audit_appends_json_lines() {
        let tmp = TempDir::new().unwrap();
        let log = tmp.path().join("logs/audit.jsonl");
        audit(&log, "accepted", serde_json::json!({"file": "a.stl"}));
        audit(&log, "rejected", serde_json::json!({"file": "b.stl"}));
        let raw = std::fs::read_to_string(&log).unwrap();
        let lines: Vec<serde_json::Value> = raw
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["action"], "rejected");
        assert_eq!(lines[0]["data"]["file"], "a.stl");
    }

    #[test]
    fn sha256_of_known_content() {
        let tmp = TempDir::new().unwrap();
        let p = tmp.path().join("abc");
        std::fs::write(&p, b"abc").unwrap();
        assert_eq!(
            sha256_file(&p).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
