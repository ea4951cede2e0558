//! Tracking-server view of the sync directory.
//!
//! The directory is the state: every call re-enumerates it, and archiving is a
//! rename into the reserved archive subdirectory. Acknowledging a name that is
//! already gone succeeds, so a client may retry a batch after a crash.

use crate::domain::models::{AckFailure, AckReport, ListedFile};
use crate::services::settings::ListingConfig;
use crate::services::storage::is_plain_name;
use std::io::ErrorKind;
use std::path::PathBuf;

/// What happened to one acknowledged name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveOutcome {
    Archived,
    AlreadyGone,
}

#[derive(Debug, Clone)]
pub struct ListingService {
    sync_dir: PathBuf,
    archive: String,
}

impl ListingService {
    pub fn new(sync_dir: impl Into<PathBuf>, archive: impl Into<String>) -> Self {
        Self {
            sync_dir: sync_dir.into(),
            archive: archive.into(),
        }
    }

    pub fn from_config(cfg: &ListingConfig) -> Self {
        Self::new(cfg.sync.clone(), cfg.archive.clone())
    }

    fn archive_dir(&self) -> PathBuf {
        self.sync_dir.join(&self.archive)
    }

    /// Regular files awaiting pickup, sorted by name.
    pub fn list_files(&self) -> std::io::Result<Vec<ListedFile>> {
        let mut out = Vec::new();
        for entry in std::fs::read_dir(&self.sync_dir)? {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                tracing::warn!(path = %entry.path().display(), "skipping non UTF-8 file name");
                continue;
            };
            if name == self.archive {
                continue;
            }
            // Raced with an archive or intake move; skip quietly.
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            if meta.is_file() {
                out.push(ListedFile {
                    name,
                    size: meta.len(),
                });
            }
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    pub fn acknowledge<S: AsRef<str>>(&self, names: &[S]) -> AckReport {
        let mut report = AckReport::default();
        for name in names {
            let name = name.as_ref();
            match self.archive_one(name) {
                Ok(ArchiveOutcome::Archived) => {
                    tracing::info!(file = name, archive = %self.archive, "archived acknowledged file");
                    report.archived.push(name.to_string());
                }
                Ok(ArchiveOutcome::AlreadyGone) => {
                    tracing::warn!(file = name, "acknowledged file does not exist");
                    report.missing.push(name.to_string());
                }
                Err(error) => {
                    tracing::error!(file = name, %error, "failed to archive acknowledged file");
                    report.failed.push(AckFailure {
                        name: name.to_string(),
                        error,
                    });
                }
            }
        }
        report
    }

    fn archive_one(&self, name: &str) -> Result<ArchiveOutcome, String> {
        if !is_plain_name(name) || name == self.archive {
            return Err("invalid file name".to_string());
        }
        let src = self.sync_dir.join(name);
        let meta = match std::fs::symlink_metadata(&src) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ArchiveOutcome::AlreadyGone),
            Err(e) => return Err(e.to_string()),
        };
        if !meta.is_file() {
            return Err("not a regular file".to_string());
        }
        let archive = self.archive_dir();
        std::fs::create_dir_all(&archive).map_err(|e| e.to_string())?;
        match std::fs::rename(&src, archive.join(name)) {
            Ok(()) => Ok(ArchiveOutcome::Archived),
            // Lost a race with another acknowledgment.
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(ArchiveOutcome::AlreadyGone),
            Err(e) => Err(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::AckStatus;
    use tempfile::TempDir;

    fn names(svc: &ListingService) -> Vec<String> {
        svc.list_files().unwrap().into_iter().map(|f| f.name).collect()
    }

    fn service() -> (TempDir, ListingService) {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("DONE")).unwrap();
        let svc = ListingService::new(tmp.path(), "DONE");
        (tmp, svc)
    }

    #[test]
    fn list_excludes_archive_and_directories() {
        let (tmp, svc) = service();
        std::fs::write(tmp.path().join("b.stl"), b"bb").unwrap();
        std::fs::write(tmp.path().join("a.obj"), b"a").unwrap();
        std::fs::create_dir_all(tmp.path().join("stray")).unwrap();

        assert_eq!(names(&svc), vec!["a.obj", "b.stl"]);
        assert_eq!(
            svc.list_files().unwrap()[1],
            ListedFile {
                name: "b.stl".to_string(),
                size: 2
            }
        );
    }

    #[test]
    fn acknowledge_archives_and_is_idempotent() {
        let (tmp, svc) = service();
        std::fs::write(tmp.path().join("cube.stl"), b"x").unwrap();

        let first = svc.acknowledge(&["cube.stl"]);
        assert_eq!(first.archived, vec!["cube.stl"]);
        assert_eq!(first.status(), AckStatus::Success);
        assert!(tmp.path().join("DONE/cube.stl").is_file());
        assert!(names(&svc).is_empty());

        let second = svc.acknowledge(&["cube.stl"]);
        assert!(second.archived.is_empty());
        assert_eq!(second.missing, vec!["cube.stl"]);
        assert!(second.failed.is_empty());
        assert_eq!(second.status(), AckStatus::Success);
    }

    #[test]
    fn archive_one_distinguishes_moved_from_already_gone() {
        let (tmp, svc) = service();
        std::fs::write(tmp.path().join("cube.stl"), b"x").unwrap();
        assert_eq!(svc.archive_one("cube.stl"), Ok(ArchiveOutcome::Archived));
        assert_eq!(svc.archive_one("cube.stl"), Ok(ArchiveOutcome::AlreadyGone));
        assert_eq!(svc.archive_one("never.stl"), Ok(ArchiveOutcome::AlreadyGone));
        assert_eq!(svc.archive_one("a;b.stl"), Err("invalid file name".to_string()));
    }

    #[test]
    fn partial_failure_does_not_abort_batch() {
        let (tmp, svc) = service();
        std::fs::write(tmp.path().join("good.stl"), b"x").unwrap();
        std::fs::create_dir_all(tmp.path().join("dir.stl")).unwrap();

        let report = svc.acknowledge(&["../escape.stl", "dir.stl", "good.stl", "DONE"]);
        assert_eq!(report.archived, vec!["good.stl"]);
        assert_eq!(report.failed.len(), 3);
        assert_eq!(report.failed[0].error, "invalid file name");
        assert_eq!(report.failed[1].error, "not a regular file");
        assert_eq!(report.status(), AckStatus::Success);
        assert!(tmp.path().join("DONE").is_dir());
    }

    #[test]
    fn batch_fails_only_when_every_name_fails() {
        let (_tmp, svc) = service();
        let report = svc.acknowledge(&["..", "a/b"]);
        assert_eq!(report.status(), AckStatus::Failed);

        let empty: [&str; 0] = [];
        assert_eq!(svc.acknowledge(&empty).status(), AckStatus::Success);
    }

    #[test]
    fn archive_dir_is_recreated_when_missing() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("m.obj"), b"v 0 0 0").unwrap();
        let svc = ListingService::new(tmp.path(), "DONE");
        assert_eq!(svc.acknowledge(&["m.obj"]).archived, vec!["m.obj"]);
        assert!(tmp.path().join("DONE/m.obj").is_file());
    }
}
