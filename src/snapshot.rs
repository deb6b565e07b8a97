//! Filesystem snapshots: the run's transaction boundary.
//!
//! Before any emitter touches the target tree, the orchestrator hands every
//! candidate path to [`SnapshotManager::create_backup`]. Existing files are
//! checksummed and copied into a timestamp+reason-named folder; paths that
//! do not exist yet are recorded so a restore can remove whatever a failed
//! run left behind. `manifest.json` inside the folder is the single source
//! of truth for restoration.
//!
//! Restore re-verifies each backup file against its recorded checksum and
//! fails loudly on any mismatch or on a missing manifest — this is the sole
//! undo mechanism, so silent partial restores are never acceptable.

use crate::error::{GeneratorError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

const MANIFEST_FILE: &str = "manifest.json";

/// One backed-up file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub original: PathBuf,
    pub backup: PathBuf,
    pub checksum: String,
}

/// Snapshot manifest: `{timestamp, reason, files: [...]}` plus the planned
/// paths that did not exist at snapshot time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub timestamp: DateTime<Utc>,
    pub reason: String,
    pub files: Vec<ManifestEntry>,
    #[serde(default)]
    pub absent: Vec<PathBuf>,
}

/// Handle to one snapshot on disk.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub id: String,
    pub dir: PathBuf,
    pub manifest: Manifest,
}

/// Creates, restores, lists and prunes snapshots under one backup root.
#[derive(Debug, Clone)]
pub struct SnapshotManager {
    root: PathBuf,
}

impl SnapshotManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Back up every existing file in `files`; absent paths are recorded,
    /// not an error. Returns the snapshot handle.
    pub fn create_backup(&self, files: &[PathBuf], reason: &str) -> Result<Snapshot> {
        let timestamp = Utc::now();
        let base_id = format!(
            "{}_{}",
            timestamp.format("%Y%m%dT%H%M%S%3f"),
            slugify(reason)
        );
        // Same-millisecond runs must not clobber an existing folder.
        let mut id = base_id.clone();
        let mut dir = self.root.join(&id);
        let mut attempt = 1;
        while dir.exists() {
            attempt += 1;
            id = format!("{base_id}-{attempt}");
            dir = self.root.join(&id);
        }
        let payload_dir = dir.join("files");
        fs::create_dir_all(&payload_dir)?;

        let mut manifest = Manifest {
            timestamp,
            reason: reason.to_string(),
            files: Vec::new(),
            absent: Vec::new(),
        };

        for (index, original) in files.iter().enumerate() {
            if !original.exists() {
                manifest.absent.push(original.clone());
                continue;
            }
            let file_name = original
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "file".to_string());
            let backup = payload_dir.join(format!("{index:04}_{file_name}"));
            let checksum = file_checksum(original)?;
            fs::copy(original, &backup)?;
            manifest.files.push(ManifestEntry {
                original: original.clone(),
                backup,
                checksum,
            });
        }

        let manifest_path = dir.join(MANIFEST_FILE);
        fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;

        tracing::info!(
            snapshot = %id,
            backed_up = manifest.files.len(),
            absent = manifest.absent.len(),
            "snapshot created"
        );

        Ok(Snapshot { id, dir, manifest })
    }

    /// Replay a snapshot's manifest over the target tree.
    ///
    /// Backed-up bytes are copied back over their original paths; planned
    /// paths that did not exist at snapshot time are deleted if a failed
    /// run created them.
    pub fn restore_backup(&self, snapshot: &Snapshot) -> Result<()> {
        // Always re-read the manifest from disk: it is the source of truth,
        // and a missing or unreadable one must fail loudly.
        let manifest = read_manifest(&snapshot.dir)?;

        for entry in &manifest.files {
            let actual = file_checksum(&entry.backup)?;
            if actual != entry.checksum {
                return Err(GeneratorError::BackupChecksumMismatch {
                    path: entry.backup.clone(),
                });
            }
        }

        for entry in &manifest.files {
            if let Some(parent) = entry.original.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&entry.backup, &entry.original)?;
        }
        for path in &manifest.absent {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }

        tracing::info!(
            snapshot = %snapshot.id,
            restored = manifest.files.len(),
            removed = manifest.absent.len(),
            "snapshot restored"
        );
        Ok(())
    }

    /// Load a snapshot handle by id.
    pub fn get(&self, id: &str) -> Result<Snapshot> {
        let dir = self.root.join(id);
        if !dir.is_dir() {
            return Err(GeneratorError::SnapshotNotFound { id: id.to_string() });
        }
        let manifest = read_manifest(&dir)?;
        Ok(Snapshot {
            id: id.to_string(),
            dir,
            manifest,
        })
    }

    /// All snapshots under the backup root, newest first. Folders without a
    /// readable manifest are skipped with a warning.
    pub fn list_backups(&self) -> Result<Vec<Snapshot>> {
        let mut snapshots = Vec::new();
        if !self.root.is_dir() {
            return Ok(snapshots);
        }
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().into_owned();
            match read_manifest(&entry.path()) {
                Ok(manifest) => snapshots.push(Snapshot {
                    id,
                    dir: entry.path(),
                    manifest,
                }),
                Err(err) => {
                    tracing::warn!(folder = %entry.path().display(), %err, "skipping backup folder");
                }
            }
        }
        snapshots.sort_by(|a, b| b.manifest.timestamp.cmp(&a.manifest.timestamp));
        Ok(snapshots)
    }

    /// Keep the `retain` newest snapshots, delete the rest. Returns how many
    /// were removed.
    pub fn prune_backups(&self, retain: usize) -> Result<usize> {
        let snapshots = self.list_backups()?;
        let mut removed = 0;
        for snapshot in snapshots.iter().skip(retain) {
            fs::remove_dir_all(&snapshot.dir)?;
            removed += 1;
            tracing::debug!(snapshot = %snapshot.id, "pruned backup");
        }
        Ok(removed)
    }
}

fn read_manifest(dir: &Path) -> Result<Manifest> {
    let path = dir.join(MANIFEST_FILE);
    if !path.exists() {
        return Err(GeneratorError::ManifestMissing { path });
    }
    let contents = fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// SHA-256 checksum of a file's contents, hex-encoded.
pub fn file_checksum(path: &Path) -> Result<String> {
    let contents = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&contents);
    Ok(format!("{:x}", hasher.finalize()))
}

fn slugify(reason: &str) -> String {
    let slug: String = reason
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    if slug.is_empty() { "backup".to_string() } else { slug }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn write(path: &Path, contents: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn create_and_restore_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("src/models/contact.rs");
        write(&target, "original");

        let manager = SnapshotManager::new(dir.path().join("backups"));
        let snapshot = manager
            .create_backup(&[target.clone()], "pre-generate")
            .unwrap();
        assert_eq!(snapshot.manifest.files.len(), 1);
        assert!(snapshot.manifest.absent.is_empty());

        write(&target, "clobbered");
        manager.restore_backup(&snapshot).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "original");
    }

    #[test]
    fn absent_files_are_recorded_and_removed_on_restore() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("src/models/contact.rs");

        let manager = SnapshotManager::new(dir.path().join("backups"));
        let snapshot = manager
            .create_backup(&[target.clone()], "pre-generate")
            .unwrap();
        assert!(snapshot.manifest.files.is_empty());
        assert_eq!(snapshot.manifest.absent, vec![target.clone()]);

        // A failed run created the file; restore must take it back out.
        write(&target, "half-written");
        manager.restore_backup(&snapshot).unwrap();
        assert!(!target.exists());
    }

    #[test]
    fn restore_fails_loudly_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a.rs");
        write(&target, "x");

        let manager = SnapshotManager::new(dir.path().join("backups"));
        let snapshot = manager.create_backup(&[target], "pre-generate").unwrap();
        fs::remove_file(snapshot.dir.join("manifest.json")).unwrap();

        assert_matches!(
            manager.restore_backup(&snapshot),
            Err(GeneratorError::ManifestMissing { .. })
        );
    }

    #[test]
    fn restore_rejects_tampered_backup() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a.rs");
        write(&target, "x");

        let manager = SnapshotManager::new(dir.path().join("backups"));
        let snapshot = manager.create_backup(&[target], "pre-generate").unwrap();
        fs::write(&snapshot.manifest.files[0].backup, "tampered").unwrap();

        assert_matches!(
            manager.restore_backup(&snapshot),
            Err(GeneratorError::BackupChecksumMismatch { .. })
        );
    }

    #[test]
    fn prune_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a.rs");
        write(&target, "x");

        let manager = SnapshotManager::new(dir.path().join("backups"));
        for n in 0..4 {
            // Distinct timestamps keep ordering deterministic.
            std::thread::sleep(std::time::Duration::from_millis(5));
            manager
                .create_backup(std::slice::from_ref(&target), &format!("run {n}"))
                .unwrap();
        }

        let removed = manager.prune_backups(2).unwrap();
        assert_eq!(removed, 2);

        let remaining = manager.list_backups().unwrap();
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[0].manifest.reason, "run 3");
        assert_eq!(remaining[1].manifest.reason, "run 2");
    }

    #[test]
    fn list_is_empty_without_backup_root() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SnapshotManager::new(dir.path().join("missing"));
        assert!(manager.list_backups().unwrap().is_empty());
    }
}
