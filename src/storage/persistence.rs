//! Write-ahead log and snapshot persistence for the project collection.
//!
//! Every mutation is appended to the log before it is applied in memory.
//! A checkpoint writes the whole collection to a snapshot file and truncates
//! the log. Recovery loads the snapshot and replays the log on top of it.

use crate::core::{DeskError, Result};
use crate::model::Project;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use uuid::Uuid;

const WAL_FILE: &str = "projects.wal";
const SNAPSHOT_FILE: &str = "projects.snapshot";
const SNAPSHOT_VERSION: u32 = 1;
const DEFAULT_CHECKPOINT_THRESHOLD: usize = 1000;
/// Upper bound for one encoded log record.
const MAX_RECORD_LEN: usize = 16 * 1024 * 1024;

// ============================================================================
// WAL Entry Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WalEntry {
    Insert(Project),
    Replace(Project),
    Delete(Uuid),
    Clear,
}

// ============================================================================
// Collection Snapshot
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub projects: Vec<Project>,
}

impl CollectionSnapshot {
    pub fn new(projects: Vec<Project>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            created_at: Utc::now(),
            projects,
        }
    }
}

// ============================================================================
// Durability Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurabilityMode {
    /// fsync after every log append
    Sync,
    /// flush to the OS, let it decide when to write
    #[default]
    Async,
}

fn encode<T: Serialize>(value: &T, what: &str) -> Result<Vec<u8>> {
    // Named encoding: `Project` skips an absent description, which a
    // positional encoding cannot represent.
    rmp_serde::to_vec_named(value)
        .map_err(|e| DeskError::Serialization(format!("Failed to serialize {}: {}", what, e)))
}

fn decode<'a, T: Deserialize<'a>>(bytes: &'a [u8], what: &str) -> Result<T> {
    rmp_serde::from_slice(bytes)
        .map_err(|e| DeskError::Serialization(format!("Failed to deserialize {}: {}", what, e)))
}

fn io_error(context: &str, err: std::io::Error) -> DeskError {
    DeskError::IoError(format!("{}: {}", context, err))
}

// ============================================================================
// WAL Manager
// ============================================================================

pub struct WalManager {
    path: PathBuf,
    file: File,
    mode: DurabilityMode,
    /// Log length up to the end of the last fully written record.
    committed_len: u64,
    /// Set when a failed append could not be rolled back. Cleared by `truncate`.
    failed: bool,
    entries_since_checkpoint: usize,
    checkpoint_threshold: usize,
}

impl WalManager {
    pub fn open(path: impl AsRef<Path>, mode: DurabilityMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error("Failed to create WAL directory", e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| io_error("Failed to open WAL file", e))?;
        let committed_len = file
            .metadata()
            .map_err(|e| io_error("Failed to stat WAL file", e))?
            .len();

        Ok(Self {
            path,
            file,
            mode,
            committed_len,
            failed: false,
            entries_since_checkpoint: 0,
            checkpoint_threshold: DEFAULT_CHECKPOINT_THRESHOLD,
        })
    }

    /// Appends one length-prefixed record.
    ///
    /// The record is either fully in the log or not at all: a failed write
    /// or sync cuts the file back to its previous length before the error
    /// is returned.
    pub fn append(&mut self, entry: &WalEntry) -> Result<()> {
        if self.failed {
            return Err(DeskError::IoError(
                "WAL is unusable after a failed write; checkpoint to recover".to_string(),
            ));
        }

        let bytes = encode(entry, "WAL entry")?;
        if bytes.len() > MAX_RECORD_LEN {
            return Err(DeskError::Serialization("WAL entry too large".to_string()));
        }
        let len = u32::try_from(bytes.len())
            .map_err(|_| DeskError::Serialization("WAL entry too large".to_string()))?;

        let mut frame = Vec::with_capacity(4 + bytes.len());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&bytes);

        if let Err(e) = self.write_frame(&frame) {
            self.roll_back();
            return Err(e);
        }

        self.committed_len += frame.len() as u64;
        self.entries_since_checkpoint += 1;
        Ok(())
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        self.file
            .write_all(frame)
            .map_err(|e| io_error("Failed to write WAL", e))?;
        if self.mode == DurabilityMode::Sync {
            self.file
                .sync_data()
                .map_err(|e| io_error("Failed to sync WAL", e))?;
        }
        Ok(())
    }

    /// Drops whatever part of a failed record reached the file.
    fn roll_back(&mut self) {
        let committed_len = self.committed_len;
        let restored = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .and_then(|file| file.set_len(committed_len))
            .and_then(|()| OpenOptions::new().append(true).open(&self.path));

        match restored {
            Ok(file) => self.file = file,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "WAL rollback failed");
                self.failed = true;
            }
        }
    }

    /// Reads every complete record. A torn record at the tail (a crash
    /// mid-append) ends the log instead of failing recovery.
    pub fn read_all(&self) -> Result<Vec<WalEntry>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error("Failed to open WAL for reading", e)),
        };
        let file_len = file
            .metadata()
            .map_err(|e| io_error("Failed to stat WAL file", e))?
            .len();
        let mut reader = BufReader::new(file);
        let mut entries = Vec::new();
        let mut offset: u64 = 0;

        loop {
            let mut len_bytes = [0u8; 4];
            match reader.read_exact(&mut len_bytes) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(io_error("Failed to read WAL entry length", e)),
            }
            offset += 4;

            // a length that runs past the end of the file is a torn or
            // corrupted prefix, never something to allocate for
            let len = u64::from(u32::from_le_bytes(len_bytes));
            if len > MAX_RECORD_LEN as u64 || len > file_len.saturating_sub(offset) {
                warn!(
                    path = %self.path.display(),
                    offset,
                    len,
                    "Ignoring truncated WAL record"
                );
                break;
            }

            let mut data = vec![0u8; len as usize];
            match reader.read_exact(&mut data) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    warn!(path = %self.path.display(), "Ignoring truncated WAL record");
                    break;
                }
                Err(e) => return Err(io_error("Failed to read WAL entry data", e)),
            }
            offset += len;
            entries.push(decode(&data, "WAL entry")?);
        }

        Ok(entries)
    }

    pub fn truncate(&mut self) -> Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| io_error("Failed to truncate WAL", e))?;
        drop(file);

        self.file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| io_error("Failed to reopen WAL", e))?;
        self.committed_len = 0;
        self.failed = false;
        self.entries_since_checkpoint = 0;
        Ok(())
    }

    pub fn needs_checkpoint(&self) -> bool {
        self.entries_since_checkpoint >= self.checkpoint_threshold
    }

    pub fn entries_since_checkpoint(&self) -> usize {
        self.entries_since_checkpoint
    }

    pub fn set_checkpoint_threshold(&mut self, threshold: usize) {
        self.checkpoint_threshold = threshold.max(1);
    }
}

// ============================================================================
// Snapshot Manager
// ============================================================================

pub struct SnapshotManager {
    path: PathBuf,
}

impl SnapshotManager {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Writes to a temp file in the same directory, syncs it, then renames
    /// it over the previous snapshot.
    pub fn save(&self, snapshot: &CollectionSnapshot) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|e| io_error("Failed to create snapshot directory", e))?;

        let bytes = encode(snapshot, "snapshot")?;
        let mut temp =
            NamedTempFile::new_in(dir).map_err(|e| io_error("Failed to create temp file", e))?;
        temp.write_all(&bytes)
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| io_error("Failed to write snapshot", e))?;
        temp.persist(&self.path)
            .map_err(|e| io_error("Failed to rename snapshot", e.error))?;
        Ok(())
    }

    pub fn load(&self) -> Result<Option<CollectionSnapshot>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error("Failed to read snapshot", e)),
        };
        let snapshot: CollectionSnapshot = decode(&bytes, "snapshot")?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(DeskError::Serialization(format!(
                "Unsupported snapshot version {}",
                snapshot.version
            )));
        }
        Ok(Some(snapshot))
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

// ============================================================================
// Persistence Manager
// ============================================================================

pub struct PersistenceManager {
    wal: WalManager,
    snapshot: SnapshotManager,
}

impl PersistenceManager {
    pub fn open(data_dir: impl AsRef<Path>, mode: DurabilityMode) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let wal = WalManager::open(data_dir.join(WAL_FILE), mode)?;
        let snapshot = SnapshotManager::new(data_dir.join(SNAPSHOT_FILE));
        Ok(Self { wal, snapshot })
    }

    pub fn log(&mut self, entry: &WalEntry) -> Result<()> {
        self.wal.append(entry)
    }

    pub fn checkpoint(&mut self, projects: Vec<Project>) -> Result<()> {
        let count = projects.len();
        self.snapshot.save(&CollectionSnapshot::new(projects))?;
        self.wal.truncate()?;
        debug!(projects = count, "Checkpoint written");
        Ok(())
    }

    pub fn needs_checkpoint(&self) -> bool {
        self.wal.needs_checkpoint()
    }

    /// Snapshot contents with the log replayed on top, in id order.
    pub fn recover(&self) -> Result<Vec<Project>> {
        let mut projects: std::collections::BTreeMap<Uuid, Project> = self
            .snapshot
            .load()?
            .map(|s| s.projects.into_iter().map(|p| (p.id, p)).collect())
            .unwrap_or_default();

        let entries = self.wal.read_all()?;
        let replayed = entries.len();
        for entry in entries {
            match entry {
                WalEntry::Insert(project) | WalEntry::Replace(project) => {
                    projects.insert(project.id, project);
                }
                WalEntry::Delete(id) => {
                    projects.remove(&id);
                }
                WalEntry::Clear => projects.clear(),
            }
        }

        debug!(projects = projects.len(), replayed, "Recovered collection");
        Ok(projects.into_values().collect())
    }

    pub fn wal(&self) -> &WalManager {
        &self.wal
    }

    pub fn wal_mut(&mut self) -> &mut WalManager {
        &mut self.wal
    }

    pub fn snapshot(&self) -> &SnapshotManager {
        &self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProjectStatus;
    use chrono::Duration;
    use tempfile::TempDir;

    fn project(name: &str) -> Project {
        let now = Utc::now();
        Project {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            status: ProjectStatus::Active,
            deadline: now + Duration::days(5),
            assigned_to: "Alice".to_string(),
            budget: 1500.5,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_wal_append_and_read() {
        let dir = TempDir::new().unwrap();
        let mut wal = WalManager::open(dir.path().join("test.wal"), DurabilityMode::Sync).unwrap();
        let p = project("Alpha");
        wal.append(&WalEntry::Insert(p.clone())).unwrap();
        wal.append(&WalEntry::Delete(p.id)).unwrap();

        let entries = wal.read_all().unwrap();
        assert_eq!(entries, vec![WalEntry::Insert(p.clone()), WalEntry::Delete(p.id)]);
        assert_eq!(wal.entries_since_checkpoint(), 2);
    }

    #[test]
    fn test_torn_tail_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.wal");
        let mut wal = WalManager::open(&path, DurabilityMode::Sync).unwrap();
        wal.append(&WalEntry::Clear).unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&100u32.to_le_bytes()).unwrap();
        file.write_all(&[1, 2, 3]).unwrap();

        assert_eq!(wal.read_all().unwrap(), vec![WalEntry::Clear]);
    }

    #[test]
    fn test_failed_append_leaves_no_trace() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.wal");
        let mut wal = WalManager::open(&path, DurabilityMode::Sync).unwrap();
        let kept = project("Kept");
        wal.append(&WalEntry::Insert(kept.clone())).unwrap();

        // half a record reached the disk before the write failed
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&64u32.to_le_bytes()).unwrap();
        file.write_all(&[7; 10]).unwrap();
        wal.file = File::open(&path).unwrap();

        let rejected = project("Rejected");
        assert!(wal.append(&WalEntry::Insert(rejected)).is_err());
        assert_eq!(wal.entries_since_checkpoint(), 1);

        let later = project("Later");
        wal.append(&WalEntry::Insert(later.clone())).unwrap();

        assert_eq!(
            wal.read_all().unwrap(),
            vec![WalEntry::Insert(kept), WalEntry::Insert(later)]
        );
    }

    #[test]
    fn test_failed_wal_rejects_writes_until_truncated() {
        let dir = TempDir::new().unwrap();
        let mut wal = WalManager::open(dir.path().join("test.wal"), DurabilityMode::Async).unwrap();
        wal.failed = true;

        assert!(matches!(wal.append(&WalEntry::Clear), Err(DeskError::IoError(_))));

        wal.truncate().unwrap();
        wal.append(&WalEntry::Clear).unwrap();
        assert_eq!(wal.read_all().unwrap(), vec![WalEntry::Clear]);
    }

    #[test]
    fn test_oversized_length_prefix_is_not_trusted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.wal");
        let mut wal = WalManager::open(&path, DurabilityMode::Sync).unwrap();
        wal.append(&WalEntry::Clear).unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&u32::MAX.to_le_bytes()).unwrap();
        file.write_all(&[0; 32]).unwrap();

        assert_eq!(wal.read_all().unwrap(), vec![WalEntry::Clear]);
    }

    #[test]
    fn test_reopened_wal_appends_after_existing_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.wal");
        WalManager::open(&path, DurabilityMode::Sync)
            .unwrap()
            .append(&WalEntry::Clear)
            .unwrap();

        let mut wal = WalManager::open(&path, DurabilityMode::Sync).unwrap();
        let p = project("Second");
        wal.append(&WalEntry::Delete(p.id)).unwrap();

        assert_eq!(
            wal.read_all().unwrap(),
            vec![WalEntry::Clear, WalEntry::Delete(p.id)]
        );
    }

    #[test]
    fn test_snapshot_save_and_load() {
        let dir = TempDir::new().unwrap();
        let manager = SnapshotManager::new(dir.path().join("test.snapshot"));
        assert!(manager.load().unwrap().is_none());

        let mut described = project("Beta");
        described.description = Some("with text".to_string());
        manager
            .save(&CollectionSnapshot::new(vec![project("Alpha"), described.clone()]))
            .unwrap();

        assert!(manager.exists());
        let loaded = manager.load().unwrap().unwrap();
        assert_eq!(loaded.projects.len(), 2);
        assert!(loaded.projects.contains(&described));
    }

    #[test]
    fn test_checkpoint_truncates_wal() {
        let dir = TempDir::new().unwrap();
        let mut persistence = PersistenceManager::open(dir.path(), DurabilityMode::Sync).unwrap();
        let p = project("Alpha");
        persistence.log(&WalEntry::Insert(p.clone())).unwrap();
        persistence.checkpoint(vec![p]).unwrap();

        assert_eq!(persistence.wal().entries_since_checkpoint(), 0);
        assert!(persistence.wal().read_all().unwrap().is_empty());
    }

    #[test]
    fn test_recovery_replays_log_over_snapshot() {
        let dir = TempDir::new().unwrap();
        let a = project("Alpha");
        let b = project("Beta");
        {
            let mut persistence =
                PersistenceManager::open(dir.path(), DurabilityMode::Sync).unwrap();
            persistence.checkpoint(vec![a.clone(), b.clone()]).unwrap();

            let mut renamed = a.clone();
            renamed.name = "Alpha 2".to_string();
            persistence.log(&WalEntry::Replace(renamed)).unwrap();
            persistence.log(&WalEntry::Delete(b.id)).unwrap();
        }

        let persistence = PersistenceManager::open(dir.path(), DurabilityMode::Sync).unwrap();
        let recovered = persistence.recover().unwrap();
        assert_eq!(recovered.len(), 1);
        assert_eq!(recovered[0].id, a.id);
        assert_eq!(recovered[0].name, "Alpha 2");
    }

    #[test]
    fn test_checkpoint_threshold() {
        let dir = TempDir::new().unwrap();
        let mut persistence = PersistenceManager::open(dir.path(), DurabilityMode::Async).unwrap();
        persistence.wal_mut().set_checkpoint_threshold(2);
        persistence.log(&WalEntry::Clear).unwrap();
        assert!(!persistence.needs_checkpoint());
        persistence.log(&WalEntry::Clear).unwrap();
        assert!(persistence.needs_checkpoint());
    }
}
