use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use ballot_ledger::{BallotSnapshot, InMemoryBallot};

use crate::error::{StoreError, StoreResult};
use crate::traits::StateStore;

/// Snapshot store backed by a single pretty-printed JSON file.
///
/// Saves go to a temporary file in the same directory which is then renamed
/// over the target, so the file on disk is always a complete snapshot.
/// Writers take an exclusive lock on a `.lock` file next to the target, so
/// separate processes sharing one state file never lose each other's calls.
#[derive(Clone, Debug)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Save a freshly deployed ballot, refusing to overwrite existing state.
    pub fn create(&self, ballot: &InMemoryBallot) -> StoreResult<()> {
        let snapshot = ballot.snapshot()?;
        let _lock = self.lock()?;
        if self.exists() {
            return Err(StoreError::AlreadyExists(self.path.clone()));
        }
        self.write_snapshot(&snapshot)
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Block until this process holds the writer lock. Released on drop.
    fn lock(&self) -> StoreResult<File> {
        fs::create_dir_all(self.directory())?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?;
        file.lock()?;
        Ok(file)
    }

    fn read_snapshot(&self) -> StoreResult<Option<BallotSnapshot>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot = serde_json::from_slice(&bytes)?;
        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "snapshot loaded");
        Ok(Some(snapshot))
    }

    fn write_snapshot(&self, snapshot: &BallotSnapshot) -> StoreResult<()> {
        let mut staged = tempfile::NamedTempFile::new_in(self.directory())?;
        serde_json::to_writer_pretty(&mut staged, snapshot)?;
        staged.write_all(b"\n")?;
        staged.as_file().sync_all()?;
        staged.persist(&self.path).map_err(|e| e.error)?;

        tracing::debug!(
            path = %self.path.display(),
            receipts = snapshot.receipts.len(),
            "snapshot saved"
        );
        Ok(())
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> StoreResult<Option<BallotSnapshot>> {
        self.read_snapshot()
    }

    fn save(&self, snapshot: &BallotSnapshot) -> StoreResult<()> {
        let _lock = self.lock()?;
        self.write_snapshot(snapshot)
    }

    fn save_if_head(
        &self,
        snapshot: &BallotSnapshot,
        expected_head: Option<[u8; 32]>,
    ) -> StoreResult<()> {
        let _lock = self.lock()?;
        let stored_head = self.read_snapshot()?.and_then(|s| s.head());
        if stored_head != expected_head {
            tracing::warn!(path = %self.path.display(), "stale snapshot not saved");
            return Err(StoreError::HeadMoved);
        }
        self.write_snapshot(snapshot)
    }
}
