use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::models::{Hive, Report, Snapshot, Task, User};

/// On-disk record: the four collections in fixed positional order.
type SnapshotRecord = (Vec<Hive>, Vec<Task>, Vec<User>, Vec<Report>);
type SnapshotRecordRef<'a> = (&'a [Hive], &'a [Task], &'a [User], &'a [Report]);

/// Reads and writes the snapshot file.
///
/// Saves rename a fresh file over the snapshot, so cross-process exclusion
/// uses an advisory lock on a sidecar file (`<snapshot>.lock`).
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut lock_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        lock_name.push(".lock");
        let lock_path = path.with_file_name(lock_name);
        Self { path, lock_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Writes the whole snapshot.
    ///
    /// Fails with [`Error::Locked`] without retrying if another holder has the
    /// lock. The data goes to a temporary file in the same directory which is
    /// then renamed over the target, so a crash never leaves a truncated
    /// snapshot behind.
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let lock = self.open_lock()?;
        lock.try_lock_exclusive().map_err(|_| Error::Locked { path: self.path.clone() })?;
        let result = self.write_atomically(snapshot);
        let _ = lock.unlock();
        result
    }

    /// Reads the whole snapshot.
    ///
    /// Returns `Ok(None)` if no snapshot has been written yet. Readers share
    /// the lock with each other but not with a writer.
    pub fn load(&self) -> Result<Option<Snapshot>> {
        if !self.exists() {
            return Ok(None);
        }
        let lock = self.open_lock()?;
        lock.try_lock_shared().map_err(|_| Error::Locked { path: self.path.clone() })?;
        let result = self.read();
        let _ = lock.unlock();
        result
    }

    fn read(&self) -> Result<Option<Snapshot>> {
        let f = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let (hives, tasks, users, reports): SnapshotRecord = serde_json::from_reader(BufReader::new(f))?;
        Ok(Some(Snapshot { hives, tasks, users, reports }))
    }

    fn write_atomically(&self, snapshot: &Snapshot) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let tmp = NamedTempFile::new_in(dir)?;
        {
            let mut w = BufWriter::new(tmp.as_file());
            let record: SnapshotRecordRef = (&snapshot.hives, &snapshot.tasks, &snapshot.users, &snapshot.reports);
            serde_json::to_writer(&mut w, &record)?;
            w.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    fn open_lock(&self) -> Result<File> {
        if let Some(parent) = self.lock_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(OpenOptions::new().create(true).read(true).write(true).truncate(false).open(&self.lock_path)?)
    }
}
