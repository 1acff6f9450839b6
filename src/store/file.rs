//! File-backed stores.
//!
//! Monitors live in a single JSON document that is rewritten on every save
//! (write to a temporary sibling, then rename). Alerts are appended to a
//! JSON-lines log and never rewritten.
//!
//! Several processes may share the same files, e.g. a long-running
//! `sinkwatch watch` and a `sinkwatch check` run from cron. Nothing is cached
//! between calls: every read goes to disk, and every write re-reads the file
//! while holding an exclusive lock on a `.lock` sibling, so revision checks
//! and alert ids always reflect what other writers have stored.

use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use sinkwatch_types::{Alert, AlertId, Monitor, MonitorId, NewAlert};

use super::memory::MonitorTable;
use super::{AlertStore, MonitorStore, StoreError};
use crate::clock::Clock;

/// `path` with `suffix` appended to its file name.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(OsStr::new(suffix));
    PathBuf::from(name)
}

async fn ensure_parent(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::io(parent, e))?;
    }
    Ok(())
}

/// Read a file, treating a missing one as empty.
async fn read_optional(path: &Path) -> Result<Option<String>, StoreError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Exclusive advisory lock on `<path>.lock`, released on drop.
struct WriteLock {
    #[cfg(unix)]
    _lock: nix::fcntl::Flock<std::fs::File>,
}

impl WriteLock {
    async fn acquire(path: &Path) -> Result<Self, StoreError> {
        ensure_parent(path).await?;
        let lock_path = sibling(path, ".lock");
        tokio::task::spawn_blocking(move || Self::acquire_blocking(&lock_path))
            .await
            .map_err(|e| StoreError::Unavailable(format!("lock task failed: {}", e)))?
    }

    #[cfg(unix)]
    fn acquire_blocking(lock_path: &Path) -> Result<Self, StoreError> {
        use nix::fcntl::{Flock, FlockArg};

        let file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(lock_path)
            .map_err(|e| StoreError::io(lock_path, e))?;
        let lock = Flock::lock(file, FlockArg::LockExclusive)
            .map_err(|(_, errno)| StoreError::io(lock_path, errno.into()))?;
        Ok(Self { _lock: lock })
    }

    #[cfg(not(unix))]
    fn acquire_blocking(_lock_path: &Path) -> Result<Self, StoreError> {
        Ok(Self {})
    }
}

/// Monitor store persisted as one JSON file.
#[derive(Debug)]
pub struct JsonFileMonitorStore {
    path: PathBuf,
    /// Serializes writers within this process before they take the file lock.
    write: Mutex<()>,
    clock: Arc<dyn Clock>,
}

impl JsonFileMonitorStore {
    /// Open the store at `path`. A missing file starts an empty store; an
    /// unreadable one is an error.
    pub async fn open<P: AsRef<Path>>(path: P, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            write: Mutex::new(()),
            clock,
        };
        store.load().await?;
        Ok(store)
    }

    /// Returns the path of the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<MonitorTable, StoreError> {
        match read_optional(&self.path).await? {
            Some(content) => Ok(serde_json::from_str(&content)?),
            None => Ok(MonitorTable::default()),
        }
    }

    async fn persist(&self, table: &MonitorTable) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(table)?;
        let tmp = sibling(&self.path, ".tmp");

        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        Ok(())
    }
}

#[async_trait]
impl MonitorStore for JsonFileMonitorStore {
    async fn save(&self, monitor: &mut Monitor) -> Result<(), StoreError> {
        let _local = self.write.lock().await;
        let _file = WriteLock::acquire(&self.path).await?;

        // Check the revision against what is on disk now, not what was read
        // earlier; another process may have saved since.
        let mut table = self.load().await?;
        let mut saved = monitor.clone();
        table.apply_save(&mut saved, self.clock.now())?;
        self.persist(&table).await?;

        debug!(
            monitor = %saved.name,
            revision = saved.revision,
            path = %self.path.display(),
            "Saved monitor"
        );
        *monitor = saved;
        Ok(())
    }

    async fn get(&self, id: MonitorId) -> Result<Option<Monitor>, StoreError> {
        Ok(self.load().await?.get(id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Monitor>, StoreError> {
        Ok(self.load().await?.find_by_name(name).cloned())
    }

    async fn all(&self) -> Result<Vec<Monitor>, StoreError> {
        Ok(self.load().await?.all())
    }
}

/// Alert store appended to a JSON-lines file.
#[derive(Debug)]
pub struct JsonlAlertStore {
    path: PathBuf,
    write: Mutex<()>,
    clock: Arc<dyn Clock>,
}

impl JsonlAlertStore {
    /// Open the log at `path`. A missing file starts an empty log; a
    /// malformed one is an error.
    pub async fn open<P: AsRef<Path>>(path: P, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            write: Mutex::new(()),
            clock,
        };
        store.load().await?;
        Ok(store)
    }

    /// Returns the path of the log.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<Alert>, StoreError> {
        let Some(content) = read_optional(&self.path).await? else {
            return Ok(Vec::new());
        };
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(StoreError::from))
            .collect()
    }

    async fn append(&self, alert: &Alert) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(alert)?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        file.write_all(&line)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        file.flush()
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        Ok(())
    }
}

#[async_trait]
impl AlertStore for JsonlAlertStore {
    async fn create(&self, alert: NewAlert) -> Result<Alert, StoreError> {
        let _local = self.write.lock().await;
        let _file = WriteLock::acquire(&self.path).await?;

        let next_id = self.load().await?.iter().map(|a| a.id.0).max().unwrap_or(0) + 1;
        let alert = Alert::from_new(AlertId(next_id), self.clock.now(), alert);
        self.append(&alert).await?;
        Ok(alert)
    }

    async fn list_for(&self, monitor: MonitorId) -> Result<Vec<Alert>, StoreError> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .filter(|a| a.monitor == monitor)
            .collect())
    }
}
