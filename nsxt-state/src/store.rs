//! State file on local disk, with a lock file beside it
//!
//! `nsxt.state.json` holds the state and `nsxt.state.json.lock` the lock.
//! Saves go through a temporary file and a rename, so a crash mid-write
//! leaves the previous state intact.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{StateError, StateResult};
use crate::lock::StateLock;
use crate::state::StateFile;

pub const DEFAULT_STATE_PATH: &str = "nsxt.state.json";

pub struct StateStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl StateStore {
    /// Open the store at `path`, creating its directory if needed
    pub async fn open(path: impl Into<PathBuf>) -> StateResult<Self> {
        let path = path.into();
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| StateError::io(dir, e))?;
        }
        Ok(Self {
            lock_path: sibling(&path, ".lock"),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The saved state, or a fresh one when nothing was saved yet
    pub async fn load(&self) -> StateResult<StateFile> {
        Ok(self.read_saved().await?.unwrap_or_default())
    }

    /// Bump the serial of `state` and write it
    ///
    /// Refuses to overwrite a file that belongs to another lineage.
    pub async fn save(&self, state: &mut StateFile) -> StateResult<()> {
        if let Some(saved) = self.read_saved().await?
            && saved.lineage != state.lineage
        {
            return Err(StateError::ForeignLineage {
                path: self.path.clone(),
                recorded: saved.lineage,
                presented: state.lineage.clone(),
            });
        }

        state.serial += 1;
        let content = serde_json::to_vec_pretty(state).map_err(|e| StateError::Corrupt {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        let staging = sibling(&self.path, ".tmp");
        fs::write(&staging, content)
            .await
            .map_err(|e| StateError::io(&staging, e))?;
        fs::rename(&staging, &self.path)
            .await
            .map_err(|e| StateError::io(&self.path, e))?;

        log::debug!(
            "Saved state serial {} ({} resources) to {}",
            state.serial,
            state.managed.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Take the lock for `operation`
    ///
    /// A stale lock left by a crashed command is replaced; a live one is
    /// `Locked`.
    pub async fn lock(&self, operation: &str) -> StateResult<StateLock> {
        let lock = StateLock::acquire(operation);
        if self.create_lock_file(&lock).await? {
            return Ok(lock);
        }

        match self.current_lock().await? {
            Some(held) if !held.is_stale() => Err(StateError::Locked(held)),
            stale => {
                if let Some(stale) = stale {
                    log::warn!("Replacing stale state lock {}", stale);
                }
                self.remove_lock_file().await?;
                if self.create_lock_file(&lock).await? {
                    Ok(lock)
                } else {
                    // another command won the race for the freed lock
                    match self.current_lock().await? {
                        Some(held) => Err(StateError::Locked(held)),
                        None => Err(StateError::NotLocked(lock.id)),
                    }
                }
            }
        }
    }

    /// Release a lock taken by `lock`
    pub async fn unlock(&self, lock: &StateLock) -> StateResult<()> {
        self.release(&lock.id).await
    }

    /// Release the lock with `lock_id` regardless of who took it
    pub async fn force_unlock(&self, lock_id: &str) -> StateResult<()> {
        self.release(lock_id).await
    }

    pub async fn current_lock(&self) -> StateResult<Option<StateLock>> {
        let content = match fs::read(&self.lock_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StateError::io(&self.lock_path, e)),
        };
        serde_json::from_slice(&content)
            .map(Some)
            .map_err(|e| StateError::Corrupt {
                path: self.lock_path.clone(),
                message: e.to_string(),
            })
    }

    async fn release(&self, lock_id: &str) -> StateResult<()> {
        match self.current_lock().await? {
            None => Err(StateError::NotLocked(lock_id.to_string())),
            Some(held) if held.id != lock_id => Err(StateError::LockHeldByOther {
                held: held.id,
                presented: lock_id.to_string(),
            }),
            Some(_) => self.remove_lock_file().await,
        }
    }

    async fn read_saved(&self) -> StateResult<Option<StateFile>> {
        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StateError::io(&self.path, e)),
        };
        serde_json::from_slice(&content)
            .map(Some)
            .map_err(|e| StateError::Corrupt {
                path: self.path.clone(),
                message: e.to_string(),
            })
    }

    /// Create the lock file exclusively. False when one already exists.
    async fn create_lock_file(&self, lock: &StateLock) -> StateResult<bool> {
        let content = serde_json::to_vec_pretty(lock).map_err(|e| StateError::Corrupt {
            path: self.lock_path.clone(),
            message: e.to_string(),
        })?;

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.lock_path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(StateError::io(&self.lock_path, e)),
        };
        file.write_all(&content)
            .await
            .map_err(|e| StateError::io(&self.lock_path, e))?;
        file.flush()
            .await
            .map_err(|e| StateError::io(&self.lock_path, e))?;
        Ok(true)
    }

    async fn remove_lock_file(&self) -> StateResult<()> {
        match fs::remove_file(&self.lock_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StateError::io(&self.lock_path, e)),
        }
    }
}

/// `path` with `suffix` appended to its file name
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use nsxt_core::resource::{ResourceId, State};
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_file_loads_as_fresh_state_and_directory_is_created() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("envs").join("lab").join("nsxt.state.json");

        let store = StateStore::open(&path).await.unwrap();
        assert!(path.parent().unwrap().is_dir());

        let state = store.load().await.unwrap();
        assert_eq!(state.serial, 0);
        assert!(state.is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn save_bumps_serial_and_survives_reload() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path().join("nsxt.state.json"))
            .await
            .unwrap();

        let mut state = store.load().await.unwrap();
        state.record(&State::existing(ResourceId::new("vpc", "web"), Default::default())
            .with_identifier("v1"));
        store.save(&mut state).await.unwrap();
        store.save(&mut state).await.unwrap();

        let reloaded = store.load().await.unwrap();
        assert_eq!(reloaded.serial, 2);
        assert_eq!(reloaded.lineage, state.lineage);
        assert_eq!(reloaded.managed, state.managed);
        assert!(!sibling(store.path(), ".tmp").exists());
    }

    #[tokio::test]
    async fn save_refuses_another_lineage() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path().join("nsxt.state.json"))
            .await
            .unwrap();
        store.save(&mut StateFile::new()).await.unwrap();

        let mut other = StateFile::new();
        let err = store.save(&mut other).await.unwrap_err();
        assert!(matches!(err, StateError::ForeignLineage { .. }));
        assert_eq!(other.serial, 0);
    }

    #[tokio::test]
    async fn unparseable_state_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nsxt.state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = StateStore::open(&path).await.unwrap();
        assert!(matches!(
            store.load().await,
            Err(StateError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn lock_is_exclusive_until_released() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path().join("nsxt.state.json"))
            .await
            .unwrap();
        assert!(store.current_lock().await.unwrap().is_none());

        let lock = store.lock("apply").await.unwrap();
        assert_eq!(store.current_lock().await.unwrap(), Some(lock.clone()));

        let err = store.lock("import").await.unwrap_err();
        assert!(matches!(err, StateError::Locked(ref held) if held.id == lock.id));

        store.unlock(&lock).await.unwrap();
        assert!(matches!(
            store.unlock(&lock).await,
            Err(StateError::NotLocked(_))
        ));

        let next = store.lock("destroy").await.unwrap();
        assert!(matches!(
            store.unlock(&lock).await,
            Err(StateError::LockHeldByOther { .. })
        ));
        store.force_unlock(&next.id).await.unwrap();
        assert!(store.current_lock().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stale_lock_is_taken_over() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path().join("nsxt.state.json"))
            .await
            .unwrap();
        let stale = StateLock::with_ttl("apply", Duration::seconds(-5));
        assert!(store.create_lock_file(&stale).await.unwrap());

        let lock = store.lock("destroy").await.unwrap();
        assert_ne!(lock.id, stale.id);
        assert_eq!(store.current_lock().await.unwrap(), Some(lock));
    }
}
