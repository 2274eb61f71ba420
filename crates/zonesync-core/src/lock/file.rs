// # File Lock Store
//
// One lock file per key inside a shared directory, so separate processes
// (cron runs, several daemons) exclude each other.
//
// ## File Format
//
// ```json
// {
//   "key": "route53_pull_6f1c...",
//   "token": "0d6e5b0a-...",
//   "expires_at": "2025-01-09T12:30:00Z"
// }
// ```
//
// ## Publication
//
// A lease is written in full to a private scratch file and then hard-linked
// to `<key>.lock`. The link fails when the lock file exists, so a lock file
// is never observed half-written and two writers never both succeed.
//
// ## Recovery
//
// - A lock file that cannot be parsed counts as held; it is left for an
//   operator to inspect
// - An expired lock file is first renamed to a private name, then its token
//   is checked against the one judged expired. A mismatch means another
//   process already replaced it, and the file is linked back
// - Release goes through the same rename-and-check, so it never removes a
//   lock file it does not own

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::traits::{Lease, LockStore};
use crate::{Error, Result};

/// Serialized lease
#[derive(Debug, Serialize, Deserialize)]
struct LockFile {
    key: String,
    token: Uuid,
    expires_at: DateTime<Utc>,
}

impl From<&Lease> for LockFile {
    fn from(lease: &Lease) -> Self {
        Self {
            key: lease.key.clone(),
            token: lease.token,
            expires_at: lease.expires_at,
        }
    }
}

/// What a lock path currently holds
#[derive(Debug)]
enum LockState {
    Absent,
    Held(LockFile),
    Unreadable,
}

impl LockState {
    fn parse(content: &str) -> Self {
        serde_json::from_str(content)
            .map(LockState::Held)
            .unwrap_or(LockState::Unreadable)
    }

    fn is_live(&self, now: DateTime<Utc>) -> bool {
        match self {
            LockState::Absent => false,
            LockState::Held(existing) => existing.expires_at > now,
            LockState::Unreadable => true,
        }
    }
}

/// Lock store backed by lock files
#[derive(Debug, Clone)]
pub struct FileLockStore {
    dir: PathBuf,
}

impl FileLockStore {
    /// Open a lock directory, creating it if needed
    pub async fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await.map_err(|e| {
            Error::config(format!(
                "Failed to create lock directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.lock", safe))
    }

    /// A name next to `path` that no other caller will pick
    fn scratch_path(path: &Path, purpose: &str) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(format!(".{}.{}", purpose, Uuid::new_v4().simple()));
        PathBuf::from(name)
    }

    async fn read_lock(path: &Path) -> Result<LockState> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(LockState::parse(&content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(LockState::Absent),
            Err(e) => Err(Error::lock_store(format!(
                "Failed to read lock file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Publish `lease` at `path`; `Ok(false)` when a lock file already exists
    async fn publish(path: &Path, lease: &Lease) -> Result<bool> {
        let scratch = Self::scratch_path(path, "new");
        let published = Self::write_and_link(&scratch, path, lease).await;

        if let Err(e) = fs::remove_file(&scratch).await
            && e.kind() != ErrorKind::NotFound
        {
            tracing::warn!(path = %scratch.display(), "Failed to remove scratch lock file: {}", e);
        }
        published
    }

    async fn write_and_link(scratch: &Path, path: &Path, lease: &Lease) -> Result<bool> {
        let json = serde_json::to_vec(&LockFile::from(lease))?;
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(scratch)
            .await
            .map_err(|e| {
                Error::lock_store(format!(
                    "Failed to create lock file {}: {}",
                    scratch.display(),
                    e
                ))
            })?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        drop(file);

        match fs::hard_link(scratch, path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(Error::lock_store(format!(
                "Failed to publish lock file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Remove the lock file at `path` if it still carries `token`
    ///
    /// Returns `Ok(true)` when the path no longer holds that token's file,
    /// `Ok(false)` when a different lock file was found and put back.
    fn evict(path: &Path, token: Uuid) -> Result<bool> {
        let aside = Self::scratch_path(path, "evict");
        match std::fs::rename(path, &aside) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
            Err(e) => {
                return Err(Error::lock_store(format!(
                    "Failed to move lock file {}: {}",
                    path.display(),
                    e
                )));
            }
        }

        let content = std::fs::read_to_string(&aside).map_err(|e| {
            Error::lock_store(format!(
                "Failed to read lock file {}: {}",
                aside.display(),
                e
            ))
        })?;
        let ours = matches!(LockState::parse(&content), LockState::Held(ref f) if f.token == token);

        if !ours {
            match std::fs::hard_link(&aside, path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::warn!(
                        path = %path.display(),
                        "Lock file was replaced while restoring a newer holder"
                    );
                }
                Err(e) => {
                    return Err(Error::lock_store(format!(
                        "Failed to restore lock file {}: {}",
                        path.display(),
                        e
                    )));
                }
            }
        }

        match std::fs::remove_file(&aside) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(ours)
    }
}

#[async_trait]
impl LockStore for FileLockStore {
    async fn try_acquire(&self, key: &str, lease: Duration) -> Result<Option<Lease>> {
        let path = self.path_for(key);

        for _ in 0..2 {
            let granted = Lease::grant(key, lease);
            if Self::publish(&path, &granted).await? {
                return Ok(Some(granted));
            }

            let expired = match Self::read_lock(&path).await? {
                // Released between our link attempt and the read
                LockState::Absent => continue,
                LockState::Unreadable => {
                    tracing::warn!(
                        key = %key,
                        path = %path.display(),
                        "Lock file is unreadable; treating the lock as held"
                    );
                    return Ok(None);
                }
                LockState::Held(existing) if existing.expires_at > Utc::now() => return Ok(None),
                LockState::Held(existing) => existing,
            };

            tracing::info!(
                key = %key,
                expired_at = %expired.expires_at,
                "Taking over expired lock file"
            );
            if !Self::evict(&path, expired.token)? {
                // Someone else took it over first
                return Ok(None);
            }
        }

        // Lost the race for a stale lock to another process
        Ok(None)
    }

    fn release(&self, lease: &Lease) -> Result<()> {
        let path = self.path_for(&lease.key);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let owned = matches!(LockState::parse(&content), LockState::Held(ref f) if f.token == lease.token);
        if !owned || !Self::evict(&path, lease.token)? {
            tracing::debug!(key = %lease.key, "Lock file owned by someone else, leaving it");
        }
        Ok(())
    }

    async fn is_locked(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key);
        Ok(Self::read_lock(&path).await?.is_live(Utc::now()))
    }
}
