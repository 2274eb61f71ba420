// # File Store
//
// File-based implementation of SyncStore with crash recovery.
//
// ## Purpose
//
// Keeps the local mirror (and the pending local edits it tracks) across
// restarts of the runner.
//
// ## Crash Recovery
//
// - Atomic writes: every commit writes a temp file, then renames it
// - Automatic backup: the previous document is kept as `.backup`
// - Corruption detection: JSON validation on load
// - Recovery: falls back to the backup if the main file is corrupt
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "tables": {
//     "accounts": [...],
//     "zones": [...],
//     "record_sets": [...],
//     "change_logs": [...]
//   }
// }
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Tables;
use crate::account::AccountFilter;
use crate::model::{Account, ChangeLog, ChangeStatus, HostedZone, RecordKey, RecordSet};
use crate::traits::{
    AccountRepository, ChangeLogRepository, ChangeSet, RecordSetRepository, SyncStore,
    ZoneRepository,
};
use crate::Error;

/// Store file format version
const STORE_FILE_VERSION: &str = "1.0";

/// Serializable store file format
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct StoreFileFormat {
    version: String,
    tables: Tables,
}

/// File-based store with crash recovery
///
/// Reads are served from memory. Every write produces a new document on
/// disk before it becomes visible, so a failed write leaves both the file
/// and the in-memory view unchanged.
///
/// # Example
///
/// ```rust,no_run
/// use zonesync_core::store::FileStore;
/// use zonesync_core::traits::ZoneRepository;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStore::new("/var/lib/zonesync/store.json").await?;
///     let zones = store.find_by_account(uuid::Uuid::nil()).await?;
///     println!("{} zones", zones.len());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    tables: RwLock<Tables>,
}

impl FileStore {
    /// Create or load a file store
    ///
    /// This will:
    /// 1. Create parent directories if needed
    /// 2. Load the existing store file
    /// 3. If it is corrupt, load the backup instead
    /// 4. If both fail, start empty
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::config(format!(
                        "Failed to create store directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let tables = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            tables: RwLock::new(tables),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the store file, falling back to the backup on corruption
    async fn load_with_recovery(path: &Path) -> Result<Tables, Error> {
        match Self::load(path).await {
            Ok(tables) => {
                let (accounts, zones, records, changes) = tables.counts();
                tracing::debug!(
                    accounts,
                    zones,
                    records,
                    changes,
                    "Loaded store from {}",
                    path.display()
                );
                Ok(tables)
            }
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "Store file appears corrupted: {}. Attempting recovery from backup.",
                    e
                );

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    tracing::warn!("No backup file found. Starting with empty store.");
                    return Ok(Tables::default());
                }

                match Self::load(&backup_path).await {
                    Ok(tables) => {
                        tracing::info!("Recovered store from backup");
                        if let Err(restore_err) = fs::copy(&backup_path, path).await {
                            tracing::error!(
                                "Failed to restore store file from backup: {}",
                                restore_err
                            );
                        }
                        Ok(tables)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "Backup also unusable: {}. Starting with empty store.",
                            backup_err
                        );
                        Ok(Tables::default())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Load one store document; a missing file is an empty store
    async fn load(path: &Path) -> Result<Tables, Error> {
        if !path.exists() {
            tracing::debug!("Store file does not exist: {}", path.display());
            return Ok(Tables::default());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::store(format!(
                "Failed to read store file {}: {}",
                path.display(),
                e
            ))
        })?;

        let document: StoreFileFormat = serde_json::from_str(&content)?;

        if document.version != STORE_FILE_VERSION {
            tracing::warn!(
                "Store file version mismatch: expected {}, got {}. Attempting to load anyway.",
                STORE_FILE_VERSION,
                document.version
            );
        }

        Ok(document.tables)
    }

    /// Write a document atomically
    async fn persist(&self, tables: &Tables) -> Result<(), Error> {
        let document = StoreFileFormat {
            version: STORE_FILE_VERSION.to_string(),
            tables: tables.clone(),
        };
        let json = serde_json::to_string_pretty(&document)?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::store(format!(
                    "Failed to write temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            file.sync_all().await.map_err(|e| {
                Error::store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Store written to {}", self.path.display());
        Ok(())
    }

    /// Apply `change` to a copy, persist it, then make it visible
    async fn mutate<F>(&self, change: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Tables) -> Result<(), Error>,
    {
        let mut tables = self.tables.write().await;
        let mut next = tables.clone();
        change(&mut next)?;
        self.persist(&next).await?;
        *tables = next;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl AccountRepository for FileStore {
    async fn find_accounts_with_filter(&self, filter: Option<&str>) -> Result<Vec<Account>, Error> {
        let filter = AccountFilter::parse(filter);
        Ok(self.tables.read().await.accounts_with_filter(&filter))
    }

    async fn find_account_by_identifier(&self, identifier: &str) -> Result<Option<Account>, Error> {
        Ok(self.tables.read().await.account_by_identifier(identifier))
    }

    async fn find_enabled_accounts(&self) -> Result<Vec<Account>, Error> {
        Ok(self.tables.read().await.enabled_accounts())
    }

    async fn save_account(&self, account: Account) -> Result<(), Error> {
        self.mutate(|t| {
            t.upsert_account(account);
            Ok(())
        })
        .await
    }

    async fn remove_account(&self, id: Uuid) -> Result<(), Error> {
        self.mutate(|t| {
            t.remove_account(id);
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl ZoneRepository for FileStore {
    async fn find_one_by_account_and_remote_id(
        &self,
        account_id: Uuid,
        remote_id: &str,
    ) -> Result<Option<HostedZone>, Error> {
        Ok(self.tables.read().await.zone_by_key(account_id, remote_id))
    }

    async fn find_by_account(&self, account_id: Uuid) -> Result<Vec<HostedZone>, Error> {
        Ok(self.tables.read().await.zones_by_account(account_id))
    }

    async fn save_zone(&self, zone: HostedZone) -> Result<(), Error> {
        self.mutate(|t| t.upsert_zone(zone)).await
    }

    async fn remove_zone(&self, id: Uuid) -> Result<(), Error> {
        self.mutate(|t| {
            t.remove_zone(id);
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl RecordSetRepository for FileStore {
    async fn find_one_by_zone_name_type_and_set_identifier(
        &self,
        zone_id: Uuid,
        key: &RecordKey,
    ) -> Result<Option<RecordSet>, Error> {
        Ok(self.tables.read().await.record_by_key(zone_id, key))
    }

    async fn find_by_zone(&self, zone_id: Uuid) -> Result<Vec<RecordSet>, Error> {
        Ok(self.tables.read().await.records_by_zone(zone_id))
    }

    async fn save_record_set(&self, record_set: RecordSet) -> Result<(), Error> {
        self.mutate(|t| t.upsert_record(record_set)).await
    }

    async fn remove_record_set(&self, id: Uuid) -> Result<(), Error> {
        self.mutate(|t| {
            t.remove_record(id);
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl ChangeLogRepository for FileStore {
    async fn find_by_plan_id(&self, plan_id: &str) -> Result<Vec<ChangeLog>, Error> {
        Ok(self.tables.read().await.change_logs_by_plan(plan_id))
    }

    async fn find_by_status(&self, status: ChangeStatus) -> Result<Vec<ChangeLog>, Error> {
        Ok(self.tables.read().await.change_logs_by_status(status))
    }

    async fn save_change_log(&self, entry: ChangeLog) -> Result<(), Error> {
        self.mutate(|t| {
            t.upsert_change_log(entry);
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl SyncStore for FileStore {
    async fn commit(&self, changes: ChangeSet) -> Result<(), Error> {
        if changes.is_empty() {
            return Ok(());
        }
        let staged = changes.len();
        self.mutate(|t| {
            *t = t.with_changes(changes)?;
            Ok(())
        })
        .await?;
        tracing::debug!("Committed {} staged entities to {}", staged, self.path.display());
        Ok(())
    }
}
