// # File Host Store
//
// JSON snapshot of the order book and its metadata, for running the daemon
// against an exported store.
//
// ## Crash Recovery
//
// - Atomic writes: write to `.tmp`, then rename over the snapshot
// - Automatic backup: the previous snapshot is kept as `.backup`
// - Recovery: a snapshot that fails to parse is replaced by its backup
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "orders": { "501": { "id": "501", "status": "on-hold", ... } },
//   "meta": { "501": { "_navexwp_tracking_code": "TRK1" } },
//   "notes": {}
// }
// ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};

use super::HostData;
use crate::order::{OrderId, OrderSnapshot};
use crate::status::OrderStatus;
use crate::traits::{MetaStore, OrderRepository};
use crate::Error;

/// Snapshot format version
const SNAPSHOT_VERSION: &str = "1.0";

/// File-backed order book
///
/// Every mutation is written through to disk before the call returns.
#[derive(Debug)]
pub struct FileHostStore {
    path: PathBuf,
    data: Arc<RwLock<HostData>>,
    /// Serialises snapshot writes so two tasks never share the temp file
    write_lock: Mutex<()>,
}

#[derive(Serialize, Deserialize)]
struct SnapshotFormat {
    version: String,
    #[serde(flatten)]
    data: HostData,
}

impl FileHostStore {
    /// Load `path`, recovering from its backup if it is corrupted
    ///
    /// A missing file starts an empty store. Parent directories are created.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
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

        let data = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            data: Arc::new(RwLock::new(data)),
            write_lock: Mutex::new(()),
        })
    }

    async fn load_with_recovery(path: &Path) -> Result<HostData, Error> {
        match Self::load(path).await {
            Ok(data) => {
                tracing::debug!("Loaded host snapshot: {} orders", data.orders.len());
                Ok(data)
            }
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "Host snapshot appears corrupted: {}. Attempting recovery from backup.",
                    e
                );
                let backup = Self::backup_path(path);
                if !backup.exists() {
                    tracing::warn!("No backup file found. Starting with an empty store.");
                    return Ok(HostData::default());
                }
                match Self::load(&backup).await {
                    Ok(data) => {
                        tracing::info!("Recovered host snapshot from backup: {} orders", data.orders.len());
                        if let Err(restore_err) = fs::copy(&backup, path).await {
                            tracing::error!("Failed to restore snapshot from backup: {}", restore_err);
                        }
                        Ok(data)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "Backup also unreadable: {}. Starting with an empty store.",
                            backup_err
                        );
                        Ok(HostData::default())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn load(path: &Path) -> Result<HostData, Error> {
        if !path.exists() {
            tracing::debug!("Host snapshot does not exist: {}", path.display());
            return Ok(HostData::default());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::store(format!("Failed to read snapshot {}: {}", path.display(), e))
        })?;

        let snapshot: SnapshotFormat = serde_json::from_str(&content)?;
        if snapshot.version != SNAPSHOT_VERSION {
            tracing::warn!(
                "Snapshot version mismatch: expected {}, got {}. Attempting to load anyway.",
                SNAPSHOT_VERSION,
                snapshot.version
            );
        }
        Ok(snapshot.data)
    }

    /// Write the current state atomically
    async fn persist(&self) -> Result<(), Error> {
        let _guard = self.write_lock.lock().await;

        let json = {
            let data = self.data.read().await;
            let snapshot = SnapshotFormat {
                version: SNAPSHOT_VERSION.to_string(),
                data: data.clone(),
            };
            serde_json::to_string_pretty(&snapshot)?
        };

        let temp = self.temp_path();
        {
            let mut file = fs::File::create(&temp).await.map_err(|e| {
                Error::store(format!("Failed to create temp file {}: {}", temp.display(), e))
            })?;
            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::store(format!("Failed to write temp file {}: {}", temp.display(), e))
            })?;
            file.flush().await.map_err(|e| {
                Error::store(format!("Failed to flush temp file {}: {}", temp.display(), e))
            })?;
        }

        if self.path.exists() {
            if let Err(e) = fs::copy(&self.path, Self::backup_path(&self.path)).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp, &self.path).await.map_err(|e| {
            Error::store(format!(
                "Failed to rename {} to {}: {}",
                temp.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Host snapshot written: {}", self.path.display());
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

    /// Add or replace an order
    pub async fn insert_order(&self, order: OrderSnapshot) -> Result<(), Error> {
        self.data.write().await.orders.insert(order.id.clone(), order);
        self.persist().await
    }

    pub async fn len(&self) -> usize {
        self.data.read().await.orders.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.orders.is_empty()
    }
}

#[async_trait]
impl OrderRepository for FileHostStore {
    async fn get_order(&self, id: &OrderId) -> Result<Option<OrderSnapshot>, Error> {
        Ok(self.data.read().await.orders.get(id).cloned())
    }

    async fn list_by_status(&self, status: &OrderStatus) -> Result<Vec<OrderId>, Error> {
        Ok(self.data.read().await.list_by_status(status))
    }

    async fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
        note: &str,
    ) -> Result<(), Error> {
        self.data.write().await.update_status(id, status, note)?;
        self.persist().await
    }
}

#[async_trait]
impl MetaStore for FileHostStore {
    async fn get_meta(&self, id: &OrderId, key: &str) -> Result<Option<String>, Error> {
        Ok(self.data.read().await.get_meta(id, key))
    }

    async fn set_meta(&self, id: &OrderId, key: &str, value: &str) -> Result<(), Error> {
        self.data.write().await.set_meta(id, key, value);
        self.persist().await
    }
}
