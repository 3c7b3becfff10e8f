//! Local preference store.
//!
//! Persists last-observed permission statuses and the last equipment
//! selection. Everything here is an advisory cache: the OS stays the source
//! of truth for permissions, and a lost preference only costs a UI default.
//! [`PreferenceStore`] therefore exposes no `Result` at all. Backend errors
//! are logged at debug and turned into a no-op or a cache miss.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;

use crate::db::{self, DatabaseError};
use crate::models::{EquipmentSelection, PermissionKind, PermissionStatus};

pub const CAMERA_PERMISSION_KEY: &str = "fitness_mvp:camera_permission";
pub const GALLERY_PERMISSION_KEY: &str = "fitness_mvp:gallery_permission";
pub const LAST_EQUIPMENT_KEY: &str = "fitness_mvp:last_equipment_selection";

/// Storage key holding the last status for a permission kind.
pub fn permission_key(kind: PermissionKind) -> &'static str {
    match kind {
        PermissionKind::Camera => CAMERA_PERMISSION_KEY,
        PermissionKind::Gallery => GALLERY_PERMISSION_KEY,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Storage task failed: {0}")]
    Task(String),
}

// ═══════════════════════════════════════════════════════════
// Backends
// ═══════════════════════════════════════════════════════════

/// Raw string key-value storage. Implementations may fail; the
/// [`PreferenceStore`] wrapper absorbs those failures.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// SQLite-backed store (`user_preferences` table).
///
/// Queries run on the blocking pool so the async caller never stalls on disk.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(db::open_database(path)?))
    }

    pub fn in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(db::open_memory_database()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    async fn with_conn<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, DatabaseError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| StoreError::LockPoisoned)?;
            op(&guard).map_err(StoreError::from)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = key.to_string();
        self.with_conn(move |conn| db::get_user_preference(conn, &key))
            .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let (key, value) = (key.to_string(), value.to_string());
        self.with_conn(move |conn| db::set_user_preference(conn, &key, &value))
            .await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        self.with_conn(move |conn| db::delete_user_preference(conn, &key))
            .await
    }
}

/// Process-local store, for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::LockPoisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::LockPoisoned)?;
        values.remove(key);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════
// PreferenceStore
// ═══════════════════════════════════════════════════════════

/// Best-effort preference access. Cheap to clone; clones share the backend.
#[derive(Clone)]
pub struct PreferenceStore {
    backend: Arc<dyn KeyValueStore>,
}

impl PreferenceStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Store backed by a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::default()))
    }

    /// Store backed by the SQLite file at `path`.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::new(Arc::new(SqliteStore::open(path)?)))
    }

    pub async fn save(&self, key: &str, value: &str) {
        if let Err(e) = self.backend.set(key, value).await {
            tracing::debug!(key, error = %e, "Failed to persist preference");
        }
    }

    pub async fn read(&self, key: &str) -> Option<String> {
        match self.backend.get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(key, error = %e, "Failed to read preference");
                None
            }
        }
    }

    /// Remove a value. A missing key is not an error.
    pub async fn clear(&self, key: &str) {
        if let Err(e) = self.backend.remove(key).await {
            tracing::debug!(key, error = %e, "Failed to clear preference");
        }
    }

    // ── Typed accessors ──────────────────────────────────

    pub async fn save_permission(&self, kind: PermissionKind, status: PermissionStatus) {
        self.save(permission_key(kind), status.as_str()).await;
    }

    /// Last persisted status; `None` when unset or unparseable.
    pub async fn read_permission(&self, kind: PermissionKind) -> Option<PermissionStatus> {
        self.read_parsed(permission_key(kind)).await
    }

    pub async fn save_equipment(&self, choice: EquipmentSelection) {
        self.save(LAST_EQUIPMENT_KEY, choice.as_str()).await;
    }

    pub async fn read_equipment(&self) -> Option<EquipmentSelection> {
        self.read_parsed(LAST_EQUIPMENT_KEY).await
    }

    pub async fn clear_equipment(&self) {
        self.clear(LAST_EQUIPMENT_KEY).await;
    }

    async fn read_parsed<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        let raw = self.read(key).await?;
        match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::debug!(key, value = %raw, "Ignoring unrecognized stored preference");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Backend whose every call fails.
    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::LockPoisoned)
        }
        async fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Task("disk full".into()))
        }
        async fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::LockPoisoned)
        }
    }

    fn sqlite_prefs() -> PreferenceStore {
        PreferenceStore::new(Arc::new(SqliteStore::in_memory().unwrap()))
    }

    #[tokio::test]
    async fn permission_round_trip() {
        for prefs in [PreferenceStore::in_memory(), sqlite_prefs()] {
            prefs
                .save_permission(PermissionKind::Camera, PermissionStatus::Granted)
                .await;
            assert_eq!(
                prefs.read_permission(PermissionKind::Camera).await,
                Some(PermissionStatus::Granted)
            );
            assert_eq!(prefs.read(CAMERA_PERMISSION_KEY).await.as_deref(), Some("granted"));
        }
    }

    #[tokio::test]
    async fn unset_key_reads_none() {
        let prefs = sqlite_prefs();
        assert_eq!(prefs.read(GALLERY_PERMISSION_KEY).await, None);
        assert_eq!(prefs.read_permission(PermissionKind::Gallery).await, None);
        assert_eq!(prefs.read_equipment().await, None);
    }

    #[tokio::test]
    async fn permission_kinds_use_separate_keys() {
        let prefs = PreferenceStore::in_memory();
        prefs
            .save_permission(PermissionKind::Camera, PermissionStatus::Denied)
            .await;
        assert_eq!(prefs.read_permission(PermissionKind::Gallery).await, None);
        assert_ne!(
            permission_key(PermissionKind::Camera),
            permission_key(PermissionKind::Gallery)
        );
    }

    #[tokio::test]
    async fn equipment_overwrite_and_clear() {
        let prefs = sqlite_prefs();
        prefs.save_equipment(EquipmentSelection::Bodyweight).await;
        prefs.save_equipment(EquipmentSelection::Mat).await;
        assert_eq!(prefs.read_equipment().await, Some(EquipmentSelection::Mat));

        prefs.clear_equipment().await;
        assert_eq!(prefs.read_equipment().await, None);

        // Clearing again is not an error.
        prefs.clear_equipment().await;
    }

    #[tokio::test]
    async fn garbage_value_reads_as_none() {
        let prefs = PreferenceStore::in_memory();
        prefs.save(LAST_EQUIPMENT_KEY, "barbell").await;
        assert_eq!(prefs.read_equipment().await, None);
        assert_eq!(prefs.read(LAST_EQUIPMENT_KEY).await.as_deref(), Some("barbell"));
    }

    #[tokio::test]
    async fn backend_failures_are_swallowed() {
        let prefs = PreferenceStore::new(Arc::new(BrokenStore));
        prefs
            .save_permission(PermissionKind::Camera, PermissionStatus::Granted)
            .await;
        assert_eq!(prefs.read_permission(PermissionKind::Camera).await, None);
        prefs.clear_equipment().await;
    }

    #[tokio::test]
    async fn sqlite_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.db");

        PreferenceStore::open(&path)
            .unwrap()
            .save_equipment(EquipmentSelection::Dumbbells)
            .await;

        let reopened = PreferenceStore::open(&path).unwrap();
        assert_eq!(
            reopened.read_equipment().await,
            Some(EquipmentSelection::Dumbbells)
        );
    }

    #[tokio::test]
    async fn clones_share_backend() {
        let prefs = PreferenceStore::in_memory();
        let other = prefs.clone();
        prefs.save("k", "v").await;
        assert_eq!(other.read("k").await.as_deref(), Some("v"));
    }
}
