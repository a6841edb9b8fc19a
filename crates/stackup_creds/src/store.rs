//! File-backed credential store.
//!
//! Credentials live in one TOML file with per-entry creation timestamps.
//! Writes go through a temp file in the same directory followed by an
//! atomic rename, so readers either see the previous complete file or the
//! new complete file, never a partial one. The file is owner-readable only.
//!
//! Keys the materializer does not manage (e.g. a service token discovered
//! after deployment) survive regeneration of managed keys.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;
use zeroize::Zeroize;

use crate::error::{CredsError, CredsResult};

/// One named credential with its creation timestamp.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialEntry {
    pub value: String,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for CredentialEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialEntry")
            .field("value", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// A mapping from credential name to secret value.
///
/// Values are wiped from memory on drop.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialSet {
    #[serde(default)]
    credentials: BTreeMap<String, CredentialEntry>,
}

impl CredentialSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a credential value by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.credentials.get(name).map(|e| e.value.as_str())
    }

    /// Get a full entry by name.
    pub fn entry(&self, name: &str) -> Option<&CredentialEntry> {
        self.credentials.get(name)
    }

    /// Insert or replace a credential, stamping it with the current time.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.credentials.insert(
            name.into(),
            CredentialEntry {
                value: value.into(),
                created_at: Utc::now(),
            },
        );
    }

    /// Names of all stored credentials.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.credentials.keys().map(|k| k.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.credentials.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

impl std::fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSet")
            .field("names", &self.credentials.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Drop for CredentialSet {
    fn drop(&mut self) {
        for entry in self.credentials.values_mut() {
            entry.value.zeroize();
        }
    }
}

/// Advisory lock guarding credential and certificate generation.
///
/// Held for the duration of a generation step; the lock file is removed
/// when the guard drops.
pub struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    /// Acquire an advisory lock at the given path.
    pub fn acquire(path: PathBuf) -> CredsResult<Self> {
        let unwritable = |message: String| CredsError::StoreUnwritable {
            path: path.clone(),
            message,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| unwritable(e.to_string()))?;
        }

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Self { path }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(CredsError::LockHeld(path))
            }
            Err(e) => Err(unwritable(e.to_string())),
        }
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// File-backed credential store with atomic replace semantics.
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the credential set, or `None` if the store file does not exist.
    pub fn load(&self) -> CredsResult<Option<CredentialSet>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let text = fs::read_to_string(&self.path)?;
        let set: CredentialSet = toml::from_str(&text).map_err(|e| CredsError::StoreCorrupt {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        debug!(path = %self.path.display(), entries = set.len(), "loaded credential store");
        Ok(Some(set))
    }

    /// Persist the full credential set atomically.
    ///
    /// The set is serialized to a temp file in the store's directory,
    /// restricted to the owning user, then renamed over the final path.
    pub fn persist(&self, set: &CredentialSet) -> CredsResult<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        fs::create_dir_all(&parent).map_err(|e| self.unwritable(e.to_string()))?;

        let serialized =
            toml::to_string_pretty(set).map_err(|e| self.unwritable(e.to_string()))?;

        let mut tmp =
            NamedTempFile::new_in(&parent).map_err(|e| self.unwritable(e.to_string()))?;
        tmp.write_all(serialized.as_bytes())
            .map_err(|e| self.unwritable(e.to_string()))?;

        restrict_to_owner(tmp.as_file()).map_err(|e| self.unwritable(e.to_string()))?;

        tmp.persist(&self.path)
            .map_err(|e| self.unwritable(e.to_string()))?;

        debug!(path = %self.path.display(), entries = set.len(), "persisted credential store");
        Ok(())
    }

    /// Insert or replace one credential, preserving all other keys.
    pub fn upsert(&self, name: &str, value: &str) -> CredsResult<()> {
        let mut set = self.load()?.unwrap_or_default();
        set.insert(name, value);
        self.persist(&set)
    }

    /// Acquire the advisory generation lock for this store.
    pub fn lock(&self) -> CredsResult<StoreLock> {
        StoreLock::acquire(self.lock_path())
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "credentials".to_string());
        name.push_str(".lock");
        self.path.with_file_name(name)
    }

    fn unwritable(&self, message: String) -> CredsError {
        CredsError::StoreUnwritable {
            path: self.path.clone(),
            message,
        }
    }
}

#[cfg(unix)]
pub(crate) fn restrict_to_owner(file: &fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
pub(crate) fn restrict_to_owner(_file: &fs::File) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> CredentialStore {
        CredentialStore::new(dir.path().join("credentials.toml"))
    }

    #[test]
    fn test_load_missing_store_returns_none() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_persist_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut set = CredentialSet::new();
        set.insert("database-token", "apiv3_abc");
        set.insert("admin-password", "hunter2hunter2hunter2abc");
        store.persist(&set).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.get("database-token"), Some("apiv3_abc"));
        assert_eq!(loaded, set);
    }

    #[test]
    fn test_upsert_preserves_other_keys() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut set = CredentialSet::new();
        set.insert("database-token", "apiv3_abc");
        store.persist(&set).unwrap();

        store.upsert("grafana-service-token", "glsa_xyz").unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.get("database-token"), Some("apiv3_abc"));
        assert_eq!(loaded.get("grafana-service-token"), Some("glsa_xyz"));
    }

    #[test]
    fn test_failed_persist_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        // Parent of the store path is a regular file, so the write cannot start.
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();

        let store = CredentialStore::new(blocker.join("credentials.toml"));
        let mut set = CredentialSet::new();
        set.insert("database-token", "apiv3_abc");

        let err = store.persist(&set).unwrap_err();
        assert!(matches!(err, CredsError::StoreUnwritable { .. }));
        assert!(!store.exists());
    }

    #[test]
    fn test_corrupt_store_is_reported() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "not = [valid").unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, CredsError::StoreCorrupt { .. }));
    }

    #[test]
    fn test_lock_is_exclusive_and_released_on_drop() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let guard = store.lock().unwrap();
        assert!(matches!(store.lock(), Err(CredsError::LockHeld(_))));

        drop(guard);
        assert!(store.lock().is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_store_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut set = CredentialSet::new();
        set.insert("database-token", "apiv3_abc");
        store.persist(&set).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_debug_does_not_leak_values() {
        let mut set = CredentialSet::new();
        set.insert("database-token", "apiv3_supersecret");

        let debug = format!("{:?}", set);
        assert!(!debug.contains("supersecret"));
        assert!(debug.contains("database-token"));
    }
}
