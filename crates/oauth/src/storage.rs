//! Local session persistence on top of a small key-value store
//!
//! The file backend keeps its entries in:
//! - Linux: ~/.local/share/authleiber/session.json
//! - macOS: ~/Library/Application Support/com.authleiber.authleiber/session.json
//! - Windows: %APPDATA%\authleiber\authleiber\data\session.json
//!
//! The keyring backend stores each key as a separate credential of the
//! `authleiber` service.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::constants::{ACCESS_TOKEN_KEY, USER_KEY};
use crate::error::{AuthError, Result};
use crate::profile::Profile;
use crate::session::Session;

/// Storage format version (for future migrations)
const STORAGE_VERSION: u32 = 1;

/// Service name for system keyring
const KEYRING_SERVICE: &str = "authleiber";

/// Minimal string key-value store, the shape of a platform default store
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Removing a missing key succeeds
    fn remove(&self, key: &str) -> Result<()>;
}

// =========================================================================
// File backend
// =========================================================================

/// On-disk layout of the file backend
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntries {
    version: u32,
    entries: BTreeMap<String, String>,
}

impl Default for StoredEntries {
    fn default() -> Self {
        Self {
            version: STORAGE_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

/// JSON file backed store
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Opens the store at the platform data directory
    pub fn new() -> Result<Self> {
        let data_dir = directories::ProjectDirs::from("com", "authleiber", "authleiber")
            .ok_or_else(|| AuthError::store("could not determine data directory for your platform"))?
            .data_dir()
            .to_path_buf();

        Self::at(data_dir.join("session.json"))
    }

    /// Opens the store at an explicit path, creating parent directories
    pub fn at(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(AuthError::store)?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<StoredEntries> {
        if !self.path.exists() {
            debug!("No session file found, returning empty");
            return Ok(StoredEntries::default());
        }

        let content = std::fs::read_to_string(&self.path).map_err(AuthError::store)?;
        serde_json::from_str(&content)
            .map_err(|e| AuthError::Store(format!("failed to parse session file: {}", e)))
    }

    fn write_entries(&self, entries: &StoredEntries) -> Result<()> {
        let content = serde_json::to_string_pretty(entries).map_err(AuthError::store)?;
        // Write-then-rename so a crash never leaves a truncated file
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(AuthError::store)?;
        std::fs::rename(&tmp, &self.path).map_err(AuthError::store)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_entries()?.entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut stored = self.read_entries()?;
        stored.entries.insert(key.to_string(), value.to_string());
        self.write_entries(&stored)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut stored = self.read_entries()?;
        if stored.entries.remove(key).is_some() {
            self.write_entries(&stored)?;
        }
        Ok(())
    }
}

// =========================================================================
// Keyring backend
// =========================================================================

/// System keyring backed store
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            service: KEYRING_SERVICE.to_string(),
        }
    }

    /// Opens the keyring store once it has kept a throwaway credential
    pub fn open() -> Result<Self> {
        let store = Self::new();
        store.verify()?;
        Ok(store)
    }

    /// Writes, reads back and deletes a check credential
    fn verify(&self) -> Result<()> {
        const CHECK_KEY: &str = "availability-check";

        self.set(CHECK_KEY, "ok")?;
        let kept = self.get(CHECK_KEY)?;
        self.remove(CHECK_KEY)?;

        match kept.as_deref() {
            Some("ok") => Ok(()),
            _ => Err(AuthError::store("system keyring did not keep a stored credential")),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, key)
            .map_err(|e| AuthError::Store(format!("failed to create keyring entry: {}", e)))
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(AuthError::Store(format!("failed to read from keyring: {}", e))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .map_err(|e| AuthError::Store(format!("failed to store in keyring: {}", e)))
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(AuthError::Store(format!("failed to remove from keyring: {}", e))),
        }
    }
}

// =========================================================================
// Memory backend
// =========================================================================

/// Process-local store; nothing survives a restart
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| AuthError::store("memory store lock poisoned"))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

// =========================================================================
// Session store
// =========================================================================

/// Persists a [`Session`] as the `access_token` and `user` keys
pub struct SessionStore {
    backend: Box<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    pub fn from_boxed(backend: Box<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Read access to the raw keys
    pub fn backend(&self) -> &dyn KeyValueStore {
        self.backend.as_ref()
    }

    /// Writes both keys; if the second write fails the first is rolled back
    pub fn save(&self, session: &Session) -> Result<()> {
        let user = serde_json::to_string(&session.user).map_err(AuthError::store)?;
        self.backend.set(USER_KEY, &user)?;

        if let Err(e) = self.backend.set(ACCESS_TOKEN_KEY, &session.access_token) {
            if let Err(rollback) = self.backend.remove(USER_KEY) {
                warn!("Failed to roll back partial session write: {}", rollback);
            }
            return Err(e);
        }

        info!("Saved session for {}", session.user.username);
        Ok(())
    }

    /// Returns the stored session when both keys are present
    pub fn load(&self) -> Result<Option<Session>> {
        let user = self.backend.get(USER_KEY)?;
        let token = self.backend.get(ACCESS_TOKEN_KEY)?;

        match (user, token) {
            (Some(user), Some(access_token)) => {
                let user: Profile = serde_json::from_str(&user)
                    .map_err(|e| AuthError::Store(format!("stored user record is corrupt: {}", e)))?;
                debug!("Loaded stored session for {}", user.username);
                Ok(Some(Session { access_token, user }))
            }
            (None, None) => {
                debug!("No stored session");
                Ok(None)
            }
            _ => {
                warn!("Store holds an incomplete session; treating as logged out");
                Ok(None)
            }
        }
    }

    /// Removes both keys, attempting the second even if the first fails
    pub fn clear(&self) -> Result<()> {
        let user = self.backend.remove(USER_KEY);
        let token = self.backend.remove(ACCESS_TOKEN_KEY);
        user.and(token)?;
        info!("Cleared stored session");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn bob() -> Session {
        Session {
            access_token: "abc".into(),
            user: Profile::new("1", "bob"),
        }
    }

    fn create_file_store() -> (FileStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::at(temp_dir.path().join("nested").join("session.json")).unwrap();
        (store, temp_dir)
    }

    /// Backend whose writes to one key always fail
    struct FailingKey {
        inner: MemoryStore,
        failing: &'static str,
    }

    impl KeyValueStore for FailingKey {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            if key == self.failing {
                return Err(AuthError::store("disk full"));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_file_store_set_get_remove() {
        let (store, _temp) = create_file_store();

        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));

        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        // Removing again is fine
        store.remove("k").unwrap();
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let (store, _temp) = create_file_store();
        store.set(ACCESS_TOKEN_KEY, "abc").unwrap();

        let reopened = FileStore::at(store.path().to_path_buf()).unwrap();
        assert_eq!(reopened.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let (store, _temp) = create_file_store();
        std::fs::write(store.path(), "not json").unwrap();
        assert!(matches!(store.get("k"), Err(AuthError::Store(_))));
    }

    #[test]
    fn test_session_round_trip() {
        let (file, _temp) = create_file_store();
        let store = SessionStore::new(file);

        store.save(&bob()).unwrap();
        assert_eq!(store.load().unwrap(), Some(bob()));
    }

    #[test]
    fn test_session_keys_use_documented_names() {
        let store = SessionStore::new(MemoryStore::new());
        store.save(&bob()).unwrap();

        assert_eq!(store.backend().get("access_token").unwrap().as_deref(), Some("abc"));
        let user = store.backend().get("user").unwrap().unwrap();
        assert_eq!(user, r#"{"id":"1","username":"bob"}"#);
    }

    #[test]
    fn test_clear_removes_both_keys() {
        let store = SessionStore::new(MemoryStore::new());
        store.save(&bob()).unwrap();
        store.clear().unwrap();

        assert_eq!(store.load().unwrap(), None);
        assert_eq!(store.backend().get(ACCESS_TOKEN_KEY).unwrap(), None);
        assert_eq!(store.backend().get(USER_KEY).unwrap(), None);
        // Clearing an empty store is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_partial_session_loads_as_none() {
        let backend = MemoryStore::new();
        backend.set(ACCESS_TOKEN_KEY, "abc").unwrap();
        let store = SessionStore::new(backend);
        assert_eq!(store.load().unwrap(), None);

        let backend = MemoryStore::new();
        backend.set(USER_KEY, r#"{"id":"1","username":"bob"}"#).unwrap();
        let store = SessionStore::new(backend);
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_failed_token_write_rolls_back_user() {
        let store = SessionStore::new(FailingKey {
            inner: MemoryStore::new(),
            failing: ACCESS_TOKEN_KEY,
        });

        assert!(store.save(&bob()).is_err());
        assert_eq!(store.backend().get(USER_KEY).unwrap(), None);
        assert_eq!(store.load().unwrap(), None);
    }

    #[cfg(not(feature = "keyring-native"))]
    #[test]
    fn test_keyring_without_native_backend_is_refused() {
        // keyring's mock backend forgets values between entries
        let store = KeyringStore::new();
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap(), None);

        assert!(matches!(KeyringStore::open(), Err(AuthError::Store(_))));
    }

    #[test]
    fn test_corrupt_user_record_is_a_store_error() {
        let backend = MemoryStore::new();
        backend.set(ACCESS_TOKEN_KEY, "abc").unwrap();
        backend.set(USER_KEY, "{").unwrap();
        let store = SessionStore::new(backend);
        assert!(matches!(store.load(), Err(AuthError::Store(_))));
    }
}
