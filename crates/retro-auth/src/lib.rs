pub mod identity;

pub use identity::{IdentityStore, RegistrationPolicy};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use retro_core::config::SessionBackend;
use retro_core::error::RetroError;

/// Key under which the logged-in user record is kept.
pub const SESSION_KEY: &str = "currentUser";

/// Trait for durable session storage backends.
pub trait SessionStore: Send + Sync {
    /// Store a value under the given key.
    fn store(&self, key: &str, value: &str) -> Result<(), RetroError>;

    /// Retrieve a value by key.
    fn get(&self, key: &str) -> Result<Option<String>, RetroError>;

    /// Delete a stored value. Missing keys are not an error.
    fn delete(&self, key: &str) -> Result<(), RetroError>;
}

/// Build the session store selected in the configuration.
pub fn open_session_store(backend: SessionBackend, dir: PathBuf) -> Arc<dyn SessionStore> {
    match backend {
        SessionBackend::File => Arc::new(FileStore::new(dir)),
        SessionBackend::Keyring => Arc::new(KeyringStore::new()),
    }
}

fn session_err(e: impl std::fmt::Display) -> RetroError {
    RetroError::Session {
        message: e.to_string(),
    }
}

/// OS keychain-backed session store using the `keyring` crate.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            service: "retro".to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, RetroError> {
        keyring::Entry::new(&self.service, key).map_err(session_err)
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for KeyringStore {
    fn store(&self, key: &str, value: &str) -> Result<(), RetroError> {
        self.entry(key)?.set_password(value).map_err(session_err)
    }

    fn get(&self, key: &str) -> Result<Option<String>, RetroError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(session_err(e)),
        }
    }

    fn delete(&self, key: &str) -> Result<(), RetroError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(session_err(e)),
        }
    }
}

/// Session store keeping one `<key>.json` file per key under a directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SessionStore for FileStore {
    fn store(&self, key: &str, value: &str) -> Result<(), RetroError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path(key), value)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, RetroError> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(path)?))
    }

    fn delete(&self, key: &str) -> Result<(), RetroError> {
        let path = self.path(key);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// In-memory session store for testing.
pub struct MemoryStore {
    store: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(HashMap::new()),
        }
    }

    fn map(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, RetroError> {
        self.store.lock().map_err(|_| session_err("session lock poisoned"))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemoryStore {
    fn store(&self, key: &str, value: &str) -> Result<(), RetroError> {
        self.map()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, RetroError> {
        Ok(self.map()?.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), RetroError> {
        self.map()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_crud() {
        let store = MemoryStore::new();
        assert_eq!(store.get(SESSION_KEY).unwrap(), None);
        store.store(SESSION_KEY, "{}").unwrap();
        assert_eq!(store.get(SESSION_KEY).unwrap(), Some("{}".to_string()));
        store.delete(SESSION_KEY).unwrap();
        assert_eq!(store.get(SESSION_KEY).unwrap(), None);
    }

    #[test]
    fn test_memory_store_delete_nonexistent() {
        let store = MemoryStore::new();
        store.delete("no-such-key").unwrap();
    }

    #[test]
    fn test_file_store_crud() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("session"));
        assert_eq!(store.get(SESSION_KEY).unwrap(), None);

        store.store(SESSION_KEY, r#"{"id":"u1"}"#).unwrap();
        assert!(dir.path().join("session/currentUser.json").exists());
        assert_eq!(
            store.get(SESSION_KEY).unwrap().as_deref(),
            Some(r#"{"id":"u1"}"#)
        );

        store.delete(SESSION_KEY).unwrap();
        store.delete(SESSION_KEY).unwrap();
        assert_eq!(store.get(SESSION_KEY).unwrap(), None);
    }
}
