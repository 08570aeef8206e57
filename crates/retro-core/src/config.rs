use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::RetroError;
use crate::latency::LatencyConfig;

/// Environment variable overriding the RetroDigital home directory.
pub const HOME_ENV: &str = "RETRO_HOME";

/// Where the durable session record lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionBackend {
    /// One JSON file per key under `~/.retro/session/`.
    File,
    /// The OS keychain.
    Keyring,
}

impl std::fmt::Display for SessionBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionBackend::File => write!(f, "file"),
            SessionBackend::Keyring => write!(f, "keyring"),
        }
    }
}

impl std::str::FromStr for SessionBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(SessionBackend::File),
            "keyring" => Ok(SessionBackend::Keyring),
            _ => Err(format!("unknown session backend: {s}")),
        }
    }
}

/// What happens to member items when their collection is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    /// Items stay in the catalog, detached from any visible collection.
    #[default]
    Keep,
    /// Items are deleted along with the collection.
    Cascade,
}

impl std::fmt::Display for OrphanPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrphanPolicy::Keep => write!(f, "keep"),
            OrphanPolicy::Cascade => write!(f, "cascade"),
        }
    }
}

impl std::str::FromStr for OrphanPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keep" => Ok(OrphanPolicy::Keep),
            "cascade" => Ok(OrphanPolicy::Cascade),
            _ => Err(format!("unknown orphan policy: {s}")),
        }
    }
}

/// Top-level configuration, stored at `~/.retro/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetroConfig {
    /// Backend for the durable session record.
    #[serde(default = "default_session_backend")]
    pub session_backend: SessionBackend,

    /// Behavior of collection deletion towards member items.
    #[serde(default)]
    pub orphan_policy: OrphanPolicy,

    /// Reject registrations whose username is already taken.
    #[serde(default)]
    pub require_unique_username: bool,

    /// Simulated latency per operation class.
    #[serde(default)]
    pub latency: LatencyConfig,
}

fn default_session_backend() -> SessionBackend {
    SessionBackend::File
}

impl Default for RetroConfig {
    fn default() -> Self {
        Self {
            session_backend: SessionBackend::File,
            orphan_policy: OrphanPolicy::Keep,
            require_unique_username: false,
            latency: LatencyConfig::default(),
        }
    }
}

impl RetroConfig {
    /// Returns the home directory: `$RETRO_HOME`, else `~/.retro/`.
    pub fn home_dir() -> Result<PathBuf, RetroError> {
        if let Some(dir) = std::env::var_os(HOME_ENV) {
            return Ok(PathBuf::from(dir));
        }
        let base = dirs::home_dir().ok_or_else(|| RetroError::Config {
            message: "could not determine home directory".into(),
        })?;
        Ok(base.join(".retro"))
    }

    /// Returns the path to the config file.
    pub fn config_path() -> Result<PathBuf, RetroError> {
        Ok(Self::home_dir()?.join("config.toml"))
    }

    /// Returns the path to the catalog database.
    pub fn db_path() -> Result<PathBuf, RetroError> {
        Ok(Self::home_dir()?.join("retro.db"))
    }

    /// Returns the directory holding file-backed session records.
    pub fn session_dir() -> Result<PathBuf, RetroError> {
        Ok(Self::home_dir()?.join("session"))
    }

    /// Load config from the default location, or return defaults if not found.
    pub fn load() -> Result<Self, RetroError> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, RetroError> {
        if !path.exists() {
            return Err(RetroError::PathNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| RetroError::Serialization(e.to_string()))
    }

    /// Save config to the default location.
    pub fn save(&self) -> Result<(), RetroError> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), RetroError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| RetroError::Serialization(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Initialize the home directory with default config.
    pub fn init() -> Result<PathBuf, RetroError> {
        let home = Self::home_dir()?;
        std::fs::create_dir_all(&home)?;

        let config_path = Self::config_path()?;
        if !config_path.exists() {
            Self::default().save_to(&config_path)?;
        }

        Ok(home)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_roundtrip() {
        let config = RetroConfig::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: RetroConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(config.session_backend, deserialized.session_backend);
        assert_eq!(config.orphan_policy, deserialized.orphan_policy);
        assert_eq!(config.latency, deserialized.latency);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: RetroConfig = toml::from_str("").unwrap();
        assert_eq!(config.session_backend, SessionBackend::File);
        assert_eq!(config.orphan_policy, OrphanPolicy::Keep);
        assert!(!config.require_unique_username);
        assert_eq!(config.latency.fetch_ms, 800);
    }

    #[test]
    fn test_save_and_load_from() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = RetroConfig::default();
        config.orphan_policy = OrphanPolicy::Cascade;
        config.latency.image_ms = 0;
        config.save_to(&path).unwrap();

        let loaded = RetroConfig::load_from(&path).unwrap();
        assert_eq!(loaded.orphan_policy, OrphanPolicy::Cascade);
        assert_eq!(loaded.latency.image_ms, 0);
    }

    #[test]
    fn test_load_from_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = RetroConfig::load_from(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, RetroError::PathNotFound { .. }));
    }
}
