//! Storage layer for questlog
//!
//! All state lives in one data directory:
//!
//! ```text
//! <data_dir>/
//!   questlog.toml     # Configuration (optional)
//!   user              # Persisted user identity
//!   store.json        # Tasks and per-user point/streak aggregates
//!   store.lock        # Lock serializing writers
//! ```
//!
//! The data directory resolves from `--data-dir`, then `QUESTLOG_DIR`, then
//! the platform data directory, then `./.questlog`.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Serialize};

use crate::config::config_path;
use crate::error::Result;
use crate::lock;

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "QUESTLOG_DIR";

/// Fallback directory name when no platform data dir is available
pub const FALLBACK_DIR: &str = ".questlog";

/// Storage manager for questlog state
#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Resolve the data directory from an explicit path, the environment,
    /// or the platform default.
    pub fn resolve(explicit: Option<&Path>) -> Self {
        if let Some(path) = explicit {
            return Self::new(path.to_path_buf());
        }
        if let Ok(raw) = std::env::var(DATA_DIR_ENV) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Self::new(PathBuf::from(trimmed));
            }
        }
        let data_dir = ProjectDirs::from("", "", "questlog")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(FALLBACK_DIR));
        Self::new(data_dir)
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_file(&self) -> PathBuf {
        config_path(&self.data_dir)
    }

    pub fn user_file(&self) -> PathBuf {
        self.data_dir.join("user")
    }

    pub fn store_file(&self) -> PathBuf {
        self.data_dir.join("store.json")
    }

    pub fn lock_file(&self) -> PathBuf {
        self.data_dir.join("store.lock")
    }

    // =========================================================================
    // Directory initialization
    // =========================================================================

    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.data_dir.exists()
    }

    // =========================================================================
    // File I/O helpers
    // =========================================================================

    /// Write JSON atomically so readers never see a partial file.
    pub fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        lock::write_atomic(path, json.as_bytes())
    }

    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        let data: T = serde_json::from_str(&content)?;
        Ok(data)
    }

    /// Read a JSON file, or `None` when it does not exist yet.
    pub fn read_json_opt<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }
        self.read_json(path).map(Some)
    }

    // =========================================================================
    // User persistence
    // =========================================================================

    pub fn read_user(&self) -> Result<Option<String>> {
        let path = self.user_file();
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        let user = raw.trim();
        if user.is_empty() {
            return Ok(None);
        }
        Ok(Some(user.to_string()))
    }

    pub fn write_user(&self, user: &str) -> Result<()> {
        self.init()?;
        lock::write_atomic(self.user_file(), format!("{user}\n").as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[test]
    fn paths_live_in_data_dir() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().to_path_buf());

        assert_eq!(storage.config_file(), temp.path().join("questlog.toml"));
        assert_eq!(storage.user_file(), temp.path().join("user"));
        assert_eq!(storage.store_file(), temp.path().join("store.json"));
        assert_eq!(storage.lock_file(), temp.path().join("store.lock"));
    }

    #[test]
    fn explicit_dir_wins() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::resolve(Some(temp.path()));
        assert_eq!(storage.data_dir(), temp.path());
    }

    #[test]
    fn init_creates_directory() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().join("data"));
        assert!(!storage.is_initialized());
        storage.init().unwrap();
        assert!(storage.is_initialized());
    }

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Record {
        id: u32,
        title: String,
    }

    #[test]
    fn json_roundtrip_and_missing_file() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().to_path_buf());
        let path = storage.store_file();

        let missing: Option<Record> = storage.read_json_opt(&path).unwrap();
        assert!(missing.is_none());

        let record = Record {
            id: 7,
            title: "water plants".to_string(),
        };
        storage.write_json(&path, &record).unwrap();
        let back: Option<Record> = storage.read_json_opt(&path).unwrap();
        assert_eq!(back, Some(record));
    }

    #[test]
    fn user_roundtrip() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().join("data"));

        assert_eq!(storage.read_user().unwrap(), None);
        storage.write_user("alice").unwrap();
        assert_eq!(storage.read_user().unwrap().as_deref(), Some("alice"));
    }
}
