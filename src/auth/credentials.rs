use base64::{engine::general_purpose::STANDARD, Engine};
use keyring::Entry;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

use crate::error::{Result, SolarDetectError};

const SERVICE_NAME: &str = "com.solardetect.client";

/// Key/value storage for session secrets.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
}

/// Plain files under a directory, one per key, base64 obfuscated.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store under the user config directory.
    pub fn in_config_dir() -> Option<Self> {
        dirs::config_dir().map(|dir| Self::new(dir.join("solar-detect")))
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}_key", key))
    }
}

impl TokenStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let encoded = fs::read_to_string(&path)
            .map_err(|e| SolarDetectError::Credentials(format!("Failed to read {}: {}", key, e)))?;
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| SolarDetectError::Credentials(format!("Corrupt {} file: {}", key, e)))?;
        let value = String::from_utf8(bytes)
            .map_err(|e| SolarDetectError::Credentials(format!("Invalid UTF-8: {}", e)))?;
        Ok(Some(value))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            SolarDetectError::Credentials(format!("Failed to create config directory: {}", e))
        })?;
        fs::write(self.path_for(key), STANDARD.encode(value))
            .map_err(|e| SolarDetectError::Credentials(format!("Failed to write {}: {}", key, e)))
    }

    fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                SolarDetectError::Credentials(format!("Failed to delete {}: {}", key, e))
            })?;
        }
        Ok(())
    }
}

/// System keychain, with a config-dir file fallback in debug builds.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    fallback: Option<FileStore>,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            fallback: if cfg!(debug_assertions) {
                FileStore::in_config_dir()
            } else {
                None
            },
        }
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        if let Ok(entry) = Entry::new(SERVICE_NAME, key) {
            if let Ok(value) = entry.get_password() {
                debug!(key, "Read credential from keychain");
                return Ok(Some(value));
            }
        }

        match &self.fallback {
            Some(files) => files.get(key),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        match Entry::new(SERVICE_NAME, key) {
            Ok(entry) => {
                // Only trust the keychain if a fresh entry reads the value back
                if entry.set_password(value).is_ok() && read_back(key).as_deref() == Some(value) {
                    debug!(key, "Stored credential in keychain");
                    return Ok(());
                }
            }
            Err(e) => debug!(error = %e, "Keychain unavailable"),
        }

        match &self.fallback {
            Some(files) => {
                debug!(key, "DEV MODE: storing credential in file");
                files.set(key, value)
            }
            None => Err(SolarDetectError::Credentials(
                "Secure credential storage (Keychain) unavailable".to_string(),
            )),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        if let Ok(entry) = Entry::new(SERVICE_NAME, key) {
            let _ = entry.delete_credential();
        }
        if let Some(files) = &self.fallback {
            files.delete(key)?;
        }
        Ok(())
    }
}

fn read_back(key: &str) -> Option<String> {
    Entry::new(SERVICE_NAME, key).ok()?.get_password().ok()
}

/// In-process store for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| SolarDetectError::Credentials("memory store poisoned".to_string()))
    }
}

impl TokenStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}
