//! Small string key/value persistence used for the login state token and the
//! completed-interval counter. Values carry no expiry.

use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::FocusError;

/// Key holding the anti-forgery token.
pub const STATE_TOKEN_KEY: &str = "stateToken";
/// Key holding the number of completed work intervals.
pub const COUNT_KEY: &str = "pomodoroCount";

/// Cookie-like persistence collaborator.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), FocusError>;
}

fn lock_map(map: &Mutex<HashMap<String, String>>) -> MutexGuard<'_, HashMap<String, String>> {
    // A panic while holding the guard cannot leave a half-written String behind.
    map.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Process-local store, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with existing values, e.g. to simulate a returning visitor.
    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: Mutex::new(
                values
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        lock_map(&self.values).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        lock_map(&self.values).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), FocusError> {
        lock_map(&self.values).insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON-file backed store. The whole map is rewritten under an exclusive file lock on
/// every `set`, so two processes sharing a profile never interleave writes.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FocusError> {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => HashMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Store file missing, starting empty");
                HashMap::new()
            }
            Err(e) => return Err(FocusError::IoError(e)),
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &HashMap<String, String>) -> Result<(), FocusError> {
        let payload = serde_json::to_vec_pretty(values)?;
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        file.lock_exclusive()?;
        let result = file
            .set_len(0)
            .and_then(|_| file.write_all(&payload))
            .and_then(|_| file.flush());
        if let Err(e) = file.unlock() {
            warn!(error = %e, path = %self.path.display(), "Failed to release store lock");
        }
        result.map_err(FocusError::IoError)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        lock_map(&self.values).get(key).cloned()
    }

    /// The in-memory map only changes once the file write succeeded.
    fn set(&self, key: &str, value: &str) -> Result<(), FocusError> {
        let mut values = lock_map(&self.values);
        let mut updated = values.clone();
        updated.insert(key.to_string(), value.to_string());
        self.persist(&updated)?;
        *values = updated;
        Ok(())
    }
}
