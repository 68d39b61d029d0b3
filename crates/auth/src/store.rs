//! Session-scoped key/value storage for token material.
//!
//! Storage failures never reach callers: reads degrade to `None` and writes
//! to silent no-ops, with a warning logged. Every component re-reads through
//! the store instead of caching values across `.await` points.

use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use tempfile::NamedTempFile;

use bankflow_core::AuthError;

pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str);

    fn remove(&self, key: &str);

    /// Wipe every key.
    fn clear(&self);
}

fn degraded(op: &'static str, key: &str, err: &AuthError) {
    tracing::warn!(op, key, %err, "session storage degraded to no-op");
}

/// Process-scoped store (the equivalent of a single tab's session storage).
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        match self.entries.read() {
            Ok(entries) => entries.get(key).cloned(),
            Err(_) => {
                degraded("get", key, &AuthError::storage("lock poisoned"));
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) {
        match self.entries.write() {
            Ok(mut entries) => {
                entries.insert(key.to_string(), value.to_string());
            }
            Err(_) => degraded("set", key, &AuthError::storage("lock poisoned")),
        }
    }

    fn remove(&self, key: &str) {
        match self.entries.write() {
            Ok(mut entries) => {
                entries.remove(key);
            }
            Err(_) => degraded("remove", key, &AuthError::storage("lock poisoned")),
        }
    }

    fn clear(&self) {
        match self.entries.write() {
            Ok(mut entries) => entries.clear(),
            Err(_) => degraded("clear", "*", &AuthError::storage("lock poisoned")),
        }
    }
}

/// JSON-file store that survives process restarts.
///
/// The whole record is rewritten on each mutation through a temporary file in
/// the same directory, so a crash never leaves a half-written session. A
/// missing file is an empty session. An unreadable or corrupt file makes the store unavailable rather
/// than being overwritten.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>, AuthError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| AuthError::storage(format!("corrupt session file: {e}"))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(AuthError::storage(e.to_string())),
        }
    }

    fn save(&self, entries: &HashMap<String, String>) -> Result<(), AuthError> {
        let raw = serde_json::to_vec(entries).map_err(|e| AuthError::storage(e.to_string()))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| AuthError::storage(e.to_string()))?;
        tmp.write_all(&raw)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| AuthError::storage(e.to_string()))?;

        tmp.persist(&self.path)
            .map(|_| ())
            .map_err(|e| AuthError::storage(e.error.to_string()))
    }

    fn mutate<F>(&self, op: &'static str, key: &str, f: F)
    where
        F: FnOnce(&mut HashMap<String, String>),
    {
        let Ok(_guard) = self.lock.lock() else {
            degraded(op, key, &AuthError::storage("lock poisoned"));
            return;
        };

        let result = self.load().and_then(|mut entries| {
            f(&mut entries);
            self.save(&entries)
        });

        if let Err(err) = result {
            degraded(op, key, &err);
        }
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Option<String> {
        let Ok(_guard) = self.lock.lock() else {
            degraded("get", key, &AuthError::storage("lock poisoned"));
            return None;
        };

        match self.load() {
            Ok(mut entries) => entries.remove(key),
            Err(err) => {
                degraded("get", key, &err);
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) {
        self.mutate("set", key, |entries| {
            entries.insert(key.to_string(), value.to_string());
        });
    }

    fn remove(&self, key: &str) {
        self.mutate("remove", key, |entries| {
            entries.remove(key);
        });
    }

    fn clear(&self) {
        let Ok(_guard) = self.lock.lock() else {
            degraded("clear", "*", &AuthError::storage("lock poisoned"));
            return;
        };

        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => degraded("clear", "*", &AuthError::storage(e.to_string())),
        }
    }
}
