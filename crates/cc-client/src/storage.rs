//! Durable local key-value storage
//!
//! The SDK persists session state and cached dashboard aggregates in a
//! small string key-value store, the way the browser console keeps them
//! in localStorage. Two SDK instances sharing one [`Storage`] behave
//! like two tabs sharing the same storage area: every mutation is
//! broadcast to registered observers in mutation order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::{Mutex, ReentrantMutex, RwLock};

/// Well-known storage keys written by the session layer.
pub mod keys {
    pub const AUTH_USER: &str = "authUser";
    pub const AUTH_TOKEN: &str = "authToken";
    pub const DARK_MODE: &str = "darkMode";
}

/// A single storage mutation, delivered to observers.
#[derive(Debug, Clone)]
pub struct StorageChange {
    pub key: String,
    /// New value; `None` means the key was removed.
    pub value: Option<String>,
}

/// Backend contract for durable string storage.
///
/// Implementations must be cheap to read: `get` sits on hot paths.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> std::io::Result<()>;
    fn remove(&self, key: &str) -> std::io::Result<()>;
    fn keys_with_prefix(&self, prefix: &str) -> Vec<String>;
}

/// In-memory backend, used in tests and as the default.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.clone())
    }

    fn set(&self, key: &str, value: &str) -> std::io::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> std::io::Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| e.key().clone())
            .collect()
    }
}

/// Durable single-file JSON backend.
///
/// The whole map is rewritten on every mutation; the store is small
/// (session keys plus a handful of cached aggregates), so this stays
/// well under a millisecond in practice.
pub struct JsonFileStore {
    path: std::path::PathBuf,
    entries: Mutex<std::collections::HashMap<String, String>>,
}

impl JsonFileStore {
    /// Open the store at `path`, loading existing entries. A missing or
    /// unreadable file starts empty.
    pub fn open(path: impl Into<std::path::PathBuf>) -> Self {
        let path = path.into();
        let entries = std::fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    fn persist(
        &self,
        entries: &std::collections::HashMap<String, String>,
    ) -> std::io::Result<()> {
        let raw = serde_json::to_string(entries)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&self.path, raw)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> std::io::Result<()> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> std::io::Result<()> {
        let mut entries = self.entries.lock();
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.persist(&entries)
    }

    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect()
    }
}

type Observer = Box<dyn Fn(&StorageChange) + Send + Sync>;

struct StorageInner {
    backend: Arc<dyn KeyValueStore>,
    observers: RwLock<Vec<(u64, Observer)>>,
    next_observer_id: AtomicU64,
    /// Serializes mutation + notification so observers see changes in
    /// mutation order. Reentrant: an observer may itself mutate
    /// storage (cache invalidation on a session change).
    write_lock: ReentrantMutex<()>,
}

/// Shared storage hub: a backend plus a change broadcast.
#[derive(Clone)]
pub struct Storage {
    inner: Arc<StorageInner>,
}

impl Storage {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner: Arc::new(StorageInner {
                backend,
                observers: RwLock::new(Vec::new()),
                next_observer_id: AtomicU64::new(0),
                write_lock: ReentrantMutex::new(()),
            }),
        }
    }

    /// In-memory storage, the default for tests and ephemeral sessions.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.backend.get(key)
    }

    pub fn set(&self, key: &str, value: &str) -> std::io::Result<()> {
        let _guard = self.inner.write_lock.lock();
        self.inner.backend.set(key, value)?;
        self.notify(&StorageChange {
            key: key.to_string(),
            value: Some(value.to_string()),
        });
        Ok(())
    }

    pub fn remove(&self, key: &str) -> std::io::Result<()> {
        let _guard = self.inner.write_lock.lock();
        self.inner.backend.remove(key)?;
        self.notify(&StorageChange {
            key: key.to_string(),
            value: None,
        });
        Ok(())
    }

    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.inner.backend.keys_with_prefix(prefix)
    }

    /// Register an observer for storage mutations. Dropping the guard
    /// unsubscribes.
    pub fn subscribe(
        &self,
        observer: impl Fn(&StorageChange) + Send + Sync + 'static,
    ) -> ObserverGuard {
        let id = self.inner.next_observer_id.fetch_add(1, Ordering::Relaxed);
        self.inner.observers.write().push((id, Box::new(observer)));
        ObserverGuard {
            inner: Arc::downgrade(&self.inner),
            id,
        }
    }

    fn notify(&self, change: &StorageChange) {
        for (_, observer) in self.inner.observers.read().iter() {
            observer(change);
        }
    }
}

/// Unsubscribes its observer when dropped.
pub struct ObserverGuard {
    inner: Weak<StorageInner>,
    id: u64,
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.observers.write().retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        store.set("authToken", "T").unwrap();
        assert_eq!(store.get("authToken").as_deref(), Some("T"));
        store.remove("authToken").unwrap();
        assert_eq!(store.get("authToken"), None);
    }

    #[test]
    fn prefix_scan() {
        let store = MemoryStore::new();
        store.set("billing_invoices", "[]").unwrap();
        store.set("billing_cacheTimestamp", "0").unwrap();
        store.set("authUser", "{}").unwrap();
        let mut keys = store.keys_with_prefix("billing_");
        keys.sort();
        assert_eq!(keys, vec!["billing_cacheTimestamp", "billing_invoices"]);
    }

    #[test]
    fn observers_see_mutations_in_order() {
        let storage = Storage::in_memory();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _guard = storage.subscribe(move |change| {
            sink.lock().push((change.key.clone(), change.value.clone()));
        });

        storage.set("authToken", "T1").unwrap();
        storage.set("authToken", "T2").unwrap();
        storage.remove("authToken").unwrap();

        let seen = seen.lock();
        assert_eq!(
            *seen,
            vec![
                ("authToken".to_string(), Some("T1".to_string())),
                ("authToken".to_string(), Some("T2".to_string())),
                ("authToken".to_string(), None),
            ]
        );
    }

    #[test]
    fn dropped_guard_stops_notifications() {
        let storage = Storage::in_memory();
        let seen = Arc::new(Mutex::new(0u32));
        let sink = seen.clone();
        let guard = storage.subscribe(move |_| *sink.lock() += 1);

        storage.set("darkMode", "true").unwrap();
        drop(guard);
        storage.set("darkMode", "false").unwrap();

        assert_eq!(*seen.lock(), 1);
    }

    #[test]
    fn json_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("console-store.json");

        {
            let store = JsonFileStore::open(&path);
            store.set("authUser", r#"{"id":"U1"}"#).unwrap();
            store.set("darkMode", "true").unwrap();
        }

        let reopened = JsonFileStore::open(&path);
        assert_eq!(reopened.get("authUser").as_deref(), Some(r#"{"id":"U1"}"#));
        assert_eq!(reopened.get("darkMode").as_deref(), Some("true"));
    }
}
