//! In-memory object store.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use super::store::{ObjectMetadata, ObjectStore, PutObject};
use crate::utils::errors::{FetchError, Result, SyncError};

/// Stored object body and headers
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub metadata: ObjectMetadata,
}

#[derive(Debug, Default)]
struct Inner {
    objects: BTreeMap<String, StoredObject>,
    put_log: Vec<String>,
    failing_keys: BTreeSet<String>,
    unreachable: bool,
}

/// [`ObjectStore`] backed by a map, with failure injection.
///
/// Records every successful `put` key in order so a run's uploads can be
/// inspected afterwards.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `put` to `key` fail.
    pub fn fail_puts_to(&self, key: &str) {
        self.lock().failing_keys.insert(key.to_string());
    }

    /// Make `check_access` fail.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    /// Store an object directly, bypassing the put log.
    pub fn seed(&self, key: &str, body: &[u8]) {
        self.lock().objects.insert(
            key.to_string(),
            StoredObject {
                body: body.to_vec(),
                metadata: ObjectMetadata {
                    content_type: "application/octet-stream".to_string(),
                    cache_control: String::new(),
                    access_policy: String::new(),
                    content_encoding: None,
                },
            },
        );
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.lock().objects.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().objects.keys().cloned().collect()
    }

    /// Keys of successful puts, in upload order.
    pub fn put_log(&self) -> Vec<String> {
        self.lock().put_log.clone()
    }

    pub fn clear_put_log(&self) {
        self.lock().put_log.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // a panicking test thread must not hide the store from the others
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn check_access(&self) -> Result<()> {
        if self.lock().unreachable {
            return Err(SyncError::Storage("memory store marked unreachable".into()));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> std::result::Result<Vec<u8>, FetchError> {
        self.lock()
            .objects
            .get(key)
            .map(|o| o.body.clone())
            .ok_or(FetchError::NotFound)
    }

    async fn put(&self, object: PutObject) -> Result<()> {
        let mut inner = self.lock();
        if inner.failing_keys.contains(&object.key) {
            return Err(SyncError::Storage(format!("injected failure for {}", object.key)));
        }
        inner.put_log.push(object.key.clone());
        inner.objects.insert(
            object.key,
            StoredObject {
                body: object.body,
                metadata: object.metadata,
            },
        );
        Ok(())
    }

    fn describe(&self) -> String {
        "memory://".to_string()
    }
}
