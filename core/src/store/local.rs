// Local reactive store — JSON collections over a StorageBackend plus listeners
//
// Reads never fail: an absent, unreadable or malformed value yields the
// caller's fallback. Without a backend every read is the fallback and every
// write is dropped, which keeps the API usable in hosts with no durable medium.

use crate::store::backend::StorageBackend;
use crate::store::listeners::{ListenerRegistry, Subscription};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct LocalStore {
    name: &'static str,
    backend: Option<Arc<dyn StorageBackend>>,
    listeners: ListenerRegistry,
}

impl LocalStore {
    pub fn new(name: &'static str, backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            name,
            backend: Some(backend),
            listeners: ListenerRegistry::new(),
        }
    }

    /// Store with no durable medium: empty and non-persistent.
    pub fn detached(name: &'static str) -> Self {
        Self {
            name,
            backend: None,
            listeners: ListenerRegistry::new(),
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.backend.is_some()
    }

    pub fn read<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        let Some(backend) = &self.backend else {
            return fallback;
        };

        let raw = match backend.get(key) {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => return fallback,
            Err(e) => {
                warn!(store = self.name, key, error = %e, "Unable to read stored value");
                return fallback;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(store = self.name, key, error = %e, "Unable to parse stored value");
                fallback
            }
        }
    }

    /// Persist `value` at `key` and notify. Dropped silently when detached;
    /// a failed write is logged and does not notify.
    pub fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let Some(backend) = &self.backend else {
            return;
        };

        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(store = self.name, key, error = %e, "Unable to serialize value");
                return;
            }
        };

        if let Err(e) = backend.put(key, &encoded) {
            warn!(store = self.name, key, error = %e, "Unable to persist value");
            return;
        }
        debug!(store = self.name, key, bytes = encoded.len(), "Persisted collection");
        self.listeners.notify();
    }

    /// Persist several keys as one atomic write and notify once.
    ///
    /// Either every key is stored or none is; a rejected batch is logged and
    /// does not notify.
    pub fn write_all(&self, entries: &[(&str, serde_json::Value)]) {
        let Some(backend) = &self.backend else {
            return;
        };

        let encoded: Vec<(String, String)> = entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        if let Err(e) = backend.put_all(&encoded) {
            warn!(store = self.name, keys = encoded.len(), error = %e, "Unable to persist values");
            return;
        }
        debug!(store = self.name, keys = encoded.len(), "Persisted collections");
        self.listeners.notify();
    }

    /// Delete `key` and notify. Dropped silently when detached.
    pub fn remove(&self, key: &str) {
        let Some(backend) = &self.backend else {
            return;
        };

        if let Err(e) = backend.remove(key) {
            warn!(store = self.name, key, error = %e, "Unable to remove value");
            return;
        }
        self.listeners.notify();
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn notify(&self) {
        self.listeners.notify();
    }

    pub fn flush(&self) {
        if let Some(backend) = &self.backend {
            if let Err(e) = backend.flush() {
                warn!(store = self.name, error = %e, "Unable to flush backend");
            }
        }
    }
}
