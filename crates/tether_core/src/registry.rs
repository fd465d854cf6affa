//! Connection registry.
//!
//! The registry holds at most one live [`ConnectionHandle`] per backend name.
//! It is created empty, populated by each adapter's `connect`, read by any
//! number of callers, and cleared by `disconnect`.
//!
//! Writes go through a [`SlotGuard`], which also serializes `connect` and
//! `disconnect` for the same name. A second `connect` waiting on the guard
//! finds the handle the first one stored instead of opening a duplicate
//! connection.

use crate::error::{ConnectorError, ConnectorResult};
use crate::handle::ConnectionHandle;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-backend store of live connection handles.
///
/// Share it between adapters as an `Arc<ConnectionRegistry>`; tests create a
/// fresh registry per case.
#[derive(Default)]
pub struct ConnectionRegistry {
    slots: RwLock<HashMap<String, ConnectionHandle>>,
    gates: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the live handle for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::NotInitialized`] if the backend's `connect`
    /// has not resolved, or the backend was disconnected.
    pub fn get(&self, name: &str) -> ConnectorResult<ConnectionHandle> {
        self.try_get(name)
            .ok_or_else(|| ConnectorError::not_initialized(name))
    }

    /// Returns the live handle for `name`, if any.
    pub fn try_get(&self, name: &str) -> Option<ConnectionHandle> {
        self.slots.read().get(name).cloned()
    }

    /// Returns true if a live handle exists for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.slots.read().contains_key(name)
    }

    /// Returns the names of all live handles, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.slots.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of live handles.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// Returns true if no handle is registered.
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// Acquires exclusive write access to the slot for `name`.
    ///
    /// Only the adapter owning `name` should call this. The guard is held
    /// across the whole connect or disconnect sequence.
    pub async fn slot(&self, name: &str) -> SlotGuard<'_> {
        let gate = {
            let mut gates = self.gates.lock();
            Arc::clone(gates.entry(name.to_string()).or_default())
        };
        let lock = gate.lock_owned().await;

        SlotGuard {
            registry: self,
            name: name.to_string(),
            _lock: lock,
        }
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("names", &self.names())
            .finish()
    }
}

/// Exclusive write access to one registry slot.
pub struct SlotGuard<'a> {
    registry: &'a ConnectionRegistry,
    name: String,
    _lock: OwnedMutexGuard<()>,
}

impl SlotGuard<'_> {
    /// Returns the backend name this slot belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the handle currently stored in the slot.
    pub fn get(&self) -> Option<ConnectionHandle> {
        self.registry.try_get(&self.name)
    }

    /// Stores a handle, returning the one it replaced.
    pub fn set(&self, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        self.registry
            .slots
            .write()
            .insert(self.name.clone(), handle)
    }

    /// Clears the slot, returning the handle it held.
    pub fn take(&self) -> Option<ConnectionHandle> {
        self.registry.slots.write().remove(&self.name)
    }
}
