//! MAC learning table shared between the switch loop and observers.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::frame::MacAddress;
use crate::udp::Endpoint;

/// Thread-safe MAC → endpoint learning table.
///
/// Cloning returns a handle to the same table. Lookups and snapshots take
/// the shared lock and proceed in parallel; learning and removal take the
/// exclusive lock. Entries never expire: the most recent sender wins until
/// it is overwritten or removed.
#[derive(Clone, Default)]
pub struct MacTable {
    inner: Arc<RwLock<HashMap<MacAddress, Endpoint>>>,
}

impl MacTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn or refresh a binding. Returns true when the MAC was previously
    /// unknown.
    pub fn insert(&self, mac: MacAddress, endpoint: Endpoint) -> bool {
        let mut table = self.inner.write().unwrap();
        table.insert(mac, endpoint).is_none()
    }

    pub fn lookup(&self, mac: &MacAddress) -> Option<Endpoint> {
        self.inner.read().unwrap().get(mac).cloned()
    }

    /// Remove a binding. Returns whether one existed.
    pub fn remove(&self, mac: &MacAddress) -> bool {
        self.inner.write().unwrap().remove(mac).is_some()
    }

    pub fn contains(&self, mac: &MacAddress) -> bool {
        self.inner.read().unwrap().contains_key(mac)
    }

    /// Snapshot of every known endpoint.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.inner.read().unwrap().values().cloned().collect()
    }

    /// Snapshot of every endpoint except the one keyed by `exclude`, for
    /// broadcast fan-out that must not echo to the sender.
    ///
    /// Filters by MAC key: another MAC bound to the same endpoint is still
    /// returned.
    pub fn endpoints_except(&self, exclude: &MacAddress) -> Vec<Endpoint> {
        self.inner
            .read()
            .unwrap()
            .iter()
            .filter(|(mac, _)| *mac != exclude)
            .map(|(_, endpoint)| endpoint.clone())
            .collect()
    }

    /// Full point-in-time copy of the table.
    pub fn entries(&self) -> HashMap<MacAddress, Endpoint> {
        self.inner.read().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().is_empty()
    }

    pub fn clear(&self) {
        self.inner.write().unwrap().clear();
    }
}
