//! Authoritative registry state and the epoch sweep.
//!
//! The state owns two coupled tables keyed by root-domain key: the registry of
//! `RegistryRecord`s and the per-root resolution maps. Both tables always hold
//! exactly the same set of root keys; the only way to add or drop a root goes
//! through `create_root`/`destroy_root`, so the tables cannot drift apart.
//!
//! The host guarantees exclusive access: one call or one sweep at a time,
//! never concurrently. Nothing here locks and nothing suspends.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collections::FixedMap;
use crate::types::{limits, RegistryRecord, ResolveData, TldLabel};

/// Top-level domains accepted at registration, fixed at initialization.
pub const SUPPORTED_TLDS: [TldLabel; 2] =
    [TldLabel::literal(b"qubic"), TldLabel::literal(b"qns")];

/// Persistent state of the name service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QnsState {
    tlds: Vec<TldLabel>,
    registry: FixedMap<u64, RegistryRecord>,
    resolve: FixedMap<u64, FixedMap<u64, ResolveData>>,
    subdomain_capacity: usize,
}

impl QnsState {
    /// State sized for production use.
    pub fn new() -> Self {
        Self::with_capacity(limits::MAX_NUMBER_OF_DOMAINS, limits::MAX_NUMBER_OF_SUBDOMAINS)
    }

    /// State with explicit table sizes. `domains` bounds the registry and the
    /// outer resolution table, `subdomains` bounds each per-root map.
    pub fn with_capacity(domains: usize, subdomains: usize) -> Self {
        Self {
            tlds: SUPPORTED_TLDS.to_vec(),
            registry: FixedMap::with_capacity(domains),
            resolve: FixedMap::with_capacity(domains),
            subdomain_capacity: subdomains,
        }
    }

    pub fn is_tld_supported(&self, tld: &TldLabel) -> bool {
        self.tlds.iter().any(|supported| supported == tld)
    }

    /// Number of currently registered root domains.
    pub fn registered_count(&self) -> usize {
        self.registry.len()
    }

    pub fn record(&self, root_key: u64) -> Option<&RegistryRecord> {
        self.registry.get(&root_key)
    }

    pub(crate) fn record_mut(&mut self, root_key: u64) -> Option<&mut RegistryRecord> {
        self.registry.get_mut(&root_key)
    }

    pub fn resolve_entry(&self, root_key: u64, full_key: u64) -> Option<&ResolveData> {
        self.resolve.get(&root_key)?.get(&full_key)
    }

    pub(crate) fn resolve_map_mut(
        &mut self,
        root_key: u64,
    ) -> Option<&mut FixedMap<u64, ResolveData>> {
        self.resolve.get_mut(&root_key)
    }

    /// Insert a fresh root into both tables. Returns `false`, leaving the
    /// state untouched, when the registry is full.
    pub(crate) fn create_root(&mut self, root_key: u64, record: RegistryRecord) -> bool {
        if !self.registry.insert(root_key, record) {
            return false;
        }
        if !self
            .resolve
            .insert(root_key, FixedMap::with_capacity(self.subdomain_capacity))
        {
            // Both tables share a capacity, so a root admitted by one fits in
            // the other; back out the half-done insert regardless.
            self.registry.remove(&root_key);
            return false;
        }
        true
    }

    /// Drop a root from both tables, discarding its resolution map.
    pub(crate) fn destroy_root(&mut self, root_key: u64) {
        self.registry.remove(&root_key);
        self.resolve.remove(&root_key);
    }

    /// Period-boundary sweep: evict every registration whose purchased window
    /// has elapsed, together with its resolution data.
    ///
    /// Walks every registry slot once. A record expires when
    /// `register_epoch + registration_years * EPOCHS_IN_YEAR` is strictly
    /// below `current_epoch`; the boundary epoch itself still resolves.
    /// Running the sweep twice in the same epoch is a no-op the second time.
    pub fn begin_epoch(&mut self, current_epoch: u16) {
        let epoch = current_epoch as u32;
        let mut evicted = 0usize;
        for index in 0..self.registry.capacity() {
            let expired = match self.registry.slot(index) {
                Some((key, record)) if record.expiry_epoch() < epoch => Some(*key),
                _ => None,
            };
            if let Some(root_key) = expired {
                self.destroy_root(root_key);
                evicted += 1;
                debug!(
                    root_key = %hex::encode(root_key.to_be_bytes()),
                    epoch = current_epoch,
                    "evicted expired registration"
                );
            }
        }
        if evicted > 0 {
            debug!(evicted, epoch = current_epoch, "epoch sweep complete");
        }
        self.registry.cleanup_if_needed();
        self.resolve.cleanup_if_needed();
    }
}

impl Default for QnsState {
    fn default() -> Self {
        Self::new()
    }
}
