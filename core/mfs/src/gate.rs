//! The concurrency gate of an MFS instance.
//!
//! Reads hold the gate shared. A mutation holds it exclusively from the moment it re-reads the
//! trail of its target until the new root has been published, so concurrent mutations can never
//! publish a root computed from a stale trail.
use std::sync::Arc;

use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

#[derive(Clone, Debug, Default)]
pub struct ConcurrencyGate {
    lock: Arc<RwLock<()>>,
}

impl ConcurrencyGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn read(&self) -> OwnedRwLockReadGuard<()> {
        let guard = self.lock.clone().read_owned().await;
        tracing::trace!("acquired shared mfs lock");
        guard
    }

    pub async fn write(&self) -> OwnedRwLockWriteGuard<()> {
        let guard = self.lock.clone().write_owned().await;
        tracing::trace!("acquired exclusive mfs lock");
        guard
    }
}
