//! Shared storage cells and value identity.
//!
//! Every heap-backed value carries an `ObjId`, a monotonically increasing
//! identifier assigned at allocation. The identity tables and the dependency
//! graph are keyed by these ids instead of raw pointers, which keeps them
//! stable across clones of the same underlying allocation.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Unique identifier for a heap-backed value.
///
/// Ids are never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjId(u64);

impl ObjId {
    /// Generate a new unique id.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw id value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ObjId {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutable storage shared between a raw value, its clones, and its reactive
/// proxy.
///
/// Cloning a `Value` that wraps a `Shared` clones the handle, not the data:
/// mutations through any handle (including a proxy) are visible through all
/// of them.
#[derive(Debug)]
pub struct Shared<T> {
    id: ObjId,
    data: RwLock<T>,
}

impl<T> Shared<T> {
    pub fn new(data: T) -> Self {
        Self {
            id: ObjId::new(),
            data: RwLock::new(data),
        }
    }

    pub fn id(&self) -> ObjId {
        self.id
    }

    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.data.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.data.write()
    }
}
