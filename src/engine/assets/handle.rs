// Shared, refreshable asset handles

use parking_lot::{RwLock, RwLockReadGuard};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Unique identifier for an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetId(pub(crate) u64);

impl AssetId {
    /// Create a new asset ID from a resolved path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        path.as_ref().hash(&mut hasher);
        Self(hasher.finish())
    }

    /// Create an asset ID from a raw u64
    pub fn from_u64(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw u64 value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

struct Slot<T> {
    id: AssetId,
    generation: AtomicU64,
    value: RwLock<T>,
}

/// Reference-counted handle to a decoded resource
///
/// Clones share the same slot. A refresh swaps the content in place, so every
/// holder observes the new data without looking the asset up again. The slot
/// is dropped when the last holder (cache or consumer) lets go of it.
pub struct Handle<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Handle<T> {
    pub(crate) fn new(id: AssetId, value: T) -> Self {
        Self {
            slot: Arc::new(Slot {
                id,
                generation: AtomicU64::new(0),
                value: RwLock::new(value),
            }),
        }
    }

    /// Get the underlying asset ID
    pub fn id(&self) -> AssetId {
        self.slot.id
    }

    /// Borrow the current content for reading
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.slot.value.read()
    }

    /// Number of in-place refreshes applied since the resource was loaded
    pub fn generation(&self) -> u64 {
        self.slot.generation.load(Ordering::Acquire)
    }

    /// Whether both handles point at the same resource slot
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }

    /// Number of live holders, the cache included
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.slot)
    }

    /// Replace the content while keeping the handle identity
    pub(crate) fn replace(&self, value: T) {
        *self.slot.value.write() = value;
        self.slot.generation.fetch_add(1, Ordering::AcqRel);
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T> Eq for Handle<T> {}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.slot.id)
            .field("generation", &self.generation())
            .finish()
    }
}
