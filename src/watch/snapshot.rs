//! Published state guarded by a reader/writer lock.

use parking_lot::RwLock;

/// Holds the result of the most recent successful refresh.
///
/// Writers build the next value without holding the lock and only take the
/// write side for the swap; readers never observe a half-built value.
#[derive(Debug, Default)]
pub struct Snapshot<T> {
    value: RwLock<T>,
}

impl<T> Snapshot<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// Replace the published value, returning the previous one.
    pub fn publish(&self, next: T) -> T {
        std::mem::replace(&mut *self.value.write(), next)
    }

    /// Run `f` against the published value under the read lock.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.read())
    }
}

impl<T: Clone> Snapshot<T> {
    /// An independent copy of the published value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }
}
