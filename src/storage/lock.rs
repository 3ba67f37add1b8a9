//! Lock acquisition with poison recovery.
//!
//! A panic inside a critical section poisons the lock. Every backend keeps its
//! tables consistent before any code that could panic runs, so the guarded
//! value is still valid and we recover it instead of failing every later call.

use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

fn record_poison_recovery(kind: &'static str) {
    tracing::warn!(lock = kind, "storage lock was poisoned, recovering");
    metrics::counter!("storage_lock_poison_recovery_total", "lock" => kind).increment(1);
}

/// Acquires a mutex, recovering from poison.
///
/// # Examples
///
/// ```ignore
/// use std::sync::Mutex;
/// use focusgrid::storage::lock::acquire_lock;
///
/// let mutex = Mutex::new(connection);
/// let guard = acquire_lock(&mutex);
/// ```
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        record_poison_recovery("mutex");
        poisoned.into_inner()
    })
}

/// Acquires a shared read guard, recovering from poison.
pub fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| {
        record_poison_recovery("rwlock_read");
        poisoned.into_inner()
    })
}

/// Acquires an exclusive write guard, recovering from poison.
pub fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| {
        record_poison_recovery("rwlock_write");
        poisoned.into_inner()
    })
}
