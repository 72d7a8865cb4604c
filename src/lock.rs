//! Serialization of backend-global calls.
//!
//! Some backends keep process-wide state (font maps, surface bookkeeping) that
//! is not safe to touch from several rendering sessions at once. Those
//! backends hand out [`BackendLock::shared`]; every session built on them
//! takes the lock around surface, font and paint-source creation.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

#[derive(Clone, Debug, Default)]
pub struct BackendLock(Option<Arc<Mutex<()>>>);

pub struct BackendGuard<'a> {
    _guard: Option<MutexGuard<'a, ()>>,
}

impl BackendLock {
    /// No serialization.
    pub fn none() -> Self {
        BackendLock(None)
    }

    /// A lock private to the caller, for backends that share state only
    /// among their own sessions.
    pub fn new() -> Self {
        BackendLock(Some(Arc::new(Mutex::new(()))))
    }

    /// The process-wide lock.
    pub fn shared() -> Self {
        static GLOBAL: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
        BackendLock(Some(GLOBAL.get_or_init(|| Arc::new(Mutex::new(()))).clone()))
    }

    pub fn is_serializing(&self) -> bool {
        self.0.is_some()
    }

    /// Blocks until the lock is free. A poisoned lock is still handed out:
    /// it guards no data, only call ordering.
    pub fn acquire(&self) -> BackendGuard<'_> {
        BackendGuard {
            _guard: self
                .0
                .as_ref()
                .map(|m| m.lock().unwrap_or_else(PoisonError::into_inner)),
        }
    }

    pub fn same_as(&self, other: &BackendLock) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_lock_is_process_wide() {
        assert!(BackendLock::shared().same_as(&BackendLock::shared()));
        assert!(!BackendLock::new().same_as(&BackendLock::new()));
        assert!(!BackendLock::none().is_serializing());
    }

    #[test]
    fn none_lock_never_blocks() {
        let lock = BackendLock::none();
        let _a = lock.acquire();
        let _b = lock.acquire();
    }

    #[test]
    fn serializes_across_threads() {
        let lock = BackendLock::new();
        let counter = Arc::new(Mutex::new(Vec::new()));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let lock = lock.clone();
                let counter = counter.clone();
                std::thread::spawn(move || {
                    let _guard = lock.acquire();
                    counter.lock().unwrap().push(i);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(counter.lock().unwrap().len(), 4);
    }
}
