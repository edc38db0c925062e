use crate::error::{RegistryError, RegistryResult};
use log::debug;
use std::collections::HashSet;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Named, process-local mutual exclusion with a bounded wait.
#[derive(Debug, Default)]
pub struct LockService {
    held: Mutex<HashSet<String>>,
    released: Condvar,
}

/// Held lock; released on drop.
#[derive(Debug)]
pub struct LockGuard<'a> {
    service: &'a LockService,
    key: String,
}

impl LockService {
    pub fn new() -> Self {
        Self::default()
    }

    fn held(&self) -> MutexGuard<'_, HashSet<String>> {
        self.held.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Waits up to `timeout` for `key`, then fails with [`RegistryError::LockTimeout`].
    pub fn acquire(&self, key: &str, timeout: Duration) -> RegistryResult<LockGuard<'_>> {
        let deadline = Instant::now() + timeout;
        let mut held = self.held();

        while held.contains(key) {
            let now = Instant::now();
            if now >= deadline {
                debug!("Timed out waiting for lock {key}");
                return Err(RegistryError::LockTimeout(key.to_string()));
            }
            held = self
                .released
                .wait_timeout(held, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }

        held.insert(key.to_string());
        Ok(LockGuard {
            service: self,
            key: key.to_string(),
        })
    }

    pub fn is_locked(&self, key: &str) -> bool {
        self.held().contains(key)
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.service.held().remove(&self.key);
        self.service.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_second_acquire_times_out() {
        let locks = LockService::new();
        let _guard = locks.acquire("pkg:refresh-manifests", Duration::from_millis(10)).unwrap();

        let err = locks
            .acquire("pkg:refresh-manifests", Duration::from_millis(20))
            .unwrap_err();
        assert!(err.is_retryable());

        // other keys are independent
        assert!(locks.acquire("other", Duration::from_millis(10)).is_ok());
    }

    #[test]
    fn test_release_on_drop_wakes_waiter() {
        let locks = Arc::new(LockService::new());
        let guard = locks.acquire("k", Duration::from_millis(10)).unwrap();

        let waiter = {
            let locks = Arc::clone(&locks);
            thread::spawn(move || locks.acquire("k", Duration::from_secs(5)).map(|_| ()).is_ok())
        };
        thread::sleep(Duration::from_millis(50));
        drop(guard);

        assert!(waiter.join().unwrap());
        assert!(!locks.is_locked("k"));
    }
}
