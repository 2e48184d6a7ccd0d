use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::counters::{CounterMode, CounterStore};

/// Counters behind a single mutex; every increment is one critical section.
#[derive(Debug, Default)]
pub struct LockedCounters {
    counts: Mutex<HashMap<String, u64>>,
}

impl LockedCounters {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, u64>> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CounterStore for LockedCounters {
    fn increment(&self, path: &str) {
        let mut counts = self.lock();
        match counts.get_mut(path) {
            Some(count) => *count += 1,
            None => {
                counts.insert(path.to_string(), 1);
            }
        }
    }

    fn get(&self, path: &str) -> u64 {
        self.lock().get(path).copied().unwrap_or(0)
    }

    fn snapshot(&self) -> HashMap<String, u64> {
        self.lock().clone()
    }

    fn mode(&self) -> CounterMode {
        CounterMode::Locked
    }
}
