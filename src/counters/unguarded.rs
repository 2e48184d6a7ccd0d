use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread;

use crate::counters::{CounterMode, CounterStore};

/// Counters whose increments are a plain load followed by a plain store.
///
/// The map of slots is still guarded so that creating a slot for a new
/// path cannot corrupt it. The count inside a slot is not: two callers that
/// load the same value both store `value + 1`, and one increment is lost.
/// Loads and stores are atomic, so the hazard is a wrong total and never
/// undefined behavior.
#[derive(Debug, Default)]
pub struct UnguardedCounters {
    slots: RwLock<HashMap<String, Arc<AtomicU64>>>,
}

impl UnguardedCounters {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, path: &str) -> Arc<AtomicU64> {
        if let Some(slot) = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
        {
            return Arc::clone(slot);
        }

        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(path.to_string()).or_default())
    }
}

impl CounterStore for UnguardedCounters {
    fn increment(&self, path: &str) {
        let slot = self.slot(path);
        let seen = slot.load(Ordering::Relaxed);
        // Widen the gap between read and write so overlapping increments
        // actually interleave.
        thread::yield_now();
        slot.store(seen + 1, Ordering::Relaxed);
    }

    fn get(&self, path: &str) -> u64 {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .map(|slot| slot.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn snapshot(&self) -> HashMap<String, u64> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(path, slot)| (path.clone(), slot.load(Ordering::Relaxed)))
            .collect()
    }

    fn mode(&self) -> CounterMode {
        CounterMode::Race
    }
}
