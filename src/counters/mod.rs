//! Per-resource hit counters.
//!
//! Two stores share one interface. [`LockedCounters`] serializes every
//! increment behind a mutex and never loses an update. [`UnguardedCounters`]
//! reads and writes each count as two separate steps with nothing held in
//! between, so concurrent increments of the same path can overwrite each
//! other. The second store exists to make that lost-update hazard
//! observable; pick it with `counters.mode: race`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

pub mod locked;
pub mod unguarded;

pub use locked::LockedCounters;
pub use unguarded::UnguardedCounters;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterMode {
    #[default]
    Locked,
    Race,
}

impl fmt::Display for CounterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterMode::Locked => f.write_str("locked"),
            CounterMode::Race => f.write_str("race"),
        }
    }
}

pub trait CounterStore: Send + Sync + fmt::Debug {
    /// Records one successful serve of `path`.
    fn increment(&self, path: &str);

    /// Current count for `path`, zero if never served.
    fn get(&self, path: &str) -> u64;

    /// Best-effort copy of every counter. Not linearizable with
    /// concurrent increments.
    fn snapshot(&self) -> HashMap<String, u64>;

    fn mode(&self) -> CounterMode;
}

pub fn build(mode: CounterMode) -> Arc<dyn CounterStore> {
    match mode {
        CounterMode::Locked => Arc::new(LockedCounters::new()),
        CounterMode::Race => Arc::new(UnguardedCounters::new()),
    }
}
