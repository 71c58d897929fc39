//! Per-series memo cache of computed indicator columns.
//!
//! Entries are keyed by the engine's column key (`"EMA@40"`, `"SMA(20)"`,
//! `"IndQuantile(ClosePrice@40,0.75,40)"`). Each key is computed at most once;
//! concurrent requests for the same key block on the same `OnceLock` and never
//! observe a partially-written column. Failures are memoized too.

use crate::domain::error::IndicatorError;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

pub type Column = Arc<[f64]>;

type Slot = Arc<OnceLock<Result<Column, IndicatorError>>>;

#[derive(Default)]
pub struct IndicatorTable {
    cache: Mutex<HashMap<String, Slot>>,
}

impl IndicatorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the column for `key`, running `compute` only if no other caller has.
    pub fn get_or_compute<F>(&self, key: &str, compute: F) -> Result<Column, IndicatorError>
    where
        F: FnOnce() -> Result<Vec<f64>, IndicatorError>,
    {
        let slot = {
            let mut cache = self.lock();
            Arc::clone(cache.entry(key.to_string()).or_default())
        };
        // map lock is released here; only this key's OnceLock is held while computing
        slot.get_or_init(|| compute().map(Column::from)).clone()
    }

    /// Already-computed column for `key`, if any.
    pub fn get(&self, key: &str) -> Option<Column> {
        let cache = self.lock();
        cache
            .get(key)
            .and_then(|slot| slot.get())
            .and_then(|res| res.as_ref().ok())
            .cloned()
    }

    /// Keys with a finished computation (successful or not), sorted.
    pub fn keys(&self) -> Vec<String> {
        self.snapshot().into_keys().collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> BTreeMap<String, Result<Column, IndicatorError>> {
        let cache = self.lock();
        cache
            .iter()
            .filter_map(|(k, slot)| slot.get().map(|res| (k.clone(), res.clone())))
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        // a panic inside a compute closure never holds this lock
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clone for IndicatorTable {
    fn clone(&self) -> Self {
        let cache = self
            .snapshot()
            .into_iter()
            .map(|(k, res)| (k, Arc::new(OnceLock::from(res))))
            .collect();
        Self {
            cache: Mutex::new(cache),
        }
    }
}

/// Bitwise equality of finished entries, so NaN warm-up cells compare equal.
impl PartialEq for IndicatorTable {
    fn eq(&self, other: &Self) -> bool {
        let a = self.snapshot();
        let b = other.snapshot();
        a.len() == b.len()
            && a.iter().zip(b.iter()).all(|((ka, va), (kb, vb))| {
                ka == kb
                    && match (va, vb) {
                        (Ok(x), Ok(y)) => {
                            x.len() == y.len()
                                && x.iter().zip(y.iter()).all(|(p, q)| p.to_bits() == q.to_bits())
                        }
                        (Err(x), Err(y)) => x == y,
                        _ => false,
                    }
            })
    }
}

impl fmt::Debug for IndicatorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndicatorTable")
            .field("keys", &self.keys())
            .finish()
    }
}
