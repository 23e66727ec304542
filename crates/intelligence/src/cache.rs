//! Short-lived forecast memoization.
//!
//! Entries older than the TTL are never returned; they are dropped on read
//! and swept when the cache is full.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use microfin_core::{BranchId, ProductId};

use crate::forecast::{ForecastMethod, ForecastResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ForecastKey {
    pub product_id: ProductId,
    pub branch_id: Option<BranchId>,
    pub method: ForecastMethod,
    pub horizon_days: u32,
    pub lookback_days: u32,
}

#[derive(Debug)]
pub struct ForecastCache {
    ttl: Duration,
    capacity: usize,
    inner: Mutex<HashMap<ForecastKey, (Instant, ForecastResult)>>,
}

impl ForecastCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity,
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// A cache that stores nothing.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, 0)
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero() && self.capacity > 0
    }

    pub fn get(&self, key: &ForecastKey) -> Option<ForecastResult> {
        if !self.is_enabled() {
            return None;
        }
        let mut map = self.inner.lock().ok()?;
        let stale = match map.get(key) {
            Some((stored_at, result)) if stored_at.elapsed() < self.ttl => {
                return Some(result.clone());
            }
            Some(_) => true,
            None => false,
        };
        if stale {
            map.remove(key);
        }
        None
    }

    pub fn insert(&self, key: ForecastKey, result: ForecastResult) {
        if !self.is_enabled() {
            return;
        }
        let Ok(mut map) = self.inner.lock() else {
            return;
        };
        if map.len() >= self.capacity && !map.contains_key(&key) {
            let ttl = self.ttl;
            map.retain(|_, (stored_at, _)| stored_at.elapsed() < ttl);
            if map.len() >= self.capacity {
                if let Some(oldest) = map.iter().min_by_key(|(_, (at, _))| *at).map(|(k, _)| *k) {
                    map.remove(&oldest);
                }
            }
        }
        map.insert(key, (Instant::now(), result));
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
