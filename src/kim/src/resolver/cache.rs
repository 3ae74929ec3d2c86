//! TTL cache for membership answers

use crate::qualifier::QualifierSet;
use crate::types::{PrincipalId, RoleId};
use chrono::NaiveDate;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Cache key for a membership question
///
/// The graph and validator registry generations are part of the key, so
/// any mutation of either makes older entries unreachable. Unreachable
/// entries are evicted once the cache fills up.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub(crate) struct CacheKey {
    principal_id: PrincipalId,
    /// Sorted, deduplicated for consistent hashing
    role_ids: Vec<RoleId>,
    qualifier: Option<QualifierSet>,
    as_of: NaiveDate,
    generation: Generation,
}

/// Graph generation and validator registry generation
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub(crate) struct Generation {
    pub(crate) graph: u64,
    pub(crate) validators: u64,
}

impl CacheKey {
    pub(crate) fn new(
        principal_id: &str,
        role_ids: &[RoleId],
        qualifier: Option<&QualifierSet>,
        as_of: NaiveDate,
        generation: Generation,
    ) -> Self {
        let mut role_ids = role_ids.to_vec();
        role_ids.sort();
        role_ids.dedup();

        Self {
            principal_id: principal_id.to_string(),
            role_ids,
            qualifier: qualifier.cloned(),
            as_of,
            generation,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedAnswer {
    holds: bool,
    cached_at: Instant,
}

impl CachedAnswer {
    fn new(holds: bool) -> Self {
        Self {
            holds,
            cached_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() > ttl
    }
}

pub(crate) struct ResolutionCache {
    entries: DashMap<CacheKey, CachedAnswer>,
    ttl: Duration,
    max_size: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResolutionCache {
    pub(crate) fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_size,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub(crate) fn get(&self, key: &CacheKey) -> Option<bool> {
        if let Some(cached) = self.entries.get(key) {
            if !cached.is_expired(self.ttl) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(cached.holds);
            }
            drop(cached);
            self.entries.remove(key);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store an answer
    ///
    /// A full cache first drops expired entries and entries of older
    /// generations; if it is still full the answer is not stored.
    pub(crate) fn insert(&self, key: CacheKey, holds: bool) {
        if self.entries.len() >= self.max_size {
            let before = self.entries.len();
            let ttl = self.ttl;
            self.entries.retain(|cached_key, cached| {
                cached_key.generation == key.generation && !cached.is_expired(ttl)
            });
            debug!(
                evicted = before - self.entries.len(),
                "Evicted stale membership answers"
            );
        }

        if self.entries.len() < self.max_size {
            self.entries.insert(key, CachedAnswer::new(holds));
        }
    }

    pub(crate) fn clear(&self) {
        self.entries.clear();
    }

    pub(crate) fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            max_size: self.max_size,
            ttl_seconds: self.ttl.as_secs(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Current cache size
    pub size: usize,
    /// Maximum cache size
    pub max_size: usize,
    /// Cache TTL in seconds
    pub ttl_seconds: u64,
    pub hits: u64,
    pub misses: u64,
}
