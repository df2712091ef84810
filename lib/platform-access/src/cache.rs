//! In-memory approval cache.
//!
//! Maps user IDs to their approval status and role so the persistence layer
//! is consulted at most once per TTL window per user. Expired entries are
//! evicted lazily: on read for the requested key, and by a full sweep when a
//! write finds the cache at its soft cap. No background task is involved.

use crate::role::Role;
use chrono::{DateTime, Duration, Utc};
use lectern_core::UserId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Source of the current time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A cached approval lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalRecord {
    /// Whether the user has been approved by an administrator.
    pub is_approved: bool,
    /// The user's role.
    pub role: Role,
    /// When the record was cached.
    pub cached_at: DateTime<Utc>,
}

/// Thread-safe approval cache with TTL and size-triggered sweeping.
///
/// A single mutex guards the whole map. Callers must never hold a record
/// across I/O; every method takes and releases the lock internally.
pub struct ApprovalCache {
    entries: Mutex<HashMap<UserId, ApprovalRecord>>,
    ttl: Duration,
    soft_cap: usize,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for ApprovalCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApprovalCache")
            .field("len", &self.len())
            .field("ttl", &self.ttl)
            .field("soft_cap", &self.soft_cap)
            .finish_non_exhaustive()
    }
}

impl ApprovalCache {
    /// Creates an empty cache using wall-clock time.
    #[must_use]
    pub fn new(ttl: Duration, soft_cap: usize) -> Self {
        Self::with_clock(ttl, soft_cap, Arc::new(SystemClock))
    }

    /// Creates an empty cache reading time from `clock`.
    #[must_use]
    pub fn with_clock(ttl: Duration, soft_cap: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            soft_cap,
            clock,
        }
    }

    /// Returns the record for `user_id` if present and younger than the TTL.
    ///
    /// An expired record is removed before returning `None`.
    pub fn get(&self, user_id: &UserId) -> Option<ApprovalRecord> {
        let now = self.clock.now();
        let mut entries = self.lock();
        let record = *entries.get(user_id)?;
        if self.is_expired(&record, now) {
            entries.remove(user_id);
            debug!(%user_id, "evicted expired approval record");
            return None;
        }
        Some(record)
    }

    /// Caches the approval status and role for `user_id`.
    ///
    /// If adding a new key would take the cache past its soft cap, every
    /// expired record is swept first. The insert happens regardless, so the
    /// cache may briefly exceed the cap when nothing has expired yet.
    pub fn put(&self, user_id: UserId, is_approved: bool, role: Role) {
        let now = self.clock.now();
        let mut entries = self.lock();
        if entries.len() >= self.soft_cap && !entries.contains_key(&user_id) {
            let before = entries.len();
            entries.retain(|_, record| !self.is_expired(record, now));
            debug!(
                swept = before - entries.len(),
                remaining = entries.len(),
                "swept approval cache"
            );
        }
        entries.insert(
            user_id,
            ApprovalRecord {
                is_approved,
                role,
                cached_at: now,
            },
        );
    }

    /// Returns the number of physically stored records, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns the configured TTL.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_expired(&self, record: &ApprovalRecord, now: DateTime<Utc>) -> bool {
        now - record.cached_at >= self.ttl
    }

    // The map is never left half-updated, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<UserId, ApprovalRecord>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
