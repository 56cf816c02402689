//! Per-principal failed-login tracking with time-based lockout.
//!
//! Records live only in memory and are shared by every request handler in
//! the process. All reads and writes for all principals go through one
//! mutex, so check-then-increment sequences cannot interleave and no
//! concurrent failure is ever lost. Nothing inside the lock blocks on I/O.
//!
//! Expiry is lazy: a record whose last failure is at least one lockout
//! window old is dropped the next time its principal is looked at. Failures
//! also trigger a full sweep of stale records whenever the number of tracked
//! principals doubles past [`SWEEP_THRESHOLD`], so usernames that are never
//! seen again cannot grow the map without bound.

use crate::clock::Clock;
use crate::config::AuthConfig;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Tracked principals at which failures start sweeping stale records.
pub const SWEEP_THRESHOLD: usize = 1024;

/// Failure history of one principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LockoutRecord {
    pub failure_count: u32,
    pub last_failure_at: DateTime<Utc>,
}

/// Outcome of a lockout check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    Unlocked,
    /// Locked for at least `remaining_secs` more seconds.
    Locked { remaining_secs: u64 },
}

impl LockStatus {
    #[must_use]
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked { .. })
    }
}

/// Process-wide lockout state keyed by principal.
pub struct LockoutGuard {
    max_attempts: u32,
    lockout_duration: Duration,
    clock: Arc<dyn Clock>,
    records: Mutex<Records>,
}

struct Records {
    by_principal: HashMap<String, LockoutRecord>,
    /// Map size that triggers the next sweep.
    sweep_at: usize,
}

impl std::fmt::Debug for LockoutGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockoutGuard")
            .field("max_attempts", &self.max_attempts)
            .field("lockout_duration", &self.lockout_duration)
            .field("tracked", &self.tracked_principals())
            .finish()
    }
}

impl LockoutGuard {
    /// Creates a guard with the thresholds from `config`.
    #[must_use]
    pub fn new(config: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_attempts: config.max_attempts,
            lockout_duration: config.lockout_duration,
            clock,
            records: Mutex::new(Records {
                by_principal: HashMap::new(),
                sweep_at: SWEEP_THRESHOLD,
            }),
        }
    }

    /// Returns the failure count that engages the lockout.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the lockout window.
    #[must_use]
    pub fn lockout_duration(&self) -> Duration {
        self.lockout_duration
    }

    /// Reports whether `principal` is locked and for how much longer.
    ///
    /// A principal is locked once its failure count reaches the maximum and
    /// stays locked until a full window has passed since its last failure,
    /// at which point its record is dropped.
    pub fn is_locked(&self, principal: &str) -> LockStatus {
        let now = self.clock.now();
        let mut records = self.records.lock();
        self.status(&mut records.by_principal, principal, now)
    }

    /// Checks the lock and, if `principal` is locked and `count_attempt` is
    /// set, records this attempt as another failure, all under one lock.
    ///
    /// The returned status reflects the state before the attempt was
    /// counted.
    pub fn check_attempt(&self, principal: &str, count_attempt: bool) -> LockStatus {
        let now = self.clock.now();
        let mut records = self.records.lock();
        let status = self.status(&mut records.by_principal, principal, now);
        if status.is_locked() && count_attempt {
            Self::add_failure(&mut records.by_principal, principal, now);
        }
        status
    }

    /// Records the outcome of an authentication attempt.
    ///
    /// Success forgets the principal entirely. Failure increments its count
    /// and moves its last failure time to now.
    pub fn record_attempt(&self, principal: &str, success: bool) {
        if success {
            self.records.lock().by_principal.remove(principal);
        } else {
            self.record_failure(principal);
        }
    }

    /// Records a failure and returns the attempts left afterwards.
    pub fn record_failure(&self, principal: &str) -> u32 {
        let now = self.clock.now();
        let mut records = self.records.lock();
        self.sweep_if_due(&mut records, now);
        self.purge_if_stale(&mut records.by_principal, principal, now);
        let count = Self::add_failure(&mut records.by_principal, principal, now);
        self.max_attempts.saturating_sub(count)
    }

    /// Returns how many failures `principal` has left before locking.
    pub fn remaining_attempts(&self, principal: &str) -> u32 {
        let now = self.clock.now();
        let mut records = self.records.lock();
        self.purge_if_stale(&mut records.by_principal, principal, now);
        records
            .by_principal
            .get(principal)
            .map_or(self.max_attempts, |r| self.max_attempts.saturating_sub(r.failure_count))
    }

    /// Returns a snapshot of the record for `principal`, if any.
    pub fn record(&self, principal: &str) -> Option<LockoutRecord> {
        self.records.lock().by_principal.get(principal).copied()
    }

    /// Returns how many principals currently have a record.
    pub fn tracked_principals(&self) -> usize {
        self.records.lock().by_principal.len()
    }

    fn status(
        &self,
        records: &mut HashMap<String, LockoutRecord>,
        principal: &str,
        now: DateTime<Utc>,
    ) -> LockStatus {
        if self.purge_if_stale(records, principal, now) {
            return LockStatus::Unlocked;
        }
        match records.get(principal) {
            Some(record) if record.failure_count >= self.max_attempts => {
                let remaining = self.window_ms() - elapsed_ms(record, now);
                LockStatus::Locked {
                    remaining_secs: u64::try_from(remaining / 1000).unwrap_or(0),
                }
            }
            _ => LockStatus::Unlocked,
        }
    }

    /// Drops the record if its window has passed. Returns true if it did.
    fn purge_if_stale(
        &self,
        records: &mut HashMap<String, LockoutRecord>,
        principal: &str,
        now: DateTime<Utc>,
    ) -> bool {
        let stale = records
            .get(principal)
            .is_some_and(|r| elapsed_ms(r, now) >= self.window_ms());
        if stale {
            records.remove(principal);
        }
        stale
    }

    /// Drops every stale record once the map reaches its sweep size, then
    /// sets the next sweep size to twice what survived.
    fn sweep_if_due(&self, records: &mut Records, now: DateTime<Utc>) {
        if records.by_principal.len() < records.sweep_at {
            return;
        }
        let window = self.window_ms();
        records
            .by_principal
            .retain(|_, r| elapsed_ms(r, now) < window);
        records.sweep_at = (records.by_principal.len() * 2).max(SWEEP_THRESHOLD);
    }

    fn add_failure(
        records: &mut HashMap<String, LockoutRecord>,
        principal: &str,
        now: DateTime<Utc>,
    ) -> u32 {
        let record = records
            .entry(principal.to_string())
            .or_insert(LockoutRecord {
                failure_count: 0,
                last_failure_at: now,
            });
        record.failure_count = record.failure_count.saturating_add(1);
        record.last_failure_at = now;
        record.failure_count
    }

    fn window_ms(&self) -> i64 {
        i64::try_from(self.lockout_duration.as_millis()).unwrap_or(i64::MAX)
    }
}

fn elapsed_ms(record: &LockoutRecord, now: DateTime<Utc>) -> i64 {
    (now - record.last_failure_at).num_milliseconds()
}
