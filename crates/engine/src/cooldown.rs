// In crates/engine/src/cooldown.rs

use chrono::{DateTime, Duration, Utc};
use core_types::Symbol;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Per-instrument rate limit on notifications.
///
/// The gate only enforces timing. Whether a score is strong enough to be a
/// candidate is decided by the caller before asking.
#[derive(Debug)]
pub struct CooldownGate {
    interval: Duration,
    last_notified: Mutex<HashMap<Symbol, DateTime<Utc>>>,
}

impl CooldownGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_notified: Mutex::new(HashMap::new()),
        }
    }

    /// Intervals `Duration` cannot hold saturate to its maximum.
    pub fn from_secs(secs: u64) -> Self {
        let interval = i64::try_from(secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        Self::new(interval)
    }

    fn is_open(&self, last: Option<&DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match last {
            Some(last) => now - *last >= self.interval,
            None => true,
        }
    }

    /// False while `symbol` is still inside the interval after its last notification.
    pub fn may_signal(&self, symbol: &Symbol, now: DateTime<Utc>) -> bool {
        self.is_open(self.last_notified.lock().get(symbol), now)
    }

    /// Call only once a notification has actually been handed off.
    pub fn record_signal(&self, symbol: &Symbol, now: DateTime<Utc>) {
        self.last_notified.lock().insert(symbol.clone(), now);
    }

    pub fn last_signal(&self, symbol: &Symbol) -> Option<DateTime<Utc>> {
        self.last_notified.lock().get(symbol).copied()
    }

    /// Check, dispatch and record under one lock.
    ///
    /// `dispatch` runs only when the gate is open and must return whether the
    /// message was handed off; the time is recorded only in that case. Returns
    /// whether a notification went out.
    pub fn fire_if_ready<F>(&self, symbol: &Symbol, now: DateTime<Utc>, dispatch: F) -> bool
    where
        F: FnOnce() -> bool,
    {
        let mut last_notified = self.last_notified.lock();
        if !self.is_open(last_notified.get(symbol), now) {
            return false;
        }
        if !dispatch() {
            return false;
        }
        last_notified.insert(symbol.clone(), now);
        true
    }
}
