use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

/// Running counters of what the agent has done since it started.
///
/// Shared between the synchronizer, the task dispatcher and the status listener.
#[derive(Debug, Default)]
pub struct Activity {
    resyncs: AtomicU64,
    last_resync: AtomicU64,
    in_flight: AtomicUsize,
    handled: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivitySnapshot {
    pub resyncs: u64,
    /// Unix seconds of the last successful resync.
    pub last_resync: Option<u64>,
    pub handlers_in_flight: usize,
    pub tasks_handled: u64,
}

/// Marks one task handler as running until dropped.
#[must_use]
pub struct InFlight<'a> {
    activity: &'a Activity,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.activity.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.activity.handled.fetch_add(1, Ordering::SeqCst);
    }
}

impl Activity {
    pub fn resynced(&self) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        self.last_resync.store(now, Ordering::SeqCst);
        self.resyncs.fetch_add(1, Ordering::SeqCst);
    }

    pub fn handler_started(&self) -> InFlight<'_> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        InFlight { activity: self }
    }

    pub fn snapshot(&self) -> ActivitySnapshot {
        let resyncs = self.resyncs.load(Ordering::SeqCst);
        ActivitySnapshot {
            resyncs,
            last_resync: (resyncs > 0).then(|| self.last_resync.load(Ordering::SeqCst)),
            handlers_in_flight: self.in_flight.load(Ordering::SeqCst),
            tasks_handled: self.handled.load(Ordering::SeqCst),
        }
    }
}
