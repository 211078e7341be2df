//! Cancellable one-shot timers
//!
//! `arm` and `cancel` are always paired. A callback runs at most once, and
//! never after its handle was cancelled, even if the deadline already passed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::trace;

/// Handle to an armed timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Default)]
struct TimerTable {
    next_id: u64,
    pending: HashMap<u64, AbortHandle>,
}

impl Drop for TimerTable {
    fn drop(&mut self) {
        for (_, task) in self.pending.drain() {
            task.abort();
        }
    }
}

/// Set of timers owned by one component.
///
/// Dropping the last clone cancels everything still pending.
#[derive(Clone, Default)]
pub struct Timers {
    table: Arc<Mutex<TimerTable>>,
}

impl std::fmt::Debug for Timers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timers")
            .field("pending", &self.pending())
            .finish()
    }
}

fn lock(table: &Mutex<TimerTable>) -> MutexGuard<'_, TimerTable> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `callback` once `delay` has elapsed. Requires a tokio runtime.
    pub fn arm<F>(&self, delay: Duration, callback: F) -> TimerHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let mut table = lock(&self.table);
        let id = table.next_id;
        table.next_id += 1;

        let weak: Weak<Mutex<TimerTable>> = Arc::downgrade(&self.table);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(table) = weak.upgrade() else {
                return;
            };
            let still_armed = lock(&table).pending.remove(&id).is_some();
            drop(table);
            if still_armed {
                trace!(timer = id, "Timer fired");
                callback();
            }
        });

        table.pending.insert(id, task.abort_handle());
        trace!(timer = id, ?delay, "Timer armed");
        TimerHandle(id)
    }

    /// Cancel a timer. Returns `false` if it already fired or was cancelled.
    pub fn cancel(&self, handle: TimerHandle) -> bool {
        let task = lock(&self.table).pending.remove(&handle.0);
        if let Some(task) = task {
            task.abort();
            true
        } else {
            false
        }
    }

    /// Cancel every pending timer
    pub fn cancel_all(&self) {
        let drained: Vec<_> = lock(&self.table).pending.drain().collect();
        for (_, task) in drained {
            task.abort();
        }
    }

    /// Number of timers that have neither fired nor been cancelled
    pub fn pending(&self) -> usize {
        lock(&self.table).pending.len()
    }
}
