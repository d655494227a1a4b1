// PanelDock - core/deferred.rs
//
// Keyed, coalescing, cancelable deferred-task queue.
//
// Architecture:
//   - Lives on the UI thread; there is no background timer thread. The UI
//     loop calls `take_due(now)` each frame and schedules its next repaint
//     from `time_until_next(now)`.
//   - At most one task is pending per key. Scheduling a key that already has
//     a pending task replaces the task and restarts its delay.
//   - Time is passed in explicitly so the queue is deterministic under test.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Identifies one scheduling of a key. A replaced or cancelled ticket never fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerTicket(u64);

struct Pending<T> {
    ticket: TimerTicket,
    due: Instant,
    task: T,
}

/// Debounce queue keyed by `K`, holding at most one task `T` per key.
pub struct DeferredQueue<K, T> {
    delay: Duration,
    pending: HashMap<K, Pending<T>>,
    next_ticket: u64,
}

impl<K: Eq + Hash + Copy, T> DeferredQueue<K, T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: HashMap::new(),
            next_ticket: 0,
        }
    }

    /// Schedule `task` for `key`, due `delay` after `now`.
    ///
    /// Returns the new ticket and whether a previously pending task was replaced.
    pub fn schedule(&mut self, key: K, task: T, now: Instant) -> (TimerTicket, bool) {
        self.next_ticket += 1;
        let ticket = TimerTicket(self.next_ticket);
        let replaced = self
            .pending
            .insert(
                key,
                Pending {
                    ticket,
                    due: now + self.delay,
                    task,
                },
            )
            .is_some();
        (ticket, replaced)
    }

    /// Drop the pending task for `key`. Returns false when nothing was pending.
    pub fn cancel(&mut self, key: K) -> bool {
        self.pending.remove(&key).is_some()
    }

    pub fn is_pending(&self, key: K) -> bool {
        self.pending.contains_key(&key)
    }

    /// Ticket of the pending task for `key`, if any.
    pub fn ticket(&self, key: K) -> Option<TimerTicket> {
        self.pending.get(&key).map(|p| p.ticket)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Remove and return every task whose delay has elapsed, oldest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<(K, T)> {
        let due_keys: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, p)| p.due <= now)
            .map(|(k, _)| *k)
            .collect();

        let mut due: Vec<(K, Pending<T>)> = due_keys
            .into_iter()
            .filter_map(|k| self.pending.remove(&k).map(|p| (k, p)))
            .collect();
        due.sort_by_key(|(_, p)| (p.due, p.ticket));
        due.into_iter().map(|(k, p)| (k, p.task)).collect()
    }

    /// Earliest due instant among pending tasks.
    pub fn next_due(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.due).min()
    }

    /// How long until the next task is due (zero if already overdue).
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        self.next_due()
            .map(|due| due.saturating_duration_since(now))
    }

    /// Drop every pending task.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
