//! Tick-based timers.
//!
//! Timers fire at the start of the tick whose counter reaches their
//! deadline, before input is polled. The queue is bounded: inserting
//! past capacity drops the oldest pending timer (by deadline, then
//! insertion order) and logs a warning. [`TimerQueue::try_insert`]
//! refuses instead of evicting, for callers that would rather keep
//! what is scheduled.

use crate::error::{Error, Result};
use crate::tree::WidgetTree;

/// Handle to a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Callback run when a timer fires.
pub type TimerCallback = Box<dyn FnMut(&mut WidgetTree)>;

struct TimerEntry {
    id: TimerId,
    deadline: u64,
    period: Option<u64>,
    callback: TimerCallback,
}

/// Bounded queue of tick-deadline timers.
pub struct TimerQueue {
    entries: Vec<TimerEntry>,
    capacity: usize,
    next_id: u64,
}

impl TimerQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
            next_id: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn alloc_id(&mut self) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        id
    }

    fn push(&mut self, entry: TimerEntry) {
        if self.entries.len() >= self.capacity {
            // Drop the oldest pending timer (earliest deadline; ties go
            // to the earliest-inserted).
            if let Some(oldest) = self
                .entries
                .iter()
                .enumerate()
                .min_by_key(|(_, e)| (e.deadline, e.id.0))
                .map(|(i, _)| i)
            {
                let dropped = self.entries.remove(oldest);
                tracing::warn!(
                    dropped = dropped.id.0,
                    capacity = self.capacity,
                    "timer queue full, dropping oldest pending timer"
                );
            }
        }
        self.entries.push(entry);
    }

    /// Schedule a one-shot timer to fire `delay_ticks` from `now`.
    pub fn insert(&mut self, now: u64, delay_ticks: u64, callback: TimerCallback) -> TimerId {
        let id = self.alloc_id();
        self.push(TimerEntry {
            id,
            deadline: now + delay_ticks,
            period: None,
            callback,
        });
        id
    }

    /// Schedule a one-shot timer without evicting: a full queue fails
    /// with [`Error::Overflow`] and leaves every pending timer alone.
    pub fn try_insert(
        &mut self,
        now: u64,
        delay_ticks: u64,
        callback: TimerCallback,
    ) -> Result<TimerId> {
        if self.entries.len() >= self.capacity {
            return Err(Error::Overflow {
                queue: "timer",
                capacity: self.capacity,
            });
        }
        Ok(self.insert(now, delay_ticks, callback))
    }

    /// Schedule a periodic timer firing every `period_ticks`. A zero
    /// period is clamped to one tick.
    pub fn insert_periodic(
        &mut self,
        now: u64,
        period_ticks: u64,
        callback: TimerCallback,
    ) -> TimerId {
        let period = period_ticks.max(1);
        let id = self.alloc_id();
        self.push(TimerEntry {
            id,
            deadline: now + period,
            period: Some(period),
            callback,
        });
        id
    }

    /// Cancel a pending timer. Returns whether it was still pending.
    pub fn remove(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        before != self.entries.len()
    }

    /// Fire every timer whose deadline is `<= now`. One-shots fire once
    /// even if several ticks were missed; periodic timers reschedule
    /// from `now` so they never burst to catch up.
    pub fn advance(&mut self, now: u64, tree: &mut WidgetTree) {
        let entries = std::mem::take(&mut self.entries);
        let mut keep = Vec::with_capacity(entries.len());

        for mut entry in entries {
            if entry.deadline > now {
                keep.push(entry);
                continue;
            }
            (entry.callback)(tree);
            if let Some(period) = entry.period {
                entry.deadline = now + period;
                keep.push(entry);
            }
        }

        // Timers scheduled by firing callbacks land in self.entries.
        keep.append(&mut self.entries);
        self.entries = keep;
    }
}

// =============================================================================
// Tests
// =============================================================================
