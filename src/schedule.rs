//! Timers on a caller-driven millisecond clock.
//!
//! Nothing here sleeps or spawns. Callers feed `now_ms` in and poll; each
//! scheduler is built once per call site and owned by the engine, so a
//! single `cancel()` drops whatever it still had pending.

/// Trailing-edge throttle.
///
/// The first trigger opens a window of `limit_ms`; the call fires when the
/// window closes. Triggers inside an open window collapse into that firing,
/// and a firing opens a fresh window so the rate stays bounded.
#[derive(Debug)]
pub struct Throttle {
    limit_ms: u64,
    window_end: Option<u64>,
    pending: bool,
}

impl Throttle {
    pub fn new(limit_ms: u64) -> Self {
        Self {
            limit_ms,
            window_end: None,
            pending: false,
        }
    }

    pub fn trigger(&mut self, now_ms: u64) {
        self.pending = true;
        if self.window_end.is_none() {
            self.window_end = Some(now_ms + self.limit_ms);
        }
    }

    /// Returns true when a coalesced call is due.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        let Some(end) = self.window_end else {
            return false;
        };
        if now_ms < end {
            return false;
        }
        if self.pending {
            self.pending = false;
            self.window_end = Some(now_ms + self.limit_ms);
            true
        } else {
            self.window_end = None;
            false
        }
    }

    pub fn cancel(&mut self) {
        self.window_end = None;
        self.pending = false;
    }

    pub fn is_idle(&self) -> bool {
        self.window_end.is_none()
    }

    pub fn deadline(&self) -> Option<u64> {
        self.window_end
    }
}

/// Trailing-edge debounce: fires `delay_ms` after the last trigger.
#[derive(Debug)]
pub struct Debounce {
    delay_ms: u64,
    deadline: Option<u64>,
}

impl Debounce {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            deadline: None,
        }
    }

    /// Restart the timer.
    pub fn trigger(&mut self, now_ms: u64) {
        self.deadline = Some(now_ms + self.delay_ms);
    }

    pub fn poll(&mut self, now_ms: u64) -> bool {
        match self.deadline {
            Some(d) if now_ms >= d => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<u64> {
        self.deadline
    }
}

/// One-shot deferred tasks ordered by deadline, then by insertion.
#[derive(Debug)]
pub struct TimerQueue<T> {
    entries: Vec<(u64, u64, T)>,
    next_seq: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_seq: 0,
        }
    }

    pub fn schedule(&mut self, at_ms: u64, task: T) {
        self.entries.push((at_ms, self.next_seq, task));
        self.next_seq += 1;
    }

    /// Remove and return every task due at `now_ms`, earliest first.
    pub fn take_due(&mut self, now_ms: u64) -> Vec<T> {
        let (mut due, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|(at, _, _)| *at <= now_ms);
        self.entries = rest;
        due.sort_by_key(|(at, seq, _)| (*at, *seq));
        due.into_iter().map(|(_, _, t)| t).collect()
    }

    /// Drop every task matching `pred`, returning how many were dropped.
    pub fn cancel_where(&mut self, pred: impl Fn(&T) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(_, _, t)| !pred(t));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.entries.iter().map(|(at, _, _)| *at).min()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
