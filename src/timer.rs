use std::collections::{BTreeMap, HashMap};

/// Identifies one scheduled callback. Handles are never reused within a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// A set of pending, individually cancelable timed payloads.
///
/// Time is whatever monotonic millisecond scale the owner uses (the session
/// clock at runtime, a plain counter in tests). Entries pop in due order;
/// entries due at the same instant pop in scheduling order.
pub struct TimerQueue<T> {
    pending: BTreeMap<(u64, u64), T>,
    due_by_handle: HashMap<u64, u64>,
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
            pending: BTreeMap::new(),
            due_by_handle: HashMap::new(),
            next_seq: 0,
        }
    }

    pub fn schedule(&mut self, due_ms: u64, payload: T) -> TimerHandle {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert((due_ms, seq), payload);
        self.due_by_handle.insert(seq, due_ms);
        TimerHandle(seq)
    }

    /// Cancel one entry. Returns false if it already fired or was canceled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.due_by_handle.remove(&handle.0) {
            Some(due) => self.pending.remove(&(due, handle.0)).is_some(),
            None => false,
        }
    }

    /// Discard every pending entry at once. Returns how many were dropped.
    pub fn cancel_all(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        self.due_by_handle.clear();
        dropped
    }

    /// Remove and return the earliest entry due at or before `now_ms`.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<(TimerHandle, T)> {
        let &(due, seq) = self.pending.keys().next()?;
        if due > now_ms {
            return None;
        }
        self.due_by_handle.remove(&seq);
        self.pending
            .remove(&(due, seq))
            .map(|payload| (TimerHandle(seq), payload))
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.pending.keys().next().map(|&(due, _)| due)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
