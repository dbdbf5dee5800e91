//! Delayed callbacks as data: a queue of payloads due at a simulated time.
//!
//! Timers are cancelled by handle. Nothing runs on its own; the owner drains
//! due payloads at a well-defined point of its loop.

/// Handle returned by [`Timers::schedule`], used to cancel a pending timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct Pending<T> {
    id: TimerId,
    due: f64,
    payload: T,
}

/// Pending delayed payloads ordered by due time.
#[derive(Debug, Clone)]
pub struct Timers<T> {
    pending: Vec<Pending<T>>,
    next_id: u64,
}

impl<T> Default for Timers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Timers<T> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            next_id: 0,
        }
    }

    /// Schedule `payload` to become due `delay` seconds after `now`.
    pub fn schedule(&mut self, now: f64, delay: f64, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let due = now + delay.max(0.0);
        // Keep FIFO order among equal due times.
        let index = self.pending.partition_point(|p| p.due <= due);
        self.pending.insert(index, Pending { id, due, payload });
        id
    }

    /// Cancel a pending timer. Returns the payload if it had not fired yet.
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        let index = self.pending.iter().position(|p| p.id == id)?;
        Some(self.pending.remove(index).payload)
    }

    /// Remove and return every payload whose due time is `<= now`, earliest first.
    pub fn drain_due(&mut self, now: f64) -> Vec<T> {
        let split = self.pending.partition_point(|p| p.due <= now);
        self.pending.drain(..split).map(|p| p.payload).collect()
    }

    /// Due time of a pending timer.
    #[cfg(test)]
    fn due_at(&self, id: TimerId) -> Option<f64> {
        self.pending.iter().find(|p| p.id == id).map(|p| p.due)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
