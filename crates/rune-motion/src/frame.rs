//! Frame-counted deferral.
//!
//! `FrameScheduler` holds payloads that become due after a given number of
//! paint ticks. The host calls [`FrameScheduler::tick`] once per frame and
//! acts on the payloads it returns; a canceled payload is never returned.
//!
//! The payload is whatever the owner needs to resume. The engine stores the
//! element's [`Generation`](crate::types::Generation); hosts that prefer
//! closures can use `FrameScheduler<Box<dyn FnOnce()>>` with
//! [`FrameScheduler::run_tick`].

use serde::{Deserialize, Serialize};

/// Handle of one submitted payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameHandle(u64);

#[derive(Debug)]
struct PendingFrame<T> {
    handle: FrameHandle,
    remaining: u32,
    payload: T,
}

/// Schedules payloads N paint ticks in the future.
#[derive(Debug)]
pub struct FrameScheduler<T> {
    next_id: u64,
    pending: Vec<PendingFrame<T>>,
}

impl<T> Default for FrameScheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FrameScheduler<T> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            pending: Vec::new(),
        }
    }

    /// Submit `payload` to become due after `frames` ticks.
    ///
    /// A count of zero is treated as one: nothing is ever due before the next tick.
    pub fn submit(&mut self, payload: T, frames: u32) -> FrameHandle {
        let handle = FrameHandle(self.next_id);
        self.next_id += 1;
        self.pending.push(PendingFrame {
            handle,
            remaining: frames.max(1),
            payload,
        });
        handle
    }

    /// Cancel a pending payload. Returns `false` if it already fired or was canceled.
    pub fn cancel(&mut self, handle: FrameHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.handle != handle);
        self.pending.len() != before
    }

    /// Advance one paint tick, returning the payloads that became due in submission order.
    pub fn tick(&mut self) -> Vec<T> {
        if self.pending.is_empty() {
            return Vec::new();
        }

        for frame in self.pending.iter_mut() {
            frame.remaining -= 1;
        }

        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|p| p.remaining == 0);
        self.pending = waiting;
        due.into_iter().map(|p| p.payload).collect()
    }

    pub fn is_pending(&self, handle: FrameHandle) -> bool {
        self.pending.iter().any(|p| p.handle == handle)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl FrameScheduler<Box<dyn FnOnce()>> {
    /// Advance one tick and invoke every callback that became due.
    ///
    /// Returns how many callbacks ran.
    pub fn run_tick(&mut self) -> usize {
        let due = self.tick();
        let count = due.len();
        for callback in due {
            callback();
        }
        count
    }
}
