//! Millisecond deadline timers driven by the host's frame delta.

use serde::{Deserialize, Serialize};

/// Handle of one armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct ArmedTimer<T> {
    handle: TimerHandle,
    remaining_ms: f32,
    payload: T,
}

/// Timers that expire once the accumulated `advance` delta reaches their delay.
#[derive(Debug)]
pub struct DeadlineTimers<T> {
    next_id: u64,
    armed: Vec<ArmedTimer<T>>,
}

impl<T> Default for DeadlineTimers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DeadlineTimers<T> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            armed: Vec::new(),
        }
    }

    /// Arm a timer expiring after `delay_ms` of advanced time.
    pub fn set(&mut self, payload: T, delay_ms: f32) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.armed.push(ArmedTimer {
            handle,
            remaining_ms: delay_ms,
            payload,
        });
        handle
    }

    /// Disarm a timer. Returns `false` if it already expired or was cleared.
    pub fn clear(&mut self, handle: TimerHandle) -> bool {
        let before = self.armed.len();
        self.armed.retain(|t| t.handle != handle);
        self.armed.len() != before
    }

    /// Advance time, returning expired payloads ordered by expiry.
    pub fn advance(&mut self, delta_ms: f32) -> Vec<T> {
        if self.armed.is_empty() {
            return Vec::new();
        }

        for timer in self.armed.iter_mut() {
            timer.remaining_ms -= delta_ms;
        }

        let (mut expired, armed): (Vec<_>, Vec<_>) = std::mem::take(&mut self.armed)
            .into_iter()
            .partition(|t| t.remaining_ms <= 0.0);
        self.armed = armed;
        expired.sort_by(|a, b| a.remaining_ms.total_cmp(&b.remaining_ms));
        expired.into_iter().map(|t| t.payload).collect()
    }

    pub fn is_armed(&self, handle: TimerHandle) -> bool {
        self.armed.iter().any(|t| t.handle == handle)
    }

    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }
}
