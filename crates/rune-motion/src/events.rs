//! Motion events for lifecycle notifications.
//!
//! Stages and lists never call back into the view layer. They queue events
//! instead, and the host drains them after each `tick`, `set_visible`,
//! `set_keys` or `handle_event` call.
//!
//! # Usage
//!
//! ```ignore
//! list.tick(16.0);
//! for event in list.drain_events() {
//!     match event {
//!         ListEvent::Stage { key, event: StageEvent::Settled { visible } } => {
//!             println!("{key} settled visible={visible}");
//!         }
//!         ListEvent::Removed { key } => println!("{key} can be purged"),
//!         _ => {}
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::types::{Cue, Key, Status};

/// Event emitted by one element's state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageEvent {
    /// The cue moved.
    CueChanged {
        status: Status,
        cue: Cue,
    },
    /// The visibility transition finished; `visible` is now authoritative.
    Settled {
        visible: bool,
    },
}

impl StageEvent {
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Settled { .. })
    }
}

/// Event emitted by a keyed list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListEvent {
    /// Forwarded from the element's stage.
    Stage { key: Key, event: StageEvent },
    /// The element finished exiting and will be purged on the next reconciliation.
    Removed { key: Key },
}

impl ListEvent {
    pub fn key(&self) -> &Key {
        match self {
            Self::Stage { key, .. } | Self::Removed { key } => key,
        }
    }
}

/// FIFO of pending events.
#[derive(Debug)]
pub struct EventQueue<E> {
    events: VecDeque<E>,
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventQueue<E> {
    pub fn new() -> Self {
        Self {
            events: VecDeque::new(),
        }
    }

    pub fn push(&mut self, event: E) {
        self.events.push_back(event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn pop(&mut self) -> Option<E> {
        self.events.pop_front()
    }

    pub fn peek(&self) -> Option<&E> {
        self.events.front()
    }

    /// Drain all events in arrival order.
    pub fn drain(&mut self) -> impl Iterator<Item = E> + '_ {
        self.events.drain(..)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
