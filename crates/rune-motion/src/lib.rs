//! Transition orchestration for keyed UI elements.
//!
//! This crate provides:
//! - **Stages**: per-element Appear/Enter/Exit state machines stepping through
//!   Prepare, Start, Active and Done cues
//! - **Key reconciliation**: classifying keys as added, kept or removed across renders
//! - **Motion lists**: one stage per live key, with exits running before removal
//! - **Frame and deadline scheduling**: deferred work driven by the host's paint ticks
//! - **Completion watching**: exactly-once completion from native end events or a deadline
//!
//! # Architecture
//!
//! ```text
//! MotionList
//!   ├── keys::diff (previous entries × desired keys → classified entries)
//!   └── Stage per key
//!         ├── FrameScheduler  (cue advances)
//!         ├── DeadlineTimers  (completion fallback)
//!         └── EventWatcher    (transitionend / animationend)
//! ```
//!
//! Everything is single-threaded. The host calls `tick(delta_ms)` once per
//! paint frame, forwards end events through `handle_event`, and drains the
//! queued [`StageEvent`]s or [`ListEvent`]s afterwards.

pub mod error;
pub mod events;
pub mod frame;
pub mod handlers;
pub mod keys;
pub mod list;
pub mod presets;
pub mod render;
pub mod stage;
pub mod timer;
pub mod types;
pub mod watcher;

pub use error::{MotionError, Result};
pub use events::{EventQueue, ListEvent, StageEvent};
pub use frame::{FrameHandle, FrameScheduler};
pub use handlers::{CueCall, CueOutcome, MotionHandlers, PendingCue};
pub use keys::{KeyEntry, KeyStatus, diff, find_duplicate};
pub use list::MotionList;
pub use presets::{Extent, Preset};
pub use render::{MotionName, RenderDecision, class_names};
pub use rune_config::MotionConfig;
pub use stage::{Outstanding, Stage, StageSnapshot, TransitionContext};
pub use timer::{DeadlineTimers, TimerHandle};
pub use types::{Cue, Generation, Key, NodeId, NodeRef, Status, Style, TRANSITION_PROPERTY};
pub use watcher::{
    CompletionEvent, EndEventKind, EventWatcher, ListenerLedger, ListenerRegistry, WatchHandle,
};
