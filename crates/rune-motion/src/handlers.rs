//! Cue handlers: the capability set a view registers per `(Status, Cue)`.
//!
//! # Usage
//!
//! ```ignore
//! use rune_motion::{Cue, CueOutcome, MotionHandlers, Status, Style};
//!
//! let handlers = MotionHandlers::new()
//!     .on(Status::Enter, Cue::Start, |_| Style::new().with("opacity", 0).into())
//!     .on(Status::Enter, Cue::Active, |_| Style::new().with("opacity", 1).into())
//!     .on(Status::Enter, Cue::Done, |call| {
//!         // Ignore completion of unrelated properties.
//!         (call.property_name() == Some("opacity")).into()
//!     });
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

use super::types::{Cue, NodeId, Status, Style};
use super::watcher::CompletionEvent;

/// Deferred Prepare work; the engine polls it once per tick.
pub struct PendingCue(Pin<Box<dyn Future<Output = ()>>>);

impl PendingCue {
    pub fn new(future: impl Future<Output = ()> + 'static) -> Self {
        Self(Box::pin(future))
    }

    /// Poll once with a no-op waker. Returns `true` once resolved.
    pub fn poll_ready(&mut self) -> bool {
        let mut cx = Context::from_waker(Waker::noop());
        matches!(self.0.as_mut().poll(&mut cx), Poll::Ready(()))
    }
}

impl fmt::Debug for PendingCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PendingCue")
    }
}

/// What a cue handler asks the engine to do.
#[derive(Debug, Default)]
pub enum CueOutcome {
    /// Nothing to contribute; the cue is skipped where skipping applies.
    #[default]
    Skip,
    /// Proceed normally.
    Proceed,
    /// Refuse: skips Prepare, keeps a Done waiting for the next real event.
    Veto,
    /// Style snapshot for Start and Active.
    Style(Style),
    /// Proceed once the future resolves (Prepare only).
    Pending(PendingCue),
}

impl CueOutcome {
    pub fn pending(future: impl Future<Output = ()> + 'static) -> Self {
        Self::Pending(PendingCue::new(future))
    }

    pub fn is_veto(&self) -> bool {
        matches!(self, Self::Veto)
    }
}

impl From<Style> for CueOutcome {
    fn from(style: Style) -> Self {
        Self::Style(style)
    }
}

impl From<bool> for CueOutcome {
    fn from(proceed: bool) -> Self {
        if proceed { Self::Proceed } else { Self::Veto }
    }
}

/// A handler that ran for its side effects proceeds like `true`.
impl From<()> for CueOutcome {
    fn from(_: ()) -> Self {
        Self::Proceed
    }
}

impl From<Option<Style>> for CueOutcome {
    fn from(style: Option<Style>) -> Self {
        style.map_or(Self::Skip, Self::Style)
    }
}

/// Arguments passed to a cue handler.
#[derive(Debug, Clone, Copy)]
pub struct CueCall<'a> {
    pub node: NodeId,
    pub status: Status,
    pub cue: Cue,
    /// The native signal, for Done cues completed by an event.
    pub event: Option<&'a CompletionEvent>,
    /// Set when a Done cue was reached through the deadline fallback.
    pub deadline: bool,
}

impl CueCall<'_> {
    pub fn property_name(&self) -> Option<&str> {
        self.event.and_then(CompletionEvent::property_name)
    }
}

type CueHandler = Box<dyn Fn(CueCall<'_>) -> CueOutcome>;

/// Handlers keyed by `(Status, Cue)`. Missing entries mean Skip.
#[derive(Default)]
pub struct MotionHandlers {
    handlers: HashMap<(Status, Cue), CueHandler>,
}

impl fmt::Debug for MotionHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.handlers.keys().collect();
        keys.sort_by_key(|(status, cue)| (status.as_str(), cue.ordinal()));
        f.debug_struct("MotionHandlers").field("registered", &keys).finish()
    }
}

impl MotionHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration.
    pub fn on(
        mut self,
        status: Status,
        cue: Cue,
        handler: impl Fn(CueCall<'_>) -> CueOutcome + 'static,
    ) -> Self {
        self.set(status, cue, handler);
        self
    }

    /// Register a handler. `Status::None` and `Cue::None` have no handler slot and are ignored.
    pub fn set(
        &mut self,
        status: Status,
        cue: Cue,
        handler: impl Fn(CueCall<'_>) -> CueOutcome + 'static,
    ) {
        if status.is_none() || cue == Cue::None {
            tracing::warn!(%status, %cue, "ignoring handler for a phase-less slot");
            return;
        }
        self.handlers.insert((status, cue), Box::new(handler));
    }

    pub fn has(&self, status: Status, cue: Cue) -> bool {
        self.handlers.contains_key(&(status, cue))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Invoke the handler for `call.status` / `call.cue`, if any.
    pub fn call(&self, call: CueCall<'_>) -> Option<CueOutcome> {
        self.handlers
            .get(&(call.status, call.cue))
            .map(|handler| handler(call))
    }
}
