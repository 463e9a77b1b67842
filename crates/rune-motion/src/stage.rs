//! Per-element transition state machine.
//!
//! A [`Stage`] owns one element's [`TransitionContext`] and drives it through
//! `Prepare → Start → Active → Done` whenever its target visibility changes.
//! Cue advances are deferred through a [`FrameScheduler`]; completion comes
//! from an [`EventWatcher`] or, failing that, a deadline timer.
//!
//! # Lifecycle
//!
//! ```ignore
//! let mut stage = Stage::new("panel", config, handlers, node_ref, listeners);
//! stage.init(true);                 // first render
//! loop {
//!     stage.tick(16.0);             // once per paint frame
//!     // host forwards transitionend/animationend:
//!     // stage.handle_event(&event);
//!     for event in stage.drain_events() { /* ... */ }
//! }
//! stage.set_visible(false);         // later renders
//! stage.dispose();                  // unmount
//! ```
//!
//! Every deferred callback carries the context's [`Generation`]. Interrupting
//! a phase releases the frame, the deadline and the watch, then bumps the
//! generation, so nothing queued before the interruption can act afterwards.

use std::rc::Rc;

use rune_config::MotionConfig;
use tracing::{debug, trace};

use super::events::{EventQueue, StageEvent};
use super::frame::{FrameHandle, FrameScheduler};
use super::handlers::{CueCall, CueOutcome, MotionHandlers, PendingCue};
use super::timer::{DeadlineTimers, TimerHandle};
use super::types::{Cue, Generation, NodeRef, Status, Style};
use super::watcher::{CompletionEvent, EventWatcher, ListenerRegistry, WatchHandle};

/// Mutable per-element record.
#[derive(Debug)]
pub struct TransitionContext {
    status: Status,
    cue: Cue,
    style: Option<Style>,
    frame: Option<FrameHandle>,
    deadline: Option<TimerHandle>,
    watch: Option<WatchHandle>,
    mounted: bool,
    unmounted: bool,
    activated: bool,
    node: NodeRef,
    generation: Generation,
}

impl TransitionContext {
    fn new(node: NodeRef) -> Self {
        Self {
            status: Status::None,
            cue: Cue::None,
            style: None,
            frame: None,
            deadline: None,
            watch: None,
            mounted: false,
            unmounted: false,
            activated: false,
            node,
            generation: Generation::default(),
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn cue(&self) -> Cue {
        self.cue
    }

    pub fn style(&self) -> Option<&Style> {
        self.style.as_ref()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn is_unmounted(&self) -> bool {
        self.unmounted
    }

    /// Whether the cue has reached Active, the point from which completion is honoured.
    pub fn has_activated(&self) -> bool {
        self.activated
    }

    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }
}

/// Deferred work still held by a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Outstanding {
    pub frames: usize,
    pub timers: usize,
    pub watches: usize,
    pub prepare: bool,
}

impl Outstanding {
    pub fn is_idle(&self) -> bool {
        self.frames == 0 && self.timers == 0 && self.watches == 0 && !self.prepare
    }
}

/// What the view layer reads back after each update.
#[derive(Debug, Clone, PartialEq)]
pub struct StageSnapshot {
    pub status: Status,
    pub cue: Cue,
    pub style: Option<Style>,
    pub visible: bool,
}

/// Transition state machine for one element.
#[derive(Debug)]
pub struct Stage {
    label: String,
    config: MotionConfig,
    handlers: Rc<MotionHandlers>,
    ctx: TransitionContext,
    /// Requested visibility; `None` until `init`.
    target: Option<bool>,
    has_rendered: bool,
    frames: FrameScheduler<Generation>,
    timers: DeadlineTimers<Generation>,
    watcher: EventWatcher,
    prepare: Option<PendingCue>,
    events: EventQueue<StageEvent>,
}

impl Stage {
    /// Create an idle stage. `label` only appears in logs.
    pub fn new(
        label: impl Into<String>,
        config: MotionConfig,
        handlers: Rc<MotionHandlers>,
        node: NodeRef,
        listeners: Rc<dyn ListenerRegistry>,
    ) -> Self {
        Self {
            label: label.into(),
            config,
            handlers,
            ctx: TransitionContext::new(node),
            target: None,
            has_rendered: false,
            frames: FrameScheduler::new(),
            timers: DeadlineTimers::new(),
            watcher: EventWatcher::new(listeners),
            prepare: None,
            events: EventQueue::new(),
        }
    }

    /// First evaluation of visibility; the element counts as mounted afterwards.
    pub fn init(&mut self, visible: bool) {
        if self.target.is_some() || self.ctx.unmounted {
            return;
        }
        self.apply_visibility(visible);
        self.ctx.mounted = true;
    }

    /// Request a new visibility. Repeating the current request is a no-op.
    pub fn set_visible(&mut self, visible: bool) {
        match self.target {
            None => self.init(visible),
            Some(current) if current == visible => {}
            Some(_) => self.apply_visibility(visible),
        }
    }

    /// Release every timer, frame and listener. The stage stays inert afterwards.
    pub fn dispose(&mut self) {
        if self.ctx.unmounted {
            return;
        }
        self.release();
        self.ctx.unmounted = true;
        self.ctx.status = Status::None;
        self.ctx.cue = Cue::None;
        self.ctx.style = None;
        self.ctx.activated = false;
        debug!(stage = %self.label, "disposed");
    }

    /// Swap the configuration. A running phase whose family got disabled is
    /// dropped and the element settles at once.
    pub fn reconfigure(&mut self, config: MotionConfig) {
        let disabled = match self.ctx.status {
            Status::None => false,
            Status::Appear => !config.enabled || !config.appear,
            Status::Enter => !config.enabled || !config.enter,
            Status::Exit => !config.enabled || !config.exit,
        };
        self.config = config;
        if disabled && !self.ctx.unmounted {
            debug!(stage = %self.label, status = %self.ctx.status, "phase disabled by reconfigure");
            self.release();
            self.reset();
            self.settle();
        }
    }

    /// Advance one paint frame of `delta_ms` milliseconds.
    pub fn tick(&mut self, delta_ms: f32) {
        if self.ctx.unmounted {
            return;
        }

        for generation in self.timers.advance(delta_ms) {
            if generation == self.ctx.generation {
                self.ctx.deadline = None;
                trace!(stage = %self.label, "deadline reached");
                self.complete(None);
            }
        }

        if self.ctx.watch.is_some() {
            self.watcher.sync(&self.ctx.node);
        }

        for generation in self.frames.tick() {
            self.on_frame(generation);
        }

        if self.prepare.is_some() {
            self.poll_prepare();
        }
    }

    /// Deliver a native completion signal. Returns `true` if it completed the phase.
    pub fn handle_event(&mut self, event: &CompletionEvent) -> bool {
        if self.ctx.unmounted || self.ctx.watch.is_none() {
            return false;
        }
        self.watcher.sync(&self.ctx.node);
        self.complete(Some(event))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn context(&self) -> &TransitionContext {
        &self.ctx
    }

    pub fn node_ref(&self) -> &NodeRef {
        &self.ctx.node
    }

    pub fn status(&self) -> Status {
        self.ctx.status
    }

    pub fn cue(&self) -> Cue {
        self.ctx.cue
    }

    pub fn generation(&self) -> Generation {
        self.ctx.generation
    }

    /// Last style snapshot read from a Start or Active handler.
    pub fn style(&self) -> Option<&Style> {
        self.ctx.style.as_ref()
    }

    /// Style to apply to the node, including the `transition: none` pin during Start.
    pub fn merged_style(&self) -> Option<Style> {
        if self.ctx.status.is_none() {
            return None;
        }
        match (self.ctx.cue, &self.ctx.style) {
            (Cue::Start, Some(style)) => Some(Style::transition_none().merged_with(style)),
            (Cue::Start, None) => Some(Style::transition_none()),
            (_, style) => style.clone(),
        }
    }

    /// Requested visibility, `None` before `init`.
    pub fn target_visible(&self) -> Option<bool> {
        self.target
    }

    /// Whether the element should be rendered at all: visible, or still animating.
    pub fn effective_visible(&self) -> bool {
        self.target.unwrap_or(false) || !self.ctx.status.is_none()
    }

    /// No phase is running.
    pub fn is_settled(&self) -> bool {
        self.ctx.status.is_none()
    }

    /// Whether the element was ever requested visible.
    pub fn has_rendered(&self) -> bool {
        self.has_rendered
    }

    pub fn is_disposed(&self) -> bool {
        self.ctx.unmounted
    }

    pub fn outstanding(&self) -> Outstanding {
        Outstanding {
            frames: self.frames.pending_count(),
            timers: self.timers.armed_count(),
            watches: usize::from(self.watcher.is_watching()),
            prepare: self.prepare.is_some(),
        }
    }

    pub fn snapshot(&self) -> StageSnapshot {
        StageSnapshot {
            status: self.ctx.status,
            cue: self.ctx.cue,
            style: self.merged_style(),
            visible: self.effective_visible(),
        }
    }

    pub fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = StageEvent> + '_ {
        self.events.drain()
    }

    fn apply_visibility(&mut self, visible: bool) {
        if self.ctx.unmounted {
            return;
        }
        self.target = Some(visible);
        if visible {
            self.has_rendered = true;
        }

        self.release();
        self.reset();

        match self.select_status(visible) {
            Some(status) => {
                debug!(stage = %self.label, %status, "phase started");
                self.ctx.status = status;
                self.set_cue(Cue::Prepare);
                self.step();
            }
            None => self.settle(),
        }
    }

    fn select_status(&self, visible: bool) -> Option<Status> {
        let config = &self.config;
        if !config.enabled {
            return None;
        }
        let mounted = self.ctx.mounted;
        if visible {
            if !mounted && config.appear {
                Some(Status::Appear)
            } else if mounted && config.enter {
                Some(Status::Enter)
            } else {
                None
            }
        } else if config.exit && (mounted || config.exit_immediately) {
            Some(Status::Exit)
        } else {
            None
        }
    }

    /// Run the action of the current cue, skipping through cues that need no wait.
    fn step(&mut self) {
        loop {
            let status = self.ctx.status;
            match self.ctx.cue {
                Cue::None | Cue::Done => return,
                Cue::Prepare => {
                    if !self.handlers.has(status, Cue::Prepare) {
                        self.set_cue(Cue::Start);
                        continue;
                    }
                    let Some(node) = self.ctx.node.get() else {
                        self.abort("node unavailable for prepare");
                        return;
                    };
                    let outcome = self
                        .handlers
                        .call(CueCall {
                            node,
                            status,
                            cue: Cue::Prepare,
                            event: None,
                            deadline: false,
                        })
                        .unwrap_or_default();
                    match outcome {
                        CueOutcome::Skip | CueOutcome::Veto => {
                            self.set_cue(Cue::Start);
                            continue;
                        }
                        CueOutcome::Pending(pending) => {
                            self.prepare = Some(pending);
                            self.poll_prepare();
                        }
                        CueOutcome::Proceed | CueOutcome::Style(_) => self.schedule_next(),
                    }
                    return;
                }
                cue @ (Cue::Start | Cue::Active) => {
                    let style = if self.handlers.has(status, cue) {
                        let Some(node) = self.ctx.node.get() else {
                            self.abort("node unavailable for style");
                            return;
                        };
                        match self.handlers.call(CueCall {
                            node,
                            status,
                            cue,
                            event: None,
                            deadline: false,
                        }) {
                            Some(CueOutcome::Style(style)) => Some(style),
                            _ => None,
                        }
                    } else {
                        None
                    };
                    self.ctx.style = style;

                    if cue == Cue::Active && !self.arm_completion() {
                        self.abort("node unavailable for completion watch");
                        return;
                    }
                    self.schedule_next();
                    return;
                }
            }
        }
    }

    fn arm_completion(&mut self) -> bool {
        let generation = self.ctx.generation;
        let Some(handle) = self.watcher.watch(&self.ctx.node, generation) else {
            return false;
        };
        self.ctx.watch = Some(handle);

        if self.config.has_deadline() {
            if let Some(previous) = self.ctx.deadline.take() {
                self.timers.clear(previous);
            }
            self.ctx.deadline = Some(self.timers.set(generation, self.config.deadline_ms));
        }
        true
    }

    fn schedule_next(&mut self) {
        if let Some(previous) = self.ctx.frame.take() {
            self.frames.cancel(previous);
        }
        self.ctx.frame = Some(
            self.frames
                .submit(self.ctx.generation, self.config.frames_per_cue),
        );
    }

    fn poll_prepare(&mut self) {
        let Some(pending) = self.prepare.as_mut() else {
            return;
        };
        if pending.poll_ready() {
            self.prepare = None;
            trace!(stage = %self.label, "prepare resolved");
            self.schedule_next();
        }
    }

    fn on_frame(&mut self, generation: Generation) {
        if generation != self.ctx.generation || self.ctx.unmounted {
            return;
        }
        self.ctx.frame = None;
        trace!(stage = %self.label, cue = %self.ctx.cue, "frame");
        match self.ctx.cue {
            Cue::Prepare | Cue::Start | Cue::Active => {
                let next = self.ctx.cue.next();
                self.set_cue(next);
                self.step();
            }
            Cue::None | Cue::Done => {}
        }
    }

    /// Finish the phase from a native event (`Some`) or the deadline (`None`).
    fn complete(&mut self, event: Option<&CompletionEvent>) -> bool {
        let status = self.ctx.status;
        if status.is_none() || !self.ctx.activated || self.ctx.unmounted {
            return false;
        }
        if let Some(event) = event {
            if !self.watcher.accepts(event) {
                return false;
            }
        }

        if let Some(node) = self.ctx.node.get() {
            let outcome = self.handlers.call(CueCall {
                node,
                status,
                cue: Cue::Done,
                event,
                deadline: event.is_none(),
            });
            if outcome.is_some_and(|o| o.is_veto()) {
                if event.is_some() {
                    debug!(stage = %self.label, %status, "completion vetoed");
                    return false;
                }
                debug!(stage = %self.label, %status, "deadline overrides veto");
            }
        }

        if !self.watcher.complete(self.ctx.generation) {
            return false;
        }

        self.release();
        if self.ctx.cue == Cue::Active {
            self.set_cue(Cue::Done);
        }
        self.reset();
        let source = if event.is_some() { "event" } else { "deadline" };
        debug!(stage = %self.label, %status, source, "phase completed");
        self.settle();
        true
    }

    fn abort(&mut self, reason: &'static str) {
        debug!(
            stage = %self.label,
            status = %self.ctx.status,
            cue = %self.ctx.cue,
            reason,
            "phase aborted"
        );
        self.release();
        self.reset();
        self.settle();
    }

    fn release(&mut self) {
        if let Some(handle) = self.ctx.frame.take() {
            self.frames.cancel(handle);
        }
        if let Some(handle) = self.ctx.deadline.take() {
            self.timers.clear(handle);
        }
        if let Some(handle) = self.ctx.watch.take() {
            self.watcher.unwatch(handle);
        }
        self.prepare = None;
        self.ctx.generation.bump();
    }

    fn reset(&mut self) {
        self.ctx.status = Status::None;
        self.set_cue(Cue::None);
        self.ctx.style = None;
    }

    fn set_cue(&mut self, cue: Cue) {
        if self.ctx.cue == cue {
            return;
        }
        self.ctx.cue = cue;
        self.ctx.activated = cue.is_active();
        trace!(stage = %self.label, status = %self.ctx.status, %cue, "cue");
        self.events.push(StageEvent::CueChanged {
            status: self.ctx.status,
            cue,
        });
    }

    fn settle(&mut self) {
        let Some(visible) = self.target else {
            return;
        };
        debug!(stage = %self.label, visible, "settled");
        self.events.push(StageEvent::Settled { visible });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeId;
    use crate::watcher::{EndEventKind, ListenerLedger};
    use std::cell::Cell;
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    const NODE: NodeId = NodeId(1);

    fn config() -> MotionConfig {
        MotionConfig::default().with_frames_per_cue(1)
    }

    fn fade() -> MotionHandlers {
        let mut handlers = MotionHandlers::new();
        for status in [Status::Appear, Status::Enter] {
            handlers.set(status, Cue::Start, |_| Style::new().with("opacity", 0).into());
            handlers.set(status, Cue::Active, |_| Style::new().with("opacity", 1).into());
        }
        handlers.set(Status::Exit, Cue::Start, |_| Style::new().with("opacity", 1).into());
        handlers.set(Status::Exit, Cue::Active, |_| Style::new().with("opacity", 0).into());
        handlers
    }

    fn stage_with(config: MotionConfig, handlers: MotionHandlers) -> (Stage, Rc<ListenerLedger>, NodeRef) {
        let ledger = Rc::new(ListenerLedger::new());
        let node = NodeRef::bound(NODE);
        let stage = Stage::new("test", config, Rc::new(handlers), node.clone(), ledger.clone());
        (stage, ledger, node)
    }

    fn drain(stage: &mut Stage) -> Vec<StageEvent> {
        stage.drain_events().collect()
    }

    fn cues(events: &[StageEvent]) -> Vec<Cue> {
        events
            .iter()
            .filter_map(|e| match e {
                StageEvent::CueChanged { cue, .. } => Some(*cue),
                StageEvent::Settled { .. } => None,
            })
            .collect()
    }

    fn settles(events: &[StageEvent]) -> Vec<bool> {
        events
            .iter()
            .filter_map(|e| match e {
                StageEvent::Settled { visible } => Some(*visible),
                StageEvent::CueChanged { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_appear_full_cycle() {
        let (mut stage, ledger, _node) = stage_with(config(), fade());

        stage.init(true);
        assert_eq!(stage.status(), Status::Appear);
        assert_eq!(stage.cue(), Cue::Start);
        let style = stage.merged_style().unwrap();
        assert_eq!(style.get("transition"), Some("none"));
        assert_eq!(style.get("opacity"), Some("0"));
        assert!(stage.effective_visible());

        stage.tick(16.0);
        assert_eq!(stage.cue(), Cue::Active);
        assert_eq!(stage.merged_style().unwrap().get("transition"), None);
        assert_eq!(ledger.active_count(), 2);

        stage.tick(16.0);
        assert_eq!(stage.cue(), Cue::Done);

        assert!(stage.handle_event(&CompletionEvent::transition_end(NODE, "opacity")));
        assert!(stage.is_settled());
        assert_eq!(stage.cue(), Cue::None);
        assert!(stage.merged_style().is_none());
        assert_eq!(ledger.active_count(), 0);
        assert!(stage.outstanding().is_idle());

        let events = drain(&mut stage);
        assert_eq!(
            cues(&events),
            vec![Cue::Prepare, Cue::Start, Cue::Active, Cue::Done, Cue::None]
        );
        assert_eq!(settles(&events), vec![true]);
    }

    #[test]
    fn test_hidden_first_render_snaps() {
        let (mut stage, _ledger, _node) = stage_with(config(), fade());
        stage.init(false);

        assert!(stage.is_settled());
        assert!(!stage.effective_visible());
        assert_eq!(settles(&drain(&mut stage)), vec![false]);
    }

    #[test]
    fn test_exit_immediately_runs_exit() {
        let (mut stage, _ledger, _node) =
            stage_with(config().with_exit_immediately(true), fade());
        stage.init(false);

        assert_eq!(stage.status(), Status::Exit);
        assert!(stage.effective_visible());
    }

    #[test]
    fn test_enter_after_mount() {
        let (mut stage, _ledger, _node) = stage_with(config(), fade());
        stage.init(false);
        drain(&mut stage);

        stage.set_visible(true);
        assert_eq!(stage.status(), Status::Enter);

        stage.set_visible(true);
        assert_eq!(stage.cue(), Cue::Start);
    }

    #[test]
    fn test_disabled_phase_settles_immediately() {
        let (mut stage, _ledger, _node) =
            stage_with(config().with_phases(false, true, true), fade());
        stage.init(true);

        assert!(stage.is_settled());
        assert!(stage.effective_visible());
        assert_eq!(settles(&drain(&mut stage)), vec![true]);
    }

    #[test]
    fn test_engine_switch_off() {
        let mut off = config();
        off.enabled = false;
        let (mut stage, _ledger, _node) = stage_with(off, fade());
        stage.init(true);
        stage.set_visible(false);

        assert!(stage.is_settled());
        assert_eq!(settles(&drain(&mut stage)), vec![true, false]);
    }

    #[test]
    fn test_done_veto_waits_for_matching_event() {
        let handlers = fade().on(Status::Appear, Cue::Done, |call| {
            (call.property_name() == Some("height")).into()
        });
        let (mut stage, _ledger, _node) = stage_with(config(), handlers);
        stage.init(true);
        stage.tick(16.0);
        stage.tick(16.0);

        assert!(!stage.handle_event(&CompletionEvent::transition_end(NODE, "opacity")));
        assert_eq!(stage.cue(), Cue::Done);

        assert!(stage.handle_event(&CompletionEvent::transition_end(NODE, "height")));
        assert!(stage.is_settled());
        assert_eq!(settles(&drain(&mut stage)), vec![true]);
    }

    #[test]
    fn test_event_for_other_node_ignored() {
        let (mut stage, _ledger, _node) = stage_with(config(), fade());
        stage.init(true);
        stage.tick(16.0);

        assert!(!stage.handle_event(&CompletionEvent::transition_end(NodeId(99), "opacity")));
        assert_eq!(stage.status(), Status::Appear);
    }

    #[test]
    fn test_rebound_node_completes_on_new_target() {
        let (mut stage, ledger, node) = stage_with(config(), fade());
        stage.init(true);
        stage.tick(16.0);
        assert_eq!(stage.cue(), Cue::Active);
        assert!(ledger.is_listening(NODE, EndEventKind::TransitionEnd));

        let replacement = NodeId(7);
        node.bind(replacement);
        stage.tick(16.0);
        assert_eq!(stage.cue(), Cue::Done);
        assert!(!ledger.is_listening(NODE, EndEventKind::TransitionEnd));
        assert!(ledger.is_listening(replacement, EndEventKind::TransitionEnd));
        assert_eq!(ledger.active_count(), 2);

        assert!(!stage.handle_event(&CompletionEvent::transition_end(NODE, "opacity")));
        assert_eq!(stage.status(), Status::Appear);

        assert!(stage.handle_event(&CompletionEvent::transition_end(replacement, "opacity")));
        assert!(stage.is_settled());
        assert_eq!(ledger.active_count(), 0);
        assert_eq!(settles(&drain(&mut stage)), vec![true]);
    }

    #[test]
    fn test_event_before_active_ignored() {
        let (mut stage, _ledger, _node) = stage_with(config(), fade());
        stage.init(true);
        assert_eq!(stage.cue(), Cue::Start);

        assert!(!stage.handle_event(&CompletionEvent::transition_end(NODE, "opacity")));
        assert_eq!(stage.cue(), Cue::Start);
    }

    #[test]
    fn test_event_during_active_records_done() {
        let (mut stage, _ledger, _node) =
            stage_with(MotionConfig::default().with_frames_per_cue(3), fade());
        stage.init(true);
        for _ in 0..3 {
            stage.tick(16.0);
        }
        assert_eq!(stage.cue(), Cue::Active);

        assert!(stage.handle_event(&CompletionEvent::animation_end(NODE, "fade")));
        let events = drain(&mut stage);
        assert_eq!(
            cues(&events),
            vec![Cue::Prepare, Cue::Start, Cue::Active, Cue::Done, Cue::None]
        );
        assert!(stage.outstanding().is_idle());
    }

    #[test]
    fn test_deadline_completes_once_despite_veto() {
        let handlers = fade().on(Status::Appear, Cue::Done, |_| CueOutcome::Veto);
        let (mut stage, ledger, _node) = stage_with(config().with_deadline_ms(500.0), handlers);
        stage.init(true);

        let mut elapsed = 0.0;
        let mut settled_at = None;
        let mut settled = Vec::new();
        for _ in 0..100 {
            stage.tick(16.0);
            elapsed += 16.0;
            let found = settles(&drain(&mut stage));
            if !found.is_empty() && settled_at.is_none() {
                settled_at = Some(elapsed);
            }
            settled.extend(found);
        }

        assert_eq!(settled, vec![true]);
        let at = settled_at.unwrap();
        assert!((500.0..=560.0).contains(&at), "settled at {at}");
        assert_eq!(ledger.active_count(), 0);
        assert!(stage.outstanding().is_idle());
    }

    #[test]
    fn test_event_wins_over_deadline() {
        let (mut stage, _ledger, _node) = stage_with(config().with_deadline_ms(100.0), fade());
        stage.init(true);
        stage.tick(16.0);
        assert!(stage.handle_event(&CompletionEvent::transition_end(NODE, "opacity")));

        for _ in 0..20 {
            stage.tick(16.0);
        }
        assert_eq!(settles(&drain(&mut stage)), vec![true]);
    }

    #[test]
    fn test_missing_node_aborts() {
        let ledger = Rc::new(ListenerLedger::new());
        let mut stage = Stage::new("orphan", config(), Rc::new(fade()), NodeRef::new(), ledger.clone());

        stage.init(true);
        assert!(stage.is_settled());
        assert!(stage.outstanding().is_idle());
        assert_eq!(settles(&drain(&mut stage)), vec![true]);
    }

    #[test]
    fn test_node_lost_before_active_aborts() {
        let (mut stage, ledger, node) = stage_with(config(), MotionHandlers::new());
        stage.init(true);
        assert_eq!(stage.cue(), Cue::Start);

        node.clear();
        stage.tick(16.0);
        assert!(stage.is_settled());
        assert_eq!(ledger.active_count(), 0);
    }

    #[test]
    fn test_pending_prepare() {
        struct Gate(Rc<Cell<bool>>);
        impl Future for Gate {
            type Output = ();
            fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
                if self.0.get() { Poll::Ready(()) } else { Poll::Pending }
            }
        }

        let gate = Rc::new(Cell::new(false));
        let open = gate.clone();
        let handlers = fade().on(Status::Appear, Cue::Prepare, move |_| {
            CueOutcome::pending(Gate(open.clone()))
        });
        let (mut stage, _ledger, _node) = stage_with(config(), handlers);

        stage.init(true);
        assert_eq!(stage.cue(), Cue::Prepare);
        assert!(stage.outstanding().prepare);

        for _ in 0..3 {
            stage.tick(16.0);
        }
        assert_eq!(stage.cue(), Cue::Prepare);

        gate.set(true);
        stage.tick(16.0);
        assert!(!stage.outstanding().prepare);
        assert_eq!(stage.outstanding().frames, 1);
        stage.tick(16.0);
        assert_eq!(stage.cue(), Cue::Start);
    }

    #[test]
    fn test_prepare_skip_and_proceed() {
        let handlers = fade()
            .on(Status::Appear, Cue::Prepare, |_| CueOutcome::Skip)
            .on(Status::Enter, Cue::Prepare, |_| CueOutcome::Proceed);
        let (mut stage, _ledger, _node) = stage_with(config(), handlers);

        stage.init(true);
        assert_eq!(stage.cue(), Cue::Start);

        stage.set_visible(false);
        stage.set_visible(true);
        assert_eq!(stage.status(), Status::Enter);
        assert_eq!(stage.cue(), Cue::Prepare);
        stage.tick(16.0);
        assert_eq!(stage.cue(), Cue::Start);
    }

    #[test]
    fn test_side_effect_prepare_waits_a_frame() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let handlers = fade().on(Status::Appear, Cue::Prepare, move |_| {
            counter.set(counter.get() + 1);
            ().into()
        });
        let (mut stage, _ledger, _node) = stage_with(MotionConfig::default(), handlers);

        stage.init(true);
        assert_eq!(calls.get(), 1);
        assert_eq!(stage.cue(), Cue::Prepare);
        assert!(stage.merged_style().is_none());
        assert_eq!(stage.outstanding().frames, 1);

        let frames = MotionConfig::default().frames_per_cue.max(1);
        for _ in 0..frames {
            stage.tick(16.0);
        }
        assert_eq!(stage.cue(), Cue::Start);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_flip_restarts_and_releases() {
        let (mut stage, ledger, _node) = stage_with(config().with_deadline_ms(500.0), fade());
        stage.init(true);
        stage.tick(16.0);
        assert_eq!(stage.cue(), Cue::Active);
        let before = stage.generation();

        stage.set_visible(false);
        assert_eq!(stage.status(), Status::Exit);
        assert_ne!(stage.generation(), before);
        assert_eq!(stage.outstanding().timers, 0);
        assert_eq!(stage.outstanding().watches, 0);
        assert_eq!(ledger.active_count(), 0);

        stage.set_visible(true);
        assert_eq!(stage.status(), Status::Enter);

        let events = drain(&mut stage);
        assert!(settles(&events).is_empty());
        let observed = cues(&events);
        for pair in observed.windows(2) {
            let forward = pair[1] == Cue::None || pair[1].ordinal() > pair[0].ordinal();
            assert!(forward, "cue went backwards: {pair:?}");
        }
    }

    #[test]
    fn test_dispose_releases_everything() {
        let (mut stage, ledger, _node) = stage_with(config().with_deadline_ms(200.0), fade());
        stage.init(true);
        stage.tick(16.0);
        drain(&mut stage);

        stage.dispose();
        stage.dispose();
        assert_eq!(ledger.active_count(), 0);
        assert!(stage.outstanding().is_idle());
        assert!(stage.is_disposed());

        for _ in 0..30 {
            stage.tick(16.0);
        }
        stage.set_visible(false);
        assert!(!stage.handle_event(&CompletionEvent::transition_end(NODE, "opacity")));
        assert!(!stage.has_pending_events());
    }

    #[test]
    fn test_reconfigure_drops_disabled_phase() {
        let (mut stage, _ledger, _node) = stage_with(config(), fade());
        stage.init(true);
        drain(&mut stage);

        stage.reconfigure(config().with_phases(true, true, false));
        assert_eq!(stage.status(), Status::Appear);

        stage.reconfigure(config().with_phases(false, true, true));
        assert!(stage.is_settled());
        assert!(stage.outstanding().is_idle());
        assert_eq!(settles(&drain(&mut stage)), vec![true]);
    }

    #[test]
    fn test_snapshot() {
        let (mut stage, _ledger, _node) = stage_with(config(), fade());
        stage.init(true);
        let snapshot = stage.snapshot();
        assert_eq!(snapshot.status, Status::Appear);
        assert_eq!(snapshot.cue, Cue::Start);
        assert!(snapshot.visible);
        assert!(snapshot.style.is_some());
    }
}
