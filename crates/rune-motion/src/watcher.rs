//! Completion-signal subscriptions.
//!
//! An [`EventWatcher`] keeps one element subscribed to the platform's
//! `transitionend` / `animationend` signals through a [`ListenerRegistry`],
//! follows the element when the bound node changes, and acts as the one-shot
//! guard that lets exactly one completion (real event or deadline) through.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::types::{Generation, NodeId, NodeRef};

/// Kind of native completion signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndEventKind {
    TransitionEnd,
    AnimationEnd,
}

impl EndEventKind {
    pub const ALL: [EndEventKind; 2] = [EndEventKind::TransitionEnd, EndEventKind::AnimationEnd];

    /// Platform event name.
    pub fn event_name(self) -> &'static str {
        match self {
            Self::TransitionEnd => "transitionend",
            Self::AnimationEnd => "animationend",
        }
    }
}

/// A native completion signal delivered by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEvent {
    /// Node the signal was dispatched on.
    pub target: NodeId,
    pub kind: EndEventKind,
    /// `propertyName` for transitions, `animationName` for animations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_name: Option<String>,
    #[serde(default)]
    pub elapsed_ms: f32,
}

impl CompletionEvent {
    pub fn transition_end(target: NodeId, property_name: impl Into<String>) -> Self {
        Self {
            target,
            kind: EndEventKind::TransitionEnd,
            property_name: Some(property_name.into()),
            elapsed_ms: 0.0,
        }
    }

    pub fn animation_end(target: NodeId, animation_name: impl Into<String>) -> Self {
        Self {
            target,
            kind: EndEventKind::AnimationEnd,
            property_name: Some(animation_name.into()),
            elapsed_ms: 0.0,
        }
    }

    pub fn with_elapsed_ms(mut self, elapsed_ms: f32) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    pub fn property_name(&self) -> Option<&str> {
        self.property_name.as_deref()
    }
}

/// Host seam for registering completion listeners on platform nodes.
pub trait ListenerRegistry {
    fn add_listener(&self, node: NodeId, kind: EndEventKind);
    fn remove_listener(&self, node: NodeId, kind: EndEventKind);
}

/// Counting registry for headless hosts and tests.
#[derive(Debug, Default)]
pub struct ListenerLedger {
    active: RefCell<HashMap<(NodeId, EndEventKind), usize>>,
}

impl ListenerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total listeners currently registered.
    pub fn active_count(&self) -> usize {
        self.active.borrow().values().sum()
    }

    pub fn is_listening(&self, node: NodeId, kind: EndEventKind) -> bool {
        self.active.borrow().contains_key(&(node, kind))
    }

    /// Nodes with at least one listener.
    pub fn listening_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self.active.borrow().keys().map(|(node, _)| *node).collect();
        nodes.sort_by_key(|n| n.0);
        nodes.dedup();
        nodes
    }
}

impl ListenerRegistry for ListenerLedger {
    fn add_listener(&self, node: NodeId, kind: EndEventKind) {
        *self.active.borrow_mut().entry((node, kind)).or_default() += 1;
    }

    fn remove_listener(&self, node: NodeId, kind: EndEventKind) {
        let mut active = self.active.borrow_mut();
        if let Some(count) = active.get_mut(&(node, kind)) {
            *count -= 1;
            if *count == 0 {
                active.remove(&(node, kind));
            }
        }
    }
}

/// Handle of one watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatchHandle(u64);

#[derive(Debug)]
struct Subscription {
    handle: WatchHandle,
    target: NodeId,
    generation: Generation,
    completed: bool,
}

/// Subscribes one element to completion signals with exactly-once completion.
pub struct EventWatcher {
    registry: Rc<dyn ListenerRegistry>,
    subscription: Option<Subscription>,
    next_id: u64,
}

impl std::fmt::Debug for EventWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventWatcher")
            .field("subscription", &self.subscription)
            .finish_non_exhaustive()
    }
}

impl EventWatcher {
    pub fn new(registry: Rc<dyn ListenerRegistry>) -> Self {
        Self {
            registry,
            subscription: None,
            next_id: 1,
        }
    }

    /// Subscribe to the node currently bound in `node_ref`.
    ///
    /// Any previous watch is released first. Returns `None` when no node is
    /// bound, leaving the watcher idle.
    pub fn watch(&mut self, node_ref: &NodeRef, generation: Generation) -> Option<WatchHandle> {
        self.release();
        let target = node_ref.get()?;

        let handle = WatchHandle(self.next_id);
        self.next_id += 1;
        self.attach(target);
        self.subscription = Some(Subscription {
            handle,
            target,
            generation,
            completed: false,
        });
        Some(handle)
    }

    /// Follow the node bound in `node_ref`, moving listeners if it changed.
    ///
    /// An empty ref keeps the current subscription.
    pub fn sync(&mut self, node_ref: &NodeRef) {
        let Some(node) = node_ref.get() else {
            return;
        };
        let Some(previous) = self.subscription.as_ref().map(|s| s.target) else {
            return;
        };
        if previous == node {
            return;
        }
        self.detach(previous);
        self.attach(node);
        if let Some(subscription) = self.subscription.as_mut() {
            subscription.target = node;
        }
    }

    /// Release a watch. Stale or repeated handles are ignored.
    pub fn unwatch(&mut self, handle: WatchHandle) -> bool {
        match &self.subscription {
            Some(subscription) if subscription.handle == handle => {
                self.release();
                true
            }
            _ => false,
        }
    }

    /// Whether `event` is a completion this watch should react to.
    pub fn accepts(&self, event: &CompletionEvent) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(|s| !s.completed && s.target == event.target)
    }

    /// Consume the one-shot. Only the first call for a live watch returns `true`.
    pub fn complete(&mut self, generation: Generation) -> bool {
        match self.subscription.as_mut() {
            Some(subscription) if !subscription.completed && subscription.generation == generation => {
                subscription.completed = true;
                true
            }
            _ => false,
        }
    }

    pub fn is_watching(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn target(&self) -> Option<NodeId> {
        self.subscription.as_ref().map(|s| s.target)
    }

    fn release(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            self.detach(subscription.target);
        }
    }

    fn attach(&self, node: NodeId) {
        for kind in EndEventKind::ALL {
            self.registry.add_listener(node, kind);
        }
    }

    fn detach(&self, node: NodeId) {
        for kind in EndEventKind::ALL {
            self.registry.remove_listener(node, kind);
        }
    }
}

impl Drop for EventWatcher {
    fn drop(&mut self) {
        self.release();
    }
}
