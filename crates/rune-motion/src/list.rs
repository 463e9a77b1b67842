//! Keyed list orchestration.
//!
//! [`MotionList`] reconciles a desired key order against the previous pass and
//! keeps exactly one [`Stage`] per live key. Keys that drop out keep rendering
//! while their exit runs, are promoted to `Removed` once it settles, and are
//! purged together with their stage on the following reconciliation.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use rune_config::MotionConfig;
use tracing::{debug, trace, warn};

use super::error::{MotionError, Result};
use super::events::{EventQueue, ListEvent, StageEvent};
use super::handlers::MotionHandlers;
use super::keys::{KeyEntry, KeyStatus, diff, find_duplicate};
use super::stage::Stage;
use super::types::{Key, NodeId, NodeRef};
use super::watcher::{CompletionEvent, ListenerRegistry};

type Mounter = Box<dyn FnMut(&Key) -> Option<NodeId>>;

/// Ordered set of animated elements keyed by [`Key`].
pub struct MotionList {
    config: MotionConfig,
    handlers: Rc<MotionHandlers>,
    listeners: Rc<dyn ListenerRegistry>,
    mount: Mounter,
    entries: Vec<KeyEntry>,
    stages: HashMap<Key, Stage>,
    events: EventQueue<ListEvent>,
    disposed: bool,
}

impl std::fmt::Debug for MotionList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotionList")
            .field("entries", &self.entries)
            .field("stages", &self.stages.len())
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl MotionList {
    /// Create an empty list. Nodes are assigned sequential ids until
    /// [`with_mounter`](Self::with_mounter) installs a host resolver.
    pub fn new(
        config: MotionConfig,
        handlers: Rc<MotionHandlers>,
        listeners: Rc<dyn ListenerRegistry>,
    ) -> Self {
        let mut next_id = 0;
        Self {
            config,
            handlers,
            listeners,
            mount: Box::new(move |_: &Key| {
                next_id += 1;
                Some(NodeId(next_id))
            }),
            entries: Vec::new(),
            stages: HashMap::new(),
            events: EventQueue::new(),
            disposed: false,
        }
    }

    /// Resolve the node of a newly rendered key. `None` leaves its ref unbound.
    pub fn with_mounter(mut self, mount: impl FnMut(&Key) -> Option<NodeId> + 'static) -> Self {
        self.mount = Box::new(mount);
        self
    }

    /// Reconcile against a new desired key order.
    pub fn set_keys(&mut self, next: &[Key]) -> Result<()> {
        if self.disposed {
            return Err(MotionError::Disposed);
        }
        if let Some(duplicate) = find_duplicate(next) {
            warn!(key = %duplicate, "duplicate key in desired list");
            return Err(MotionError::DuplicateKey(duplicate.clone()));
        }

        let previous = std::mem::take(&mut self.entries);
        let exited: HashSet<&Key> = previous
            .iter()
            .filter(|entry| entry.status == KeyStatus::Removed)
            .map(|entry| &entry.key)
            .collect();

        let mut entries = diff(&previous, next);
        let mut purged = Vec::new();
        entries.retain(|entry| {
            let purge = entry.status == KeyStatus::Remove && exited.contains(&entry.key);
            if purge {
                purged.push(entry.key.clone());
            }
            !purge
        });

        for key in purged {
            if let Some(mut stage) = self.stages.remove(&key) {
                stage.dispose();
            }
            debug!(%key, "purged");
        }

        for entry in &entries {
            let visible = entry.status.is_visible();
            match self.stages.get_mut(&entry.key) {
                Some(stage) => stage.set_visible(visible),
                None if visible => {
                    let node = NodeRef::new();
                    if let Some(id) = (self.mount)(&entry.key) {
                        node.bind(id);
                    }
                    let mut stage = Stage::new(
                        entry.key.as_str(),
                        self.config.clone(),
                        self.handlers.clone(),
                        node,
                        self.listeners.clone(),
                    );
                    stage.init(true);
                    trace!(key = %entry.key, "stage created");
                    self.stages.insert(entry.key.clone(), stage);
                }
                None => {}
            }
        }

        self.entries = entries;
        self.collect();
        Ok(())
    }

    /// Advance every stage by one paint frame.
    pub fn tick(&mut self, delta_ms: f32) {
        if self.disposed {
            return;
        }
        for entry in &self.entries {
            if let Some(stage) = self.stages.get_mut(&entry.key) {
                stage.tick(delta_ms);
            }
        }
        self.collect();
    }

    /// Route a completion signal to the stage bound to its target.
    pub fn handle_event(&mut self, event: &CompletionEvent) -> bool {
        if self.disposed {
            return false;
        }
        let Some(key) = self.key_for_node(event.target) else {
            return false;
        };
        let handled = self
            .stages
            .get_mut(&key)
            .is_some_and(|stage| stage.handle_event(event));
        self.collect();
        handled
    }

    /// Swap the configuration of the list and every stage in it.
    pub fn reconfigure(&mut self, config: MotionConfig) {
        for stage in self.stages.values_mut() {
            stage.reconfigure(config.clone());
        }
        self.config = config;
        self.collect();
    }

    /// Dispose every stage. Later `set_keys` calls fail.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        for stage in self.stages.values_mut() {
            stage.dispose();
        }
        self.stages.clear();
        self.entries.clear();
        self.events.clear();
        self.disposed = true;
        debug!("motion list disposed");
    }

    pub fn entries(&self) -> &[KeyEntry] {
        &self.entries
    }

    pub fn stage(&self, key: &Key) -> Option<&Stage> {
        self.stages.get(key)
    }

    pub fn node_ref(&self, key: &Key) -> Option<NodeRef> {
        self.stages.get(key).map(|stage| stage.node_ref().clone())
    }

    pub fn key_for_node(&self, node: NodeId) -> Option<Key> {
        self.entries
            .iter()
            .find(|entry| {
                self.stages
                    .get(&entry.key)
                    .is_some_and(|stage| stage.node_ref().get() == Some(node))
            })
            .map(|entry| entry.key.clone())
    }

    /// Keys whose elements should currently be rendered, in list order.
    pub fn rendered_keys(&self) -> Vec<Key> {
        self.entries
            .iter()
            .filter(|entry| {
                self.stages
                    .get(&entry.key)
                    .is_some_and(Stage::effective_visible)
            })
            .map(|entry| entry.key.clone())
            .collect()
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// No stage has a phase in flight.
    pub fn is_settled(&self) -> bool {
        self.stages.values().all(Stage::is_settled)
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = ListEvent> + '_ {
        self.events.drain()
    }

    /// Forward stage events, promoting finished exits to `Removed`.
    fn collect(&mut self) {
        for entry in self.entries.iter_mut() {
            let Some(stage) = self.stages.get_mut(&entry.key) else {
                continue;
            };
            if !stage.has_pending_events() {
                continue;
            }
            for event in stage.drain_events() {
                let exited = matches!(event, StageEvent::Settled { visible: false });
                self.events.push(ListEvent::Stage {
                    key: entry.key.clone(),
                    event,
                });
                if exited && entry.status == KeyStatus::Remove {
                    entry.status = KeyStatus::Removed;
                    debug!(key = %entry.key, "exit finished");
                    self.events.push(ListEvent::Removed {
                        key: entry.key.clone(),
                    });
                }
            }
        }
    }
}
