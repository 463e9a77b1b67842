//! Core motion types and data structures.
//!
//! This module defines the fundamental types shared by the engine:
//! - `Status`: which transition family governs an element
//! - `Cue`: position within the active phase
//! - `Generation`: cancellation token for deferred work
//! - `Key`, `NodeId`, `NodeRef`: element identity and platform node binding
//! - `Style`: the style snapshot handed back to the view layer

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// CSS property name used to pin transitions off during the Start cue.
pub const TRANSITION_PROPERTY: &str = "transition";

/// Transition family currently governing an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// No phase is running.
    #[default]
    None,
    /// First show of a freshly mounted element.
    Appear,
    /// Show of an already mounted element.
    Enter,
    /// Hide.
    Exit,
}

impl Status {
    /// Lowercase name used to build class names.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Appear => "appear",
            Self::Enter => "enter",
            Self::Exit => "exit",
        }
    }

    pub fn is_none(self) -> bool {
        self == Self::None
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-step within a phase.
///
/// Cues only ever move forward along `None → Prepare → Start → Active → Done → None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    #[default]
    None,
    Prepare,
    Start,
    Active,
    Done,
}

impl Cue {
    /// The cue that follows this one in the cycle.
    pub fn next(self) -> Self {
        match self {
            Self::None => Self::Prepare,
            Self::Prepare => Self::Start,
            Self::Start => Self::Active,
            Self::Active => Self::Done,
            Self::Done => Self::None,
        }
    }

    /// Position in the cycle, `None` being 0.
    pub fn ordinal(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Prepare => 1,
            Self::Start => 2,
            Self::Active => 3,
            Self::Done => 4,
        }
    }

    /// Completion signals are only honoured once the phase is active.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active | Self::Done)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Prepare => "prepare",
            Self::Start => "start",
            Self::Active => "active",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monotonic counter tagging every deferred callback of one element.
///
/// Bumping the generation turns every outstanding callback into a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Generation(pub u64);

impl Generation {
    pub fn bump(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }
}

/// Stable identifier of one list member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for Key {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Opaque handle of a platform node (a DOM element in browsers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// Shared slot the view layer binds its node into.
///
/// Clones share the same slot, so the engine always resolves the node that is
/// bound right now. The slot may be empty while the view is between renders.
#[derive(Debug, Clone, Default)]
pub struct NodeRef(Rc<Cell<Option<NodeId>>>);

impl NodeRef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ref already bound to `node`.
    pub fn bound(node: NodeId) -> Self {
        let node_ref = Self::new();
        node_ref.bind(node);
        node_ref
    }

    pub fn bind(&self, node: NodeId) {
        self.0.set(Some(node));
    }

    pub fn clear(&self) {
        self.0.set(None);
    }

    /// Resolve the currently bound node.
    pub fn get(&self) -> Option<NodeId> {
        self.0.get()
    }

    pub fn is_bound(&self) -> bool {
        self.0.get().is_some()
    }
}

/// Style snapshot: CSS property name to value, ordered by name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Style(BTreeMap<String, String>);

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, property: impl Into<String>, value: impl ToString) -> Self {
        self.set(property, value);
        self
    }

    pub fn set(&mut self, property: impl Into<String>, value: impl ToString) {
        self.0.insert(property.into(), value.to_string());
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.0.get(property).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `transition: none`, used to force a style flush before the real transition.
    pub fn transition_none() -> Self {
        Self::new().with(TRANSITION_PROPERTY, "none")
    }

    /// Layer `top` over `self`; properties of `top` win.
    pub fn merged_with(mut self, top: &Style) -> Self {
        for (property, value) in &top.0 {
            self.0.insert(property.clone(), value.clone());
        }
        self
    }
}
