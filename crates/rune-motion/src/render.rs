//! Render decision: what the view layer should draw for a stage this frame.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::stage::Stage;
use super::types::{Cue, Status, Style};

/// Class naming for a motion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MotionName {
    /// `fade` yields `fade-enter`, `fade-enter-active` and so on.
    Prefix(String),
    /// Explicit classes keyed by camel-cased transition type
    /// (`enter`, `enterActive`, `exitStart`, ...).
    Classes(BTreeMap<String, String>),
}

impl MotionName {
    pub fn prefix(name: impl Into<String>) -> Self {
        Self::Prefix(name.into())
    }

    /// Class for a transition type such as `exit` or `exit-start`.
    pub fn class_for(&self, transition: &str) -> Option<String> {
        match self {
            Self::Prefix(name) => Some(format!("{name}-{transition}")),
            Self::Classes(classes) => classes.get(&camel_key(transition)).cloned(),
        }
    }
}

/// `enter-active` to `enterActive`.
fn camel_key(transition: &str) -> String {
    let mut key = String::with_capacity(transition.len());
    let mut upper = false;
    for ch in transition.chars() {
        if ch == '-' {
            upper = true;
        } else if upper {
            key.extend(ch.to_uppercase());
            upper = false;
        } else {
            key.push(ch);
        }
    }
    key
}

impl From<&str> for MotionName {
    fn from(name: &str) -> Self {
        Self::Prefix(name.to_string())
    }
}

/// Class suffix for a cue, if it carries one.
pub fn cue_suffix(cue: Cue) -> Option<&'static str> {
    match cue {
        Cue::Prepare => Some("prepare"),
        Cue::Start => Some("start"),
        Cue::Active | Cue::Done => Some("active"),
        Cue::None => None,
    }
}

/// Class list for an element in `status` at `cue`.
pub fn class_names(name: &MotionName, status: Status, cue: Cue) -> Vec<String> {
    if status.is_none() {
        return Vec::new();
    }
    let mut classes = Vec::with_capacity(3);
    if let Some(class) = name.class_for(status.as_str()) {
        classes.push(class);
    }
    if let Some(suffix) = cue_suffix(cue) {
        if let Some(class) = name.class_for(&format!("{status}-{suffix}")) {
            classes.push(class);
        }
    }
    if let MotionName::Prefix(prefix) = name {
        classes.push(prefix.clone());
    }
    classes
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderDecision {
    /// Render nothing.
    Nothing,
    /// Render the element as-is.
    Plain,
    /// Render the element mid-transition.
    Animating {
        class_names: Vec<String>,
        style: Option<Style>,
    },
    /// Keep a hidden element around with its exited class.
    Exited { class_name: Option<String> },
    /// Keep the element mounted but hidden.
    Placeholder { style: Style },
}

impl RenderDecision {
    pub fn for_stage(stage: &Stage, name: Option<&MotionName>) -> Self {
        let config = stage.config();
        let motion = name.filter(|_| config.enabled);

        match motion {
            Some(name) if !stage.status().is_none() => Self::Animating {
                class_names: class_names(name, stage.status(), stage.cue()),
                style: stage.merged_style(),
            },
            _ if stage.effective_visible() => Self::Plain,
            _ if !config.remove_on_exit && stage.has_rendered() => Self::Exited {
                class_name: config.exited_class_name.clone(),
            },
            _ if config.force_render => Self::Placeholder {
                style: Style::new().with("display", "none"),
            },
            _ => Self::Nothing,
        }
    }

    pub fn is_rendered(&self) -> bool {
        !matches!(self, Self::Nothing)
    }
}
