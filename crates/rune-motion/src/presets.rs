//! Stock handler sets for common motions.

use std::rc::Rc;

use rune_config::MotionConfig;

use super::handlers::{CueCall, CueOutcome, MotionHandlers};
use super::render::MotionName;
use super::types::{Cue, NodeId, Status, Style};

/// Default deadline of the stock motions.
pub const PRESET_DEADLINE_MS: f32 = 500.0;

/// Handlers plus the naming and deadline they were designed for.
#[derive(Debug)]
pub struct Preset {
    pub name: MotionName,
    pub handlers: MotionHandlers,
    pub deadline_ms: f32,
}

impl Preset {
    /// `base` with this preset's deadline applied.
    pub fn config(&self, base: MotionConfig) -> MotionConfig {
        base.with_deadline_ms(self.deadline_ms)
    }

    pub fn into_parts(self) -> (MotionName, Rc<MotionHandlers>) {
        (self.name, Rc::new(self.handlers))
    }
}

/// Layout measurements a host reports for a node.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Extent {
    /// Full content height.
    pub scroll_height: f32,
    /// Currently laid-out height.
    pub offset_height: f32,
}

fn opacity(value: u8) -> Style {
    Style::new().with("opacity", value)
}

/// Opacity fade for appear, enter and exit.
pub fn fade() -> Preset {
    let mut handlers = MotionHandlers::new();
    for status in [Status::Appear, Status::Enter] {
        handlers.set(status, Cue::Start, |_| opacity(0).into());
        handlers.set(status, Cue::Active, |_| opacity(1).into());
    }
    handlers.set(Status::Exit, Cue::Start, |_| opacity(1).into());
    handlers.set(Status::Exit, Cue::Active, |_| opacity(0).into());

    Preset {
        name: MotionName::prefix("fade"),
        handlers,
        deadline_ms: PRESET_DEADLINE_MS,
    }
}

/// Horizontal slide from the right edge, used by toast-like notifications.
pub fn slide_in_right() -> Preset {
    let hide = || Style::new().with("transform", "translate3d(100%, 0, 0)");
    let show = || Style::new().with("transform", "translate3d(0, 0, 0)");

    let handlers = MotionHandlers::new()
        .on(Status::Appear, Cue::Start, move |_| hide().into())
        .on(Status::Appear, Cue::Active, move |_| show().into())
        .on(Status::Exit, Cue::Start, move |_| show().into())
        .on(Status::Exit, Cue::Active, move |_| hide().into());

    Preset {
        name: MotionName::prefix("notification"),
        handlers,
        deadline_ms: PRESET_DEADLINE_MS,
    }
}

/// CSS length in pixels.
fn px(value: f32) -> String {
    format!("{value}px")
}

/// Height collapse for drawers and navigation menus.
///
/// `measure` reports the node's extent when a cue needs real heights. Only
/// the `height` transition completes the phase; the parallel opacity
/// transition is ignored.
pub fn collapse(measure: impl Fn(NodeId) -> Extent + 'static) -> Preset {
    let measure = Rc::new(measure);
    let collapsed = || Style::new().with("height", 0).with("opacity", 0);
    let height_only = |call: CueCall<'_>| -> CueOutcome {
        (call.deadline || call.property_name() == Some("height")).into()
    };

    let full = measure.clone();
    let current = measure;
    let handlers = MotionHandlers::new()
        .on(Status::Enter, Cue::Start, move |_| collapsed().into())
        .on(Status::Enter, Cue::Active, move |call| {
            let extent = full(call.node);
            Style::new()
                .with("height", px(extent.scroll_height))
                .with("opacity", 1)
                .into()
        })
        .on(Status::Enter, Cue::Done, height_only)
        .on(Status::Exit, Cue::Start, move |call| {
            Style::new()
                .with("height", px(current(call.node).offset_height))
                .into()
        })
        .on(Status::Exit, Cue::Active, move |_| collapsed().into())
        .on(Status::Exit, Cue::Done, height_only);

    Preset {
        name: MotionName::prefix("motion"),
        handlers,
        deadline_ms: PRESET_DEADLINE_MS,
    }
}
