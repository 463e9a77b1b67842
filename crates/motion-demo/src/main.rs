use std::collections::HashMap;
use std::rc::Rc;
use std::str::FromStr;

use anyhow::{Result, bail};
use rune_config::RuneConfig;
use rune_motion::{
    CompletionEvent, Cue, Key, ListEvent, ListenerLedger, MotionList, RenderDecision, StageEvent,
    presets,
};
use tracing::{Level, info};

/// Headless host: fires `transitionend` for every element some time after it
/// reaches its Active cue, the way a browser would once the CSS transition ends.
struct SimulatedHost {
    transition_ms: f32,
    now_ms: f32,
    due: HashMap<Key, f32>,
}

impl SimulatedHost {
    fn new(transition_ms: f32) -> Self {
        Self {
            transition_ms,
            now_ms: 0.0,
            due: HashMap::new(),
        }
    }

    fn observe(&mut self, event: &ListEvent) {
        match event {
            ListEvent::Stage {
                key,
                event: StageEvent::CueChanged { cue: Cue::Active, .. },
            } => {
                self.due.insert(key.clone(), self.now_ms + self.transition_ms);
            }
            ListEvent::Stage {
                key,
                event: StageEvent::Settled { .. },
            }
            | ListEvent::Removed { key } => {
                self.due.remove(key);
            }
            ListEvent::Stage { .. } => {}
        }
    }

    fn advance(&mut self, delta_ms: f32) -> Vec<Key> {
        self.now_ms += delta_ms;
        let now = self.now_ms;
        let mut finished: Vec<Key> = self
            .due
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        finished.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        for key in &finished {
            self.due.remove(key);
        }
        finished
    }
}

fn init_logging() {
    let level = std::env::var("RUNE_LOG")
        .ok()
        .and_then(|value| Level::from_str(&value).ok())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();
}

fn main() -> Result<()> {
    init_logging();

    let config = RuneConfig::load();
    let demo = config.demo.clone();
    if demo.frame_ms <= 0.0 {
        bail!("demo.frame_ms must be positive, got {}", demo.frame_ms);
    }
    info!(
        frame_ms = demo.frame_ms,
        transition_ms = demo.transition_ms,
        steps = demo.steps.len(),
        "starting motion demo"
    );

    let preset = presets::fade();
    let motion = preset.config(config.motion.clone());
    let (name, handlers) = preset.into_parts();

    let ledger = Rc::new(ListenerLedger::new());
    let mut list = MotionList::new(motion, handlers, ledger.clone());
    let mut host = SimulatedHost::new(demo.transition_ms);

    for (index, step) in demo.steps.iter().enumerate() {
        let keys: Vec<Key> = step.iter().map(|k| Key::from(k.as_str())).collect();
        println!("== step {index}: {step:?}");
        list.set_keys(&keys)?;

        let mut frames = 0;
        loop {
            for event in list.drain_events() {
                host.observe(&event);
                println!("  t={:>6.1}ms {}", host.now_ms, describe(&event));
            }
            if list.is_settled() || frames >= demo.max_frames {
                break;
            }

            list.tick(demo.frame_ms);
            for key in host.advance(demo.frame_ms) {
                let Some(node) = list.node_ref(&key).and_then(|r| r.get()) else {
                    continue;
                };
                list.handle_event(
                    &CompletionEvent::transition_end(node, "opacity")
                        .with_elapsed_ms(demo.transition_ms),
                );
            }
            frames += 1;
        }

        if !list.is_settled() {
            tracing::warn!(step = index, frames, "step did not settle");
        }

        for entry in list.entries() {
            let decision = list
                .stage(&entry.key)
                .map(|stage| RenderDecision::for_stage(stage, Some(&name)));
            println!("  {:<8} {:?} -> {:?}", entry.key.as_str(), entry.status, decision);
        }
    }

    list.dispose();
    info!(listeners = ledger.active_count(), "demo finished");
    Ok(())
}

fn describe(event: &ListEvent) -> String {
    match event {
        ListEvent::Stage {
            key,
            event: StageEvent::CueChanged { status, cue },
        } => format!("{key}: {status}/{cue}"),
        ListEvent::Stage {
            key,
            event: StageEvent::Settled { visible },
        } => format!("{key}: settled visible={visible}"),
        ListEvent::Removed { key } => format!("{key}: removed"),
    }
}
