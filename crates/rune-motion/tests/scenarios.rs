//! End-to-end behaviour of lists and stages driven by a simulated host.

use std::rc::Rc;

use anyhow::Result;
use rune_motion::{
    CompletionEvent, Cue, Key, KeyEntry, KeyStatus, ListEvent, ListenerLedger, MotionConfig,
    MotionHandlers, MotionList, NodeId, NodeRef, Stage, StageEvent, Status, Style, diff,
};

const FRAME_MS: f32 = 16.0;

fn keys(list: &[&str]) -> Vec<Key> {
    list.iter().map(|k| Key::from(*k)).collect()
}

fn summary(entries: &[KeyEntry]) -> Vec<(String, KeyStatus)> {
    entries
        .iter()
        .map(|e| (e.key.to_string(), e.status))
        .collect()
}

fn opacity_handlers() -> MotionHandlers {
    let mut handlers = MotionHandlers::new();
    for status in [Status::Appear, Status::Enter] {
        handlers.set(status, Cue::Start, |_| Style::new().with("opacity", 0).into());
        handlers.set(status, Cue::Active, |_| Style::new().with("opacity", 1).into());
    }
    handlers.set(Status::Exit, Cue::Start, |_| Style::new().with("opacity", 1).into());
    handlers.set(Status::Exit, Cue::Active, |_| Style::new().with("opacity", 0).into());
    handlers
}

/// Valid cue successions for a single element.
fn assert_cue_order(cues: &[Cue]) {
    let mut previous = Cue::None;
    for &cue in cues {
        assert_ne!(cue, previous, "cue repeated: {cues:?}");
        let forward = cue == Cue::None || cue.ordinal() > previous.ordinal();
        assert!(forward, "cue moved backwards from {previous} to {cue}: {cues:?}");
        previous = cue;
    }
}

fn stage_cues(events: &[StageEvent]) -> Vec<Cue> {
    events
        .iter()
        .filter_map(|event| match event {
            StageEvent::CueChanged { cue, .. } => Some(*cue),
            StageEvent::Settled { .. } => None,
        })
        .collect()
}

#[test]
fn test_scenario_a_middle_key_removed() {
    let previous = vec![
        KeyEntry::new("a", KeyStatus::Keep),
        KeyEntry::new("b", KeyStatus::Keep),
        KeyEntry::new("c", KeyStatus::Keep),
    ];
    let result = diff(&previous, &keys(&["a", "c"]));
    assert_eq!(
        summary(&result),
        vec![
            ("a".into(), KeyStatus::Keep),
            ("b".into(), KeyStatus::Remove),
            ("c".into(), KeyStatus::Keep),
        ]
    );
}

#[test]
fn test_scenario_b_all_added() {
    let result = diff(&[], &keys(&["x", "y"]));
    assert_eq!(
        summary(&result),
        vec![("x".into(), KeyStatus::Add), ("y".into(), KeyStatus::Add)]
    );
}

#[test]
fn test_scenario_c_exiting_key_reappears() -> Result<()> {
    let ledger = Rc::new(ListenerLedger::new());
    let config = MotionConfig::default().with_frames_per_cue(1);
    let mut list = MotionList::new(config, Rc::new(opacity_handlers()), ledger.clone());

    list.set_keys(&keys(&["p", "q"]))?;
    for _ in 0..3 {
        list.tick(FRAME_MS);
    }

    list.set_keys(&keys(&["q"]))?;
    let p = Key::from("p");
    let generation_before = list.stage(&p).map(Stage::generation);
    assert_eq!(list.stage(&p).map(Stage::status), Some(Status::Exit));
    list.tick(FRAME_MS);
    assert_eq!(list.stage(&p).map(Stage::cue), Some(Cue::Active));

    list.set_keys(&keys(&["p", "q"]))?;
    assert_eq!(
        summary(list.entries()),
        vec![("p".into(), KeyStatus::Keep), ("q".into(), KeyStatus::Keep)]
    );
    assert_eq!(list.stage_count(), 2);

    let stage = list.stage(&p).ok_or_else(|| anyhow::anyhow!("stage for p was recreated"))?;
    assert_eq!(stage.status(), Status::Enter);
    assert!(stage.target_visible() == Some(true));
    assert_ne!(Some(stage.generation()), generation_before);

    let removed = list
        .drain_events()
        .filter(|e| matches!(e, ListEvent::Removed { .. }))
        .count();
    assert_eq!(removed, 0);
    Ok(())
}

#[test]
fn test_scenario_d_rapid_flips_converge() {
    let ledger = Rc::new(ListenerLedger::new());
    let node = NodeRef::bound(NodeId(5));
    let config = MotionConfig::default().with_deadline_ms(300.0);
    let mut stage = Stage::new(
        "flip",
        config,
        Rc::new(opacity_handlers()),
        node,
        ledger.clone(),
    );

    stage.init(true);
    stage.tick(FRAME_MS);
    stage.set_visible(false);
    stage.tick(FRAME_MS);
    stage.set_visible(true);

    for _ in 0..60 {
        stage.tick(FRAME_MS);
    }

    assert!(stage.is_settled());
    assert_eq!(stage.cue(), Cue::None);
    assert!(stage.effective_visible());
    assert!(stage.outstanding().is_idle());
    assert_eq!(ledger.active_count(), 0);

    let events: Vec<_> = stage.drain_events().collect();
    assert_cue_order(&stage_cues(&events));
    let settles: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            StageEvent::Settled { visible } => Some(*visible),
            StageEvent::CueChanged { .. } => None,
        })
        .collect();
    assert_eq!(settles, vec![true]);
}

#[test]
fn test_scenario_e_deadline_fires_once() {
    let ledger = Rc::new(ListenerLedger::new());
    let config = MotionConfig::default()
        .with_deadline_ms(500.0)
        .with_frames_per_cue(1);
    let mut stage = Stage::new(
        "deadline",
        config,
        Rc::new(opacity_handlers()),
        NodeRef::bound(NodeId(9)),
        ledger.clone(),
    );

    stage.init(true);
    let mut now = 0.0;
    let mut settled_at = Vec::new();
    while now < 2000.0 {
        stage.tick(FRAME_MS);
        now += FRAME_MS;
        for event in stage.drain_events() {
            if event.is_settled() {
                settled_at.push(now);
            }
        }
    }

    assert_eq!(settled_at.len(), 1, "settled at {settled_at:?}");
    assert!((500.0..=500.0 + 4.0 * FRAME_MS).contains(&settled_at[0]));
    assert_eq!(ledger.active_count(), 0);
}

#[test]
fn test_list_exit_then_purge() -> Result<()> {
    let ledger = Rc::new(ListenerLedger::new());
    let config = MotionConfig::default().with_frames_per_cue(1);
    let mut list = MotionList::new(config, Rc::new(opacity_handlers()), ledger.clone());

    list.set_keys(&keys(&["a", "b", "c"]))?;
    for _ in 0..2 {
        list.tick(FRAME_MS);
    }
    for key in keys(&["a", "b", "c"]) {
        if let Some(node) = list.node_ref(&key).and_then(|r| r.get()) {
            list.handle_event(&CompletionEvent::transition_end(node, "opacity"));
        }
    }
    assert!(list.is_settled());

    list.set_keys(&keys(&["a", "c"]))?;
    assert_eq!(list.rendered_keys(), keys(&["a", "b", "c"]));
    for _ in 0..2 {
        list.tick(FRAME_MS);
    }
    let b = Key::from("b");
    let node = list
        .node_ref(&b)
        .and_then(|r| r.get())
        .ok_or_else(|| anyhow::anyhow!("b has no node"))?;
    assert!(list.handle_event(&CompletionEvent::transition_end(node, "opacity")));

    let events: Vec<_> = list.drain_events().collect();
    assert!(events.contains(&ListEvent::Removed { key: b.clone() }));
    assert!(events.contains(&ListEvent::Stage {
        key: b.clone(),
        event: StageEvent::Settled { visible: false },
    }));
    assert_eq!(list.rendered_keys(), keys(&["a", "c"]));

    list.set_keys(&keys(&["a", "c"]))?;
    assert!(list.stage(&b).is_none());
    assert_eq!(
        summary(list.entries()),
        vec![("a".into(), KeyStatus::Keep), ("c".into(), KeyStatus::Keep)]
    );

    list.dispose();
    assert_eq!(ledger.active_count(), 0);
    Ok(())
}

#[test]
fn test_cue_order_per_key_in_busy_list() -> Result<()> {
    let ledger = Rc::new(ListenerLedger::new());
    let config = MotionConfig::default().with_deadline_ms(120.0);
    let mut list = MotionList::new(config, Rc::new(opacity_handlers()), ledger.clone());

    let steps = [
        keys(&["a", "b", "c"]),
        keys(&["a", "c"]),
        keys(&["c", "a", "d"]),
        keys(&["b"]),
        keys(&["b", "a"]),
    ];
    let mut events = Vec::new();
    for step in &steps {
        list.set_keys(step)?;
        for _ in 0..3 {
            list.tick(FRAME_MS);
        }
        events.extend(list.drain_events());
    }
    for _ in 0..40 {
        list.tick(FRAME_MS);
    }
    events.extend(list.drain_events());

    for key in keys(&["a", "b", "c", "d"]) {
        let cues: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                ListEvent::Stage {
                    key: k,
                    event: StageEvent::CueChanged { cue, .. },
                } if *k == key => Some(*cue),
                _ => None,
            })
            .collect();
        assert_cue_order(&cues);
    }

    assert!(list.is_settled());
    assert_eq!(ledger.active_count(), 0);
    Ok(())
}
