//! Activation scenarios: first entry, idempotence, reset round-trips and
//! hook failure routing, run against both strategies where they differ.

use crate::activation::{Frame, Passthrough, Status};
use crate::config::{LazyConfig, Mode};
use crate::host::SimElement;
use crate::model::{HookError, HookPhase, LoadHookError};
use crate::test_harness::{names, observer_config, polling_config, Harness, HookBehavior};
use std::cell::RefCell;
use std::rc::Rc;

fn both_strategies() -> [(&'static str, LazyConfig); 2] {
    [("polling", polling_config()), ("observer", observer_config())]
}

#[test]
fn element_below_fold_loads_when_top_edge_reaches_viewport_bottom() {
    for (strategy, config) in both_strategies() {
        // GIVEN an element whose top edge is 400px below the fold
        let mut h = Harness::new();
        let el = h.add(SimElement::new("lazy", 0.0, 1000.0, 200.0, 100.0));
        let machine = h.machine(config, h.recording_hooks());
        machine.mount(el);
        h.settle();
        assert_eq!(h.statuses(), names(&[Status::Unload]), "{strategy}");

        // WHEN scrolling one pixel short of the edge
        h.scroll_to(399.0);
        assert_eq!(machine.status(), Status::Unload, "{strategy}");

        // AND then exactly onto the edge
        h.scroll_to(400.0);

        // THEN one full load cycle runs
        assert_eq!(
            h.statuses(),
            names(&[Status::Unload, Status::Loading, Status::Loaded]),
            "{strategy}"
        );
        assert_eq!(h.log.count("on_loading"), 1, "{strategy}");
        assert_eq!(h.log.count("on_loaded"), 1, "{strategy}");
        assert_eq!(machine.active_subscriptions(), 0, "{strategy}");
    }
}

#[test]
fn element_in_view_at_mount_loads_without_scrolling() {
    for (strategy, config) in both_strategies() {
        let mut h = Harness::new();
        let el = h.add(SimElement::new("lazy", 0.0, 100.0, 200.0, 100.0));
        let machine = h.machine(config, h.recording_hooks());
        machine.mount(el);
        h.settle();
        assert_eq!(machine.status(), Status::Loaded, "{strategy}");
    }
}

#[test]
fn repeated_enter_viewport_runs_one_hook_cycle() {
    let mut h = Harness::new();
    let el = h.add(SimElement::new("lazy", 0.0, 0.0, 100.0, 100.0));
    let hooks = crate::activation::Hooks::new()
        .on_loading(h.hook("on_loading", HookBehavior::Delay(50)))
        .on_loaded(h.hook("on_loaded", HookBehavior::Ok));
    let machine = h.machine(polling_config(), hooks);
    machine.mount(el);
    h.settle();
    assert_eq!(machine.status(), Status::Loading);

    // EXPECT: calls while Loading are no-ops
    assert!(!machine.enter_viewport());
    assert!(!machine.enter_viewport());

    h.advance(50);
    assert_eq!(machine.status(), Status::Loaded);

    // EXPECT: calls while Loaded are no-ops
    assert!(!machine.enter_viewport());
    h.settle();

    assert_eq!(h.log.count("on_loading"), 1);
    assert_eq!(h.log.count("on_loaded"), 1);
}

#[test]
fn reset_then_fresh_signal_runs_exactly_one_new_cycle() {
    for (strategy, config) in both_strategies() {
        let mut h = Harness::new();
        let el = h.add(SimElement::new("lazy", 0.0, 0.0, 100.0, 100.0));
        let machine = h.machine(config, h.recording_hooks());
        machine.mount(el);
        h.settle();
        assert_eq!(machine.status(), Status::Loaded, "{strategy}");

        assert!(machine.reset());
        h.settle();

        assert_eq!(
            h.log.events(),
            vec![
                "status:unload",
                "status:loading",
                "on_loading",
                "status:loaded",
                "on_loaded",
                "on_unload",
                "status:unload",
                "status:loading",
                "on_loading",
                "status:loaded",
                "on_loaded",
            ],
            "{strategy}"
        );
        assert_eq!(machine.generation().get(), 1, "{strategy}");
    }
}

#[test]
fn reset_out_of_view_waits_for_next_entry() {
    let mut h = Harness::new();
    let el = h.add(SimElement::new("lazy", 0.0, 1000.0, 100.0, 100.0));
    let machine = h.machine(polling_config(), h.recording_hooks());
    machine.mount(el);
    h.scroll_to(600.0);
    assert_eq!(machine.status(), Status::Loaded);

    h.scroll_to(0.0);
    assert!(machine.reset());
    h.settle();
    assert_eq!(machine.status(), Status::Unload);
    assert_eq!(machine.active_subscriptions(), 1);

    h.scroll_to(600.0);
    assert_eq!(machine.status(), Status::Loaded);
    assert_eq!(h.log.count("on_loaded"), 2);
    assert_eq!(h.log.count("on_unload"), 1);
}

#[test]
fn loading_failure_goes_to_on_error() {
    let mut h = Harness::new();
    let el = h.add(SimElement::new("lazy", 0.0, 0.0, 100.0, 100.0));
    let errors = Rc::new(RefCell::new(Vec::new()));
    let hooks = {
        let errors = Rc::clone(&errors);
        crate::activation::Hooks::new()
            .on_loading(h.hook("on_loading", HookBehavior::Fail))
            .on_loaded(h.hook("on_loaded", HookBehavior::Ok))
            .on_error(move |err: LoadHookError| {
                errors.borrow_mut().push(err);
                async {}
            })
    };
    let machine = h.machine(polling_config(), hooks);
    machine.mount(el);
    h.settle();

    assert_eq!(
        *errors.borrow(),
        vec![LoadHookError::new(
            HookPhase::Loading,
            HookError::new("on_loading failed")
        )]
    );
    // The record stays at its last successful status.
    assert_eq!(machine.status(), Status::Loading);
    assert_eq!(machine.record().last_failure, None);
    assert_eq!(h.log.count("on_loaded"), 0);
}

#[test]
fn loaded_failure_without_handler_is_recorded() {
    let mut h = Harness::new();
    let el = h.add(SimElement::new("lazy", 0.0, 0.0, 100.0, 100.0));
    let hooks = crate::activation::Hooks::new()
        .on_loaded(h.hook("on_loaded", HookBehavior::Fail));
    let machine = h.machine(polling_config(), hooks);
    machine.mount(el);
    h.settle();

    let record = machine.record();
    assert_eq!(record.status, Status::Loaded);
    assert_eq!(
        record.last_failure.map(|failure| failure.phase),
        Some(HookPhase::Loaded)
    );
}

#[test]
fn unload_failure_is_routed_too() {
    let mut h = Harness::new();
    let el = h.add(SimElement::new("lazy", 0.0, 1000.0, 100.0, 100.0));
    let hooks = crate::activation::Hooks::new()
        .on_unload(h.hook("on_unload", HookBehavior::Fail));
    let machine = h.machine(polling_config(), hooks);
    machine.mount(el);
    h.scroll_to(600.0);
    h.scroll_to(0.0);

    assert!(machine.reset());
    h.settle();
    assert_eq!(machine.status(), Status::Unload);
    assert_eq!(
        machine.record().last_failure.map(|failure| failure.phase),
        Some(HookPhase::Unload)
    );
}

#[test]
fn render_props_carry_mode_and_passthrough() {
    let mut h = Harness::new();
    let el = h.add(SimElement::new("lazy", 0.0, 0.0, 100.0, 100.0));
    let frames = Rc::new(RefCell::new(Vec::new()));
    let mut passthrough = Passthrough::new();
    passthrough.insert("title".to_string(), serde_json::json!("Gallery"));

    let machine = {
        let frames = Rc::clone(&frames);
        h.builder(LazyConfig {
            mode: Mode::Container,
            ..polling_config()
        })
        .passthrough(passthrough.clone())
        .render(move |props| {
            frames
                .borrow_mut()
                .push((props.frame(), props.passthrough.clone()))
        })
        .build()
        .unwrap()
    };
    machine.mount(el);
    h.settle();

    let frames = frames.borrow();
    assert_eq!(
        frames.iter().map(|(frame, _)| *frame).collect::<Vec<_>>(),
        vec![
            Frame::Container(Status::Unload),
            Frame::Container(Status::Loading),
            Frame::Container(Status::Loaded),
        ]
    );
    assert!(frames.iter().all(|(_, props)| *props == passthrough));
    assert_eq!(machine.render_props().mode, Mode::Container);
}

#[test]
fn placeholder_mode_swaps_to_content_once_loaded() {
    let mut h = Harness::new();
    let el = h.add(SimElement::new("lazy", 0.0, 0.0, 100.0, 100.0));
    let machine = h.machine(polling_config(), crate::activation::Hooks::new());
    assert_eq!(machine.render_props().frame(), Frame::Placeholder);
    machine.mount(el);
    h.settle();
    assert_eq!(machine.render_props().frame(), Frame::Content);
}

#[test]
fn on_loading_runs_in_the_same_call_as_entry() {
    let h = Harness::new();
    let el = h.add(SimElement::new("lazy", 0.0, 5000.0, 100.0, 100.0));
    let machine = h.machine(polling_config(), h.recording_hooks());
    machine.mount(el);

    // EXPECT: no frame or executor turn between the status flip and the hook
    assert!(machine.enter_viewport());
    assert_eq!(
        h.log.events(),
        vec!["status:unload", "status:loading", "on_loading"]
    );
    assert_eq!(machine.active_subscriptions(), 0);
}
