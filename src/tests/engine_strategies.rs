//! Strategy-specific behavior seen through a mounted machine.

use crate::activation::Status;
use crate::config::{LazyConfig, RootSpec, Strategy};
use crate::host::{Overflow, SimElement};
use crate::offset::OffsetSpec;
use crate::test_harness::{observer_config, polling_config, Harness};

#[test]
fn offset_loads_before_the_element_is_visible() {
    for config in [polling_config(), observer_config()] {
        let mut h = Harness::new();
        let el = h.add(SimElement::new("lazy", 0.0, 1000.0, 100.0, 100.0));
        let machine = h.machine(
            LazyConfig {
                offset: OffsetSpec::from(200.0),
                ..config
            },
            h.recording_hooks(),
        );
        machine.mount(el);

        // Bottom of the expanded viewport sits at scroll + 800.
        h.scroll_to(199.0);
        assert_eq!(machine.status(), Status::Unload);
        h.scroll_to(200.0);
        assert_eq!(machine.status(), Status::Loaded);
    }
}

#[test]
fn polling_ignores_elements_clipped_by_hidden_overflow() {
    let mut h = Harness::new();
    let clip = h.add(SimElement::new("clip", 0.0, 0.0, 800.0, 100.0).overflow(Overflow::Hidden));
    let el = h.add(SimElement::new("lazy", 0.0, 200.0, 100.0, 100.0).parent(clip));
    let machine = h.machine(polling_config(), h.recording_hooks());
    machine.mount(el);
    h.settle();

    // EXPECT: inside the viewport geometrically, but clipped away
    assert_eq!(machine.status(), Status::Unload);
    assert_eq!(machine.active_subscriptions(), 1);
}

#[test]
fn polling_follows_the_nearest_scroll_container() {
    let mut h = Harness::new();
    let container =
        h.add(SimElement::new("feed", 0.0, 0.0, 400.0, 300.0).overflow(Overflow::Auto));
    let el = h.add(SimElement::new("lazy", 0.0, 900.0, 100.0, 100.0).parent(container));
    let machine = h.machine(polling_config(), h.recording_hooks());
    machine.mount(el);

    h.host.scroll_element_to(container, 0.0, 599.0);
    h.settle();
    assert_eq!(machine.status(), Status::Unload);

    h.host.scroll_element_to(container, 0.0, 600.0);
    h.settle();
    assert_eq!(machine.status(), Status::Loaded);
}

#[test]
fn default_debounce_waits_for_a_quiet_scroll() {
    let mut h = Harness::new();
    let el = h.add(SimElement::new("lazy", 0.0, 1000.0, 100.0, 100.0));
    let machine = h.machine(
        LazyConfig {
            strategy: Strategy::Polling,
            ..LazyConfig::default()
        },
        h.recording_hooks(),
    );
    machine.mount(el);

    h.scroll_to(450.0);
    h.advance(200);
    h.scroll_to(500.0);
    h.advance(200);
    assert_eq!(machine.status(), Status::Unload, "still scrolling");

    h.advance(50);
    assert_eq!(machine.status(), Status::Loaded);
    assert_eq!(h.log.count("on_loaded"), 1);
}

#[test]
fn throttle_runs_on_the_leading_edge() {
    let mut h = Harness::new();
    let el = h.add(SimElement::new("lazy", 0.0, 1000.0, 100.0, 100.0));
    let machine = h.machine(
        LazyConfig {
            strategy: Strategy::Polling,
            debounce: false,
            ..LazyConfig::default()
        },
        h.recording_hooks(),
    );
    machine.mount(el);

    h.scroll_to(500.0);
    assert_eq!(machine.status(), Status::Loaded);
}

#[test]
fn observer_root_element_bounds_the_check() {
    let mut h = Harness::new();
    let feed = h.add(SimElement::new("feed", 0.0, 0.0, 400.0, 300.0).overflow(Overflow::Auto));
    let el = h.add(SimElement::new("lazy", 0.0, 400.0, 100.0, 100.0).parent(feed));
    let machine = h.machine(
        LazyConfig {
            root: RootSpec::Selector("#feed".to_string()),
            ..observer_config()
        },
        h.recording_hooks(),
    );
    machine.mount(el);
    h.settle();
    assert_eq!(machine.status(), Status::Unload, "inside the window, outside the feed");

    h.host.scroll_element_to(feed, 0.0, 100.0);
    h.settle();
    assert_eq!(machine.status(), Status::Loaded);
}

#[test]
fn unknown_root_selector_fails_the_build() {
    let h = Harness::new();
    let host: std::rc::Rc<dyn crate::host::Host> = h.host.clone();
    let config = LazyConfig {
        root: RootSpec::Selector("#missing".to_string()),
        ..observer_config()
    };
    let err = crate::engine::build_engine(host, &h.pool, &config).err();
    assert_eq!(
        err,
        Some(crate::model::ActivationError::UnknownRoot("#missing".to_string()))
    );
}

#[test]
fn machines_with_identical_options_share_one_primitive() {
    let mut h = Harness::new();
    let a = h.add(SimElement::new("a", 0.0, 1000.0, 100.0, 100.0));
    let b = h.add(SimElement::new("b", 0.0, 1200.0, 100.0, 100.0));
    let c = h.add(SimElement::new("c", 0.0, 1400.0, 100.0, 100.0));
    let first = h.machine(observer_config(), h.recording_hooks());
    let second = h.machine(observer_config(), h.recording_hooks());
    let wide = h.machine(
        LazyConfig {
            offset: OffsetSpec::from(50.0),
            ..observer_config()
        },
        h.recording_hooks(),
    );
    first.mount(a);
    second.mount(b);
    wide.mount(c);
    h.settle();

    assert_eq!(h.pool.len(), 2);
    assert_eq!(h.host.observer_instances(), 2);
    assert_eq!(h.host.observed_count(), 3);

    h.scroll_to(500.0);
    assert_eq!(first.status(), Status::Loaded);
    assert_eq!(second.status(), Status::Unload);
    assert_eq!(h.host.observed_count(), 2);
}

#[test]
fn auto_strategy_falls_back_to_polling() {
    let mut h = Harness::new();
    h.host.set_observer_support(false);
    let el = h.add(SimElement::new("lazy", 0.0, 1000.0, 100.0, 100.0));
    let machine = h.machine(
        LazyConfig {
            throttle_interval_ms: 0,
            ..LazyConfig::default()
        },
        h.recording_hooks(),
    );
    machine.mount(el);
    assert_eq!(h.host.listener_count(), 2);
    assert_eq!(h.pool.len(), 0);

    h.scroll_to(400.0);
    assert_eq!(machine.status(), Status::Loaded);
}
