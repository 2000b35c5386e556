//! In-memory host: a scrollable page with a virtual clock.
//!
//! Elements are laid out in document coordinates. Client rects are derived
//! by subtracting the window scroll and the scroll offsets of every scroll
//! container above the element. Nothing runs on its own: tests and the demo
//! binary drive the page with [`SimHost::scroll_window_to`],
//! [`SimHost::advance`] and [`SimHost::run_frame`].

use super::{
    BatchCallback, ComputedStyle, Display, EventKind, EventTarget, Host, IntersectionEntry,
    IntersectionPrimitive, ObserverOptions, Overflow,
};
use crate::engine::intersect::intersection_rect;
use crate::model::{ElementId, ListenerId, Rect, TimerId};
use crate::offset::{self, EdgeOffsets, OffsetSpec};
use futures::channel::oneshot;
use futures::executor::LocalPool;
use futures::future::LocalBoxFuture;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::time::Duration;
use tracing::{trace, warn};

/// Element description used to populate a [`SimHost`].
#[derive(Debug, Clone, PartialEq)]
pub struct SimElement {
    /// Name matched by `#name` selectors.
    pub name: String,
    /// Parent element; must be added first.
    pub parent: Option<ElementId>,
    /// Border box in document coordinates.
    pub layout: Rect,
    /// Display and overflow.
    pub style: ComputedStyle,
}

impl SimElement {
    /// Visible block element at `(x, y)` in document coordinates.
    pub fn new(name: impl Into<String>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            name: name.into(),
            parent: None,
            layout: Rect::from_xywh(x, y, width, height),
            style: ComputedStyle::default(),
        }
    }

    /// Nest under `parent`.
    pub fn parent(mut self, parent: ElementId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Set `overflow`.
    pub fn overflow(mut self, overflow: Overflow) -> Self {
        self.style.overflow = overflow;
        self
    }

    /// Set `display`.
    pub fn display(mut self, display: Display) -> Self {
        self.style.display = display;
        self
    }
}

struct Node {
    element: SimElement,
    scroll_x: f64,
    scroll_y: f64,
}

struct Listener {
    id: ListenerId,
    target: EventTarget,
    kind: EventKind,
    handler: Rc<dyn Fn()>,
}

struct PendingTimer {
    id: TimerId,
    due: u64,
    callback: Box<dyn FnOnce()>,
}

/// Simulated platform intersection primitive.
struct SimObserver {
    options: ObserverOptions,
    margin: EdgeOffsets,
    /// Observed targets and their last reported intersecting state.
    observed: RefCell<Vec<(ElementId, Option<bool>)>>,
    callback: BatchCallback,
}

impl IntersectionPrimitive for SimObserver {
    fn observe(&self, element: ElementId) {
        let mut observed = self.observed.borrow_mut();
        if !observed.iter().any(|(id, _)| *id == element) {
            observed.push((element, None));
        }
    }

    fn unobserve(&self, element: ElementId) {
        self.observed.borrow_mut().retain(|(id, _)| *id != element);
    }
}

/// In-memory [`Host`] implementation.
pub struct SimHost {
    nodes: RefCell<Vec<Node>>,
    viewport: Cell<(f64, f64)>,
    window_scroll: Cell<(f64, f64)>,
    listeners: RefCell<Vec<Listener>>,
    timers: RefCell<Vec<PendingTimer>>,
    frames: RefCell<VecDeque<Box<dyn FnOnce()>>>,
    observers: RefCell<Vec<Weak<SimObserver>>>,
    clock: Cell<u64>,
    next_id: Cell<u64>,
    observer_support: Cell<bool>,
}

impl SimHost {
    /// Empty page with a viewport of the given size.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            nodes: RefCell::new(Vec::new()),
            viewport: Cell::new((width, height)),
            window_scroll: Cell::new((0.0, 0.0)),
            listeners: RefCell::new(Vec::new()),
            timers: RefCell::new(Vec::new()),
            frames: RefCell::new(VecDeque::new()),
            observers: RefCell::new(Vec::new()),
            clock: Cell::new(0),
            next_id: Cell::new(1),
            observer_support: Cell::new(true),
        }
    }

    fn fresh_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    // ----- page construction -----

    /// Append an element to the page.
    pub fn add_element(&self, element: SimElement) -> ElementId {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(Node {
            element,
            scroll_x: 0.0,
            scroll_y: 0.0,
        });
        ElementId::new(nodes.len() as u64 - 1)
    }

    /// Element added under `name`.
    pub fn element_id(&self, name: &str) -> Option<ElementId> {
        self.nodes
            .borrow()
            .iter()
            .position(|node| node.element.name == name)
            .map(|index| ElementId::new(index as u64))
    }

    /// Change `display`. No event is dispatched.
    pub fn set_display(&self, element: ElementId, display: Display) {
        self.with_node_mut(element, |node| node.element.style.display = display);
    }

    /// Toggle platform support for the intersection primitive.
    pub fn set_observer_support(&self, supported: bool) {
        self.observer_support.set(supported);
    }

    fn with_node<T>(&self, element: ElementId, f: impl FnOnce(&Node) -> T) -> Option<T> {
        self.nodes.borrow().get(element.get() as usize).map(f)
    }

    fn with_node_mut(&self, element: ElementId, f: impl FnOnce(&mut Node)) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(element.get() as usize) {
            f(node);
        }
    }

    // ----- driving the page -----

    /// Scroll the window and dispatch its scroll listeners.
    pub fn scroll_window_to(&self, x: f64, y: f64) {
        self.window_scroll.set((x, y));
        self.dispatch(EventTarget::Window, EventKind::Scroll);
    }

    /// Scroll a container and dispatch its scroll listeners.
    pub fn scroll_element_to(&self, element: ElementId, x: f64, y: f64) {
        self.with_node_mut(element, |node| {
            node.scroll_x = x;
            node.scroll_y = y;
        });
        self.dispatch(EventTarget::Element(element), EventKind::Scroll);
    }

    /// Resize the viewport and dispatch window resize listeners.
    pub fn resize(&self, width: f64, height: f64) {
        self.viewport.set((width, height));
        self.dispatch(EventTarget::Window, EventKind::Resize);
    }

    fn dispatch(&self, target: EventTarget, kind: EventKind) {
        let matching: Vec<(ListenerId, Rc<dyn Fn()>)> = self
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.target == target && l.kind == kind)
            .map(|l| (l.id, Rc::clone(&l.handler)))
            .collect();

        trace!(?target, ?kind, listeners = matching.len(), "dispatch");

        for (id, handler) in matching {
            // A handler earlier in this dispatch may have removed this one.
            let still_registered = self.listeners.borrow().iter().any(|l| l.id == id);
            if still_registered {
                handler();
            }
        }
    }

    /// Move the virtual clock forward, firing due timers in order.
    ///
    /// Futures woken by a timer only run when the caller next drives its
    /// executor; see [`SimHost::advance_settled`].
    pub fn advance(&self, ms: u64) {
        let target = self.clock.get() + ms;
        while let Some(timer) = self.next_due_timer(target) {
            self.clock.set(timer.due.max(self.clock.get()));
            (timer.callback)();
        }
        self.clock.set(target);
    }

    /// Move the virtual clock forward one timer at a time, settling the
    /// executor and frames at each timer's due time.
    ///
    /// Work woken by a timer observes the clock at that timer, and timers it
    /// schedules inside the window fire within the same call.
    pub fn advance_settled(&self, ms: u64, executor: &mut LocalPool) {
        let target = self.clock.get() + ms;
        while let Some(timer) = self.next_due_timer(target) {
            self.clock.set(timer.due.max(self.clock.get()));
            (timer.callback)();
            self.settle(executor);
        }
        self.clock.set(target);
        self.settle(executor);
    }

    /// Remove and return the earliest timer due at or before `target`.
    fn next_due_timer(&self, target: u64) -> Option<PendingTimer> {
        let mut timers = self.timers.borrow_mut();
        let due_index = timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= target)
            .min_by_key(|(_, t)| (t.due, t.id.get()))
            .map(|(index, _)| index)?;
        Some(timers.remove(due_index))
    }

    /// Run the frame callbacks queued before this call, then deliver
    /// intersection batches.
    ///
    /// Callbacks queued while the frame runs, including from observer
    /// batches, wait for the next frame. Returns the number of frame
    /// callbacks run.
    pub fn run_frame(&self) -> usize {
        let queued: Vec<Box<dyn FnOnce()>> = self.frames.borrow_mut().drain(..).collect();
        let count = queued.len();
        for callback in queued {
            callback();
        }

        self.deliver_observer_batches();
        count
    }

    /// `advance(ms)` followed by `run_frame()`.
    pub fn tick(&self, ms: u64) -> usize {
        self.advance(ms);
        self.run_frame()
    }

    /// Alternate frames and executor runs until neither has work left.
    ///
    /// Does not move the clock. Returns the number of frame callbacks run.
    pub fn settle(&self, executor: &mut LocalPool) -> usize {
        const MAX_ROUNDS: usize = 64;

        let mut total = 0;
        for _ in 0..MAX_ROUNDS {
            executor.run_until_stalled();
            let ran = self.run_frame();
            executor.run_until_stalled();
            total += ran;
            if ran == 0 && self.pending_frames() == 0 {
                break;
            }
        }
        total
    }

    /// Future resolved after `ms` of virtual time.
    pub fn sleep(&self, ms: u64) -> LocalBoxFuture<'static, ()> {
        let (tx, rx) = oneshot::channel::<()>();
        self.set_timeout(
            Duration::from_millis(ms),
            Box::new(move || {
                let _ = tx.send(());
            }),
        );
        Box::pin(async move {
            let _ = rx.await;
        })
    }

    // ----- introspection -----

    /// Registered event listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Timers not yet fired or cleared.
    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    /// Frame callbacks waiting for the next frame.
    pub fn pending_frames(&self) -> usize {
        self.frames.borrow().len()
    }

    /// Live intersection primitives created through this host.
    pub fn observer_instances(&self) -> usize {
        self.observers
            .borrow()
            .iter()
            .filter(|o| o.strong_count() > 0)
            .count()
    }

    /// Total targets observed across all live primitives.
    pub fn observed_count(&self) -> usize {
        self.observers
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .map(|o| o.observed.borrow().len())
            .sum()
    }

    fn deliver_observer_batches(&self) {
        self.observers.borrow_mut().retain(|o| o.strong_count() > 0);
        let observers: Vec<Rc<SimObserver>> =
            self.observers.borrow().iter().filter_map(Weak::upgrade).collect();

        for observer in observers {
            let targets: Vec<(ElementId, Option<bool>)> = observer.observed.borrow().clone();
            let root_rect = match observer.options.root {
                Some(root) => self.bounding_rect(root),
                None => Some(self.viewport_rect()),
            };

            let mut entries = Vec::new();
            for (target, last) in targets {
                let (ratio, intersecting) = match root_rect {
                    Some(root_rect) => {
                        let expanded = observer.margin.expand(&root_rect);
                        self.measure(target, observer.options.root, &expanded)
                    }
                    None => (0.0, false),
                };
                let intersecting = intersecting && ratio >= observer.options.threshold;
                if last != Some(intersecting) {
                    entries.push(IntersectionEntry {
                        target,
                        intersection_ratio: ratio,
                        is_intersecting: intersecting,
                    });
                }
            }

            if entries.is_empty() {
                continue;
            }
            {
                let mut observed = observer.observed.borrow_mut();
                for entry in &entries {
                    if let Some(slot) = observed.iter_mut().find(|(id, _)| *id == entry.target) {
                        slot.1 = Some(entry.is_intersecting);
                    }
                }
            }
            (observer.callback)(&entries);
        }
    }

    fn measure(&self, target: ElementId, root: Option<ElementId>, root_rect: &Rect) -> (f64, bool) {
        let Some(target_rect) = self.bounding_rect(target) else {
            return (0.0, false);
        };
        match intersection_rect(self, target, root, root_rect) {
            Some(hit) => {
                let area = target_rect.area();
                let ratio = if area > 0.0 { hit.area() / area } else { 1.0 };
                (ratio, true)
            }
            None => (0.0, false),
        }
    }
}

impl Host for SimHost {
    fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.with_node(element, |node| node.element.parent).flatten()
    }

    fn bounding_rect(&self, element: ElementId) -> Option<Rect> {
        let nodes = self.nodes.borrow();
        let node = nodes.get(element.get() as usize)?;
        let (wx, wy) = self.window_scroll.get();
        let mut rect = node.element.layout.translate(-wx, -wy);

        let mut current = node.element.parent;
        while let Some(ancestor) = current {
            let Some(anc) = nodes.get(ancestor.get() as usize) else { break };
            if anc.element.style.overflow.scrolls() {
                rect = rect.translate(-anc.scroll_x, -anc.scroll_y);
            }
            current = anc.element.parent;
        }
        Some(rect)
    }

    fn style(&self, element: ElementId) -> ComputedStyle {
        self.with_node(element, |node| node.element.style)
            .unwrap_or_default()
    }

    fn viewport_rect(&self) -> Rect {
        let (width, height) = self.viewport.get();
        Rect::from_xywh(0.0, 0.0, width, height)
    }

    fn query_selector(&self, selector: &str) -> Option<ElementId> {
        let name = selector.strip_prefix('#').unwrap_or(selector);
        self.element_id(name)
    }

    fn add_listener(
        &self,
        target: EventTarget,
        kind: EventKind,
        handler: Rc<dyn Fn()>,
    ) -> ListenerId {
        let id = ListenerId::new(self.fresh_id());
        self.listeners.borrow_mut().push(Listener {
            id,
            target,
            kind,
            handler,
        });
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|l| l.id != id);
    }

    fn now_ms(&self) -> u64 {
        self.clock.get()
    }

    fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerId {
        let id = TimerId::new(self.fresh_id());
        let due = self.clock.get() + delay.as_millis() as u64;
        self.timers.borrow_mut().push(PendingTimer { id, due, callback });
        id
    }

    fn clear_timeout(&self, id: TimerId) {
        self.timers.borrow_mut().retain(|t| t.id != id);
    }

    fn request_frame(&self, callback: Box<dyn FnOnce()>) {
        self.frames.borrow_mut().push_back(callback);
    }

    fn supports_intersection_observer(&self) -> bool {
        self.observer_support.get()
    }

    fn create_observer(
        &self,
        options: ObserverOptions,
        callback: BatchCallback,
    ) -> Rc<dyn IntersectionPrimitive> {
        let margin = offset::resolve(&OffsetSpec::Shorthand(options.root_margin.clone()))
            .unwrap_or_else(|err| {
                warn!(root_margin = %options.root_margin, %err, "invalid root margin, using zero");
                EdgeOffsets::default()
            });
        let observer = Rc::new(SimObserver {
            options,
            margin,
            observed: RefCell::new(Vec::new()),
            callback,
        });
        self.observers.borrow_mut().push(Rc::downgrade(&observer));
        observer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> SimHost {
        SimHost::new(800.0, 600.0)
    }

    #[test]
    fn bounding_rect_follows_window_scroll() {
        let host = page();
        let el = host.add_element(SimElement::new("el", 0.0, 1000.0, 100.0, 100.0));
        host.scroll_window_to(0.0, 400.0);
        assert_eq!(host.bounding_rect(el), Some(Rect::from_xywh(0.0, 600.0, 100.0, 100.0)));
    }

    #[test]
    fn bounding_rect_follows_container_scroll() {
        let host = page();
        let container = host.add_element(
            SimElement::new("box", 0.0, 100.0, 400.0, 200.0).overflow(Overflow::Auto),
        );
        let child = host.add_element(SimElement::new("child", 0.0, 500.0, 100.0, 50.0).parent(container));
        host.scroll_element_to(container, 0.0, 250.0);
        assert_eq!(host.bounding_rect(child), Some(Rect::from_xywh(0.0, 250.0, 100.0, 50.0)));
        // The container itself does not move with its own scroll offset.
        assert_eq!(host.bounding_rect(container), Some(Rect::from_xywh(0.0, 100.0, 400.0, 200.0)));
    }

    #[test]
    fn query_selector_accepts_hash_prefix() {
        let host = page();
        let el = host.add_element(SimElement::new("target", 0.0, 0.0, 1.0, 1.0));
        assert_eq!(host.query_selector("#target"), Some(el));
        assert_eq!(host.query_selector("target"), Some(el));
        assert_eq!(host.query_selector("#missing"), None);
    }

    #[test]
    fn dispatch_skips_listener_removed_mid_dispatch() {
        let host = Rc::new(page());
        let calls = Rc::new(Cell::new(0));

        let second_id = Rc::new(Cell::new(None::<ListenerId>));
        let first = {
            let host = Rc::clone(&host);
            let second_id = Rc::clone(&second_id);
            Rc::new(move || {
                if let Some(id) = second_id.get() {
                    host.remove_listener(id);
                }
            }) as Rc<dyn Fn()>
        };
        host.add_listener(EventTarget::Window, EventKind::Scroll, first);
        let second = {
            let calls = Rc::clone(&calls);
            Rc::new(move || calls.set(calls.get() + 1)) as Rc<dyn Fn()>
        };
        second_id.set(Some(host.add_listener(EventTarget::Window, EventKind::Scroll, second)));

        host.scroll_window_to(0.0, 10.0);
        assert_eq!(calls.get(), 0);
        assert_eq!(host.listener_count(), 1);
    }

    #[test]
    fn timers_fire_in_due_order() {
        let host = page();
        let log = Rc::new(RefCell::new(Vec::new()));
        for (delay, label) in [(30, "c"), (10, "a"), (20, "b")] {
            let log = Rc::clone(&log);
            host.set_timeout(Duration::from_millis(delay), Box::new(move || log.borrow_mut().push(label)));
        }
        host.advance(25);
        assert_eq!(*log.borrow(), vec!["a", "b"]);
        assert_eq!(host.now_ms(), 25);
        host.advance(5);
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn cleared_timer_never_fires() {
        let host = page();
        let fired = Rc::new(Cell::new(false));
        let id = {
            let fired = Rc::clone(&fired);
            host.set_timeout(Duration::from_millis(5), Box::new(move || fired.set(true)))
        };
        host.clear_timeout(id);
        host.advance(10);
        assert!(!fired.get());
        assert_eq!(host.pending_timers(), 0);
    }

    #[test]
    fn frame_callbacks_queued_during_frame_wait_for_next_frame() {
        let host = Rc::new(page());
        let ran = Rc::new(Cell::new(0));
        {
            let host2 = Rc::clone(&host);
            let ran = Rc::clone(&ran);
            host.request_frame(Box::new(move || {
                ran.set(ran.get() + 1);
                let ran = Rc::clone(&ran);
                host2.request_frame(Box::new(move || ran.set(ran.get() + 1)));
            }));
        }
        assert_eq!(host.run_frame(), 1);
        assert_eq!(ran.get(), 1);
        assert_eq!(host.run_frame(), 1);
        assert_eq!(ran.get(), 2);
    }

    #[test]
    fn observer_reports_initial_state_then_changes_only() {
        let host = page();
        let el = host.add_element(SimElement::new("el", 0.0, 1000.0, 100.0, 100.0));
        let batches = Rc::new(RefCell::new(Vec::new()));
        let callback: BatchCallback = {
            let batches = Rc::clone(&batches);
            Rc::new(move |entries: &[IntersectionEntry]| batches.borrow_mut().push(entries.to_vec()))
        };
        let observer = host.create_observer(
            ObserverOptions { root: None, root_margin: "0px 0px 0px 0px".into(), threshold: 0.0 },
            callback,
        );
        observer.observe(el);

        host.run_frame();
        host.run_frame();
        assert_eq!(batches.borrow().len(), 1, "only the initial entry");
        assert!(!batches.borrow()[0][0].is_intersecting);

        host.scroll_window_to(0.0, 450.0);
        host.run_frame();
        let batches = batches.borrow();
        assert_eq!(batches.len(), 2);
        assert!(batches[1][0].is_intersecting);
        assert_eq!(batches[1][0].intersection_ratio, 0.5);
    }

    #[test]
    fn observer_instances_drop_with_last_handle() {
        let host = page();
        let observer = host.create_observer(
            ObserverOptions { root: None, root_margin: "0px".into(), threshold: 0.0 },
            Rc::new(|_: &[IntersectionEntry]| {}),
        );
        assert_eq!(host.observer_instances(), 1);
        drop(observer);
        assert_eq!(host.observer_instances(), 0);
    }

    #[test]
    fn sleep_resolves_after_virtual_delay() {
        use futures::task::LocalSpawnExt;

        let host = page();
        let mut pool = LocalPool::new();
        let done = Rc::new(Cell::new(false));
        {
            let done = Rc::clone(&done);
            let sleep = host.sleep(100);
            pool.spawner()
                .spawn_local(async move {
                    sleep.await;
                    done.set(true);
                })
                .unwrap();
        }
        pool.run_until_stalled();
        assert!(!done.get());
        host.advance(99);
        pool.run_until_stalled();
        assert!(!done.get());
        host.advance(1);
        pool.run_until_stalled();
        assert!(done.get());
    }

    #[test]
    fn advance_settled_runs_continuations_at_their_due_time() {
        use futures::task::LocalSpawnExt;

        let host = Rc::new(page());
        let mut pool = LocalPool::new();
        let stamps = Rc::new(RefCell::new(Vec::new()));
        {
            let host = Rc::clone(&host);
            let stamps = Rc::clone(&stamps);
            pool.spawner()
                .spawn_local(async move {
                    host.sleep(20).await;
                    stamps.borrow_mut().push(host.now_ms());
                    // A timer scheduled by the continuation still fires in this window.
                    host.sleep(30).await;
                    stamps.borrow_mut().push(host.now_ms());
                })
                .unwrap();
        }
        pool.run_until_stalled();

        host.advance_settled(1000, &mut pool);

        // EXPECT: each continuation sees the clock at its own timer
        assert_eq!(*stamps.borrow(), vec![20, 50]);
        assert_eq!(host.now_ms(), 1000);
    }
}
