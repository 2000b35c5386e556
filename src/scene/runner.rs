//! Scene replay against the simulated host.

use super::{Scene, SceneError, Step};
use crate::activation::{ActivationStateMachine, Hooks, NavigationNotifier, RenderProps, Status};
use crate::config::LazyConfig;
use crate::engine::{build_engine, ObserverPool};
use crate::host::{Host, SimElement, SimHost};
use crate::model::{ActivationError, ElementId, HookError};
use futures::executor::LocalPool;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, info};

/// One status published by a lazy element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    /// Virtual time of the change.
    pub t_ms: u64,
    /// Scene id of the element.
    pub element: String,
    /// Status published.
    pub status: Status,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>6}ms  {:<16} {}", self.t_ms, self.element, self.status)
    }
}

/// Outcome of a replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneReport {
    /// Engine used by the lazy elements.
    pub engine: &'static str,
    /// Every status published, in order.
    pub transitions: Vec<Transition>,
    /// Status of every lazy element when the script ended.
    pub final_status: BTreeMap<String, Status>,
    /// Virtual time when the script ended.
    pub elapsed_ms: u64,
}

impl SceneReport {
    /// Lazy elements that ended `Loaded`.
    pub fn loaded_count(&self) -> usize {
        self.final_status
            .values()
            .filter(|status| **status == Status::Loaded)
            .count()
    }
}

/// Replay `scene`, with `base` supplying every option a lazy element does
/// not set itself.
///
/// # Errors
///
/// Returns [`SceneError::Activation`] when a lazy element's configuration
/// does not build (invalid offset, unknown root).
pub fn run(scene: &Scene, base: &LazyConfig) -> Result<SceneReport, SceneError> {
    let host = Rc::new(SimHost::new(scene.viewport.width, scene.viewport.height));
    let dyn_host: Rc<dyn Host> = host.clone();
    let pool = Rc::new(ObserverPool::new(Rc::clone(&dyn_host)));
    let notifier = NavigationNotifier::new();
    let mut executor = LocalPool::new();
    let transitions: Rc<RefCell<Vec<Transition>>> = Rc::new(RefCell::new(Vec::new()));

    let ids = populate(&host, scene)?;
    info!(
        elements = scene.elements.len(),
        lazy = scene.lazy_count(),
        steps = scene.steps.len(),
        "scene loaded"
    );

    let mut machines = Vec::new();
    let mut engine_name = "none";
    for element in &scene.elements {
        let Some(lazy) = &element.lazy else { continue };
        let config = LazyConfig {
            offset: lazy.offset.clone(),
            auto_reset: lazy.auto_reset,
            ..base.clone()
        };
        let activation_error = |source: ActivationError| SceneError::Activation {
            element: element.id.clone(),
            source,
        };
        let engine = build_engine(Rc::clone(&dyn_host), &pool, &config).map_err(activation_error)?;
        engine_name = engine.name();

        let machine = ActivationStateMachine::builder(engine, Rc::new(executor.spawner()))
            .config(config)
            .hooks(loading_hooks(&host, lazy.load_ms))
            .navigation(notifier.clone())
            .render(recorder(&host, &transitions, &element.id))
            .build()
            .map_err(activation_error)?;
        machines.push((ids[&element.id], machine));
    }

    for (element, machine) in &machines {
        machine.mount(*element);
    }
    host.settle(&mut executor);

    for step in &scene.steps {
        debug!(t_ms = host.now_ms(), ?step, "scene step");
        match step {
            Step::Scroll { target: None, x, y } => host.scroll_window_to(*x, *y),
            Step::Scroll {
                target: Some(target),
                x,
                y,
            } => {
                let element = ids
                    .get(target)
                    .copied()
                    .ok_or_else(|| SceneError::UnknownTarget(target.clone()))?;
                host.scroll_element_to(element, *x, *y);
            }
            Step::Resize { width, height } => host.resize(*width, *height),
            Step::AdvanceMs { ms } => host.advance_settled(*ms, &mut executor),
            Step::Navigate { location } => notifier.notify(location),
        }
        host.settle(&mut executor);
    }

    let final_status = scene
        .elements
        .iter()
        .filter(|element| element.lazy.is_some())
        .zip(&machines)
        .map(|(element, (_, machine))| (element.id.clone(), machine.status()))
        .collect();
    for (_, machine) in &machines {
        machine.unmount();
    }
    host.settle(&mut executor);

    let transitions = transitions.borrow().clone();
    let report = SceneReport {
        engine: engine_name,
        transitions,
        final_status,
        elapsed_ms: host.now_ms(),
    };
    info!(
        engine = report.engine,
        transitions = report.transitions.len(),
        loaded = report.loaded_count(),
        "scene finished"
    );
    Ok(report)
}

fn populate(host: &SimHost, scene: &Scene) -> Result<HashMap<String, ElementId>, SceneError> {
    let mut ids = HashMap::new();
    for element in &scene.elements {
        let [x, y, width, height] = element.rect;
        let mut sim = SimElement::new(element.id.clone(), x, y, width, height)
            .overflow(element.overflow)
            .display(element.display);
        if let Some(parent) = &element.parent {
            let parent_id = ids.get(parent).copied().ok_or_else(|| SceneError::UnknownParent {
                element: element.id.clone(),
                parent: parent.clone(),
            })?;
            sim = sim.parent(parent_id);
        }
        ids.insert(element.id.clone(), host.add_element(sim));
    }
    Ok(ids)
}

/// `on_loading` taking `load_ms` of virtual time.
fn loading_hooks(host: &Rc<SimHost>, load_ms: u64) -> Hooks {
    if load_ms == 0 {
        return Hooks::new();
    }
    let host = Rc::clone(host);
    Hooks::new().on_loading(move || {
        let sleep = host.sleep(load_ms);
        async move {
            sleep.await;
            Ok::<(), HookError>(())
        }
    })
}

fn recorder(
    host: &Rc<SimHost>,
    transitions: &Rc<RefCell<Vec<Transition>>>,
    element: &str,
) -> impl Fn(&RenderProps) + 'static {
    let host = Rc::clone(host);
    let transitions = Rc::clone(transitions);
    let element = element.to_string();
    move |props: &RenderProps| {
        transitions.borrow_mut().push(Transition {
            t_ms: host.now_ms(),
            element: element.clone(),
            status: props.status,
        });
    }
}
