//! Scene lifecycle: bootstrap, input watchers and rebuild scheduling.
//!
//! # Responsibility
//! - Create the permanent objects and controls once.
//! - Watch the division slider and the function, and rebuild the transient
//!   construction on relevant changes.
//!
//! # Invariants
//! - Each rebuild resets the tracker before scheduling the new construction.
//!   A superseded construction stops at its next creation or registration.
//! - Groups are re-applied only when no newer rebuild started meanwhile.

use crate::config::{
    SceneConfig, GROUP_DERIVATIVE, GROUP_FUNCTION, GROUP_INTERVAL_BOUNDS, GROUP_IRREGULAR,
};
use crate::group::visibility::VisibilityGroups;
use crate::model::handle::Handle;
use crate::scene::controls::{self, ControlLayout};
use crate::scene::{divisions, SceneAnchors, SceneContext, SceneError};
use crate::store::ObjectStore;
use crate::sync::creation::CreateOptions;
use crate::sync::tracker::CreationTracker;
use futures::executor::LocalSpawner;
use futures::task::LocalSpawnExt;
use log::{debug, error, info};
use std::cell::Cell;
use std::rc::Rc;

/// Running scene. Clones share the same state.
#[derive(Clone)]
pub struct MvtScene {
    inner: Rc<SceneInner>,
}

struct SceneInner {
    ctx: SceneContext,
    spawner: LocalSpawner,
    slider: Handle,
    toggles: Vec<Handle>,
    last_divisions: Cell<u32>,
}

impl MvtScene {
    /// Creates the permanent scene, registers the watchers and schedules the
    /// first construction on `spawner`.
    pub async fn init(
        store: Rc<dyn ObjectStore>,
        spawner: LocalSpawner,
        config: SceneConfig,
    ) -> Result<Self, SceneError> {
        config.validate()?;
        info!(
            "event=scene_init module=scene status=start groups={}",
            config.groups.len()
        );

        let tracker = CreationTracker::attach(Rc::clone(&store));
        let groups = VisibilityGroups::new(Rc::clone(&store), &config.groups);
        let mut layout = ControlLayout::new(&config);

        let toggles = controls::setup_group_toggles(&tracker, &groups, &mut layout).await?;
        let slider = controls::create_slider(&tracker, &config.divisions, &mut layout).await?;
        let anchors = permanent_objects(&tracker, &groups, &config, &slider, &mut layout).await?;

        let ctx = SceneContext::new(tracker, groups, config, anchors);
        let scene = Self {
            inner: Rc::new(SceneInner {
                ctx,
                spawner,
                slider,
                toggles,
                last_divisions: Cell::new(0),
            }),
        };
        scene.watch_inputs();

        let divisions = scene.inner.current_divisions();
        scene.inner.last_divisions.set(divisions);
        scene.inner.rebuild(divisions, true)?;
        info!("event=scene_init module=scene status=ok divisions={divisions}");
        Ok(scene)
    }

    /// Tears down and rebuilds the construction for `divisions`.
    pub fn rebuild(&self, divisions: u32) -> Result<(), SceneError> {
        self.inner.last_divisions.set(divisions);
        self.inner.rebuild(divisions, true)
    }

    /// Division count the current construction was requested with.
    pub fn divisions(&self) -> u32 {
        self.inner.last_divisions.get()
    }

    pub fn slider(&self) -> &Handle {
        &self.inner.slider
    }

    /// Group toggles in group order.
    pub fn toggles(&self) -> &[Handle] {
        &self.inner.toggles
    }

    pub fn context(&self) -> &SceneContext {
        &self.inner.ctx
    }

    pub fn tracker(&self) -> &CreationTracker {
        &self.inner.ctx.tracker
    }

    pub fn groups(&self) -> &VisibilityGroups {
        &self.inner.ctx.groups
    }

    pub fn anchors(&self) -> &SceneAnchors {
        &self.inner.ctx.anchors
    }

    fn watch_inputs(&self) {
        let store = &self.inner.ctx.store;

        let weak = Rc::downgrade(&self.inner);
        store.register_update_listener(
            &self.inner.slider,
            Rc::new(move |_: &Handle| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_slider_update();
                }
            }),
        );

        let weak = Rc::downgrade(&self.inner);
        store.register_update_listener(
            &self.inner.ctx.anchors.function,
            Rc::new(move |_: &Handle| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_function_update();
                }
            }),
        );
    }
}

impl SceneInner {
    fn current_divisions(&self) -> u32 {
        let range = &self.ctx.config.divisions;
        let raw = self.ctx.store.get_value(&self.slider);
        if raw.is_nan() {
            return range.min;
        }
        raw.round().clamp(f64::from(range.min), f64::from(range.max)) as u32
    }

    fn on_slider_update(&self) {
        let divisions = self.current_divisions();
        if divisions == self.last_divisions.get() {
            debug!(
                "event=slider_update module=scene status=skip reason=unchanged divisions={divisions}"
            );
            return;
        }
        self.last_divisions.set(divisions);
        if let Err(err) = self.rebuild(divisions, true) {
            error!("event=slider_update module=scene status=error error={err}");
        }
    }

    fn on_function_update(&self) {
        let defined = self.ctx.store.is_defined(&self.ctx.anchors.function);
        let divisions = self.current_divisions();
        self.last_divisions.set(divisions);
        if let Err(err) = self.rebuild(divisions, defined) {
            error!("event=function_update module=scene status=error error={err}");
        }
    }

    /// Resets and clears synchronously, then schedules the construction.
    fn rebuild(&self, divisions: u32, construct: bool) -> Result<(), SceneError> {
        self.ctx.tracker.reset();
        self.ctx.groups.clear_temporary();
        if !construct {
            info!("event=rebuild module=scene status=skip reason=function_undefined");
            return Ok(());
        }

        let generation = self.ctx.tracker.generation();
        let ctx = self.ctx.for_generation(generation);
        self.spawner
            .spawn_local(async move {
                match divisions::build(&ctx, divisions).await {
                    Ok(()) if ctx.tracker.generation() == generation => ctx.groups.apply_all(),
                    Ok(()) => debug!(
                        "event=rebuild module=scene status=skip reason=superseded generation={generation}"
                    ),
                    Err(err) if err.is_superseded() => debug!(
                        "event=rebuild module=scene status=skip reason=superseded generation={generation} error={err}"
                    ),
                    Err(err) => error!(
                        "event=rebuild module=scene status=error generation={generation} error={err}"
                    ),
                }
            })
            .map_err(|err| SceneError::Spawn(err.to_string()))
    }
}

/// Function, derivative, interval bounds, integral area and the division
/// abscissa helper.
async fn permanent_objects(
    tracker: &CreationTracker,
    groups: &VisibilityGroups,
    config: &SceneConfig,
    slider: &Handle,
    layout: &mut ControlLayout,
) -> Result<SceneAnchors, SceneError> {
    let store = tracker.store();
    let create = |command: String| tracker.create(&command, CreateOptions::permanent());

    let function = create(format!("f(x) = {}", config.function_definition.trim())).await?;
    groups.register(&function, GROUP_FUNCTION, true)?;
    controls::create_function_input(tracker, &function, layout).await?;

    let derivative = create(format!("f'(x) = Derivative({function})")).await?;
    groups.register(&derivative, GROUP_DERIVATIVE, true)?;

    let start_value = create(format!("a = {}", config.interval.start)).await?;
    let end_value = create(format!("b = {}", config.interval.end)).await?;
    let start_point = create(format!("A = ({start_value}, y(yAxis))")).await?;
    let end_point = create(format!("B = ({end_value}, y(yAxis))")).await?;
    groups.register(&start_point, GROUP_INTERVAL_BOUNDS, true)?;
    groups.register(&end_point, GROUP_INTERVAL_BOUNDS, true)?;

    let integral_area = create(format!(
        "A_{{f'}} = Integral({derivative}, x({start_point}), x({end_point}))"
    ))
    .await?;
    store.set_label_visible(&integral_area, false);
    groups.register(&integral_area, GROUP_IRREGULAR, true)?;
    store.set_filling(&integral_area, config.area_filling);

    let division_abscissa = create(format!(
        "x_{{AB}}(i) = x({start_point}) + (x({end_point}) - x({start_point}))/{slider} * (i-1)"
    ))
    .await?;
    store.set_visible(&division_abscissa, false);

    Ok(SceneAnchors {
        function,
        derivative,
        start_point,
        end_point,
        integral_area,
        division_abscissa,
        text_anchor_y: layout.cursor(),
    })
}
