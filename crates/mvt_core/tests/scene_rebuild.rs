use futures::executor::LocalPool;
use futures::task::LocalSpawnExt;
use futures::FutureExt;
use mvt_core::config::{GROUP_DIVISION, GROUP_FUNCTION, GROUP_MU_ABSCISSAS, MAX_DIVISIONS};
use mvt_core::scene::divisions;
use mvt_core::{
    AliveDelivery, CreationTracker, Handle, InMemoryStore, MvtScene, ObjectStore, SceneAnchors,
    SceneConfig, SceneContext, SceneError, VisibilityGroups,
};
use std::rc::Rc;

fn boot(delivery: AliveDelivery) -> (Rc<InMemoryStore>, LocalPool, MvtScene) {
    boot_with(delivery, SceneConfig::default())
}

fn boot_with(
    delivery: AliveDelivery,
    config: SceneConfig,
) -> (Rc<InMemoryStore>, LocalPool, MvtScene) {
    let store = Rc::new(InMemoryStore::new(delivery));
    let mut pool = LocalPool::new();
    let spawner = pool.spawner();
    let init = spawner
        .spawn_local_with_handle(MvtScene::init(
            Rc::clone(&store) as Rc<dyn ObjectStore>,
            spawner.clone(),
            config,
        ))
        .unwrap();
    store.run_until_idle(&mut pool);
    let scene = init.now_or_never().unwrap().unwrap();
    (store, pool, scene)
}

fn has_command(store: &InMemoryStore, prefix: &str) -> bool {
    store
        .created_commands()
        .iter()
        .any(|command| command.starts_with(prefix))
}

#[test]
fn init_creates_permanent_scene_and_first_construction() {
    for delivery in [AliveDelivery::Deferred, AliveDelivery::Immediate] {
        let (store, _pool, scene) = boot(delivery);

        assert_eq!(scene.divisions(), 1);
        assert_eq!(scene.toggles().len(), SceneConfig::default().groups.len());
        assert!(has_command(&store, "k = Slider(1, 6, 1)"));
        assert!(has_command(&store, "f(x) = 1/4 * x^3 + 1"));
        assert!(has_command(&store, "f'(x) = Derivative(f)"));
        assert!(has_command(
            &store,
            "x_{AB}(i) = x(A) + (x(B) - x(A))/k * (i-1)"
        ));
        assert!(has_command(&store, "Q_{f'} = Polygon(A, B, Q_{B'}, Q_{A'})"));

        let tracker = scene.tracker();
        assert!(tracker.is_transient(&Handle::from("F_{D1}")));
        assert!(!tracker.is_transient(&Handle::from("f")));
        assert!(!tracker.is_transient(scene.slider()));
        assert_eq!(tracker.pending_interest_count(), 0);
        assert_eq!(tracker.unmatched_count(), 0);
        assert_eq!(
            scene.groups().permanent_members(GROUP_FUNCTION).unwrap(),
            vec![Handle::from("f")]
        );
    }
}

#[test]
fn single_division_skips_interval_secant_and_mean_slope() {
    let (store, _pool, _scene) = boot(AliveDelivery::Deferred);

    assert!(!has_command(&store, "S_I ="));
    assert!(!has_command(&store, "s_G ="));
    assert!(!has_command(&store, "μ ="));
    assert!(has_command(&store, "L_{f'} = Point({x(μ_{1}), f'(x(μ_{1}))})"));
    assert!(!store.object(&Handle::from("L_{f'}")).unwrap().visible);
}

#[test]
fn build_can_run_on_a_bare_context() {
    let store = Rc::new(InMemoryStore::new(AliveDelivery::Immediate));
    let config = SceneConfig::default();
    let tracker = CreationTracker::attach(Rc::clone(&store) as Rc<dyn ObjectStore>);
    let groups = VisibilityGroups::new(Rc::clone(&store) as Rc<dyn ObjectStore>, &config.groups);
    let ctx = SceneContext::new(tracker, groups, config, SceneAnchors::default());

    divisions::build(&ctx, 1).now_or_never().unwrap().unwrap();
    assert!(!has_command(&store, "S_I ="));
    assert_eq!(
        ctx.groups().temporary_members(GROUP_MU_ABSCISSAS).unwrap(),
        vec![Handle::from("μ_{1}")]
    );

    let zero = divisions::build(&ctx, 0).now_or_never().unwrap();
    assert_eq!(zero, Err(SceneError::InvalidDivisionCount(0)));
}

#[test]
fn build_rejects_counts_above_the_division_limit() {
    let store = Rc::new(InMemoryStore::new(AliveDelivery::Immediate));
    let config = SceneConfig::default();
    let tracker = CreationTracker::attach(Rc::clone(&store) as Rc<dyn ObjectStore>);
    let groups = VisibilityGroups::new(Rc::clone(&store) as Rc<dyn ObjectStore>, &config.groups);
    let ctx = SceneContext::new(tracker, groups, config, SceneAnchors::default());

    for count in [MAX_DIVISIONS + 1, u32::MAX] {
        let result = divisions::build(&ctx, count).now_or_never().unwrap();
        assert_eq!(result, Err(SceneError::InvalidDivisionCount(count)));
    }
    assert!(store.calls().is_empty());
}

#[test]
fn slider_change_rebuilds_with_mean_slope() {
    let (store, mut pool, scene) = boot(AliveDelivery::Deferred);
    let generation = scene.tracker().generation();

    store.set_value(scene.slider(), 3.0);
    store.run_until_idle(&mut pool);

    assert_eq!(scene.divisions(), 3);
    assert_eq!(scene.tracker().generation(), generation + 1);
    assert!(has_command(&store, "S_I = Segment(F_{D1}, F_{D4})"));
    assert!(has_command(&store, "s_G = (s_{D1} + s_{D2} + s_{D3}) / 3"));
    assert!(has_command(
        &store,
        "μ = Point({Element(KeepIf(x >= x(A) && x <= x(B), NSolutions(f' = s_G)), 1), 0})"
    ));
    assert!(store.deleted().contains(&Handle::from("μ_{1}")));
    assert!(store.contains(&Handle::from("F_{D4}")));
    assert!(store.contains(&Handle::from("f")));
    assert_eq!(scene.tracker().pending_interest_count(), 0);
}

#[test]
fn rebuild_tears_down_in_reverse_creation_order() {
    let (store, mut pool, scene) = boot(AliveDelivery::Immediate);
    let mut expected = scene.tracker().transient_handles();
    expected.reverse();
    store.clear_calls();

    store.set_value(scene.slider(), 2.0);
    store.run_until_idle(&mut pool);

    assert_eq!(store.deleted(), expected);
}

#[test]
fn slider_update_without_value_change_is_ignored() {
    let (store, mut pool, scene) = boot(AliveDelivery::Deferred);
    let generation = scene.tracker().generation();
    store.clear_calls();

    store.touch(scene.slider());
    store.run_until_idle(&mut pool);

    assert!(store.calls().is_empty());
    assert_eq!(scene.tracker().generation(), generation);
}

#[test]
fn undefined_function_tears_down_without_rebuilding() {
    let (store, mut pool, scene) = boot(AliveDelivery::Deferred);
    let function = scene.anchors().function.clone();
    store.clear_calls();

    store.redefine(&function, "f(x) = ", false);
    store.run_until_idle(&mut pool);
    assert!(store.created_commands().is_empty());
    assert!(scene.tracker().transient_handles().is_empty());
    assert!(!store.deleted().is_empty());

    store.redefine(&function, "f(x) = x^2", true);
    store.run_until_idle(&mut pool);
    assert!(has_command(&store, "x_{D1} = x_{AB}(1)"));
    assert!(!scene.tracker().transient_handles().is_empty());
}

#[test]
fn group_toggle_hides_and_shows_members() {
    let (store, mut pool, scene) = boot(AliveDelivery::Deferred);
    let toggle = scene.groups().toggle_of(GROUP_DIVISION).unwrap();
    let members = scene.groups().temporary_members(GROUP_DIVISION).unwrap();
    assert!(!members.is_empty());

    store.set_value(&toggle, 0.0);
    for member in &members {
        assert!(!store.object(member).unwrap().visible, "{member} hidden");
    }

    store.set_value(&toggle, 1.0);
    for member in &members {
        assert!(store.object(member).unwrap().visible, "{member} shown");
    }

    store.set_value(&toggle, 0.0);
    store.set_value(scene.slider(), 2.0);
    store.run_until_idle(&mut pool);
    let rebuilt = scene.groups().temporary_members(GROUP_DIVISION).unwrap();
    assert!(rebuilt.contains(&Handle::from("F_{D3}")));
    for member in &rebuilt {
        assert!(!store.object(member).unwrap().visible, "{member} stays hidden");
    }
}

#[test]
fn function_toggle_applies_to_permanent_members() {
    let (store, _pool, scene) = boot(AliveDelivery::Immediate);
    let toggle = scene.groups().toggle_of(GROUP_FUNCTION).unwrap();

    store.set_value(&toggle, 0.0);
    assert_eq!(store.visibility_calls_for(&Handle::from("f")).last(), Some(&false));
}

#[test]
fn overlapping_rebuilds_leave_only_the_latest_construction() {
    let (store, mut pool, scene) = boot(AliveDelivery::Deferred);

    store.set_value(scene.slider(), 2.0);
    pool.run_until_stalled();
    store.set_value(scene.slider(), 3.0);
    store.run_until_idle(&mut pool);

    assert_eq!(scene.divisions(), 3);
    assert!(has_command(&store, "s_G = (s_{D1} + s_{D2} + s_{D3}) / 3"));
    assert!(!has_command(&store, "s_G = (s_{D1} + s_{D2}) / 2"));
    assert!(store.contains(&Handle::from("F_{D4}")));
    assert_eq!(scene.tracker().pending_interest_count(), 0);
    assert_eq!(scene.tracker().unmatched_count(), 0);
}

#[test]
fn invalid_config_fails_before_any_creation() {
    let store = Rc::new(InMemoryStore::new(AliveDelivery::Immediate));
    let pool = LocalPool::new();
    let mut config = SceneConfig::default();
    config.tangent_length = 0.0;

    let result = MvtScene::init(
        Rc::clone(&store) as Rc<dyn ObjectStore>,
        pool.spawner(),
        config,
    )
    .now_or_never()
    .unwrap();
    assert!(matches!(result, Err(SceneError::Config(_))));
    assert!(store.calls().is_empty());
}
