use mvt_core::{Color, GroupSpec, Handle, InMemoryStore, ObjectStore, VisibilityGroups};
use std::rc::Rc;

fn setup() -> (Rc<InMemoryStore>, VisibilityGroups, Handle) {
    let store = Rc::new(InMemoryStore::default());
    let specs = vec![GroupSpec::new(
        "division",
        "Column Dividers",
        Color::rgb(0xF8, 0xBA, 0x2A),
        Color::BLACK,
        4,
    )];
    let groups = VisibilityGroups::new(Rc::clone(&store) as Rc<dyn ObjectStore>, &specs);
    let toggle = Handle::new(
        store
            .submit_creation_command("b_g_{0} = Checkbox()")
            .unwrap(),
    );
    store.set_value(&toggle, 1.0);
    groups.bind_toggle("division", toggle.clone()).unwrap();
    (store, groups, toggle)
}

#[test]
fn apply_all_follows_toggle_for_current_members_only() {
    let (store, groups, toggle) = setup();
    let old_a = Handle::from("F_{D1}");
    let old_b = Handle::from("F_{D2}");
    let permanent = Handle::from("A");
    groups.register(&old_a, "division", false).unwrap();
    groups.register(&old_b, "division", false).unwrap();
    groups.register(&permanent, "division", true).unwrap();

    store.set_value(&toggle, 0.0);
    store.clear_calls();
    groups.apply_all();
    for member in [&old_a, &old_b, &permanent] {
        assert_eq!(store.visibility_calls_for(member), vec![false]);
    }

    groups.clear_temporary();
    let fresh = Handle::from("F_{D3}");
    groups.register(&fresh, "division", false).unwrap();
    store.set_value(&toggle, 1.0);
    store.clear_calls();
    groups.apply_all();

    assert_eq!(store.visibility_calls_for(&fresh), vec![true]);
    assert_eq!(store.visibility_calls_for(&permanent), vec![true]);
    assert!(store.visibility_calls_for(&old_a).is_empty());
    assert!(store.visibility_calls_for(&old_b).is_empty());
}

#[test]
fn toggle_update_applies_its_group_live() {
    let (store, groups, toggle) = setup();
    let member = Handle::from("V_{D1}");
    groups.register(&member, "division", false).unwrap();

    store.set_value(&toggle, 0.0);
    assert_eq!(store.visibility_calls_for(&member), vec![false]);
    store.set_value(&toggle, 1.0);
    assert_eq!(store.visibility_calls_for(&member), vec![false, true]);
}

#[test]
fn registration_colors_members_with_group_color() {
    let (store, groups, _toggle) = setup();
    let member = Handle::new(store.submit_creation_command("F_{D1} = (1, 2)").unwrap());
    groups.register(&member, "division", false).unwrap();

    let object = store.object(&member).unwrap();
    assert_eq!(object.color, Some(Color::rgb(0xF8, 0xBA, 0x2A)));
    assert_eq!(object.layer, 4);
}
