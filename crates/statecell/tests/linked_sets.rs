//! End-to-end scenarios for linked sets driven through a registry.

use std::cell::RefCell;
use std::rc::Rc;

use statecell::{
    AccessGuard, ConfigError, EditorMode, ObservableSet, ObservableValue, Registry, Roles,
    SetConfig, SetHook, ValueConfig,
};

fn transient(name: &str, initial: &[&'static str]) -> ObservableSet<&'static str> {
    ObservableSet::new(
        SetConfig::new(name)
            .with_initial(initial.iter().copied())
            .with_persistent(false),
    )
}

#[test]
fn start_full_subset_composes_in_insertion_order() {
    let parent = ObservableSet::new(SetConfig::new("parent").with_initial([3, 4]));
    let child = ObservableSet::new(
        SetConfig::new("child")
            .with_initial([1, 2, 3])
            .with_start_full(true),
    );
    child.set_subset_of(&parent);

    let mut registry = Registry::new();
    registry.register(parent.clone()).unwrap();
    registry.register(child.clone()).unwrap();
    registry.start().unwrap();

    assert_eq!(child.items(), vec![1, 2, 3, 4]);
}

#[test]
fn subset_add_cascades_to_superset_once() {
    // `spawned` is the superset of `bosses`; adds to `bosses` cascade upward.
    let spawned = transient("spawned", &[]);
    let bosses = transient("bosses", &[]);
    bosses.set_subset_of(&spawned);

    let mut registry = Registry::new();
    registry.register(spawned.clone()).unwrap();
    registry.register(bosses.clone()).unwrap();
    registry.start().unwrap();

    bosses.add("lich");
    bosses.add("lich");
    spawned.add("lich");
    assert_eq!(spawned.items(), vec!["lich"]);
    assert_eq!(bosses.items(), vec!["lich"]);
}

#[test]
fn superset_add_stays_out_of_subset() {
    let spawned = transient("spawned", &[]);
    let bosses = transient("bosses", &[]);
    bosses.set_subset_of(&spawned);

    let mut registry = Registry::new();
    registry.register(spawned.clone()).unwrap();
    registry.register(bosses.clone()).unwrap();
    registry.start().unwrap();

    spawned.clear_to_initial();
    spawned.add("goblin");
    assert_eq!(spawned.items(), vec!["goblin"]);
    assert!(bosses.is_empty());

    // Removals, on the other hand, follow the superset once it has cleared.
    bosses.add("lich");
    spawned.remove("lich");
    assert!(bosses.is_empty());
}

#[test]
fn extension_remove_reaches_its_base_after_clear() {
    // `inventory` extends `equipped`; removals from `inventory` cascade to it.
    let equipped = transient("equipped", &["sword", "shield"]);
    let inventory = transient("inventory", &["potion"]);
    inventory.set_extension_of(&equipped);
    inventory.initialize().unwrap();
    assert_eq!(inventory.items(), vec!["potion", "sword", "shield"]);

    inventory.clear_to_initial();
    inventory.remove("sword");
    assert_eq!(equipped.items(), vec!["shield"]);

    // Removing something the base never had is harmless.
    inventory.remove("potion");
    assert_eq!(equipped.items(), vec!["shield"]);
}

#[test]
fn superset_clear_cycles_drive_subset_removals() {
    let actors = transient("actors", &["a", "b", "c"]);
    let visible = ObservableSet::new(
        SetConfig::new("visible")
            .with_start_full(true)
            .with_persistent(false),
    );
    visible.set_subset_of(&actors);
    visible.initialize().unwrap();

    for _ in 0..3 {
        actors.clear_to_initial();
        assert_eq!(actors.hook_count(SetHook::AfterRemove), 1);
    }

    actors.remove("b");
    assert_eq!(visible.items(), vec!["a", "c"]);
}

#[test]
fn base_clear_cycles_drive_extension_additions() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let base = transient("base", &[]);
    let ext = transient("ext", &[]);
    ext.set_extension_of(&base);
    ext.initialize().unwrap();
    let log_clone = Rc::clone(&log);
    ext.after_add(move |item| log_clone.borrow_mut().push(*item));

    base.clear_to_initial();
    base.add("x");
    base.clear_to_initial();
    base.add("y");

    assert_eq!(*log.borrow(), vec!["x", "y"]);
    assert_eq!(ext.items(), vec!["x", "y"]);
}

#[test]
fn chained_subsets_cascade_all_the_way_up() {
    let world = transient("world", &[]);
    let region = transient("region", &[]);
    let room = transient("room", &[]);
    region.set_subset_of(&world);
    room.set_subset_of(&region);

    room.add("torch");
    assert!(region.contains(&"torch"));
    assert!(world.contains(&"torch"));
}

#[test]
fn mutual_subset_extension_fails_at_start() {
    let a = transient("a", &[]);
    let b = transient("b", &[]);
    a.set_subset_of(&b);
    b.set_extension_of(&a);

    let mut registry = Registry::new();
    registry.register(a.clone()).unwrap();
    registry.register(b.clone()).unwrap();

    assert_eq!(
        registry.start(),
        Err(ConfigError::SubsetOfExtension {
            set: "a".into(),
            superset: "b".into(),
        })
    );
}

#[test]
fn scene_reset_respects_persistence() {
    let score = ObservableValue::new(ValueConfig::new("score", 0).with_persistent(false));
    let unlocked = ObservableSet::new(SetConfig::new("unlocked").with_initial(["intro"]));
    let picked = transient("picked", &["starter"]);

    let mut registry = Registry::new();
    registry.register(score.clone()).unwrap();
    registry.register(unlocked.clone()).unwrap();
    registry.register(picked.clone()).unwrap();
    registry.start().unwrap();

    score.set_value(120);
    unlocked.add("level-2");
    picked.add("gem");

    registry.scene_reset();
    assert_eq!(score.value(), 0);
    assert_eq!(unlocked.items(), vec!["intro", "level-2"]);
    assert_eq!(picked.items(), vec!["starter"]);
}

#[test]
fn validate_all_in_play_mode() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let hp = ObservableValue::with_initial("hp", 7);
    let seen_clone = Rc::clone(&seen);
    hp.after_change(move |v| seen_clone.borrow_mut().push(*v));
    let bag = transient("bag", &["rope"]);
    bag.add("lamp");

    let mut registry = Registry::new();
    registry.register(hp.clone()).unwrap();
    registry.register(bag.clone()).unwrap();
    registry.validate_all(EditorMode::Playing);

    assert_eq!(*seen.borrow(), vec![7]);
    assert_eq!(bag.items(), vec!["rope"]);
}

#[test]
fn guarded_access_still_mutates() {
    let set = ObservableSet::new(
        SetConfig::new("server_only")
            .with_visibility(Roles::SERVER)
            .with_persistent(false),
    );
    set.set_guard(AccessGuard::roles(|| Roles::CLIENT));
    set.add(1u32);
    set.remove(1);
    set.add(2);
    assert_eq!(set.items(), vec![2]);
}
