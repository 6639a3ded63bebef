//! End-to-end behavior of the cat, its tree and the command surface.

use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::{Value, json};
use tabby_runtime::assembly::{BehaviorCommand, WEIGHT_THRESHOLD};
use tabby_runtime::codec;
use tabby_runtime::generator::{GeneratorError, TreeGenerator};
use tabby_runtime::{Cat, CatConfig, CommandOutcome, Simulation};
use tabby_types::{BehaviorTag, GridBounds, NodeRecord, NodeStatus, Position, TabbyError};

fn seeded(seed: u64) -> CatConfig {
    CatConfig {
        seed: Some(seed),
        ..CatConfig::default()
    }
}

#[test]
fn cat_stays_on_the_grid_for_a_thousand_ticks() {
    for seed in 0..5 {
        let mut cat = Cat::new(seeded(seed));
        assert_eq!(cat.position(), Position::new(40, 12));
        for _ in 0..1000 {
            cat.tick();
            let p = cat.position();
            assert!((0..=79).contains(&p.x) && (0..=23).contains(&p.y), "{p:?}");
        }
    }
}

#[test]
fn small_grids_are_respected_too() {
    let mut cat = Cat::new(CatConfig {
        spawn: Position::new(3, 3),
        bounds: GridBounds::new(8, 6),
        seed: Some(9),
    });
    for _ in 0..2000 {
        cat.tick();
        assert!(GridBounds::new(8, 6).contains(cat.position()));
    }
}

#[test]
fn three_sleeps_put_a_sleep_branch_first() {
    let mut cat = Cat::new(seeded(1));
    for _ in 0..3 {
        cat.modify_behavior(BehaviorCommand::Sleep);
    }
    assert_eq!(cat.weights().get(BehaviorTag::Sleep), 4.0);
    assert!(cat.weights().get(BehaviorTag::Sleep) > WEIGHT_THRESHOLD);

    let root = cat.root();
    assert_eq!(root.kind_tag(), "Selector");
    let first = &root.children()[0];
    assert_eq!(first.name(), "sleep_tree");
    let kinds: Vec<_> = first.children().iter().map(|c| c.kind_tag()).collect();
    assert_eq!(kinds, vec!["RandomWait", "Sleep"]);
    // The standard tree is the fallback.
    let last = root.children().last().unwrap();
    assert_eq!(last.kind_tag(), "Sequence");
    assert_eq!(last.children().len(), 3);
}

#[test]
fn sleeping_cat_reaches_the_sleeping_state() {
    let mut cat = Cat::new(seeded(4));
    for _ in 0..3 {
        cat.modify_behavior(BehaviorCommand::Sleep);
    }
    // RandomWait (at most 3 s) then Sleep: within 40 ticks the cat dozes.
    let slept = (0..40).any(|_| {
        cat.tick();
        cat.root().find_active(tabby_types::AgentState::Sleeping).is_some()
    });
    assert!(slept);
}

#[test]
fn generator_vocabulary_is_mapped_on_import() {
    let record: NodeRecord = serde_json::from_value(json!({
        "type": "Selector",
        "name": "Selector",
        "children": [
            {"type": "CustomAction", "name": "AgentPatrol"},
            {"type": "CustomCondition", "name": "IsHungry"}
        ]
    }))
    .unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    let tree = codec::import(&record, &mut rng);

    assert_eq!(tree.kind_tag(), "Selector");
    let kinds: Vec<_> = tree.children().iter().map(|c| c.kind_tag()).collect();
    assert_eq!(kinds, vec!["Wander", "Interact"]);
}

#[test]
fn stalled_sequence_never_reaches_second_child() {
    let mut cat = Cat::new(seeded(2));
    cat.load_structure(json!({
        "type": "Sequence",
        "name": "stall",
        "children": [
            {"type": "Wander", "name": "forever"},
            {"type": "Sleep", "name": "never"}
        ]
    }))
    .unwrap();
    for _ in 0..500 {
        assert_eq!(cat.tick(), NodeStatus::Running);
        assert_eq!(cat.root().current_child(), Some(0));
        assert_eq!(cat.root().children()[1].status(), NodeStatus::Running);
    }
}

#[test]
fn export_import_round_trip_through_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cat.json");

    let mut cat = Cat::new(seeded(3));
    cat.modify_behavior(BehaviorCommand::Explore);
    cat.modify_behavior(BehaviorCommand::Interact);
    cat.modify_behavior(BehaviorCommand::Play);
    cat.modify_behavior(BehaviorCommand::Play);
    for _ in 0..25 {
        cat.tick();
    }
    let exported = cat.behavior_tree_json(false).unwrap();
    cat.export_to_json(&path).unwrap();

    let mut other = Cat::new(seeded(99));
    other.load_behavior_tree(&path).unwrap();
    assert_eq!(other.behavior_tree_json(false).unwrap(), exported);
}

#[test]
fn broken_file_leaves_a_tickable_default_tree() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "[1, 2, 3]").unwrap();

    let mut cat = Cat::new(seeded(5));
    cat.modify_behavior(BehaviorCommand::Wander);
    cat.modify_behavior(BehaviorCommand::Wander);
    let err = cat.load_behavior_tree(&path).unwrap_err();
    assert!(matches!(err, TabbyError::Serialization(_)));

    let fresh = Cat::new(seeded(5));
    let shape = |v: &Value| v.to_string().replace(char::is_numeric, "");
    assert_eq!(
        shape(&cat.behavior_tree_json(false).unwrap()),
        shape(&fresh.behavior_tree_json(false).unwrap())
    );
    for _ in 0..100 {
        cat.tick();
    }
}

struct ScriptedGenerator(Value);

#[async_trait]
impl TreeGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        _instruction: &str,
        _current_tree: &Value,
    ) -> Result<Option<Value>, GeneratorError> {
        Ok(Some(self.0.clone()))
    }
}

#[tokio::test]
async fn free_text_is_routed_to_the_generator_and_then_reassembled() {
    let generated = json!({"structure": {
        "name": "BehaviorTree", "type": "Root",
        "children": [
            {"name": "Sequence", "type": "Sequence", "children": [
                {"type": "CustomCondition", "name": "IsTired"},
                {"type": "CustomAction", "name": "Sleep"}
            ]},
            {"type": "WaitTime", "name": "WaitTime", "params": [2.5]}
        ]
    }});
    let mut sim = Simulation::new(seeded(7)).with_generator(ScriptedGenerator(generated));

    let outcome = sim.apply_command("take a nap when tired").await.unwrap();
    // Two top-level children under Root become a Sequence of them.
    assert_eq!(outcome, CommandOutcome::Generated { nodes: 5 });
    let root = sim.cat().root();
    assert_eq!(root.kind_tag(), "Sequence");
    assert_eq!(root.children()[1].kind_tag(), "RandomWait");
    assert_eq!(root.children()[1].param(), Some(2.5));
    for _ in 0..50 {
        sim.tick();
    }

    // A built-in command goes back to the assembled tree.
    let outcome = sim.apply_command("default").await.unwrap();
    assert_eq!(outcome, CommandOutcome::Builtin(BehaviorCommand::Default));
    assert!(!sim.cat().is_loaded());
    assert_eq!(sim.cat().root().children().len(), 3);
    assert_eq!(
        sim.history().collect::<Vec<_>>(),
        vec!["default", "take a nap when tired"]
    );
}
