//! Tree assembly policy.
//!
//! The cat's tree is rebuilt from a set of long-lived parts every time its
//! behavior weights change.  The parts live on a [`PartsBench`] between
//! assemblies; [`PartsBench::assemble`] moves them into freshly allocated
//! wrapper composites and [`PartsBench::salvage`] moves them back out.
//!
//! Standard tree:
//!
//! ```text
//! Sequence
//! ├── ObserveItems
//! ├── RandomWait
//! └── Selector
//!     ├── left:  Sequence(MoveToTarget, Interact)
//!     └── right: Sequence(ObserveAndWait, Explore, Interact)
//! ```
//!
//! When any weight exceeds [`WEIGHT_THRESHOLD`], the standard tree becomes the
//! last branch of an outer `Selector` named `root`.  Each of sleep, play and
//! wander whose weight is above the threshold contributes a
//! `Sequence(RandomWait, <leaf>)` branch, highest weight first.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use tabby_types::{BehaviorTag, BehaviorWeights, TabbyError};
use tracing::debug;

use crate::behavior_tree::{BehaviorNode, NodeKind, NodeType};

/// Weight above which a behavior earns a priority branch.
pub const WEIGHT_THRESHOLD: f64 = 1.5;
/// Added to a tag's weight by its command.
pub const WEIGHT_INCREMENT: f64 = 1.0;
/// Multiplier applied to competing tags.
pub const WEIGHT_DECAY: f64 = 0.8;
/// Multiplier applied to the observation window by `observe`.
pub const OBSERVE_SCALE: f64 = 1.5;

/// Name of the outer priority selector.
pub const ROOT_NAME: &str = "root";

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// A built-in behavior command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorCommand {
    Sleep,
    Play,
    Wander,
    Explore,
    Interact,
    Observe,
    /// Reset weights and recreate every part.
    Default,
}

impl BehaviorCommand {
    pub const ALL: [BehaviorCommand; 7] = [
        BehaviorCommand::Sleep,
        BehaviorCommand::Play,
        BehaviorCommand::Wander,
        BehaviorCommand::Explore,
        BehaviorCommand::Interact,
        BehaviorCommand::Observe,
        BehaviorCommand::Default,
    ];

    pub fn as_str(&self) -> &'static str {
        match self.tag() {
            Some(tag) => tag.as_str(),
            None => "default",
        }
    }

    /// The weight this command bumps.  `None` for `Default`.
    pub fn tag(&self) -> Option<BehaviorTag> {
        match self {
            BehaviorCommand::Sleep => Some(BehaviorTag::Sleep),
            BehaviorCommand::Play => Some(BehaviorTag::Play),
            BehaviorCommand::Wander => Some(BehaviorTag::Wander),
            BehaviorCommand::Explore => Some(BehaviorTag::Explore),
            BehaviorCommand::Interact => Some(BehaviorTag::Interact),
            BehaviorCommand::Observe => Some(BehaviorTag::Observe),
            BehaviorCommand::Default => None,
        }
    }
}

impl fmt::Display for BehaviorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive, surrounding whitespace ignored.
impl FromStr for BehaviorCommand {
    type Err = TabbyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let word = s.trim().to_ascii_lowercase();
        BehaviorCommand::ALL
            .into_iter()
            .find(|c| c.as_str() == word)
            .ok_or_else(|| TabbyError::UnknownCommand(s.trim().to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Parts bench
// ─────────────────────────────────────────────────────────────────────────────

/// Addresses of the persistent parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    ObserveItems,
    RandomWait,
    Left,
    Right,
    Sleep,
    Play,
    Wander,
}

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::ObserveItems => "observe_items",
            Slot::RandomWait => "random_wait",
            Slot::Left => "left_sequence",
            Slot::Right => "right_sequence",
            Slot::Sleep => "sleep",
            Slot::Play => "play",
            Slot::Wander => "wander",
        }
    }

    /// Node type a part in this slot must have.
    pub fn node_type(&self) -> NodeType {
        match self {
            Slot::ObserveItems => NodeType::ObserveItems,
            Slot::RandomWait => NodeType::RandomWait,
            Slot::Left | Slot::Right => NodeType::Sequence,
            Slot::Sleep => NodeType::Sleep,
            Slot::Play => NodeType::Play,
            Slot::Wander => NodeType::Wander,
        }
    }

    /// Slot of the leaf behind a priority branch.
    pub fn for_priority(tag: BehaviorTag) -> Option<Slot> {
        match tag {
            BehaviorTag::Sleep => Some(Slot::Sleep),
            BehaviorTag::Play => Some(Slot::Play),
            BehaviorTag::Wander => Some(Slot::Wander),
            _ => None,
        }
    }

    fn from_leaf(node_type: NodeType) -> Option<Slot> {
        match node_type {
            NodeType::Sleep => Some(Slot::Sleep),
            NodeType::Play => Some(Slot::Play),
            NodeType::Wander => Some(Slot::Wander),
            _ => None,
        }
    }

    /// Build a brand new part for this slot.
    pub fn spawn(&self, rng: &mut StdRng) -> BehaviorNode {
        match self {
            Slot::Left => BehaviorNode::sequence(
                self.as_str(),
                vec![
                    BehaviorNode::spawn(NodeType::MoveToTarget, "move_to_target", rng),
                    BehaviorNode::spawn(NodeType::Interact, "interact", rng),
                ],
            ),
            Slot::Right => BehaviorNode::sequence(
                self.as_str(),
                vec![
                    BehaviorNode::spawn(NodeType::ObserveAndWait, "observe_and_wait", rng),
                    BehaviorNode::spawn(NodeType::Explore, "explore", rng),
                    BehaviorNode::spawn(NodeType::Interact, "interact", rng),
                ],
            ),
            leaf => BehaviorNode::spawn(leaf.node_type(), leaf.as_str(), rng),
        }
    }
}

/// Parts waiting to be assembled into the next tree.
#[derive(Debug, Clone, Default)]
pub struct PartsBench {
    parts: BTreeMap<Slot, BehaviorNode>,
}

impl PartsBench {
    /// An empty bench.  Parts are spawned on first use.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: Slot) -> Option<&BehaviorNode> {
        self.parts.get(&slot)
    }

    /// The part in `slot`, spawning it if the bench has none.
    pub fn part_mut(&mut self, slot: Slot, rng: &mut StdRng) -> &mut BehaviorNode {
        self.parts.entry(slot).or_insert_with(|| slot.spawn(rng))
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    fn take(&mut self, slot: Slot, rng: &mut StdRng) -> BehaviorNode {
        self.parts.remove(&slot).unwrap_or_else(|| slot.spawn(rng))
    }

    fn store(&mut self, slot: Slot, node: Option<BehaviorNode>) {
        match node {
            Some(node) if node.node_type() == slot.node_type() => {
                self.parts.insert(slot, node);
            }
            Some(node) => debug!(
                slot = slot.as_str(),
                found = node.kind_tag(),
                "salvaged part has the wrong shape; it will be respawned"
            ),
            None => debug!(slot = slot.as_str(), "part missing from salvaged tree"),
        }
    }

    /// Move the parts into a new tree shaped by `weights`.
    ///
    /// Priority leaves that do not make the cut stay on the bench.
    pub fn assemble(&mut self, weights: &BehaviorWeights, rng: &mut StdRng) -> BehaviorNode {
        let selector = BehaviorNode::selector(
            "Selector",
            vec![self.take(Slot::Left, rng), self.take(Slot::Right, rng)],
        );
        let standard = BehaviorNode::sequence(
            "Sequence",
            vec![
                self.take(Slot::ObserveItems, rng),
                self.take(Slot::RandomWait, rng),
                selector,
            ],
        );

        if !weights.any_above(WEIGHT_THRESHOLD) {
            return standard;
        }

        let mut branches = Vec::new();
        for (tag, weight) in weights.ranked() {
            if weight <= WEIGHT_THRESHOLD {
                continue;
            }
            let Some(slot) = Slot::for_priority(tag) else {
                continue;
            };
            let leaf = self.take(slot, rng);
            let wait = BehaviorNode::spawn(NodeType::RandomWait, format!("{tag}_wait"), rng);
            branches.push(BehaviorNode::sequence(format!("{tag}_tree"), vec![wait, leaf]));
        }
        branches.push(standard);
        debug!(branches = branches.len(), "assembled priority selector");
        BehaviorNode::selector(ROOT_NAME, branches)
    }

    /// Return the parts of a tree produced by [`assemble`](Self::assemble) to
    /// the bench.  Wrapper composites are dropped.
    pub fn salvage(&mut self, root: BehaviorNode) {
        let standard = if root.node_type() == NodeType::Selector {
            let mut branches = root.into_children();
            let standard = branches.pop();
            for branch in branches {
                self.salvage_priority(branch);
            }
            standard
        } else {
            Some(root)
        };

        let Some(standard) = standard else {
            return;
        };
        let mut parts = standard.into_children().into_iter();
        self.store(Slot::ObserveItems, parts.next());
        self.store(Slot::RandomWait, parts.next());
        if let Some(selector) = parts.next() {
            let mut sides = selector.into_children().into_iter();
            self.store(Slot::Left, sides.next());
            self.store(Slot::Right, sides.next());
        }
    }

    fn salvage_priority(&mut self, branch: BehaviorNode) {
        let Some(leaf) = branch.into_children().pop() else {
            return;
        };
        match Slot::from_leaf(leaf.node_type()) {
            Some(slot) => self.store(slot, Some(leaf)),
            None => debug!(found = leaf.kind_tag(), "unexpected priority leaf dropped"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command effects
// ─────────────────────────────────────────────────────────────────────────────

/// Apply `command` to the weights and the benched parts.
///
/// The caller is expected to have salvaged the live tree first and to
/// reassemble afterwards.
pub fn apply_command(
    command: BehaviorCommand,
    weights: &mut BehaviorWeights,
    bench: &mut PartsBench,
    rng: &mut StdRng,
) {
    if command == BehaviorCommand::Default {
        *weights = BehaviorWeights::default();
        *bench = PartsBench::new();
        return;
    }
    if let Some(tag) = command.tag() {
        weights.bump(tag, WEIGHT_INCREMENT);
    }

    match command {
        BehaviorCommand::Sleep => {
            weights.scale(BehaviorTag::Play, WEIGHT_DECAY);
            weights.scale(BehaviorTag::Wander, WEIGHT_DECAY);
        }
        BehaviorCommand::Play => weights.scale(BehaviorTag::Sleep, WEIGHT_DECAY),
        BehaviorCommand::Explore => {
            let right = bench.part_mut(Slot::Right, rng);
            let previous = right.replace_children(Vec::new()).unwrap_or_default();
            let explore = previous
                .into_iter()
                .find(|c| c.node_type() == NodeType::Explore)
                .unwrap_or_else(|| BehaviorNode::spawn(NodeType::Explore, "explore", rng));
            let wait = BehaviorNode::spawn(NodeType::RandomWait, "explore_wait", rng);
            right.replace_children(vec![wait, explore]);
        }
        BehaviorCommand::Interact => {
            for slot in [Slot::Left, Slot::Right] {
                let side = bench.part_mut(slot, rng);
                let ends_in_interact = match side.children().last() {
                    Some(last) => last.node_type() == NodeType::Interact,
                    None => true,
                };
                if !ends_in_interact {
                    let extra = BehaviorNode::spawn(
                        NodeType::Interact,
                        format!("interact_{}", slot.as_str()),
                        rng,
                    );
                    side.push_child(extra);
                }
            }
        }
        BehaviorCommand::Observe => {
            if let NodeKind::ObserveItems(observe) = bench.part_mut(Slot::ObserveItems, rng).kind_mut() {
                observe.scale_duration(OBSERVE_SCALE);
            }
        }
        BehaviorCommand::Wander | BehaviorCommand::Default => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(5)
    }

    fn tags(node: &BehaviorNode) -> Vec<&'static str> {
        node.children().iter().map(|c| c.kind_tag()).collect()
    }

    fn names(node: &BehaviorNode) -> Vec<&str> {
        node.children().iter().map(|c| c.name()).collect()
    }

    #[test]
    fn commands_parse_case_insensitively() {
        assert_eq!("sleep".parse::<BehaviorCommand>().unwrap(), BehaviorCommand::Sleep);
        assert_eq!("  Default ".parse::<BehaviorCommand>().unwrap(), BehaviorCommand::Default);
        let err = "chase the laser".parse::<BehaviorCommand>().unwrap_err();
        assert_eq!(err, TabbyError::UnknownCommand("chase the laser".into()));
        for c in BehaviorCommand::ALL {
            assert_eq!(c.to_string().parse::<BehaviorCommand>().unwrap(), c);
        }
    }

    #[test]
    fn default_weights_assemble_the_standard_tree() {
        let mut rng = rng();
        let mut bench = PartsBench::new();
        let tree = bench.assemble(&BehaviorWeights::default(), &mut rng);

        assert_eq!(tree.kind_tag(), "Sequence");
        assert_eq!(tags(&tree), vec!["ObserveItems", "RandomWait", "Selector"]);
        let selector = &tree.children()[2];
        assert_eq!(tags(&selector.children()[0]), vec!["MoveToTarget", "Interact"]);
        assert_eq!(
            tags(&selector.children()[1]),
            vec!["ObserveAndWait", "Explore", "Interact"]
        );
        // Priority leaves were never needed.
        assert!(bench.is_empty());
    }

    #[test]
    fn heavy_weights_prepend_priority_branches_in_descending_order() {
        let mut rng = rng();
        let mut bench = PartsBench::new();
        let mut weights = BehaviorWeights::default();
        weights.set(BehaviorTag::Play, 2.0);
        weights.set(BehaviorTag::Wander, 3.0);
        weights.set(BehaviorTag::Explore, 9.0);

        let tree = bench.assemble(&weights, &mut rng);
        assert_eq!(tree.kind_tag(), "Selector");
        assert_eq!(tree.name(), ROOT_NAME);
        assert_eq!(names(&tree), vec!["wander_tree", "play_tree", "Sequence"]);
        let wander = &tree.children()[0];
        assert_eq!(names(wander), vec!["wander_wait", "wander"]);
        // Sleep stayed below the threshold and was never spawned.
        assert_eq!(bench.len(), 0);
        assert!(bench.get(Slot::Sleep).is_none());
    }

    #[test]
    fn weight_exactly_at_threshold_does_not_qualify() {
        let mut rng = rng();
        let mut weights = BehaviorWeights::default();
        weights.set(BehaviorTag::Sleep, WEIGHT_THRESHOLD);
        let tree = PartsBench::new().assemble(&weights, &mut rng);
        assert_eq!(tree.kind_tag(), "Sequence");
    }

    #[test]
    fn high_non_priority_weight_still_wraps_the_standard_tree() {
        let mut rng = rng();
        let mut weights = BehaviorWeights::default();
        weights.set(BehaviorTag::Observe, 2.0);
        let tree = PartsBench::new().assemble(&weights, &mut rng);
        assert_eq!(tree.kind_tag(), "Selector");
        assert_eq!(names(&tree), vec!["Sequence"]);
    }

    #[test]
    fn salvage_then_assemble_keeps_parts() {
        let mut rng = rng();
        let mut bench = PartsBench::new();
        let mut weights = BehaviorWeights::default();
        weights.set(BehaviorTag::Sleep, 4.0);

        let mut tree = bench.assemble(&weights, &mut rng);
        // Mark the persistent parts so they can be recognized afterwards.
        tree.children_mut().unwrap()[0].children_mut().unwrap()[1].set_param(77.0);
        tree.children_mut().unwrap()[1].children_mut().unwrap()[0].set_param(0.25);

        bench.salvage(tree);
        assert_eq!(bench.len(), 5);
        assert_eq!(bench.get(Slot::Sleep).and_then(|n| n.param()), Some(77.0));
        assert_eq!(bench.get(Slot::ObserveItems).and_then(|n| n.param()), Some(0.25));

        let again = bench.assemble(&weights, &mut rng);
        assert_eq!(again.children()[0].children()[1].param(), Some(77.0));
        assert_eq!(again.children()[1].children()[0].param(), Some(0.25));
        assert!(bench.is_empty());
    }

    #[test]
    fn salvage_drops_foreign_shapes() {
        let mut rng = rng();
        let mut bench = PartsBench::new();
        let foreign = BehaviorNode::sequence(
            "Sequence",
            vec![BehaviorNode::spawn(NodeType::Play, "p", &mut rng)],
        );
        bench.salvage(foreign);
        assert!(bench.is_empty());
    }

    #[test]
    fn sleep_command_bumps_and_decays() {
        let mut rng = rng();
        let mut bench = PartsBench::new();
        let mut weights = BehaviorWeights::default();
        apply_command(BehaviorCommand::Sleep, &mut weights, &mut bench, &mut rng);
        assert_eq!(weights.get(BehaviorTag::Sleep), 2.0);
        assert!((weights.get(BehaviorTag::Play) - 0.8).abs() < 1e-12);
        assert!((weights.get(BehaviorTag::Wander) - 0.8).abs() < 1e-12);
        assert_eq!(weights.get(BehaviorTag::Explore), 1.0);

        apply_command(BehaviorCommand::Play, &mut weights, &mut bench, &mut rng);
        assert!((weights.get(BehaviorTag::Play) - 1.8).abs() < 1e-12);
        assert!((weights.get(BehaviorTag::Sleep) - 1.6).abs() < 1e-12);
    }

    #[test]
    fn explore_command_rewires_right_sequence() {
        let mut rng = rng();
        let mut bench = PartsBench::new();
        let mut weights = BehaviorWeights::default();
        apply_command(BehaviorCommand::Explore, &mut weights, &mut bench, &mut rng);
        apply_command(BehaviorCommand::Explore, &mut weights, &mut bench, &mut rng);

        let right = bench.get(Slot::Right).unwrap();
        assert_eq!(tags(right), vec!["RandomWait", "Explore"]);
        assert_eq!(names(right), vec!["explore_wait", "explore"]);
        assert_eq!(weights.get(BehaviorTag::Explore), 3.0);
    }

    #[test]
    fn interact_command_appends_once() {
        let mut rng = rng();
        let mut bench = PartsBench::new();
        let mut weights = BehaviorWeights::default();

        // Fresh sides already end in Interact.
        apply_command(BehaviorCommand::Interact, &mut weights, &mut bench, &mut rng);
        assert_eq!(bench.get(Slot::Left).unwrap().children().len(), 2);

        apply_command(BehaviorCommand::Explore, &mut weights, &mut bench, &mut rng);
        apply_command(BehaviorCommand::Interact, &mut weights, &mut bench, &mut rng);
        apply_command(BehaviorCommand::Interact, &mut weights, &mut bench, &mut rng);
        let right = bench.get(Slot::Right).unwrap();
        assert_eq!(tags(right), vec!["RandomWait", "Explore", "Interact"]);
        assert_eq!(right.children()[2].name(), "interact_right_sequence");
        assert_eq!(weights.get(BehaviorTag::Interact), 4.0);
    }

    #[test]
    fn observe_command_stretches_observation() {
        let mut rng = rng();
        let mut bench = PartsBench::new();
        let mut weights = BehaviorWeights::default();
        bench.part_mut(Slot::ObserveItems, &mut rng).set_param(1.0);
        apply_command(BehaviorCommand::Observe, &mut weights, &mut bench, &mut rng);
        assert_eq!(bench.get(Slot::ObserveItems).and_then(|n| n.param()), Some(1.5));
        assert_eq!(weights.get(BehaviorTag::Observe), 2.0);
    }

    #[test]
    fn default_command_clears_everything() {
        let mut rng = rng();
        let mut bench = PartsBench::new();
        let mut weights = BehaviorWeights::default();
        apply_command(BehaviorCommand::Explore, &mut weights, &mut bench, &mut rng);
        apply_command(BehaviorCommand::Sleep, &mut weights, &mut bench, &mut rng);
        apply_command(BehaviorCommand::Default, &mut weights, &mut bench, &mut rng);
        assert_eq!(weights, BehaviorWeights::default());
        assert!(bench.is_empty());
    }
}
