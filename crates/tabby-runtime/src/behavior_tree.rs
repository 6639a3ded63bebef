//! Behavior Tree Engine.
//!
//! A tick-driven behavior tree whose leaves steer the cat around the grid.
//! The driver calls [`BehaviorNode::tick`] once per simulation frame; a node
//! that needs more time answers [`NodeStatus::Running`] and resumes from its
//! own progress counters on the next call.
//!
//! # Composites
//!
//! | Node type  | Description                                                          |
//! |------------|----------------------------------------------------------------------|
//! | `Sequence` | Ticks the child under the cursor; advances on success, fails fast.  |
//! | `Selector` | Ticks the child under the cursor; advances on failure, succeeds fast. |
//!
//! Both tick exactly one child per call and remember the cursor between
//! calls.  A terminal result resets the composite (cursor back to 0, every
//! child reset) before it is returned.
//!
//! # Leaves
//!
//! Leaves live in [`crate::actions`].  They never hold a pointer to the cat:
//! the mutable part of the agent is lent to them through [`TickContext`].
//!
//! # Example
//!
//! ```rust
//! use rand::{rngs::StdRng, SeedableRng};
//! use tabby_runtime::behavior_tree::{BehaviorNode, Body, NodeType, TickContext};
//! use tabby_types::{GridBounds, NodeStatus, Position};
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let mut body = Body::new(Position::new(40, 12), GridBounds::default());
//!
//! let mut tree = BehaviorNode::sequence("Sequence", vec![
//!     BehaviorNode::spawn(NodeType::ObserveItems, "look", &mut rng),
//!     BehaviorNode::spawn(NodeType::RandomWait, "wait", &mut rng),
//! ]);
//!
//! let mut ctx = TickContext { body: &mut body, rng: &mut rng };
//! assert_eq!(tree.tick(&mut ctx), NodeStatus::Running);
//! ```

use rand::rngs::StdRng;
use tabby_types::{AgentState, GridBounds, NodeStatus, Position};

use crate::actions::{
    Action, Explore, Interact, MoveToTarget, ObserveAndWait, ObserveItems, Play, RandomWait,
    Sleep, Wander,
};

/// Simulated seconds that elapse per tick.
pub const TICK_QUANTUM: f64 = 0.1;

// ─────────────────────────────────────────────────────────────────────────────
// Tick context
// ─────────────────────────────────────────────────────────────────────────────

/// The mutable, physical part of the agent that leaves act upon.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub position: Position,
    pub bounds: GridBounds,
    pub state: AgentState,
}

impl Body {
    pub fn new(position: Position, bounds: GridBounds) -> Self {
        Self {
            position: bounds.clamp(position),
            bounds,
            state: AgentState::Idle,
        }
    }

    /// Move by `(dx, dy)`, clamped to the grid.
    pub fn step(&mut self, dx: i32, dy: i32) {
        self.position = self
            .bounds
            .clamp(Position::new(self.position.x + dx, self.position.y + dy));
    }
}

/// Everything a node may touch while ticking.
pub struct TickContext<'a> {
    pub body: &'a mut Body,
    pub rng: &'a mut StdRng,
}

// ─────────────────────────────────────────────────────────────────────────────
// NodeType
// ─────────────────────────────────────────────────────────────────────────────

/// Concrete variant tag of a node, as written in the `type` field of
/// exported trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Sequence,
    Selector,
    Sleep,
    Wander,
    Play,
    ObserveItems,
    RandomWait,
    MoveToTarget,
    Interact,
    ObserveAndWait,
    Explore,
}

impl NodeType {
    pub const ALL: [NodeType; 11] = [
        NodeType::Sequence,
        NodeType::Selector,
        NodeType::Sleep,
        NodeType::Wander,
        NodeType::Play,
        NodeType::ObserveItems,
        NodeType::RandomWait,
        NodeType::MoveToTarget,
        NodeType::Interact,
        NodeType::ObserveAndWait,
        NodeType::Explore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Sequence => "Sequence",
            NodeType::Selector => "Selector",
            NodeType::Sleep => "Sleep",
            NodeType::Wander => "Wander",
            NodeType::Play => "Play",
            NodeType::ObserveItems => "ObserveItems",
            NodeType::RandomWait => "RandomWait",
            NodeType::MoveToTarget => "MoveToTarget",
            NodeType::Interact => "Interact",
            NodeType::ObserveAndWait => "ObserveAndWait",
            NodeType::Explore => "Explore",
        }
    }

    /// Exact, case-sensitive lookup of an internal type tag.
    pub fn parse(tag: &str) -> Option<NodeType> {
        NodeType::ALL.into_iter().find(|t| t.as_str() == tag)
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, NodeType::Sequence | NodeType::Selector)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Composite
// ─────────────────────────────────────────────────────────────────────────────

/// Ordered children plus the cursor of the child currently being evaluated.
#[derive(Debug, Clone, Default)]
pub struct Composite {
    children: Vec<BehaviorNode>,
    current_child: usize,
}

impl Composite {
    pub fn new(children: Vec<BehaviorNode>) -> Self {
        Self {
            children,
            current_child: 0,
        }
    }

    /// Tick the child under the cursor.
    ///
    /// `advance_on` is the child result that moves the cursor forward
    /// (`Success` for a sequence, `Failure` for a selector); it is also the
    /// result of an empty composite and of an exhausted cursor.
    fn tick(&mut self, ctx: &mut TickContext<'_>, advance_on: NodeStatus) -> NodeStatus {
        if self.children.is_empty() {
            return advance_on;
        }
        if self.current_child >= self.children.len() {
            self.current_child = 0;
        }

        let status = self.children[self.current_child].tick(ctx);
        if status == NodeStatus::Running {
            return NodeStatus::Running;
        }
        if status != advance_on {
            self.reset(ctx.rng);
            return status;
        }

        self.current_child += 1;
        if self.current_child >= self.children.len() {
            self.reset(ctx.rng);
            return advance_on;
        }
        NodeStatus::Running
    }

    fn reset(&mut self, rng: &mut StdRng) {
        self.current_child = 0;
        for child in &mut self.children {
            child.reset(rng);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BehaviorNode
// ─────────────────────────────────────────────────────────────────────────────

/// Variant payload of a [`BehaviorNode`].
#[derive(Debug, Clone)]
pub enum NodeKind {
    Sequence(Composite),
    Selector(Composite),
    Sleep(Sleep),
    Wander(Wander),
    Play(Play),
    ObserveItems(ObserveItems),
    RandomWait(RandomWait),
    MoveToTarget(MoveToTarget),
    Interact(Interact),
    ObserveAndWait(ObserveAndWait),
    Explore(Explore),
}

/// A node in a behavior tree.
///
/// `name` is a display label and is not unique.  `status` is the result of
/// the most recent tick, or `Running` after a reset.
#[derive(Debug, Clone)]
pub struct BehaviorNode {
    name: String,
    status: NodeStatus,
    kind: NodeKind,
}

impl BehaviorNode {
    /// Construct a node from an explicit payload.
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            status: NodeStatus::Running,
            kind,
        }
    }

    pub fn sequence(name: impl Into<String>, children: Vec<BehaviorNode>) -> Self {
        Self::new(name, NodeKind::Sequence(Composite::new(children)))
    }

    pub fn selector(name: impl Into<String>, children: Vec<BehaviorNode>) -> Self {
        Self::new(name, NodeKind::Selector(Composite::new(children)))
    }

    /// Construct a fresh node of `node_type`.  Composites start empty, leaves
    /// draw their timers from `rng`.
    pub fn spawn(node_type: NodeType, name: impl Into<String>, rng: &mut StdRng) -> Self {
        let kind = match node_type {
            NodeType::Sequence => NodeKind::Sequence(Composite::default()),
            NodeType::Selector => NodeKind::Selector(Composite::default()),
            NodeType::Sleep => NodeKind::Sleep(Sleep::new(rng)),
            NodeType::Wander => NodeKind::Wander(Wander::new()),
            NodeType::Play => NodeKind::Play(Play::new(rng)),
            NodeType::ObserveItems => NodeKind::ObserveItems(ObserveItems::new(rng)),
            NodeType::RandomWait => NodeKind::RandomWait(RandomWait::new(rng)),
            NodeType::MoveToTarget => NodeKind::MoveToTarget(MoveToTarget::new(rng)),
            NodeType::Interact => NodeKind::Interact(Interact::new(rng)),
            NodeType::ObserveAndWait => NodeKind::ObserveAndWait(ObserveAndWait::new(rng)),
            NodeType::Explore => NodeKind::Explore(Explore::new(rng)),
        };
        Self::new(name, kind)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> NodeStatus {
        self.status
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    pub fn node_type(&self) -> NodeType {
        match &self.kind {
            NodeKind::Sequence(_) => NodeType::Sequence,
            NodeKind::Selector(_) => NodeType::Selector,
            NodeKind::Sleep(_) => NodeType::Sleep,
            NodeKind::Wander(_) => NodeType::Wander,
            NodeKind::Play(_) => NodeType::Play,
            NodeKind::ObserveItems(_) => NodeType::ObserveItems,
            NodeKind::RandomWait(_) => NodeType::RandomWait,
            NodeKind::MoveToTarget(_) => NodeType::MoveToTarget,
            NodeKind::Interact(_) => NodeType::Interact,
            NodeKind::ObserveAndWait(_) => NodeType::ObserveAndWait,
            NodeKind::Explore(_) => NodeType::Explore,
        }
    }

    /// Concrete variant tag, e.g. `"Selector"` or `"MoveToTarget"`.
    pub fn kind_tag(&self) -> &'static str {
        self.node_type().as_str()
    }

    // -------------------------------------------------------------------------
    // Tick / reset
    // -------------------------------------------------------------------------

    /// Execute one quantum of behavior and record the result as this node's
    /// status.
    pub fn tick(&mut self, ctx: &mut TickContext<'_>) -> NodeStatus {
        let status = match &mut self.kind {
            NodeKind::Sequence(c) => c.tick(ctx, NodeStatus::Success),
            NodeKind::Selector(c) => c.tick(ctx, NodeStatus::Failure),
            other => match as_action_mut(other) {
                Some(action) => action.tick(ctx),
                None => NodeStatus::Failure,
            },
        };
        self.status = status;
        status
    }

    /// Return to the ready state: status `Running`, progress counters fresh.
    /// Composites reset every child recursively.
    pub fn reset(&mut self, rng: &mut StdRng) {
        self.status = NodeStatus::Running;
        match &mut self.kind {
            NodeKind::Sequence(c) | NodeKind::Selector(c) => c.reset(rng),
            other => {
                if let Some(action) = as_action_mut(other) {
                    action.reset(rng);
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Leaf capabilities
    // -------------------------------------------------------------------------

    /// The agent state a leaf sets while running.  `None` for composites.
    pub fn state_tag(&self) -> Option<AgentState> {
        as_action(&self.kind).map(|a| a.state_tag())
    }

    /// Single scalar tunable, for the leaf types that expose one.
    pub fn param(&self) -> Option<f64> {
        as_action(&self.kind).and_then(|a| a.param())
    }

    /// Overwrite the single scalar tunable.  Returns `false` when this node
    /// type has none.  No range validation is applied.
    pub fn set_param(&mut self, value: f64) -> bool {
        match as_action_mut(&mut self.kind) {
            Some(action) => action.set_param(value),
            None => false,
        }
    }

    pub fn is_composite(&self) -> bool {
        self.node_type().is_composite()
    }

    // -------------------------------------------------------------------------
    // Structure
    // -------------------------------------------------------------------------

    /// Children in order.  Leaves have none.
    pub fn children(&self) -> &[BehaviorNode] {
        match &self.kind {
            NodeKind::Sequence(c) | NodeKind::Selector(c) => &c.children,
            _ => &[],
        }
    }

    /// Mutable children of a composite.  `None` for leaves.
    pub fn children_mut(&mut self) -> Option<&mut Vec<BehaviorNode>> {
        match &mut self.kind {
            NodeKind::Sequence(c) | NodeKind::Selector(c) => Some(&mut c.children),
            _ => None,
        }
    }

    /// Append a child to a composite.  Returns `false` for leaves.
    pub fn push_child(&mut self, child: BehaviorNode) -> bool {
        match self.children_mut() {
            Some(children) => {
                children.push(child);
                true
            }
            None => false,
        }
    }

    /// Replace the children of a composite wholesale and rewind its cursor.
    /// Returns the previous children, or `None` for leaves.
    pub fn replace_children(&mut self, children: Vec<BehaviorNode>) -> Option<Vec<BehaviorNode>> {
        match &mut self.kind {
            NodeKind::Sequence(c) | NodeKind::Selector(c) => {
                c.current_child = 0;
                Some(std::mem::replace(&mut c.children, children))
            }
            _ => None,
        }
    }

    /// Take ownership of the children, leaving the composite empty.
    pub fn into_children(self) -> Vec<BehaviorNode> {
        match self.kind {
            NodeKind::Sequence(c) | NodeKind::Selector(c) => c.children,
            _ => Vec::new(),
        }
    }

    /// Cursor of a composite.  `None` for leaves.
    pub fn current_child(&self) -> Option<usize> {
        match &self.kind {
            NodeKind::Sequence(c) | NodeKind::Selector(c) => Some(c.current_child),
            _ => None,
        }
    }

    // -------------------------------------------------------------------------
    // Read-only queries
    // -------------------------------------------------------------------------

    /// Nodes from `self` down to the node currently being evaluated,
    /// following each composite's cursor.
    pub fn active_path(&self) -> Vec<&BehaviorNode> {
        let mut path = vec![self];
        let mut node = self;
        while let Some(cursor) = node.current_child() {
            let children = node.children();
            match children.get(cursor).or_else(|| children.first()) {
                Some(next) => {
                    path.push(next);
                    node = next;
                }
                None => break,
            }
        }
        path
    }

    /// The leaf at the end of [`active_path`](Self::active_path), if any.
    pub fn active_leaf(&self) -> Option<&BehaviorNode> {
        self.active_path()
            .last()
            .copied()
            .filter(|n| !n.is_composite())
    }

    /// The active leaf, if its declared state tag is `state`.
    pub fn find_active(&self, state: AgentState) -> Option<&BehaviorNode> {
        self.active_leaf().filter(|n| n.state_tag() == Some(state))
    }

    /// All nodes in depth-first pre-order.
    pub fn iter(&self) -> Vec<&BehaviorNode> {
        let mut out = vec![self];
        for child in self.children() {
            out.extend(child.iter());
        }
        out
    }

    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(|c| c.node_count()).sum::<usize>()
    }

    /// Depth of the tree rooted here; a lone node has depth 1.
    pub fn depth(&self) -> usize {
        1 + self.children().iter().map(|c| c.depth()).max().unwrap_or(0)
    }
}

fn as_action(kind: &NodeKind) -> Option<&dyn Action> {
    match kind {
        NodeKind::Sequence(_) | NodeKind::Selector(_) => None,
        NodeKind::Sleep(a) => Some(a),
        NodeKind::Wander(a) => Some(a),
        NodeKind::Play(a) => Some(a),
        NodeKind::ObserveItems(a) => Some(a),
        NodeKind::RandomWait(a) => Some(a),
        NodeKind::MoveToTarget(a) => Some(a),
        NodeKind::Interact(a) => Some(a),
        NodeKind::ObserveAndWait(a) => Some(a),
        NodeKind::Explore(a) => Some(a),
    }
}

fn as_action_mut(kind: &mut NodeKind) -> Option<&mut dyn Action> {
    match kind {
        NodeKind::Sequence(_) | NodeKind::Selector(_) => None,
        NodeKind::Sleep(a) => Some(a),
        NodeKind::Wander(a) => Some(a),
        NodeKind::Play(a) => Some(a),
        NodeKind::ObserveItems(a) => Some(a),
        NodeKind::RandomWait(a) => Some(a),
        NodeKind::MoveToTarget(a) => Some(a),
        NodeKind::Interact(a) => Some(a),
        NodeKind::ObserveAndWait(a) => Some(a),
        NodeKind::Explore(a) => Some(a),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn body() -> Body {
        Body::new(Position::new(40, 12), GridBounds::default())
    }

    /// A RandomWait leaf pinned to finish after exactly `ticks` RUNNING ticks.
    fn wait(name: &str, ticks: u32, rng: &mut StdRng) -> BehaviorNode {
        let mut node = BehaviorNode::spawn(NodeType::RandomWait, name, rng);
        // Half a quantum of slack keeps float accumulation from adding a tick.
        node.set_param(ticks as f64 * TICK_QUANTUM - TICK_QUANTUM / 2.0);
        node
    }

    /// A Wander leaf never terminates.
    fn forever(name: &str, rng: &mut StdRng) -> BehaviorNode {
        BehaviorNode::spawn(NodeType::Wander, name, rng)
    }

    fn tick(node: &mut BehaviorNode, body: &mut Body, rng: &mut StdRng) -> NodeStatus {
        let mut ctx = TickContext { body, rng };
        node.tick(&mut ctx)
    }

    #[test]
    fn empty_sequence_succeeds_and_empty_selector_fails() {
        let mut rng = rng();
        let mut b = body();
        let mut seq = BehaviorNode::sequence("seq", vec![]);
        let mut sel = BehaviorNode::selector("sel", vec![]);
        assert_eq!(tick(&mut seq, &mut b, &mut rng), NodeStatus::Success);
        assert_eq!(tick(&mut sel, &mut b, &mut rng), NodeStatus::Failure);
    }

    #[test]
    fn sequence_ticks_one_child_per_call() {
        let mut rng = rng();
        let mut b = body();
        let a = wait("a", 1, &mut rng);
        let c = wait("c", 1, &mut rng);
        let mut seq = BehaviorNode::sequence("seq", vec![a, c]);

        // a: RUNNING, then SUCCESS (cursor advances, composite still RUNNING).
        assert_eq!(tick(&mut seq, &mut b, &mut rng), NodeStatus::Running);
        assert_eq!(seq.current_child(), Some(0));
        assert_eq!(tick(&mut seq, &mut b, &mut rng), NodeStatus::Running);
        assert_eq!(seq.current_child(), Some(1));
        // c: RUNNING, then SUCCESS, which exhausts the cursor.
        assert_eq!(tick(&mut seq, &mut b, &mut rng), NodeStatus::Running);
        assert_eq!(tick(&mut seq, &mut b, &mut rng), NodeStatus::Success);
        assert_eq!(seq.current_child(), Some(0));
        assert!(seq.children().iter().all(|c| c.status() == NodeStatus::Running));
    }

    #[test]
    fn sequence_stalls_on_running_child() {
        let mut rng = rng();
        let mut b = body();
        let first = forever("first", &mut rng);
        let second = wait("second", 1, &mut rng);
        let mut seq = BehaviorNode::sequence("seq", vec![first, second]);
        let before = seq.children()[1].param();

        for _ in 0..200 {
            assert_eq!(tick(&mut seq, &mut b, &mut rng), NodeStatus::Running);
            assert_eq!(seq.current_child(), Some(0));
        }
        // The second child was never ticked: its status and timer are untouched.
        assert_eq!(seq.children()[1].status(), NodeStatus::Running);
        assert_eq!(seq.children()[1].param(), before);
        assert_eq!(b.state, AgentState::Wandering);
    }

    #[test]
    fn selector_returns_success_on_first_success() {
        let mut rng = rng();
        let mut b = body();
        let a = wait("a", 0, &mut rng);
        let c = wait("c", 0, &mut rng);
        let mut sel = BehaviorNode::selector("sel", vec![a, c]);
        assert_eq!(tick(&mut sel, &mut b, &mut rng), NodeStatus::Success);
        assert_eq!(sel.current_child(), Some(0));
        assert_eq!(sel.status(), NodeStatus::Success);
    }

    #[test]
    fn selector_advances_on_failure_then_fails_and_resets() {
        let mut rng = rng();
        let mut b = body();
        // Empty selectors always fail, so they make convenient failing children.
        let mut sel = BehaviorNode::selector(
            "sel",
            vec![
                BehaviorNode::selector("f1", vec![]),
                BehaviorNode::selector("f2", vec![]),
                BehaviorNode::selector("f3", vec![]),
            ],
        );
        assert_eq!(tick(&mut sel, &mut b, &mut rng), NodeStatus::Running);
        assert_eq!(sel.current_child(), Some(1));
        assert_eq!(tick(&mut sel, &mut b, &mut rng), NodeStatus::Running);
        assert_eq!(sel.current_child(), Some(2));
        assert_eq!(tick(&mut sel, &mut b, &mut rng), NodeStatus::Failure);
        assert_eq!(sel.current_child(), Some(0));
        assert!(sel.children().iter().all(|c| c.status() == NodeStatus::Running));
    }

    #[test]
    fn sequence_fails_fast_and_resets_cursor() {
        let mut rng = rng();
        let mut b = body();
        let ok = wait("ok", 0, &mut rng);
        let mut seq = BehaviorNode::sequence(
            "seq",
            vec![ok, BehaviorNode::selector("fail", vec![]), forever("never", &mut rng)],
        );
        assert_eq!(tick(&mut seq, &mut b, &mut rng), NodeStatus::Running);
        assert_eq!(seq.current_child(), Some(1));
        assert_eq!(tick(&mut seq, &mut b, &mut rng), NodeStatus::Failure);
        assert_eq!(seq.current_child(), Some(0));
    }

    #[test]
    fn reset_is_idempotent() {
        let mut rng = rng();
        let mut b = body();
        let mut seq = BehaviorNode::sequence(
            "seq",
            vec![wait("a", 0, &mut rng), wait("b", 3, &mut rng)],
        );
        tick(&mut seq, &mut b, &mut rng);
        tick(&mut seq, &mut b, &mut rng);
        seq.reset(&mut rng);
        let once = (seq.status(), seq.current_child());
        seq.reset(&mut rng);
        assert_eq!((seq.status(), seq.current_child()), once);
        assert_eq!(once, (NodeStatus::Running, Some(0)));
    }

    #[test]
    fn replace_children_rewinds_cursor() {
        let mut rng = rng();
        let mut b = body();
        let mut seq = BehaviorNode::sequence(
            "seq",
            vec![wait("a", 0, &mut rng), wait("b", 0, &mut rng), wait("c", 5, &mut rng)],
        );
        tick(&mut seq, &mut b, &mut rng);
        tick(&mut seq, &mut b, &mut rng);
        assert_eq!(seq.current_child(), Some(2));
        let old = seq.replace_children(vec![wait("x", 5, &mut rng)]).unwrap();
        assert_eq!(old.len(), 3);
        assert_eq!(seq.current_child(), Some(0));
        assert_eq!(tick(&mut seq, &mut b, &mut rng), NodeStatus::Running);
    }

    #[test]
    fn active_path_follows_cursors() {
        let mut rng = rng();
        let mut b = body();
        let inner = BehaviorNode::sequence(
            "inner",
            vec![wait("w", 0, &mut rng), forever("roam", &mut rng)],
        );
        let mut root = BehaviorNode::selector("root", vec![inner]);
        tick(&mut root, &mut b, &mut rng);
        tick(&mut root, &mut b, &mut rng);

        let names: Vec<&str> = root.active_path().iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["root", "inner", "roam"]);
        assert_eq!(root.active_leaf().map(|n| n.name()), Some("roam"));
        assert!(root.find_active(AgentState::Wandering).is_some());
        assert!(root.find_active(AgentState::Sleeping).is_none());
    }

    #[test]
    fn structural_queries() {
        let mut rng = rng();
        let tree = BehaviorNode::sequence(
            "root",
            vec![
                wait("a", 1, &mut rng),
                BehaviorNode::selector("sel", vec![wait("b", 1, &mut rng)]),
            ],
        );
        assert_eq!(tree.node_count(), 4);
        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.iter().len(), 4);
        assert_eq!(tree.kind_tag(), "Sequence");
        assert_eq!(tree.param(), None);
        assert_eq!(tree.state_tag(), None);
    }

    #[test]
    fn node_type_lookup_is_exact() {
        for t in NodeType::ALL {
            assert_eq!(NodeType::parse(t.as_str()), Some(t));
        }
        assert_eq!(NodeType::parse("sequence"), None);
        assert_eq!(NodeType::parse("CustomAction"), None);
    }

    #[test]
    fn body_step_is_clamped() {
        let mut b = Body::new(Position::new(0, 0), GridBounds::default());
        b.step(-2, -2);
        assert_eq!(b.position, Position::new(0, 0));
        b.step(100, 100);
        assert_eq!(b.position, Position::new(79, 23));
    }
}
