//! `tabby-types` – shared vocabulary for the tabby workspace.
//!
//! Everything that crosses a crate boundary lives here: the tick status, the
//! agent's display state, behavior tags and weights, grid geometry, the JSON
//! interchange record for behavior trees, and the global error type.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// NodeStatus
// ─────────────────────────────────────────────────────────────────────────────

/// The execution status returned by a behavior tree node after a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeStatus {
    /// The node completed its task successfully.
    Success,
    /// The node encountered a failure.
    Failure,
    /// The node has not finished yet; tick it again next frame.
    Running,
}

impl NodeStatus {
    /// Status tag as written into exported trees.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Success => "SUCCESS",
            NodeStatus::Failure => "FAILURE",
            NodeStatus::Running => "RUNNING",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AgentState
// ─────────────────────────────────────────────────────────────────────────────

/// Display label of the cat.  Only used for rendering and colour mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    #[default]
    Idle,
    Sleeping,
    Playing,
    Wandering,
    Observing,
    Waiting,
    Moving,
    Interacting,
    ObservingWait,
    Exploring,
}

impl AgentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentState::Idle => "idle",
            AgentState::Sleeping => "sleeping",
            AgentState::Playing => "playing",
            AgentState::Wandering => "wandering",
            AgentState::Observing => "observing",
            AgentState::Waiting => "waiting",
            AgentState::Moving => "moving",
            AgentState::Interacting => "interacting",
            AgentState::ObservingWait => "observing_wait",
            AgentState::Exploring => "exploring",
        }
    }

    /// Character drawn at the cat's grid cell.
    pub fn glyph(&self) -> char {
        match self {
            AgentState::Sleeping => 'z',
            AgentState::Playing => '!',
            AgentState::Wandering => 'o',
            AgentState::Observing => '?',
            AgentState::Waiting => '.',
            AgentState::Moving => '>',
            AgentState::Interacting => '*',
            AgentState::ObservingWait => '^',
            AgentState::Exploring => '#',
            AgentState::Idle => '@',
        }
    }

    /// Display colour as an RGB triple.
    pub fn rgb(&self) -> (u8, u8, u8) {
        match self {
            AgentState::Sleeping => (160, 160, 255),
            AgentState::Playing => (255, 255, 0),
            AgentState::Wandering => (0, 255, 0),
            AgentState::Observing => (255, 165, 0),
            AgentState::Waiting => (200, 200, 200),
            AgentState::Moving => (255, 0, 255),
            AgentState::Interacting => (255, 0, 0),
            AgentState::ObservingWait => (0, 255, 255),
            AgentState::Exploring => (255, 128, 0),
            AgentState::Idle => (255, 255, 255),
        }
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Behavior tags and weights
// ─────────────────────────────────────────────────────────────────────────────

/// The six behavior tendencies a user can push the cat towards.
///
/// Declaration order doubles as the tie-break order when ranking weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorTag {
    Sleep,
    Play,
    Wander,
    Explore,
    Observe,
    Interact,
}

impl BehaviorTag {
    pub const ALL: [BehaviorTag; 6] = [
        BehaviorTag::Sleep,
        BehaviorTag::Play,
        BehaviorTag::Wander,
        BehaviorTag::Explore,
        BehaviorTag::Observe,
        BehaviorTag::Interact,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BehaviorTag::Sleep => "sleep",
            BehaviorTag::Play => "play",
            BehaviorTag::Wander => "wander",
            BehaviorTag::Explore => "explore",
            BehaviorTag::Observe => "observe",
            BehaviorTag::Interact => "interact",
        }
    }
}

impl fmt::Display for BehaviorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BehaviorTag {
    type Err = TabbyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BehaviorTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| TabbyError::UnknownCommand(s.to_string()))
    }
}

/// Per-tag weights.  All six tags are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BehaviorWeights(BTreeMap<BehaviorTag, f64>);

impl Default for BehaviorWeights {
    fn default() -> Self {
        Self(BehaviorTag::ALL.into_iter().map(|tag| (tag, 1.0)).collect())
    }
}

impl BehaviorWeights {
    pub fn get(&self, tag: BehaviorTag) -> f64 {
        self.0.get(&tag).copied().unwrap_or(1.0)
    }

    pub fn set(&mut self, tag: BehaviorTag, weight: f64) {
        self.0.insert(tag, weight);
    }

    /// Add `delta` to the weight of `tag`.
    pub fn bump(&mut self, tag: BehaviorTag, delta: f64) {
        let w = self.get(tag);
        self.set(tag, w + delta);
    }

    /// Multiply the weight of `tag` by `factor`.
    pub fn scale(&mut self, tag: BehaviorTag, factor: f64) {
        let w = self.get(tag);
        self.set(tag, w * factor);
    }

    /// Tags sorted by descending weight; ties keep declaration order.
    pub fn ranked(&self) -> Vec<(BehaviorTag, f64)> {
        let mut entries: Vec<(BehaviorTag, f64)> = self.0.iter().map(|(t, w)| (*t, *w)).collect();
        entries.sort_by(|a, b| b.1.total_cmp(&a.1));
        entries
    }

    /// `true` if any weight is strictly above `threshold`.
    pub fn any_above(&self, threshold: f64) -> bool {
        self.0.values().any(|w| *w > threshold)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Grid geometry
// ─────────────────────────────────────────────────────────────────────────────

/// A cell on the simulation grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chebyshev (king-move) distance.
    pub fn chebyshev(&self, other: Position) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }
}

/// Size of the simulation grid.  Valid cells are `[0, width) × [0, height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridBounds {
    pub width: i32,
    pub height: i32,
}

impl Default for GridBounds {
    fn default() -> Self {
        Self {
            width: 80,
            height: 24,
        }
    }
}

impl GridBounds {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Nearest cell to `p`.  Degenerate bounds (built literally or
    /// deserialized with a zero side) behave like a single cell.
    pub fn clamp(&self, p: Position) -> Position {
        Position {
            x: p.x.clamp(0, self.width.max(1) - 1),
            y: p.y.clamp(0, self.height.max(1) - 1),
        }
    }

    pub fn contains(&self, p: Position) -> bool {
        (0..self.width).contains(&p.x) && (0..self.height).contains(&p.y)
    }

    /// Grid centre, the default spawn cell.
    pub fn center(&self) -> Position {
        Position::new(self.width / 2, self.height / 2)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Interchange record
// ─────────────────────────────────────────────────────────────────────────────

/// One node of a behavior tree as it appears in JSON files and in the tree
/// generator's output.
///
/// `type` is either an internal node tag (`"Sequence"`, `"Sleep"`, …) or one of
/// the coarser interchange tags (`"CustomAction"`, `"CustomCondition"`, `"Root"`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct NodeRecord {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Single scalar tunable, when the node has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NodeStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeRecord>,
}

impl NodeRecord {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            ..Default::default()
        }
    }

    pub fn with_children(mut self, children: Vec<NodeRecord>) -> Self {
        self.children = children;
        self
    }

    pub fn with_param(mut self, value: f64) -> Self {
        self.params = Some(vec![serde_json::Value::from(value)]);
        self
    }

    /// First element of `params` if it is numeric.
    pub fn first_param(&self) -> Option<f64> {
        self.params.as_ref()?.first()?.as_f64()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Global error type spanning file I/O, tree decoding and the tree generator.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TabbyError {
    #[error("I/O error on {path}: {details}")]
    Io { path: String, details: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid behavior tree: {0}")]
    InvalidTree(String),

    #[error("Tree generator error: {0}")]
    GeneratorFailed(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}
