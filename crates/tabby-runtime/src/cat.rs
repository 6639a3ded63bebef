//! [`Cat`] – the simulated agent.
//!
//! The cat owns its body (position, grid, display state), a seeded random
//! source, its behavior weights and the behavior tree.  Every mutation runs
//! between ticks: a command first salvages the persistent parts of the live
//! tree, applies its weight and splice effects, then reassembles.
//!
//! A tree loaded from JSON replaces the assembled one wholesale.  Its parts
//! are not tracked; the next command discards it and reassembles from the
//! parts that were benched when it was loaded.
//!
//! # Example
//!
//! ```rust
//! use tabby_runtime::assembly::BehaviorCommand;
//! use tabby_runtime::cat::{Cat, CatConfig};
//!
//! let mut cat = Cat::new(CatConfig { seed: Some(1), ..CatConfig::default() });
//! for _ in 0..10 {
//!     cat.tick();
//! }
//! cat.modify_behavior(BehaviorCommand::Sleep);
//! assert_eq!(cat.root().kind_tag(), "Selector");
//! ```

use std::fs;
use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::Value;
use tabby_types::{AgentState, BehaviorWeights, GridBounds, NodeStatus, Position, TabbyError};
use tracing::{debug, info, warn};

use crate::assembly::{self, BehaviorCommand, PartsBench};
use crate::behavior_tree::{BehaviorNode, Body, TickContext};
use crate::codec;

/// Construction parameters for a [`Cat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatConfig {
    /// Initial position; clamped into `bounds`.
    pub spawn: Position,
    pub bounds: GridBounds,
    /// Fixed seed for reproducible runs.  `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for CatConfig {
    fn default() -> Self {
        Self {
            spawn: Position::new(40, 12),
            bounds: GridBounds::default(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TreeOrigin {
    Assembled,
    Loaded,
}

/// The agent: body, weights and behavior tree.
#[derive(Debug)]
pub struct Cat {
    body: Body,
    rng: StdRng,
    weights: BehaviorWeights,
    bench: PartsBench,
    root: BehaviorNode,
    origin: TreeOrigin,
}

impl Cat {
    pub fn new(config: CatConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let weights = BehaviorWeights::default();
        let mut bench = PartsBench::new();
        let root = bench.assemble(&weights, &mut rng);
        Self {
            body: Body::new(config.spawn, config.bounds),
            rng,
            weights,
            bench,
            root,
            origin: TreeOrigin::Assembled,
        }
    }

    /// Advance the behavior tree by one quantum.
    pub fn tick(&mut self) -> NodeStatus {
        let mut ctx = TickContext {
            body: &mut self.body,
            rng: &mut self.rng,
        };
        self.root.tick(&mut ctx)
    }

    /// Apply a built-in command and reassemble the tree.
    pub fn modify_behavior(&mut self, command: BehaviorCommand) {
        info!(%command, "modifying behavior");
        self.reclaim_parts();
        assembly::apply_command(command, &mut self.weights, &mut self.bench, &mut self.rng);
        self.reassemble();
    }

    // -------------------------------------------------------------------------
    // JSON
    // -------------------------------------------------------------------------

    /// Encode the live tree.
    pub fn behavior_tree_json(&self, include_status: bool) -> Result<Value, TabbyError> {
        codec::to_value(&self.root, include_status)
    }

    /// Write the tree to `path` as a pretty-printed `Root` document and return
    /// the text written.
    pub fn export_to_json(&self, path: impl AsRef<Path>) -> Result<String, TabbyError> {
        let path = path.as_ref();
        let document = codec::wrap_document(codec::export(&self.root, false));
        let text = serde_json::to_string_pretty(&document)
            .map_err(|e| TabbyError::Serialization(e.to_string()))?;
        fs::write(path, &text).map_err(|e| io_error(path, e))?;
        info!(path = %path.display(), "behavior tree exported");
        Ok(text)
    }

    /// Replace the tree with the one stored at `path`.
    ///
    /// On any failure the default tree is rebuilt before the error is
    /// returned, so the cat stays tickable.
    pub fn load_behavior_tree(&mut self, path: impl AsRef<Path>) -> Result<(), TabbyError> {
        let path = path.as_ref();
        let parsed = fs::read_to_string(path)
            .map_err(|e| io_error(path, e))
            .and_then(|text| {
                serde_json::from_str::<Value>(&text)
                    .map_err(|e| TabbyError::Serialization(e.to_string()))
            });
        match parsed {
            Ok(value) => {
                self.load_structure(value)?;
                info!(path = %path.display(), "behavior tree loaded");
                Ok(())
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "load failed; rebuilding default tree");
                self.restore_default();
                Err(e)
            }
        }
    }

    /// Replace the tree with an in-memory document (bare tree or `Root`
    /// wrapper).  Failure handling matches
    /// [`load_behavior_tree`](Self::load_behavior_tree).
    pub fn load_structure(&mut self, value: Value) -> Result<(), TabbyError> {
        let record = match codec::parse_document(value) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "tree document rejected; rebuilding default tree");
                self.restore_default();
                return Err(e);
            }
        };
        self.reclaim_parts();
        self.root = codec::import(&record, &mut self.rng);
        self.origin = TreeOrigin::Loaded;
        debug!(
            nodes = self.root.node_count(),
            depth = self.root.depth(),
            "imported behavior tree"
        );
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn display_state(&self) -> AgentState {
        self.body.state
    }

    pub fn position(&self) -> Position {
        self.body.position
    }

    pub fn bounds(&self) -> GridBounds {
        self.body.bounds
    }

    pub fn weights(&self) -> &BehaviorWeights {
        &self.weights
    }

    pub fn root(&self) -> &BehaviorNode {
        &self.root
    }

    /// The leaf the next tick will resume, if the cursor chain ends in one.
    pub fn active_leaf(&self) -> Option<&BehaviorNode> {
        self.root.active_leaf()
    }

    /// `true` if the live tree came from JSON rather than assembly.
    pub fn is_loaded(&self) -> bool {
        self.origin == TreeOrigin::Loaded
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    /// Move the live tree's persistent parts back onto the bench.  A loaded
    /// tree is discarded.
    fn reclaim_parts(&mut self) {
        let old = std::mem::replace(&mut self.root, BehaviorNode::sequence("Sequence", Vec::new()));
        match self.origin {
            TreeOrigin::Assembled => self.bench.salvage(old),
            TreeOrigin::Loaded => debug!("discarding loaded tree"),
        }
    }

    fn reassemble(&mut self) {
        self.root = self.bench.assemble(&self.weights, &mut self.rng);
        self.origin = TreeOrigin::Assembled;
        debug!(root = self.root.kind_tag(), nodes = self.root.node_count(), "tree reassembled");
    }

    fn restore_default(&mut self) {
        self.weights = BehaviorWeights::default();
        self.bench = PartsBench::new();
        self.reassemble();
    }
}

fn io_error(path: &Path, e: std::io::Error) -> TabbyError {
    TabbyError::Io {
        path: path.display().to_string(),
        details: e.to_string(),
    }
}
