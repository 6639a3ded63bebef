//! [`Simulation`] – the control surface a driver or UI talks to.
//!
//! Wraps one [`Cat`] and one [`TreeGenerator`].  The driver owns the cadence:
//! it calls [`Simulation::tick`] once per frame and applies commands between
//! frames with [`Simulation::apply_command`], so a tree is never mutated
//! while a tick is in progress.
//!
//! | Input                                   | Effect                                        |
//! |-----------------------------------------|-----------------------------------------------|
//! | `sleep` `play` `wander` `explore` ...   | built-in command, applied synchronously       |
//! | anything else                           | sent to the generator, reply loaded as a tree |
//!
//! # Example
//!
//! ```rust
//! use tabby_runtime::cat::CatConfig;
//! use tabby_runtime::simulation::{CommandOutcome, Simulation};
//!
//! let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! let mut sim = Simulation::new(CatConfig { seed: Some(3), ..CatConfig::default() });
//! sim.tick();
//! let outcome = rt.block_on(sim.apply_command("play")).unwrap();
//! assert!(matches!(outcome, CommandOutcome::Builtin(_)));
//! ```

use std::collections::VecDeque;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tabby_types::{AgentState, BehaviorWeights, NodeStatus, Position, TabbyError};
use tracing::{info, warn};

use crate::assembly::BehaviorCommand;
use crate::cat::{Cat, CatConfig};
use crate::generator::{NullGenerator, TreeGenerator};

/// Number of distinct commands kept in the history.
pub const HISTORY_LIMIT: usize = 5;

/// What [`Simulation::apply_command`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// A built-in command was applied.
    Builtin(BehaviorCommand),
    /// The generator produced a tree with this many nodes, now live.
    Generated { nodes: usize },
    /// Nothing to do: empty input or an empty generator reply.
    NoChange,
}

/// Serializable point-in-time view of the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    pub position: Position,
    pub state: AgentState,
    pub status: NodeStatus,
    pub weights: BehaviorWeights,
    /// Name of the leaf the next tick resumes.
    pub active_node: Option<String>,
}

pub struct Simulation {
    cat: Cat,
    generator: Box<dyn TreeGenerator>,
    ticks: u64,
    last_status: NodeStatus,
    history: VecDeque<String>,
}

impl Simulation {
    /// A simulation with no tree generator: free text is a no-op.
    pub fn new(config: CatConfig) -> Self {
        Self {
            cat: Cat::new(config),
            generator: Box::new(NullGenerator),
            ticks: 0,
            last_status: NodeStatus::Running,
            history: VecDeque::with_capacity(HISTORY_LIMIT),
        }
    }

    /// Route free-text commands to `generator`.
    pub fn with_generator(mut self, generator: impl TreeGenerator + 'static) -> Self {
        self.generator = Box::new(generator);
        self
    }

    pub fn tick(&mut self) -> NodeStatus {
        self.ticks += 1;
        self.last_status = self.cat.tick();
        self.last_status
    }

    /// Apply `text` as a command.
    ///
    /// Built-in words are applied directly.  Any other text is sent to the
    /// generator together with the current tree; a reply replaces the tree,
    /// an empty reply changes nothing.
    ///
    /// # Errors
    ///
    /// [`TabbyError::GeneratorFailed`] if the generator fails (the tree is
    /// left untouched), or the load error if its reply is not a valid tree
    /// (the default tree is rebuilt).
    pub async fn apply_command(&mut self, text: &str) -> Result<CommandOutcome, TabbyError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(CommandOutcome::NoChange);
        }
        self.remember(text);

        if let Ok(command) = text.parse::<BehaviorCommand>() {
            self.cat.modify_behavior(command);
            return Ok(CommandOutcome::Builtin(command));
        }

        let current = self.cat.behavior_tree_json(false)?;
        let reply = self
            .generator
            .generate(text, &current)
            .await
            .map_err(|e| {
                warn!(error = %e, "tree generator failed");
                TabbyError::GeneratorFailed(e.to_string())
            })?;

        let Some(mut reply) = reply else {
            info!(instruction = text, "generator returned nothing");
            return Ok(CommandOutcome::NoChange);
        };
        let structure = reply
            .get_mut("structure")
            .map(serde_json::Value::take)
            .ok_or_else(|| TabbyError::InvalidTree("generator reply has no structure field".into()))?;
        self.cat.load_structure(structure)?;

        let nodes = self.cat.root().node_count();
        info!(instruction = text, nodes, "generated tree loaded");
        Ok(CommandOutcome::Generated { nodes })
    }

    pub fn export_to_json(&self, path: impl AsRef<Path>) -> Result<String, TabbyError> {
        self.cat.export_to_json(path)
    }

    pub fn load_from_json(&mut self, path: impl AsRef<Path>) -> Result<(), TabbyError> {
        self.cat.load_behavior_tree(path)
    }

    pub fn display_state(&self) -> AgentState {
        self.cat.display_state()
    }

    pub fn position(&self) -> Position {
        self.cat.position()
    }

    pub fn cat(&self) -> &Cat {
        &self.cat
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Recent commands, newest first.
    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(String::as_str)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.ticks,
            position: self.cat.position(),
            state: self.cat.display_state(),
            status: self.last_status,
            weights: self.cat.weights().clone(),
            active_node: self.cat.active_leaf().map(|n| n.name().to_string()),
        }
    }

    fn remember(&mut self, text: &str) {
        let entry = text.to_lowercase();
        self.history.retain(|h| *h != entry);
        self.history.push_front(entry);
        self.history.truncate(HISTORY_LIMIT);
    }
}
