//! `tabby-runtime` – behavior tree engine and the cat it drives.
//!
//! # Modules
//!
//! - [`behavior_tree`] – [`BehaviorNode`]: the node type, `Sequence` and
//!   `Selector` composites, and the [`TickContext`] through which leaves act
//!   on the cat's [`Body`].
//! - [`actions`] – the timer-driven leaves (sleep, play, wander, explore,
//!   move-to-target, ...).
//! - [`assembly`] – the weight-driven tree shape and the built-in
//!   [`BehaviorCommand`]s that reshape it.
//! - [`codec`] – tree ⇄ JSON, including the coarser `CustomAction` /
//!   `CustomCondition` vocabulary used by generated trees.
//! - [`cat`] – [`Cat`]: body, weights, tree; commands, export and load.
//! - [`generator`] – the [`TreeGenerator`] port and an OpenAI-compatible
//!   [`LlmTreeGenerator`] adapter.
//! - [`simulation`] – [`Simulation`]: the tick/command surface used by
//!   drivers.
//! - [`telemetry`] – [`init_tracing`]: `tracing` subscriber with optional
//!   OTLP export.

pub mod actions;
pub mod assembly;
pub mod behavior_tree;
pub mod cat;
pub mod codec;
pub mod generator;
pub mod simulation;
pub mod telemetry;

pub use assembly::{BehaviorCommand, PartsBench, Slot};
pub use behavior_tree::{BehaviorNode, Body, NodeKind, NodeType, TICK_QUANTUM, TickContext};
pub use cat::{Cat, CatConfig};
pub use generator::{GeneratorError, LlmTreeGenerator, NullGenerator, TreeGenerator};
pub use simulation::{CommandOutcome, Simulation, Snapshot};
pub use telemetry::{TracerProviderGuard, init_tracing};
