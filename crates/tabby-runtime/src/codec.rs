//! Behavior tree (de)serialization.
//!
//! Trees travel as [`NodeRecord`] JSON objects:
//!
//! ```json
//! { "name": "Sequence", "type": "Sequence", "status": "RUNNING",
//!   "children": [ { "name": "nap", "type": "Sleep", "params": [5.0] } ] }
//! ```
//!
//! # Export
//!
//! [`export`] walks the tree depth-first.  Leaves with a single tunable carry
//! it as a one-element `params` array; `status` is written only on request.
//!
//! # Import
//!
//! [`import`] is deliberately lenient.  The external tree generator speaks a
//! coarser vocabulary (`CustomAction` / `CustomCondition`) that is mapped onto
//! the internal node types through [`CUSTOM_ACTIONS`] and
//! [`CUSTOM_CONDITIONS`].  Conditions are not evaluated as conditions: each
//! one is replaced by an action approximating its intent.  Unknown names and
//! types never fail; they fall back to a defined variant.
//!
//! # Documents
//!
//! Files hold either a bare tree or a `Root` wrapper
//! (`{"name":"BehaviorTree","type":"Root","children":[<tree>]}`).
//! [`unwrap_document`] accepts both; [`wrap_document`] writes the wrapper.

use rand::rngs::StdRng;
use serde_json::Value;
use tabby_types::{NodeRecord, TabbyError};
use tracing::debug;

use crate::behavior_tree::{BehaviorNode, NodeKind, NodeType};

/// Type tag of the document wrapper.
pub const ROOT_TYPE: &str = "Root";
/// Name of the document wrapper.
pub const ROOT_NAME: &str = "BehaviorTree";

/// Factor applied to a Sleep leaf standing in for `IsTired`.
pub const TIRED_SLEEP_FACTOR: f64 = 2.0;

/// `CustomAction` name → internal node type.  Anything else becomes
/// [`NodeType::Interact`].
pub const CUSTOM_ACTIONS: &[(&str, NodeType)] = &[
    ("Sleep", NodeType::Sleep),
    ("Play", NodeType::Play),
    ("AgentPatrol", NodeType::Wander),
    ("AgentDestination", NodeType::MoveToTarget),
    ("Eat", NodeType::Interact),
    ("Talk", NodeType::Interact),
    ("Work", NodeType::Interact),
    ("WaitTime", NodeType::RandomWait),
];

/// `CustomCondition` name → proxy action.  Anything else becomes
/// [`NodeType::ObserveItems`].
pub const CUSTOM_CONDITIONS: &[(&str, NodeType)] = &[
    ("IsTired", NodeType::Sleep),
    ("IsHungry", NodeType::Interact),
    ("IsBored", NodeType::Play),
];

// ─────────────────────────────────────────────────────────────────────────────
// Export
// ─────────────────────────────────────────────────────────────────────────────

/// Encode `node` and its subtree.
pub fn export(node: &BehaviorNode, include_status: bool) -> NodeRecord {
    let mut record = NodeRecord::new(node.kind_tag(), node.name());
    if let Some(p) = node.param() {
        record = record.with_param(p);
    }
    if include_status {
        record.status = Some(node.status());
    }
    record.children = node
        .children()
        .iter()
        .map(|c| export(c, include_status))
        .collect();
    record
}

/// Encode `node` as a JSON value.
pub fn to_value(node: &BehaviorNode, include_status: bool) -> Result<Value, TabbyError> {
    serde_json::to_value(export(node, include_status))
        .map_err(|e| TabbyError::Serialization(e.to_string()))
}

/// Encode `node` as pretty-printed JSON text.
pub fn to_json_string(node: &BehaviorNode, include_status: bool) -> Result<String, TabbyError> {
    serde_json::to_string_pretty(&export(node, include_status))
        .map_err(|e| TabbyError::Serialization(e.to_string()))
}

/// Wrap a tree record in the `Root` document shape.
pub fn wrap_document(tree: NodeRecord) -> NodeRecord {
    NodeRecord::new(ROOT_TYPE, ROOT_NAME).with_children(vec![tree])
}

// ─────────────────────────────────────────────────────────────────────────────
// Import
// ─────────────────────────────────────────────────────────────────────────────

/// Strip an optional `Root` wrapper.
///
/// A wrapper with one child yields that child, one with several yields a
/// `Sequence` of them, and an empty wrapper yields an empty `Sequence`.
pub fn unwrap_document(document: NodeRecord) -> NodeRecord {
    if document.kind != ROOT_TYPE {
        return document;
    }
    let mut children = document.children;
    match children.len() {
        1 => children.remove(0),
        _ => NodeRecord::new("Sequence", "Sequence").with_children(children),
    }
}

/// Parse a JSON value (bare tree or `Root` document) into a record.
pub fn parse_document(value: Value) -> Result<NodeRecord, TabbyError> {
    let record: NodeRecord = serde_json::from_value(value)
        .map_err(|e| TabbyError::Serialization(e.to_string()))?;
    Ok(unwrap_document(record))
}

/// Build a live tree from `record`.
pub fn import(record: &NodeRecord, rng: &mut StdRng) -> BehaviorNode {
    let mut node = construct(record, rng);

    if node.is_composite() {
        for child in &record.children {
            node.push_child(import(child, rng));
        }
    }
    if let Some(value) = record.first_param() {
        node.set_param(value);
    }
    node
}

/// Build the node for `record` itself, without children or params.
fn construct(record: &NodeRecord, rng: &mut StdRng) -> BehaviorNode {
    let name = if record.name.is_empty() {
        record.kind.clone()
    } else {
        record.name.clone()
    };

    match record.kind.as_str() {
        "CustomAction" | "Action" => {
            let node_type = lookup(CUSTOM_ACTIONS, &record.name).unwrap_or(NodeType::Interact);
            BehaviorNode::spawn(node_type, name, rng)
        }
        "CustomCondition" | "Condition" => condition_proxy(&record.name, rng),
        "WaitTime" => BehaviorNode::spawn(NodeType::RandomWait, name, rng),
        tag => match NodeType::parse(tag) {
            Some(node_type) => BehaviorNode::spawn(node_type, name, rng),
            None => {
                debug!(tag, "unknown node type; substituting an empty Sequence");
                BehaviorNode::spawn(NodeType::Sequence, name, rng)
            }
        },
    }
}

/// Action standing in for a condition the engine does not evaluate.
fn condition_proxy(condition: &str, rng: &mut StdRng) -> BehaviorNode {
    let node_type = lookup(CUSTOM_CONDITIONS, condition).unwrap_or(NodeType::ObserveItems);
    match condition {
        "IsTired" => {
            let mut node = BehaviorNode::spawn(node_type, "Sleep", rng);
            if let NodeKind::Sleep(sleep) = node.kind_mut() {
                sleep.timer.duration *= TIRED_SLEEP_FACTOR;
            }
            node
        }
        "IsHungry" => BehaviorNode::spawn(node_type, "Eat", rng),
        _ => BehaviorNode::spawn(node_type, condition, rng),
    }
}

fn lookup(table: &[(&str, NodeType)], name: &str) -> Option<NodeType> {
    table
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, node_type)| *node_type)
}
