//! Node object model.
//!
//! A `Node` is the machine object delivered by the health change feed:
//! a stable identity plus a list of named conditions. Only the `Ready`
//! condition is interpreted here; everything else is carried opaquely.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Unique identifier for a node in the cluster.
pub type NodeName = String;

/// The condition kind that carries node readiness.
pub const READY_CONDITION: &str = "Ready";

/// The affirmative condition status. Any other value counts as
/// unhealthy.
pub const CONDITION_TRUE: &str = "True";

/// A machine tracked by the repair workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    /// Stable identity, used as the map key everywhere.
    pub name: NodeName,
    /// Named status conditions, as reported by the feed.
    pub conditions: Vec<NodeCondition>,
}

/// A single named condition on a node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeCondition {
    /// Condition kind, e.g. `"Ready"`.
    pub kind: String,
    /// Condition status; `"True"` is affirmative.
    pub status: String,
    /// When the status last changed.
    pub last_transition: SystemTime,
}

impl Node {
    /// Build a node with a single `Ready` condition.
    pub fn with_readiness(name: &str, status: &str, last_transition: SystemTime) -> Self {
        Self {
            name: name.to_string(),
            conditions: vec![NodeCondition {
                kind: READY_CONDITION.to_string(),
                status: status.to_string(),
                last_transition,
            }],
        }
    }

    /// The node's `Ready` condition, if it reports one.
    pub fn ready_condition(&self) -> Option<&NodeCondition> {
        self.conditions.iter().find(|c| c.kind == READY_CONDITION)
    }
}
