use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a node within one network. Ids are handed out by the network's
/// own counter and are never reused after a node is removed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Weighted edge to a node in the next layer, owned by its source node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub weight: f32,
    pub target: NodeId,
}

impl Connection {
    pub fn new(target: NodeId, weight: f32) -> Self {
        Self { weight, target }
    }

    /// Signal carried to the target for a given source value
    #[inline]
    pub fn transmit(&self, value: f32) -> f32 {
        value * self.weight
    }
}
