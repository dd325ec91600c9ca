//! Serializable form of a network
//!
//! A snapshot is plain nested numbers: per layer the node ids, biases and the
//! outgoing connections of each node. Loading validates every structural
//! invariant before a [`Network`] is built from it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::activation::Activation;
use crate::connection::{Connection, NodeId};
use crate::layer::Layer;
use crate::network::Network;
use crate::node::Node;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSnapshot {
    pub target_node_id: u32,
    pub weight: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSnapshot {
    pub node_count: usize,
    pub node_ids: Vec<u32>,
    pub biases: Vec<f32>,
    /// Outgoing connections per node, in node order
    pub connections: Vec<Vec<ConnectionSnapshot>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    #[serde(default)]
    pub activation: Activation,
    pub next_node_id: u32,
    pub layers: Vec<LayerSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("snapshot has {count} layers, at least 2 are required")]
    TooFewLayers { count: usize },

    #[error("snapshot layer {layer} is empty")]
    EmptyLayer { layer: usize },

    #[error("snapshot layer {layer}: node_count {node_count} disagrees with {field} length {actual}")]
    CountMismatch {
        layer: usize,
        node_count: usize,
        field: &'static str,
        actual: usize,
    },

    #[error("node id {id} appears more than once")]
    DuplicateNodeId { id: u32 },

    #[error("node {source_id} in layer {layer} connects to {target_id}, which is not in the next layer")]
    DanglingConnection {
        layer: usize,
        source_id: u32,
        target_id: u32,
    },

    #[error("output node {id} has outgoing connections")]
    OutputConnection { id: u32 },

    #[error("next_node_id {next_node_id} does not exceed every node id (max {max_id})")]
    IdCounterBehind { next_node_id: u32, max_id: u32 },
}

impl Network {
    pub fn snapshot(&self) -> NetworkSnapshot {
        let layers = self
            .layers()
            .iter()
            .map(|layer| LayerSnapshot {
                node_count: layer.len(),
                node_ids: layer.ids().map(NodeId::raw).collect(),
                biases: layer.iter().map(|n| n.bias).collect(),
                connections: layer
                    .iter()
                    .map(|n| {
                        n.connections()
                            .iter()
                            .map(|c| ConnectionSnapshot {
                                target_node_id: c.target.raw(),
                                weight: c.weight,
                            })
                            .collect()
                    })
                    .collect(),
            })
            .collect();

        NetworkSnapshot {
            activation: self.activation(),
            next_node_id: self.next_node_id().raw(),
            layers,
        }
    }

    /// Rebuild a network exactly as it was snapshotted
    pub fn from_snapshot(snapshot: &NetworkSnapshot) -> Result<Self, SnapshotError> {
        snapshot.validate()?;

        let layers = snapshot
            .layers
            .iter()
            .map(|layer| {
                layer
                    .node_ids
                    .iter()
                    .zip(&layer.biases)
                    .zip(&layer.connections)
                    .map(|((&id, &bias), connections)| {
                        let connections = connections
                            .iter()
                            .map(|c| Connection::new(NodeId(c.target_node_id), c.weight))
                            .collect();
                        Node::with_connections(NodeId(id), bias, connections)
                    })
                    .collect::<Layer>()
            })
            .collect();

        let network = Network::from_parts(layers, snapshot.next_node_id, snapshot.activation);
        network.debug_verify();
        Ok(network)
    }
}

impl NetworkSnapshot {
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.layers.len() < 2 {
            return Err(SnapshotError::TooFewLayers {
                count: self.layers.len(),
            });
        }

        let mut seen = HashSet::new();
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.node_count == 0 {
                return Err(SnapshotError::EmptyLayer { layer: i });
            }
            for (field, actual) in [
                ("node_ids", layer.node_ids.len()),
                ("biases", layer.biases.len()),
                ("connections", layer.connections.len()),
            ] {
                if actual != layer.node_count {
                    return Err(SnapshotError::CountMismatch {
                        layer: i,
                        node_count: layer.node_count,
                        field,
                        actual,
                    });
                }
            }
            for &id in &layer.node_ids {
                if !seen.insert(id) {
                    return Err(SnapshotError::DuplicateNodeId { id });
                }
            }
        }

        let max_id = seen.iter().copied().max().unwrap_or(0);
        if self.next_node_id <= max_id {
            return Err(SnapshotError::IdCounterBehind {
                next_node_id: self.next_node_id,
                max_id,
            });
        }

        let last = self.layers.len() - 1;
        for (i, layer) in self.layers.iter().enumerate() {
            for (&source_id, connections) in layer.node_ids.iter().zip(&layer.connections) {
                if i == last {
                    if !connections.is_empty() {
                        return Err(SnapshotError::OutputConnection { id: source_id });
                    }
                    continue;
                }
                let next = &self.layers[i + 1].node_ids;
                if let Some(c) = connections.iter().find(|c| !next.contains(&c.target_node_id)) {
                    return Err(SnapshotError::DanglingConnection {
                        layer: i,
                        source_id,
                        target_id: c.target_node_id,
                    });
                }
            }
        }

        Ok(())
    }
}
