//! Topology surgery: growing and shrinking a network while keeping what it learned
//!
//! All index checks run before any node is touched, so a failed edit leaves the
//! network exactly as it was.

use serde::{Deserialize, Serialize};

use crate::connection::NodeId;
use crate::error::{NetworkError, Result};
use crate::layer::Layer;
use crate::network::{Network, NodeSlot};
use crate::node::Node;
use crate::rng::MutationRng;

/// How weights and biases of newly created edges and nodes are chosen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeightInit {
    /// Weights in [-1, 1], biases in [-1, 1]
    Random,
    Fixed { weight: f32, bias: f32 },
}

impl WeightInit {
    pub const fn fixed(weight: f32, bias: f32) -> Self {
        Self::Fixed { weight, bias }
    }

    pub fn weight<R: MutationRng + ?Sized>(&self, rng: &mut R) -> f32 {
        match *self {
            Self::Random => rng.unit_weight(),
            Self::Fixed { weight, .. } => weight,
        }
    }

    pub fn bias<R: MutationRng + ?Sized>(&self, rng: &mut R) -> f32 {
        match *self {
            Self::Random => rng.unit_weight(),
            Self::Fixed { bias, .. } => bias,
        }
    }
}

impl Network {
    fn check_index(&self, operation: &'static str, index: usize, valid: std::ops::Range<usize>) -> Result<()> {
        if valid.contains(&index) {
            Ok(())
        } else {
            Err(NetworkError::InvalidIndex {
                operation,
                index,
                layer_count: self.layer_count(),
            })
        }
    }

    /// Append a node to `layer`. Every node of the previous layer connects to
    /// it and it connects to every node of the next layer.
    pub fn add_node_to_layer<R: MutationRng + ?Sized>(
        &mut self,
        layer: usize,
        init: WeightInit,
        rng: &mut R,
    ) -> Result<NodeId> {
        self.check_index("add_node_to_layer", layer, 0..self.layer_count())?;

        let id = self.allocate_id()?;
        let mut node = Node::new(id, init.bias(rng));
        let layer_count = self.layer_count();
        let layers = self.layers_mut();

        if layer + 1 < layer_count {
            for target in layers[layer + 1].ids() {
                node.connect_node(target, init.weight(rng));
            }
        }
        if layer > 0 {
            for source in layers[layer - 1].iter_mut() {
                source.connect_node(id, init.weight(rng));
            }
        }

        let slot = layers[layer].len();
        layers[layer].push(node);
        self.index_mut().insert(id, NodeSlot { layer, slot });

        log::debug!("added node {id} to layer {layer}");
        self.debug_verify();
        Ok(id)
    }

    /// Remove the last node of `layer` along with every edge pointing at it.
    /// A layer is never left empty.
    pub fn remove_node_from_layer(&mut self, layer: usize) -> Result<NodeId> {
        self.check_index("remove_node_from_layer", layer, 0..self.layer_count())?;
        if self.layers()[layer].len() <= 1 {
            return Err(NetworkError::EmptyLayer { index: layer });
        }

        let layers = self.layers_mut();
        let Some(node) = layers[layer].pop() else {
            return Err(NetworkError::EmptyLayer { index: layer });
        };
        if layer > 0 {
            for source in layers[layer - 1].iter_mut() {
                source.remove_connections_to(node.id);
            }
        }
        self.index_mut().remove(&node.id);

        log::debug!("removed node {} from layer {layer}", node.id);
        self.debug_verify();
        Ok(node.id)
    }

    /// Insert a layer of `num_nodes` nodes at `index`, between the layers
    /// currently at `index - 1` and `index`.
    ///
    /// When the new layer is as tall as the previous one and
    /// `replace_axon_weights` is false, node *i* of the previous layer hands
    /// its outgoing edges over to new node *i*, so the learned weights now
    /// leave the new layer. Otherwise the new layer connects fresh to the next
    /// one. Either way the previous layer then connects to every new node.
    pub fn add_layer<R: MutationRng + ?Sized>(
        &mut self,
        index: usize,
        num_nodes: usize,
        replace_axon_weights: bool,
        init: WeightInit,
        rng: &mut R,
    ) -> Result<()> {
        self.check_index("add_layer", index, 1..self.layer_count())?;
        if num_nodes == 0 {
            return Err(NetworkError::EmptyLayer { index });
        }

        let mut fresh: Layer = self
            .allocate_ids(num_nodes)?
            .map(|id| Node::new(NodeId(id), init.bias(rng)))
            .collect();

        let layers = self.layers_mut();
        let (head, tail) = layers.split_at_mut(index);
        let prev = &mut head[index - 1];
        let next = &tail[0];
        let inherit = num_nodes == prev.len() && !replace_axon_weights;

        if inherit {
            for (source, heir) in prev.iter_mut().zip(fresh.iter_mut()) {
                for target in next.ids() {
                    while source.replace_connection(target, heir, None) {}
                }
                // Anything left would skip a layer
                source.remove_all_connections();
            }
        } else {
            for source in prev.iter_mut() {
                source.remove_all_connections();
            }
            for node in fresh.iter_mut() {
                for target in next.ids() {
                    node.connect_node(target, init.weight(rng));
                }
            }
        }

        let fresh_ids: Vec<NodeId> = fresh.ids().collect();
        for source in prev.iter_mut() {
            for &target in &fresh_ids {
                source.connect_node(target, init.weight(rng));
            }
        }

        layers.insert(index, fresh);
        self.reindex();

        log::debug!(
            "inserted layer {index} with {num_nodes} nodes ({})",
            if inherit { "inherited" } else { "fresh" }
        );
        self.debug_verify();
        Ok(())
    }

    /// Remove the interior layer at `index` and bridge its neighbours.
    ///
    /// When the removed layer is as tall as the previous one and
    /// `replace_connections` is false, node *i* of the previous layer takes
    /// over removed node *i*'s edges. Otherwise the previous layer reconnects
    /// to the next one with random weights.
    pub fn remove_layer<R: MutationRng + ?Sized>(
        &mut self,
        index: usize,
        replace_connections: bool,
        rng: &mut R,
    ) -> Result<()> {
        let interior = 1..self.layer_count().saturating_sub(1);
        self.check_index("remove_layer", index, interior)?;

        let layers = self.layers_mut();
        let mut removed = layers.remove(index);
        let (head, tail) = layers.split_at_mut(index);
        let prev = &mut head[index - 1];
        let next = &tail[0];
        let inherit = removed.len() == prev.len() && !replace_connections;

        if inherit {
            for (source, dying) in prev.iter_mut().zip(removed.iter_mut()) {
                source.remove_all_connections();
                for target in next.ids() {
                    while dying.replace_connection(target, source, None) {}
                }
            }
        } else {
            for source in prev.iter_mut() {
                source.remove_all_connections();
                for target in next.ids() {
                    source.connect_node(target, rng.unit_weight());
                }
            }
        }

        self.reindex();

        log::debug!(
            "removed layer {index} ({})",
            if inherit { "inherited" } else { "reconnected" }
        );
        self.debug_verify();
        Ok(())
    }
}
