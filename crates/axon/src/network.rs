//! Layered feed-forward network
//!
//! Nodes live in per-layer arenas; connections name their target by [`NodeId`]
//! and the network keeps an id → (layer, slot) index so a pass can route
//! signals in O(1). Layer 0 is the input layer, the last layer is the output
//! layer. A node only ever connects to nodes of the layer directly after its own.

use std::fmt;
use std::ops::Range;

use ahash::HashMap;

use crate::activation::Activation;
use crate::connection::NodeId;
use crate::error::{NetworkError, Result};
use crate::layer::Layer;
use crate::node::Node;
use crate::rng::MutationRng;

/// Position of a node inside the layer arenas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeSlot {
    pub layer: usize,
    pub slot: usize,
}

#[derive(Debug, Clone)]
pub struct Network {
    layers: Vec<Layer>,
    next_node_id: u32,
    activation: Activation,
    index: HashMap<NodeId, NodeSlot>,
}

impl Network {
    /// Build a fully connected network with random weights in [-1, 1] and zero biases.
    /// `layer_heights` lists the node count of every layer, input first.
    pub fn new<R: MutationRng + ?Sized>(layer_heights: &[usize], rng: &mut R) -> Result<Self> {
        let mut network = Self::empty();
        network.build_default(layer_heights, rng)?;
        Ok(network)
    }

    /// Build a fully connected network where every weight and bias has the given value.
    pub fn uniform(layer_heights: &[usize], weight: f32, bias: f32) -> Result<Self> {
        let mut network = Self::empty();
        network.rebuild_layers(layer_heights)?;
        network.fill_biases(bias);
        network.connect_uniform(weight);
        Ok(network)
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    fn empty() -> Self {
        Self {
            layers: Vec::new(),
            next_node_id: 0,
            activation: Activation::default(),
            index: HashMap::default(),
        }
    }

    pub(crate) fn from_parts(layers: Vec<Layer>, next_node_id: u32, activation: Activation) -> Self {
        let mut network = Self {
            layers,
            next_node_id,
            activation,
            index: HashMap::default(),
        };
        network.reindex();
        network
    }

    /// Discard the current topology and rebuild it fully connected with fresh
    /// random weights. Node ids restart at 0.
    pub fn build_default<R: MutationRng + ?Sized>(
        &mut self,
        layer_heights: &[usize],
        rng: &mut R,
    ) -> Result<()> {
        self.rebuild_layers(layer_heights)?;
        self.connect_fresh(rng);
        log::debug!("built network {}", self.summary());
        Ok(())
    }

    fn rebuild_layers(&mut self, layer_heights: &[usize]) -> Result<()> {
        if layer_heights.len() < 2 {
            return Err(NetworkError::TooFewLayers {
                count: layer_heights.len(),
            });
        }
        if let Some(index) = layer_heights.iter().position(|&h| h == 0) {
            return Err(NetworkError::EmptyLayer { index });
        }

        let total: usize = layer_heights.iter().sum();
        let mut ids = Self::id_range(0, total)?;

        self.layers.clear();
        self.next_node_id = ids.end;
        for &height in layer_heights {
            let layer: Layer = ids
                .by_ref()
                .take(height)
                .map(|id| Node::new(NodeId(id), 0.0))
                .collect();
            self.layers.push(layer);
        }
        self.reindex();
        Ok(())
    }

    /// Drop every connection and connect each layer to the next all-to-all
    /// with independently drawn weights in [-1, 1].
    pub fn connect_fresh<R: MutationRng + ?Sized>(&mut self, rng: &mut R) {
        self.connect_all(|| rng.unit_weight());
    }

    fn connect_uniform(&mut self, weight: f32) {
        self.connect_all(|| weight);
    }

    fn connect_all(&mut self, mut weight: impl FnMut() -> f32) {
        let last = self.layers.len().saturating_sub(1);
        for i in 0..self.layers.len() {
            let next_ids: Vec<NodeId> = if i < last {
                self.layers[i + 1].ids().collect()
            } else {
                Vec::new()
            };
            for node in self.layers[i].iter_mut() {
                node.remove_all_connections();
                for &target in &next_ids {
                    node.connect_node(target, weight());
                }
            }
        }
    }

    /// `count` consecutive ids starting at `start`, if they all stay below `u32::MAX`
    fn id_range(start: u32, count: usize) -> Result<Range<u32>> {
        u32::try_from(count)
            .ok()
            .and_then(|n| start.checked_add(n))
            .map(|end| start..end)
            .ok_or(NetworkError::IdsExhausted {
                requested: count,
                next_node_id: start,
            })
    }

    /// Reserve `count` fresh ids. Fails without moving the counter.
    pub(crate) fn allocate_ids(&mut self, count: usize) -> Result<Range<u32>> {
        let ids = Self::id_range(self.next_node_id, count)?;
        self.next_node_id = ids.end;
        Ok(ids)
    }

    pub(crate) fn allocate_id(&mut self) -> Result<NodeId> {
        self.allocate_ids(1).map(|ids| NodeId(ids.start))
    }

    pub(crate) fn reindex(&mut self) {
        self.index.clear();
        for (layer, nodes) in self.layers.iter().enumerate() {
            for (slot, node) in nodes.iter().enumerate() {
                self.index.insert(node.id, NodeSlot { layer, slot });
            }
        }
    }

    pub(crate) fn layers_mut(&mut self) -> &mut Vec<Layer> {
        &mut self.layers
    }

    pub(crate) fn index_mut(&mut self) -> &mut HashMap<NodeId, NodeSlot> {
        &mut self.index
    }

    // ===== Queries =====

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn input_count(&self) -> usize {
        self.layers.first().map_or(0, Layer::len)
    }

    pub fn output_count(&self) -> usize {
        self.layers.last().map_or(0, Layer::len)
    }

    pub fn node_count(&self) -> usize {
        self.layers.iter().map(Layer::len).sum()
    }

    pub fn connection_count(&self) -> usize {
        self.layers.iter().map(Layer::connection_count).sum()
    }

    pub fn layer_heights(&self) -> Vec<usize> {
        self.layers.iter().map(Layer::len).collect()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        let slot = self.index.get(&id)?;
        Some(&self.layers[slot.layer][slot.slot])
    }

    /// Layer index holding `id`
    pub fn layer_of(&self, id: NodeId) -> Option<usize> {
        self.index.get(&id).map(|slot| slot.layer)
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn set_activation(&mut self, activation: Activation) {
        self.activation = activation;
    }

    /// Id the next created node will receive
    pub fn next_node_id(&self) -> NodeId {
        NodeId(self.next_node_id)
    }

    pub fn summary(&self) -> NetworkSummary {
        NetworkSummary {
            layer_heights: self.layer_heights(),
            nodes: self.node_count(),
            connections: self.connection_count(),
        }
    }

    // ===== Parameter access =====

    pub fn bias_mut(&mut self, layer: usize, slot: usize) -> Option<&mut f32> {
        let node = self.layers.get_mut(layer)?.nodes_mut().get_mut(slot)?;
        Some(&mut node.bias)
    }

    pub fn weight_mut(&mut self, layer: usize, slot: usize, connection: usize) -> Option<&mut f32> {
        let node = self.layers.get_mut(layer)?.nodes_mut().get_mut(slot)?;
        node.weight_mut(connection)
    }

    pub fn fill_weights(&mut self, weight: f32) {
        for node in self.layers.iter_mut().flat_map(Layer::iter_mut) {
            node.fill_weights(weight);
        }
    }

    pub fn fill_biases(&mut self, bias: f32) {
        for node in self.layers.iter_mut().flat_map(Layer::iter_mut) {
            node.bias = bias;
        }
    }

    // ===== Evaluation =====

    /// Single synchronous forward pass.
    ///
    /// Each input node receives exactly one value and passes it on, then every
    /// hidden layer sends in order, and finally the output values are read and
    /// the output nodes flushed. Fails without touching any node if the input
    /// count differs from the input layer size.
    pub fn evaluate(&mut self, inputs: &[f32]) -> Result<Vec<f32>> {
        let expected = self.input_count();
        if inputs.len() != expected {
            log::error!(
                "evaluate: got {} inputs for an input layer of {} nodes",
                inputs.len(),
                expected
            );
            return Err(NetworkError::ShapeMismatch {
                expected,
                actual: inputs.len(),
            });
        }

        let activation = self.activation;
        let last = self.layers.len() - 1;
        let index = &self.index;

        for i in 0..last {
            let (head, tail) = self.layers.split_at_mut(i + 1);
            let source = &mut head[i];
            let next = &mut tail[0];

            for (slot, node) in source.iter_mut().enumerate() {
                if i == 0 {
                    node.receive_input(inputs[slot]);
                }
                node.send_output(activation, |target, signal| {
                    if let Some(target_slot) = index.get(&target) {
                        debug_assert_eq!(target_slot.layer, i + 1);
                        next[target_slot.slot].receive_input(signal);
                    }
                });
            }
        }

        let outputs = self.layers[last]
            .iter_mut()
            .map(|node| {
                let value = node.current_value(activation);
                node.flush();
                value
            })
            .collect();

        Ok(outputs)
    }

    // ===== Repair =====

    /// Re-establish every connection between adjacent layers by node id.
    ///
    /// Edges whose target is not in the next layer, and repeated edges to the
    /// same target, are dropped first. Every existing edge keeps its weight and
    /// any missing pair is connected at weight 0, leaving each node's edges in
    /// next-layer order. Running it again changes nothing.
    pub fn refresh_connections(&mut self) {
        let last = self.layers.len() - 1;
        let index = &self.index;

        for i in 0..last {
            let (head, tail) = self.layers.split_at_mut(i + 1);
            let next_ids: Vec<NodeId> = tail[0].ids().collect();

            for node in head[i].iter_mut() {
                let mut seen = Vec::with_capacity(next_ids.len());
                node.retain_connections(|c| {
                    let in_next = index.get(&c.target).is_some_and(|s| s.layer == i + 1);
                    if in_next && !seen.contains(&c.target) {
                        seen.push(c.target);
                        true
                    } else {
                        false
                    }
                });
                for &target in &next_ids {
                    node.refresh_connection(target);
                }
            }
        }

        for node in self.layers[last].iter_mut() {
            node.remove_all_connections();
        }
    }

    // ===== Compatibility and copying =====

    /// Same layer count and identical per-layer node counts
    pub fn is_compatible_with(&self, other: &Network) -> bool {
        self.layers.len() == other.layers.len()
            && self
                .layers
                .iter()
                .zip(&other.layers)
                .all(|(a, b)| a.len() == b.len())
    }

    fn ensure_compatible(&self, other: &Network) -> Result<()> {
        if self.is_compatible_with(other) {
            Ok(())
        } else {
            Err(NetworkError::IncompatibleTopology {
                ours: self.layer_heights(),
                theirs: other.layer_heights(),
            })
        }
    }

    /// Copy connection weights node by node, position by position. Topology,
    /// ids and biases stay as they are.
    pub fn copy_connections_from(&mut self, other: &Network) -> Result<()> {
        self.ensure_compatible(other)?;
        for (ours, theirs) in self.layers.iter_mut().zip(&other.layers) {
            for (node, source) in ours.iter_mut().zip(theirs) {
                node.copy_weights_from(source);
            }
        }
        Ok(())
    }

    /// Turn this network into an exact replica of `other`: layer heights, node
    /// ids, connection targets, weights, biases and activation. Existing
    /// allocations are reused where possible.
    pub fn copy_network_from(&mut self, other: &Network) {
        self.layers.clone_from(&other.layers);
        self.index.clone_from(&other.index);
        self.next_node_id = other.next_node_id;
        self.activation = other.activation;
        self.flush_all();
    }

    fn flush_all(&mut self) {
        for node in self.layers.iter_mut().flat_map(Layer::iter_mut) {
            node.flush();
        }
    }

    /// Per-node coin-flip crossover with a compatible partner. Returns how many
    /// values were taken from the partner
    pub fn crossover_from<R: MutationRng + ?Sized>(
        &mut self,
        partner: &Network,
        rng: &mut R,
    ) -> Result<usize> {
        self.ensure_compatible(partner)?;
        let mut taken = 0;
        for (ours, theirs) in self.layers.iter_mut().zip(&partner.layers) {
            for (node, source) in ours.iter_mut().zip(theirs) {
                taken += node.crossover_from(source, rng);
            }
        }
        Ok(taken)
    }

    /// Check the structural invariants; used by debug builds after every edit
    pub(crate) fn debug_verify(&self) {
        if !cfg!(debug_assertions) {
            return;
        }
        debug_assert!(self.layers.len() >= 2, "network lost its input/output layers");
        debug_assert_eq!(self.index.len(), self.node_count(), "node ids must be unique");
        let last = self.layers.len() - 1;
        for (i, layer) in self.layers.iter().enumerate() {
            debug_assert!(!layer.is_empty(), "layer {i} is empty");
            for node in layer {
                debug_assert!(node.id.raw() < self.next_node_id);
                for c in node.connections() {
                    debug_assert!(i < last, "output node {} has outgoing connections", node.id);
                    debug_assert_eq!(
                        self.layer_of(c.target),
                        Some(i + 1),
                        "node {} connects outside the next layer",
                        node.id
                    );
                }
            }
        }
    }
}

/// Compact description of a network's shape, for logs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSummary {
    pub layer_heights: Vec<usize>,
    pub nodes: usize,
    pub connections: usize,
}

impl fmt::Display for NetworkSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} nodes={} connections={}",
            self.layer_heights, self.nodes, self.connections
        )
    }
}
