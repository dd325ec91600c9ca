//! Network node: accumulates weighted inputs during a pass and fans its value
//! out over its outgoing connections.

use crate::activation::Activation;
use crate::connection::{Connection, NodeId};
use crate::rng::MutationRng;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub bias: f32,
    // Transient pass state, zero between passes
    accumulator: f32,
    input_count: u32,
    connections: Vec<Connection>,
}

impl Node {
    pub fn new(id: NodeId, bias: f32) -> Self {
        Self {
            id,
            bias,
            accumulator: 0.0,
            input_count: 0,
            connections: Vec::new(),
        }
    }

    pub(crate) fn with_connections(id: NodeId, bias: f32, connections: Vec<Connection>) -> Self {
        Self {
            connections,
            ..Self::new(id, bias)
        }
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// First connection pointing at `target`
    pub fn connection_to(&self, target: NodeId) -> Option<&Connection> {
        self.connections.iter().find(|c| c.target == target)
    }

    /// How many inputs arrived in the current pass
    pub fn received(&self) -> u32 {
        self.input_count
    }

    // ===== Evaluation =====

    pub fn receive_input(&mut self, value: f32) {
        self.accumulator += value;
        self.input_count += 1;
    }

    /// Output of this node for what it has received so far in the pass
    pub fn current_value(&self, activation: Activation) -> f32 {
        activation.activate(self.accumulator, self.input_count, self.bias)
    }

    pub fn flush(&mut self) {
        self.accumulator = 0.0;
        self.input_count = 0;
    }

    /// Deliver `current_value * weight` for every connection, then flush.
    /// `deliver` receives the target id and the weighted signal.
    pub fn send_output(&mut self, activation: Activation, mut deliver: impl FnMut(NodeId, f32)) {
        let value = self.current_value(activation);
        for connection in &self.connections {
            deliver(connection.target, connection.transmit(value));
        }
        self.flush();
    }

    // ===== Connection editing =====

    /// Append a connection. Parallel edges to the same target are allowed.
    pub fn connect_node(&mut self, target: NodeId, weight: f32) {
        self.connections.push(Connection::new(target, weight));
    }

    /// Remove the first connection to `target`.
    /// Returns true if a connection was removed
    pub fn remove_connection(&mut self, target: NodeId) -> bool {
        match self.connections.iter().position(|c| c.target == target) {
            Some(i) => {
                self.connections.remove(i);
                true
            }
            None => false,
        }
    }

    /// Remove every connection to `target`, returning how many went away
    pub fn remove_connections_to(&mut self, target: NodeId) -> usize {
        let before = self.connections.len();
        self.connections.retain(|c| c.target != target);
        before - self.connections.len()
    }

    pub fn weight_mut(&mut self, connection: usize) -> Option<&mut f32> {
        self.connections.get_mut(connection).map(|c| &mut c.weight)
    }

    pub fn fill_weights(&mut self, weight: f32) {
        for connection in &mut self.connections {
            connection.weight = weight;
        }
    }

    pub fn remove_all_connections(&mut self) {
        self.connections.clear();
    }

    pub(crate) fn retain_connections(&mut self, keep: impl FnMut(&Connection) -> bool) {
        self.connections.retain(keep);
    }

    /// Re-establish the connection to `target` at the end of the list, keeping
    /// its weight. A missing connection is created with weight 0.
    /// Returns true if the connection already existed
    pub fn refresh_connection(&mut self, target: NodeId) -> bool {
        match self.connections.iter().position(|c| c.target == target) {
            Some(i) => {
                let existing = self.connections.remove(i);
                self.connections.push(existing);
                true
            }
            None => {
                self.connect_node(target, 0.0);
                false
            }
        }
    }

    /// Hand this node's edge to `old_target` over to `new_source`.
    ///
    /// The first matching edge is removed from `self` and `new_source` gains an
    /// edge to `old_target` carrying the old weight, or `replacement_weight`
    /// when given. Returns false (and changes nothing) if no edge matched.
    pub fn replace_connection(
        &mut self,
        old_target: NodeId,
        new_source: &mut Node,
        replacement_weight: Option<f32>,
    ) -> bool {
        let Some(i) = self.connections.iter().position(|c| c.target == old_target) else {
            return false;
        };
        let old = self.connections.remove(i);
        new_source.connect_node(old_target, replacement_weight.unwrap_or(old.weight));
        true
    }

    /// Copy connection weights position by position, up to the shorter list.
    /// Targets, id and bias stay as they are.
    pub fn copy_weights_from(&mut self, other: &Node) {
        for (ours, theirs) in self.connections.iter_mut().zip(&other.connections) {
            ours.weight = theirs.weight;
        }
    }

    // ===== Mutation =====

    /// Perturb each weight with probability `chance` by a bell-shaped delta of
    /// width `scale`, clamped to [-1, 1]; the bias gets the same treatment
    /// without the clamp. Returns number of values perturbed
    pub fn mutate_asexual<R: MutationRng + ?Sized>(
        &mut self,
        chance: f32,
        scale: f32,
        rng: &mut R,
    ) -> usize {
        let mut mutated = 0;

        for connection in &mut self.connections {
            if rng.check_probability(chance) {
                connection.weight = (connection.weight + rng.bell_delta(scale)).clamp(-1.0, 1.0);
                mutated += 1;
            }
        }

        if rng.check_probability(chance) {
            self.bias += rng.bell_delta(scale);
            mutated += 1;
        }

        mutated
    }

    /// Take each weight (position by position) and the bias from `partner`
    /// on a fair coin flip. Returns number of values taken from the partner
    pub fn crossover_from<R: MutationRng + ?Sized>(&mut self, partner: &Node, rng: &mut R) -> usize {
        let mut taken = 0;

        for (ours, theirs) in self.connections.iter_mut().zip(&partner.connections) {
            if rng.coin_flip() {
                ours.weight = theirs.weight;
                taken += 1;
            }
        }

        if rng.coin_flip() {
            self.bias = partner.bias;
            taken += 1;
        }

        taken
    }
}
