//! Asexual mutation of a whole network
//!
//! Every node perturbs its weights and bias, then the network may grow one
//! hidden node and one layer. What changed structurally is reported back.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::network::Network;
use crate::rng::MutationRng;
use crate::topology::WeightInit;

/// New nodes start silent unless random weights are requested
const NODE_INIT: WeightInit = WeightInit::fixed(0.0, 0.0);
/// New layers start as a pass-through of the mean
const LAYER_INIT: WeightInit = WeightInit::fixed(1.0, 0.0);

/// Mutation rates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationConfig {
    /// Probability per weight and per bias of being perturbed
    pub mutation_prob: f32,
    /// Probability of adding a node to a random hidden layer
    pub new_node_prob: f32,
    /// Probability of inserting a new layer
    pub new_layer_prob: f32,
    /// Use random weights for grown structure (and random layer heights)
    pub random_weights: bool,
    /// Standard deviation of weight perturbations
    pub perturbation_scale: f32,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            mutation_prob: 0.1,
            new_node_prob: 0.05,
            new_layer_prob: 0.01,
            random_weights: false,
            perturbation_scale: 0.5,
        }
    }
}

impl MutationConfig {
    /// Rates that leave a network untouched
    pub fn frozen() -> Self {
        Self {
            mutation_prob: 0.0,
            new_node_prob: 0.0,
            new_layer_prob: 0.0,
            ..Self::default()
        }
    }
}

/// Structural change made while mutating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyChange {
    NodeAdded { layer: usize },
    LayerInserted { index: usize, height: usize },
}

impl fmt::Display for TopologyChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeAdded { layer } => write!(f, "(N{layer})"),
            Self::LayerInserted { index, height } => write!(f, "(L{index} {height})"),
        }
    }
}

/// Outcome of one [`Network::mutate_asexual`] call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationReport {
    pub weights_mutated: usize,
    pub changes: Vec<TopologyChange>,
}

impl MutationReport {
    pub fn has_topology_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Compact change log, e.g. `(N1)(L2 3)`. Empty when the topology held.
impl fmt::Display for MutationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for change in &self.changes {
            write!(f, "{change}")?;
        }
        Ok(())
    }
}

impl Network {
    pub fn mutate_asexual<R: MutationRng + ?Sized>(
        &mut self,
        config: &MutationConfig,
        rng: &mut R,
    ) -> MutationReport {
        let mut report = MutationReport::default();

        for node in self.layers_mut().iter_mut().flat_map(|l| l.iter_mut()) {
            report.weights_mutated +=
                node.mutate_asexual(config.mutation_prob, config.perturbation_scale, rng);
        }

        if self.layer_count() > 2 && rng.check_probability(config.new_node_prob) {
            let layer = rng.pick_index(1..self.layer_count() - 1);
            let init = if config.random_weights {
                WeightInit::Random
            } else {
                NODE_INIT
            };
            match self.add_node_to_layer(layer, init, rng) {
                Ok(_) => report.changes.push(TopologyChange::NodeAdded { layer }),
                Err(e) => log::warn!("mutation could not grow layer {layer}: {e}"),
            }
        }

        if rng.check_probability(config.new_layer_prob) {
            let index = rng.pick_index(1..self.layer_count());
            let (height, init) = if config.random_weights {
                let tallest = self.layers().iter().map(|l| l.len()).max().unwrap_or(1);
                (rng.pick_index(1..tallest + 1), WeightInit::Random)
            } else {
                (self.layers()[index].len(), LAYER_INIT)
            };
            match self.add_layer(index, height, false, init, rng) {
                Ok(()) => report
                    .changes
                    .push(TopologyChange::LayerInserted { index, height }),
                Err(e) => log::warn!("mutation could not insert layer {index}: {e}"),
            }
        }

        if report.has_topology_changes() {
            log::debug!("mutated {} values, topology {report}", report.weights_mutated);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_frozen_config_is_noop() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);
        let mut net = Network::new(&[3, 4, 2], &mut rng).unwrap();
        let before = net.clone();

        let report = net.mutate_asexual(&MutationConfig::frozen(), &mut rng);

        assert_eq!(report, MutationReport::default());
        assert_eq!(report.to_string(), "");
        assert_eq!(net.layers(), before.layers());
        assert_eq!(net.next_node_id(), before.next_node_id());
    }

    #[test]
    fn test_certain_growth() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(6);
        let mut net = Network::new(&[2, 3, 1], &mut rng).unwrap();
        let config = MutationConfig {
            mutation_prob: 0.0,
            new_node_prob: 1.0,
            new_layer_prob: 1.0,
            ..MutationConfig::default()
        };

        let report = net.mutate_asexual(&config, &mut rng);

        assert_eq!(report.changes.len(), 2);
        assert_eq!(report.changes[0], TopologyChange::NodeAdded { layer: 1 });
        assert!(matches!(report.changes[1], TopologyChange::LayerInserted { .. }));
        assert_eq!(net.layer_count(), 4);
        assert!(report.to_string().starts_with("(N1)(L"));
    }

    #[test]
    fn test_two_layer_network_never_gains_hidden_node() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let mut net = Network::new(&[2, 1], &mut rng).unwrap();
        let config = MutationConfig {
            new_node_prob: 1.0,
            ..MutationConfig::frozen()
        };

        let report = net.mutate_asexual(&config, &mut rng);

        assert!(!report.has_topology_changes());
        assert_eq!(net.node_count(), 3);
    }

    #[test]
    fn test_random_layer_height_bounded_by_tallest() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(8);
        let config = MutationConfig {
            new_layer_prob: 1.0,
            random_weights: true,
            ..MutationConfig::frozen()
        };

        for _ in 0..20 {
            let mut net = Network::new(&[4, 2, 1], &mut rng).unwrap();
            let report = net.mutate_asexual(&config, &mut rng);
            let TopologyChange::LayerInserted { index, height } = report.changes[0] else {
                panic!("expected a layer insertion");
            };
            assert!((1..3).contains(&index));
            assert!((1..=4).contains(&height));
            assert_eq!(net.layers()[index].len(), height);
        }
    }

    #[test]
    fn test_weight_mutation_counts() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(9);
        let mut net = Network::new(&[2, 3, 1], &mut rng).unwrap();
        let config = MutationConfig {
            mutation_prob: 1.0,
            ..MutationConfig::frozen()
        };

        let report = net.mutate_asexual(&config, &mut rng);

        // Nine weights plus six biases
        assert_eq!(report.weights_mutated, 15);
    }

    #[test]
    fn test_report_display() {
        let report = MutationReport {
            weights_mutated: 3,
            changes: vec![
                TopologyChange::NodeAdded { layer: 1 },
                TopologyChange::LayerInserted { index: 2, height: 3 },
            ],
        };
        assert_eq!(report.to_string(), "(N1)(L2 3)");
    }
}
