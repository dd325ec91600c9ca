//! Integration tests across construction, evaluation, editing and persistence
//!
//! Everything here goes through the public API only.

use axon::{
    load_network, save_network, Activation, GenerationStats, InputMode, InputPriority, InputSpec,
    MutationConfig, Network, NetworkError, NetworkSet, NodeId, TargetTrainer, TrainingConfig,
    WeightInit,
};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

fn seeded(seed: u64) -> Xoshiro256PlusPlus {
    Xoshiro256PlusPlus::seed_from_u64(seed)
}

fn output_bits(network: &mut Network, inputs: &[f32]) -> Vec<u32> {
    network
        .evaluate(inputs)
        .unwrap()
        .iter()
        .map(|v| v.to_bits())
        .collect()
}

fn sorted_layer_weights(network: &Network, layer: usize) -> Vec<f32> {
    let mut weights: Vec<f32> = network.layers()[layer]
        .iter()
        .flat_map(|n| n.connections().iter().map(|c| c.weight))
        .collect();
    weights.sort_by(f32::total_cmp);
    weights
}

// ============================================================================
// Construction & Evaluation
// ============================================================================

#[test]
fn test_heights_match_request() {
    let mut rng = seeded(1);
    for heights in [vec![1, 1], vec![4, 8, 8, 2], vec![3, 1, 5, 1, 2]] {
        let network = Network::new(&heights, &mut rng).unwrap();
        assert_eq!(network.layer_heights(), heights);
        assert_eq!(network.layer_count(), heights.len());
        assert_eq!(network.input_count(), heights[0]);
        assert_eq!(network.output_count(), *heights.last().unwrap());
    }
}

#[test]
fn test_uniform_mean_network() {
    let mut network = Network::uniform(&[2, 3, 1], 1.0, 0.0).unwrap();
    assert_eq!(network.evaluate(&[1.0, 1.0]).unwrap(), vec![1.0]);
}

#[test]
fn test_wrong_input_count_is_rejected() {
    let mut network = Network::uniform(&[2, 3, 1], 1.0, 0.0).unwrap();
    assert_eq!(
        network.evaluate(&[1.0, 1.0, 1.0]).unwrap_err(),
        NetworkError::ShapeMismatch {
            expected: 2,
            actual: 3
        }
    );
    // The failed call leaves nothing behind
    assert_eq!(network.evaluate(&[1.0, 1.0]).unwrap(), vec![1.0]);
}

#[test]
fn test_evaluation_is_bit_for_bit_repeatable() {
    let mut rng = seeded(2);
    let mut network = Network::new(&[4, 6, 5, 3], &mut rng).unwrap();
    let inputs = [0.25, -0.5, 1.0, 0.0];

    let first = output_bits(&mut network, &inputs);
    for _ in 0..25 {
        assert_eq!(output_bits(&mut network, &inputs), first);
    }
}

#[test]
fn test_activation_is_configurable() {
    let mut network = Network::uniform(&[1, 1], 1.0, 0.0)
        .unwrap()
        .with_activation(Activation::Identity);
    assert_eq!(network.evaluate(&[3.0]).unwrap(), vec![3.0]);

    network.set_activation(Activation::Tanh);
    let out = network.evaluate(&[3.0]).unwrap()[0];
    assert!(out > 0.0 && out < 1.0);
}

// ============================================================================
// Copying & Compatibility
// ============================================================================

#[test]
fn test_compatibility_relation() {
    let mut rng = seeded(3);
    let shapes = [vec![2, 3, 1], vec![2, 3, 1], vec![2, 2, 1], vec![2, 3, 3, 1]];
    let networks: Vec<Network> = shapes
        .iter()
        .map(|h| Network::new(h, &mut rng).unwrap())
        .collect();

    for a in &networks {
        assert!(a.is_compatible_with(a));
        for b in &networks {
            assert_eq!(a.is_compatible_with(b), b.is_compatible_with(a));
            assert_eq!(a.is_compatible_with(b), a.layer_heights() == b.layer_heights());
        }
    }
}

#[test]
fn test_copy_network_then_evaluate_identically() {
    let mut rng = seeded(4);
    let mut target = Network::new(&[2, 2], &mut rng).unwrap();
    let mut source = Network::new(&[3, 7, 4, 2], &mut rng).unwrap();
    source
        .add_node_to_layer(2, WeightInit::Random, &mut rng)
        .unwrap();

    target.copy_network_from(&source);

    assert!(target.is_compatible_with(&source));
    for inputs in [[0.0, 0.0, 0.0], [1.0, -1.0, 0.5], [0.3, 0.3, 0.9]] {
        assert_eq!(output_bits(&mut target, &inputs), output_bits(&mut source, &inputs));
    }
}

#[test]
fn test_copy_connections_then_evaluate_identically() {
    let mut rng = seeded(5);
    let mut a = Network::new(&[3, 4, 2], &mut rng).unwrap();
    let mut b = Network::new(&[3, 4, 2], &mut rng).unwrap();

    a.copy_connections_from(&b).unwrap();

    // Biases are all zero in fresh networks, so weights decide everything
    assert_eq!(output_bits(&mut a, &[0.1, 0.2, 0.3]), output_bits(&mut b, &[0.1, 0.2, 0.3]));
}

// ============================================================================
// Repair
// ============================================================================

#[test]
fn test_refresh_twice_equals_once() {
    let mut rng = seeded(6);
    let mut network = Network::new(&[3, 4, 4, 2], &mut rng).unwrap();
    network.add_layer(2, 2, false, WeightInit::Random, &mut rng).unwrap();
    network.add_node_to_layer(1, WeightInit::Random, &mut rng).unwrap();

    network.refresh_connections();
    let once = network.clone();
    network.refresh_connections();

    assert_eq!(network.layers(), once.layers());
}

#[test]
fn test_refresh_connects_every_adjacent_pair() {
    let mut rng = seeded(7);
    let mut network = Network::new(&[2, 3, 1], &mut rng).unwrap();

    network.refresh_connections();

    for i in 0..network.layer_count() - 1 {
        let next: Vec<NodeId> = network.layers()[i + 1].ids().collect();
        for node in network.layers()[i].iter() {
            let targets: Vec<NodeId> = node.connections().iter().map(|c| c.target).collect();
            assert_eq!(targets, next);
        }
    }
}

// ============================================================================
// Topology Surgery
// ============================================================================

#[test]
fn test_node_round_trip_restores_count() {
    let mut rng = seeded(8);
    let mut network = Network::new(&[3, 4, 2], &mut rng).unwrap();
    let count = network.node_count();

    network.add_node_to_layer(1, WeightInit::Random, &mut rng).unwrap();
    assert_eq!(network.node_count(), count + 1);
    network.remove_node_from_layer(1).unwrap();
    assert_eq!(network.node_count(), count);

    // The other direction loses the removed node's learned weights
    let before = network.clone();
    network.remove_node_from_layer(1).unwrap();
    network.add_node_to_layer(1, WeightInit::fixed(0.0, 0.0), &mut rng).unwrap();
    assert_eq!(network.node_count(), count);
    assert_ne!(network.layers(), before.layers());
}

#[test]
fn test_inherited_layer_keeps_weight_multiset() {
    let mut rng = seeded(9);
    let mut network = Network::new(&[4, 4, 3], &mut rng).unwrap();
    let spliced = sorted_layer_weights(&network, 1);

    network.add_layer(2, 4, false, WeightInit::Random, &mut rng).unwrap();

    assert_eq!(sorted_layer_weights(&network, 2), spliced);
}

#[test]
fn test_layer_edits_keep_ids_unique() {
    let mut rng = seeded(10);
    let mut network = Network::new(&[2, 3, 1], &mut rng).unwrap();

    network.add_layer(1, 2, true, WeightInit::Random, &mut rng).unwrap();
    network.add_node_to_layer(2, WeightInit::Random, &mut rng).unwrap();
    network.remove_layer(1, true, &mut rng).unwrap();
    network.add_layer(2, 5, false, WeightInit::Random, &mut rng).unwrap();

    let mut ids: Vec<NodeId> = network.layers().iter().flat_map(|l| l.ids()).collect();
    let total = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), total);
    assert!(ids.iter().all(|id| *id < network.next_node_id()));
}

#[test]
fn test_remove_layer_with_replace_draws_new_weights() {
    let mut rng = seeded(19);
    let mut network = Network::new(&[3, 3, 3, 2], &mut rng).unwrap();
    let bridged = sorted_layer_weights(&network, 2);
    let mut inherited = network.clone();

    inherited.remove_layer(2, false, &mut rng).unwrap();
    network.remove_layer(2, true, &mut rng).unwrap();

    assert_eq!(sorted_layer_weights(&inherited, 1), bridged);
    let replaced = sorted_layer_weights(&network, 1);
    assert_eq!(replaced.len(), bridged.len());
    assert_ne!(replaced, bridged);
    assert!(replaced.iter().all(|w| (-1.0..=1.0).contains(w)));

    let outputs: Vec<NodeId> = network.layers()[2].ids().collect();
    for node in network.layers()[1].iter() {
        let targets: Vec<NodeId> = node.connections().iter().map(|c| c.target).collect();
        assert_eq!(targets, outputs);
    }
}

// ============================================================================
// Mutation
// ============================================================================

#[test]
fn test_zero_probability_mutation_is_noop() {
    let mut rng = seeded(11);
    let mut network = Network::new(&[3, 5, 2], &mut rng).unwrap();
    let before = network.clone();
    let config = MutationConfig {
        mutation_prob: 0.0,
        new_node_prob: 0.0,
        new_layer_prob: 0.0,
        random_weights: true,
        perturbation_scale: 1.0,
    };

    for _ in 0..10 {
        let report = network.mutate_asexual(&config, &mut rng);
        assert!(!report.has_topology_changes());
        assert_eq!(report.weights_mutated, 0);
    }
    assert_eq!(network.layers(), before.layers());
}

#[test]
fn test_mutation_keeps_weights_bounded() {
    let mut rng = seeded(12);
    let mut network = Network::new(&[3, 5, 2], &mut rng).unwrap();
    let config = MutationConfig {
        mutation_prob: 1.0,
        perturbation_scale: 3.0,
        ..MutationConfig::default()
    };

    for _ in 0..20 {
        network.mutate_asexual(&config, &mut rng);
    }

    for layer in network.layers() {
        for node in layer {
            assert!(node.connections().iter().all(|c| (-1.0..=1.0).contains(&c.weight)));
        }
    }
    assert!(network.evaluate(&[0.5, 0.5, 0.5]).is_ok());
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_saved_network_evaluates_the_same() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("network.ron");
    let mut rng = seeded(13);
    let mut network = Network::new(&[3, 4, 1], &mut rng).unwrap();
    network.mutate_asexual(
        &MutationConfig {
            mutation_prob: 0.5,
            new_layer_prob: 1.0,
            ..MutationConfig::default()
        },
        &mut rng,
    );

    save_network(&path, &network).unwrap();
    let mut loaded = load_network(&path).unwrap();

    assert_eq!(loaded.layers(), network.layers());
    assert_eq!(output_bits(&mut loaded, &[0.2, 0.4, 0.6]), output_bits(&mut network, &[0.2, 0.4, 0.6]));
}

// ============================================================================
// Training & Network Sets
// ============================================================================

#[test]
fn test_trainer_runs_generations() {
    let mut rng = seeded(14);
    let specs = vec![
        InputSpec::new("coastal", InputMode::BoolOn, InputPriority::High),
        InputSpec::new("crowded", InputMode::BoolOff, InputPriority::Low),
        InputSpec::new("gold", InputMode::ScaleTop, InputPriority::Moderate).with_range(0.0, 100.0),
    ];
    let config = TrainingConfig {
        rounds_per_generation: 10,
        hidden_layers: vec![4],
        ..TrainingConfig::default()
    };
    let mut trainer = TargetTrainer::new(specs, 6, config, &mut rng).unwrap();

    let history: Vec<GenerationStats> = (0..5)
        .map(|_| trainer.train_generation(&mut rng).unwrap())
        .collect();

    assert_eq!(trainer.generation(), 5);
    assert_eq!(
        history.iter().map(|s| s.generation).collect::<Vec<_>>(),
        vec![1, 2, 3, 4, 5]
    );
    let last = history.last().unwrap();
    assert_eq!(trainer.best_network().input_count(), 3);
    assert!(last.best_win_rate > 0.0);
}

#[test]
fn test_network_set_mirrors_other_player() {
    let mut rng = seeded(15);
    let mut ours = NetworkSet::new();
    let mut theirs = NetworkSet::new();
    for (name, heights) in [("expansion", [3, 3, 1]), ("threat", [2, 4, 1])] {
        ours.insert(name, Network::new(&heights, &mut rng).unwrap());
        theirs.insert(name, Network::new(&heights, &mut rng).unwrap());
    }

    ours.copy_connections_from(&theirs).unwrap();
    let a = ours.evaluate("threat", &[0.1, 0.9]).unwrap();
    let b = theirs.evaluate("threat", &[0.1, 0.9]).unwrap();
    assert_eq!(a, b);
}
