//! Layered neural networks evolved by mutation for strategy game AI
//!
//! This crate implements:
//! - A strictly feed-forward node/connection network with mean-of-inputs evaluation
//! - Weight copying between compatible networks and asexual mutation
//! - Topology surgery: adding/removing nodes and whole layers while keeping learned weights
//! - A target-training driver that selects a winning network and replicates it
//! - Snapshots of the full topology for persistence

pub mod activation;
pub mod connection;
pub mod error;
pub mod layer;
pub mod mutation;
pub mod network;
pub mod network_set;
pub mod node;
pub mod persistence;
pub mod rng;
pub mod snapshot;
pub mod topology;
pub mod training;

// Re-export main types for convenience
pub use activation::Activation;
pub use connection::{Connection, NodeId};
pub use error::NetworkError;
pub use layer::Layer;
pub use mutation::{MutationConfig, MutationReport, TopologyChange};
pub use network::{Network, NetworkSummary};
pub use network_set::{NetworkSet, NetworkSetError};
pub use node::Node;
pub use persistence::{load_network, save_network, PersistenceError};
pub use rng::MutationRng;
pub use snapshot::{NetworkSnapshot, SnapshotError};
pub use topology::WeightInit;
pub use training::{
    GenerationStats, InputMode, InputPriority, InputSpec, TargetTrainer, TrainingConfig, TrainingError,
};
