//! Trainer configuration with layered loading
//!
//! Configuration is loaded from multiple sources (lowest to highest priority):
//! 1. Compiled defaults
//! 2. `trainer.ron` in the working directory (if exists), or the file given with `--config`
//! 3. Environment variables prefixed with `AXON_`
//!
//! Example environment variable: `AXON_TRAINING__MUTATION__NEW_LAYER_PROB=0.05`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use axon::{InputMode, InputPriority, InputSpec, TrainingConfig};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    #[serde(default)]
    pub population: PopulationConfig,

    #[serde(default)]
    pub training: TrainingConfig,

    /// One entry per network input, in input order
    #[serde(default = "default_inputs")]
    pub inputs: Vec<InputSpec>,

    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            population: PopulationConfig::default(),
            training: TrainingConfig::default(),
            inputs: default_inputs(),
            output: OutputConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Networks competing each generation
    pub size: usize,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self { size: 8 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Where the best network is written after training
    pub path: PathBuf,
    /// Print a generation summary every N generations
    pub report_interval: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("best_network.ron"),
            report_interval: 10,
        }
    }
}

/// Expansion-site evaluation used when no inputs are configured
fn default_inputs() -> Vec<InputSpec> {
    vec![
        InputSpec::new("near_resources", InputMode::BoolOn, InputPriority::High),
        InputSpec::new("contested", InputMode::BoolOff, InputPriority::Moderate),
        InputSpec::new("tile_yield", InputMode::ScaleTop, InputPriority::Moderate).with_range(0.0, 10.0),
        InputSpec::new("distance_to_capital", InputMode::ScaleBot, InputPriority::Low)
            .with_range(1.0, 30.0),
    ]
}

impl TrainerConfig {
    /// Load configuration from defaults, config file, and environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = TrainingConfig::default();
        let mutation = &defaults.mutation;
        let output = OutputConfig::default();

        let file = match path {
            Some(path) => File::from(path).format(FileFormat::Ron).required(true),
            None => File::with_name("trainer").format(FileFormat::Ron).required(false),
        };

        let builder = Config::builder()
            // Layer 1: Compiled defaults
            .set_default("population.size", PopulationConfig::default().size as i64)?
            .set_default(
                "training.rounds_per_generation",
                defaults.rounds_per_generation as i64,
            )?
            .set_default("training.use_random_data", defaults.use_random_data)?
            .set_default(
                "training.hidden_layers",
                defaults
                    .hidden_layers
                    .iter()
                    .map(|&h| h as i64)
                    .collect::<Vec<_>>(),
            )?
            .set_default("training.mutation.mutation_prob", mutation.mutation_prob as f64)?
            .set_default("training.mutation.new_node_prob", mutation.new_node_prob as f64)?
            .set_default("training.mutation.new_layer_prob", mutation.new_layer_prob as f64)?
            .set_default("training.mutation.random_weights", mutation.random_weights)?
            .set_default(
                "training.mutation.perturbation_scale",
                mutation.perturbation_scale as f64,
            )?
            .set_default("output.path", output.path.to_string_lossy().into_owned())?
            .set_default("output.report_interval", output.report_interval as i64)?
            // Layer 2: Config file
            .add_source(file)
            // Layer 3: Environment variables (AXON_POPULATION__SIZE, etc.)
            .add_source(
                Environment::with_prefix("AXON")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
