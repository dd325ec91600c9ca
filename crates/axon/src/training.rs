//! Target training: evolve a population toward a hand-written scoring rule
//!
//! Every input of the networks is described by an [`InputSpec`] saying how to
//! draw a value and how many points it is worth. A network "wins" a round when
//! its output, scaled to the maximum score, lands closest to the true score of
//! the drawn data. After a generation of rounds the network with the highest
//! win rate is copied over every other network, which are then mutated.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::NetworkError;
use crate::mutation::MutationConfig;
use crate::network::Network;
use crate::rng::MutationRng;

/// How a value for one input is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputMode {
    /// Flag that scores when it is off (0)
    BoolOff,
    /// Flag that scores when it is on (1)
    BoolOn,
    /// Scaled value, high is good
    ScaleTop,
    /// Scaled value, low is good
    ScaleBot,
}

impl InputMode {
    pub fn is_bool(&self) -> bool {
        matches!(self, Self::BoolOff | Self::BoolOn)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputPriority {
    Low,
    Moderate,
    High,
}

impl InputPriority {
    pub fn weight(&self) -> f32 {
        match self {
            Self::Low => 1.0,
            Self::Moderate => 2.0,
            Self::High => 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
    pub name: String,
    /// Range scaled values are drawn from; unused by bool modes
    #[serde(default = "default_value_range")]
    pub value_range: (f32, f32),
    pub mode: InputMode,
    pub priority: InputPriority,
}

fn default_value_range() -> (f32, f32) {
    (0.0, 1.0)
}

impl InputSpec {
    pub fn new(name: impl Into<String>, mode: InputMode, priority: InputPriority) -> Self {
        Self {
            name: name.into(),
            value_range: default_value_range(),
            mode,
            priority,
        }
    }

    pub fn with_range(mut self, low: f32, high: f32) -> Self {
        self.value_range = (low, high);
        self
    }

    /// Draw a network-ready value. Bool modes give 0 or 1 with equal odds,
    /// scale modes a uniform draw from the range mapped onto [-1, 1].
    pub fn sample<R: MutationRng + ?Sized>(&self, rng: &mut R) -> f32 {
        match self.mode {
            InputMode::BoolOn => {
                if rng.coin_flip() {
                    1.0
                } else {
                    0.0
                }
            }
            InputMode::BoolOff => {
                if rng.coin_flip() {
                    0.0
                } else {
                    1.0
                }
            }
            InputMode::ScaleTop | InputMode::ScaleBot => {
                let (low, high) = self.value_range;
                let span = high - low;
                if span == 0.0 {
                    return 0.0;
                }
                let value = low + rng.gen_f32() * span;
                (value - low) / span * 2.0 - 1.0
            }
        }
    }

    /// Points `value` is worth; negative for `ScaleBot`
    pub fn score(&self, value: f32) -> f32 {
        let sign = if self.mode == InputMode::ScaleBot { -1.0 } else { 1.0 };
        value * sign * self.priority.weight()
    }
}

/// Highest score a data set can reach
pub fn max_score(specs: &[InputSpec]) -> f32 {
    specs.iter().map(|s| s.priority.weight()).sum()
}

/// Sum of the per-input scores of one data set
pub fn data_score(specs: &[InputSpec], data: &[f32]) -> f32 {
    specs.iter().zip(data).map(|(s, &v)| s.score(v)).sum()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub rounds_per_generation: usize,
    pub mutation: MutationConfig,
    /// Draw a new data set every round instead of reusing one
    pub use_random_data: bool,
    /// Heights of the hidden layers between the inputs and the single output
    pub hidden_layers: Vec<usize>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            rounds_per_generation: 32,
            mutation: MutationConfig::default(),
            use_random_data: true,
            hidden_layers: vec![4],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrainingError {
    #[error("population must hold at least one network")]
    EmptyPopulation,

    #[error("at least one input is required")]
    NoInputs,

    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// Bookkeeping of one finished generation
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationStats {
    pub generation: u64,
    pub best_index: usize,
    pub best_win_rate: f32,
    pub win_rates: Vec<f32>,
    /// Structural changes of the mutated networks, e.g. `[2:(N1)]`
    pub mutation_log: String,
}

pub struct TargetTrainer {
    specs: Vec<InputSpec>,
    networks: Vec<Network>,
    config: TrainingConfig,
    max_score: f32,
    data_set: Option<Vec<f32>>,
    generation: u64,
    best: usize,
}

impl TargetTrainer {
    /// Build `population_size` random networks shaped
    /// `[specs.len(), config.hidden_layers..., 1]`
    pub fn new<R: MutationRng + ?Sized>(
        specs: Vec<InputSpec>,
        population_size: usize,
        config: TrainingConfig,
        rng: &mut R,
    ) -> Result<Self, TrainingError> {
        if specs.is_empty() {
            return Err(TrainingError::NoInputs);
        }
        if population_size == 0 {
            return Err(TrainingError::EmptyPopulation);
        }

        let mut heights = Vec::with_capacity(config.hidden_layers.len() + 2);
        heights.push(specs.len());
        heights.extend_from_slice(&config.hidden_layers);
        heights.push(1);

        let networks = (0..population_size)
            .map(|_| Network::new(&heights, rng))
            .collect::<Result<Vec<_>, _>>()?;

        log::info!(
            "Target trainer: {} networks shaped {:?}, max score {}",
            population_size,
            heights,
            max_score(&specs)
        );

        Ok(Self {
            max_score: max_score(&specs),
            specs,
            networks,
            config,
            data_set: None,
            generation: 0,
            best: 0,
        })
    }

    pub fn specs(&self) -> &[InputSpec] {
        &self.specs
    }

    pub fn networks(&self) -> &[Network] {
        &self.networks
    }

    pub fn max_score(&self) -> f32 {
        self.max_score
    }

    /// Number of finished generations
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Winner of the last generation (the first network before any training)
    pub fn best_network(&self) -> &Network {
        &self.networks[self.best]
    }

    /// Force a new data set on the next round when data is reused
    pub fn regenerate_data_set(&mut self) {
        self.data_set = None;
    }

    fn draw_data<R: MutationRng + ?Sized>(&self, rng: &mut R) -> Vec<f32> {
        self.specs.iter().map(|s| s.sample(rng)).collect()
    }

    /// Evaluate every network on one data set and return the index of the
    /// network whose scaled output is closest to the data's score
    pub fn evaluate_round<R: MutationRng + ?Sized>(&mut self, rng: &mut R) -> Result<usize, TrainingError> {
        let data = match (&self.data_set, self.config.use_random_data) {
            (Some(data), false) => data.clone(),
            _ => {
                let data = self.draw_data(rng);
                self.data_set = Some(data.clone());
                data
            }
        };
        let target = data_score(&self.specs, &data);

        let mut winner = 0;
        let mut best_distance = f32::MAX;
        for (i, network) in self.networks.iter_mut().enumerate() {
            let output = network.evaluate(&data)?;
            let distance = (output[0] * self.max_score - target).abs();
            if distance < best_distance {
                best_distance = distance;
                winner = i;
            }
        }
        Ok(winner)
    }

    /// Run one generation: play the rounds, keep the network with the best
    /// win rate, and replace every other network by a mutated copy of it
    pub fn train_generation<R: MutationRng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<GenerationStats, TrainingError> {
        let rounds = self.config.rounds_per_generation.max(1);
        let mut win_rates = vec![0.0f32; self.networks.len()];
        for _ in 0..rounds {
            let winner = self.evaluate_round(rng)?;
            win_rates[winner] += 1.0;
        }
        for rate in &mut win_rates {
            *rate /= rounds as f32;
        }

        let mut best = 0;
        let mut best_rate = 0.0;
        for (i, &rate) in win_rates.iter().enumerate() {
            if rate > best_rate {
                best = i;
                best_rate = rate;
            }
        }

        let champion = self.networks[best].clone();
        let mut mutation_log = String::new();
        for (i, network) in self.networks.iter_mut().enumerate() {
            if i == best {
                continue;
            }
            if let Err(e) = network.copy_connections_from(&champion) {
                log::warn!("network {i}: {e}, replicating champion instead");
                network.copy_network_from(&champion);
            }
            let report = network.mutate_asexual(&self.config.mutation, rng);
            if report.has_topology_changes() {
                mutation_log.push_str(&format!("[{i}:{report}]"));
            }
        }

        self.best = best;
        self.generation += 1;
        log::info!(
            "Generation {}: network {} won {:.1}% {}",
            self.generation,
            best,
            best_rate * 100.0,
            mutation_log
        );

        Ok(GenerationStats {
            generation: self.generation,
            best_index: best,
            best_win_rate: best_rate,
            win_rates,
            mutation_log,
        })
    }
}
