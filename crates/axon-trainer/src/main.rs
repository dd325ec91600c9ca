//! Headless target training for axon networks

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use axon::{load_network, save_network, Network, TargetTrainer};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::config::TrainerConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (defaults to ./trainer.ron when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of generations to train
    #[arg(long, default_value = "100")]
    generations: u64,

    /// Population size, overrides the config file
    #[arg(long)]
    population: Option<usize>,

    /// RNG seed for a reproducible run (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Where to write the best network, overrides the config file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print the shape of a saved network and exit
    #[arg(long)]
    inspect: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if let Some(path) = &args.inspect {
        let network = load_network(path)
            .with_context(|| format!("Failed to load network: {}", path.display()))?;
        print_network(&network);
        return Ok(());
    }

    let mut config = TrainerConfig::load(args.config.as_deref())?;
    if let Some(size) = args.population {
        config.population.size = size;
    }
    if let Some(output) = args.output {
        config.output.path = output;
    }

    let seed = args.seed.unwrap_or_else(rand::random);
    log::info!("Starting target training (seed {seed})");
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

    let mut trainer = TargetTrainer::new(
        config.inputs.clone(),
        config.population.size,
        config.training.clone(),
        &mut rng,
    )
    .context("Failed to set up trainer")?;

    run(&mut trainer, &config, args.generations, &mut rng)?;

    save_network(&config.output.path, trainer.best_network()).with_context(|| {
        format!(
            "Failed to write best network: {}",
            config.output.path.display()
        )
    })?;

    Ok(())
}

fn progress_style() -> Result<ProgressStyle> {
    Ok(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        .context("Invalid progress bar template")?
        .progress_chars("█▓░"))
}

fn run(
    trainer: &mut TargetTrainer,
    config: &TrainerConfig,
    generations: u64,
    rng: &mut Xoshiro256PlusPlus,
) -> Result<()> {
    let pb = ProgressBar::new(generations);
    pb.set_style(progress_style()?);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    pb.println(format!(
        "Training {} networks on {} inputs for {} generations",
        trainer.networks().len(),
        trainer.specs().len(),
        generations
    ));

    let interval = config.output.report_interval.max(1);
    for _ in 0..generations {
        let stats = trainer
            .train_generation(rng)
            .with_context(|| format!("Generation {} failed", trainer.generation() + 1))?;

        pb.set_message(format!("best {:.0}%", stats.best_win_rate * 100.0));
        if stats.generation % interval == 0 {
            pb.println(format!(
                "Gen {:4}: network {} won {:.1}% | {} {}",
                stats.generation,
                stats.best_index,
                stats.best_win_rate * 100.0,
                trainer.best_network().summary(),
                stats.mutation_log
            ));
        }
        pb.inc(1);
    }

    pb.finish_with_message("Training complete!");
    Ok(())
}

fn print_network(network: &Network) {
    println!("{}", network.summary());
    println!("activation: {:?}", network.activation());
    for (i, layer) in network.layers().iter().enumerate() {
        let biases: Vec<String> = layer.iter().map(|n| format!("{:.3}", n.bias)).collect();
        println!(
            "layer {i}: {} nodes, {} connections, biases [{}]",
            layer.len(),
            layer.connection_count(),
            biases.join(", ")
        );
    }
}
