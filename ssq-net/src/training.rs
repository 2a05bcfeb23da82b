use std::collections::BTreeSet;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ssq_db::models::{BallKind, Draw};

use crate::config::{NetConfig, TrainingReport};
use crate::encoding::{denormalize, Normalizer, DRAW_DIM};
use crate::network::Network;
use crate::predictor::fill_red;

#[derive(Debug, Clone)]
pub struct TrainingExample {
    pub input: Array1<f64>,
    pub output: Array1<f64>,
}

/// A trained network together with the scaling it was trained with.
#[derive(Debug, Clone)]
pub struct TrainedNet {
    network: Network,
    normalizer: Normalizer,
}

/// One example per pair of consecutive draws: draw[i] predicts draw[i+1].
/// Draws are expected oldest first.
pub fn prepare_training_data(draws: &[Draw], normalizer: &Normalizer) -> Vec<TrainingExample> {
    draws
        .windows(2)
        .map(|pair| TrainingExample {
            input: normalizer.normalize(&pair[0]),
            output: normalizer.normalize(&pair[1]),
        })
        .collect()
}

/// Mean over examples of the per-example mean squared error.
fn mean_error(network: &Network, examples: &[TrainingExample]) -> f64 {
    if examples.is_empty() {
        return 0.0;
    }
    let total: f64 = examples
        .iter()
        .map(|ex| {
            let diff = &ex.output - &network.forward(&ex.input);
            diff.mapv(|d| d * d).mean().unwrap_or(0.0)
        })
        .sum();
    total / examples.len() as f64
}

/// Fit the network until `iterations` passes or until the mean error drops
/// below `error_thresh`. Returns `None` when there is nothing to learn from.
pub fn train(
    examples: &[TrainingExample],
    config: &NetConfig,
) -> Option<(TrainedNet, TrainingReport)> {
    if examples.is_empty() {
        return None;
    }
    let start = Instant::now();

    let mut rng: StdRng = match config.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_rng(&mut rand::rng()),
    };

    let mut sizes = Vec::with_capacity(config.hidden_layers.len() + 2);
    sizes.push(DRAW_DIM);
    sizes.extend(config.hidden_layers.iter().copied());
    sizes.push(DRAW_DIM);
    let mut network = Network::new(&sizes, &mut rng);

    let initial_error = mean_error(&network, examples);
    let mut error = initial_error;
    let mut iterations = 0;
    let mut converged = error < config.error_thresh;

    let pb = ProgressBar::new(config.iterations as u64);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} err={msg}",
    ) {
        pb.set_style(style.progress_chars("=> "));
    }

    while !converged && iterations < config.iterations {
        let mut sum = 0.0;
        for ex in examples {
            sum += network.train_example(&ex.input, &ex.output, config.learning_rate, config.momentum);
        }
        error = sum / examples.len() as f64;
        iterations += 1;

        if config.log_period > 0 && iterations % config.log_period == 0 {
            log::info!("iterations: {iterations}, training error: {error:.6}");
            pb.set_message(format!("{error:.6}"));
        }
        pb.inc(1);
        converged = error < config.error_thresh;
    }
    pb.finish_and_clear();

    log::info!(
        "Entraînement terminé : {} itérations, erreur {:.6} ({} exemples)",
        iterations,
        error,
        examples.len()
    );

    let report = TrainingReport {
        examples: examples.len(),
        iterations,
        initial_error,
        error,
        converged,
        train_time_ms: start.elapsed().as_millis() as u64,
    };
    let trained = TrainedNet {
        network,
        normalizer: config.normalizer(),
    };
    Some((trained, report))
}

impl TrainedNet {
    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn layer_sizes(&self) -> Vec<usize> {
        self.network.layer_sizes()
    }

    /// Predict the draw following `input`. Red values that collide after
    /// rounding are replaced by uniform random ones.
    pub fn predict(&self, input: &Draw, rng: &mut impl Rng) -> Draw {
        let x = self.normalizer.normalize(input);
        let out = self.network.forward(&x);

        let mut red: BTreeSet<u8> = out
            .iter()
            .take(BallKind::Red.pick_count())
            .map(|&v| denormalize(v, BallKind::Red))
            .collect();
        fill_red(&mut red, rng);

        let mut red_arr = [0u8; 6];
        for (slot, &r) in red_arr.iter_mut().zip(red.iter()) {
            *slot = r;
        }
        let blue = denormalize(out[DRAW_DIM - 1], BallKind::Blue);

        Draw {
            red: red_arr,
            blue,
        }
    }
}
