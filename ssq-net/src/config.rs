use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::encoding::Normalizer;

/// Hyper-parameters of the feed-forward predictor. Missing fields in a JSON
/// config file take their default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    pub hidden_layers: Vec<usize>,
    pub iterations: usize,
    pub error_thresh: f64,
    pub learning_rate: f64,
    pub momentum: f64,
    /// Log the training error every `log_period` iterations (0 = never).
    pub log_period: usize,
    pub red_divisor: f64,
    pub blue_divisor: f64,
    pub seed: Option<u64>,
}

impl Default for NetConfig {
    fn default() -> Self {
        let normalizer = Normalizer::default();
        Self {
            hidden_layers: vec![14, 14],
            iterations: 2000,
            error_thresh: 0.005,
            learning_rate: 0.3,
            momentum: 0.1,
            log_period: 100,
            red_divisor: normalizer.red_divisor,
            blue_divisor: normalizer.blue_divisor,
            seed: None,
        }
    }
}

impl NetConfig {
    pub fn normalizer(&self) -> Normalizer {
        Normalizer {
            red_divisor: self.red_divisor,
            blue_divisor: self.blue_divisor,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.hidden_layers.iter().any(|&n| n == 0) {
            bail!("Couche cachée vide dans {:?}", self.hidden_layers);
        }
        if !(self.learning_rate > 0.0) {
            bail!("learning_rate doit être positif ({})", self.learning_rate);
        }
        if !(0.0..1.0).contains(&self.momentum) {
            bail!("momentum hors de [0, 1) ({})", self.momentum);
        }
        if !(self.red_divisor > 0.0 && self.blue_divisor > 0.0) {
            bail!(
                "Diviseurs de normalisation invalides ({}, {})",
                self.red_divisor,
                self.blue_divisor
            );
        }
        Ok(())
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.red_divisor = normalizer.red_divisor;
        self.blue_divisor = normalizer.blue_divisor;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub examples: usize,
    pub iterations: usize,
    pub initial_error: f64,
    pub error: f64,
    pub converged: bool,
    pub train_time_ms: u64,
}
