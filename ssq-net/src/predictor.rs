use std::collections::BTreeSet;

use rand::{Rng, RngExt};

use ssq_db::models::{BallKind, Draw, PredictionSource};

use crate::config::{NetConfig, TrainingReport};
use crate::training::{prepare_training_data, train, TrainedNet};

/// A generated draw, tagged with how it was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prediction {
    Learned(Draw),
    Randomized(Draw),
}

impl Prediction {
    pub fn draw(&self) -> &Draw {
        match self {
            Prediction::Learned(d) | Prediction::Randomized(d) => d,
        }
    }

    pub fn source(&self) -> PredictionSource {
        match self {
            Prediction::Learned(_) => PredictionSource::Learned,
            Prediction::Randomized(_) => PredictionSource::Randomized,
        }
    }

    pub fn is_learned(&self) -> bool {
        matches!(self, Prediction::Learned(_))
    }
}

#[derive(Debug, Clone, Default)]
pub enum PredictorPhase {
    #[default]
    Uninitialized,
    Loading,
    /// `None` when there was not enough history to train on.
    Ready(Option<TrainedNet>),
}

/// Owns the trained model for the lifetime of the process. Any call made
/// before a model is ready falls back to uniform random draws.
#[derive(Debug, Default)]
pub struct Predictor {
    phase: PredictorPhase,
    report: Option<TrainingReport>,
}

impl Predictor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(net: TrainedNet) -> Self {
        Predictor {
            phase: PredictorPhase::Ready(Some(net)),
            report: None,
        }
    }

    pub fn phase(&self) -> &PredictorPhase {
        &self.phase
    }

    pub fn report(&self) -> Option<&TrainingReport> {
        self.report.as_ref()
    }

    pub fn has_model(&self) -> bool {
        matches!(self.phase, PredictorPhase::Ready(Some(_)))
    }

    pub fn begin_loading(&mut self) {
        self.phase = PredictorPhase::Loading;
    }

    pub fn finish(&mut self, model: Option<TrainedNet>) {
        self.phase = PredictorPhase::Ready(model);
    }

    /// Run the whole loading sequence on `history` (oldest first).
    pub fn initialize(&mut self, history: &[Draw], config: &NetConfig) -> Option<&TrainingReport> {
        self.begin_loading();

        let examples = prepare_training_data(history, &config.normalizer());
        match train(&examples, config) {
            Some((net, report)) => {
                self.report = Some(report);
                self.finish(Some(net));
            }
            None => {
                log::info!(
                    "{} tirage(s) d'historique : pas d'exemple d'entraînement, mode aléatoire",
                    history.len()
                );
                self.report = None;
                self.finish(None);
            }
        }
        self.report.as_ref()
    }

    pub fn predict(&self, input: &Draw, rng: &mut impl Rng) -> Prediction {
        match &self.phase {
            PredictorPhase::Ready(Some(net)) => Prediction::Learned(net.predict(input, rng)),
            _ => Prediction::Randomized(random_draw(rng)),
        }
    }
}

/// Add uniform random red values until six distinct ones are present.
pub(crate) fn fill_red(red: &mut BTreeSet<u8>, rng: &mut impl Rng) {
    let max = BallKind::Red.max();
    while red.len() < BallKind::Red.pick_count() {
        red.insert(rng.random_range(1..=max));
    }
}

/// Six distinct red values in [1,33] and a blue value in [1,16], all uniform.
pub fn random_draw(rng: &mut impl Rng) -> Draw {
    let mut red = BTreeSet::new();
    fill_red(&mut red, rng);

    let mut red_arr = [0u8; 6];
    for (slot, &r) in red_arr.iter_mut().zip(red.iter()) {
        *slot = r;
    }
    let blue = rng.random_range(1..=BallKind::Blue.max());

    Draw {
        red: red_arr,
        blue,
    }
}
