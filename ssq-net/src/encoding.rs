use ndarray::Array1;
use serde::{Deserialize, Serialize};

use ssq_db::models::{BallKind, Draw};

pub const DRAW_DIM: usize = 7;

/// Linear scaling of a draw into the unit interval.
///
/// The default divides the blue ball by 33 like the red ones, while
/// [`denormalize`] scales it back by 16. A blue value therefore does not
/// round-trip; [`Normalizer::consistent`] uses 33 / 16 instead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalizer {
    pub red_divisor: f64,
    pub blue_divisor: f64,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            red_divisor: BallKind::Red.max() as f64,
            blue_divisor: BallKind::Red.max() as f64,
        }
    }
}

impl Normalizer {
    pub fn consistent() -> Self {
        Self {
            red_divisor: BallKind::Red.max() as f64,
            blue_divisor: BallKind::Blue.max() as f64,
        }
    }

    /// [r1/rd, ..., r6/rd, blue/bd]
    pub fn normalize(&self, draw: &Draw) -> Array1<f64> {
        let mut v = Array1::zeros(DRAW_DIM);
        for (i, &r) in draw.red.iter().enumerate() {
            v[i] = r as f64 / self.red_divisor;
        }
        v[6] = draw.blue as f64 / self.blue_divisor;
        v
    }
}

/// Scale a unit value back to a ball number, rounded and clamped to [1, max].
pub fn denormalize(value: f64, kind: BallKind) -> u8 {
    let max = kind.max() as f64;
    let scaled = (value * max).round();
    if scaled.is_nan() {
        return 1;
    }
    scaled.clamp(1.0, max) as u8
}
