use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Plus petite somme possible de six boules rouges distinctes (1+2+...+6).
pub const MIN_RED_SUM: u32 = 21;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draw {
    /// Always sorted ascending.
    pub red: [u8; 6],
    pub blue: u8,
}

impl Draw {
    pub fn new(mut red: [u8; 6], blue: u8) -> Result<Self> {
        validate_draw(&red, blue)?;
        red.sort_unstable();
        Ok(Draw { red, blue })
    }

    /// Build a draw from a history row: six red values followed by the blue one.
    pub fn from_row(row: &[i64]) -> Result<Self> {
        if row.len() != 7 {
            bail!("Ligne de {} valeurs, 7 attendues", row.len());
        }
        let mut values = [0u8; 7];
        for (slot, &v) in values.iter_mut().zip(row) {
            *slot = u8::try_from(v).with_context(|| format!("Valeur {} hors limites", v))?;
        }
        let red = [values[0], values[1], values[2], values[3], values[4], values[5]];
        Draw::new(red, values[6])
    }

    pub fn red_sum(&self) -> u32 {
        self.red.iter().map(|&r| r as u32).sum()
    }

    pub fn numbers(&self) -> [u8; 7] {
        let r = self.red;
        [r[0], r[1], r[2], r[3], r[4], r[5], self.blue]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BallKind {
    Red,
    Blue,
}

impl BallKind {
    pub fn max(&self) -> u8 {
        match self {
            BallKind::Red => 33,
            BallKind::Blue => 16,
        }
    }

    pub fn pick_count(&self) -> usize {
        match self {
            BallKind::Red => 6,
            BallKind::Blue => 1,
        }
    }

    pub fn numbers_from<'a>(&self, draw: &'a Draw) -> &'a [u8] {
        match self {
            BallKind::Red => &draw.red,
            BallKind::Blue => std::slice::from_ref(&draw.blue),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionSource {
    Learned,
    Randomized,
    /// Entrées migrées d'un ancien format, origine inconnue.
    #[default]
    Unknown,
}

impl std::fmt::Display for PredictionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PredictionSource::Learned => write!(f, "réseau"),
            PredictionSource::Randomized => write!(f, "aléatoire"),
            PredictionSource::Unknown => write!(f, "?"),
        }
    }
}

/// A generated draw as it is persisted in the local store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord {
    pub red_balls: [u8; 6],
    pub blue_ball: u8,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub source: PredictionSource,
}

impl PredictionRecord {
    pub fn new(draw: Draw, source: PredictionSource, timestamp: DateTime<Utc>) -> Self {
        PredictionRecord {
            red_balls: draw.red,
            blue_ball: draw.blue,
            timestamp,
            source,
        }
    }

    pub fn red_sum(&self) -> u32 {
        self.red_balls.iter().map(|&r| r as u32).sum()
    }
}

pub fn validate_draw(red: &[u8; 6], blue: u8) -> Result<()> {
    for &r in red {
        if r < 1 || r > BallKind::Red.max() {
            bail!("Boule rouge {} hors limites (1-33)", r);
        }
    }
    if blue < 1 || blue > BallKind::Blue.max() {
        bail!("Boule bleue {} hors limites (1-16)", blue);
    }
    for i in 0..red.len() {
        for j in (i + 1)..red.len() {
            if red[i] == red[j] {
                bail!("Boule rouge en double : {}", red[i]);
            }
        }
    }
    Ok(())
}
