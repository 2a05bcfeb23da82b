use ssq_db::models::{BallKind, PredictionRecord, PredictionSource};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SumRange {
    pub min: u32,
    pub max: u32,
    pub avg: f64,
}

/// Aggregate over every stored prediction. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub total: usize,
    pub learned: usize,
    /// red_counts[n - 1] = occurrences of red ball n.
    pub red_counts: Vec<u32>,
    pub blue_counts: Vec<u32>,
    pub odd: u32,
    pub even: u32,
    pub sum_range: SumRange,
}

impl Stats {
    pub fn zeroed() -> Self {
        Stats {
            total: 0,
            learned: 0,
            red_counts: vec![0; BallKind::Red.max() as usize],
            blue_counts: vec![0; BallKind::Blue.max() as usize],
            odd: 0,
            even: 0,
            sum_range: SumRange::default(),
        }
    }

    fn counts(&self, kind: BallKind) -> &[u32] {
        match kind {
            BallKind::Red => &self.red_counts,
            BallKind::Blue => &self.blue_counts,
        }
    }

    /// The `n` most frequent values, ties broken by the smaller number.
    pub fn hottest(&self, kind: BallKind, n: usize) -> Vec<(u8, u32)> {
        let mut ranked: Vec<(u8, u32)> = self
            .counts(kind)
            .iter()
            .enumerate()
            .map(|(i, &c)| ((i + 1) as u8, c))
            .filter(|&(_, c)| c > 0)
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }
}

fn bump(counts: &mut [u32], n: u8) {
    if let Some(slot) = (n as usize).checked_sub(1).and_then(|idx| counts.get_mut(idx)) {
        *slot += 1;
    }
}

/// Single pass over the records. The minimum sum starts unset rather than at
/// zero; a valid draw sums to at least `MIN_RED_SUM`.
pub fn compute_stats(records: &[PredictionRecord]) -> Stats {
    let mut stats = Stats::zeroed();
    if records.is_empty() {
        return stats;
    }

    let mut min_sum: Option<u32> = None;
    let mut max_sum = 0u32;
    let mut total_sum = 0u64;

    for record in records {
        for &r in &record.red_balls {
            bump(&mut stats.red_counts, r);
            if r % 2 == 1 {
                stats.odd += 1;
            } else {
                stats.even += 1;
            }
        }
        bump(&mut stats.blue_counts, record.blue_ball);

        if record.source == PredictionSource::Learned {
            stats.learned += 1;
        }

        let sum = record.red_sum();
        min_sum = Some(min_sum.map_or(sum, |m| m.min(sum)));
        max_sum = max_sum.max(sum);
        total_sum += sum as u64;
    }

    stats.total = records.len();
    stats.sum_range = SumRange {
        min: min_sum.unwrap_or(0),
        max: max_sum,
        avg: total_sum as f64 / records.len() as f64,
    };
    stats
}
