use anyhow::Result;
use chrono::Utc;
use rand::Rng;

use ssq_db::db::append_predictions;
use ssq_db::models::{Draw, PredictionRecord};
use ssq_db::rusqlite::Connection;
use ssq_net::predictor::{random_draw, Prediction, Predictor};

/// Generate `count` draws in sequence. The first one is always random; each
/// following one is predicted from the draw generated just before it.
pub fn generate(predictor: &Predictor, count: usize, rng: &mut impl Rng) -> Vec<PredictionRecord> {
    let mut batch = Vec::with_capacity(count);
    let mut last: Option<Draw> = None;

    for _ in 0..count {
        let prediction = match &last {
            None => Prediction::Randomized(random_draw(rng)),
            Some(prev) => predictor.predict(prev, rng),
        };
        let draw = *prediction.draw();
        last = Some(draw);
        batch.push(PredictionRecord::new(draw, prediction.source(), Utc::now()));
    }

    batch
}

/// Generate a batch and append all of it to the store at once.
pub fn generate_and_persist(
    conn: &Connection,
    predictor: &Predictor,
    count: usize,
    rng: &mut impl Rng,
) -> Result<Vec<PredictionRecord>> {
    let batch = generate(predictor, count, rng);
    let total = append_predictions(conn, &batch)?;
    log::debug!("{} prédictions ajoutées, {} en base", batch.len(), total);
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use ssq_db::db::{count_predictions, load_predictions, migrate};
    use ssq_db::history::sample_draws;
    use ssq_db::models::{validate_draw, PredictionSource};
    use ssq_net::config::NetConfig;

    fn trained_predictor() -> Predictor {
        let config = NetConfig {
            iterations: 200,
            log_period: 0,
            seed: Some(42),
            ..NetConfig::default()
        };
        let mut predictor = Predictor::new();
        predictor.initialize(&sample_draws(), &config);
        predictor
    }

    #[test]
    fn test_exact_count_returned() {
        let predictor = Predictor::new();
        let mut rng = StdRng::seed_from_u64(42);
        for count in [0, 1, 3, 10] {
            assert_eq!(generate(&predictor, count, &mut rng).len(), count);
        }
    }

    #[test]
    fn test_first_is_random_rest_learned() {
        let predictor = trained_predictor();
        let mut rng = StdRng::seed_from_u64(42);
        let batch = generate(&predictor, 5, &mut rng);

        assert_eq!(batch[0].source, PredictionSource::Randomized);
        assert!(batch[1..].iter().all(|r| r.source == PredictionSource::Learned));
        for r in &batch {
            assert!(validate_draw(&r.red_balls, r.blue_ball).is_ok(), "{:?}", r);
            assert!(r.red_balls.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_chained_on_previous_output() {
        let predictor = trained_predictor();

        let mut rng = StdRng::seed_from_u64(11);
        let batch = generate(&predictor, 3, &mut rng);

        let mut replay = StdRng::seed_from_u64(11);
        let first = random_draw(&mut replay);
        let second = *predictor.predict(&first, &mut replay).draw();
        let third = *predictor.predict(&second, &mut replay).draw();

        assert_eq!(batch[0].red_balls, first.red);
        assert_eq!(batch[1].red_balls, second.red);
        assert_eq!(batch[1].blue_ball, second.blue);
        assert_eq!(batch[2].red_balls, third.red);
    }

    #[test]
    fn test_without_model_all_random() {
        let mut predictor = Predictor::new();
        predictor.initialize(&sample_draws()[..1], &NetConfig::default());
        let mut rng = StdRng::seed_from_u64(42);
        let batch = generate(&predictor, 20, &mut rng);
        assert!(batch.iter().all(|r| r.source == PredictionSource::Randomized));
    }

    #[test]
    fn test_persisted_count_grows_by_count() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        let predictor = trained_predictor();
        let mut rng = StdRng::seed_from_u64(42);

        let first = generate_and_persist(&conn, &predictor, 4, &mut rng).unwrap();
        assert_eq!(first.len(), 4);
        assert_eq!(count_predictions(&conn).unwrap(), 4);

        generate_and_persist(&conn, &predictor, 6, &mut rng).unwrap();
        assert_eq!(count_predictions(&conn).unwrap(), 10);

        let stored = load_predictions(&conn).unwrap();
        for (s, f) in stored.iter().zip(&first) {
            assert_eq!((s.red_balls, s.blue_ball, s.source), (f.red_balls, f.blue_ball, f.source));
        }
    }
}
