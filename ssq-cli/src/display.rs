use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};

use crate::analysis::stats::Stats;
use ssq_db::history::{HistoryLoad, HistoryOrigin};
use ssq_db::models::{BallKind, PredictionRecord, PredictionSource};
use ssq_net::config::TrainingReport;

fn join_balls(balls: &[u8]) -> String {
    balls
        .iter()
        .map(|b| format!("{:02}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

fn source_cell(source: PredictionSource) -> Cell {
    let color = match source {
        PredictionSource::Learned => Color::Green,
        PredictionSource::Randomized => Color::Yellow,
        PredictionSource::Unknown => Color::White,
    };
    Cell::new(source.to_string()).fg(color)
}

pub fn display_history_origin(load: &HistoryLoad) {
    match load.origin {
        HistoryOrigin::File => println!("{} tirages d'historique chargés", load.draws.len()),
        HistoryOrigin::Fallback => println!(
            "Historique indisponible, {} tirage(s) de repli utilisés",
            load.draws.len()
        ),
    }
}

pub fn display_training(report: Option<&TrainingReport>) {
    let Some(report) = report else {
        println!("Pas assez d'historique pour entraîner le réseau : génération aléatoire.");
        return;
    };

    println!("\n== Entraînement du réseau ==\n");

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Exemples", "Itérations", "Erreur initiale", "Erreur finale", "Seuil atteint", "ms"]);

    table.add_row(vec![
        Cell::new(report.examples),
        Cell::new(report.iterations),
        Cell::new(format!("{:.6}", report.initial_error)),
        Cell::new(format!("{:.6}", report.error)),
        Cell::new(if report.converged { "oui" } else { "non" }),
        Cell::new(report.train_time_ms),
    ]);
    println!("{table}");
}

pub fn display_batch(batch: &[PredictionRecord]) {
    if batch.is_empty() {
        println!("Aucune grille générée.");
        return;
    }

    println!("\n🎲 Grilles prédites\n");

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Groupe", "Rouges", "Bleue", "Source"]);

    for (i, record) in batch.iter().enumerate() {
        table.add_row(vec![
            Cell::new(format!("第 {} 组", i + 1)),
            Cell::new(join_balls(&record.red_balls)).fg(Color::Red),
            Cell::new(format!("{:02}", record.blue_ball)).fg(Color::Blue),
            source_cell(record.source),
        ]);
    }
    println!("{table}");
}

pub fn display_predictions(records: &[PredictionRecord], last: usize) {
    if records.is_empty() {
        println!("Aucune prédiction enregistrée. Lancez d'abord : ssq predict");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Date", "Rouges", "Bleue", "Somme", "Source"]);

    let skip = records.len().saturating_sub(last);
    for (i, record) in records.iter().enumerate().skip(skip).rev() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()),
            Cell::new(join_balls(&record.red_balls)).fg(Color::Red),
            Cell::new(format!("{:02}", record.blue_ball)).fg(Color::Blue),
            Cell::new(record.red_sum()),
            source_cell(record.source),
        ]);
    }
    println!("{table}");
    println!("{} / {} prédictions affichées", records.len() - skip, records.len());
}

pub fn display_stats(stats: &Stats) {
    if stats.total == 0 {
        println!("Aucune prédiction enregistrée : statistiques vides.");
        return;
    }

    println!("\n📊 Statistiques sur {} prédictions ({} par le réseau)\n", stats.total, stats.learned);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Somme min", "Somme max", "Somme moyenne", "Impairs", "Pairs"]);
    table.add_row(vec![
        Cell::new(stats.sum_range.min),
        Cell::new(stats.sum_range.max),
        Cell::new(format!("{:.2}", stats.sum_range.avg)),
        Cell::new(stats.odd),
        Cell::new(stats.even),
    ]);
    println!("{table}");

    println!("\n── Boules rouges (1-33) ──");
    display_frequency_table(&stats.red_counts, Color::Red);

    println!("\n── Boules bleues (1-16) ──");
    display_frequency_table(&stats.blue_counts, Color::Blue);

    let hot_red = stats.hottest(BallKind::Red, 6);
    let hot_blue = stats.hottest(BallKind::Blue, 1);
    let red_str = hot_red.iter().map(|&(n, _)| n).collect::<Vec<_>>();
    let blue_str = hot_blue.iter().map(|&(n, _)| n).collect::<Vec<_>>();
    println!("\nPlus fréquents : {} | {}", join_balls(&red_str), join_balls(&blue_str));
}

fn display_frequency_table(counts: &[u32], color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Numéro", "Fréquence"]);

    let mut sorted: Vec<(usize, u32)> = counts.iter().copied().enumerate().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    for (idx, count) in sorted {
        table.add_row(vec![
            Cell::new(format!("{:02}", idx + 1)).fg(color),
            Cell::new(count),
        ]);
    }
    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_balls_pads() {
        assert_eq!(join_balls(&[2, 9, 12, 19, 21, 31]), "02 09 12 19 21 31");
        assert_eq!(join_balls(&[]), "");
    }
}
