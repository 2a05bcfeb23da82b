mod analysis;
mod display;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::analysis::batch::generate_and_persist;
use crate::analysis::stats::compute_stats;
use crate::display::{
    display_batch, display_history_origin, display_predictions, display_stats, display_training,
};
use ssq_db::db::{db_path, load_predictions, migrate, open_db};
use ssq_db::history::{Fallback, load_history};
use ssq_db::rusqlite::Connection;
use ssq_net::config::NetConfig;
use ssq_net::encoding::Normalizer;
use ssq_net::predictor::Predictor;

#[derive(Parser)]
#[command(name = "ssq", about = "Générateur de grilles Shuangseqiu (双色球)")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ModelArgs {
    /// Fichier JSON d'historique ({ "historyData": [[...], ...] })
    #[arg(long, default_value = "assets/lottery-data.json")]
    history: PathBuf,

    /// Configuration JSON du réseau (valeurs par défaut sinon)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed pour la reproductibilité
    #[arg(long)]
    seed: Option<u64>,

    /// Sans historique lisible, ne pas utiliser les tirages d'exemple
    #[arg(long)]
    strict: bool,

    /// Normaliser la boule bleue par 16 au lieu de 33
    #[arg(long)]
    consistent_scaling: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Générer et enregistrer des grilles
    Predict {
        /// Nombre de grilles
        #[arg(short, long, default_value = "5")]
        count: usize,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Entraîner le réseau et afficher le rapport
    Train {
        #[command(flatten)]
        model: ModelArgs,

        /// Sauvegarder la configuration utilisée
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Afficher les statistiques des prédictions enregistrées
    Stats,

    /// Lister les dernières prédictions
    List {
        /// Nombre de prédictions à afficher
        #[arg(short, long, default_value = "10")]
        last: usize,
    },

    /// Afficher le chemin de la base de données
    DbPath,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let path = db_path();
    let conn = open_db(&path)?;
    migrate(&conn)?;

    match cli.command {
        Command::Predict { count, model } => cmd_predict(&conn, count, &model),
        Command::Train { model, save } => cmd_train(&model, save.as_deref()),
        Command::Stats => cmd_stats(&conn),
        Command::List { last } => cmd_list(&conn, last),
        Command::DbPath => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn load_config(args: &ModelArgs) -> Result<NetConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Impossible de lire {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("JSON invalide dans {}", path.display()))?
        }
        None => NetConfig::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.consistent_scaling {
        config = config.with_normalizer(Normalizer::consistent());
    }
    config.validate()?;
    Ok(config)
}

fn build_predictor(args: &ModelArgs, config: &NetConfig) -> Predictor {
    let fallback = if args.strict { Fallback::Empty } else { Fallback::Sample };
    let history = load_history(&args.history, fallback);
    display_history_origin(&history);

    let mut predictor = Predictor::new();
    predictor.initialize(&history.draws, config);
    predictor
}

fn cmd_predict(conn: &Connection, count: usize, args: &ModelArgs) -> Result<()> {
    let config = load_config(args)?;
    let predictor = build_predictor(args, &config);
    display_training(predictor.report());

    let mut rng: StdRng = match args.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_rng(&mut rand::rng()),
    };

    let batch = generate_and_persist(conn, &predictor, count, &mut rng)?;
    display_batch(&batch);
    Ok(())
}

fn cmd_train(args: &ModelArgs, save: Option<&Path>) -> Result<()> {
    let config = load_config(args)?;
    let predictor = build_predictor(args, &config);
    display_training(predictor.report());

    if let Some(path) = save {
        let json = serde_json::to_string_pretty(&config)?;
        std::fs::write(path, json)
            .with_context(|| format!("Impossible d'écrire {}", path.display()))?;
        println!("\nConfiguration sauvegardée dans {}", path.display());
    }
    Ok(())
}

fn cmd_stats(conn: &Connection) -> Result<()> {
    let records = load_predictions(conn)?;
    let stats = compute_stats(&records);
    display_stats(&stats);
    Ok(())
}

fn cmd_list(conn: &Connection, last: usize) -> Result<()> {
    let records = load_predictions(conn)?;
    display_predictions(&records, last);
    Ok(())
}
