mod app;
mod dialog;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Lexical decision experiment
#[derive(Parser)]
#[command(name = "lexic")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Participant identifier (at most 99); prompted for when omitted
    #[arg(long)]
    participant: Option<u32>,

    /// Participant age (at least 18); prompted for when omitted
    #[arg(long)]
    age: Option<u32>,

    /// Conditions file with `stim` and `word` columns
    #[arg(long, default_value = "word_conditions.csv")]
    conditions: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Dialog validation happens before any window exists; a bad entry
    // terminates here with no output file.
    let config = dialog::resolve(cli.participant, cli.age)?;
    tracing::info!(
        participant = config.participant,
        age = config.age,
        "session configured"
    );

    let mut conditions = lexic_experiment::load_conditions(&cli.conditions)?;
    lexic_experiment::conditions::shuffle_conditions(&mut conditions, &mut rand::rng());

    app::App::new(config, conditions)?.run()
}
