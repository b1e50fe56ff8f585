use std::io::Write;

use anyhow::{Context, Result};
use lexic_experiment::{DialogError, SessionConfig};

/// Fill in missing dialog fields from stdin and validate the result. Both
/// fields are required; empty or unparseable input aborts the program.
pub fn resolve(participant: Option<u32>, age: Option<u32>) -> Result<SessionConfig> {
    let participant = match participant {
        Some(value) => value,
        None => prompt_u32("participant id: ", DialogError::MissingParticipant)?,
    };
    let age = match age {
        Some(value) => value,
        None => prompt_u32("age: ", DialogError::MissingAge)?,
    };
    Ok(SessionConfig::new(participant, age)?)
}

fn prompt_u32(label: &str, missing: DialogError) -> Result<u32> {
    print!("{label}");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let line = line.trim();
    if line.is_empty() {
        return Err(missing.into());
    }
    line.parse()
        .with_context(|| format!("invalid number {line:?}"))
}
