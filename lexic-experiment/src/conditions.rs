use std::path::Path;

use lexic_core::ConditionRow;
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConditionError {
    #[error("cannot read conditions file: {0}")]
    Read(#[from] csv::Error),
    #[error("conditions file has no rows")]
    Empty,
}

/// Load the conditions file. Expects header columns `stim` and `word`
/// ("yes"/"no"); anything else is fatal and propagated.
pub fn load_conditions(path: &Path) -> Result<Vec<ConditionRow>, ConditionError> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader
        .deserialize()
        .collect::<Result<Vec<ConditionRow>, _>>()?;
    if rows.is_empty() {
        return Err(ConditionError::Empty);
    }
    tracing::info!(rows = rows.len(), path = %path.display(), "conditions loaded");
    Ok(rows)
}

/// Randomize presentation order, once, after load.
pub fn shuffle_conditions<R: Rng + ?Sized>(rows: &mut [ConditionRow], rng: &mut R) {
    rows.shuffle(rng);
}
