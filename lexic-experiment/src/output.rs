use std::path::Path;

use lexic_core::TrialRecord;
use serde::Serialize;
use thiserror::Error;

use crate::summary::SessionSummary;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("cannot write results file: {0}")]
    Write(#[from] csv::Error),
}

/// One output row: the condition columns plus the fields appended during
/// the run. `rt_word` carries the real-word mean on every row so the file
/// is self-contained. Times are seconds.
#[derive(Debug, Serialize)]
struct ResultRow<'a> {
    stim: &'a str,
    word: &'static str,
    onset: Option<f64>,
    rt: Option<f64>,
    resp: Option<&'a str>,
    correct: Option<u8>,
    rt_word: f64,
}

fn secs(ns: u64) -> f64 {
    ns as f64 / 1e9
}

/// Write the results file, once, in presentation order. Never called on an
/// aborted run.
pub fn write_results(
    path: &Path,
    records: &[TrialRecord],
    summary: &SessionSummary,
) -> Result<(), OutputError> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(ResultRow {
            stim: &record.stim,
            word: record.word.label(),
            onset: record.onset_ns.map(secs),
            rt: record.rt_ns.map(secs),
            resp: record.resp.as_deref(),
            correct: record.correct,
            rt_word: summary.word_mean_rt_s,
        })?;
    }
    writer.flush().map_err(csv::Error::from)?;
    tracing::info!(rows = records.len(), path = %path.display(), "results written");
    Ok(())
}
