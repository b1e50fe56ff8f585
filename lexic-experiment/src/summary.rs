use lexic_core::{Lexicality, TrialRecord};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SummaryError {
    /// A category with zero scored trials cannot be averaged. Surfaced as a
    /// hard error rather than a silent default.
    #[error("no scored \"{}\" trials to average", .0.label())]
    EmptyCategory(Lexicality),
}

/// Derived once after all trials complete, never stored with the records.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub word_mean_rt_s: f64,
    pub nonword_mean_rt_s: f64,
    pub accuracy: f64,
}

impl SessionSummary {
    /// Lines for the on-screen results display, 3 decimal places.
    pub fn lines(&self) -> Vec<String> {
        vec![
            "Your reaction times are as follows:".to_string(),
            format!("Real words: {:.3} s", self.word_mean_rt_s),
            format!("Fake words: {:.3} s", self.nonword_mean_rt_s),
            format!("Overall accuracy: {:.3}", self.accuracy),
        ]
    }
}

fn mean_rt_s(records: &[TrialRecord], category: Lexicality) -> Result<f64, SummaryError> {
    let rts: Vec<f64> = records
        .iter()
        .filter(|r| r.word == category)
        .filter_map(|r| r.rt_ns)
        .map(|ns| ns as f64 / 1e9)
        .collect();
    if rts.is_empty() {
        return Err(SummaryError::EmptyCategory(category));
    }
    Ok(rts.iter().sum::<f64>() / rts.len() as f64)
}

/// Grouped mean reaction time per category and overall accuracy. Trials
/// without a recorded response are excluded from both, per grouped-mean
/// semantics.
pub fn summarize(records: &[TrialRecord]) -> Result<SessionSummary, SummaryError> {
    let word_mean_rt_s = mean_rt_s(records, Lexicality::Word)?;
    let nonword_mean_rt_s = mean_rt_s(records, Lexicality::NonWord)?;

    let scored: Vec<u8> = records.iter().filter_map(|r| r.correct).collect();
    let accuracy = scored.iter().map(|&c| c as f64).sum::<f64>() / scored.len() as f64;

    Ok(SessionSummary {
        word_mean_rt_s,
        nonword_mean_rt_s,
        accuracy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        stim: &str,
        word: Lexicality,
        rt_ms: Option<u64>,
        correct: Option<u8>,
    ) -> TrialRecord {
        TrialRecord {
            stim: stim.into(),
            word,
            onset_ns: Some(1_000_000),
            rt_ns: rt_ms.map(|ms| ms * 1_000_000),
            resp: correct.map(|_| "left".to_string()),
            correct,
        }
    }

    #[test]
    fn means_are_grouped_by_category() {
        let records = vec![
            record("flirb", Lexicality::NonWord, Some(400), Some(1)),
            record("table", Lexicality::Word, Some(600), Some(1)),
            record("plonk", Lexicality::NonWord, Some(800), Some(1)),
        ];
        let summary = summarize(&records).unwrap();
        assert!((summary.word_mean_rt_s - 0.6).abs() < 1e-9);
        assert!((summary.nonword_mean_rt_s - 0.6).abs() < 1e-9);
        assert!((summary.accuracy - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unscored_trials_are_excluded_from_both_statistics() {
        let records = vec![
            record("table", Lexicality::Word, Some(500), Some(1)),
            record("chair", Lexicality::Word, None, None),
            record("flirb", Lexicality::NonWord, Some(700), Some(0)),
        ];
        let summary = summarize(&records).unwrap();
        assert!((summary.word_mean_rt_s - 0.5).abs() < 1e-9);
        assert!((summary.nonword_mean_rt_s - 0.7).abs() < 1e-9);
        assert!((summary.accuracy - 0.5).abs() < 1e-9);
    }

    #[test]
    fn a_fully_unscored_category_is_a_hard_error() {
        let records = vec![
            record("table", Lexicality::Word, Some(500), Some(1)),
            record("flirb", Lexicality::NonWord, None, None),
        ];
        assert_eq!(
            summarize(&records).unwrap_err(),
            SummaryError::EmptyCategory(Lexicality::NonWord)
        );
    }

    #[test]
    fn no_records_at_all_is_a_hard_error() {
        assert!(summarize(&[]).is_err());
    }

    #[test]
    fn results_lines_are_formatted_to_three_decimals() {
        let summary = SessionSummary {
            word_mean_rt_s: 0.5234,
            nonword_mean_rt_s: 0.6,
            accuracy: 0.875,
        };
        let lines = summary.lines();
        assert_eq!(lines[1], "Real words: 0.523 s");
        assert_eq!(lines[2], "Fake words: 0.600 s");
        assert_eq!(lines[3], "Overall accuracy: 0.875");
    }
}
