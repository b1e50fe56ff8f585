use serde::Serialize;

use crate::condition::Lexicality;

/// Within-trial display state, a pure function of elapsed trial time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrialPhase {
    Stimulus,
    Fixation,
    Done,
}

impl TrialPhase {
    /// Stimulus fills [0, stimulus_ns), fixation fills
    /// [stimulus_ns, window_ns), anything past the response window is Done.
    pub fn at(elapsed_ns: u64, stimulus_ns: u64, window_ns: u64) -> Self {
        if elapsed_ns < stimulus_ns {
            TrialPhase::Stimulus
        } else if elapsed_ns < window_ns {
            TrialPhase::Fixation
        } else {
            TrialPhase::Done
        }
    }
}

/// A key pressed during the response window. Every key ends response
/// collection; only the arrows can score a hit, anything else is recorded
/// under its own name and scored 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseKey {
    Left,
    Right,
    Other(String),
}

impl ResponseKey {
    pub fn name(&self) -> &str {
        match self {
            ResponseKey::Left => "left",
            ResponseKey::Right => "right",
            ResponseKey::Other(name) => name,
        }
    }

    /// Left means "it is a word", right means "it is not".
    pub fn scores_correct(&self, word: Lexicality) -> u8 {
        let hit = match self {
            ResponseKey::Left => word == Lexicality::Word,
            ResponseKey::Right => word == Lexicality::NonWord,
            ResponseKey::Other(_) => false,
        };
        hit as u8
    }
}

/// Per-trial outcome. Timestamps are nanoseconds: `onset_ns` is relative to
/// the session clock, `rt_ns` to the trial start. Response fields stay
/// `None` when the window elapses without a key press.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialRecord {
    pub stim: String,
    pub word: Lexicality,
    pub onset_ns: Option<u64>,
    pub rt_ns: Option<u64>,
    pub resp: Option<String>,
    pub correct: Option<u8>,
}

impl TrialRecord {
    pub fn scored(&self) -> bool {
        self.correct.is_some()
    }
}
