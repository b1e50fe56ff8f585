use std::path::PathBuf;

use thiserror::Error;

/// Dialog validation failures. Any of these abort the program before a
/// window is opened.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DialogError {
    #[error("participant id is required")]
    MissingParticipant,
    #[error("age is required")]
    MissingAge,
    #[error("participant id {0} is out of range, must be at most 99")]
    ParticipantOutOfRange(u32),
    #[error("age {0} is below the minimum of 18")]
    Underage(u32),
}

/// All session durations, in milliseconds.
#[derive(Debug, Clone)]
pub struct SessionTiming {
    pub welcome_ms: u64,
    pub lead_in_ms: u64,
    pub stimulus_ms: u64,
    pub response_window_ms: u64,
    pub feedback_ms: u64,
    pub results_ms: u64,
    pub farewell_ms: u64,
    pub rating_min_ms: u64,
    pub rating_ack_ms: u64,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            welcome_ms: 2000,
            lead_in_ms: 1000,
            stimulus_ms: 500,
            response_window_ms: 2000,
            feedback_ms: 2000,
            results_ms: 2000,
            farewell_ms: 3000,
            rating_min_ms: 5000,
            rating_ack_ms: 3000,
        }
    }
}

impl SessionTiming {
    pub fn stimulus_ns(&self) -> u64 {
        self.stimulus_ms * 1_000_000
    }

    pub fn response_window_ns(&self) -> u64 {
        self.response_window_ms * 1_000_000
    }

    pub fn feedback_ns(&self) -> u64 {
        self.feedback_ms * 1_000_000
    }
}

/// Validated per-session configuration, passed into the state machine
/// instead of living in process-wide state.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub participant: u32,
    pub age: u32,
    pub timing: SessionTiming,
}

impl SessionConfig {
    pub const MAX_PARTICIPANT: u32 = 99;
    pub const MIN_AGE: u32 = 18;

    pub fn new(participant: u32, age: u32) -> Result<Self, DialogError> {
        if participant > Self::MAX_PARTICIPANT {
            return Err(DialogError::ParticipantOutOfRange(participant));
        }
        if age < Self::MIN_AGE {
            return Err(DialogError::Underage(age));
        }
        Ok(Self {
            participant,
            age,
            timing: SessionTiming::default(),
        })
    }

    /// Results file name, keyed by participant id.
    pub fn results_path(&self) -> PathBuf {
        PathBuf::from(format!("sub-{}_results.csv", self.participant))
    }
}
