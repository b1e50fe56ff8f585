use lexic_cache::intern_text;
use lexic_core::{ConditionRow, Phase, ResponseKey, Scene, TrialPhase, TrialRecord};
use lexic_timing::Timer;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::summary::{summarize, SessionSummary, SummaryError};

/// Events produced by ticking the machine or by the window loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    EnterPressed,
    Response(ResponseKey),
    QuitRequested,
    TrialComplete,
    PhaseComplete,
    RatingClicked { liked: bool },
}

/// In-flight trial bookkeeping. Folded into a `TrialRecord` on completion.
#[derive(Debug)]
struct TrialRun {
    row: usize,
    started_ns: u64,
    onset_ns: Option<u64>,
    rt_ns: Option<u64>,
    resp: Option<ResponseKey>,
    correct: Option<u8>,
    feedback_until_ns: Option<u64>,
}

/// Frame-synchronous session driver. The app ticks it once per buffer flip
/// and forwards input events; everything here is display-independent.
pub struct SessionStateMachine<P, T>
where
    P: Phase,
    T: Timer<Timestamp = u64>,
{
    pub phase: P,
    pub timer: T,
    pub config: SessionConfig,
    conditions: Vec<ConditionRow>,
    current: Option<TrialRun>,
    trial_number: usize,
    records: Vec<TrialRecord>,
    summary: Option<SessionSummary>,
    result_line_ids: Vec<usize>,
    phase_entered_ns: u64,
    rating: Option<bool>,
    rating_ack_until_ns: Option<u64>,
    aborted: bool,
    finished: bool,
}

impl<P, T> SessionStateMachine<P, T>
where
    P: Phase,
    T: Timer<Timestamp = u64>,
{
    /// `conditions` must already be in presentation order; shuffling happens
    /// at load, not here.
    pub fn new(config: SessionConfig, conditions: Vec<ConditionRow>, timer: T) -> Self {
        let phase_entered_ns = timer.now();
        Self {
            phase: P::default(),
            timer,
            config,
            conditions,
            current: None,
            trial_number: 0,
            records: Vec::new(),
            summary: None,
            result_line_ids: Vec::new(),
            phase_entered_ns,
            rating: None,
            rating_ack_until_ns: None,
            aborted: false,
            finished: false,
        }
    }

    /// Advance time-driven transitions. Called once per flip; the returned
    /// events are fed back through `handle_event`.
    pub fn tick(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if self.aborted || self.finished {
            return events;
        }

        let now = self.timer.now();
        let held_ns = now.saturating_sub(self.phase_entered_ns);
        let t = &self.config.timing;

        match self.phase {
            p if p.is_welcome() => {
                if held_ns >= t.welcome_ms * 1_000_000 {
                    events.push(SessionEvent::PhaseComplete);
                }
            }
            p if p.is_instructions() => {
                // Holds until Enter arrives from the window loop.
            }
            p if p.is_lead_in() => {
                if held_ns >= t.lead_in_ms * 1_000_000 {
                    events.push(SessionEvent::PhaseComplete);
                }
            }
            p if p.is_trials() => self.tick_trial(now, &mut events),
            p if p.is_results() => {
                if held_ns >= t.results_ms * 1_000_000 {
                    events.push(SessionEvent::PhaseComplete);
                }
            }
            p if p.is_farewell() => {
                if held_ns >= t.farewell_ms * 1_000_000 {
                    events.push(SessionEvent::PhaseComplete);
                }
            }
            p if p.is_rating() => {
                if let Some(until) = self.rating_ack_until_ns {
                    if now >= until {
                        events.push(SessionEvent::PhaseComplete);
                    }
                }
            }
            _ => {}
        }

        events
    }

    fn tick_trial(&mut self, now: u64, events: &mut Vec<SessionEvent>) {
        let window_ns = self.config.timing.response_window_ns();
        if let Some(run) = &mut self.current {
            // The tick after a flip is the wall-clock reference: the first
            // one of a trial stamps onset, exactly once.
            if run.onset_ns.is_none() {
                run.onset_ns = Some(now);
                debug!(trial = run.row, onset_ns = now, "stimulus onset");
            }

            if let Some(until) = run.feedback_until_ns {
                if now >= until {
                    events.push(SessionEvent::TrialComplete);
                }
            } else if now.saturating_sub(run.started_ns) >= window_ns {
                // Window elapsed with no key press: the record keeps its
                // onset and nothing else, and no feedback is shown.
                events.push(SessionEvent::TrialComplete);
            }
        }
    }

    /// Apply one event. Returns whether it was handled. The only fallible
    /// transition is entering the results phase, where an entirely unscored
    /// category makes the summary impossible.
    pub fn handle_event(&mut self, event: SessionEvent) -> Result<bool, SummaryError> {
        match (&self.phase, &event) {
            (_, SessionEvent::QuitRequested) => {
                warn!("quit requested, aborting session, collected data is discarded");
                self.aborted = true;
                Ok(true)
            }

            (p, SessionEvent::EnterPressed) if p.is_instructions() => self.advance_phase(),

            (p, SessionEvent::Response(key)) if p.is_trials() => {
                Ok(self.record_response(key.clone()))
            }

            (p, SessionEvent::TrialComplete) if p.is_trials() => self.complete_current_trial(),

            (p, SessionEvent::RatingClicked { liked }) if p.is_rating() => {
                let now = self.timer.now();
                let shown_ns = now.saturating_sub(self.phase_entered_ns);
                if self.rating.is_some() || shown_ns < self.config.timing.rating_min_ms * 1_000_000
                {
                    return Ok(false);
                }
                info!(liked, "rating received");
                self.rating = Some(*liked);
                self.rating_ack_until_ns = Some(now + self.config.timing.rating_ack_ms * 1_000_000);
                Ok(true)
            }

            (_, SessionEvent::PhaseComplete) => self.advance_phase(),

            _ => Ok(false),
        }
    }

    fn advance_phase(&mut self) -> Result<bool, SummaryError> {
        let Some(next) = self.phase.next() else {
            info!("session finished");
            self.finished = true;
            return Ok(false);
        };

        self.phase = next;
        self.phase_entered_ns = self.timer.now();
        debug!(phase = ?self.phase, "phase entered");

        if next.is_trials() {
            self.start_trial();
        }
        if next.is_results() {
            let summary = summarize(&self.records)?;
            info!(
                word_mean_rt_s = summary.word_mean_rt_s,
                nonword_mean_rt_s = summary.nonword_mean_rt_s,
                accuracy = summary.accuracy,
                "session summary"
            );
            self.result_line_ids = summary.lines().iter().map(|l| intern_text(l)).collect();
            self.summary = Some(summary);
        }
        Ok(true)
    }

    fn start_trial(&mut self) {
        let now = self.timer.now();
        let row = self.trial_number;
        if let Some((number, of)) = self.trial_progress() {
            info!(number, of, stim = %self.conditions[row].stim, "trial started");
        }
        self.current = Some(TrialRun {
            row,
            started_ns: now,
            onset_ns: None,
            rt_ns: None,
            resp: None,
            correct: None,
            feedback_until_ns: None,
        });
    }

    /// First qualifying key ends the response collection for this trial;
    /// anything after it is ignored.
    fn record_response(&mut self, key: ResponseKey) -> bool {
        let now = self.timer.now();
        let window_ns = self.config.timing.response_window_ns();
        let feedback_ns = self.config.timing.feedback_ns();

        let Some(run) = &mut self.current else {
            return false;
        };
        if run.resp.is_some() || run.feedback_until_ns.is_some() {
            return false;
        }

        let elapsed = now.saturating_sub(run.started_ns);
        if elapsed >= window_ns {
            // Window already over, the next tick times the trial out.
            return false;
        }

        let word = self.conditions[run.row].word;
        let correct = key.scores_correct(word);
        info!(
            trial = run.row,
            key = key.name(),
            rt_ms = elapsed / 1_000_000,
            correct,
            "response recorded"
        );
        run.rt_ns = Some(elapsed);
        run.resp = Some(key);
        run.correct = Some(correct);
        run.feedback_until_ns = Some(now + feedback_ns);
        true
    }

    fn complete_current_trial(&mut self) -> Result<bool, SummaryError> {
        if let Some(run) = self.current.take() {
            let row = &self.conditions[run.row];
            self.records.push(TrialRecord {
                stim: row.stim.clone(),
                word: row.word,
                onset_ns: run.onset_ns,
                rt_ns: run.rt_ns,
                resp: run.resp.map(|k| k.name().to_string()),
                correct: run.correct,
            });
        }

        self.trial_number += 1;
        if self.trial_number < self.conditions.len() {
            self.start_trial();
            Ok(true)
        } else {
            self.advance_phase()
        }
    }

    /// What to draw on the next flip.
    pub fn scene(&self) -> Scene {
        if self.aborted || self.finished {
            return Scene::Blank;
        }

        let p = self.phase;
        if p.is_welcome() {
            Scene::Welcome
        } else if p.is_instructions() {
            Scene::Instructions
        } else if p.is_lead_in() {
            Scene::Fixation
        } else if p.is_trials() {
            let Some(run) = &self.current else {
                return Scene::Blank;
            };
            if run.feedback_until_ns.is_some() {
                return Scene::Feedback {
                    correct: run.correct == Some(1),
                };
            }
            let elapsed = self.timer.now().saturating_sub(run.started_ns);
            match TrialPhase::at(
                elapsed,
                self.config.timing.stimulus_ns(),
                self.config.timing.response_window_ns(),
            ) {
                TrialPhase::Stimulus => Scene::Stimulus {
                    text_id: intern_text(&self.conditions[run.row].stim),
                },
                TrialPhase::Fixation => Scene::Fixation,
                TrialPhase::Done => Scene::Blank,
            }
        } else if p.is_results() {
            Scene::Results {
                line_ids: self.result_line_ids.clone(),
            }
        } else if p.is_farewell() {
            Scene::Farewell
        } else if p.is_rating() {
            match self.rating {
                Some(liked) => Scene::RatingThanks { liked },
                None => Scene::Rating,
            }
        } else {
            Scene::Blank
        }
    }

    /// Persist the results file, once, at the end of a successful run.
    /// Aborted sessions write nothing and discard everything collected.
    pub fn write_results(&self) -> Result<Option<std::path::PathBuf>, crate::output::OutputError> {
        if self.aborted {
            return Ok(None);
        }
        let Some(summary) = &self.summary else {
            return Ok(None);
        };
        let path = self.config.results_path();
        crate::output::write_results(&path, &self.records, summary)?;
        Ok(Some(path))
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn trial_progress(&self) -> Option<(usize, usize)> {
        if self.phase.is_trials() {
            Some((self.trial_number + 1, self.conditions.len()))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexic_core::{Lexicality, SessionPhase};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Manually advanced clock standing in for the flip-driven session
    /// timer.
    #[derive(Clone)]
    struct MockTimer {
        now_ns: Arc<AtomicU64>,
    }

    impl MockTimer {
        fn new() -> (Self, Arc<AtomicU64>) {
            let now_ns = Arc::new(AtomicU64::new(0));
            (
                Self {
                    now_ns: Arc::clone(&now_ns),
                },
                now_ns,
            )
        }
    }

    impl Timer for MockTimer {
        type Timestamp = u64;
        fn now(&self) -> u64 {
            self.now_ns.load(Ordering::SeqCst)
        }
        fn elapsed(&self, ts: u64) -> Duration {
            Duration::from_nanos(self.now().saturating_sub(ts))
        }
        fn sleep(&self, _d: Duration) {}
        fn record_frame(&mut self, _d: Duration) {}
        fn frame_count(&self) -> usize {
            0
        }
        fn frame_report(&self) -> lexic_timing::FrameReport {
            lexic_timing::FrameReport {
                average_frame_time_ns: 0.0,
                jitter_ns: 0.0,
                min_frame_time_ns: 0.0,
                max_frame_time_ns: 0.0,
                effective_fps: 0.0,
            }
        }
    }

    type Machine = SessionStateMachine<SessionPhase, MockTimer>;

    fn conditions() -> Vec<ConditionRow> {
        vec![
            ConditionRow {
                stim: "flirb".into(),
                word: Lexicality::NonWord,
            },
            ConditionRow {
                stim: "table".into(),
                word: Lexicality::Word,
            },
            ConditionRow {
                stim: "plonk".into(),
                word: Lexicality::NonWord,
            },
        ]
    }

    fn machine() -> (Machine, Arc<AtomicU64>) {
        let (timer, clock) = MockTimer::new();
        let config = SessionConfig::new(1, 30).unwrap();
        (Machine::new(config, conditions(), timer), clock)
    }

    fn pump(machine: &mut Machine) {
        for event in machine.tick() {
            machine.handle_event(event).unwrap();
        }
    }

    fn advance(clock: &Arc<AtomicU64>, ms: u64) {
        clock.fetch_add(ms * 1_000_000, Ordering::SeqCst);
    }

    /// Walk a fresh machine into the trials phase.
    fn enter_trials(machine: &mut Machine, clock: &Arc<AtomicU64>) {
        advance(clock, 2000);
        pump(machine); // welcome hold over
        assert_eq!(machine.phase, SessionPhase::Instructions);
        machine.handle_event(SessionEvent::EnterPressed).unwrap();
        assert_eq!(machine.phase, SessionPhase::LeadIn);
        advance(clock, 1000);
        pump(machine);
        assert_eq!(machine.phase, SessionPhase::Trials);
    }

    fn respond(machine: &mut Machine, clock: &Arc<AtomicU64>, key: ResponseKey, after_ms: u64) {
        advance(clock, after_ms);
        pump(machine);
        machine.handle_event(SessionEvent::Response(key)).unwrap();
        // Let the feedback hold run out.
        advance(clock, 2000);
        pump(machine);
    }

    #[test]
    fn welcome_holds_until_its_duration_elapses() {
        let (mut machine, clock) = machine();
        advance(&clock, 1999);
        pump(&mut machine);
        assert_eq!(machine.phase, SessionPhase::Welcome);
        advance(&clock, 1);
        pump(&mut machine);
        assert_eq!(machine.phase, SessionPhase::Instructions);
    }

    #[test]
    fn onset_is_stamped_on_the_first_tick_only() {
        let (mut machine, clock) = machine();
        enter_trials(&mut machine, &clock);

        advance(&clock, 16);
        pump(&mut machine);
        let first = machine.current.as_ref().unwrap().onset_ns;
        assert!(first.is_some());

        advance(&clock, 16);
        pump(&mut machine);
        assert_eq!(machine.current.as_ref().unwrap().onset_ns, first);
    }

    #[test]
    fn scene_shows_stimulus_then_fixation_within_a_trial() {
        let (mut machine, clock) = machine();
        enter_trials(&mut machine, &clock);

        advance(&clock, 100);
        pump(&mut machine);
        assert!(matches!(machine.scene(), Scene::Stimulus { .. }));

        advance(&clock, 500);
        pump(&mut machine);
        assert_eq!(machine.scene(), Scene::Fixation);
    }

    #[test]
    fn all_correct_responses_yield_perfect_accuracy_and_grouped_means() {
        let (mut machine, clock) = machine();
        enter_trials(&mut machine, &clock);

        // flirb (no), table (yes), plonk (no) answered right, left, right.
        respond(&mut machine, &clock, ResponseKey::Right, 400);
        respond(&mut machine, &clock, ResponseKey::Left, 600);
        respond(&mut machine, &clock, ResponseKey::Right, 800);

        assert_eq!(machine.phase, SessionPhase::Results);
        let records = machine.records();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.correct == Some(1)));

        let summary = machine.summary().unwrap();
        assert!((summary.accuracy - 1.0).abs() < 1e-9);
        assert!((summary.word_mean_rt_s - 0.6).abs() < 1e-9);
        assert!((summary.nonword_mean_rt_s - 0.6).abs() < 1e-9);
    }

    #[test]
    fn reaction_time_is_measured_from_trial_start() {
        let (mut machine, clock) = machine();
        enter_trials(&mut machine, &clock);

        advance(&clock, 750);
        pump(&mut machine);
        machine
            .handle_event(SessionEvent::Response(ResponseKey::Right))
            .unwrap();

        let run = machine.current.as_ref().unwrap();
        assert_eq!(run.rt_ns, Some(750 * 1_000_000));
        assert_eq!(run.correct, Some(1));
    }

    #[test]
    fn only_the_first_key_counts() {
        let (mut machine, clock) = machine();
        enter_trials(&mut machine, &clock);

        advance(&clock, 300);
        pump(&mut machine);
        assert!(machine
            .handle_event(SessionEvent::Response(ResponseKey::Left))
            .unwrap());
        advance(&clock, 100);
        assert!(!machine
            .handle_event(SessionEvent::Response(ResponseKey::Right))
            .unwrap());

        let run = machine.current.as_ref().unwrap();
        assert_eq!(run.resp.clone(), Some(ResponseKey::Left));
        assert_eq!(run.rt_ns, Some(300 * 1_000_000));
    }

    #[test]
    fn a_stray_key_ends_the_trial_scored_incorrect() {
        let (mut machine, clock) = machine();
        enter_trials(&mut machine, &clock);

        advance(&clock, 300);
        pump(&mut machine);
        assert!(machine
            .handle_event(SessionEvent::Response(ResponseKey::Other("space".into())))
            .unwrap());
        assert_eq!(machine.scene(), Scene::Feedback { correct: false });

        advance(&clock, 2000);
        pump(&mut machine);
        let record = &machine.records()[0];
        assert_eq!(record.resp.as_deref(), Some("space"));
        assert_eq!(record.correct, Some(0));
        assert_eq!(record.rt_ns, Some(300 * 1_000_000));
    }

    #[test]
    fn trial_progress_counts_only_inside_the_trials_phase() {
        let (mut machine, clock) = machine();
        assert_eq!(machine.trial_progress(), None);
        enter_trials(&mut machine, &clock);
        assert_eq!(machine.trial_progress(), Some((1, 3)));
        respond(&mut machine, &clock, ResponseKey::Right, 400);
        assert_eq!(machine.trial_progress(), Some((2, 3)));
    }

    #[test]
    fn timeout_leaves_the_record_with_onset_only() {
        let (mut machine, clock) = machine();
        enter_trials(&mut machine, &clock);

        advance(&clock, 16);
        pump(&mut machine); // stamps onset
        advance(&clock, 2000);
        pump(&mut machine); // window over, trial times out

        let record = &machine.records()[0];
        assert!(record.onset_ns.is_some());
        assert_eq!(record.rt_ns, None);
        assert_eq!(record.resp.as_deref(), None);
        assert_eq!(record.correct, None);
    }

    #[test]
    fn a_key_after_the_window_is_ignored() {
        let (mut machine, clock) = machine();
        enter_trials(&mut machine, &clock);

        advance(&clock, 2500);
        // No tick yet, so the trial has not timed out, but the window is
        // over: the press must not score.
        assert!(!machine
            .handle_event(SessionEvent::Response(ResponseKey::Left))
            .unwrap());
        pump(&mut machine);
        assert_eq!(machine.records()[0].correct, None);
    }

    #[test]
    fn quit_aborts_mid_session_without_finishing() {
        let (mut machine, clock) = machine();
        enter_trials(&mut machine, &clock);

        respond(&mut machine, &clock, ResponseKey::Right, 400);
        machine.handle_event(SessionEvent::QuitRequested).unwrap();

        assert!(machine.is_aborted());
        assert!(!machine.is_finished());
        assert_eq!(machine.scene(), Scene::Blank);
        // Ticking a dead machine does nothing.
        advance(&clock, 10_000);
        assert!(machine.tick().is_empty());
    }

    #[test]
    fn an_entirely_unscored_category_fails_at_the_results_step() {
        let (mut machine, clock) = machine();
        enter_trials(&mut machine, &clock);

        // Answer only the word trial; both non-words time out.
        advance(&clock, 2000);
        pump(&mut machine);
        respond(&mut machine, &clock, ResponseKey::Left, 600);
        advance(&clock, 16);
        pump(&mut machine);
        advance(&clock, 2000);

        let err = machine
            .tick()
            .into_iter()
            .find_map(|e| machine.handle_event(e).err());
        assert_eq!(
            err,
            Some(SummaryError::EmptyCategory(Lexicality::NonWord))
        );
    }

    #[test]
    fn rating_clicks_are_ignored_before_the_minimum_display_time() {
        let (mut machine, clock) = machine();
        enter_trials(&mut machine, &clock);
        respond(&mut machine, &clock, ResponseKey::Right, 400);
        respond(&mut machine, &clock, ResponseKey::Left, 600);
        respond(&mut machine, &clock, ResponseKey::Right, 800);

        advance(&clock, 2000);
        pump(&mut machine); // results hold over
        assert_eq!(machine.phase, SessionPhase::Farewell);
        advance(&clock, 3000);
        pump(&mut machine);
        assert_eq!(machine.phase, SessionPhase::Rating);

        advance(&clock, 1000);
        assert!(!machine
            .handle_event(SessionEvent::RatingClicked { liked: true })
            .unwrap());
        assert_eq!(machine.scene(), Scene::Rating);

        advance(&clock, 4000);
        assert!(machine
            .handle_event(SessionEvent::RatingClicked { liked: true })
            .unwrap());
        assert_eq!(machine.scene(), Scene::RatingThanks { liked: true });

        advance(&clock, 3000);
        pump(&mut machine);
        assert!(machine.is_finished());
    }
}
