/// What the presentation surface should show on the next flip. Text is
/// referenced by intern id so scenes stay cheap to clone and compare.
#[derive(Debug, Clone, PartialEq)]
pub enum Scene {
    Welcome,
    Instructions,
    Fixation,
    Stimulus { text_id: usize },
    Feedback { correct: bool },
    Results { line_ids: Vec<usize> },
    Farewell,
    Rating,
    RatingThanks { liked: bool },
    Blank,
}
