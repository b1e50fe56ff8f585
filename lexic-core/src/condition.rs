use serde::{Deserialize, Serialize};

/// Word/non-word label of a stimulus, spelled "yes"/"no" in the conditions
/// file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lexicality {
    #[serde(rename = "yes")]
    Word,
    #[serde(rename = "no")]
    NonWord,
}

impl Lexicality {
    pub fn is_word(&self) -> bool {
        matches!(self, Lexicality::Word)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Lexicality::Word => "yes",
            Lexicality::NonWord => "no",
        }
    }
}

/// One experimental item from the conditions file. Immutable after load,
/// only its position in the presentation order changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionRow {
    pub stim: String,
    pub word: Lexicality,
}
