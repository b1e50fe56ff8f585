pub mod condition;
pub mod phase;
pub mod scene;
pub mod shape;
pub mod trial;

pub use condition::{ConditionRow, Lexicality};
pub use phase::{Phase, SessionPhase};
pub use scene::Scene;
pub use shape::CircleRegion;
pub use trial::{ResponseKey, TrialPhase, TrialRecord};
