pub mod artifact;
pub mod chat;
pub mod enums;
pub mod state;

pub use artifact::{CaseArtifact, Diagnosis, Recommendation, ThoughtStep};
pub use chat::ChatTurn;
pub use enums::{ConfidenceTier, Priority, Severity, Speaker, Stage, StepStatus};
pub use state::{PartialUpdate, ReasoningState};
