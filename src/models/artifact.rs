//! UI-facing analysis artifact.
//!
//! The shapes the review panel renders. Derived from `ReasoningState`
//! by the normalizer; both execution strategies end up here, so the
//! frontend never branches on which path produced the result.

use serde::{Deserialize, Serialize};

use super::enums::{ConfidenceTier, Priority, StepStatus};

/// One step of the reasoning panel. One step per pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtStep {
    pub title: String,
    pub description: String,
    pub status: StepStatus,
}

/// A candidate diagnosis as displayed, with its confidence tier and
/// the clinical code when one was present in the source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub name: String,
    pub description: String,
    pub confidence: ConfidenceTier,
    /// Classification code extracted from the source string, e.g. "F41.1".
    /// Empty when the text carried none; never an error.
    pub code: Option<String>,
}

/// A treatment recommendation as displayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: Priority,
}

/// The complete normalized result of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseArtifact {
    pub steps: Vec<ThoughtStep>,
    pub diagnoses: Vec<Diagnosis>,
    pub recommendations: Vec<Recommendation>,
}

impl CaseArtifact {
    /// True when every step finished cleanly.
    pub fn is_complete(&self) -> bool {
        !self.steps.is_empty()
            && self
                .steps
                .iter()
                .all(|s| s.status == StepStatus::Finished)
    }

    /// True when any step errored.
    pub fn has_error(&self) -> bool {
        self.steps.iter().any(|s| s.status == StepStatus::Errored)
    }
}
