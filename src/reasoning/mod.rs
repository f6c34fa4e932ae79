//! Clinical reasoning orchestration engine.
//!
//! Turns free-text case notes into a structured diagnostic artifact
//! through a four-stage pipeline (symptoms, criteria, diagnoses,
//! treatments), falls back to a single combined completion call when
//! the staged backend is degraded, and normalizes both outputs into
//! one artifact shape for the review panel.
//!
//! Control flow: `controller` drives `executor` (staged path) or
//! `legacy` (fallback path), then `normalize`. The `router` decides
//! which stage runs next from array population alone. `grounding`
//! answers follow-up questions against whatever state a run produced.

pub mod controller;
pub mod executor;
pub mod grounding;
pub mod legacy;
pub mod normalize;
pub mod prompts;
pub mod router;
pub mod stages;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::llm::CompletionError;
use crate::models::{Severity, Stage};

pub use controller::{ActiveRun, CaseReviewEngine};
pub use grounding::GroundedAnswer;

// ═══════════════════════════════════════════════════════════
// Error taxonomy
// ═══════════════════════════════════════════════════════════

/// Failures inside the reasoning engine, classified by source.
///
/// Stage-level errors are recovered by the executor (partial state
/// kept, loop stops); run-level errors are recovered by the
/// controller via fallback. Nothing propagates past
/// `CaseReviewEngine::analyze`.
#[derive(Debug, thiserror::Error)]
pub enum ReasoningError {
    #[error("Completion transport failed: {0}")]
    Transport(#[from] CompletionError),

    #[error("Could not parse {stage} response into a list")]
    StageParse {
        stage: Stage,
        /// Raw response kept for diagnostics.
        raw: String,
    },

    #[error("Combined analysis response was not a valid JSON artifact: {0}")]
    LegacyParse(String),

    #[error("{stage} stage produced only blank entries")]
    IncompleteStage { stage: Stage },

    #[error("Analysis backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Analysis run was cancelled")]
    Cancelled,
}

impl ReasoningError {
    /// Reporting severity. Backend unavailability and cancellation are
    /// routine (fallback handles them); only legacy parse failures are
    /// errors outright, since that path has no partial credit.
    pub fn severity(&self) -> Severity {
        match self {
            Self::Transport(_) => Severity::Warning,
            Self::StageParse { .. } => Severity::Warning,
            Self::LegacyParse(_) => Severity::Error,
            Self::IncompleteStage { .. } => Severity::Warning,
            Self::BackendUnavailable(_) => Severity::Info,
            Self::Cancelled => Severity::Info,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Cancellation
// ═══════════════════════════════════════════════════════════

/// Cooperative cancellation flag for an analysis run.
///
/// Checked between stages; an in-flight completion call finishes but
/// its result is discarded and never cached. Clone freely: all clones
/// share the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_classification() {
        assert_eq!(
            ReasoningError::Transport(CompletionError::EmptyResponse).severity(),
            Severity::Warning
        );
        assert_eq!(
            ReasoningError::StageParse {
                stage: Stage::Symptoms,
                raw: String::new(),
            }
            .severity(),
            Severity::Warning
        );
        assert_eq!(
            ReasoningError::LegacyParse("bad json".into()).severity(),
            Severity::Error
        );
        assert_eq!(
            ReasoningError::IncompleteStage {
                stage: Stage::Criteria
            }
            .severity(),
            Severity::Warning
        );
        assert_eq!(
            ReasoningError::BackendUnavailable("probe failed".into()).severity(),
            Severity::Info
        );
        assert_eq!(ReasoningError::Cancelled.severity(), Severity::Info);
    }

    #[test]
    fn cancel_token_is_shared_across_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());
    }
}
