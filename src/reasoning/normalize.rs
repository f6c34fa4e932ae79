//! Result normalizer.
//!
//! Maps a `ReasoningState` (from either strategy) into the artifact
//! the review panel renders. Status derivation, confidence tiers, and
//! clinical-code extraction all live here so the two strategies stay
//! free of UI concerns.

use std::sync::LazyLock;

use regex::Regex;

use super::ReasoningError;
use crate::models::{
    CaseArtifact, ConfidenceTier, Diagnosis, Priority, Recommendation, ReasoningState, Stage,
    StepStatus, ThoughtStep,
};

/// Classification code: one letter, digits, optional decimal suffix
/// (e.g. "F41.1", "Z73").
static CLINICAL_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][0-9]+(?:\.[0-9]+)?\b").unwrap());

/// Normalize a reasoning state into the UI artifact.
///
/// `stage_error` marks the first unpopulated stage as errored instead
/// of processing. `confidences` are explicit model-emitted scores from
/// the legacy path; when present they override positional tiers.
pub fn normalize(
    state: &ReasoningState,
    stage_error: Option<&ReasoningError>,
    confidences: Option<&[f32]>,
) -> CaseArtifact {
    CaseArtifact {
        steps: build_steps(state, stage_error),
        diagnoses: build_diagnoses(&state.candidate_diagnoses, confidences),
        recommendations: build_recommendations(&state.treatment_suggestions),
    }
}

/// Artifact returned when both strategies fail: a single errored step,
/// no diagnoses, and one recommendation pointing at manual review. The
/// UI must never be left with an undefined artifact.
pub fn terminal_failure_artifact() -> CaseArtifact {
    CaseArtifact {
        steps: vec![ThoughtStep {
            title: "Analysis failed".into(),
            description: "Automated reasoning could not complete.".into(),
            status: StepStatus::Errored,
        }],
        diagnoses: vec![],
        recommendations: vec![Recommendation {
            id: "rec-0".into(),
            title: "Review this case manually".into(),
            description: "Automated analysis was unavailable; review the case notes \
                          and form an assessment without AI assistance."
                .into(),
            category: "treatment".into(),
            priority: Priority::High,
        }],
    }
}

// ═══════════════════════════════════════════════════════════
// Steps
// ═══════════════════════════════════════════════════════════

fn build_steps(state: &ReasoningState, stage_error: Option<&ReasoningError>) -> Vec<ThoughtStep> {
    let mut steps = Vec::with_capacity(4);
    let mut first_empty_seen = false;

    for stage in Stage::all() {
        let status = if state.stage_populated(*stage) {
            StepStatus::Finished
        } else if !first_empty_seen {
            first_empty_seen = true;
            if stage_error.is_some() {
                StepStatus::Errored
            } else {
                StepStatus::Processing
            }
        } else {
            StepStatus::Waiting
        };

        steps.push(ThoughtStep {
            title: stage.title().into(),
            description: step_description(state, *stage, status),
            status,
        });
    }

    steps
}

fn step_description(state: &ReasoningState, stage: Stage, status: StepStatus) -> String {
    match status {
        StepStatus::Finished => {
            let n = state.entries(stage).len();
            format!("{n} finding{} recorded", if n == 1 { "" } else { "s" })
        }
        StepStatus::Processing => "In progress".into(),
        StepStatus::Errored => "Stage did not complete".into(),
        StepStatus::Waiting => "Waiting on earlier stages".into(),
    }
}

// ═══════════════════════════════════════════════════════════
// Diagnoses
// ═══════════════════════════════════════════════════════════

fn build_diagnoses(candidates: &[String], confidences: Option<&[f32]>) -> Vec<Diagnosis> {
    candidates
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let (name, description) = split_entry(text);
            let confidence = confidences
                .and_then(|scores| scores.get(i))
                .map(|score| ConfidenceTier::from_score(*score))
                .unwrap_or_else(|| ConfidenceTier::from_position(i));

            Diagnosis {
                code: extract_code(text),
                name,
                description,
                confidence,
            }
        })
        .collect()
}

/// Extract a clinical code when the text carries one. Absence is
/// normal, not an error.
pub(crate) fn extract_code(text: &str) -> Option<String> {
    CLINICAL_CODE.find(text).map(|m| m.as_str().to_string())
}

// ═══════════════════════════════════════════════════════════
// Recommendations
// ═══════════════════════════════════════════════════════════

fn build_recommendations(suggestions: &[String]) -> Vec<Recommendation> {
    suggestions
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let (title, description) = split_entry(text);
            Recommendation {
                id: format!("rec-{i}"),
                title,
                description,
                category: "treatment".into(),
                priority: Priority::from_position(i),
            }
        })
        .collect()
}

/// Split "name: detail" entries; entries without a colon become the
/// name with an empty description.
fn split_entry(text: &str) -> (String, String) {
    match text.split_once(':') {
        Some((name, detail)) => (name.trim().to_string(), detail.trim().to_string()),
        None => (text.trim().to_string(), String::new()),
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
