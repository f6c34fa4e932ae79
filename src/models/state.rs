//! Pipeline accumulator state.
//!
//! `ReasoningState` is the unit the pipeline builds, the cache stores,
//! and the grounding layer answers against. Arrays are append-only
//! within a run; the current stage is never stored, it is recomputed
//! by the router from array population so state and arrays cannot
//! diverge.

use serde::{Deserialize, Serialize};

use super::enums::Stage;

/// Accumulated reasoning over one case text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningState {
    /// Immutable input for the run.
    pub case_text: String,
    pub symptoms: Vec<String>,
    pub criteria_findings: Vec<String>,
    /// Order is significant: position encodes confidence rank.
    pub candidate_diagnoses: Vec<String>,
    pub treatment_suggestions: Vec<String>,
}

impl ReasoningState {
    pub fn new(case_text: impl Into<String>) -> Self {
        Self {
            case_text: case_text.into(),
            symptoms: Vec::new(),
            criteria_findings: Vec::new(),
            candidate_diagnoses: Vec::new(),
            treatment_suggestions: Vec::new(),
        }
    }

    /// Entries produced by a given stage.
    pub fn entries(&self, stage: Stage) -> &[String] {
        match stage {
            Stage::Symptoms => &self.symptoms,
            Stage::Criteria => &self.criteria_findings,
            Stage::Diagnoses => &self.candidate_diagnoses,
            Stage::Treatments => &self.treatment_suggestions,
        }
    }

    /// A stage counts as populated only if it holds at least one
    /// non-blank entry. Blank placeholders must not advance the router.
    pub fn stage_populated(&self, stage: Stage) -> bool {
        self.entries(stage).iter().any(|e| !e.trim().is_empty())
    }

    /// Append a partial update. Existing entries are never replaced,
    /// truncated, or reordered.
    pub fn apply(&mut self, update: PartialUpdate) {
        self.symptoms.extend(update.symptoms);
        self.criteria_findings.extend(update.criteria_findings);
        self.candidate_diagnoses.extend(update.candidate_diagnoses);
        self.treatment_suggestions.extend(update.treatment_suggestions);
    }
}

/// Partial state update produced by one stage call or a grounding
/// delta. Restricted to the four known array fields; merging is an
/// explicit append per field, never a generic object spread.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialUpdate {
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default, alias = "criteria")]
    pub criteria_findings: Vec<String>,
    #[serde(default, alias = "diagnoses")]
    pub candidate_diagnoses: Vec<String>,
    #[serde(default, alias = "treatments")]
    pub treatment_suggestions: Vec<String>,
}

impl PartialUpdate {
    /// Update carrying entries for a single stage.
    pub fn for_stage(stage: Stage, entries: Vec<String>) -> Self {
        let mut update = Self::default();
        match stage {
            Stage::Symptoms => update.symptoms = entries,
            Stage::Criteria => update.criteria_findings = entries,
            Stage::Diagnoses => update.candidate_diagnoses = entries,
            Stage::Treatments => update.treatment_suggestions = entries,
        }
        update
    }

    pub fn is_empty(&self) -> bool {
        self.symptoms.is_empty()
            && self.criteria_findings.is_empty()
            && self.candidate_diagnoses.is_empty()
            && self.treatment_suggestions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_has_empty_arrays() {
        let state = ReasoningState::new("patient reports insomnia");
        assert_eq!(state.case_text, "patient reports insomnia");
        for stage in Stage::all() {
            assert!(state.entries(*stage).is_empty());
            assert!(!state.stage_populated(*stage));
        }
    }

    #[test]
    fn apply_appends_without_replacing() {
        let mut state = ReasoningState::new("case");
        state.apply(PartialUpdate::for_stage(
            Stage::Symptoms,
            vec!["insomnia".into()],
        ));
        state.apply(PartialUpdate::for_stage(
            Stage::Symptoms,
            vec!["racing thoughts".into()],
        ));

        assert_eq!(state.symptoms, vec!["insomnia", "racing thoughts"]);
    }

    #[test]
    fn apply_preserves_other_arrays() {
        let mut state = ReasoningState::new("case");
        state.apply(PartialUpdate::for_stage(
            Stage::Symptoms,
            vec!["insomnia".into()],
        ));
        let before = state.symptoms.clone();

        state.apply(PartialUpdate::for_stage(
            Stage::Criteria,
            vec!["sleep disturbance > 2 weeks".into()],
        ));

        assert_eq!(state.symptoms, before, "earlier arrays must be untouched");
        assert_eq!(state.criteria_findings.len(), 1);
    }

    #[test]
    fn blank_entries_do_not_populate_a_stage() {
        let mut state = ReasoningState::new("case");
        state.apply(PartialUpdate::for_stage(
            Stage::Symptoms,
            vec!["".into(), "   ".into()],
        ));
        assert!(!state.stage_populated(Stage::Symptoms));
    }

    #[test]
    fn partial_update_for_stage_targets_one_field() {
        let update = PartialUpdate::for_stage(Stage::Diagnoses, vec!["GAD (F41.1)".into()]);
        assert!(update.symptoms.is_empty());
        assert!(update.criteria_findings.is_empty());
        assert_eq!(update.candidate_diagnoses.len(), 1);
        assert!(update.treatment_suggestions.is_empty());
        assert!(!update.is_empty());
    }

    #[test]
    fn partial_update_deserializes_with_missing_fields() {
        let update: PartialUpdate =
            serde_json::from_str(r#"{"candidate_diagnoses": ["MDD (F32.1)"]}"#).unwrap();
        assert_eq!(update.candidate_diagnoses, vec!["MDD (F32.1)"]);
        assert!(update.symptoms.is_empty());
    }
}
