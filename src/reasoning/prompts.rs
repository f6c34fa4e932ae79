//! Prompt template registry.
//!
//! Fixed templates for the four reasoning stages, the combined
//! single-call fallback, and the follow-up grounding surface. Stage
//! templates are parameterized only by prior-stage arrays, never by
//! UI or caching concerns.

use crate::models::{ReasoningState, Stage};

// ═══════════════════════════════════════════════════════════
// System prompts
// ═══════════════════════════════════════════════════════════

pub const STAGE_SYSTEM: &str = "\
You are a clinical-psychology case-review assistant. Work ONLY from \
information explicitly present in the case notes and the prior findings \
you are given. NEVER fabricate observations. Output a plain list, one \
item per line, with no preamble and no closing remarks.";

pub const COMBINED_SYSTEM: &str = "\
You are a clinical-psychology case-review assistant. Work ONLY from \
information explicitly present in the case notes. NEVER fabricate \
observations. Respond with a single JSON object and nothing else.";

pub const GROUNDING_SYSTEM: &str = "\
You are a clinical-psychology case-review assistant answering follow-up \
questions about one case. Ground every answer in the case notes and the \
analysis you are given. Say so plainly when the material does not answer \
the question. Answer concisely.";

// ═══════════════════════════════════════════════════════════
// Stage prompts
// ═══════════════════════════════════════════════════════════

/// Task instruction for one stage.
fn stage_template(stage: Stage) -> &'static str {
    match stage {
        Stage::Symptoms => {
            "List the presenting symptoms described in these case notes. \
             One symptom per line, in the patient's clinical terms."
        }
        Stage::Criteria => {
            "Map the symptoms above to diagnostic criteria they may satisfy. \
             One finding per line, naming the criterion and the supporting symptom."
        }
        Stage::Diagnoses => {
            "Formulate candidate diagnoses consistent with the criteria findings \
             above, most likely first. One diagnosis per line; include the \
             classification code in parentheses when you are confident of it."
        }
        Stage::Treatments => {
            "Suggest evidence-based treatment options for the leading candidate \
             diagnoses above, most important first. One suggestion per line."
        }
    }
}

/// Build the user prompt for one stage from accumulated state.
pub fn stage_prompt(stage: Stage, state: &ReasoningState) -> String {
    let mut context = String::new();

    // Prior-stage findings, in pipeline order, only what exists.
    for prior in Stage::all() {
        if *prior == stage {
            break;
        }
        let entries = state.entries(*prior);
        if entries.is_empty() {
            continue;
        }
        context.push_str(&format!("\n{}:\n", section_header(*prior)));
        for entry in entries {
            context.push_str(&format!("- {entry}\n"));
        }
    }

    format!(
        "<case>\n{}\n</case>\n{}\n{}",
        escape_xml_tags(&state.case_text),
        context,
        stage_template(stage)
    )
}

fn section_header(stage: Stage) -> &'static str {
    match stage {
        Stage::Symptoms => "Identified symptoms",
        Stage::Criteria => "Criteria findings",
        Stage::Diagnoses => "Candidate diagnoses",
        Stage::Treatments => "Treatment suggestions",
    }
}

// ═══════════════════════════════════════════════════════════
// Combined single-call prompt
// ═══════════════════════════════════════════════════════════

/// Build the fallback prompt requesting the whole artifact in one JSON
/// object. Diagnoses may carry an explicit confidence score; the other
/// arrays are plain strings.
pub fn combined_prompt(case_text: &str) -> String {
    format!(
        "<case>\n{}\n</case>\n\n\
         Analyze these clinical-psychology case notes. Return ONE JSON object \
         with exactly these keys:\n\
         - \"symptoms\": array of strings\n\
         - \"criteria_findings\": array of strings\n\
         - \"diagnoses\": array of objects {{\"name\": string, \
         \"confidence\": number between 0 and 1}}, most likely first\n\
         - \"treatments\": array of strings, most important first",
        escape_xml_tags(case_text)
    )
}

// ═══════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════

/// Escape XML-like tags in case text to prevent prompt boundary breakout.
pub(crate) fn escape_xml_tags(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
