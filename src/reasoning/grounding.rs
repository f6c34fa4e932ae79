//! Conversational grounding.
//!
//! Answers a follow-up question against whatever state the pipeline
//! produced, complete or partial. One completion call carries the
//! case text, a compact state summary, the prior transcript, and the
//! question. The only mutation performed here is appending the new
//! user/assistant pair to the transcript; existing turns are never
//! rewritten or removed.

use super::prompts::{self, escape_xml_tags};
use super::ReasoningError;
use crate::config;
use crate::llm::{ChatMessage, CompletionClient, CompletionRequest};
use crate::models::{ChatTurn, PartialUpdate, ReasoningState, Speaker, Stage};

/// Answer plus an optional incremental state update. Most responses
/// carry no delta; that is the normal case.
#[derive(Debug)]
pub struct GroundedAnswer {
    pub answer: String,
    pub state_delta: Option<PartialUpdate>,
}

/// Answer a follow-up question. On success, appends exactly two turns
/// (user, then assistant) to `history`.
pub fn answer(
    question: &str,
    state: &ReasoningState,
    history: &mut Vec<ChatTurn>,
    client: &dyn CompletionClient,
    model: &str,
) -> Result<GroundedAnswer, ReasoningError> {
    let mut messages = vec![
        ChatMessage::system(prompts::GROUNDING_SYSTEM),
        ChatMessage::user(format!(
            "<case>\n{}\n</case>\n\n<analysis>\n{}\n</analysis>",
            escape_xml_tags(&state.case_text),
            state_summary(state, config::SUMMARY_CHAR_BUDGET),
        )),
    ];
    for turn in history.iter() {
        messages.push(match turn.speaker {
            Speaker::User => ChatMessage::user(turn.content.clone()),
            Speaker::Assistant => ChatMessage::assistant(turn.content.clone()),
        });
    }
    messages.push(ChatMessage::user(question.to_string()));

    let request = CompletionRequest::new(model, messages);
    let response = client.complete(&request)?;

    let (answer_text, state_delta) = split_delta(&response);

    history.push(ChatTurn::user(question));
    history.push(ChatTurn::assistant(answer_text.clone()));

    tracing::debug!(
        turns = history.len(),
        has_delta = state_delta.is_some(),
        "follow-up answered"
    );
    Ok(GroundedAnswer {
        answer: answer_text,
        state_delta,
    })
}

// ═══════════════════════════════════════════════════════════
// State summary
// ═══════════════════════════════════════════════════════════

/// Compact textual summary of pipeline state, sections joined as
/// lines. Diagnoses are safety-relevant context and come first;
/// trailing sections are dropped when the budget runs out.
pub(crate) fn state_summary(state: &ReasoningState, budget_chars: usize) -> String {
    let ordered = [
        Stage::Diagnoses,
        Stage::Symptoms,
        Stage::Criteria,
        Stage::Treatments,
    ];

    let mut summary = String::new();
    for stage in ordered {
        let entries = state.entries(stage);
        if entries.is_empty() {
            continue;
        }

        let mut section = format!("{}:\n", summary_header(stage));
        for entry in entries {
            section.push_str(&format!("- {entry}\n"));
        }

        if summary.len() + section.len() > budget_chars {
            break;
        }
        summary.push_str(&section);
    }

    if summary.is_empty() {
        summary.push_str("No analysis findings yet.");
    }
    summary
}

fn summary_header(stage: Stage) -> &'static str {
    match stage {
        Stage::Symptoms => "Symptoms",
        Stage::Criteria => "Criteria findings",
        Stage::Diagnoses => "Candidate diagnoses (most likely first)",
        Stage::Treatments => "Treatment suggestions",
    }
}

// ═══════════════════════════════════════════════════════════
// Delta extraction
// ═══════════════════════════════════════════════════════════

/// Split an optional trailing fenced JSON delta off the answer text.
/// Anything that does not parse as a partial update is left in the
/// answer untouched.
fn split_delta(response: &str) -> (String, Option<PartialUpdate>) {
    let Some(fence_start) = response.rfind("```json") else {
        return (response.trim().to_string(), None);
    };

    let content = &response[fence_start + 7..];
    let Some(fence_end) = content.find("```") else {
        return (response.trim().to_string(), None);
    };

    let delta: Option<PartialUpdate> = serde_json::from_str(content[..fence_end].trim()).ok();
    match delta {
        Some(update) if !update.is_empty() => {
            let mut answer = String::new();
            answer.push_str(response[..fence_start].trim_end());
            let after = content[fence_end + 3..].trim();
            if !after.is_empty() {
                answer.push('\n');
                answer.push_str(after);
            }
            (answer.trim().to_string(), Some(update))
        }
        _ => (response.trim().to_string(), None),
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
