//! Stage functions.
//!
//! Each stage builds its prompt from accumulated state, issues one
//! completion call at low temperature, and parses the response into a
//! flat list by splitting on line boundaries and stripping
//! list-marker prefixes. Parse failures never crash the pipeline;
//! they surface as typed errors the executor handles.

use std::sync::LazyLock;

use regex::Regex;

use super::prompts;
use super::ReasoningError;
use crate::llm::{ChatMessage, CompletionClient, CompletionRequest};
use crate::models::{PartialUpdate, ReasoningState, Stage};

/// Leading list markers: "-", "*", "•", "1.", "1)".
static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s*").unwrap());

/// Run one stage: one completion call, one parsed partial update.
pub fn run_stage(
    stage: Stage,
    state: &ReasoningState,
    client: &dyn CompletionClient,
    model: &str,
) -> Result<PartialUpdate, ReasoningError> {
    let request = CompletionRequest::new(
        model,
        vec![
            ChatMessage::system(prompts::STAGE_SYSTEM),
            ChatMessage::user(prompts::stage_prompt(stage, state)),
        ],
    );

    let response = client.complete(&request)?;
    let entries = parse_list(stage, &response)?;

    tracing::debug!(stage = %stage, entries = entries.len(), "stage complete");
    Ok(PartialUpdate::for_stage(stage, entries))
}

/// Decompose a response into non-blank list entries.
///
/// An empty response is a parse failure; a response that parses but
/// yields only blank entries is an incomplete stage. Both stop the
/// pipeline without advancing the router.
pub(crate) fn parse_list(stage: Stage, response: &str) -> Result<Vec<String>, ReasoningError> {
    if response.trim().is_empty() {
        return Err(ReasoningError::StageParse {
            stage,
            raw: response.to_string(),
        });
    }

    let entries: Vec<String> = response
        .lines()
        .map(|line| LIST_MARKER.replace(line, "").trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect();

    if entries.is_empty() {
        return Err(ReasoningError::IncompleteStage { stage });
    }

    Ok(entries)
}
