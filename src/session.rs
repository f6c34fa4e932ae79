//! Case-review session.
//!
//! One session per case under review: owns the reasoning state the
//! follow-up surface answers against and the conversation transcript.
//! The transcript lives only for the session; persistence, if any, is
//! the host application's concern.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::cache;
use crate::llm::CompletionClient;
use crate::models::{ChatTurn, ReasoningState};
use crate::reasoning::{grounding, ReasoningError};

/// An active case-review session.
pub struct CaseSession {
    id: Uuid,
    patient_id: String,
    title: Option<String>,
    state: ReasoningState,
    history: Vec<ChatTurn>,
    started_at: DateTime<Utc>,
}

impl CaseSession {
    /// Open a session over an analyzed (possibly partial) state.
    pub fn new(patient_id: impl Into<String>, state: ReasoningState) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id: patient_id.into(),
            title: None,
            state,
            history: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Session title, set from the first question asked.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn state(&self) -> &ReasoningState {
        &self.state
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Cache key for this session's case.
    pub fn fingerprint(&self) -> String {
        cache::fingerprint(&self.patient_id, &self.state.case_text)
    }

    /// Ask a follow-up question. Appends the exchange to the
    /// transcript and merges any incremental update the model
    /// volunteered into the session state.
    pub fn ask(
        &mut self,
        question: &str,
        client: &dyn CompletionClient,
        model: &str,
    ) -> Result<String, ReasoningError> {
        if self.title.is_none() {
            self.title = Some(generate_title(question));
        }

        let grounded =
            grounding::answer(question, &self.state, &mut self.history, client, model)?;

        if let Some(delta) = grounded.state_delta {
            self.state.apply(delta);
        }

        Ok(grounded.answer)
    }
}

/// Generate a session title from the first question.
/// Truncates at 50 characters with "..." if longer, handling UTF-8 correctly.
pub fn generate_title(first_question: &str) -> String {
    let trimmed = first_question.trim();
    if trimmed.is_empty() {
        return "New review session".to_string();
    }

    // Find the byte position at or just before the 50th character
    let boundary = trimmed
        .char_indices()
        .take_while(|(i, _)| *i < 50)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(trimmed.len());

    if boundary >= trimmed.len() {
        trimmed.to_string()
    } else {
        format!("{}...", &trimmed[..boundary])
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
