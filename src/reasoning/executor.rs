//! Staged pipeline executor.
//!
//! Drives router + stage functions to completion. Partial updates are
//! merged by append only; on a stage error the loop stops and the
//! partially filled state is returned alongside the error, so the
//! review panel can show "as far as we got". Retry policy belongs to
//! the controller at whole-run granularity, not here.

use super::router::{next_stage, NextStage};
use super::stages::run_stage;
use super::{CancelToken, ReasoningError};
use crate::llm::CompletionClient;
use crate::models::ReasoningState;

/// The staged ("enhanced") execution strategy.
pub struct StagedPipeline<'a> {
    client: &'a dyn CompletionClient,
    model: &'a str,
    cancel: &'a CancelToken,
}

impl<'a> StagedPipeline<'a> {
    pub fn new(client: &'a dyn CompletionClient, model: &'a str, cancel: &'a CancelToken) -> Self {
        Self {
            client,
            model,
            cancel,
        }
    }

    /// Run stages until the router reports done, a stage fails, or the
    /// run is cancelled. Always returns the accumulated state.
    pub fn execute(&self, case_text: &str) -> (ReasoningState, Option<ReasoningError>) {
        let mut state = ReasoningState::new(case_text);

        while let NextStage::Run(stage) = next_stage(&state) {
            if self.cancel.is_cancelled() {
                tracing::info!(stage = %stage, "run cancelled between stages");
                return (state, Some(ReasoningError::Cancelled));
            }

            match run_stage(stage, &state, self.client, self.model) {
                Ok(update) => state.apply(update),
                Err(e) => {
                    tracing::warn!(stage = %stage, error = %e, "stage failed, stopping run");
                    return (state, Some(e));
                }
            }
        }

        (state, None)
    }
}
