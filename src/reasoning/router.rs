//! Stage routing.
//!
//! Pure function of accumulated state: the earliest stage whose array
//! holds no non-blank entry runs next. This makes traversal strictly
//! forward-only (a populated stage never reruns) and self-healing: if
//! a later array was somehow populated while an earlier one is empty,
//! the run resumes from the earliest empty stage.

use crate::models::{ReasoningState, Stage};

/// What the pipeline should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStage {
    Run(Stage),
    Done,
}

/// Decide the next stage from array population alone. No side effects.
pub fn next_stage(state: &ReasoningState) -> NextStage {
    for stage in Stage::all() {
        if !state.stage_populated(*stage) {
            return NextStage::Run(*stage);
        }
    }
    NextStage::Done
}
