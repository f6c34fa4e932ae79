use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Mentara";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    format!("{}=info", env!("CARGO_PKG_NAME"))
}

// ── Completion endpoint ──────────────────────────────────────

/// Default OpenAI-compatible endpoint (local Ollama exposes /v1).
pub const DEFAULT_LLM_URL: &str = "http://localhost:11434/v1";

/// Default model when MENTARA_LLM_MODEL is unset.
pub const DEFAULT_MODEL: &str = "medgemma:4b";

/// Preferred models in order of preference, consulted when the
/// configured model is not present on the endpoint.
pub const PREFERRED_MODELS: &[&str] = &[
    "medgemma",
    "medgemma:27b",
    "medgemma:4b",
    "llama3.1:8b",
];

/// Per-request timeout for completion calls.
pub const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Timeout for the availability probe. A probe that takes longer
/// than this counts as a probe failure, not a fatal error.
pub const PROBE_TIMEOUT_SECS: u64 = 5;

/// Sampling temperature for all reasoning calls. Clinical consistency
/// matters more than variety.
pub const TEMPERATURE: f32 = 0.1;

// ── Cache ────────────────────────────────────────────────────

/// How long a normalized analysis stays valid. Case text rarely
/// changes faster than a clinician edits a draft.
pub const CACHE_TTL: Duration = Duration::from_secs(3600);

/// Max cached analyses before the oldest entry is evicted.
pub const CACHE_CAPACITY: usize = 64;

// ── Grounding ────────────────────────────────────────────────

/// Character budget for the pipeline-state summary embedded in
/// follow-up prompts (~3000 tokens at ~4 chars/token for English).
pub const SUMMARY_CHAR_BUDGET: usize = 12_000;
