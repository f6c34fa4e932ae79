//! Mentara: clinical reasoning engine for case review.
//!
//! Staged diagnostic reasoning over free-text clinical-psychology
//! case notes. The pipeline extracts symptoms, maps them to criteria,
//! formulates candidate diagnoses, and suggests treatments; a
//! single-call fallback keeps analysis available when the staged
//! backend is degraded. Results are normalized into one artifact
//! shape, cached by case fingerprint, and exposed to a follow-up
//! question surface grounded in whatever state a run produced.
//!
//! The host application supplies the UI, persistence, and
//! authentication; this crate only consumes a completion transport
//! and a notification sink.

pub mod cache;
pub mod config;
pub mod llm;
pub mod models;
pub mod notify;
pub mod reasoning;
pub mod session;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for host applications that do not configure
/// their own subscriber. Honors RUST_LOG when set.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}
