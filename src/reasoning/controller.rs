//! Orchestration controller.
//!
//! Single entry point for case analysis. Consults the fingerprint
//! cache, probes backend availability, then iterates an explicit
//! strategy list in priority order: the staged pipeline first, the
//! single-call fallback second. Both strategies produce a
//! `ReasoningState`, so fallback is invisible in the return type.
//! Every failure path terminates in a valid artifact; nothing
//! propagates past `analyze`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;

use super::executor::StagedPipeline;
use super::legacy::LegacySingleCall;
use super::normalize::{normalize, terminal_failure_artifact};
use super::{CancelToken, ReasoningError};
use crate::cache::TtlCache;
use crate::config;
use crate::llm::CompletionClient;
use crate::models::{CaseArtifact, ReasoningState, Severity, Stage};
use crate::notify::NotificationSink;

// ═══════════════════════════════════════════════════════════
// Run registry: in-flight guard + observability
// ═══════════════════════════════════════════════════════════

/// Snapshot of an analysis run in flight.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveRun {
    pub fingerprint: String,
    /// Which strategy is currently executing.
    pub strategy: String,
    /// When the run started (ISO 8601).
    pub started_at: String,
}

/// Tracks runs in flight: at most one active run per fingerprint.
#[derive(Default)]
pub(crate) struct RunRegistry {
    runs: Mutex<HashMap<String, ActiveRun>>,
}

impl RunRegistry {
    /// Begin a run unless one is already active for this fingerprint.
    fn try_begin<'a>(&'a self, fingerprint: &str, strategy: &str) -> Option<RunGuard<'a>> {
        let mut runs = lock(&self.runs);
        if runs.contains_key(fingerprint) {
            return None;
        }
        runs.insert(
            fingerprint.to_string(),
            ActiveRun {
                fingerprint: fingerprint.to_string(),
                strategy: strategy.to_string(),
                started_at: chrono::Utc::now().to_rfc3339(),
            },
        );
        Some(RunGuard {
            registry: self,
            fingerprint: fingerprint.to_string(),
        })
    }

    fn set_strategy(&self, fingerprint: &str, strategy: &str) {
        if let Some(run) = lock(&self.runs).get_mut(fingerprint) {
            run.strategy = strategy.to_string();
        }
    }

    fn get(&self, fingerprint: &str) -> Option<ActiveRun> {
        lock(&self.runs).get(fingerprint).cloned()
    }
}

/// RAII token for one active run; dropping it releases the fingerprint.
struct RunGuard<'a> {
    registry: &'a RunRegistry,
    fingerprint: String,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        lock(&self.registry.runs).remove(&self.fingerprint);
    }
}

/// A poisoned lock still holds consistent data here (plain map and
/// cache ops cannot tear); recover the guard rather than propagate.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ═══════════════════════════════════════════════════════════
// Engine
// ═══════════════════════════════════════════════════════════

/// The case-review reasoning engine.
///
/// Owns the fingerprint cache and the in-flight registry; shared
/// across sessions behind an `Arc` by the host application.
pub struct CaseReviewEngine<C: CompletionClient, N: NotificationSink> {
    client: C,
    model: String,
    sink: N,
    cache: Mutex<TtlCache<String, CaseArtifact>>,
    cache_ttl: Duration,
    runs: RunRegistry,
}

impl<C: CompletionClient, N: NotificationSink> CaseReviewEngine<C, N> {
    pub fn new(client: C, model: impl Into<String>, sink: N) -> Self {
        Self {
            client,
            model: model.into(),
            sink,
            cache: Mutex::new(TtlCache::new(config::CACHE_CAPACITY)),
            cache_ttl: config::CACHE_TTL,
            runs: RunRegistry::default(),
        }
    }

    /// Override the cache TTL (tests, short-lived review sessions).
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Analyze a case. Always returns a valid artifact.
    pub fn analyze(&self, case_text: &str, fingerprint: &str) -> CaseArtifact {
        self.analyze_with_cancel(case_text, fingerprint, &CancelToken::new())
    }

    /// Analyze with caller-held cancellation. A cancelled run returns
    /// its partial artifact and never writes the cache.
    pub fn analyze_with_cancel(
        &self,
        case_text: &str,
        fingerprint: &str,
        cancel: &CancelToken,
    ) -> CaseArtifact {
        // Cache hit: no completion calls at all.
        if let Some(artifact) = lock(&self.cache).get(&fingerprint.to_string()) {
            tracing::debug!(fingerprint = %fingerprint, "analysis served from cache");
            return artifact;
        }

        // At most one active run per fingerprint. A duplicate request
        // reports the run in progress instead of doubling the load.
        let Some(_guard) = self.runs.try_begin(fingerprint, "staged") else {
            tracing::info!(fingerprint = %fingerprint, "analysis already in flight");
            return normalize(&ReasoningState::new(case_text), None, None);
        };

        // Availability probe. Failure or timeout selects the fallback,
        // it is not an error in itself.
        let (model, staged_available) = match self.client.resolve_model(&self.model) {
            Ok(model) => (model, true),
            Err(e) => {
                let unavailable = ReasoningError::BackendUnavailable(e.to_string());
                tracing::info!(error = %unavailable, "probe failed, staged path skipped");
                (self.model.clone(), false)
            }
        };

        let mut staged_partial: Option<(ReasoningState, ReasoningError)> = None;

        if staged_available {
            let pipeline = StagedPipeline::new(&self.client, &model, cancel);
            let (state, error) = pipeline.execute(case_text);
            match error {
                None => return self.finish(fingerprint, &state, None, cancel),
                Some(ReasoningError::Cancelled) => {
                    tracing::info!(fingerprint = %fingerprint, "run cancelled, result discarded");
                    return normalize(&state, None, None);
                }
                Some(e) => {
                    tracing::warn!(error = %e, severity = %e.severity(), "staged run failed");
                    staged_partial = Some((state, e));
                }
            }
        }

        self.runs.set_strategy(fingerprint, "legacy");
        match LegacySingleCall::new(&self.client, &model).execute(case_text) {
            Ok(outcome) => {
                return self.finish(
                    fingerprint,
                    &outcome.state,
                    outcome.confidences.as_deref(),
                    cancel,
                )
            }
            Err(e) => {
                tracing::warn!(error = %e, severity = %e.severity(), "legacy run failed");
            }
        }

        // Both strategies failed. Surface whatever the staged run got;
        // otherwise the synthetic terminal artifact.
        if let Some((state, error)) = staged_partial.filter(|(state, _)| {
            Stage::all().iter().any(|stage| state.stage_populated(*stage))
        }) {
            self.sink.notify(
                "Case analysis stopped partway; later stages are unavailable.",
                Severity::Warning,
            );
            return normalize(&state, Some(&error), None);
        }

        self.sink.notify(
            "Automated case analysis failed; review the case manually.",
            Severity::Error,
        );
        terminal_failure_artifact()
    }

    /// Is a fresh artifact cached for this fingerprint?
    pub fn is_cached(&self, fingerprint: &str) -> bool {
        lock(&self.cache).contains(&fingerprint.to_string())
    }

    /// Drop a cached artifact, forcing re-analysis on the next call.
    pub fn invalidate(&self, fingerprint: &str) {
        lock(&self.cache).remove(&fingerprint.to_string());
    }

    /// Drop all expired cache entries. Returns how many were removed.
    pub fn sweep_cache(&self) -> usize {
        lock(&self.cache).sweep()
    }

    /// Snapshot of the run in flight for a fingerprint, if any.
    pub fn active_run(&self, fingerprint: &str) -> Option<ActiveRun> {
        self.runs.get(fingerprint)
    }

    /// Normalize a successful run, cache it (unless superseded), and return.
    fn finish(
        &self,
        fingerprint: &str,
        state: &ReasoningState,
        confidences: Option<&[f32]>,
        cancel: &CancelToken,
    ) -> CaseArtifact {
        let artifact = normalize(state, None, confidences);

        // A superseded run must not overwrite the entry belonging to a
        // newer fingerprint.
        if cancel.is_cancelled() {
            tracing::info!(fingerprint = %fingerprint, "run superseded, skipping cache write");
            return artifact;
        }

        lock(&self.cache).insert(fingerprint.to_string(), artifact.clone(), self.cache_ttl);
        tracing::info!(
            fingerprint = %fingerprint,
            diagnoses = artifact.diagnoses.len(),
            recommendations = artifact.recommendations.len(),
            "analysis complete and cached"
        );
        artifact
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::fingerprint;
    use crate::llm::{CompletionError, MockCompletionClient};
    use crate::models::{ConfidenceTier, StepStatus};
    use crate::notify::CollectingSink;

    const CASE: &str = "patient reports insomnia and racing thoughts for 3 weeks";

    const LEGACY_JSON: &str = r#"{
        "symptoms": ["insomnia", "racing thoughts"],
        "criteria_findings": ["sleep disturbance > 2 weeks"],
        "diagnoses": [{"name": "GAD (F41.1)", "confidence": 0.8}],
        "treatments": ["CBT referral"]
    }"#;

    fn staged_script() -> Vec<&'static str> {
        vec![
            "- insomnia\n- racing thoughts",
            "- sleep disturbance > 2 weeks",
            "- Generalized anxiety disorder (F41.1)",
            "- CBT referral\n- sleep hygiene education",
        ]
    }

    fn engine(
        client: MockCompletionClient,
    ) -> CaseReviewEngine<MockCompletionClient, CollectingSink> {
        CaseReviewEngine::new(client, "medgemma:4b", CollectingSink::new())
    }

    #[test]
    fn healthy_staged_run_finishes_all_steps() {
        let engine = engine(MockCompletionClient::new(staged_script()));
        let fp = fingerprint("patient-1", CASE);

        let artifact = engine.analyze(CASE, &fp);

        let statuses: Vec<StepStatus> = artifact.steps.iter().map(|s| s.status).collect();
        assert_eq!(statuses, vec![StepStatus::Finished; 4]);
        assert_eq!(artifact.diagnoses.len(), 1);
        assert_eq!(artifact.diagnoses[0].code.as_deref(), Some("F41.1"));
        assert!(engine.is_cached(&fp));
    }

    fn engine_calls(
        engine: &CaseReviewEngine<MockCompletionClient, CollectingSink>,
    ) -> usize {
        engine.client.calls()
    }

    #[test]
    fn second_analyze_hits_cache_with_zero_calls() {
        let engine = engine(MockCompletionClient::new(staged_script()));
        let fp = fingerprint("patient-1", CASE);

        let first = engine.analyze(CASE, &fp);
        let calls_after_first = engine_calls(&engine);
        let second = engine.analyze(CASE, &fp);

        assert_eq!(engine_calls(&engine), calls_after_first);
        assert_eq!(first, second, "cached artifact must be identical");
    }

    #[test]
    fn expired_cache_entry_triggers_reanalysis() {
        let mut script = staged_script();
        script.extend(staged_script());
        let engine = engine(MockCompletionClient::new(script))
            .with_cache_ttl(Duration::from_millis(20));
        let fp = fingerprint("patient-1", CASE);

        engine.analyze(CASE, &fp);
        std::thread::sleep(Duration::from_millis(40));
        assert!(!engine.is_cached(&fp), "entry should have expired");

        engine.analyze(CASE, &fp);
        assert_eq!(engine_calls(&engine), 8);
    }

    #[test]
    fn probe_failure_falls_back_to_legacy_transparently() {
        let client =
            MockCompletionClient::new(vec![LEGACY_JSON]).with_probe_failure();
        let engine = engine(client);
        let fp = fingerprint("patient-2", CASE);

        let artifact = engine.analyze(CASE, &fp);

        assert_eq!(engine_calls(&engine), 1, "exactly one combined call");
        assert!(!artifact.has_error());
        assert!(artifact.is_complete());
        // Explicit confidence from the legacy path: 0.8 maps to High.
        assert_eq!(artifact.diagnoses[0].confidence, ConfidenceTier::High);
        assert!(engine.is_cached(&fp));
    }

    #[test]
    fn staged_error_falls_back_to_legacy() {
        let client = MockCompletionClient::scripted(vec![
            Ok("- insomnia".to_string()),
            Err(CompletionError::EmptyResponse),
            Ok(LEGACY_JSON.to_string()),
        ]);
        let engine = engine(client);
        let fp = fingerprint("patient-3", CASE);

        let artifact = engine.analyze(CASE, &fp);

        assert!(artifact.is_complete(), "legacy result should win");
        assert_eq!(engine_calls(&engine), 3);
    }

    #[test]
    fn both_strategies_failing_yields_terminal_artifact() {
        let engine = engine(MockCompletionClient::failing());
        let fp = fingerprint("patient-4", CASE);

        let artifact = engine.analyze(CASE, &fp);

        assert_eq!(artifact.steps.len(), 1);
        assert_eq!(artifact.steps[0].status, StepStatus::Errored);
        assert!(artifact.diagnoses.is_empty());
        assert_eq!(artifact.recommendations.len(), 1);

        let notices = engine.sink.notifications();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].1, Severity::Error);
        assert!(!engine.is_cached(&fp), "failures are not cached");
    }

    #[test]
    fn staged_partial_survives_when_legacy_also_fails() {
        let client = MockCompletionClient::scripted(vec![
            Ok("- insomnia".to_string()),
            Err(CompletionError::EmptyResponse),
            Err(CompletionError::EmptyResponse),
        ]);
        let engine = engine(client);
        let fp = fingerprint("patient-5", CASE);

        let artifact = engine.analyze(CASE, &fp);

        let statuses: Vec<StepStatus> = artifact.steps.iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            vec![
                StepStatus::Finished,
                StepStatus::Errored,
                StepStatus::Waiting,
                StepStatus::Waiting,
            ]
        );
        let notices = engine.sink.notifications();
        assert_eq!(notices[0].1, Severity::Warning);
    }

    #[test]
    fn cancelled_run_is_not_cached() {
        let engine = engine(MockCompletionClient::new(staged_script()));
        let fp = fingerprint("patient-6", CASE);
        let cancel = CancelToken::new();
        cancel.cancel();

        let artifact = engine.analyze_with_cancel(CASE, &fp, &cancel);

        assert_eq!(engine_calls(&engine), 0);
        assert!(!engine.is_cached(&fp));
        assert_eq!(artifact.steps[0].status, StepStatus::Processing);
    }

    #[test]
    fn invalidate_forces_reanalysis() {
        let mut script = staged_script();
        script.extend(staged_script());
        let engine = engine(MockCompletionClient::new(script));
        let fp = fingerprint("patient-7", CASE);

        engine.analyze(CASE, &fp);
        assert!(engine.is_cached(&fp));

        engine.invalidate(&fp);
        assert!(!engine.is_cached(&fp));

        engine.analyze(CASE, &fp);
        assert_eq!(engine_calls(&engine), 8);
    }

    #[test]
    fn run_registry_allows_one_run_per_fingerprint() {
        let registry = RunRegistry::default();

        let guard = registry.try_begin("fp-1", "staged");
        assert!(guard.is_some());
        assert!(registry.try_begin("fp-1", "staged").is_none());
        assert!(registry.try_begin("fp-2", "staged").is_some());

        drop(guard);
        assert!(registry.try_begin("fp-1", "staged").is_some());
    }

    #[test]
    fn active_run_reports_strategy_switch() {
        let registry = RunRegistry::default();
        let _guard = registry.try_begin("fp-1", "staged").unwrap();

        let run = registry.get("fp-1").unwrap();
        assert_eq!(run.strategy, "staged");
        assert!(!run.started_at.is_empty());

        registry.set_strategy("fp-1", "legacy");
        assert_eq!(registry.get("fp-1").unwrap().strategy, "legacy");
    }

    #[test]
    fn sweep_cache_drops_expired_entries() {
        let engine = engine(MockCompletionClient::new(staged_script()))
            .with_cache_ttl(Duration::from_millis(10));
        let fp = fingerprint("patient-8", CASE);

        engine.analyze(CASE, &fp);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(engine.sweep_cache(), 1);
    }
}
