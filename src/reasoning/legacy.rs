//! Legacy single-call strategy.
//!
//! One completion call requesting the whole artifact as one JSON
//! object. Used when the staged backend is unreachable or fails
//! mid-run. On parse failure the whole response is rejected: there is
//! no per-field provenance to salvage here, so correctness beats
//! partial credit.

use serde::Deserialize;

use super::prompts;
use super::ReasoningError;
use crate::llm::{ChatMessage, CompletionClient, CompletionRequest};
use crate::models::ReasoningState;

/// Result of a legacy run. Diagnoses may carry explicit
/// model-emitted confidence scores; when present they are recorded
/// alongside the state so the normalizer can use them instead of
/// positional inference.
#[derive(Debug)]
pub struct LegacyOutcome {
    pub state: ReasoningState,
    /// One score per candidate diagnosis, in state order.
    pub confidences: Option<Vec<f32>>,
}

/// The single-call ("legacy") execution strategy.
pub struct LegacySingleCall<'a> {
    client: &'a dyn CompletionClient,
    model: &'a str,
}

impl<'a> LegacySingleCall<'a> {
    pub fn new(client: &'a dyn CompletionClient, model: &'a str) -> Self {
        Self { client, model }
    }

    pub fn execute(&self, case_text: &str) -> Result<LegacyOutcome, ReasoningError> {
        let request = CompletionRequest::new(
            self.model,
            vec![
                ChatMessage::system(prompts::COMBINED_SYSTEM),
                ChatMessage::user(prompts::combined_prompt(case_text)),
            ],
        )
        .with_json_mode();

        let response = self.client.complete(&request)?;
        let (state, confidences) = parse_combined_response(case_text, &response)?;

        tracing::debug!(
            symptoms = state.symptoms.len(),
            diagnoses = state.candidate_diagnoses.len(),
            "legacy run complete"
        );
        Ok(LegacyOutcome { state, confidences })
    }
}

// ═══════════════════════════════════════════════════════════
// Response parsing
// ═══════════════════════════════════════════════════════════

#[derive(Deserialize)]
struct RawCombined {
    #[serde(default)]
    symptoms: Vec<serde_json::Value>,
    #[serde(default, alias = "criteria")]
    criteria_findings: Vec<serde_json::Value>,
    #[serde(default, alias = "candidate_diagnoses")]
    diagnoses: Vec<serde_json::Value>,
    #[serde(default, alias = "treatment_suggestions")]
    treatments: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct RawDiagnosis {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
}

/// Parse the combined JSON response into a complete state.
fn parse_combined_response(
    case_text: &str,
    response: &str,
) -> Result<(ReasoningState, Option<Vec<f32>>), ReasoningError> {
    let json_str = extract_json_object(response)
        .ok_or_else(|| ReasoningError::LegacyParse("no JSON object found".into()))?;

    let raw: RawCombined = serde_json::from_str(json_str)
        .map_err(|e| ReasoningError::LegacyParse(e.to_string()))?;

    let mut state = ReasoningState::new(case_text);
    state.symptoms = string_items(&raw.symptoms);
    state.criteria_findings = string_items(&raw.criteria_findings);
    state.treatment_suggestions = string_items(&raw.treatments);

    let (diagnoses, confidences) = diagnosis_items(&raw.diagnoses);
    state.candidate_diagnoses = diagnoses;

    Ok((state, confidences))
}

/// Extract the JSON object from a response that may wrap it in a
/// markdown code fence or surround it with prose.
fn extract_json_object(response: &str) -> Option<&str> {
    if let Some(fence_start) = response.find("```json") {
        let content = &response[fence_start + 7..];
        let fence_end = content.find("```")?;
        return Some(content[..fence_end].trim());
    }
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (end > start).then(|| &response[start..=end])
}

/// Items that should be plain strings. Skips entries that are neither
/// strings nor objects with a "name"; never fails the whole array.
fn string_items(items: &[serde_json::Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(|v| match v {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(o) => o
                .get("name")
                .and_then(|n| n.as_str())
                .map(|n| n.to_string()),
            _ => None,
        })
        .filter(|s| !s.trim().is_empty())
        .collect()
}

/// Diagnoses accept two shapes: plain strings (positional confidence)
/// or objects with an explicit score. When any score is present the
/// list is ordered by descending confidence so positional rank stays
/// meaningful, and the scores are returned in that order.
fn diagnosis_items(items: &[serde_json::Value]) -> (Vec<String>, Option<Vec<f32>>) {
    let mut parsed: Vec<(String, Option<f32>)> = items
        .iter()
        .filter_map(|v| match v {
            serde_json::Value::String(s) => Some((s.clone(), None)),
            serde_json::Value::Object(_) => serde_json::from_value::<RawDiagnosis>(v.clone())
                .ok()
                .map(|d| {
                    let text = match d.description {
                        Some(desc) if !desc.trim().is_empty() => {
                            format!("{}: {}", d.name, desc)
                        }
                        _ => d.name,
                    };
                    (text, d.confidence)
                }),
            _ => None,
        })
        .filter(|(text, _)| !text.trim().is_empty())
        .collect();

    let any_scored = parsed.iter().any(|(_, c)| c.is_some());
    if !any_scored {
        return (parsed.into_iter().map(|(text, _)| text).collect(), None);
    }

    // Unscored entries sink below scored ones; ties keep response order.
    parsed.sort_by(|a, b| {
        let score = |c: &Option<f32>| c.unwrap_or(0.0);
        score(&b.1)
            .partial_cmp(&score(&a.1))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let confidences = parsed.iter().map(|(_, c)| c.unwrap_or(0.0)).collect();
    let names = parsed.into_iter().map(|(text, _)| text).collect();
    (names, Some(confidences))
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockCompletionClient;

    const FULL_RESPONSE: &str = r#"{
        "symptoms": ["insomnia", "racing thoughts"],
        "criteria_findings": ["sleep disturbance > 2 weeks"],
        "diagnoses": [
            {"name": "Generalized anxiety disorder (F41.1)", "confidence": 0.8},
            {"name": "Insomnia disorder (F51.0)", "confidence": 0.55}
        ],
        "treatments": ["CBT referral", "sleep hygiene education"]
    }"#;

    #[test]
    fn parses_full_bare_json() {
        let client = MockCompletionClient::new(vec![FULL_RESPONSE]);
        let strategy = LegacySingleCall::new(&client, "medgemma:4b");

        let outcome = strategy.execute("case").unwrap();
        assert_eq!(outcome.state.case_text, "case");
        assert_eq!(outcome.state.symptoms.len(), 2);
        assert_eq!(outcome.state.criteria_findings.len(), 1);
        assert_eq!(outcome.state.candidate_diagnoses.len(), 2);
        assert_eq!(outcome.state.treatment_suggestions.len(), 2);
        assert_eq!(outcome.confidences, Some(vec![0.8, 0.55]));
    }

    #[test]
    fn parses_fenced_json_with_prose() {
        let response = format!("Here is the analysis:\n\n```json\n{FULL_RESPONSE}\n```\nDone.");
        let client = MockCompletionClient::new(vec![response.as_str()]);
        let strategy = LegacySingleCall::new(&client, "medgemma:4b");

        let outcome = strategy.execute("case").unwrap();
        assert_eq!(outcome.state.symptoms.len(), 2);
    }

    #[test]
    fn malformed_json_is_rejected_whole() {
        let client = MockCompletionClient::new(vec!["{not valid json"]);
        let strategy = LegacySingleCall::new(&client, "medgemma:4b");

        let err = strategy.execute("case").unwrap_err();
        assert!(matches!(err, ReasoningError::LegacyParse(_)));
    }

    #[test]
    fn prose_without_json_is_rejected() {
        let client = MockCompletionClient::new(vec!["I could not analyze this case."]);
        let strategy = LegacySingleCall::new(&client, "medgemma:4b");

        let err = strategy.execute("case").unwrap_err();
        assert!(matches!(err, ReasoningError::LegacyParse(_)));
    }

    #[test]
    fn string_diagnoses_keep_response_order_without_scores() {
        let response = r#"{
            "symptoms": ["low mood"],
            "criteria_findings": ["anhedonia"],
            "diagnoses": ["MDD (F32.1)", "Dysthymia (F34.1)"],
            "treatments": ["behavioral activation"]
        }"#;
        let client = MockCompletionClient::new(vec![response]);
        let strategy = LegacySingleCall::new(&client, "medgemma:4b");

        let outcome = strategy.execute("case").unwrap();
        assert_eq!(
            outcome.state.candidate_diagnoses,
            vec!["MDD (F32.1)", "Dysthymia (F34.1)"]
        );
        assert!(outcome.confidences.is_none());
    }

    #[test]
    fn scored_diagnoses_are_reordered_by_confidence() {
        let response = r#"{
            "symptoms": ["s"],
            "criteria_findings": ["c"],
            "diagnoses": [
                {"name": "Second (F34.1)", "confidence": 0.4},
                {"name": "First (F32.1)", "confidence": 0.9}
            ],
            "treatments": ["t"]
        }"#;
        let client = MockCompletionClient::new(vec![response]);
        let strategy = LegacySingleCall::new(&client, "medgemma:4b");

        let outcome = strategy.execute("case").unwrap();
        assert_eq!(
            outcome.state.candidate_diagnoses,
            vec!["First (F32.1)", "Second (F34.1)"]
        );
        assert_eq!(outcome.confidences, Some(vec![0.9, 0.4]));
    }

    #[test]
    fn malformed_items_are_skipped_not_fatal() {
        let response = r#"{
            "symptoms": ["insomnia", 42, {"name": "low mood"}],
            "criteria_findings": [],
            "diagnoses": [{"no_name_field": true}, "GAD (F41.1)"],
            "treatments": [null]
        }"#;
        let client = MockCompletionClient::new(vec![response]);
        let strategy = LegacySingleCall::new(&client, "medgemma:4b");

        let outcome = strategy.execute("case").unwrap();
        assert_eq!(outcome.state.symptoms, vec!["insomnia", "low mood"]);
        assert_eq!(outcome.state.candidate_diagnoses, vec!["GAD (F41.1)"]);
        assert!(outcome.state.treatment_suggestions.is_empty());
    }

    #[test]
    fn diagnosis_description_is_carried_into_text() {
        let response = r#"{
            "symptoms": ["s"],
            "criteria_findings": ["c"],
            "diagnoses": [
                {"name": "GAD (F41.1)", "description": "excessive worry", "confidence": 0.8}
            ],
            "treatments": ["t"]
        }"#;
        let client = MockCompletionClient::new(vec![response]);
        let strategy = LegacySingleCall::new(&client, "medgemma:4b");

        let outcome = strategy.execute("case").unwrap();
        assert_eq!(
            outcome.state.candidate_diagnoses,
            vec!["GAD (F41.1): excessive worry"]
        );
    }

    #[test]
    fn missing_arrays_default_to_empty() {
        let client = MockCompletionClient::new(vec![r#"{"symptoms": ["s"]}"#]);
        let strategy = LegacySingleCall::new(&client, "medgemma:4b");

        let outcome = strategy.execute("case").unwrap();
        assert_eq!(outcome.state.symptoms, vec!["s"]);
        assert!(outcome.state.criteria_findings.is_empty());
        assert!(outcome.state.candidate_diagnoses.is_empty());
    }
}
