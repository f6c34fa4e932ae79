use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the four ordered reasoning stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Symptoms,
    Criteria,
    Diagnoses,
    Treatments,
}

impl Stage {
    /// All four stages in pipeline order.
    pub fn all() -> &'static [Stage] {
        &[
            Self::Symptoms,
            Self::Criteria,
            Self::Diagnoses,
            Self::Treatments,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Symptoms => "symptoms",
            Self::Criteria => "criteria",
            Self::Diagnoses => "diagnoses",
            Self::Treatments => "treatments",
        }
    }

    /// Human-readable step title for the review panel.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Symptoms => "Symptom identification",
            Self::Criteria => "Criteria mapping",
            Self::Diagnoses => "Diagnostic formulation",
            Self::Treatments => "Treatment planning",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of one reasoning step as shown in the review panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Waiting,
    Processing,
    Finished,
    Errored,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Processing => write!(f, "processing"),
            Self::Finished => write!(f, "finished"),
            Self::Errored => write!(f, "errored"),
        }
    }
}

/// Confidence tier for a candidate diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    /// Positional mapping: first candidate is High, second Medium,
    /// the rest Low.
    pub fn from_position(index: usize) -> Self {
        match index {
            0 => Self::High,
            1 => Self::Medium,
            _ => Self::Low,
        }
    }

    /// Mapping from a model-emitted confidence score in [0, 1].
    pub fn from_score(score: f32) -> Self {
        if score >= 0.75 {
            Self::High
        } else if score >= 0.5 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Priority of a treatment recommendation. Same positional mapping
/// as diagnosis confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn from_position(index: usize) -> Self {
        match index {
            0 => Self::High,
            1 => Self::Medium,
            _ => Self::Low,
        }
    }
}

/// Who produced a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    /// Wire role for the completion transport.
    pub fn as_role(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Severity of a reported failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}
