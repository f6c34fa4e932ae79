use serde::{Deserialize, Serialize};

use super::enums::Speaker;

/// One turn of a case-review conversation. The transcript is a pure
/// log: turns are appended in order and never rewritten or removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub speaker: Speaker,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_speaker() {
        assert_eq!(ChatTurn::user("q").speaker, Speaker::User);
        assert_eq!(ChatTurn::assistant("a").speaker, Speaker::Assistant);
    }

    #[test]
    fn turn_serializes_snake_case() {
        let json = serde_json::to_string(&ChatTurn::user("q")).unwrap();
        assert!(json.contains("\"user\""));
    }
}
