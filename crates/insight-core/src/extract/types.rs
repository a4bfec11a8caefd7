//! ============================================================================
//! Extraction Types - Transcripts in, confidence-scored patterns out
//! ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of pattern classifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    TechnicalInsight,
    BreakthroughMoment,
    CollaborationPattern,
    SolutionApproach,
}

impl PatternType {
    /// Tag used as the entity type when a pattern is persisted
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::TechnicalInsight => "technical_insight",
            PatternType::BreakthroughMoment => "breakthrough_moment",
            PatternType::CollaborationPattern => "collaboration_pattern",
            PatternType::SolutionApproach => "solution_approach",
        }
    }

    /// Prefix for synthesized entity names
    pub fn display_name(&self) -> &'static str {
        match self {
            PatternType::TechnicalInsight => "Technical Insight",
            PatternType::BreakthroughMoment => "Breakthrough",
            PatternType::CollaborationPattern => "Collaboration Pattern",
            PatternType::SolutionApproach => "Solution Approach",
        }
    }
}

impl std::fmt::Display for PatternType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PatternType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "technical_insight" => Ok(PatternType::TechnicalInsight),
            "breakthrough_moment" => Ok(PatternType::BreakthroughMoment),
            "collaboration_pattern" => Ok(PatternType::CollaborationPattern),
            "solution_approach" => Ok(PatternType::SolutionApproach),
            _ => Err(format!("Unknown pattern type: {}", s)),
        }
    }
}

/// Where a pattern was found
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternSource {
    pub session_id: String,
    pub project_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Ephemeral extraction result, converted to an entity before storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pattern {
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    pub content: String,
    pub context: String,
    pub confidence: f64,
    pub extracted_from: PatternSource,
}

/// A single tool invocation recorded in a transcript
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
}

impl ToolCall {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input: None,
        }
    }
}

/// A development session as seen by the extractor.
/// Every field is optional on input; absent views extract nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Transcript {
    pub session_id: String,
    pub project_id: String,
    pub timestamp: Option<DateTime<Utc>>,
    /// Message bodies in order
    pub messages: Vec<String>,
    /// Tool invocations in order
    pub tool_calls: Vec<ToolCall>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_type_parsing() {
        assert_eq!(
            "technical_insight".parse::<PatternType>().unwrap(),
            PatternType::TechnicalInsight
        );
        assert_eq!(
            "Breakthrough_Moment".parse::<PatternType>().unwrap(),
            PatternType::BreakthroughMoment
        );
        assert!("community_wisdom".parse::<PatternType>().is_err());
    }

    #[test]
    fn test_transcript_tolerates_missing_fields() {
        let transcript: Transcript = serde_json::from_str("{}").unwrap();
        assert!(transcript.messages.is_empty());
        assert!(transcript.tool_calls.is_empty());

        let transcript: Transcript =
            serde_json::from_str(r#"{"sessionId":"s1","toolCalls":[{"name":"Read"},{}]}"#).unwrap();
        assert_eq!(transcript.session_id, "s1");
        assert_eq!(transcript.tool_calls.len(), 2);
        assert_eq!(transcript.tool_calls[1].name, "");
    }

    #[test]
    fn test_pattern_serializes_type_tag() {
        let pattern = Pattern {
            pattern_type: PatternType::SolutionApproach,
            content: "x".to_string(),
            context: "y".to_string(),
            confidence: 0.7,
            extracted_from: PatternSource {
                session_id: "s".to_string(),
                project_id: "p".to_string(),
                timestamp: Utc::now(),
            },
        };
        let json = serde_json::to_value(&pattern).unwrap();
        assert_eq!(json["type"], "solution_approach");
        assert_eq!(json["extractedFrom"]["sessionId"], "s");
    }
}
