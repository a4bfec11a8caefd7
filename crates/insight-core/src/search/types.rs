//! ============================================================================
//! Search Types - Unified results across transcripts and memory banks
//! ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a unified result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    Session,
    MemoryBank,
}

impl std::fmt::Display for ResultSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultSource::Session => write!(f, "session"),
            ResultSource::MemoryBank => write!(f, "memory_bank"),
        }
    }
}

/// Provenance attached to a result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A single search hit from either source.
/// `relevance_score` is the raw score; ranking never writes back into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedResult {
    pub source: ResultSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    pub content: String,
    pub relevance_score: f64,
    #[serde(default)]
    pub context: ResultContext,
}

impl UnifiedResult {
    /// Identity used to collapse related insights that repeat a direct match
    pub fn dedup_key(&self) -> (&str, Option<&str>) {
        (self.content.as_str(), self.context.session_id.as_deref())
    }
}

/// Raw hit produced by a transcript search collaborator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptHit {
    #[serde(default)]
    pub matched_content: Vec<String>,
    #[serde(default)]
    pub relevance: f64,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub project_id: String,
    /// ISO 8601 timestamp of the matched session, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Answer to a free-text question
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NaturalLanguageAnswer {
    pub query: String,
    pub key_terms: Vec<String>,
    pub direct_matches: Vec<UnifiedResult>,
    pub related_insights: Vec<UnifiedResult>,
    pub recommendations: Vec<String>,
}
