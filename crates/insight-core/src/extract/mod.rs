//! ============================================================================
//! Extract Module - Heuristic pattern extraction from session transcripts
//! ============================================================================
//! Turns raw conversation text into typed, confidence-scored patterns and
//! routes each one to the bank it belongs in.
//!
//! ## Pipeline
//! ```text
//! messages → joined text (≤ 10,000 chars) → sentences
//!          → [technical | breakthrough | collaboration | solution] rules
//!          + tool-sequence rule over tool invocations
//!          → quality gate (confidence > 0.5)
//!          → entities + target banks
//! ```
//! ============================================================================

mod convert;
mod rules;
mod types;

pub use convert::{
    assign_banks, build_relations, entity_name, pattern_to_entity, target_bank, BankAssignment,
    CONSCIOUSNESS_FLOW, THEMATIC_CONNECTION,
};
pub use rules::{
    breakthrough_moment, collaboration_pattern, solution_approach, split_sentences,
    technical_insight, tool_sequence, RuleMatch, BREAKTHROUGH_INDICATORS,
    COLLABORATION_INDICATORS, SOLUTION_KEYWORDS, SPECIAL_MARKER, TECHNICAL_KEYWORDS,
};
pub use types::{Pattern, PatternSource, PatternType, ToolCall, Transcript};

use chrono::Utc;
use tracing::debug;

use rules::SENTENCE_RULES;

/// Upper bound on the text scanned per transcript
pub const MAX_TEXT_CHARS: usize = 10_000;

/// Patterns at or below this confidence are discarded
pub const QUALITY_THRESHOLD: f64 = 0.5;

/// Concatenate message bodies, truncated to `MAX_TEXT_CHARS` characters
pub fn transcript_text(transcript: &Transcript) -> String {
    transcript
        .messages
        .join(" ")
        .chars()
        .take(MAX_TEXT_CHARS)
        .collect()
}

/// Run every rule over a transcript and keep the patterns that pass the gate
pub fn extract_patterns(transcript: &Transcript) -> Vec<Pattern> {
    let source = PatternSource {
        session_id: transcript.session_id.clone(),
        project_id: transcript.project_id.clone(),
        timestamp: transcript.timestamp.unwrap_or_else(Utc::now),
    };

    let text = transcript_text(transcript);
    let sentences = split_sentences(&text);

    let mut matches = Vec::new();
    for sentence in &sentences {
        let length = sentence.chars().count();
        for rule in SENTENCE_RULES.iter() {
            if length <= rule.min_chars {
                continue;
            }
            if let Some(hit) = (rule.apply)(sentence) {
                debug!("Rule {} matched with confidence {:.2}", rule.name, hit.confidence);
                matches.push(hit);
            }
        }
    }
    matches.extend(tool_sequence(&transcript.tool_calls));

    let found = matches.len();
    let patterns: Vec<Pattern> = matches
        .into_iter()
        .filter(|hit| hit.confidence > QUALITY_THRESHOLD)
        .map(|hit| Pattern {
            pattern_type: hit.pattern_type,
            content: hit.content,
            context: hit.context,
            confidence: hit.confidence,
            extracted_from: source.clone(),
        })
        .collect();

    debug!(
        "Session {}: {} sentences, {} candidates, {} patterns kept",
        transcript.session_id,
        sentences.len(),
        found,
        patterns.len()
    );
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(messages: &[&str]) -> Transcript {
        Transcript {
            session_id: "s1".to_string(),
            project_id: "p1".to_string(),
            timestamp: None,
            messages: messages.iter().map(|m| m.to_string()).collect(),
            tool_calls: Vec::new(),
        }
    }

    #[test]
    fn test_empty_transcript_yields_nothing() {
        assert!(extract_patterns(&Transcript::default()).is_empty());
    }

    #[test]
    fn test_low_confidence_patterns_are_dropped() {
        // Two technical keywords score 0.29 and one collaboration cue 0.33
        let patterns = extract_patterns(&transcript(&["Let's review the database design later."]));
        assert!(patterns.is_empty());
    }

    #[test]
    fn test_sentence_can_yield_several_types() {
        let patterns = extract_patterns(&transcript(&[
            "We should fix the api with a caching strategy, exactly :p",
        ]));
        let types: Vec<_> = patterns.iter().map(|p| p.pattern_type).collect();
        assert!(types.contains(&PatternType::BreakthroughMoment));
        assert!(types.contains(&PatternType::SolutionApproach));

        let breakthrough = patterns
            .iter()
            .find(|p| p.pattern_type == PatternType::BreakthroughMoment)
            .unwrap();
        assert_eq!(breakthrough.confidence, 0.95);
        assert_eq!(breakthrough.extracted_from.session_id, "s1");
    }

    #[test]
    fn test_short_fragments_are_ignored() {
        // Breakthrough needs more than 10 characters
        assert!(extract_patterns(&transcript(&["Eureka!"])).is_empty());
        assert_eq!(extract_patterns(&transcript(&["Eureka, it runs!"])).len(), 1);
    }

    #[test]
    fn test_tool_sequence_pattern() {
        let mut t = transcript(&[]);
        t.tool_calls = ["Grep", "Read", "Edit", "Bash"]
            .iter()
            .map(|n| ToolCall::named(*n))
            .collect();

        let patterns = extract_patterns(&t);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].pattern_type, PatternType::SolutionApproach);
        assert_eq!(patterns[0].confidence, 0.6);
    }

    #[test]
    fn test_text_is_truncated() {
        let long = "x".repeat(MAX_TEXT_CHARS + 500);
        let t = transcript(&[&long, "perfect! that settles it"]);
        assert_eq!(transcript_text(&t).chars().count(), MAX_TEXT_CHARS);
        assert!(extract_patterns(&t).is_empty());
    }
}
