//! ============================================================================
//! Extraction Rules - Keyword heuristics over single sentences
//! ============================================================================
//! Each rule is a pure function from one sentence to at most one match.
//! Rules are independent: one sentence may satisfy several of them.
//! Confidences here are raw; the quality gate is applied by the caller.
//! ============================================================================

use super::types::{PatternType, ToolCall};

pub const TECHNICAL_KEYWORDS: [&str; 14] = [
    "implementation",
    "architecture",
    "pattern",
    "algorithm",
    "api",
    "database",
    "framework",
    "optimization",
    "refactor",
    "performance",
    "design",
    "interface",
    "function",
    "component",
];

/// Ordered: the first indicator found in a sentence decides its confidence
pub const BREAKTHROUGH_INDICATORS: [&str; 10] = [
    "exactly :p",
    "breakthrough",
    "aha!",
    "perfect!",
    "eureka",
    "that's it",
    "finally works",
    "got it",
    "it works",
    "brilliant",
];

/// Marker phrase that signals a confirmed breakthrough
pub const SPECIAL_MARKER: &str = "exactly :p";

pub const COLLABORATION_INDICATORS: [&str; 9] = [
    "we should",
    "let's",
    "together",
    "collaborate",
    "our approach",
    "we can",
    "we could",
    "partnership",
    "teamwork",
];

pub const SOLUTION_KEYWORDS: [&str; 9] = [
    "solution",
    "approach",
    "solve",
    "fix",
    "implement",
    "strategy",
    "method",
    "technique",
    "resolve",
];

const SPECIAL_MARKER_CONFIDENCE: f64 = 0.95;
const BREAKTHROUGH_CONFIDENCE: f64 = 0.7;
const TECHNICAL_CONFIDENCE_CAP: f64 = 0.9;
const COLLABORATION_CONFIDENCE_CAP: f64 = 0.8;
const SOLUTION_CONFIDENCE_CAP: f64 = 0.7;
const TOOL_SEQUENCE_CONFIDENCE: f64 = 0.6;

/// Tool invocations needed before a transcript yields a tool-sequence pattern
pub const TOOL_SEQUENCE_MIN_CALLS: usize = 3;

/// A rule hit before provenance is attached
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub pattern_type: PatternType,
    pub content: String,
    pub context: String,
    pub confidence: f64,
}

/// A sentence rule plus the minimum sentence length it accepts
pub(super) struct SentenceRule {
    pub(super) name: &'static str,
    pub(super) min_chars: usize,
    pub(super) apply: fn(&str) -> Option<RuleMatch>,
}

pub(super) const SENTENCE_RULES: [SentenceRule; 4] = [
    SentenceRule {
        name: "technical_insight",
        min_chars: 20,
        apply: technical_insight,
    },
    SentenceRule {
        name: "breakthrough_moment",
        min_chars: 10,
        apply: breakthrough_moment,
    },
    SentenceRule {
        name: "collaboration_pattern",
        min_chars: 15,
        apply: collaboration_pattern,
    },
    SentenceRule {
        name: "solution_approach",
        min_chars: 20,
        apply: solution_approach,
    },
];

/// Split text after every `.`, `!` or `?`. Terminators stay on their sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            push_trimmed(&mut sentences, &current);
            current.clear();
        }
    }
    push_trimmed(&mut sentences, &current);

    sentences
}

fn push_trimmed(sentences: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
}

/// Number of distinct terms from `terms` present in an already-lowercased sentence
fn count_terms(lower: &str, terms: &[&str]) -> usize {
    terms.iter().filter(|term| lower.contains(*term)).count()
}

pub fn technical_insight(sentence: &str) -> Option<RuleMatch> {
    let lower = sentence.to_lowercase();
    let count = count_terms(&lower, &TECHNICAL_KEYWORDS);
    if count < 2 {
        return None;
    }

    let confidence =
        (count as f64 / TECHNICAL_KEYWORDS.len() as f64 * 2.0).min(TECHNICAL_CONFIDENCE_CAP);
    Some(RuleMatch {
        pattern_type: PatternType::TechnicalInsight,
        content: sentence.to_string(),
        context: format!("Technical discussion touching {} technical concepts", count),
        confidence,
    })
}

pub fn breakthrough_moment(sentence: &str) -> Option<RuleMatch> {
    let lower = sentence.to_lowercase();
    let indicator = BREAKTHROUGH_INDICATORS
        .iter()
        .find(|indicator| lower.contains(*indicator))?;

    let confidence = if *indicator == SPECIAL_MARKER {
        SPECIAL_MARKER_CONFIDENCE
    } else {
        BREAKTHROUGH_CONFIDENCE
    };
    Some(RuleMatch {
        pattern_type: PatternType::BreakthroughMoment,
        content: sentence.to_string(),
        context: format!("Breakthrough signalled by \"{}\"", indicator),
        confidence,
    })
}

pub fn collaboration_pattern(sentence: &str) -> Option<RuleMatch> {
    let lower = sentence.to_lowercase();
    let count = count_terms(&lower, &COLLABORATION_INDICATORS);
    if count == 0 {
        return None;
    }

    Some(RuleMatch {
        pattern_type: PatternType::CollaborationPattern,
        content: sentence.to_string(),
        context: format!("Collaborative exchange with {} collaboration cues", count),
        confidence: (count as f64 / 3.0).min(COLLABORATION_CONFIDENCE_CAP),
    })
}

pub fn solution_approach(sentence: &str) -> Option<RuleMatch> {
    let lower = sentence.to_lowercase();
    if !(lower.contains("how") || lower.contains("should")) {
        return None;
    }

    let count = count_terms(&lower, &SOLUTION_KEYWORDS);
    if count == 0 {
        return None;
    }

    Some(RuleMatch {
        pattern_type: PatternType::SolutionApproach,
        content: sentence.to_string(),
        context: format!("Solution discussion with {} solution terms", count),
        confidence: (count as f64 / 2.0).min(SOLUTION_CONFIDENCE_CAP),
    })
}

/// Whole-transcript rule: summarize a multi-step tool workflow
pub fn tool_sequence(tool_calls: &[ToolCall]) -> Option<RuleMatch> {
    if tool_calls.len() < TOOL_SEQUENCE_MIN_CALLS {
        return None;
    }

    let names: Vec<&str> = tool_calls
        .iter()
        .map(|call| if call.name.is_empty() { "unknown" } else { call.name.as_str() })
        .collect();

    Some(RuleMatch {
        pattern_type: PatternType::SolutionApproach,
        content: format!("Tool sequence: {}", names.join(" -> ")),
        context: format!("Multi-step workflow using {} tool invocations", tool_calls.len()),
        confidence: TOOL_SEQUENCE_CONFIDENCE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sentences_keeps_terminators() {
        let sentences = split_sentences("First one. Aha! Is it?  trailing bit");
        assert_eq!(sentences, vec!["First one.", "Aha!", "Is it?", "trailing bit"]);
        assert!(split_sentences("  ").is_empty());
    }

    #[test]
    fn test_technical_requires_two_keywords() {
        assert!(technical_insight("The database needs some careful thought today").is_none());

        let hit = technical_insight("The database design needs some careful thought today").unwrap();
        assert_eq!(hit.pattern_type, PatternType::TechnicalInsight);
        assert_eq!(hit.confidence, (2.0_f64 / 14.0 * 2.0).min(0.9));
    }

    #[test]
    fn test_technical_confidence_is_capped() {
        let sentence = "implementation architecture pattern algorithm api database framework optimization";
        let hit = technical_insight(sentence).unwrap();
        assert_eq!(hit.confidence, 0.9);
    }

    #[test]
    fn test_special_marker_confidence() {
        let hit = breakthrough_moment("That is Exactly :P what we needed").unwrap();
        assert_eq!(hit.confidence, 0.95);

        let hit = breakthrough_moment("This was a real breakthrough for us").unwrap();
        assert_eq!(hit.confidence, 0.7);
    }

    #[test]
    fn test_breakthrough_first_indicator_wins() {
        let hit = breakthrough_moment("Breakthrough, and exactly :p too").unwrap();
        assert_eq!(hit.confidence, 0.95);
        assert!(hit.context.contains("exactly :p"));
        assert!(breakthrough_moment("Nothing to see here").is_none());
    }

    #[test]
    fn test_collaboration_confidence() {
        let one = collaboration_pattern("Let's try the other branch first").unwrap();
        assert!((one.confidence - 1.0 / 3.0).abs() < 1e-9);

        let many = collaboration_pattern("We should work together, we can collaborate on it").unwrap();
        assert_eq!(many.confidence, 0.8);

        assert!(collaboration_pattern("I will do it alone").is_none());
    }

    #[test]
    fn test_solution_requires_how_or_should() {
        assert!(solution_approach("The fix is a better caching strategy").is_none());

        let hit = solution_approach("We should fix this with a caching strategy").unwrap();
        assert_eq!(hit.confidence, 0.7);

        let hit = solution_approach("Here is how the fix went in").unwrap();
        assert_eq!(hit.confidence, 0.5);
    }

    #[test]
    fn test_tool_sequence() {
        let calls = vec![ToolCall::named("Read"), ToolCall::named("Edit")];
        assert!(tool_sequence(&calls).is_none());

        let calls = vec![ToolCall::named("Read"), ToolCall::named("Edit"), ToolCall::named("Bash")];
        let hit = tool_sequence(&calls).unwrap();
        assert_eq!(hit.content, "Tool sequence: Read -> Edit -> Bash");
        assert_eq!(hit.confidence, 0.6);
        assert_eq!(hit.pattern_type, PatternType::SolutionApproach);
    }
}
