//! ============================================================================
//! Pattern Conversion - Patterns to entities, banks and relations
//! ============================================================================

use serde::Serialize;

use super::types::{Pattern, PatternType};
use crate::bank::{
    Entity, Relation, BREAKTHROUGH_MOMENTS, COLLABORATION_INSIGHTS, DEVELOPMENT_PATTERNS,
};

const NAME_HEAD_CHARS: usize = 50;

pub const CONSCIOUSNESS_FLOW: &str = "consciousness_flow";
pub const THEMATIC_CONNECTION: &str = "thematic_connection";

/// Destination bank for a pattern type.
/// project_evolution and community_wisdom are curated by hand and never targeted here.
pub fn target_bank(pattern_type: PatternType) -> &'static str {
    match pattern_type {
        PatternType::TechnicalInsight | PatternType::SolutionApproach => DEVELOPMENT_PATTERNS,
        PatternType::BreakthroughMoment => BREAKTHROUGH_MOMENTS,
        PatternType::CollaborationPattern => COLLABORATION_INSIGHTS,
    }
}

/// `{prefix}: {first 50 alphanumeric/space chars}... ({epoch ms})`
pub fn entity_name(pattern: &Pattern) -> String {
    let head: String = pattern
        .content
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ')
        .take(NAME_HEAD_CHARS)
        .collect();

    format!(
        "{}: {}... ({})",
        pattern.pattern_type.display_name(),
        head,
        pattern.extracted_from.timestamp.timestamp_millis()
    )
}

pub fn pattern_to_entity(pattern: &Pattern) -> Entity {
    let source = &pattern.extracted_from;
    let mut entity = Entity::new(entity_name(pattern), pattern.pattern_type.as_str()).with_observations([
        pattern.content.clone(),
        format!("Context: {}", pattern.context),
        format!("Confidence: {:.2}", pattern.confidence),
        format!(
            "Source: session {} in project {}",
            source.session_id, source.project_id
        ),
        format!("Extracted at: {}", source.timestamp.to_rfc3339()),
    ]);

    entity.project_id = Some(source.project_id.clone());
    entity.session_id = Some(source.session_id.clone());
    entity.extracted_from = Some(format!("session:{}", source.session_id));
    entity.confidence_score = Some(pattern.confidence);
    entity
}

/// An entity paired with the bank it should be stored in
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAssignment {
    pub bank: &'static str,
    pub entity: Entity,
}

pub fn assign_banks(patterns: &[Pattern]) -> Vec<BankAssignment> {
    patterns
        .iter()
        .map(|pattern| BankAssignment {
            bank: target_bank(pattern.pattern_type),
            entity: pattern_to_entity(pattern),
        })
        .collect()
}

/// Link consecutive entities by flow, and consecutive same-type entities by theme
pub fn build_relations(entities: &[Entity]) -> Vec<Relation> {
    let mut relations = Vec::new();

    for pair in entities.windows(2) {
        relations.push(Relation::new(&pair[0].name, &pair[1].name, CONSCIOUSNESS_FLOW));
    }

    let mut last_of_type: Vec<(&str, &str)> = Vec::new();
    for entity in entities {
        let entity_type = entity.entity_type.as_str();
        match last_of_type.iter_mut().find(|(t, _)| *t == entity_type) {
            Some(slot) => {
                relations.push(Relation::new(slot.1, entity.name.as_str(), THEMATIC_CONNECTION));
                slot.1 = entity.name.as_str();
            }
            None => last_of_type.push((entity_type, entity.name.as_str())),
        }
    }

    relations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::types::PatternSource;
    use chrono::{TimeZone, Utc};

    fn pattern(pattern_type: PatternType, content: &str) -> Pattern {
        Pattern {
            pattern_type,
            content: content.to_string(),
            context: "ctx".to_string(),
            confidence: 0.7,
            extracted_from: PatternSource {
                session_id: "sess-1".to_string(),
                project_id: "proj-a".to_string(),
                timestamp: Utc.timestamp_millis_opt(1_700_000_000_123).unwrap(),
            },
        }
    }

    #[test]
    fn test_entity_name_format() {
        let p = pattern(PatternType::BreakthroughMoment, "Aha! It's the cache, again.");
        assert_eq!(entity_name(&p), "Breakthrough: Aha Its the cache again... (1700000000123)");

        let long = "a".repeat(80);
        let p = pattern(PatternType::TechnicalInsight, &long);
        assert_eq!(
            entity_name(&p),
            format!("Technical Insight: {}... (1700000000123)", "a".repeat(50))
        );
    }

    #[test]
    fn test_pattern_to_entity_observations() {
        let p = pattern(PatternType::SolutionApproach, "We should fix it with a retry strategy.");
        let entity = pattern_to_entity(&p);

        assert_eq!(entity.entity_type, "solution_approach");
        assert_eq!(entity.observations.len(), 5);
        assert_eq!(entity.observations[0], p.content);
        assert_eq!(entity.observations[2], "Confidence: 0.70");
        assert_eq!(entity.observations[3], "Source: session sess-1 in project proj-a");
        assert_eq!(entity.session_id.as_deref(), Some("sess-1"));
        assert_eq!(entity.confidence_score, Some(0.7));
        assert!(entity.created_at.is_none());
    }

    #[test]
    fn test_target_bank_mapping() {
        assert_eq!(target_bank(PatternType::TechnicalInsight), DEVELOPMENT_PATTERNS);
        assert_eq!(target_bank(PatternType::SolutionApproach), DEVELOPMENT_PATTERNS);
        assert_eq!(target_bank(PatternType::BreakthroughMoment), BREAKTHROUGH_MOMENTS);
        assert_eq!(target_bank(PatternType::CollaborationPattern), COLLABORATION_INSIGHTS);
    }

    #[test]
    fn test_build_relations() {
        let entities = vec![
            Entity::new("t1", "technical_insight"),
            Entity::new("b1", "breakthrough_moment"),
            Entity::new("t2", "technical_insight"),
            Entity::new("t3", "technical_insight"),
        ];
        let relations = build_relations(&entities);

        let flow: Vec<_> = relations
            .iter()
            .filter(|r| r.relation_type == CONSCIOUSNESS_FLOW)
            .map(|r| (r.from.as_str(), r.to.as_str()))
            .collect();
        assert_eq!(flow, vec![("t1", "b1"), ("b1", "t2"), ("t2", "t3")]);

        let thematic: Vec<_> = relations
            .iter()
            .filter(|r| r.relation_type == THEMATIC_CONNECTION)
            .map(|r| (r.from.as_str(), r.to.as_str()))
            .collect();
        assert_eq!(thematic, vec![("t1", "t2"), ("t2", "t3")]);

        assert!(build_relations(&[]).is_empty());
    }
}
