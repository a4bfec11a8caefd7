//! ============================================================================
//! Bank Types - Entities, relations and the per-bank knowledge graph
//! ============================================================================
//! Every type here is serialized in camelCase so bank files stay readable by
//! other tools that share the same line-delimited format.
//! ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named knowledge unit, unique by name within its bank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub name: String,
    pub entity_type: String,
    /// Append-only, duplicates suppressed on insert
    #[serde(default)]
    pub observations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_bank: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Stamped once by the store when the entity is first persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_from: Option<String>,
    /// Extraction confidence (0.0 - 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
}

impl Entity {
    /// Create a bare entity with no observations or metadata
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            observations: Vec::new(),
            memory_bank: None,
            project_id: None,
            session_id: None,
            created_at: None,
            extracted_from: None,
            confidence_score: None,
        }
    }

    pub fn with_observations<I, S>(mut self, observations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.observations = observations.into_iter().map(Into::into).collect();
        self
    }
}

/// Directed, typed edge between two entity names.
/// Endpoints are not checked for existence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub from: String,
    pub to: String,
    pub relation_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_bank: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<f64>,
}

impl Relation {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        relation_type: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            relation_type: relation_type.into(),
            memory_bank: None,
            created_at: None,
            strength: None,
        }
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = Some(strength);
        self
    }

    /// Two relations with the same (from, to, relation_type) are duplicates
    pub fn same_edge(&self, other: &Relation) -> bool {
        self.from == other.from && self.to == other.to && self.relation_type == other.relation_type
    }
}

/// In-memory copy of one bank's contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
}

impl KnowledgeGraph {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relations.is_empty()
    }

    pub fn find_entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn find_entity_mut(&mut self, name: &str) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.name == name)
    }

    pub fn has_entity(&self, name: &str) -> bool {
        self.find_entity(name).is_some()
    }

    pub fn has_relation(&self, relation: &Relation) -> bool {
        self.relations.iter().any(|r| r.same_edge(relation))
    }
}

/// One line of a bank file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BankRecord {
    Entity(Entity),
    Relation(Relation),
}

/// Per-bank listing row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankSummary {
    pub name: String,
    pub description: String,
    pub entity_count: usize,
    pub relation_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_record_shape() {
        let mut entity = Entity::new("Auth Pattern", "technical_insight").with_observations(["uses JWT"]);
        entity.memory_bank = Some("development_patterns".to_string());

        let line = serde_json::to_string(&BankRecord::Entity(entity.clone())).unwrap();
        assert!(line.contains(r#""type":"entity""#));
        assert!(line.contains(r#""entityType":"technical_insight""#));
        assert!(line.contains(r#""memoryBank":"development_patterns""#));
        assert!(!line.contains("createdAt"));

        match serde_json::from_str::<BankRecord>(&line).unwrap() {
            BankRecord::Entity(parsed) => assert_eq!(parsed, entity),
            other => panic!("expected entity, got {:?}", other),
        }
    }

    #[test]
    fn test_relation_record_without_optional_fields() {
        let line = r#"{"type":"relation","from":"A","to":"B","relationType":"uses"}"#;
        match serde_json::from_str::<BankRecord>(line).unwrap() {
            BankRecord::Relation(r) => {
                assert_eq!(r.from, "A");
                assert_eq!(r.relation_type, "uses");
                assert!(r.strength.is_none());
            }
            other => panic!("expected relation, got {:?}", other),
        }
    }

    #[test]
    fn test_same_edge_ignores_metadata() {
        let a = Relation::new("A", "B", "uses").with_strength(0.2);
        let b = Relation::new("A", "B", "uses").with_strength(0.9);
        let c = Relation::new("A", "B", "extends");
        assert!(a.same_edge(&b));
        assert!(!a.same_edge(&c));
    }
}
