//! ============================================================================
//! Bank Module - File-backed knowledge graphs grouped into named banks
//! ============================================================================
//! Each bank is one line-delimited JSON file holding entities and relations.
//!
//! ## File format
//! ```text
//! {"type":"entity","name":"Auth Pattern","entityType":"technical_insight","observations":["uses JWT"],"memoryBank":"development_patterns"}
//! {"type":"relation","from":"Auth Pattern","to":"Session Cache","relationType":"uses","memoryBank":"development_patterns"}
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use insight_core::bank::{BankStore, Entity};
//!
//! let store = BankStore::with_defaults()?;
//! store.create_entities("development_patterns", vec![Entity::new("Auth Pattern", "technical_insight")]).await?;
//! let hits = store.search_bank("development_patterns", "auth").await?;
//! ```
//! ============================================================================

pub mod config;
mod store;
mod types;

pub use config::{
    default_banks, expand_tilde, BankConfig, InsightConfig, BREAKTHROUGH_MOMENTS,
    COLLABORATION_INSIGHTS, COMMUNITY_WISDOM, DEVELOPMENT_PATTERNS, PROJECT_EVOLUTION,
};
pub use store::BankStore;
pub use types::{BankRecord, BankSummary, Entity, KnowledgeGraph, Relation};
