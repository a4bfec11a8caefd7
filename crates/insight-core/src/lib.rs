//! ============================================================================
//! INSIGHT-CORE: Session Knowledge Aggregator
//! ============================================================================
//! This crate handles all backend logic for Insight:
//! - Memory banks: line-delimited JSON knowledge graphs, one file per bank
//! - Pattern extraction: keyword heuristics over session transcripts
//! - Unified search: one ranked list across transcripts and banks
//! - Session files: reading transcripts and searching them on disk
//! ============================================================================

pub mod bank;
pub mod error;
pub mod extract;
pub mod manager;
pub mod search;
pub mod sessions;

// Re-export main types for convenience
pub use bank::{BankConfig, BankStore, BankSummary, Entity, InsightConfig, KnowledgeGraph, Relation};
pub use error::{InsightError, InsightResult};
pub use extract::{Pattern, PatternType, ToolCall, Transcript};
pub use manager::{InsightManager, ProcessingReport, SystemStats};
pub use search::{
    NaturalLanguageAnswer, NoTranscripts, ResultSource, TranscriptHit, TranscriptSearch,
    UnifiedResult,
};
pub use sessions::FsTranscriptSearch;
