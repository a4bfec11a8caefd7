//! ============================================================================
//! Search Module - Unified ranking over transcripts and memory banks
//! ============================================================================
//! ```text
//! query ─┬─> TranscriptSearch ──> session hits ─┐
//!        └─> BankStore::search_all_banks ───────┴─> rank ─> results
//! ```
//!
//! Ranking multiplies the raw relevance score by:
//! - 1.1 for session hits, 1.15 for bank hits scoring above 8
//! - 1.2 when the result is at most 30 days old, else 1.1 up to 90 days
//! - 1.3 when the content contains the whole query
//! ============================================================================

mod ranker;
mod transcript;
mod types;

pub use ranker::{
    final_score, hit_to_result, key_terms, query_natural_language, rank, recommendations,
    search_all,
};
pub use transcript::{NoTranscripts, StaticTranscripts, TranscriptSearch};
pub use types::{NaturalLanguageAnswer, ResultContext, ResultSource, TranscriptHit, UnifiedResult};
