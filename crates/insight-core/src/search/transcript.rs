//! ============================================================================
//! Transcript Search Seam - Pluggable source of session hits
//! ============================================================================
//! The ranker never reads session files itself; it asks an implementation
//! of `TranscriptSearch` and maps the hits into unified results.
//! ============================================================================

use anyhow::Result;
use async_trait::async_trait;

use super::types::TranscriptHit;

/// Anything that can search session transcripts by keyword
#[async_trait]
pub trait TranscriptSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<TranscriptHit>>;
}

/// Transcript source that never matches (bank-only queries)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTranscripts;

#[async_trait]
impl TranscriptSearch for NoTranscripts {
    async fn search(&self, _query: &str) -> Result<Vec<TranscriptHit>> {
        Ok(Vec::new())
    }
}

/// Fixed, in-memory hit list filtered by case-insensitive snippet match.
/// Useful for tests and for replaying saved search output.
#[derive(Debug, Clone, Default)]
pub struct StaticTranscripts {
    hits: Vec<TranscriptHit>,
}

impl StaticTranscripts {
    pub fn new(hits: Vec<TranscriptHit>) -> Self {
        Self { hits }
    }
}

#[async_trait]
impl TranscriptSearch for StaticTranscripts {
    async fn search(&self, query: &str) -> Result<Vec<TranscriptHit>> {
        let query = query.to_lowercase();
        Ok(self
            .hits
            .iter()
            .filter(|hit| {
                hit.matched_content
                    .iter()
                    .any(|snippet| snippet.to_lowercase().contains(&query))
            })
            .cloned()
            .collect())
    }
}
