//! ============================================================================
//! Filesystem Transcript Search - Keyword hits over session files on disk
//! ============================================================================

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, warn};

use super::reader::{list_session_files, read_transcript};
use crate::extract::Transcript;
use crate::search::{TranscriptHit, TranscriptSearch};

const MAX_SNIPPETS: usize = 3;
const SNIPPET_CHARS: usize = 200;

/// Scans every session file under `root` on each search
#[derive(Debug, Clone)]
pub struct FsTranscriptSearch {
    root: PathBuf,
}

impl FsTranscriptSearch {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

#[async_trait]
impl TranscriptSearch for FsTranscriptSearch {
    async fn search(&self, query: &str) -> Result<Vec<TranscriptHit>> {
        let query = query.to_lowercase();
        let files = list_session_files(&self.root).await?;

        let mut hits = Vec::new();
        for path in &files {
            match read_transcript(path).await {
                Ok(transcript) => hits.extend(match_transcript(&transcript, &query)),
                Err(e) => warn!("Skipping unreadable session {}: {}", path.display(), e),
            }
        }

        debug!(
            "Transcript search '{}' matched {} of {} sessions",
            query,
            hits.len(),
            files.len()
        );
        Ok(hits)
    }
}

/// One hit per session with at least one matching message. `query` is lowercase.
pub fn match_transcript(transcript: &Transcript, query: &str) -> Option<TranscriptHit> {
    let matching: Vec<&String> = transcript
        .messages
        .iter()
        .filter(|message| message.to_lowercase().contains(query))
        .collect();

    if matching.is_empty() {
        return None;
    }

    Some(TranscriptHit {
        matched_content: matching
            .iter()
            .take(MAX_SNIPPETS)
            .map(|message| truncate(message, SNIPPET_CHARS))
            .collect(),
        relevance: matching.len() as f64,
        session_id: transcript.session_id.clone(),
        project_id: transcript.project_id.clone(),
        timestamp: transcript.timestamp.map(|ts| ts.to_rfc3339()),
    })
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn transcript(messages: &[&str]) -> Transcript {
        Transcript {
            session_id: "s1".to_string(),
            project_id: "p1".to_string(),
            messages: messages.iter().map(|m| m.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_match_transcript() {
        let t = transcript(&["JWT expired", "unrelated", "renew the jwt", "jwt again", "more JWT"]);
        let hit = match_transcript(&t, "jwt").unwrap();
        assert_eq!(hit.relevance, 4.0);
        assert_eq!(hit.matched_content.len(), 3);
        assert_eq!(hit.matched_content[0], "JWT expired");
        assert!(hit.timestamp.is_none());

        assert!(match_transcript(&t, "oauth").is_none());
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("héllo", 2), "hé...");
        assert_eq!(truncate("short", 10), "short");
    }

    #[tokio::test]
    async fn test_fs_search() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("proj");
        std::fs::create_dir_all(&project).unwrap();
        std::fs::write(
            project.join("one.jsonl"),
            r#"{"sessionId":"one","message":{"content":"Cache invalidation again"}}"#,
        )
        .unwrap();
        std::fs::write(
            project.join("two.jsonl"),
            r#"{"sessionId":"two","message":{"content":"Nothing relevant"}}"#,
        )
        .unwrap();

        let search = FsTranscriptSearch::new(dir.path());
        let hits = search.search("cache").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].session_id, "one");
        assert_eq!(hits[0].project_id, "proj");

        let empty = FsTranscriptSearch::new(dir.path().join("missing"));
        assert!(empty.search("cache").await.unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fs_search_survives_broken_project() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("proj");
        std::fs::create_dir_all(&project).unwrap();
        std::fs::write(
            project.join("one.jsonl"),
            r#"{"sessionId":"one","message":{"content":"Cache warmup"}}"#,
        )
        .unwrap();
        std::os::unix::fs::symlink(dir.path().join("deleted"), dir.path().join("old-proj")).unwrap();

        let hits = FsTranscriptSearch::new(dir.path()).search("cache").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].session_id, "one");
    }
}
