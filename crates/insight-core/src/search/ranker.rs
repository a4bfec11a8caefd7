// ============================================================================
// Unified Ranker - merges session hits and bank hits into one ordering
// ============================================================================
// The final score is a sort key only. It is computed beside each result,
// used to order the list, then dropped; callers see the raw relevance score.
// ============================================================================

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use std::collections::HashSet;
use tracing::debug;

use super::transcript::TranscriptSearch;
use super::types::{NaturalLanguageAnswer, ResultContext, ResultSource, TranscriptHit, UnifiedResult};
use crate::bank::BankStore;

const SESSION_BOOST: f64 = 1.1;
const STRONG_BANK_BOOST: f64 = 1.15;
const STRONG_BANK_THRESHOLD: f64 = 8.0;
const RECENT_BOOST: f64 = 1.2;
const RECENT_DAYS: f64 = 30.0;
const AGING_BOOST: f64 = 1.1;
const AGING_DAYS: f64 = 90.0;
const EXACT_PHRASE_BOOST: f64 = 1.3;
const MS_PER_DAY: f64 = 86_400_000.0;

const MAX_KEY_TERMS: usize = 5;
const RELATED_PER_TERM: usize = 3;
const MAX_DIRECT_MATCHES: usize = 10;
const MAX_RELATED_INSIGHTS: usize = 5;

const STOP_WORDS: [&str; 22] = [
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "is", "are", "was", "were", "what", "how", "that",
];

/// Map a transcript hit into the unified shape
pub fn hit_to_result(hit: TranscriptHit) -> UnifiedResult {
    let timestamp = hit.timestamp.as_deref().and_then(|raw| {
        match DateTime::parse_from_rfc3339(raw) {
            Ok(ts) => Some(ts.with_timezone(&Utc)),
            Err(e) => {
                debug!("Ignoring unparseable session timestamp {}: {}", raw, e);
                None
            }
        }
    });

    UnifiedResult {
        source: ResultSource::Session,
        bank_name: None,
        entity_name: None,
        content: hit.matched_content.join(" ... "),
        relevance_score: hit.relevance,
        context: ResultContext {
            project_id: non_empty(hit.project_id),
            session_id: non_empty(hit.session_id),
            timestamp,
        },
    }
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

/// Composite ranking key. `query_lower` must already be lowercase.
pub fn final_score(result: &UnifiedResult, query_lower: &str, now: DateTime<Utc>) -> f64 {
    let mut score = result.relevance_score;

    match result.source {
        ResultSource::Session => score *= SESSION_BOOST,
        ResultSource::MemoryBank if result.relevance_score > STRONG_BANK_THRESHOLD => {
            score *= STRONG_BANK_BOOST
        }
        ResultSource::MemoryBank => {}
    }

    if let Some(timestamp) = result.context.timestamp {
        let age_days = (now - timestamp).num_milliseconds() as f64 / MS_PER_DAY;
        if age_days <= RECENT_DAYS {
            score *= RECENT_BOOST;
        } else if age_days <= AGING_DAYS {
            score *= AGING_BOOST;
        }
    }

    if result.content.to_lowercase().contains(query_lower) {
        score *= EXACT_PHRASE_BOOST;
    }

    score
}

/// Order results by final score, best first. Ties keep their input order.
pub fn rank(results: Vec<UnifiedResult>, query: &str, now: DateTime<Utc>) -> Vec<UnifiedResult> {
    let query_lower = query.to_lowercase();
    let mut scored: Vec<(f64, UnifiedResult)> = results
        .into_iter()
        .map(|result| (final_score(&result, &query_lower, now), result))
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().map(|(_, result)| result).collect()
}

/// Search transcripts and every bank, then rank the merged list
pub async fn search_all(
    store: &BankStore,
    transcripts: &dyn TranscriptSearch,
    query: &str,
) -> Result<Vec<UnifiedResult>> {
    let mut results: Vec<UnifiedResult> = transcripts
        .search(query)
        .await?
        .into_iter()
        .map(hit_to_result)
        .collect();
    let session_count = results.len();

    results.extend(store.search_all_banks(query).await?);

    debug!(
        "Unified search '{}': {} session hits, {} bank hits",
        query,
        session_count,
        results.len() - session_count
    );
    Ok(rank(results, query, Utc::now()))
}

/// Up to five lowercase, non-stop-word terms longer than two characters
pub fn key_terms(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(str::to_lowercase)
        .filter(|token| token.chars().count() > 2 && !STOP_WORDS.contains(&token.as_str()))
        .take(MAX_KEY_TERMS)
        .collect()
}

/// Advisory hints derived from where the matches came from
pub fn recommendations(direct: &[UnifiedResult], related: &[UnifiedResult]) -> Vec<String> {
    let mut hints = Vec::new();

    let sessions = direct.iter().filter(|r| r.source == ResultSource::Session).count();
    let banks = direct.len() - sessions;

    if direct.is_empty() {
        hints.push(
            "No direct matches found. Try broader search terms or different keywords.".to_string(),
        );
    }
    if sessions > banks {
        hints.push(
            "Most matches come from session transcripts. Consider extracting patterns to preserve them in memory banks."
                .to_string(),
        );
    }
    if banks > sessions {
        hints.push(
            "Memory banks already document this topic well. Build on the stored entities.".to_string(),
        );
    }
    if related.len() > 3 {
        hints.push(
            "Related insights span several areas. Consider exploring connections across projects."
                .to_string(),
        );
    }

    hints
}

/// Answer a free-text question with direct matches, related insights and hints
pub async fn query_natural_language(
    store: &BankStore,
    transcripts: &dyn TranscriptSearch,
    text: &str,
) -> Result<NaturalLanguageAnswer> {
    let terms = key_terms(text);
    let direct = search_all(store, transcripts, text).await?;

    let per_term = join_all(terms.iter().map(|term| search_all(store, transcripts, term))).await;
    let mut pool = Vec::new();
    for results in per_term {
        pool.extend(results?.into_iter().take(RELATED_PER_TERM));
    }

    let direct_keys: HashSet<(&str, Option<&str>)> = direct.iter().map(|r| r.dedup_key()).collect();
    let related: Vec<UnifiedResult> = pool
        .into_iter()
        .filter(|r| !direct_keys.contains(&r.dedup_key()))
        .collect();

    let recommendations = recommendations(&direct, &related);
    debug!(
        "Natural language query '{}': {} terms, {} direct, {} related",
        text,
        terms.len(),
        direct.len(),
        related.len()
    );

    Ok(NaturalLanguageAnswer {
        query: text.to_string(),
        key_terms: terms,
        direct_matches: direct.into_iter().take(MAX_DIRECT_MATCHES).collect(),
        related_insights: related.into_iter().take(MAX_RELATED_INSIGHTS).collect(),
        recommendations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::{default_banks, Entity, DEVELOPMENT_PATTERNS};
    use crate::search::transcript::{NoTranscripts, StaticTranscripts};
    use chrono::Duration;
    use tempfile::TempDir;

    fn result(source: ResultSource, score: f64, content: &str) -> UnifiedResult {
        UnifiedResult {
            source,
            bank_name: None,
            entity_name: None,
            content: content.to_string(),
            relevance_score: score,
            context: ResultContext::default(),
        }
    }

    fn aged(mut r: UnifiedResult, now: DateTime<Utc>, days: i64) -> UnifiedResult {
        r.context.timestamp = Some(now - Duration::days(days));
        r
    }

    fn temp_store(dir: &TempDir) -> BankStore {
        let configs = default_banks()
            .into_iter()
            .map(|mut config| {
                config.file_path = dir
                    .path()
                    .join(format!("{}.jsonl", config.name))
                    .to_string_lossy()
                    .into_owned();
                config
            })
            .collect();
        BankStore::new(configs).unwrap()
    }

    #[test]
    fn test_bank_overtakes_session_above_threshold() {
        let now = Utc::now();
        let bank = result(ResultSource::MemoryBank, 9.0, "unrelated");
        let session = result(ResultSource::Session, 9.0, "unrelated");
        assert!(final_score(&bank, "q", now) > final_score(&session, "q", now));

        let ranked = rank(vec![session.clone(), bank.clone()], "q", now);
        assert_eq!(ranked[0].source, ResultSource::MemoryBank);
    }

    #[test]
    fn test_session_wins_at_threshold() {
        let now = Utc::now();
        let bank = result(ResultSource::MemoryBank, 8.0, "unrelated");
        let session = result(ResultSource::Session, 8.0, "unrelated");
        assert!((final_score(&bank, "q", now) - 8.0).abs() < 1e-9);
        assert!((final_score(&session, "q", now) - 8.8).abs() < 1e-9);

        let ranked = rank(vec![bank, session], "q", now);
        assert_eq!(ranked[0].source, ResultSource::Session);
    }

    #[test]
    fn test_recency_boundaries() {
        let now = Utc::now();
        let base = result(ResultSource::MemoryBank, 1.0, "unrelated");
        let score = |days| final_score(&aged(base.clone(), now, days), "q", now);

        assert!((score(29) - 1.2).abs() < 1e-9);
        assert!((score(30) - 1.2).abs() < 1e-9);
        assert!((score(31) - 1.1).abs() < 1e-9);
        assert!((score(90) - 1.1).abs() < 1e-9);
        assert!((score(91) - 1.0).abs() < 1e-9);
        assert!((final_score(&base, "q", now) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_exact_phrase_boost_is_case_insensitive() {
        let now = Utc::now();
        let r = result(ResultSource::MemoryBank, 2.0, "Rotating JWT Keys nightly");
        assert!((final_score(&r, "jwt keys", now) - 2.6).abs() < 1e-9);
        assert!((final_score(&r, "oauth", now) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_rank_keeps_raw_scores() {
        let now = Utc::now();
        let ranked = rank(
            vec![
                result(ResultSource::MemoryBank, 3.0, "plain"),
                result(ResultSource::Session, 3.0, "mentions cache"),
            ],
            "cache",
            now,
        );
        assert_eq!(ranked[0].content, "mentions cache");
        assert_eq!(ranked[0].relevance_score, 3.0);
        assert_eq!(ranked[1].relevance_score, 3.0);
    }

    #[test]
    fn test_hit_to_result() {
        let hit = TranscriptHit {
            matched_content: vec!["first".to_string(), "second".to_string()],
            relevance: 4.0,
            session_id: "s1".to_string(),
            project_id: String::new(),
            timestamp: Some("2025-01-02T03:04:05Z".to_string()),
        };
        let r = hit_to_result(hit);
        assert_eq!(r.source, ResultSource::Session);
        assert_eq!(r.content, "first ... second");
        assert_eq!(r.context.session_id.as_deref(), Some("s1"));
        assert!(r.context.project_id.is_none());
        assert!(r.context.timestamp.is_some());

        let hit = TranscriptHit {
            timestamp: Some("yesterday".to_string()),
            ..Default::default()
        };
        assert!(hit_to_result(hit).context.timestamp.is_none());
    }

    #[test]
    fn test_key_terms() {
        let terms = key_terms("How do we handle the JWT refresh in our auth middleware layer today");
        assert_eq!(terms, vec!["handle", "jwt", "refresh", "our", "auth"]);
        assert!(key_terms("is it a an of").is_empty());
    }

    #[test]
    fn test_recommendations() {
        let none = recommendations(&[], &[]);
        assert_eq!(none.len(), 1);
        assert!(none[0].starts_with("No direct matches"));

        let sessions = vec![result(ResultSource::Session, 1.0, "x")];
        let hints = recommendations(&sessions, &[]);
        assert!(hints[0].contains("extracting patterns"));

        let banks = vec![result(ResultSource::MemoryBank, 1.0, "x")];
        let related = vec![result(ResultSource::Session, 1.0, "y"); 4];
        let hints = recommendations(&banks, &related);
        assert_eq!(hints.len(), 2);
        assert!(hints[1].contains("across projects"));
    }

    #[tokio::test]
    async fn test_search_all_merges_sources() {
        let dir = TempDir::new().unwrap();
        let store = temp_store(&dir);
        store
            .create_entities(
                DEVELOPMENT_PATTERNS,
                vec![Entity::new("Auth Pattern", "technical_insight").with_observations(["uses JWT"])],
            )
            .await
            .unwrap();

        let transcripts = StaticTranscripts::new(vec![TranscriptHit {
            matched_content: vec!["moved the JWT check into middleware".to_string()],
            relevance: 1.0,
            session_id: "s1".to_string(),
            project_id: "api".to_string(),
            timestamp: None,
        }]);

        let results = search_all(&store, &transcripts, "JWT").await.unwrap();
        assert_eq!(results.len(), 2);
        // Bank hit: 3 x 1.2 (fresh) x 1.3 (phrase) beats session hit: 1 x 1.1 x 1.3
        assert_eq!(results[0].source, ResultSource::MemoryBank);
        assert_eq!(results[1].source, ResultSource::Session);
    }

    #[tokio::test]
    async fn test_related_insights_skip_direct_duplicates() {
        let dir = TempDir::new().unwrap();
        let store = temp_store(&dir);

        let shared = TranscriptHit {
            matched_content: vec!["jwt refresh handled in middleware".to_string()],
            relevance: 2.0,
            session_id: "s1".to_string(),
            project_id: "api".to_string(),
            timestamp: None,
        };
        let other = TranscriptHit {
            matched_content: vec!["middleware ordering matters".to_string()],
            relevance: 1.0,
            session_id: "s2".to_string(),
            project_id: "api".to_string(),
            timestamp: None,
        };
        let transcripts = StaticTranscripts::new(vec![shared, other]);

        let answer = query_natural_language(&store, &transcripts, "jwt refresh handled in middleware")
            .await
            .unwrap();

        assert_eq!(answer.direct_matches.len(), 1);
        assert_eq!(answer.direct_matches[0].context.session_id.as_deref(), Some("s1"));
        assert!(answer
            .related_insights
            .iter()
            .all(|r| r.context.session_id.as_deref() != Some("s1")));
        assert!(answer
            .related_insights
            .iter()
            .any(|r| r.context.session_id.as_deref() == Some("s2")));
        assert!(answer.recommendations[0].contains("extracting patterns"));
    }

    #[tokio::test]
    async fn test_empty_query_result() {
        let dir = TempDir::new().unwrap();
        let store = temp_store(&dir);

        let answer = query_natural_language(&store, &NoTranscripts, "nothing stored yet")
            .await
            .unwrap();
        assert!(answer.direct_matches.is_empty());
        assert!(answer.related_insights.is_empty());
        assert_eq!(answer.key_terms, vec!["nothing", "stored", "yet"]);
        assert_eq!(answer.recommendations.len(), 1);
    }
}
