//! ============================================================================
//! Insight Manager - Orchestrates extraction, storage and unified queries
//! ============================================================================
//! High-level API over the bank store, the pattern extractor and the ranker.
//! Holds no state of its own beyond the store registry; every call reloads
//! the banks it touches.
//! ============================================================================

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::bank::{BankStore, BankSummary, Entity, InsightConfig, Relation};
use crate::extract::{assign_banks, build_relations, extract_patterns, Pattern, Transcript};
use crate::search::{self, NaturalLanguageAnswer, TranscriptSearch, UnifiedResult};

/// Outcome of processing one transcript
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingReport {
    pub session_id: String,
    pub project_id: String,
    pub patterns_found: usize,
    pub entities_stored: usize,
    pub relations_stored: usize,
    /// Newly stored entity count per bank, in first-seen order
    pub per_bank: Vec<(String, usize)>,
}

/// Aggregate counts across every bank
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub bank_count: usize,
    pub total_entities: usize,
    pub total_relations: usize,
    pub banks: Vec<BankSummary>,
}

/// Wires the bank store, extractor and ranker together
pub struct InsightManager {
    store: BankStore,
}

impl InsightManager {
    /// Create a manager over the configured bank table
    pub fn new(config: &InsightConfig) -> Result<Self> {
        let store = BankStore::new(config.banks.clone())?;
        Ok(Self { store })
    }

    pub fn with_store(store: BankStore) -> Self {
        Self { store }
    }

    /// Create any missing bank files
    pub async fn initialize(&self) -> Result<Vec<String>> {
        Ok(self.store.initialize_all_banks().await?)
    }

    /// Patterns a transcript would produce, without storing anything
    pub fn preview_patterns(&self, transcript: &Transcript) -> Vec<Pattern> {
        extract_patterns(transcript)
    }

    /// Extract patterns from a transcript and store them in their target banks
    pub async fn process_transcript(&self, transcript: &Transcript) -> Result<ProcessingReport> {
        let (report, _) = self.store_patterns(transcript).await?;
        Ok(report)
    }

    /// Like `process_transcript`, also linking the stored entities into a flow.
    /// Each relation is stored in the bank of its `from` entity.
    pub async fn process_transcript_linked(&self, transcript: &Transcript) -> Result<ProcessingReport> {
        let (mut report, stored) = self.store_patterns(transcript).await?;

        let entities: Vec<Entity> = stored.iter().map(|(_, e)| e.clone()).collect();
        let mut by_bank: Vec<(&str, Vec<Relation>)> = Vec::new();
        for relation in build_relations(&entities) {
            let Some(bank) = stored
                .iter()
                .find(|(_, e)| e.name == relation.from)
                .map(|(bank, _)| *bank)
            else {
                continue;
            };
            match by_bank.iter_mut().find(|(b, _)| *b == bank) {
                Some((_, relations)) => relations.push(relation),
                None => by_bank.push((bank, vec![relation])),
            }
        }

        for (bank, relations) in by_bank {
            report.relations_stored += self.store.create_relations(bank, relations).await?.len();
        }

        info!(
            "Linked session {} with {} relations",
            report.session_id, report.relations_stored
        );
        Ok(report)
    }

    async fn store_patterns(
        &self,
        transcript: &Transcript,
    ) -> Result<(ProcessingReport, Vec<(&'static str, Entity)>)> {
        let patterns = extract_patterns(transcript);
        let mut report = ProcessingReport {
            session_id: transcript.session_id.clone(),
            project_id: transcript.project_id.clone(),
            patterns_found: patterns.len(),
            ..Default::default()
        };

        // Extraction index travels with each entity; stored order is restored from it
        let mut grouped: Vec<(&'static str, Vec<(usize, Entity)>)> = Vec::new();
        for (index, assignment) in assign_banks(&patterns).into_iter().enumerate() {
            let item = (index, assignment.entity);
            match grouped.iter_mut().find(|(bank, _)| *bank == assignment.bank) {
                Some((_, batch)) => batch.push(item),
                None => grouped.push((assignment.bank, vec![item])),
            }
        }

        let mut stored: Vec<(usize, &'static str, Entity)> = Vec::new();
        for (bank, batch) in grouped {
            let order: Vec<(usize, String)> = batch
                .iter()
                .map(|(index, entity)| (*index, entity.name.clone()))
                .collect();
            let entities = batch.into_iter().map(|(_, entity)| entity).collect();

            let created = self.store.create_entities(bank, entities).await?;
            debug!("Stored {} entities from extraction in {}", created.len(), bank);
            report.entities_stored += created.len();
            report.per_bank.push((bank.to_string(), created.len()));

            for entity in created {
                let index = order
                    .iter()
                    .find(|(_, name)| *name == entity.name)
                    .map_or(usize::MAX, |(index, _)| *index);
                stored.push((index, bank, entity));
            }
        }
        stored.sort_by_key(|(index, _, _)| *index);

        info!(
            "Processed session {}: {} patterns, {} new entities",
            report.session_id, report.patterns_found, report.entities_stored
        );
        Ok((
            report,
            stored
                .into_iter()
                .map(|(_, bank, entity)| (bank, entity))
                .collect(),
        ))
    }

    /// Ranked results across transcripts and every bank
    pub async fn query(
        &self,
        text: &str,
        transcripts: &dyn TranscriptSearch,
    ) -> Result<Vec<UnifiedResult>> {
        search::search_all(&self.store, transcripts, text).await
    }

    /// Direct matches, related insights and recommendations for a question
    pub async fn query_natural_language(
        &self,
        text: &str,
        transcripts: &dyn TranscriptSearch,
    ) -> Result<NaturalLanguageAnswer> {
        search::query_natural_language(&self.store, transcripts, text).await
    }

    /// Bank count plus entity and relation totals
    pub async fn stats(&self) -> Result<SystemStats> {
        let banks = self.store.list_banks().await?;
        Ok(SystemStats {
            bank_count: banks.len(),
            total_entities: banks.iter().map(|b| b.entity_count).sum(),
            total_relations: banks.iter().map(|b| b.relation_count).sum(),
            banks,
        })
    }

    // ========================================================================
    // Bank pass-throughs
    // ========================================================================

    pub async fn create_entities(&self, bank: &str, entities: Vec<Entity>) -> Result<Vec<Entity>> {
        Ok(self.store.create_entities(bank, entities).await?)
    }

    pub async fn create_relations(&self, bank: &str, relations: Vec<Relation>) -> Result<Vec<Relation>> {
        Ok(self.store.create_relations(bank, relations).await?)
    }

    pub async fn add_observations(
        &self,
        bank: &str,
        entity: &str,
        observations: Vec<String>,
    ) -> Result<Vec<String>> {
        Ok(self.store.add_observations(bank, entity, observations).await?)
    }

    pub async fn search_bank(&self, bank: &str, query: &str) -> Result<Vec<UnifiedResult>> {
        Ok(self.store.search_bank(bank, query).await?)
    }

    pub async fn search_all_banks(&self, query: &str) -> Result<Vec<UnifiedResult>> {
        Ok(self.store.search_all_banks(query).await?)
    }

    pub async fn list_banks(&self) -> Result<Vec<BankSummary>> {
        Ok(self.store.list_banks().await?)
    }

    /// Get reference to the store (for advanced operations)
    pub fn store(&self) -> &BankStore {
        &self.store
    }
}
