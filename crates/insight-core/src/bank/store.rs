// ============================================================================
// BankStore - line-delimited JSON knowledge graphs, one file per bank
// ============================================================================
// Every operation reloads the bank from disk, mutates the in-memory copy and
// rewrites the whole file. Each bank has its own async mutex held across the
// full load → mutate → save sequence, so concurrent writers to one bank are
// serialized while different banks never contend.
// ============================================================================

use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::config::{default_banks, expand_tilde, BankConfig};
use super::types::{BankRecord, BankSummary, Entity, KnowledgeGraph, Relation};
use crate::error::{InsightError, InsightResult};
use crate::search::{ResultContext, ResultSource, UnifiedResult};

const NAME_MATCH_SCORE: f64 = 10.0;
const TYPE_MATCH_SCORE: f64 = 5.0;
const OBSERVATION_MATCH_SCORE: f64 = 3.0;

/// A registered bank: its settings, resolved file path and write lock
struct Bank {
    config: BankConfig,
    path: PathBuf,
    lock: Mutex<()>,
}

/// Durable CRUD over the configured memory banks
pub struct BankStore {
    banks: Vec<Bank>,
}

impl BankStore {
    /// Build the bank registry. Paths are tilde-expanded here, once.
    pub fn new(configs: Vec<BankConfig>) -> InsightResult<Self> {
        let mut banks: Vec<Bank> = Vec::with_capacity(configs.len());

        for config in configs {
            if config.name.is_empty() {
                return Err(InsightError::Config("bank name must not be empty".to_string()));
            }
            if banks.iter().any(|b| b.config.name == config.name) {
                return Err(InsightError::Config(format!(
                    "duplicate bank name: {}",
                    config.name
                )));
            }

            let path = expand_tilde(&config.file_path)?;
            debug!("Registered bank {} at {}", config.name, path.display());
            banks.push(Bank {
                config,
                path,
                lock: Mutex::new(()),
            });
        }

        Ok(Self { banks })
    }

    /// Store over the built-in five-bank table
    pub fn with_defaults() -> InsightResult<Self> {
        Self::new(default_banks())
    }

    pub fn bank_names(&self) -> Vec<&str> {
        self.banks.iter().map(|b| b.config.name.as_str()).collect()
    }

    pub fn bank_config(&self, name: &str) -> InsightResult<&BankConfig> {
        Ok(&self.bank(name)?.config)
    }

    pub fn bank_path(&self, name: &str) -> InsightResult<&Path> {
        Ok(self.bank(name)?.path.as_path())
    }

    fn bank(&self, name: &str) -> InsightResult<&Bank> {
        self.banks
            .iter()
            .find(|b| b.config.name == name)
            .ok_or_else(|| InsightError::BankNotFound(name.to_string()))
    }

    // ========================================================================
    // Graph I/O
    // ========================================================================

    /// Load a bank's graph. A missing file is an empty graph.
    pub async fn load_graph(&self, bank_name: &str) -> InsightResult<KnowledgeGraph> {
        let bank = self.bank(bank_name)?;
        let _guard = bank.lock.lock().await;
        read_graph(bank).await
    }

    /// Overwrite a bank's file with the given graph
    pub async fn save_graph(&self, bank_name: &str, graph: &KnowledgeGraph) -> InsightResult<()> {
        let bank = self.bank(bank_name)?;
        let _guard = bank.lock.lock().await;
        write_graph(bank, graph).await
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Store entities whose names are not yet taken. Returns only the stored ones.
    pub async fn create_entities(
        &self,
        bank_name: &str,
        entities: Vec<Entity>,
    ) -> InsightResult<Vec<Entity>> {
        let bank = self.bank(bank_name)?;
        let _guard = bank.lock.lock().await;
        let mut graph = read_graph(bank).await?;

        let now = Utc::now();
        let mut stored = Vec::new();
        for mut entity in entities {
            if graph.has_entity(&entity.name) {
                debug!("Skipping existing entity '{}' in {}", entity.name, bank_name);
                continue;
            }
            entity.created_at = Some(now);
            entity.memory_bank = Some(bank_name.to_string());
            graph.entities.push(entity.clone());
            stored.push(entity);
        }

        if !stored.is_empty() {
            write_graph(bank, &graph).await?;
            info!("Stored {} new entities in {}", stored.len(), bank_name);
        }

        Ok(stored)
    }

    /// Store relations whose (from, to, relation_type) edge is new
    pub async fn create_relations(
        &self,
        bank_name: &str,
        relations: Vec<Relation>,
    ) -> InsightResult<Vec<Relation>> {
        let bank = self.bank(bank_name)?;
        let _guard = bank.lock.lock().await;
        let mut graph = read_graph(bank).await?;

        let now = Utc::now();
        let mut stored = Vec::new();
        for mut relation in relations {
            if graph.has_relation(&relation) {
                debug!(
                    "Skipping existing relation {} -[{}]-> {} in {}",
                    relation.from, relation.relation_type, relation.to, bank_name
                );
                continue;
            }
            relation.created_at = Some(now);
            relation.memory_bank = Some(bank_name.to_string());
            graph.relations.push(relation.clone());
            stored.push(relation);
        }

        if !stored.is_empty() {
            write_graph(bank, &graph).await?;
            info!("Stored {} new relations in {}", stored.len(), bank_name);
        }

        Ok(stored)
    }

    /// Append observations to an existing entity, skipping exact duplicates
    pub async fn add_observations(
        &self,
        bank_name: &str,
        entity_name: &str,
        observations: Vec<String>,
    ) -> InsightResult<Vec<String>> {
        let bank = self.bank(bank_name)?;
        let _guard = bank.lock.lock().await;
        let mut graph = read_graph(bank).await?;

        let entity = graph
            .find_entity_mut(entity_name)
            .ok_or_else(|| InsightError::EntityNotFound {
                bank: bank_name.to_string(),
                entity: entity_name.to_string(),
            })?;

        let mut added = Vec::new();
        for observation in observations {
            if entity.observations.contains(&observation) {
                continue;
            }
            entity.observations.push(observation.clone());
            added.push(observation);
        }

        if !added.is_empty() {
            write_graph(bank, &graph).await?;
            debug!(
                "Added {} observations to '{}' in {}",
                added.len(),
                entity_name,
                bank_name
            );
        }

        Ok(added)
    }

    // ========================================================================
    // Search & Listing
    // ========================================================================

    /// Case-insensitive keyword search over one bank, best matches first
    pub async fn search_bank(&self, bank_name: &str, query: &str) -> InsightResult<Vec<UnifiedResult>> {
        let graph = self.load_graph(bank_name).await?;
        let query = query.to_lowercase();

        let mut results: Vec<UnifiedResult> = graph
            .entities
            .iter()
            .filter_map(|entity| {
                let score = score_entity(entity, &query);
                (score > 0.0).then(|| entity_result(bank_name, entity, score))
            })
            .collect();

        results.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        debug!("Bank {} matched {} entities", bank_name, results.len());
        Ok(results)
    }

    /// Search every configured bank and merge by score
    pub async fn search_all_banks(&self, query: &str) -> InsightResult<Vec<UnifiedResult>> {
        let mut results = Vec::new();
        for bank in &self.banks {
            results.extend(self.search_bank(&bank.config.name, query).await?);
        }

        results.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        Ok(results)
    }

    /// Name, description and counts for every bank (loads each one fully)
    pub async fn list_banks(&self) -> InsightResult<Vec<BankSummary>> {
        let mut summaries = Vec::with_capacity(self.banks.len());
        for bank in &self.banks {
            let graph = self.load_graph(&bank.config.name).await?;
            summaries.push(BankSummary {
                name: bank.config.name.clone(),
                description: bank.config.description.clone(),
                entity_count: graph.entities.len(),
                relation_count: graph.relations.len(),
            });
        }
        Ok(summaries)
    }

    /// Make sure every bank file exists. Returns the banks that were created.
    pub async fn initialize_all_banks(&self) -> InsightResult<Vec<String>> {
        let mut created = Vec::new();

        for bank in &self.banks {
            let _guard = bank.lock.lock().await;
            if let Some(parent) = bank.path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| InsightError::io(parent, e))?;
            }

            if tokio::fs::metadata(&bank.path).await.is_ok() {
                continue;
            }

            tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&bank.path)
                .await
                .map_err(|e| InsightError::io(&bank.path, e))?;
            info!("Initialized bank {} at {}", bank.config.name, bank.path.display());
            created.push(bank.config.name.clone());
        }

        Ok(created)
    }
}

async fn read_graph(bank: &Bank) -> InsightResult<KnowledgeGraph> {
    let raw = match tokio::fs::read_to_string(&bank.path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(KnowledgeGraph::default()),
        Err(e) => return Err(InsightError::io(&bank.path, e)),
    };

    let mut graph = KnowledgeGraph::default();
    for (index, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<BankRecord>(line) {
            Ok(BankRecord::Entity(entity)) => graph.entities.push(entity),
            Ok(BankRecord::Relation(relation)) => graph.relations.push(relation),
            Err(e) => warn!(
                "Skipping malformed line {} in {}: {}",
                index + 1,
                bank.path.display(),
                e
            ),
        }
    }

    Ok(graph)
}

async fn write_graph(bank: &Bank, graph: &KnowledgeGraph) -> InsightResult<()> {
    if let Some(parent) = bank.path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| InsightError::io(parent, e))?;
    }

    let bank_name = Some(bank.config.name.clone());
    let mut lines = Vec::with_capacity(graph.entities.len() + graph.relations.len());
    for entity in &graph.entities {
        let mut entity = entity.clone();
        entity.memory_bank = bank_name.clone();
        lines.push(serde_json::to_string(&BankRecord::Entity(entity))?);
    }
    for relation in &graph.relations {
        let mut relation = relation.clone();
        relation.memory_bank = bank_name.clone();
        lines.push(serde_json::to_string(&BankRecord::Relation(relation))?);
    }

    tokio::fs::write(&bank.path, lines.join("\n"))
        .await
        .map_err(|e| InsightError::io(&bank.path, e))?;

    debug!(
        "Saved {} entities and {} relations to {}",
        graph.entities.len(),
        graph.relations.len(),
        bank.path.display()
    );
    Ok(())
}

/// Name +10, type +5, +3 per matching observation. `query` is lowercase.
fn score_entity(entity: &Entity, query: &str) -> f64 {
    let mut score = 0.0;
    if entity.name.to_lowercase().contains(query) {
        score += NAME_MATCH_SCORE;
    }
    if entity.entity_type.to_lowercase().contains(query) {
        score += TYPE_MATCH_SCORE;
    }
    for observation in &entity.observations {
        if observation.to_lowercase().contains(query) {
            score += OBSERVATION_MATCH_SCORE;
        }
    }
    score
}

fn entity_result(bank_name: &str, entity: &Entity, score: f64) -> UnifiedResult {
    let content = if entity.observations.is_empty() {
        entity.name.clone()
    } else {
        entity.observations.join("; ")
    };

    UnifiedResult {
        source: ResultSource::MemoryBank,
        bank_name: Some(bank_name.to_string()),
        entity_name: Some(entity.name.clone()),
        content,
        relevance_score: score,
        context: ResultContext {
            project_id: entity.project_id.clone(),
            session_id: entity.session_id.clone(),
            timestamp: entity.created_at,
        },
    }
}
