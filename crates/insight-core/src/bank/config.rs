// ============================================================================
// Bank Configuration - static bank table and override loading
// ============================================================================
// Default banks live under ~/.insight/banks/<name>.jsonl.
// INSIGHT_BANKS_CONFIG points at a JSON file that replaces the whole table:
//   { "<bank>": { "filePath": "...", "description": "...", "entityTypes": [..] } }
// INSIGHT_SESSIONS_DIR overrides where session transcripts are scanned.
// ============================================================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{InsightError, InsightResult};

pub const BANKS_CONFIG_ENV: &str = "INSIGHT_BANKS_CONFIG";
pub const SESSIONS_DIR_ENV: &str = "INSIGHT_SESSIONS_DIR";
pub const DEFAULT_SESSIONS_DIR: &str = "~/.claude/projects";

pub const DEVELOPMENT_PATTERNS: &str = "development_patterns";
pub const BREAKTHROUGH_MOMENTS: &str = "breakthrough_moments";
pub const COLLABORATION_INSIGHTS: &str = "collaboration_insights";
pub const PROJECT_EVOLUTION: &str = "project_evolution";
pub const COMMUNITY_WISDOM: &str = "community_wisdom";

/// One configured bank. `entity_types` is advisory and never enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankConfig {
    #[serde(default)]
    pub name: String,
    pub file_path: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub entity_types: Vec<String>,
}

impl BankConfig {
    fn default_for(name: &str, description: &str, entity_types: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            file_path: format!("~/.insight/banks/{}.jsonl", name),
            description: description.to_string(),
            entity_types: entity_types.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// The built-in bank table
pub fn default_banks() -> Vec<BankConfig> {
    vec![
        BankConfig::default_for(
            DEVELOPMENT_PATTERNS,
            "Technical insights, architecture decisions and solution approaches",
            &["technical_insight", "solution_approach", "code_pattern", "architecture_decision"],
        ),
        BankConfig::default_for(
            BREAKTHROUGH_MOMENTS,
            "Moments where a problem suddenly clicked",
            &["breakthrough_moment", "discovery", "realization"],
        ),
        BankConfig::default_for(
            COLLABORATION_INSIGHTS,
            "How the work gets done together: shared plans and working agreements",
            &["collaboration_pattern", "communication_style", "workflow"],
        ),
        BankConfig::default_for(
            PROJECT_EVOLUTION,
            "How projects changed over time: milestones, pivots, retrospectives",
            &["milestone", "pivot", "retrospective"],
        ),
        BankConfig::default_for(
            COMMUNITY_WISDOM,
            "Curated knowledge worth sharing beyond a single project",
            &["best_practice", "lesson_learned", "resource"],
        ),
    ]
}

/// Load a bank table from a JSON mapping of bank name to settings
pub fn load_banks_file(path: &Path) -> InsightResult<Vec<BankConfig>> {
    let raw = std::fs::read_to_string(path).map_err(|e| InsightError::io(path, e))?;
    parse_banks(&raw)
}

fn parse_banks(raw: &str) -> InsightResult<Vec<BankConfig>> {
    let table: BTreeMap<String, BankConfig> = serde_json::from_str(raw)?;
    if table.is_empty() {
        return Err(InsightError::Config(
            "bank configuration defines no banks".to_string(),
        ));
    }

    Ok(table
        .into_iter()
        .map(|(name, mut config)| {
            config.name = name;
            config
        })
        .collect())
}

/// Expand a leading `~` to the current user's home directory
pub fn expand_tilde(path: &str) -> InsightResult<PathBuf> {
    let rest = if path == "~" {
        ""
    } else if let Some(rest) = path.strip_prefix("~/") {
        rest
    } else {
        return Ok(PathBuf::from(path));
    };

    let home = dirs::home_dir()
        .ok_or_else(|| InsightError::Config("Cannot determine home directory".to_string()))?;
    Ok(if rest.is_empty() { home } else { home.join(rest) })
}

/// Top-level configuration for the aggregator
#[derive(Debug, Clone)]
pub struct InsightConfig {
    pub banks: Vec<BankConfig>,
    /// Root of the session transcript tree (may still contain `~`)
    pub sessions_dir: String,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            banks: default_banks(),
            sessions_dir: DEFAULT_SESSIONS_DIR.to_string(),
        }
    }
}

impl InsightConfig {
    /// Build configuration from explicit overrides, then environment, then defaults
    pub fn resolve(banks_file: Option<&str>, sessions_dir: Option<&str>) -> InsightResult<Self> {
        let banks_file = banks_file
            .map(str::to_string)
            .or_else(|| std::env::var(BANKS_CONFIG_ENV).ok());

        let banks = match banks_file {
            Some(file) => {
                let path = expand_tilde(&file)?;
                info!("Loading bank configuration from {}", path.display());
                load_banks_file(&path)?
            }
            None => {
                debug!("Using default bank table");
                default_banks()
            }
        };

        let sessions_dir = sessions_dir
            .map(str::to_string)
            .or_else(|| std::env::var(SESSIONS_DIR_ENV).ok())
            .unwrap_or_else(|| DEFAULT_SESSIONS_DIR.to_string());

        Ok(Self { banks, sessions_dir })
    }

    pub fn sessions_path(&self) -> InsightResult<PathBuf> {
        expand_tilde(&self.sessions_dir)
    }
}
