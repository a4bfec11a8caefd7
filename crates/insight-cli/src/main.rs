// ============================================================================
// insight - CLI over the session knowledge aggregator
// ============================================================================
// Usage:
//   insight init                               Create missing bank files
//   insight banks                              List banks with counts
//   insight add-entity <bank> <name> --type T  Store an entity
//   insight search <query> [--banks-only]      Unified ranked search
//   insight ask <question>                     Natural-language query
//   insight extract <session.jsonl> [--link]   Extract patterns into banks
//   insight sessions                           List session files
// ============================================================================

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

use insight_core::sessions::{list_session_files, read_transcript};
use insight_core::{
    Entity, FsTranscriptSearch, InsightConfig, InsightManager, NoTranscripts, Relation,
    TranscriptSearch, UnifiedResult,
};

/// Search and grow a personal knowledge base built from coding sessions
#[derive(Parser)]
#[command(name = "insight", version, about = "Search sessions and memory banks, extract insights")]
struct Cli {
    /// JSON file replacing the default bank table
    #[arg(long, global = true)]
    banks_config: Option<String>,

    /// Root of the session transcript tree (default: ~/.claude/projects)
    #[arg(long, global = true)]
    sessions_dir: Option<String>,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create every missing bank file
    Init,

    /// List banks with entity and relation counts
    Banks,

    /// Aggregate statistics across all banks
    Stats,

    /// Store a new entity in a bank
    AddEntity {
        bank: String,
        name: String,

        /// Entity type, e.g. technical_insight
        #[arg(long = "type")]
        entity_type: String,

        /// Observation text (repeatable)
        #[arg(long = "observation")]
        observations: Vec<String>,
    },

    /// Append observations to an existing entity
    Observe {
        bank: String,
        entity: String,
        #[arg(required = true)]
        observations: Vec<String>,
    },

    /// Store a relation between two entities
    Relate {
        bank: String,
        from: String,
        to: String,
        relation_type: String,

        #[arg(long)]
        strength: Option<f64>,
    },

    /// Keyword search inside one bank
    SearchBank { bank: String, query: String },

    /// Ranked search across sessions and every bank
    Search {
        query: String,

        /// Skip session transcripts
        #[arg(long)]
        banks_only: bool,
    },

    /// Answer a question with direct matches, related insights and hints
    Ask {
        text: String,

        /// Skip session transcripts
        #[arg(long)]
        banks_only: bool,
    },

    /// Extract patterns from one session file and store them
    Extract {
        file: PathBuf,

        /// Also link the stored entities into a flow
        #[arg(long)]
        link: bool,

        /// Print the patterns without storing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// List session files under the sessions directory
    Sessions,
}

fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn transcript_source(config: &InsightConfig, banks_only: bool) -> Result<Box<dyn TranscriptSearch>> {
    if banks_only {
        return Ok(Box::new(NoTranscripts));
    }
    Ok(Box::new(FsTranscriptSearch::new(config.sessions_path()?)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("insight_core=info".parse()?)
                .add_directive("insight_cli=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = dotenv {
        debug!("No .env file loaded: {}", e);
    }

    let cli = Cli::parse();
    let config = InsightConfig::resolve(cli.banks_config.as_deref(), cli.sessions_dir.as_deref())?;
    let manager = InsightManager::new(&config)?;
    let json = cli.json;

    match cli.command {
        Commands::Init => cmd_init(&manager, json).await,
        Commands::Banks => cmd_banks(&manager, json).await,
        Commands::Stats => cmd_stats(&manager, json).await,
        Commands::AddEntity {
            bank,
            name,
            entity_type,
            observations,
        } => cmd_add_entity(&manager, &bank, name, entity_type, observations, json).await,
        Commands::Observe {
            bank,
            entity,
            observations,
        } => cmd_observe(&manager, &bank, &entity, observations, json).await,
        Commands::Relate {
            bank,
            from,
            to,
            relation_type,
            strength,
        } => cmd_relate(&manager, &bank, from, to, relation_type, strength, json).await,
        Commands::SearchBank { bank, query } => {
            let results = manager.search_bank(&bank, &query).await?;
            print_results(&results, json)
        }
        Commands::Search { query, banks_only } => {
            let transcripts = transcript_source(&config, banks_only)?;
            let results = manager.query(&query, transcripts.as_ref()).await?;
            print_results(&results, json)
        }
        Commands::Ask { text, banks_only } => {
            let transcripts = transcript_source(&config, banks_only)?;
            cmd_ask(&manager, &text, transcripts.as_ref(), json).await
        }
        Commands::Extract {
            file,
            link,
            dry_run,
        } => cmd_extract(&manager, &file, link, dry_run, json).await,
        Commands::Sessions => cmd_sessions(&config, json).await,
    }
}

async fn cmd_init(manager: &InsightManager, json: bool) -> Result<()> {
    let created = manager.initialize().await?;
    if json {
        return print_json(&created);
    }

    if created.is_empty() {
        println!("All banks already exist.");
    } else {
        println!("Created {} bank file(s):", created.len());
        for name in &created {
            println!("  {}", name);
        }
    }
    Ok(())
}

async fn cmd_banks(manager: &InsightManager, json: bool) -> Result<()> {
    let banks = manager.list_banks().await?;
    if json {
        return print_json(&banks);
    }

    println!(
        "{:<24} {:>8} {:>9}  {}",
        "BANK", "ENTITIES", "RELATIONS", "DESCRIPTION"
    );
    println!("{}", "-".repeat(80));
    for bank in &banks {
        println!(
            "{:<24} {:>8} {:>9}  {}",
            bank.name, bank.entity_count, bank.relation_count, bank.description
        );
    }
    Ok(())
}

async fn cmd_stats(manager: &InsightManager, json: bool) -> Result<()> {
    let stats = manager.stats().await?;
    if json {
        return print_json(&stats);
    }

    println!("=== Insight Stats ===");
    println!("Banks:     {}", stats.bank_count);
    println!("Entities:  {}", stats.total_entities);
    println!("Relations: {}", stats.total_relations);
    println!();
    for bank in &stats.banks {
        println!("  {:24} {} entities", bank.name, bank.entity_count);
    }
    Ok(())
}

async fn cmd_add_entity(
    manager: &InsightManager,
    bank: &str,
    name: String,
    entity_type: String,
    observations: Vec<String>,
    json: bool,
) -> Result<()> {
    let entity = Entity::new(name.clone(), entity_type).with_observations(observations);
    let created = manager.create_entities(bank, vec![entity]).await?;
    if json {
        return print_json(&created);
    }

    match created.first() {
        Some(entity) => println!("Stored '{}' in {}", entity.name, bank),
        None => println!("'{}' already exists in {}, nothing stored", name, bank),
    }
    Ok(())
}

async fn cmd_observe(
    manager: &InsightManager,
    bank: &str,
    entity: &str,
    observations: Vec<String>,
    json: bool,
) -> Result<()> {
    let added = manager.add_observations(bank, entity, observations).await?;
    if json {
        return print_json(&added);
    }

    println!("Added {} new observation(s) to '{}':", added.len(), entity);
    for observation in &added {
        println!("  - {}", observation);
    }
    Ok(())
}

async fn cmd_relate(
    manager: &InsightManager,
    bank: &str,
    from: String,
    to: String,
    relation_type: String,
    strength: Option<f64>,
    json: bool,
) -> Result<()> {
    let mut relation = Relation::new(from, to, relation_type);
    if let Some(strength) = strength {
        relation = relation.with_strength(strength);
    }

    let created = manager.create_relations(bank, vec![relation]).await?;
    if json {
        return print_json(&created);
    }

    if created.is_empty() {
        println!("Relation already exists in {}, nothing stored", bank);
    } else {
        for r in &created {
            println!("Stored {} -[{}]-> {} in {}", r.from, r.relation_type, r.to, bank);
        }
    }
    Ok(())
}

fn print_results(results: &[UnifiedResult], json: bool) -> Result<()> {
    if json {
        return print_json(results);
    }

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    println!(
        "{:<12} {:<24} {:>7}  {:<24} {}",
        "SOURCE", "ORIGIN", "SCORE", "WHEN", "CONTENT"
    );
    println!("{}", "-".repeat(100));
    for result in results {
        println!(
            "{:<12} {:<24} {:>7.1}  {:<24} {}",
            result.source.to_string(),
            origin(result),
            result.relevance_score,
            format_timestamp(result.context.timestamp),
            preview(&result.content, 60)
        );
    }
    println!("\n{} result(s)", results.len());
    Ok(())
}

fn origin(result: &UnifiedResult) -> String {
    match (&result.bank_name, &result.context.session_id) {
        (Some(bank), _) => bank.clone(),
        (None, Some(session)) => preview(session, 24),
        (None, None) => "-".to_string(),
    }
}

fn preview(s: &str, max_chars: usize) -> String {
    let flat = s.replace('\n', " ");
    if flat.chars().count() > max_chars {
        let cut: String = flat.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        flat
    }
}

async fn cmd_ask(
    manager: &InsightManager,
    text: &str,
    transcripts: &dyn TranscriptSearch,
    json: bool,
) -> Result<()> {
    let answer = manager.query_natural_language(text, transcripts).await?;
    if json {
        return print_json(&answer);
    }

    println!("Question:  {}", answer.query);
    println!("Key terms: {}", answer.key_terms.join(", "));
    println!();
    println!("=== Direct matches ({}) ===", answer.direct_matches.len());
    print_results(&answer.direct_matches, false)?;
    println!();
    println!("=== Related insights ({}) ===", answer.related_insights.len());
    print_results(&answer.related_insights, false)?;
    if !answer.recommendations.is_empty() {
        println!();
        println!("=== Recommendations ===");
        for hint in &answer.recommendations {
            println!("  * {}", hint);
        }
    }
    Ok(())
}

async fn cmd_extract(
    manager: &InsightManager,
    file: &std::path::Path,
    link: bool,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let transcript = read_transcript(file).await?;

    if dry_run {
        let patterns = manager.preview_patterns(&transcript);
        if json {
            return print_json(&patterns);
        }

        println!("=== DRY RUN - nothing will be stored ===\n");
        println!(
            "Session {} ({}): {} pattern(s)",
            transcript.session_id,
            transcript.project_id,
            patterns.len()
        );
        for pattern in &patterns {
            println!(
                "  [{:<21}] {:.2}  {}",
                pattern.pattern_type.as_str(),
                pattern.confidence,
                preview(&pattern.content, 70)
            );
        }
        return Ok(());
    }

    let report = if link {
        manager.process_transcript_linked(&transcript).await?
    } else {
        manager.process_transcript(&transcript).await?
    };
    if json {
        return print_json(&report);
    }

    println!(
        "Session {} ({}): {} pattern(s), {} new entity(ies), {} relation(s)",
        report.session_id,
        report.project_id,
        report.patterns_found,
        report.entities_stored,
        report.relations_stored
    );
    for (bank, count) in &report.per_bank {
        println!("  {:24} +{}", bank, count);
    }
    Ok(())
}

async fn cmd_sessions(config: &InsightConfig, json: bool) -> Result<()> {
    let root = config.sessions_path()?;
    let files = list_session_files(&root).await?;
    if json {
        return print_json(&files);
    }

    println!("Sessions under {}:", root.display());
    if files.is_empty() {
        println!("  (none)");
    }
    for path in &files {
        let display = path.strip_prefix(&root).unwrap_or(path);
        println!("  {}", display.display());
    }
    println!("\n{} session file(s)", files.len());
    Ok(())
}
