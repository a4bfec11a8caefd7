// ============================================================================
// Session Reader - line-delimited JSON session logs into Transcripts
// ============================================================================
// Layout: <sessions_dir>/<project>/<session>.jsonl (top-level files allowed).
// Each line may carry `sessionId`, `timestamp` and a `message` whose
// `content` is either a plain string or a list of text / tool_use blocks.
// ============================================================================

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{InsightError, InsightResult};
use crate::extract::{ToolCall, Transcript};

const SESSION_EXTENSION: &str = "jsonl";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SessionRecord {
    session_id: Option<String>,
    timestamp: Option<String>,
    message: Option<SessionMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionMessage {
    #[serde(default)]
    content: MessageContent,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Text(String::new())
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: Option<serde_json::Value>,
    },
    #[serde(other)]
    Other,
}

/// Read one session file. Malformed lines are skipped; an unreadable file is an error.
pub async fn read_transcript(path: &Path) -> InsightResult<Transcript> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| InsightError::io(path, e))?;
    Ok(parse_transcript(path, &raw))
}

/// Build a transcript from the raw contents of `path`
pub fn parse_transcript(path: &Path, raw: &str) -> Transcript {
    let mut transcript = Transcript {
        project_id: path
            .parent()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        ..Default::default()
    };

    let mut session_id = None;
    for (index, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let record: SessionRecord = match serde_json::from_str(line) {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    "Skipping malformed session line {} in {}: {}",
                    index + 1,
                    path.display(),
                    e
                );
                continue;
            }
        };

        if session_id.is_none() {
            session_id = record.session_id;
        }
        if let Some(ts) = record.timestamp.as_deref().and_then(parse_timestamp) {
            transcript.timestamp = Some(ts);
        }
        if let Some(message) = record.message {
            collect_message(&mut transcript, message.content);
        }
    }

    transcript.session_id = session_id.unwrap_or_else(|| {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    debug!(
        "Read session {} ({} messages, {} tool calls)",
        transcript.session_id,
        transcript.messages.len(),
        transcript.tool_calls.len()
    );
    transcript
}

fn collect_message(transcript: &mut Transcript, content: MessageContent) {
    match content {
        MessageContent::Text(text) => {
            if !text.trim().is_empty() {
                transcript.messages.push(text);
            }
        }
        MessageContent::Blocks(blocks) => {
            let mut texts = Vec::new();
            for block in blocks {
                match block {
                    ContentBlock::Text { text } if !text.trim().is_empty() => texts.push(text),
                    ContentBlock::ToolUse { name, input } => {
                        transcript.tool_calls.push(ToolCall { name, input })
                    }
                    _ => {}
                }
            }
            if !texts.is_empty() {
                transcript.messages.push(texts.join("\n"));
            }
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// All session files one or two levels below `root`, sorted by path.
/// A missing root yields an empty list. Project directories that cannot be
/// read are logged and skipped.
pub async fn list_session_files(root: &Path) -> InsightResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(files),
        Err(e) => return Err(InsightError::io(root, e)),
    };

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| InsightError::io(root, e))?
    {
        let path = entry.path();
        match entry_kind(&path, entry.file_type().await).await {
            Ok(EntryKind::Dir) => match project_session_files(&path).await {
                Ok(nested) => files.extend(nested),
                Err(e) => warn!("Skipping unreadable project {}: {}", path.display(), e),
            },
            Ok(EntryKind::File) if has_session_extension(&path) => files.push(path),
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable entry {}: {}", path.display(), e),
        }
    }

    files.sort();
    Ok(files)
}

/// Session files directly inside one project directory
async fn project_session_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        match entry_kind(&path, entry.file_type().await).await {
            Ok(EntryKind::File) if has_session_extension(&path) => files.push(path),
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable entry {}: {}", path.display(), e),
        }
    }

    Ok(files)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Dir,
    File,
    Other,
}

/// Classify a directory entry, following symlinks to their target
async fn entry_kind(
    path: &Path,
    file_type: std::io::Result<std::fs::FileType>,
) -> std::io::Result<EntryKind> {
    let file_type = file_type?;
    let (is_dir, is_file) = if file_type.is_symlink() {
        let metadata = tokio::fs::metadata(path).await?;
        (metadata.is_dir(), metadata.is_file())
    } else {
        (file_type.is_dir(), file_type.is_file())
    };

    Ok(if is_dir {
        EntryKind::Dir
    } else if is_file {
        EntryKind::File
    } else {
        EntryKind::Other
    })
}

fn has_session_extension(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == SESSION_EXTENSION)
}
