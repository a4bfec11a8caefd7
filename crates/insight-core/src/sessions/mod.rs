//! ============================================================================
//! Sessions Module - Session transcript files on disk
//! ============================================================================
//! Reads line-delimited JSON session logs into `Transcript`s for extraction
//! and provides the default filesystem-backed `TranscriptSearch`.
//! ============================================================================

mod reader;
mod search;

pub use reader::{list_session_files, parse_transcript, read_transcript};
pub use search::{match_transcript, FsTranscriptSearch};
