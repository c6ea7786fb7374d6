//! Transcript reader.
//!
//! Pulls the last user prompt and the last assistant text out of a Claude
//! Code JSONL transcript. Every failure degrades to sentinel values.

use cc_slack_protocol::TranscriptRecord;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// Prompt shown when no transcript (or no prompt) is available.
pub const UNKNOWN_PROMPT: &str = "(unknown)";

/// Lines longer than this are skipped.
const MAX_LINE_BYTES: usize = 10 * 1024 * 1024;

/// Scan `path` once, in file order, returning `(prompt, response)`.
///
/// The most recent string-valued user prompt and the most recent non-blank
/// assistant text block win. A missing path or unreadable file yields
/// `("(unknown)", "")`.
pub async fn scan_transcript(path: &str) -> (String, String) {
    if path.is_empty() {
        return (UNKNOWN_PROMPT.to_string(), String::new());
    }

    let file = match File::open(path).await {
        Ok(file) => file,
        Err(err) => {
            debug!(
                component = "transcript",
                event = "transcript.open_failed",
                path = %path,
                error = %err,
                "Transcript unreadable"
            );
            return (UNKNOWN_PROMPT.to_string(), String::new());
        }
    };

    let mut reader = BufReader::new(file);
    let mut line = Vec::new();
    let mut prompt = String::new();
    let mut response = String::new();

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                debug!(
                    component = "transcript",
                    event = "transcript.read_failed",
                    path = %path,
                    error = %err,
                    "Transcript read stopped early"
                );
                break;
            }
        }
        if line.len() > MAX_LINE_BYTES {
            continue;
        }

        let Ok(record) = serde_json::from_slice::<TranscriptRecord>(&line) else {
            continue;
        };
        if let Some(text) = record.user_prompt() {
            prompt = text.to_string();
        } else if let Some(text) = record.assistant_text() {
            response = text.to_string();
        }
    }

    if prompt.is_empty() {
        prompt = UNKNOWN_PROMPT.to_string();
    }
    (prompt, response)
}
