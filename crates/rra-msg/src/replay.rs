//! ---
//! rra_section: "02-messaging-ipc-data-model"
//! rra_subsection: "module"
//! rra_type: "source"
//! rra_scope: "code"
//! rra_description: "Cross-frame envelope schema and messaging channel."
//! rra_version: "v0.0.0-prealpha"
//! rra_owner: "tbd"
//! ---
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::window::InMemoryWindow;
use crate::Result;

#[derive(Debug, Deserialize)]
struct TranscriptRecord {
    #[serde(default)]
    origin: Option<String>,
    #[serde(default)]
    delay_ms: Option<u64>,
    data: JsonValue,
}

/// Replay editor messages from a newline-delimited JSON transcript.
///
/// Each line must contain an object with a `data` field holding the raw
/// message body, an optional `origin` (defaults to `default_origin`) and an
/// optional `delay_ms` to simulate time between messages.
pub fn replay_transcript<P: AsRef<Path>>(
    window: &InMemoryWindow,
    default_origin: &str,
    path: P,
) -> Result<usize> {
    let file = File::open(path)?;
    replay_lines(window, default_origin, BufReader::new(file))
}

/// Replay a transcript from any buffered reader. Blank lines are skipped.
pub fn replay_lines<R: BufRead>(
    window: &InMemoryWindow,
    default_origin: &str,
    reader: R,
) -> Result<usize> {
    let mut count = 0usize;

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: TranscriptRecord = serde_json::from_str(&line)?;
        if let Some(delay) = record.delay_ms {
            std::thread::sleep(Duration::from_millis(delay));
        }
        let origin = record
            .origin
            .unwrap_or_else(|| default_origin.to_owned());
        window.deliver(origin, record.data);
        count += 1;
    }

    Ok(count)
}
