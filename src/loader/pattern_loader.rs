// Pattern library files: a JSON array of
//   { "id": "rock-1", "name": "Rock: 1", "steps": { "BD": "1000100010001000", ... } }
// Track keys are case-insensitive. Tracks left out are silent.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::error::{SeqError, SeqResult};
use crate::pipeline::Pattern;
use crate::shared::{STEPS_PER_PATTERN, TrackId};

#[derive(Debug, Deserialize)]
struct PatternRecord {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    grid_width: Option<usize>,
    steps: BTreeMap<String, String>,
}

impl PatternRecord {
    fn into_pattern(self) -> SeqResult<Pattern> {
        if let Some(width) = self.grid_width {
            if width != STEPS_PER_PATTERN {
                return Err(SeqError::InvalidPattern(format!(
                    "{:?} is {width} steps wide, only {STEPS_PER_PATTERN} is supported",
                    self.name
                )));
            }
        }
        let id = self.id.unwrap_or_else(|| slug(&self.name));
        let rows = self
            .steps
            .iter()
            .map(|(key, row)| Ok((key.parse::<TrackId>()?, row.as_str())))
            .collect::<SeqResult<Vec<_>>>()?;
        Pattern::from_step_strings(id, self.name.clone(), rows)
    }
}

// "Afro-Cub: 1" -> "afro-cub-1"
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}

pub fn parse_patterns(json: &str) -> anyhow::Result<Vec<Pattern>> {
    let records: Vec<PatternRecord> = serde_json::from_str(json).context("pattern library is not valid JSON")?;
    records
        .into_iter()
        .enumerate()
        .map(|(i, record)| record.into_pattern().with_context(|| format!("pattern #{i}")))
        .collect()
}

pub fn load_patterns(path: &Path) -> anyhow::Result<Vec<Pattern>> {
    let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let patterns = parse_patterns(&json).with_context(|| format!("parsing {}", path.display()))?;
    log::info!(target: "loader", "{} patterns from {}", patterns.len(), path.display());
    Ok(patterns)
}

/// A few grooves to play when no library is around.
pub fn builtin_patterns() -> Vec<Pattern> {
    const BUILTIN: &str = r#"[
        { "id": "four-on-the-floor", "name": "Four on the Floor", "steps": {
            "BD": "1000100010001000",
            "CH": "0010001000100010",
            "CP": "0000100000001000" } },
        { "id": "rock-1", "name": "Rock: 1", "steps": {
            "AC": "1000000010000000",
            "CH": "1010101010101010",
            "SD": "0000100000001000",
            "BD": "1000000010100000" } },
        { "id": "afro-cub-1", "name": "Afro-Cub: 1", "steps": {
            "CH": "1011101010101010",
            "RS": "0001001000001000",
            "BD": "1000000010100010" } }
    ]"#;
    // the table above is fixed; a parse failure is a bug caught by the tests
    parse_patterns(BUILTIN).unwrap_or_default()
}
