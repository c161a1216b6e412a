//! Defensive parsing of free-form classifier answers.
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{SeeDroidError, SeeDroidResult};

static INTEGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+").expect("integer regex must compile"));

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:json|JSON)?\s*([\s\S]*?)\s*```").expect("fence regex must compile")
});

/// First integer token in the answer, ignoring surrounding prose.
pub fn first_integer(response: &str) -> Option<i64> {
    INTEGER_RE
        .find_iter(response)
        .find_map(|m| m.as_str().parse::<i64>().ok())
}

/// Best-effort JSON extraction: whole text, fenced block, first object, first array.
pub fn parse_json_response(response: &str) -> SeeDroidResult<serde_json::Value> {
    let trimmed = response.trim();
    if let Ok(v) = serde_json::from_str(trimmed) {
        return Ok(v);
    }

    if let Some(block) = FENCE_RE.captures(trimmed).and_then(|c| c.get(1)) {
        if let Ok(v) = serde_json::from_str(block.as_str()) {
            return Ok(v);
        }
    }

    // Whichever bracket opens first is the outermost value.
    let mut spans: Vec<(usize, usize)> = [('{', '}'), ('[', ']')]
        .iter()
        .filter_map(|&(open, close)| Some((trimmed.find(open)?, trimmed.rfind(close)?)))
        .filter(|(start, end)| start < end)
        .collect();
    spans.sort();
    for (start, end) in spans {
        if let Ok(v) = serde_json::from_str(&trimmed[start..=end]) {
            return Ok(v);
        }
    }

    let preview: String = trimmed.chars().take(200).collect();
    Err(SeeDroidError::LlmProvider(format!(
        "could not parse JSON from response: {preview}"
    )))
}
