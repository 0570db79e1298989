use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::Value;

#[derive(Clone, Debug, Deserialize)]
struct RawEntry {
    #[serde(alias = "id", alias = "name")]
    element: String,
    #[serde(alias = "embedding")]
    vector: Vec<f32>,
}

pub(super) fn read_vector_file(path: &Path) -> Result<Vec<(String, Vec<f32>)>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read vector file {}", path.display()))?;
    parse_vector_set(&raw).with_context(|| format!("failed to parse vector file {}", path.display()))
}

/// Accepts either `{"element": [..], ..}` or `[{"element": .., "vector": [..]}, ..]`.
pub(super) fn parse_vector_set(raw: &str) -> Result<Vec<(String, Vec<f32>)>> {
    let parsed: Value = serde_json::from_str(raw).context("invalid JSON in vector file")?;

    if let Some(object) = parsed.as_object() {
        let mut entries = Vec::with_capacity(object.len());
        for (element, value) in object {
            let vector = Vec::<f32>::deserialize(value)
                .with_context(|| format!("vector of '{element}' is not a list of numbers"))?;
            entries.push((element.clone(), vector));
        }
        return Ok(entries);
    }

    let list = parsed
        .as_array()
        .ok_or_else(|| anyhow!("vector file must hold an object or a list"))?;
    list.iter()
        .enumerate()
        .map(|(position, value)| {
            let entry = RawEntry::deserialize(value)
                .with_context(|| format!("invalid vector entry at position {position}"))?;
            Ok((entry.element, entry.vector))
        })
        .collect()
}
