//! Passthrough adapter for exports already in normalized form.

use serde::Deserialize;
use serde_json::Value;

use super::SourceAdapter;
use crate::error::{ExportError, Result};
use crate::types::NormalizedCard;

/// Accepts `{ "cards": [NormalizedCard, ...] }`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedAdapter;

impl SourceAdapter for NormalizedAdapter {
    fn name(&self) -> &'static str {
        "normalized"
    }

    fn normalize(&self, raw: &Value) -> Result<Vec<NormalizedCard>> {
        let root = raw.as_object().ok_or(ExportError::NotAnObject)?;
        let entries = root
            .get("cards")
            .and_then(Value::as_array)
            .ok_or(ExportError::MissingArray { field: "cards" })?;

        entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                NormalizedCard::deserialize(entry).map_err(|e| ExportError::InvalidEntry {
                    field: "cards",
                    index,
                    reason: e.to_string(),
                })
            })
            .collect()
    }
}
