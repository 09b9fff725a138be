//! Source adapters turning vendor exports into normalized cards.

pub mod jpdb;
pub mod normalized;

use crate::error::Result;
use crate::types::NormalizedCard;

/// Trait for vendor export adapters.
pub trait SourceAdapter: Send + Sync {
    /// Adapter identifier, as accepted by [`get_adapter`].
    fn name(&self) -> &'static str;

    /// Normalize a raw export. Malformed input rejects the whole export.
    fn normalize(&self, raw: &serde_json::Value) -> Result<Vec<NormalizedCard>>;
}

/// Get adapter by name.
pub fn get_adapter(name: &str) -> Option<Box<dyn SourceAdapter>> {
    match name {
        "jpdb" => Some(Box::new(jpdb::JpdbAdapter)),
        "normalized" => Some(Box::new(normalized::NormalizedAdapter)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lookup() {
        assert_eq!(get_adapter("jpdb").map(|a| a.name()), Some("jpdb"));
        assert_eq!(get_adapter("normalized").map(|a| a.name()), Some("normalized"));
        assert!(get_adapter("anki").is_none());
    }
}
