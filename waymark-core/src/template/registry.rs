//! Parsed mapping cache.

use crate::cache::CacheStats;
use crate::mapping::UriMapping;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Caches [`UriMapping`]s by their source string.
///
/// Entries are never evicted: the set of mappings is bounded by the handlers
/// declared in the program.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    mappings: RwLock<HashMap<String, Arc<UriMapping>>>,
    stats: CacheStats,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the parsed mapping for `source`, parsing it on first use.
    pub fn mapping(&self, source: &str) -> Arc<UriMapping> {
        if let Some(mapping) = self.mappings.read().get(source) {
            self.stats.record_hit();
            return Arc::clone(mapping);
        }

        self.stats.record_miss();
        trace!(mapping = %source, "Parsing URI mapping");

        let mut mappings = self.mappings.write();
        let mapping = mappings
            .entry(source.to_string())
            .or_insert_with(|| Arc::new(UriMapping::of(source)));
        Arc::clone(mapping)
    }

    /// Get cache statistics.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.mappings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_is_parsed_once() {
        let registry = TemplateRegistry::new();

        let first = registry.mapping("/people/{id}");
        let second = registry.mapping("/people/{id}");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.stats().misses(), 1);
        assert_eq!(registry.stats().hits(), 1);
    }

    #[test]
    fn test_distinct_sources_get_distinct_entries() {
        let registry = TemplateRegistry::new();

        registry.mapping("/people");
        registry.mapping("/people/{id}");

        assert_eq!(registry.len(), 2);
    }
}
