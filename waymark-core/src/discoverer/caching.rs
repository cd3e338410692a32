use super::MappingDiscoverer;
use crate::affordance::QueryParameter;
use crate::cache::CacheStats;
use crate::handler::{HandlerDescriptor, MethodDescriptor};
use crate::http::{HttpMethod, MediaType};
use parking_lot::RwLock;
use std::any::TypeId;
use std::collections::HashMap;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Lookup {
    Type,
    Method,
    Invoked,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    lookup: Lookup,
    type_id: TypeId,
    method: Option<(String, Option<String>)>,
}

impl CacheKey {
    fn new(lookup: Lookup, handler: &HandlerDescriptor, method: Option<&MethodDescriptor>) -> Self {
        Self {
            lookup,
            type_id: handler.type_id(),
            method: method.map(|m| {
                (
                    m.name().to_string(),
                    m.declared_mapping().map(str::to_string),
                )
            }),
        }
    }
}

/// Memoizes the mappings of a wrapped discoverer.
///
/// Results, including the absence of a mapping, are cached forever.
#[derive(Debug, Default)]
pub struct CachingMappingDiscoverer<D> {
    delegate: D,
    cache: RwLock<HashMap<CacheKey, Option<String>>>,
    stats: CacheStats,
}

impl<D: MappingDiscoverer> CachingMappingDiscoverer<D> {
    pub fn new(delegate: D) -> Self {
        Self {
            delegate,
            cache: RwLock::new(HashMap::new()),
            stats: CacheStats::default(),
        }
    }

    /// Get cache statistics.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_or_compute<F>(&self, key: CacheKey, compute: F) -> Option<String>
    where
        F: FnOnce() -> Option<String>,
    {
        if let Some(mapping) = self.cache.read().get(&key) {
            self.stats.record_hit();
            return mapping.clone();
        }

        self.stats.record_miss();
        let mapping = compute();
        trace!(key = ?key, mapping = ?mapping, "Caching discovered mapping");

        self.cache.write().entry(key).or_insert(mapping).clone()
    }
}

impl<D: MappingDiscoverer> MappingDiscoverer for CachingMappingDiscoverer<D> {
    fn mapping_for_type(&self, handler: &HandlerDescriptor) -> Option<String> {
        self.get_or_compute(CacheKey::new(Lookup::Type, handler, None), || {
            self.delegate.mapping_for_type(handler)
        })
    }

    fn mapping_for_method(
        &self,
        declaring: &HandlerDescriptor,
        method: &MethodDescriptor,
    ) -> Option<String> {
        self.get_or_compute(CacheKey::new(Lookup::Method, declaring, Some(method)), || {
            self.delegate.mapping_for_method(declaring, method)
        })
    }

    fn mapping(&self, handler: &HandlerDescriptor, method: &MethodDescriptor) -> Option<String> {
        self.get_or_compute(CacheKey::new(Lookup::Invoked, handler, Some(method)), || {
            self.delegate.mapping(handler, method)
        })
    }

    fn request_methods(&self, handler: &HandlerDescriptor, method: &MethodDescriptor) -> Vec<HttpMethod> {
        self.delegate.request_methods(handler, method)
    }

    fn consumes(&self, method: &MethodDescriptor) -> Vec<MediaType> {
        self.delegate.consumes(method)
    }

    fn query_parameters(&self, method: &MethodDescriptor) -> Vec<QueryParameter> {
        self.delegate.query_parameters(method)
    }
}
