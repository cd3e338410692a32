//! Affordances: the operations a link offers.
//!
//! Every HTTP verb a handler method answers to yields one [`Affordance`]
//! carrying what a client needs to invoke it (input and output shape, query
//! parameters, accepted media types). Rendering affordances into a hypermedia
//! format is left to the caller.

use crate::cache::CacheStats;
use crate::discoverer::MappingDiscoverer;
use crate::handler::{HandlerDescriptor, MethodDescriptor, ParameterRole};
use crate::http::{HttpMethod, MediaType};
use crate::link::Link;
use parking_lot::RwLock;
use serde::Serialize;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// A query parameter declared by a handler method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QueryParameter {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    required: bool,
}

impl QueryParameter {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            required: false,
        }
    }

    /// Attach a (default) value.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// The named query parameters of `method`, in declaration order.
    ///
    /// A parameter with a default value is never required.
    pub fn of(method: &MethodDescriptor) -> Vec<QueryParameter> {
        method
            .parameters()
            .iter()
            .filter(|p| p.role() == ParameterRole::Query)
            .filter_map(|p| {
                let name = p.variable_name()?;
                let parameter = if p.is_required() && p.default().is_none() {
                    QueryParameter::required(name)
                } else {
                    QueryParameter::optional(name)
                };
                Some(match p.default() {
                    Some(value) => parameter.with_value(value),
                    None => parameter,
                })
            })
            .collect()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }
}

/// The call-invariant part of a handler method's affordances: verbs, input
/// and output shape, query parameters and accepted media types.
#[derive(Debug, Clone, PartialEq)]
pub struct AffordanceModel {
    name: String,
    http_methods: Vec<HttpMethod>,
    input: Option<&'static str>,
    output: Option<&'static str>,
    query_parameters: Vec<QueryParameter>,
    consumes: Vec<MediaType>,
}

impl AffordanceModel {
    pub fn of<D>(discoverer: &D, handler: &HandlerDescriptor, method: &MethodDescriptor) -> Self
    where
        D: MappingDiscoverer + ?Sized,
    {
        Self {
            name: method.name().to_string(),
            http_methods: discoverer.request_methods(handler, method),
            input: method.input().and_then(|p| p.type_name()),
            output: method.output(),
            query_parameters: discoverer.query_parameters(method),
            consumes: discoverer.consumes(method),
        }
    }

    /// One affordance per verb, targeting `link`.
    pub fn affordances(&self, link: &Link) -> Vec<Affordance> {
        let link = link.clone().with_rel(self.name.as_str());

        self.http_methods
            .iter()
            .map(|&http_method| Affordance {
                name: self.name.clone(),
                link: link.clone(),
                http_method,
                input: self.input,
                output: self.output,
                query_parameters: self.query_parameters.clone(),
                consumes: self.consumes.clone(),
            })
            .collect()
    }

    pub fn http_methods(&self) -> &[HttpMethod] {
        &self.http_methods
    }
}

/// One operation afforded by a link.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Affordance {
    name: String,
    #[serde(skip)]
    link: Link,
    http_method: HttpMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    input: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'static str>,
    query_parameters: Vec<QueryParameter>,
    consumes: Vec<MediaType>,
}

impl Affordance {
    /// One affordance per verb `method` answers to, targeting `link`.
    pub fn for_method<D>(
        discoverer: &D,
        handler: &HandlerDescriptor,
        method: &MethodDescriptor,
        link: &Link,
    ) -> Vec<Affordance>
    where
        D: MappingDiscoverer + ?Sized,
    {
        AffordanceModel::of(discoverer, handler, method).affordances(link)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn link(&self) -> &Link {
        &self.link
    }

    pub fn http_method(&self) -> HttpMethod {
        self.http_method
    }

    /// Type name of the request body, if any.
    pub fn input(&self) -> Option<&'static str> {
        self.input
    }

    /// Type name of the handler's return value.
    pub fn output(&self) -> Option<&'static str> {
        self.output
    }

    pub fn query_parameters(&self) -> &[QueryParameter] {
        &self.query_parameters
    }

    pub fn consumes(&self) -> &[MediaType] {
        &self.consumes
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AffordanceKey {
    type_id: TypeId,
    method: String,
}

/// Caches affordance models by handler type and method.
///
/// Keys come from the handlers declared in the process, so the cache stops
/// growing once every method has been linked to.
#[derive(Debug, Default)]
pub struct AffordanceCache {
    entries: RwLock<HashMap<AffordanceKey, Arc<AffordanceModel>>>,
    stats: CacheStats,
}

impl AffordanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute<F>(
        &self,
        handler: &HandlerDescriptor,
        method: &MethodDescriptor,
        compute: F,
    ) -> Arc<AffordanceModel>
    where
        F: FnOnce() -> AffordanceModel,
    {
        let key = AffordanceKey {
            type_id: handler.type_id(),
            method: method.name().to_string(),
        };

        if let Some(model) = self.entries.read().get(&key) {
            self.stats.record_hit();
            return Arc::clone(model);
        }

        self.stats.record_miss();
        let model = Arc::new(compute());
        trace!(
            handler = handler.name(),
            method = method.name(),
            verbs = model.http_methods.len(),
            "Caching affordance model"
        );

        Arc::clone(self.entries.write().entry(key).or_insert(model))
    }

    /// Get cache statistics.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
