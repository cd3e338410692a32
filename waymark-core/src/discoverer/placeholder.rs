// `${key}` / `${key:default}` placeholder resolution for mappings

use super::MappingDiscoverer;
use crate::affordance::QueryParameter;
use crate::handler::{HandlerDescriptor, MethodDescriptor};
use crate::http::{HttpMethod, MediaType};
use std::collections::HashMap;
use tracing::debug;

/// A source of placeholder values.
pub trait PlaceholderResolver: Send + Sync {
    fn resolve(&self, key: &str) -> Option<String>;
}

impl<R: PlaceholderResolver + ?Sized> PlaceholderResolver for std::sync::Arc<R> {
    fn resolve(&self, key: &str) -> Option<String> {
        (**self).resolve(key)
    }
}

/// Resolves placeholders from a fixed map.
#[derive(Debug, Clone, Default)]
pub struct MapPlaceholderResolver {
    values: HashMap<String, String>,
}

impl MapPlaceholderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapPlaceholderResolver {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl PlaceholderResolver for MapPlaceholderResolver {
    fn resolve(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Resolves placeholders from environment variables.
///
/// Keys are upper-cased with `.` and `-` mapped to `_`, so `${base-path}`
/// reads `BASE_PATH` (or `{PREFIX}_BASE_PATH` with a prefix).
#[derive(Debug, Clone, Default)]
pub struct EnvPlaceholderResolver {
    prefix: Option<String>,
}

impl EnvPlaceholderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn variable_name(&self, key: &str) -> String {
        let key = key.to_uppercase().replace(['.', '-'], "_");
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key),
            None => key,
        }
    }
}

impl PlaceholderResolver for EnvPlaceholderResolver {
    fn resolve(&self, key: &str) -> Option<String> {
        std::env::var(self.variable_name(key)).ok()
    }
}

/// Substitute `${key}` and `${key:default}` placeholders.
///
/// Placeholders that neither resolve nor carry a default are left as they are.
pub fn resolve_placeholders(source: &str, resolver: &dyn PlaceholderResolver) -> String {
    let mut result = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = closing_brace(after) else {
            result.push_str(&rest[start..]);
            return result;
        };

        let placeholder = &after[..end];
        let (key, default) = match placeholder.split_once(':') {
            Some((key, default)) => (key, Some(default)),
            None => (placeholder, None),
        };

        match resolver.resolve(key.trim()).or_else(|| default.map(str::to_string)) {
            Some(value) => result.push_str(&value),
            None => {
                debug!(placeholder = key, "Unresolvable placeholder in mapping");
                result.push_str(&rest[start..start + 2 + end + 1]);
            }
        }

        rest = &after[end + 1..];
    }

    result.push_str(rest);
    result
}

fn closing_brace(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (index, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' if depth == 0 => return Some(index),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Resolves placeholders in the mappings of a wrapped discoverer.
#[derive(Debug, Clone)]
pub struct PropertyResolvingMappingDiscoverer<D, R> {
    delegate: D,
    resolver: R,
}

impl<D: MappingDiscoverer, R: PlaceholderResolver> PropertyResolvingMappingDiscoverer<D, R> {
    pub fn new(delegate: D, resolver: R) -> Self {
        Self { delegate, resolver }
    }

    fn resolve(&self, mapping: Option<String>) -> Option<String> {
        mapping.map(|m| resolve_placeholders(&m, &self.resolver))
    }
}

impl<D: MappingDiscoverer, R: PlaceholderResolver> MappingDiscoverer
    for PropertyResolvingMappingDiscoverer<D, R>
{
    fn mapping_for_type(&self, handler: &HandlerDescriptor) -> Option<String> {
        self.resolve(self.delegate.mapping_for_type(handler))
    }

    fn mapping_for_method(
        &self,
        declaring: &HandlerDescriptor,
        method: &MethodDescriptor,
    ) -> Option<String> {
        self.resolve(self.delegate.mapping_for_method(declaring, method))
    }

    fn mapping(&self, handler: &HandlerDescriptor, method: &MethodDescriptor) -> Option<String> {
        self.resolve(self.delegate.mapping(handler, method))
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discoverer::DescriptorMappingDiscoverer;
    use crate::handler::Handler;
    use once_cell::sync::Lazy;

    struct VersionedController;

    impl Handler for VersionedController {
        fn descriptor() -> &'static HandlerDescriptor {
            static DESCRIPTOR: Lazy<HandlerDescriptor> = Lazy::new(|| {
                HandlerDescriptor::of::<VersionedController>()
                    .mapping("${api.base:/api}/${api.version}")
                    .method(MethodDescriptor::get("list", "/items"))
            });
            &DESCRIPTOR
        }
    }

    #[test]
    fn test_resolves_placeholders() {
        let resolver = MapPlaceholderResolver::new().with("base", "/api");
        assert_eq!(resolve_placeholders("${base}/people", &resolver), "/api/people");
    }

    #[test]
    fn test_default_values() {
        let resolver = MapPlaceholderResolver::new();
        assert_eq!(resolve_placeholders("${base:/v1}/people", &resolver), "/v1/people");
    }

    #[test]
    fn test_unresolvable_placeholder_is_kept() {
        let resolver = MapPlaceholderResolver::new();
        assert_eq!(resolve_placeholders("/${missing}/{id}", &resolver), "/${missing}/{id}");
        assert_eq!(resolve_placeholders("/${broken", &resolver), "/${broken");
    }

    #[test]
    fn test_template_variables_are_untouched() {
        let resolver = MapPlaceholderResolver::from_iter([("id", "nope")]);
        assert_eq!(resolve_placeholders("/people/{id}", &resolver), "/people/{id}");
    }

    #[test]
    fn test_env_variable_names() {
        assert_eq!(EnvPlaceholderResolver::new().variable_name("base-path"), "BASE_PATH");
        assert_eq!(
            EnvPlaceholderResolver::with_prefix("APP").variable_name("api.version"),
            "APP_API_VERSION"
        );
    }

    #[test]
    fn test_discoverer_resolves_type_and_method_mappings() {
        let discoverer = PropertyResolvingMappingDiscoverer::new(
            DescriptorMappingDiscoverer::new(),
            MapPlaceholderResolver::new().with("api.version", "v2"),
        );
        let handler = VersionedController::descriptor();
        let list = handler.find_method("list").unwrap();

        assert_eq!(discoverer.mapping_for_type(handler).as_deref(), Some("/api/v2"));
        assert_eq!(discoverer.mapping(handler, list).as_deref(), Some("/api/v2/items"));
    }
}
