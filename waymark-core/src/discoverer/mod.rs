//! Mapping discovery.
//!
//! A [`MappingDiscoverer`] answers which raw URI mapping a handler type or
//! method is bound to. Discoverers are stacked: the
//! [`DescriptorMappingDiscoverer`] reads handler descriptors, a
//! [`PropertyResolvingMappingDiscoverer`] substitutes `${…}` placeholders and a
//! [`CachingMappingDiscoverer`] memoizes the result.
//!
//! ```rust,ignore
//! let discoverer = CachingMappingDiscoverer::new(PropertyResolvingMappingDiscoverer::new(
//!     DescriptorMappingDiscoverer::new(),
//!     EnvPlaceholderResolver::new(),
//! ));
//! ```

mod caching;
mod descriptor;
mod placeholder;

pub use caching::CachingMappingDiscoverer;
pub use descriptor::DescriptorMappingDiscoverer;
pub use placeholder::{
    EnvPlaceholderResolver, MapPlaceholderResolver, PlaceholderResolver,
    PropertyResolvingMappingDiscoverer, resolve_placeholders,
};

use crate::affordance::QueryParameter;
use crate::handler::{HandlerDescriptor, MethodDescriptor};
use crate::http::{HttpMethod, MediaType};
use crate::mapping::UriMapping;

/// Discovers URI mappings from handler metadata.
pub trait MappingDiscoverer: Send + Sync {
    /// The type-level mapping of `handler`, falling back to its parent's.
    fn mapping_for_type(&self, handler: &HandlerDescriptor) -> Option<String>;

    /// The mapping of `method` combined with the type-level mapping of the
    /// handler declaring it.
    fn mapping_for_method(
        &self,
        declaring: &HandlerDescriptor,
        method: &MethodDescriptor,
    ) -> Option<String> {
        self.mapping(declaring, method)
    }

    /// The mapping of `method` combined with the type-level mapping of
    /// `handler`, the type the method was invoked on.
    fn mapping(&self, handler: &HandlerDescriptor, method: &MethodDescriptor) -> Option<String>;

    /// The HTTP methods `method` answers to.
    fn request_methods(
        &self,
        _handler: &HandlerDescriptor,
        method: &MethodDescriptor,
    ) -> Vec<HttpMethod> {
        method.request_methods()
    }

    /// The media types `method` accepts as request body.
    fn consumes(&self, method: &MethodDescriptor) -> Vec<MediaType> {
        method.consumed_media_types().to_vec()
    }

    /// The query parameters `method` declares.
    fn query_parameters(&self, method: &MethodDescriptor) -> Vec<QueryParameter> {
        QueryParameter::of(method)
    }

    fn uri_mapping_for_type(&self, handler: &HandlerDescriptor) -> Option<UriMapping> {
        self.mapping_for_type(handler).map(|m| UriMapping::of(&m))
    }

    fn uri_mapping(&self, handler: &HandlerDescriptor, method: &MethodDescriptor) -> Option<UriMapping> {
        self.mapping(handler, method).map(|m| UriMapping::of(&m))
    }
}

impl<D: MappingDiscoverer + ?Sized> MappingDiscoverer for Box<D> {
    fn mapping_for_type(&self, handler: &HandlerDescriptor) -> Option<String> {
        (**self).mapping_for_type(handler)
    }

    fn mapping_for_method(
        &self,
        declaring: &HandlerDescriptor,
        method: &MethodDescriptor,
    ) -> Option<String> {
        (**self).mapping_for_method(declaring, method)
    }

    fn mapping(&self, handler: &HandlerDescriptor, method: &MethodDescriptor) -> Option<String> {
        (**self).mapping(handler, method)
    }

    fn request_methods(&self, handler: &HandlerDescriptor, method: &MethodDescriptor) -> Vec<HttpMethod> {
        (**self).request_methods(handler, method)
    }

    fn consumes(&self, method: &MethodDescriptor) -> Vec<MediaType> {
        (**self).consumes(method)
    }

    fn query_parameters(&self, method: &MethodDescriptor) -> Vec<QueryParameter> {
        (**self).query_parameters(method)
    }
}

/// Combine a type-level and a method-level mapping fragment.
///
/// A missing or empty method fragment yields the type fragment unchanged; a
/// type fragment of `/` yields the method fragment alone.
pub fn combine(type_mapping: Option<&str>, method_mapping: Option<&str>) -> Option<String> {
    let method_mapping = match method_mapping {
        Some(m) if !m.is_empty() => m,
        _ => return type_mapping.map(str::to_string),
    };

    Some(match type_mapping {
        None | Some("/") => cleanup(method_mapping),
        Some(type_mapping) => cleanup(&format!("{}/{}", type_mapping, method_mapping)),
    })
}

/// Remove empty path segments and regex constraints of template variables.
///
/// `/people//{id:[0-9]+}/` becomes `/people/{id}`. Braces are tracked so
/// slashes or colons inside a constraint are left alone.
pub fn cleanup(mapping: &str) -> String {
    let mut result = String::with_capacity(mapping.len());
    let mut depth = 0usize;
    let mut in_constraint = false;
    let mut in_placeholder = false;

    for c in mapping.chars() {
        match c {
            '{' => {
                if depth == 0 && result.ends_with('$') {
                    in_placeholder = true;
                }
                depth += 1;
                if !in_constraint {
                    result.push(c);
                }
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    in_constraint = false;
                    in_placeholder = false;
                    result.push(c);
                } else if !in_constraint {
                    result.push(c);
                }
            }
            ':' if depth == 1 && !in_placeholder => in_constraint = true,
            '/' if depth == 0 => {
                if !result.ends_with('/') {
                    result.push(c);
                }
            }
            _ if in_constraint => {}
            _ => result.push(c),
        }
    }

    while result.len() > 1 && result.ends_with('/') {
        result.pop();
    }

    result
}
