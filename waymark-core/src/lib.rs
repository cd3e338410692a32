// Core library for Waymark type-safe reverse routing
// Records handler invocations, discovers their URI mappings and binds the
// recorded arguments into links.

pub mod affordance;
pub mod argument;
pub mod binding;
pub mod cache;
pub mod conversion;
pub mod discoverer;
pub mod entity_links;
pub mod error;
pub mod handler;
pub mod http;
pub mod link;
pub mod logging;
pub mod mapping;
pub mod recorder;
pub mod template;
pub mod uri;

// Re-export commonly used types
pub use crate::http::{HttpMethod, MediaType};
pub use affordance::{Affordance, AffordanceCache, AffordanceModel, QueryParameter};
pub use argument::{Argument, Body, IntoArgument, IntoArguments, Scalar, ScalarArgument};
pub use binding::{DefaultDiscoverer, WebHandler};
pub use cache::CacheStats;
pub use conversion::ConversionService;
pub use discoverer::{
    CachingMappingDiscoverer, DescriptorMappingDiscoverer, EnvPlaceholderResolver,
    MapPlaceholderResolver, MappingDiscoverer, PlaceholderResolver,
    PropertyResolvingMappingDiscoverer,
};
pub use entity_links::EntityLinks;
pub use error::*;
pub use handler::{
    Handler, HandlerDescriptor, HandlerMethod, Inherits, MethodDescriptor, ParameterDescriptor,
    ParameterRole,
};
pub use link::{Link, LinkBuilder, LinkRelation};
pub use mapping::{MappingVariable, UriMapping};
pub use recorder::{InvocationRecorder, LastInvocationAware, MethodInvocation, Recording, method_on};
pub use template::{TemplateRegistry, TemplateVariable, TemplateVariables, UriTemplate, VariableType};
pub use uri::BaseUri;

#[doc(hidden)]
pub use inventory;
