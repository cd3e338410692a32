//! URI binding.
//!
//! [`WebHandler`] turns a recorded invocation into a [`LinkBuilder`]: it looks
//! up the mapping of the invoked method, binds class-level and method
//! arguments to path variables and query parameters, and records the optional
//! parameters that were left out as trailing template variables.
//!
//! ```rust,ignore
//! let handler = WebHandler::new();
//!
//! let link = handler
//!     .link_to(&method_on::<PersonController>(()).invoke(PersonController::SHOW, (42,)))?
//!     .with_self_rel();
//! assert_eq!(link.href(), "/people/42");
//! ```

use crate::affordance::{AffordanceCache, AffordanceModel};
use crate::argument::{Argument, Scalar};
use crate::conversion::ConversionService;
use crate::discoverer::{
    CachingMappingDiscoverer, DescriptorMappingDiscoverer, EnvPlaceholderResolver, MappingDiscoverer,
    PropertyResolvingMappingDiscoverer,
};
use crate::handler::{HandlerDescriptor, MethodDescriptor, ParameterDescriptor, ParameterRole};
use crate::link::{Link, LinkBuilder};
use crate::mapping::{MappingVariable, UriMapping, VariableValue};
use crate::recorder::{LastInvocationAware, MethodInvocation};
use crate::template::{TemplateRegistry, TemplateVariable, TemplateVariables, is_valid_variable_name};
use crate::uri::BaseUri;
use crate::{Error, Result};
use std::collections::HashMap;
use tracing::{debug, warn};

/// The discoverer stack used by [`WebHandler::new`]: cached mappings with
/// `${…}` placeholders read from the environment.
pub type DefaultDiscoverer = CachingMappingDiscoverer<
    PropertyResolvingMappingDiscoverer<DescriptorMappingDiscoverer, EnvPlaceholderResolver>,
>;

/// Builds links from recorded invocations.
///
/// All caches are owned by the handler and shared by every link it builds;
/// a `WebHandler` is `Send + Sync` and meant to be created once.
#[derive(Debug)]
pub struct WebHandler<D = DefaultDiscoverer> {
    discoverer: D,
    templates: TemplateRegistry,
    conversions: ConversionService,
    affordances: AffordanceCache,
    base_uri: BaseUri,
}

impl WebHandler {
    /// A handler using [`DefaultDiscoverer`], producing root-relative links.
    pub fn new() -> Self {
        Self::with_discoverer(CachingMappingDiscoverer::new(PropertyResolvingMappingDiscoverer::new(
            DescriptorMappingDiscoverer::new(),
            EnvPlaceholderResolver::new(),
        )))
    }
}

impl Default for WebHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: MappingDiscoverer> WebHandler<D> {
    pub fn with_discoverer(discoverer: D) -> Self {
        Self {
            discoverer,
            templates: TemplateRegistry::new(),
            conversions: ConversionService::new(),
            affordances: AffordanceCache::new(),
            base_uri: BaseUri::root(),
        }
    }

    pub fn with_base_uri(mut self, base_uri: BaseUri) -> Self {
        self.base_uri = base_uri;
        self
    }

    pub fn with_conversion_service(mut self, conversions: ConversionService) -> Self {
        self.conversions = conversions;
        self
    }

    pub fn discoverer(&self) -> &D {
        &self.discoverer
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    pub fn affordance_cache(&self) -> &AffordanceCache {
        &self.affordances
    }

    pub fn base_uri(&self) -> &BaseUri {
        &self.base_uri
    }

    /// Build a link to the method last invoked on `recording`.
    pub fn link_to(&self, recording: &impl LastInvocationAware) -> Result<LinkBuilder> {
        let invocation = recording
            .last_invocation()
            .ok_or_else(|| Error::NoInvocation(recording.target().name().to_string()))?;

        self.link_to_invocation(&invocation, &recording.object_parameters())
    }

    /// Build a link to the type-level mapping of the handler `recording` was
    /// started on, ignoring any invocation.
    pub fn link_to_type(&self, recording: &impl LastInvocationAware) -> Result<LinkBuilder> {
        self.link_to_handler(recording.target(), &recording.object_parameters())
    }

    /// Build a link to the type-level mapping of `handler`.
    pub fn link_to_handler(
        &self,
        handler: &HandlerDescriptor,
        object_parameters: &[Argument],
    ) -> Result<LinkBuilder> {
        let raw = self.discoverer.mapping_for_type(handler).ok_or_else(|| {
            warn!(handler = handler.name(), "No type-level mapping for handler");
            Error::NoTypeMapping(handler.name().to_string())
        })?;

        let mapping = self.templates.mapping(&raw);
        let mut values = HashMap::new();
        self.bind_object_parameters(&mapping, object_parameters, &mut values);

        let href = self.base_uri.resolve(&self.expand_mapping(&mapping, values));
        debug!(handler = handler.name(), href = %href, "Built type link");

        Ok(LinkBuilder::with_parts(href, TemplateVariables::none(), Vec::new()))
    }

    /// Build a link for a captured invocation.
    pub fn link_to_invocation(
        &self,
        invocation: &MethodInvocation,
        object_parameters: &[Argument],
    ) -> Result<LinkBuilder> {
        let handler = invocation.target();
        let method = invocation.method()?;
        let arguments = invocation.arguments();

        if arguments.len() != method.parameters().len() {
            return Err(Error::ArgumentCountMismatch {
                handler: invocation.declaring().name().to_string(),
                method: method.name().to_string(),
                expected: method.parameters().len(),
                actual: arguments.len(),
            });
        }

        let raw = self.discoverer.mapping(handler, method).ok_or_else(|| {
            warn!(
                handler = handler.name(),
                method = method.name(),
                "No mapping for handler method"
            );
            Error::NoMapping {
                handler: handler.name().to_string(),
                method: method.name().to_string(),
            }
        })?;

        let mapping = self.templates.mapping(&raw);
        let mut values = HashMap::new();
        self.bind_object_parameters(&mapping, object_parameters, &mut values);

        let mut query = QueryBuilder::default();
        let mut optional = Vec::new();

        for (index, (parameter, argument)) in method.parameters().iter().zip(arguments).enumerate() {
            match parameter.role() {
                ParameterRole::Path => {
                    let name = variable_name(invocation, method, parameter, index)?;
                    self.bind_path_variable(&mapping, name, argument, &mut values);
                }
                ParameterRole::Query => {
                    let name = variable_name(invocation, method, parameter, index)?;
                    if !self.bind_query_parameter(parameter, name, argument, &mut query)? {
                        optional.push(name.to_string());
                    }
                }
                ParameterRole::Body | ParameterRole::Other => {}
            }
        }

        let path = self.expand_mapping(&mapping, values);
        let href = self.base_uri.resolve(&query.append_to(path));

        let mut variables = TemplateVariables::none();
        for (position, name) in optional.into_iter().enumerate() {
            variables.push(if position == 0 && !href.contains('?') {
                TemplateVariable::request_parameter(name)
            } else {
                TemplateVariable::request_parameter_continued(name)
            });
        }

        let link = Link::parse(href.clone())?.with_variables(variables.clone());
        let affordances = self
            .affordances
            .get_or_compute(handler, method, || {
                AffordanceModel::of(&self.discoverer, handler, method)
            })
            .affordances(&link);

        debug!(
            handler = handler.name(),
            method = method.name(),
            href = %href,
            templated = !variables.is_empty(),
            "Built link"
        );

        Ok(LinkBuilder::with_parts(href, variables, affordances))
    }

    /// Class-level arguments fill the mapping's variables in order.
    fn bind_object_parameters(
        &self,
        mapping: &UriMapping,
        object_parameters: &[Argument],
        values: &mut HashMap<String, VariableValue>,
    ) {
        for (variable, argument) in mapping.variables().iter().zip(object_parameters) {
            if let Some(value) = self.path_value(variable, argument) {
                values.insert(variable.key(), VariableValue::Expanded(value));
            }
        }
    }

    fn bind_path_variable(
        &self,
        mapping: &UriMapping,
        name: &str,
        argument: &Argument,
        values: &mut HashMap<String, VariableValue>,
    ) {
        let variable = mapping
            .variable(name)
            .cloned()
            .unwrap_or_else(|| MappingVariable::new(name));

        match self.path_value(&variable, argument) {
            Some(value) => {
                values.insert(variable.key(), VariableValue::Expanded(value));
            }
            None => {
                values.entry(variable.key()).or_insert_with(|| variable.absent_value());
            }
        }
    }

    /// The encoded substitution for a path variable, `None` when absent.
    fn path_value(&self, variable: &MappingVariable, argument: &Argument) -> Option<String> {
        let formatted = match argument {
            Argument::Scalar(scalar) => self.conversions.format(scalar),
            Argument::Collection(items) if !variable.is_capturing() => {
                return Some(
                    items
                        .iter()
                        .map(|item| urlencoding::encode(&self.conversions.format(item)).into_owned())
                        .collect::<Vec<_>>()
                        .join(","),
                );
            }
            Argument::Collection(items) => items
                .iter()
                .map(|item| self.conversions.format(item))
                .collect::<Vec<_>>()
                .join("/"),
            Argument::Absent | Argument::Map(_) | Argument::Opaque { .. } => return None,
        };

        if variable.is_capturing() {
            Some(
                formatted
                    .split('/')
                    .filter(|segment| !segment.is_empty())
                    .map(|segment| format!("/{}", urlencoding::encode(segment)))
                    .collect(),
            )
        } else {
            Some(urlencoding::encode(&formatted).into_owned())
        }
    }

    /// Add the query parameter for `argument`.
    ///
    /// Returns `false` when the parameter was left out and should be offered
    /// as an optional template variable.
    fn bind_query_parameter(
        &self,
        parameter: &ParameterDescriptor,
        name: &str,
        argument: &Argument,
        query: &mut QueryBuilder,
    ) -> Result<bool> {
        match argument {
            Argument::Scalar(scalar) => query.push(name, &self.conversions.format(scalar)),
            Argument::Collection(items) => self.push_collection(parameter, name, items, query),
            Argument::Map(entries) => {
                for (key, value) in entries {
                    match value {
                        Argument::Scalar(scalar) => query.push(key, &self.conversions.format(scalar)),
                        Argument::Collection(items) => {
                            for item in items {
                                query.push(key, &self.conversions.format(item));
                            }
                        }
                        _ => {}
                    }
                }
            }
            Argument::Opaque { .. } => {}
            Argument::Absent => {
                if !parameter.is_required() {
                    return Ok(false);
                }
                match parameter.default() {
                    Some(default) => query.push(name, default),
                    None if is_valid_variable_name(name) => query.push_placeholder(name),
                    None => return Err(Error::InvalidParameterName(name.to_string())),
                }
            }
        }

        Ok(true)
    }

    fn push_collection(
        &self,
        parameter: &ParameterDescriptor,
        name: &str,
        items: &[Scalar],
        query: &mut QueryBuilder,
    ) {
        if items.is_empty() {
            return;
        }

        if parameter.is_non_composite() {
            let joined = items
                .iter()
                .map(|item| urlencoding::encode(&self.conversions.format(item)).into_owned())
                .collect::<Vec<_>>()
                .join(",");
            query.push_encoded(name, &joined);
        } else {
            for item in items {
                query.push(name, &self.conversions.format(item));
            }
        }
    }

    /// Expand `mapping`, giving every unbound variable its absent value.
    fn expand_mapping(&self, mapping: &UriMapping, mut values: HashMap<String, VariableValue>) -> String {
        for variable in mapping.variables() {
            values
                .entry(variable.key())
                .or_insert_with(|| variable.absent_value());
        }
        mapping.expand(&values)
    }
}

fn variable_name<'a>(
    invocation: &MethodInvocation,
    method: &MethodDescriptor,
    parameter: &'a ParameterDescriptor,
    index: usize,
) -> Result<&'a str> {
    parameter.variable_name().ok_or_else(|| {
        warn!(
            handler = invocation.declaring().name(),
            method = method.name(),
            index,
            "Parameter has neither an explicit nor a binding name"
        );
        Error::UnnamedParameter {
            handler: invocation.declaring().name().to_string(),
            method: method.name().to_string(),
            index,
        }
    })
}

/// Query string under construction. Names and values are encoded on push.
#[derive(Debug, Default)]
struct QueryBuilder {
    pairs: Vec<String>,
}

impl QueryBuilder {
    fn push(&mut self, name: &str, value: &str) {
        self.pairs.push(format!(
            "{}={}",
            urlencoding::encode(name),
            urlencoding::encode(value)
        ));
    }

    /// Push a value that is already percent-encoded.
    fn push_encoded(&mut self, name: &str, value: &str) {
        self.pairs.push(format!("{}={}", urlencoding::encode(name), value));
    }

    /// `name={name}`, left for the caller to expand.
    fn push_placeholder(&mut self, name: &str) {
        self.pairs.push(format!("{}={{{}}}", urlencoding::encode(name), name));
    }

    fn append_to(self, mut path: String) -> String {
        if self.pairs.is_empty() {
            return path;
        }

        path.push(if path.contains('?') { '&' } else { '?' });
        path.push_str(&self.pairs.join("&"));
        path
    }
}
