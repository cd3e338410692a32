//! Handler metadata.
//!
//! Handlers describe their URI mappings through a static [`HandlerDescriptor`]
//! exposed by the [`Handler`] trait. Methods are referenced from calling code
//! through typed [`HandlerMethod`] constants, so a link to a method can only be
//! built with arguments of the declared types.
//!
//! ```rust,ignore
//! use once_cell::sync::Lazy;
//! use waymark_core::handler::*;
//!
//! pub struct PersonController;
//!
//! impl PersonController {
//!     pub const SHOW: HandlerMethod<Self, (u64,), Person> = HandlerMethod::new("show");
//! }
//!
//! impl Handler for PersonController {
//!     fn descriptor() -> &'static HandlerDescriptor {
//!         static DESCRIPTOR: Lazy<HandlerDescriptor> = Lazy::new(|| {
//!             HandlerDescriptor::of::<PersonController>()
//!                 .mapping("/people")
//!                 .method(
//!                     MethodDescriptor::get("show", "/{id}")
//!                         .param(ParameterDescriptor::path("id"))
//!                         .returns::<Person>(),
//!                 )
//!         });
//!         &DESCRIPTOR
//!     }
//! }
//!
//! waymark_core::register_handler!(PersonController);
//! ```

use crate::http::{HttpMethod, MediaType};
use std::any::{TypeId, type_name};
use std::fmt;
use std::marker::PhantomData;

// ============================================================================
// Parameters
// ============================================================================

/// How a handler parameter participates in a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterRole {
    /// Bound to a mapping variable.
    Path,
    /// Bound to a query parameter.
    Query,
    /// The request body.
    Body,
    /// Anything else (injected context, headers, ...). Ignored for links.
    Other,
}

/// Metadata for one formal parameter of a handler method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescriptor {
    role: ParameterRole,
    name: Option<String>,
    binding_name: Option<String>,
    required: bool,
    default_value: Option<String>,
    option_typed: bool,
    non_composite: bool,
    type_name: Option<&'static str>,
}

impl ParameterDescriptor {
    fn new(role: ParameterRole, binding_name: Option<&str>) -> Self {
        Self {
            role,
            name: None,
            binding_name: binding_name.map(str::to_string),
            required: true,
            default_value: None,
            option_typed: false,
            non_composite: false,
            type_name: None,
        }
    }

    /// A path variable bound by the parameter's own name.
    pub fn path(binding_name: &str) -> Self {
        Self::new(ParameterRole::Path, Some(binding_name))
    }

    /// A query parameter bound by the parameter's own name.
    pub fn query(binding_name: &str) -> Self {
        Self::new(ParameterRole::Query, Some(binding_name))
    }

    /// A request body of type `T`.
    pub fn body<T: ?Sized + 'static>() -> Self {
        Self::new(ParameterRole::Body, None).typed::<T>()
    }

    pub fn other(binding_name: &str) -> Self {
        Self::new(ParameterRole::Other, Some(binding_name))
    }

    /// Explicit variable name, taking precedence over the binding name.
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Drop the binding name, leaving only an explicit name (if any).
    pub fn without_binding_name(mut self) -> Self {
        self.binding_name = None;
        self
    }

    /// Mark the parameter as not required.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// The handler applies this value when the parameter is missing.
    pub fn default_value(mut self, value: &str) -> Self {
        self.default_value = Some(value.to_string());
        self
    }

    /// The parameter is declared as `Option<T>`, so it is never required.
    pub fn option_typed(mut self) -> Self {
        self.option_typed = true;
        self
    }

    /// Render collection values as one comma-separated value instead of
    /// repeating the parameter.
    pub fn non_composite(mut self) -> Self {
        self.non_composite = true;
        self
    }

    pub fn typed<T: ?Sized + 'static>(mut self) -> Self {
        self.type_name = Some(type_name::<T>());
        self
    }

    pub fn role(&self) -> ParameterRole {
        self.role
    }

    /// The variable name: the explicit name, else the binding name.
    pub fn variable_name(&self) -> Option<&str> {
        self.name.as_deref().or(self.binding_name.as_deref())
    }

    pub fn is_required(&self) -> bool {
        self.required && !self.option_typed
    }

    pub fn default(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    pub fn is_non_composite(&self) -> bool {
        self.non_composite
    }

    pub fn type_name(&self) -> Option<&'static str> {
        self.type_name
    }
}

// ============================================================================
// Methods
// ============================================================================

/// Metadata for a handler method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    name: String,
    mapping: Option<String>,
    request_methods: Vec<HttpMethod>,
    consumes: Vec<MediaType>,
    parameters: Vec<ParameterDescriptor>,
    output: Option<&'static str>,
}

macro_rules! verb_constructors {
    ($($fn_name:ident => $method:ident),+ $(,)?) => {
        $(
            #[doc = concat!("A `", stringify!($method), "` method mapped to `mapping`.")]
            pub fn $fn_name(name: &str, mapping: &str) -> Self {
                Self::new(name).mapping(mapping).with_method(HttpMethod::$method)
            }
        )+
    };
}

impl MethodDescriptor {
    /// A method without mapping or verbs.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            mapping: None,
            request_methods: Vec::new(),
            consumes: Vec::new(),
            parameters: Vec::new(),
            output: None,
        }
    }

    verb_constructors! {
        get => GET,
        post => POST,
        put => PUT,
        patch => PATCH,
        delete => DELETE,
    }

    pub fn mapping(mut self, mapping: &str) -> Self {
        self.mapping = Some(mapping.to_string());
        self
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        if !self.request_methods.contains(&method) {
            self.request_methods.push(method);
        }
        self
    }

    pub fn consumes(mut self, media_type: MediaType) -> Self {
        self.consumes.push(media_type);
        self
    }

    pub fn param(mut self, parameter: ParameterDescriptor) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn returns<T: ?Sized + 'static>(mut self) -> Self {
        self.output = Some(type_name::<T>());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared method-level mapping fragment.
    pub fn declared_mapping(&self) -> Option<&str> {
        self.mapping.as_deref()
    }

    /// Declared verbs; a method without any answers `GET`.
    pub fn request_methods(&self) -> Vec<HttpMethod> {
        if self.request_methods.is_empty() {
            vec![HttpMethod::GET]
        } else {
            self.request_methods.clone()
        }
    }

    pub fn consumed_media_types(&self) -> &[MediaType] {
        &self.consumes
    }

    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    pub fn output(&self) -> Option<&'static str> {
        self.output
    }

    /// The body parameter, if the method takes one.
    pub fn input(&self) -> Option<&ParameterDescriptor> {
        self.parameters
            .iter()
            .find(|p| p.role() == ParameterRole::Body)
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Metadata for a handler type.
#[derive(Clone)]
pub struct HandlerDescriptor {
    type_id: TypeId,
    type_name: &'static str,
    mapping: Option<String>,
    parent: Option<fn() -> &'static HandlerDescriptor>,
    methods: Vec<MethodDescriptor>,
    exposes: Option<(TypeId, &'static str)>,
}

impl HandlerDescriptor {
    pub fn of<H: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<H>(),
            type_name: type_name::<H>(),
            mapping: None,
            parent: None,
            methods: Vec::new(),
            exposes: None,
        }
    }

    /// The type-level mapping prefix.
    pub fn mapping(mut self, mapping: &str) -> Self {
        self.mapping = Some(mapping.to_string());
        self
    }

    /// The handler this one inherits methods (and, when it declares no mapping
    /// of its own, the type-level mapping) from.
    pub fn parent<P: Handler>(mut self) -> Self {
        self.parent = Some(P::descriptor);
        self
    }

    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    /// The entity type this handler serves as collection/item resource.
    pub fn exposes<E: 'static>(mut self) -> Self {
        self.exposes = Some((TypeId::of::<E>(), type_name::<E>()));
        self
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The type name without its module path.
    pub fn name(&self) -> &'static str {
        short_type_name(self.type_name)
    }

    pub fn declared_mapping(&self) -> Option<&str> {
        self.mapping.as_deref()
    }

    pub fn parent_descriptor(&self) -> Option<&'static HandlerDescriptor> {
        self.parent.map(|parent| parent())
    }

    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    /// Find a method declared on this handler or one of its parents.
    pub fn find_method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods
            .iter()
            .find(|m| m.name() == name)
            .or_else(|| self.parent_descriptor().and_then(|p| p.find_method(name)))
    }

    pub fn exposed_entity(&self) -> Option<TypeId> {
        self.exposes.map(|(id, _)| id)
    }

    pub fn exposed_entity_name(&self) -> Option<&'static str> {
        self.exposes.map(|(_, name)| name)
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("name", &self.name())
            .field("mapping", &self.mapping)
            .field("parent", &self.parent_descriptor().map(|p| p.name()))
            .field("methods", &self.methods.len())
            .field("exposes", &self.exposed_entity_name())
            .finish()
    }
}

impl PartialEq for HandlerDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for HandlerDescriptor {}

pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    let start = base.rfind("::").map(|i| i + 2).unwrap_or(0);
    &full[start..]
}

/// A type that can be linked to.
pub trait Handler: 'static {
    fn descriptor() -> &'static HandlerDescriptor;
}

/// Declares that `Self` serves the methods of `P`.
///
/// Every handler inherits from itself. Declare parents explicitly:
///
/// ```rust,ignore
/// impl Inherits<ParentController> for ChildController {}
/// ```
pub trait Inherits<P: ?Sized> {}

impl<T: ?Sized> Inherits<T> for T {}

// ============================================================================
// Typed method references
// ============================================================================

/// A typed reference to a method of handler `H`, taking arguments `A`
/// (a tuple) and returning `R`.
pub struct HandlerMethod<H, A, R> {
    name: &'static str,
    _marker: PhantomData<fn(&H, A) -> R>,
}

impl<H, A, R> HandlerMethod<H, A, R> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<H, A, R> Clone for HandlerMethod<H, A, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H, A, R> Copy for HandlerMethod<H, A, R> {}

impl<H, A, R> fmt::Debug for HandlerMethod<H, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", short_type_name(type_name::<H>()), self.name)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// A handler submitted to the process-wide registry.
pub struct HandlerRegistration {
    descriptor: fn() -> &'static HandlerDescriptor,
}

impl HandlerRegistration {
    pub const fn of<H: Handler>() -> Self {
        Self {
            descriptor: H::descriptor,
        }
    }

    pub fn descriptor(&self) -> &'static HandlerDescriptor {
        (self.descriptor)()
    }
}

inventory::collect!(HandlerRegistration);

/// All handlers registered with [`register_handler!`](crate::register_handler).
pub fn registered_handlers() -> impl Iterator<Item = &'static HandlerDescriptor> {
    inventory::iter::<HandlerRegistration>
        .into_iter()
        .map(HandlerRegistration::descriptor)
}

/// Look up a registered handler by type.
pub fn registered_handler(type_id: TypeId) -> Option<&'static HandlerDescriptor> {
    registered_handlers().find(|descriptor| descriptor.type_id() == type_id)
}

/// Register handlers with the process-wide registry.
#[macro_export]
macro_rules! register_handler {
    ($($handler:ty),+ $(,)?) => {
        $(
            $crate::inventory::submit! {
                $crate::handler::HandlerRegistration::of::<$handler>()
            }
        )+
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;

    struct Person;
    struct ParentController;
    struct ChildController;

    impl Handler for ParentController {
        fn descriptor() -> &'static HandlerDescriptor {
            static DESCRIPTOR: Lazy<HandlerDescriptor> = Lazy::new(|| {
                HandlerDescriptor::of::<ParentController>()
                    .mapping("/parent")
                    .method(MethodDescriptor::get("list", "/list"))
            });
            &DESCRIPTOR
        }
    }

    impl Handler for ChildController {
        fn descriptor() -> &'static HandlerDescriptor {
            static DESCRIPTOR: Lazy<HandlerDescriptor> = Lazy::new(|| {
                HandlerDescriptor::of::<ChildController>()
                    .parent::<ParentController>()
                    .exposes::<Person>()
                    .method(
                        MethodDescriptor::post("create", "")
                            .param(ParameterDescriptor::body::<Person>())
                            .consumes(MediaType::json())
                            .returns::<Person>(),
                    )
            });
            &DESCRIPTOR
        }
    }

    register_handler!(ChildController);

    #[test]
    fn test_descriptor_names() {
        let descriptor = ChildController::descriptor();

        assert_eq!(descriptor.name(), "ChildController");
        assert_eq!(descriptor.type_id(), TypeId::of::<ChildController>());
        assert_eq!(short_type_name("alloc::vec::Vec<alloc::string::String>"), "Vec<alloc::string::String>");
    }

    #[test]
    fn test_find_method_searches_parents() {
        let descriptor = ChildController::descriptor();

        assert!(descriptor.find_method("create").is_some());
        assert_eq!(
            descriptor.find_method("list").and_then(|m| m.declared_mapping()),
            Some("/list")
        );
        assert!(descriptor.find_method("missing").is_none());
    }

    #[test]
    fn test_method_defaults_to_get() {
        let method = MethodDescriptor::new("show");
        assert_eq!(method.request_methods(), vec![HttpMethod::GET]);

        let method = MethodDescriptor::put("update", "/{id}").with_method(HttpMethod::PATCH);
        assert_eq!(method.request_methods(), vec![HttpMethod::PUT, HttpMethod::PATCH]);
    }

    #[test]
    fn test_method_input_and_output() {
        let create = ChildController::descriptor().find_method("create").unwrap();

        assert!(create.input().unwrap().type_name().unwrap().ends_with("Person"));
        assert!(create.output().unwrap().ends_with("Person"));
        assert_eq!(create.consumed_media_types(), &[MediaType::json()]);
    }

    #[test]
    fn test_parameter_names() {
        let param = ParameterDescriptor::path("id");
        assert_eq!(param.variable_name(), Some("id"));

        let param = ParameterDescriptor::path("id").named("personId");
        assert_eq!(param.variable_name(), Some("personId"));

        let param = ParameterDescriptor::query("page").without_binding_name();
        assert_eq!(param.variable_name(), None);
    }

    #[test]
    fn test_parameter_requiredness() {
        assert!(ParameterDescriptor::query("page").is_required());
        assert!(!ParameterDescriptor::query("page").optional().is_required());
        assert!(!ParameterDescriptor::query("page").option_typed().is_required());
    }

    #[test]
    fn test_registry_lookup() {
        let found = registered_handler(TypeId::of::<ChildController>());
        assert_eq!(found.map(|d| d.name()), Some("ChildController"));
        assert!(registered_handler(TypeId::of::<ParentController>()).is_none());
    }

    #[test]
    fn test_handler_method_debug() {
        const LIST: HandlerMethod<ParentController, (), ()> = HandlerMethod::new("list");
        assert_eq!(format!("{:?}", LIST), "ParentController::list");
    }
}
