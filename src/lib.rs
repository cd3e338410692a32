// Waymark - type-safe reverse routing for Rust
//
// Record a call to a handler method, get back the link that reaches it:
// mapping discovery, argument binding, URI templates and affordances.

// Re-export core functionality
pub use waymark_core::*;

// Re-export optional crates
#[cfg(feature = "config")]
pub use waymark_config;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Argument,
        Body,
        EntityLinks,
        Error,
        Handler,
        HandlerDescriptor,
        HandlerMethod,
        Inherits,
        LastInvocationAware,
        Link,
        LinkBuilder,
        LinkRelation,
        MethodDescriptor,
        ParameterDescriptor,
        Result,
        WebHandler,
        method_on,
        register_handler,
    };
}
