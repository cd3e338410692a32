use super::{MappingDiscoverer, combine};
use crate::handler::{HandlerDescriptor, MethodDescriptor};
use tracing::trace;

/// Reads mappings straight from handler descriptors.
#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptorMappingDiscoverer;

impl DescriptorMappingDiscoverer {
    pub fn new() -> Self {
        Self
    }
}

impl MappingDiscoverer for DescriptorMappingDiscoverer {
    fn mapping_for_type(&self, handler: &HandlerDescriptor) -> Option<String> {
        if let Some(mapping) = handler.declared_mapping() {
            return Some(mapping.to_string());
        }

        let parent = handler.parent_descriptor()?;
        trace!(
            handler = handler.name(),
            parent = parent.name(),
            "Using parent type mapping"
        );
        self.mapping_for_type(parent)
    }

    fn mapping(&self, handler: &HandlerDescriptor, method: &MethodDescriptor) -> Option<String> {
        let type_mapping = self.mapping_for_type(handler);
        combine(type_mapping.as_deref(), method.declared_mapping())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Handler, ParameterDescriptor};
    use once_cell::sync::Lazy;

    struct Parent;
    struct Child;
    struct Orphan;

    impl Handler for Parent {
        fn descriptor() -> &'static HandlerDescriptor {
            static DESCRIPTOR: Lazy<HandlerDescriptor> = Lazy::new(|| {
                HandlerDescriptor::of::<Parent>()
                    .mapping("/parent")
                    .method(MethodDescriptor::get("show", "/{id:[0-9]+}").param(ParameterDescriptor::path("id")))
            });
            &DESCRIPTOR
        }
    }

    impl Handler for Child {
        fn descriptor() -> &'static HandlerDescriptor {
            static DESCRIPTOR: Lazy<HandlerDescriptor> =
                Lazy::new(|| HandlerDescriptor::of::<Child>().mapping("/child").parent::<Parent>());
            &DESCRIPTOR
        }
    }

    impl Handler for Orphan {
        fn descriptor() -> &'static HandlerDescriptor {
            static DESCRIPTOR: Lazy<HandlerDescriptor> = Lazy::new(|| {
                HandlerDescriptor::of::<Orphan>().method(MethodDescriptor::new("unmapped"))
            });
            &DESCRIPTOR
        }
    }

    #[test]
    fn test_type_mapping() {
        let discoverer = DescriptorMappingDiscoverer::new();
        assert_eq!(discoverer.mapping_for_type(Parent::descriptor()).as_deref(), Some("/parent"));
        assert_eq!(discoverer.mapping_for_type(Orphan::descriptor()), None);
    }

    #[test]
    fn test_invoked_type_mapping_wins() {
        let discoverer = DescriptorMappingDiscoverer::new();
        let show = Parent::descriptor().find_method("show").unwrap();

        assert_eq!(
            discoverer.mapping_for_method(Parent::descriptor(), show).as_deref(),
            Some("/parent/{id}")
        );
        assert_eq!(
            discoverer.mapping(Child::descriptor(), show).as_deref(),
            Some("/child/{id}")
        );
    }

    #[test]
    fn test_no_mapping_at_all() {
        let discoverer = DescriptorMappingDiscoverer::new();
        let unmapped = Orphan::descriptor().find_method("unmapped").unwrap();

        assert_eq!(discoverer.mapping(Orphan::descriptor(), unmapped), None);
    }

    #[test]
    fn test_uri_mapping_is_parsed() {
        let discoverer = DescriptorMappingDiscoverer::new();
        let show = Parent::descriptor().find_method("show").unwrap();
        let mapping = discoverer.uri_mapping(Parent::descriptor(), show).unwrap();

        assert_eq!(mapping.variables().len(), 1);
        assert_eq!(mapping.variables()[0].name(), "id");
    }
}
