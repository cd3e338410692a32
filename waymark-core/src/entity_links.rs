//! Links to the handlers exposing entity types.
//!
//! A handler declaring `.exposes::<Person>()` serves as the collection
//! resource for `Person`; items live one path segment below it.
//!
//! ```rust,ignore
//! let links = EntityLinks::from_registry(Arc::new(WebHandler::new()));
//!
//! links.link_to_collection_resource::<Person>()?;     // </people>;rel="self"
//! links.link_to_item_resource::<Person>(42)?;         // </people/42>;rel="self"
//! ```

use crate::argument::{Argument, IntoArguments};
use crate::binding::{DefaultDiscoverer, WebHandler};
use crate::discoverer::MappingDiscoverer;
use crate::handler::{HandlerDescriptor, registered_handlers};
use crate::link::{Link, LinkBuilder};
use crate::{Error, Result};
use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Maps entity types to the handlers exposing them.
pub struct EntityLinks<D = DefaultDiscoverer> {
    web_handler: Arc<WebHandler<D>>,
    handlers: HashMap<TypeId, &'static HandlerDescriptor>,
}

impl<D: MappingDiscoverer> EntityLinks<D> {
    /// Index the given handlers. Handlers exposing nothing are skipped; for an
    /// entity exposed twice the last handler wins.
    pub fn new(
        web_handler: Arc<WebHandler<D>>,
        handlers: impl IntoIterator<Item = &'static HandlerDescriptor>,
    ) -> Self {
        let mut index = HashMap::new();

        for handler in handlers {
            if let Some(entity) = handler.exposed_entity() {
                debug!(
                    handler = handler.name(),
                    entity = handler.exposed_entity_name().unwrap_or_default(),
                    "Registering entity handler"
                );
                index.insert(entity, handler);
            }
        }

        Self {
            web_handler,
            handlers: index,
        }
    }

    /// Index every handler registered with
    /// [`register_handler!`](crate::register_handler).
    pub fn from_registry(web_handler: Arc<WebHandler<D>>) -> Self {
        Self::new(web_handler, registered_handlers())
    }

    pub fn supports<E: 'static>(&self) -> bool {
        self.handlers.contains_key(&TypeId::of::<E>())
    }

    /// The handler exposing `E`.
    pub fn handler_for<E: 'static>(&self) -> Result<&'static HandlerDescriptor> {
        self.handlers
            .get(&TypeId::of::<E>())
            .copied()
            .ok_or_else(|| Error::UnexposedEntity(type_name::<E>().to_string()))
    }

    /// A builder pointing at the collection resource of `E`, with
    /// `parameters` filling the variables of its mapping.
    pub fn link_for<E: 'static>(&self, parameters: impl IntoArguments) -> Result<LinkBuilder> {
        let handler = self.handler_for::<E>()?;
        let parameters: Vec<Argument> = parameters.into_arguments();
        self.web_handler.link_to_handler(handler, &parameters)
    }

    pub fn link_to_collection_resource<E: 'static>(&self) -> Result<Link> {
        Ok(self.link_for::<E>(())?.with_self_rel())
    }

    pub fn link_to_item_resource<E: 'static>(&self, id: impl fmt::Display) -> Result<Link> {
        Ok(self.link_for::<E>(())?.slash(id).with_self_rel())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<D> fmt::Debug for EntityLinks<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityLinks")
            .field(
                "entities",
                &self
                    .handlers
                    .values()
                    .filter_map(|h| h.exposed_entity_name())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Handler, MethodDescriptor};
    use once_cell::sync::Lazy;

    struct Order;
    struct Invoice;
    struct OrderController;
    struct CustomerOrderController;

    impl Handler for OrderController {
        fn descriptor() -> &'static HandlerDescriptor {
            static DESCRIPTOR: Lazy<HandlerDescriptor> = Lazy::new(|| {
                HandlerDescriptor::of::<OrderController>()
                    .mapping("/orders")
                    .exposes::<Order>()
                    .method(MethodDescriptor::get("list", ""))
            });
            &DESCRIPTOR
        }
    }

    impl Handler for CustomerOrderController {
        fn descriptor() -> &'static HandlerDescriptor {
            static DESCRIPTOR: Lazy<HandlerDescriptor> = Lazy::new(|| {
                HandlerDescriptor::of::<CustomerOrderController>()
                    .mapping("/customers/{customer}/invoices")
                    .exposes::<Invoice>()
            });
            &DESCRIPTOR
        }
    }

    fn links() -> EntityLinks {
        EntityLinks::new(
            Arc::new(WebHandler::new()),
            [OrderController::descriptor(), CustomerOrderController::descriptor()],
        )
    }

    #[test]
    fn test_collection_and_item_links() {
        let links = links();

        assert_eq!(links.link_to_collection_resource::<Order>().unwrap().href(), "/orders");
        assert_eq!(links.link_to_item_resource::<Order>(42).unwrap().href(), "/orders/42");
    }

    #[test]
    fn test_link_for_binds_parameters() {
        let links = links();
        let link = links.link_for::<Invoice>((7,)).unwrap().slash("2024-01").with_rel("invoice");

        assert_eq!(link.href(), "/customers/7/invoices/2024-01");
        assert_eq!(link.rel().value(), "invoice");
    }

    #[test]
    fn test_unexposed_entity() {
        let links = links();

        assert!(!links.supports::<String>());
        assert!(matches!(
            links.link_to_collection_resource::<String>(),
            Err(Error::UnexposedEntity(_))
        ));
    }

    #[test]
    fn test_only_exposing_handlers_are_indexed() {
        assert_eq!(links().len(), 2);
        assert!(links().supports::<Invoice>());
    }
}
