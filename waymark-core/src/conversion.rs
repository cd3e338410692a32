// Value formatting for URI variables

use crate::argument::Scalar;
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

type Formatter = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> Option<String> + Send + Sync>;

/// Formats recorded values before they are encoded into a URI.
///
/// Formatters are registered per Rust type; values of any other type fall
/// back to the `Display` rendering captured at record time.
///
/// ```rust,ignore
/// let mut conversions = ConversionService::new();
/// conversions.register::<bool>(|value| if *value { "yes".into() } else { "no".into() });
/// ```
#[derive(Clone, Default)]
pub struct ConversionService {
    formatters: HashMap<TypeId, (&'static str, Formatter)>,
}

impl ConversionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a formatter for values of type `T`, replacing any previous one.
    pub fn register<T, F>(&mut self, formatter: F) -> &mut Self
    where
        T: Any,
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        let formatter: Formatter = Arc::new(move |value| value.downcast_ref::<T>().map(&formatter));
        self.formatters
            .insert(TypeId::of::<T>(), (type_name::<T>(), formatter));
        self
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with<T, F>(mut self, formatter: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        self.register::<T, F>(formatter);
        self
    }

    pub fn can_format(&self, type_id: TypeId) -> bool {
        self.formatters.contains_key(&type_id)
    }

    /// Format a recorded value.
    pub fn format(&self, scalar: &Scalar) -> String {
        if let Some((name, formatter)) = self.formatters.get(&scalar.type_id()) {
            if let Some(formatted) = formatter(scalar.value()) {
                trace!(type_name = %name, "Formatted value with registered formatter");
                return formatted;
            }
        }

        scalar.display().to_string()
    }
}

impl fmt::Debug for ConversionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionService")
            .field(
                "formatters",
                &self.formatters.values().map(|(name, _)| *name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_falls_back_to_display() {
        let conversions = ConversionService::new();
        assert_eq!(conversions.format(&Scalar::new(42)), "42");
        assert_eq!(conversions.format(&Scalar::new(String::from("mike"))), "mike");
    }

    #[test]
    fn test_registered_formatter_wins() {
        let conversions =
            ConversionService::new().with::<bool, _>(|value| if *value { "yes" } else { "no" }.to_string());

        assert!(conversions.can_format(TypeId::of::<bool>()));
        assert_eq!(conversions.format(&Scalar::new(true)), "yes");
        assert_eq!(conversions.format(&Scalar::new(1u8)), "1");
    }

    #[test]
    fn test_register_replaces_previous_formatter() {
        let mut conversions = ConversionService::new();
        conversions.register::<i32, _>(|value| format!("#{}", value));
        conversions.register::<i32, _>(|value| format!("n{}", value));

        assert_eq!(conversions.format(&Scalar::new(3)), "n3");
    }
}
