//! Recorded argument values.
//!
//! Arguments handed to a recording are captured as [`Argument`]s: the original
//! value (so a registered formatter can render it later) together with its
//! `Display` rendering taken at record time.

use std::any::{Any, TypeId, type_name};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A single recorded value.
#[derive(Clone)]
pub struct Scalar {
    type_id: TypeId,
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
    display: String,
}

impl Scalar {
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Send + Sync + fmt::Display,
    {
        let display = value.to_string();
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            value: Arc::new(value),
            display,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The original value.
    pub fn value(&self) -> &(dyn Any + Send + Sync) {
        self.value.as_ref()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// The `Display` rendering captured when the value was recorded.
    pub fn display(&self) -> &str {
        &self.display
    }
}

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scalar")
            .field("type", &self.type_name)
            .field("value", &self.display)
            .finish()
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.display == other.display
    }
}

impl Eq for Scalar {}

impl Hash for Scalar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.display.hash(state);
    }
}

/// A recorded argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Argument {
    /// No value (`None`).
    Absent,
    Scalar(Scalar),
    Collection(Vec<Scalar>),
    /// Map entries in iteration order; values may be collections.
    Map(Vec<(String, Argument)>),
    /// A value that never ends up in a URI, such as a request body.
    Opaque { type_name: &'static str },
}

impl Argument {
    pub fn is_absent(&self) -> bool {
        matches!(self, Argument::Absent)
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Argument::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }
}

/// Conversion into a recorded [`Argument`].
pub trait IntoArgument {
    fn into_argument(self) -> Argument;
}

/// A value recorded as a single [`Scalar`].
///
/// Implement it for your own identifier types with [`scalar_argument!`].
pub trait ScalarArgument: Any + Send + Sync + fmt::Display + Sized {
    fn into_scalar(self) -> Scalar {
        Scalar::new(self)
    }
}

/// Implements [`ScalarArgument`] and [`IntoArgument`] for `Display` types.
///
/// ```rust,ignore
/// #[derive(Debug, Clone)]
/// struct OrderId(u64);
///
/// impl std::fmt::Display for OrderId { /* ... */ }
///
/// waymark_core::scalar_argument!(OrderId);
/// ```
#[macro_export]
macro_rules! scalar_argument {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::argument::ScalarArgument for $ty {}

            impl $crate::argument::IntoArgument for $ty {
                fn into_argument(self) -> $crate::argument::Argument {
                    $crate::argument::Argument::Scalar(
                        $crate::argument::ScalarArgument::into_scalar(self),
                    )
                }
            }
        )+
    };
}

scalar_argument!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char, String
);

impl IntoArgument for &str {
    fn into_argument(self) -> Argument {
        self.to_string().into_argument()
    }
}

impl IntoArgument for Argument {
    fn into_argument(self) -> Argument {
        self
    }
}

impl<T: IntoArgument> IntoArgument for Option<T> {
    fn into_argument(self) -> Argument {
        match self {
            Some(value) => value.into_argument(),
            None => Argument::Absent,
        }
    }
}

impl<T: ScalarArgument> IntoArgument for Vec<T> {
    fn into_argument(self) -> Argument {
        Argument::Collection(self.into_iter().map(ScalarArgument::into_scalar).collect())
    }
}

impl<T: ScalarArgument + Clone> IntoArgument for &[T] {
    fn into_argument(self) -> Argument {
        self.to_vec().into_argument()
    }
}

impl<K, V> IntoArgument for BTreeMap<K, V>
where
    K: fmt::Display,
    V: IntoArgument,
{
    fn into_argument(self) -> Argument {
        Argument::Map(
            self.into_iter()
                .map(|(key, value)| (key.to_string(), value.into_argument()))
                .collect(),
        )
    }
}

/// Entries are sorted by key so the rendered query string is stable.
impl<K, V, S> IntoArgument for HashMap<K, V, S>
where
    K: fmt::Display,
    V: IntoArgument,
{
    fn into_argument(self) -> Argument {
        let mut entries: Vec<(String, Argument)> = self
            .into_iter()
            .map(|(key, value)| (key.to_string(), value.into_argument()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Argument::Map(entries)
    }
}

/// A request body argument. Bodies are part of the affordance, never of the URI.
#[derive(Debug, Clone, PartialEq)]
pub struct Body<T>(pub T);

impl<T: 'static> IntoArgument for Body<T> {
    fn into_argument(self) -> Argument {
        Argument::Opaque {
            type_name: type_name::<T>(),
        }
    }
}

/// Conversion of an argument tuple into recorded arguments.
pub trait IntoArguments {
    fn into_arguments(self) -> Vec<Argument>;
}

impl IntoArguments for () {
    fn into_arguments(self) -> Vec<Argument> {
        Vec::new()
    }
}

macro_rules! tuple_arguments {
    ($($name:ident),+) => {
        impl<$($name: IntoArgument),+> IntoArguments for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_arguments(self) -> Vec<Argument> {
                let ($($name,)+) = self;
                vec![$($name.into_argument()),+]
            }
        }
    };
}

tuple_arguments!(A);
tuple_arguments!(A, B);
tuple_arguments!(A, B, C);
tuple_arguments!(A, B, C, D);
tuple_arguments!(A, B, C, D, E);
tuple_arguments!(A, B, C, D, E, F);
tuple_arguments!(A, B, C, D, E, F, G);
tuple_arguments!(A, B, C, D, E, F, G, H);

impl IntoArguments for Vec<Argument> {
    fn into_arguments(self) -> Vec<Argument> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_captures_display() {
        let argument = 42u64.into_argument();
        let scalar = argument.as_scalar().unwrap();

        assert_eq!(scalar.display(), "42");
        assert_eq!(scalar.type_id(), TypeId::of::<u64>());
        assert_eq!(scalar.downcast_ref::<u64>(), Some(&42));
    }

    #[test]
    fn test_scalar_equality_includes_type() {
        assert_eq!(1i32.into_argument(), 1i32.into_argument());
        assert_ne!(1i32.into_argument(), 1i64.into_argument());
        assert_eq!("mike".into_argument(), String::from("mike").into_argument());
    }

    #[test]
    fn test_option_maps_to_absent() {
        assert!(None::<i32>.into_argument().is_absent());
        assert_eq!(Some(5).into_argument(), 5.into_argument());
    }

    #[test]
    fn test_collections_and_maps() {
        let argument = vec![2, 3, 4].into_argument();
        assert!(matches!(argument, Argument::Collection(ref items) if items.len() == 3));

        let map = HashMap::from([("b", 2), ("a", 1)]).into_argument();
        let Argument::Map(entries) = map else {
            panic!("expected map argument");
        };
        let keys: Vec<_> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_body_is_opaque() {
        #[derive(Debug)]
        struct Person;

        let argument = Body(Person).into_argument();
        assert!(matches!(argument, Argument::Opaque { type_name } if type_name.ends_with("Person")));
    }

    #[test]
    fn test_tuple_arguments() {
        let arguments = (1, "two", None::<u8>).into_arguments();

        assert_eq!(arguments.len(), 3);
        assert!(arguments[2].is_absent());
        assert!(().into_arguments().is_empty());
    }

    #[derive(Debug, Clone)]
    struct OrderId(u32);

    impl fmt::Display for OrderId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "order-{}", self.0)
        }
    }

    scalar_argument!(OrderId);

    #[test]
    fn test_custom_scalar_argument() {
        let argument = OrderId(7).into_argument();
        assert_eq!(argument.as_scalar().unwrap().display(), "order-7");
    }
}
