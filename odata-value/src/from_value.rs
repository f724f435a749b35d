use std::collections::{BTreeSet, HashSet};
use std::hash::{BuildHasher, Hash};

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use odata_edm::EdmPrimitiveKind;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    Collection, CollectionSink, DeletedDelta, Delta, DeltaSet, EdmStructuredObject, EntityReference,
    EnumMember, ParameterMap, Primitive, Resource, Value, ValueError,
};

/// Conversion out of a decoded [`Value`].
pub trait FromValue: Sized {
    /// Convert `value`, coercing primitives where that loses no information.
    fn from_value(value: Value) -> Result<Self, ValueError>;
}

fn mismatch<T>(expected: &str, got: &Value) -> Result<T, ValueError> {
    Err(ValueError::type_mismatch(expected, got.describe()))
}

macro_rules! primitive_from_value {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, ValueError> {
                    match value {
                        Value::Primitive(p) => match p.coerce_to(EdmPrimitiveKind::$kind)? {
                            Primitive::$kind(v) => Ok(v),
                            other => Err(ValueError::type_mismatch(
                                EdmPrimitiveKind::$kind.full_name(),
                                other.kind().full_name(),
                            )),
                        },
                        other => mismatch(EdmPrimitiveKind::$kind.full_name(), &other),
                    }
                }
            }
        )*
    };
}

primitive_from_value! {
    bool => Boolean,
    u8 => Byte,
    i8 => SByte,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Single,
    f64 => Double,
    Decimal => Decimal,
    String => String,
    Uuid => Guid,
    NaiveDate => Date,
    NaiveTime => TimeOfDay,
    DateTime<FixedOffset> => DateTimeOffset,
    TimeDelta => Duration,
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        DateTime::<FixedOffset>::from_value(value).map(|dt| dt.with_timezone(&Utc))
    }
}

/// The wall-clock time in the offset the value carries.
impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        DateTime::<FixedOffset>::from_value(value).map(|dt| dt.naive_local())
    }
}

impl FromValue for Bytes {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Primitive(p) => match p.coerce_to(EdmPrimitiveKind::Binary)? {
                Primitive::Binary(v) => Ok(Bytes::from(v)),
                other => Err(ValueError::type_mismatch(
                    "Edm.Binary",
                    other.kind().full_name(),
                )),
            },
            other => mismatch("Edm.Binary", &other),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Elements of a collection, in order. `Vec<u8>` also accepts an `Edm.Binary`.
impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Collection(c) => c.items.into_iter().map(T::from_value).collect(),
            Value::Primitive(Primitive::Binary(bytes)) => bytes
                .into_iter()
                .map(|b| T::from_value(Value::Primitive(Primitive::Byte(b))))
                .collect(),
            other => mismatch("a collection", &other),
        }
    }
}

impl<T: FromValue> FromValue for Box<[T]> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        Vec::<T>::from_value(value).map(Vec::into_boxed_slice)
    }
}

impl<T, S> FromValue for HashSet<T, S>
where
    T: FromValue + Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_value(value: Value) -> Result<Self, ValueError> {
        collect_into(value)
    }
}

impl<T: FromValue + Ord> FromValue for BTreeSet<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        collect_into(value)
    }
}

impl FromValue for EnumMember {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Enum(e) => Ok(e),
            other => mismatch("an enum member", &other),
        }
    }
}

impl FromValue for EntityReference {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::EntityReference(id) => Ok(EntityReference { id }),
            other => mismatch("an entity reference", &other),
        }
    }
}

impl FromValue for Collection {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Collection(c) => Ok(c),
            other => mismatch("a collection", &other),
        }
    }
}

impl FromValue for Box<dyn Resource> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Resource(r) => Ok(r),
            other => mismatch("a resource", &other),
        }
    }
}

impl FromValue for DeltaSet {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::DeltaSet(d) => Ok(d),
            other => mismatch("a delta set", &other),
        }
    }
}

impl FromValue for ParameterMap {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Parameters(p) => Ok(p),
            other => mismatch("action parameters", &other),
        }
    }
}

impl FromValue for EdmStructuredObject {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        resource_from_value(value)
    }
}

impl<T: Resource> FromValue for Delta<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        resource_from_value(value)
    }
}

impl<T: Resource> FromValue for DeletedDelta<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        resource_from_value(value)
    }
}

/// Take a decoded resource as the concrete type `T`.
///
/// Bound types implement [`FromValue`] through this:
///
/// ```
/// # use odata_value::*;
/// #[derive(Debug, Default)]
/// struct Order { id: i32 }
///
/// impl Resource for Order {
///     fn type_name(&self) -> &str { "Order" }
///     fn set_property(&mut self, name: &str, value: Value) -> Result<(), ValueError> {
///         match name {
///             "Id" => assign(&mut self.id, value),
///             _ => Err(ValueError::UnknownProperty {
///                 type_name: "Order".into(),
///                 property: name.into(),
///             }),
///         }
///     }
///     fn property_shape(&self, name: &str) -> Option<PropertyShape> {
///         (name == "Id").then_some(PropertyShape::Single)
///     }
/// }
///
/// impl FromValue for Order {
///     fn from_value(value: Value) -> Result<Self, ValueError> {
///         resource_from_value(value)
///     }
/// }
///
/// let mut order = Order::default();
/// order.set_property("Id", Value::from(7)).unwrap();
/// let order = Order::from_value(Value::Resource(Box::new(order))).unwrap();
/// assert_eq!(order.id, 7);
/// ```
pub fn resource_from_value<T: Resource>(value: Value) -> Result<T, ValueError> {
    match value {
        Value::Resource(r) => {
            let got = r.type_name().to_string();
            r.downcast::<T>()
                .map(|concrete| *concrete)
                .map_err(|_| ValueError::type_mismatch(core::any::type_name::<T>(), got))
        }
        other => mismatch(core::any::type_name::<T>(), &other),
    }
}

/// Build any `Default + Extend` container from a decoded collection.
pub fn collect_into<C, T>(value: Value) -> Result<C, ValueError>
where
    C: Default + Extend<T>,
    T: FromValue,
{
    let items = Vec::<T>::from_value(value)?;
    let mut container = C::default();
    container.extend(items);
    Ok(container)
}

/// Convert `value` and store it in `slot`.
pub fn assign<T: FromValue>(slot: &mut T, value: Value) -> Result<(), ValueError> {
    *slot = T::from_value(value)?;
    Ok(())
}

impl<T: FromValue + Send> CollectionSink for Vec<T> {
    fn clear(&mut self) {
        Vec::clear(self);
    }

    fn push_value(&mut self, value: Value) -> Result<(), ValueError> {
        self.push(T::from_value(value)?);
        Ok(())
    }
}

impl<T, S> CollectionSink for HashSet<T, S>
where
    T: FromValue + Eq + Hash + Send,
    S: BuildHasher + Send,
{
    fn clear(&mut self) {
        HashSet::clear(self);
    }

    fn push_value(&mut self, value: Value) -> Result<(), ValueError> {
        self.insert(T::from_value(value)?);
        Ok(())
    }
}

impl<T: FromValue + Ord + Send> CollectionSink for BTreeSet<T> {
    fn clear(&mut self) {
        BTreeSet::clear(self);
    }

    fn push_value(&mut self, value: Value) -> Result<(), ValueError> {
        self.insert(T::from_value(value)?);
        Ok(())
    }
}
