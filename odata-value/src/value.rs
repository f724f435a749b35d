use core::fmt;

use odata_edm::EdmTypeRef;

use crate::{DeltaSet, ParameterMap, Primitive, Resource};

/// A decoded value.
///
/// `Null` is only ever produced for a payload that was literally `null`;
/// failures are reported as errors.
#[derive(Debug)]
pub enum Value {
    /// The payload was `null`.
    Null,
    /// A primitive.
    Primitive(Primitive),
    /// An enumeration member.
    Enum(EnumMember),
    /// A structured value: a bound Rust type, a delta wrapper or an untyped object.
    Resource(Box<dyn Resource>),
    /// A collection of primitives, enums or resources.
    Collection(Collection),
    /// A change set.
    DeltaSet(DeltaSet),
    /// Named action parameters.
    Parameters(ParameterMap),
    /// A reference to an entity by its id.
    EntityReference(String),
}

impl Value {
    /// Whether this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The primitive, if this is one.
    pub fn as_primitive(&self) -> Option<&Primitive> {
        match self {
            Value::Primitive(p) => Some(p),
            _ => None,
        }
    }

    /// The enum member, if this is one.
    pub fn as_enum(&self) -> Option<&EnumMember> {
        match self {
            Value::Enum(e) => Some(e),
            _ => None,
        }
    }

    /// The resource, if this is one.
    pub fn as_resource(&self) -> Option<&dyn Resource> {
        match self {
            Value::Resource(r) => Some(r.as_ref()),
            _ => None,
        }
    }

    /// The resource, if this is one.
    pub fn into_resource(self) -> Option<Box<dyn Resource>> {
        match self {
            Value::Resource(r) => Some(r),
            _ => None,
        }
    }

    /// The collection, if this is one.
    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            Value::Collection(c) => Some(c),
            _ => None,
        }
    }

    /// The change set, if this is one.
    pub fn as_delta_set(&self) -> Option<&DeltaSet> {
        match self {
            Value::DeltaSet(d) => Some(d),
            _ => None,
        }
    }

    /// A short description of what this value holds, for error messages.
    pub fn describe(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Primitive(p) => p.kind().full_name().to_string(),
            Value::Enum(e) => e.type_name.clone(),
            Value::Resource(r) => r.type_name().to_string(),
            Value::Collection(c) => format!("Collection({})", c.element_type),
            Value::DeltaSet(_) => "a delta set".to_string(),
            Value::Parameters(_) => "action parameters".to_string(),
            Value::EntityReference(_) => "an entity reference".to_string(),
        }
    }
}

impl From<Primitive> for Value {
    fn from(value: Primitive) -> Self {
        Value::Primitive(value)
    }
}

macro_rules! impl_value_from_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Primitive(Primitive::from(value))
                }
            }
        )*
    };
}

impl_value_from_primitive!(bool, u8, i8, i16, i32, i64, f32, f64, String, &str);

impl From<EnumMember> for Value {
    fn from(value: EnumMember) -> Self {
        Value::Enum(value)
    }
}

/// A member of a schema enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    /// Full name of the enumeration type.
    pub type_name: String,
    /// Member name. For a flags enum, a comma-separated list of member names.
    pub member: String,
}

impl EnumMember {
    /// A member `member` of `type_name`.
    pub fn new(type_name: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            member: member.into(),
        }
    }

    /// The individual member names (one, unless this is a flags combination).
    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.member
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

impl fmt::Display for EnumMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}'{}'", self.type_name, self.member)
    }
}

/// A decoded collection, in payload order.
#[derive(Debug)]
pub struct Collection {
    /// The declared element type.
    pub element_type: EdmTypeRef,
    /// The elements.
    pub items: Vec<Value>,
}

impl Collection {
    /// An empty collection of `element_type`.
    pub fn new(element_type: EdmTypeRef) -> Self {
        Self {
            element_type,
            items: Vec::new(),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no elements.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate the elements.
    pub fn iter(&self) -> core::slice::Iter<'_, Value> {
        self.items.iter()
    }
}

impl IntoIterator for Collection {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// The id of a referenced entity, as carried by an entity reference link.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityReference {
    /// The entity id (usually a URL).
    pub id: String,
}

impl EntityReference {
    /// A reference to the entity with id `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}
