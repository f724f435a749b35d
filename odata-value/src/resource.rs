use core::any::Any;
use core::fmt;

use indexmap::IndexMap;

use crate::{EdmStructuredObject, Value, ValueError};

/// Dynamic (undeclared) properties of an open type, in payload order.
pub type DynamicProperties = IndexMap<String, Value>;

/// Instance annotations (`@ns.term`) of a resource, in payload order.
pub type InstanceAnnotations = IndexMap<String, Value>;

/// Upcasting helper so resources can be downcast back to their concrete type.
pub trait AsAny: Any {
    /// `&self` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
    /// `&mut self` as `&mut dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// The box as `Box<dyn Any>`.
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<T: Any + Send> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// How a resource stores a property, as far as the decoder cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyShape {
    /// A single value: primitive, enum or nested resource.
    Single,
    /// An untyped slot that takes whatever was decoded, collections included.
    Any,
    /// A collection-typed property.
    Collection {
        /// What the Rust side stores the elements in.
        kind: CollectionKind,
        /// `false` for a get-only collection: the decoder appends into the
        /// existing instance through [`Resource::collection_mut`] instead of
        /// replacing it.
        settable: bool,
    },
}

/// The Rust container behind a collection-typed property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    /// `Vec<T>`
    List,
    /// `HashSet<T>` / `BTreeSet<T>`
    Set,
    /// `Box<[T]>`
    Array,
    /// Any other container that can be built element by element.
    Custom,
}

/// Why a resource shows up as deleted in a change set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeletedReason {
    /// The entity was deleted.
    #[default]
    Deleted,
    /// The entity left the set because a link changed; it still exists.
    Changed,
}

impl DeletedReason {
    /// Parse the wire spelling (`deleted` or `changed`).
    pub fn from_wire(reason: &str) -> Option<Self> {
        match reason {
            "deleted" => Some(DeletedReason::Deleted),
            "changed" => Some(DeletedReason::Changed),
            _ => None,
        }
    }
}

impl fmt::Display for DeletedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeletedReason::Deleted => "deleted",
            DeletedReason::Changed => "changed",
        })
    }
}

/// Deletion facts carried by a deleted resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletedMetadata {
    /// The entity id, if the payload carried one.
    pub id: Option<String>,
    /// Why the entity was removed.
    pub reason: DeletedReason,
}

/// A growable collection held by a resource property.
pub trait CollectionSink: Send {
    /// Remove every element.
    fn clear(&mut self);
    /// Append one decoded element.
    fn push_value(&mut self, value: Value) -> Result<(), ValueError>;
}

/// A structured target the decoder writes into.
///
/// Bound Rust types implement this by hand: `set_property` assigns a decoded
/// value to a field (usually through [`FromValue`](crate::FromValue)) and
/// `property_shape` tells the decoder how a collection-valued field is stored.
/// The remaining methods are optional capabilities.
pub trait Resource: AsAny + Send + fmt::Debug {
    /// Name of the target type, for diagnostics.
    fn type_name(&self) -> &str;

    /// Assign a decoded value to the property `name`.
    fn set_property(&mut self, name: &str, value: Value) -> Result<(), ValueError>;

    /// How the property `name` is stored, or `None` if the type has no such property.
    fn property_shape(&self, name: &str) -> Option<PropertyShape>;

    /// The existing instance behind a get-only collection property.
    ///
    /// `None` means the property holds no instance to append into.
    fn collection_mut(&mut self, name: &str) -> Option<&mut dyn CollectionSink> {
        let _ = name;
        None
    }

    /// The bag that receives undeclared properties of an open type.
    fn dynamic_properties_mut(&mut self) -> Option<&mut DynamicProperties> {
        None
    }

    /// The bag that receives instance annotations.
    fn instance_annotations_mut(&mut self) -> Option<&mut InstanceAnnotations> {
        None
    }

    /// Deletion metadata, for resources that represent a deleted entity.
    fn deleted_metadata(&self) -> Option<&DeletedMetadata> {
        None
    }

    /// Mutable deletion metadata.
    fn deleted_metadata_mut(&mut self) -> Option<&mut DeletedMetadata> {
        None
    }

    /// The untyped object behind this resource, if it is one.
    fn as_structured_object_mut(&mut self) -> Option<&mut EdmStructuredObject> {
        None
    }
}

impl dyn Resource {
    /// Whether the concrete type is `T`.
    pub fn is<T: Resource>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Borrow as the concrete type `T`.
    pub fn downcast_ref<T: Resource>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Mutably borrow as the concrete type `T`.
    pub fn downcast_mut<T: Resource>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    /// Take ownership as the concrete type `T`; the resource is returned
    /// unchanged if it is something else.
    pub fn downcast<T: Resource>(self: Box<Self>) -> Result<Box<T>, Box<dyn Resource>> {
        if !self.is::<T>() {
            return Err(self);
        }
        // A failed `Box<dyn Any>` downcast could not hand back a `dyn
        // Resource`, hence the check above; this one cannot fail.
        match self.into_any().downcast::<T>() {
            Ok(concrete) => Ok(concrete),
            Err(_) => unreachable!("`is::<T>()` held for this resource"),
        }
    }

    /// The `TypeId` of the concrete type behind the trait object.
    pub fn concrete_type_id(&self) -> core::any::TypeId {
        self.as_any().type_id()
    }

    /// Whether the resource represents a deleted entity.
    pub fn is_deleted(&self) -> bool {
        self.deleted_metadata().is_some()
    }
}
