//! Bindings between Rust types and schema types.

use core::any::{TypeId, type_name};
use core::fmt;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta};
use odata_edm::{EdmPrimitiveKind, EdmTypeRef};
use odata_value::{
    Delta, DeletedDelta, DeltaSet, EntityReference, FromValue, ParameterMap, Resource, Value,
    ValueError,
};
use rust_decimal::Decimal;

/// Constructors for the three forms a bound structured type is decoded into.
#[derive(Clone, Copy)]
pub struct ResourceFactory {
    /// A fresh instance.
    pub plain: fn() -> Box<dyn Resource>,
    /// A fresh `Delta<T>` that may set the given properties.
    pub delta: fn(Arc<[String]>) -> Box<dyn Resource>,
    /// A fresh `DeletedDelta<T>` that may set the given properties.
    pub deleted: fn(Arc<[String]>) -> Box<dyn Resource>,
}

impl ResourceFactory {
    /// Factories that start from `T::default()`.
    pub fn of<T: Resource + Default>() -> Self {
        fn plain<T: Resource + Default>() -> Box<dyn Resource> {
            Box::new(T::default())
        }
        fn delta<T: Resource + Default>(updatable: Arc<[String]>) -> Box<dyn Resource> {
            Box::new(Delta::new(T::default(), updatable))
        }
        fn deleted<T: Resource + Default>(updatable: Arc<[String]>) -> Box<dyn Resource> {
            Box::new(DeletedDelta::new(T::default(), updatable))
        }
        Self {
            plain: plain::<T>,
            delta: delta::<T>,
            deleted: deleted::<T>,
        }
    }

    /// Build the form selected by `flavor`.
    pub fn create(&self, flavor: ResourceFlavor, updatable: Arc<[String]>) -> Box<dyn Resource> {
        match flavor {
            ResourceFlavor::Plain => (self.plain)(),
            ResourceFlavor::Delta => (self.delta)(updatable),
            ResourceFlavor::Deleted => (self.deleted)(updatable),
        }
    }
}

impl fmt::Debug for ResourceFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResourceFactory")
    }
}

/// A Rust type bound to a schema type.
#[derive(Debug)]
pub struct BoundType {
    /// `TypeId` of the Rust type.
    pub type_id: TypeId,
    /// `core::any::type_name` of the Rust type.
    pub rust_name: &'static str,
    /// Full name of the schema type (`Edm.Int32`, `Sales.Customer`).
    pub schema_name: String,
    /// Constructors, for structured types.
    pub factory: Option<ResourceFactory>,
}

/// Which form of a structured value to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceFlavor {
    /// The resource itself.
    #[default]
    Plain,
    /// A partial update tracking the properties that were set.
    Delta,
    /// A deleted entity inside a change set.
    Deleted,
}

/// What a top-level or nested decode should produce.
#[derive(Debug, Clone)]
pub enum TargetType {
    /// A bound Rust type: primitive, enum or structured.
    Bound(Arc<BoundType>),
    /// `Delta<T>` of a bound structured type.
    Delta(Arc<BoundType>),
    /// `DeletedDelta<T>` of a bound structured type.
    DeletedDelta(Arc<BoundType>),
    /// A collection of a bound element type.
    Collection(Arc<BoundType>),
    /// A change set. `untyped` selects untyped objects for its resources.
    DeltaSet {
        /// Decode resources without bound Rust types.
        untyped: bool,
    },
    /// Action parameters. `untyped` selects untyped objects for resources.
    Parameters {
        /// Decode resources without bound Rust types.
        untyped: bool,
    },
    /// An entity reference link.
    EntityReference,
    /// An untyped structured object of the given form.
    Untyped(ResourceFlavor),
}

impl TargetType {
    /// A short description for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            TargetType::Bound(bound) => bound.rust_name.to_string(),
            TargetType::Delta(bound) => format!("Delta<{}>", bound.rust_name),
            TargetType::DeletedDelta(bound) => format!("DeletedDelta<{}>", bound.rust_name),
            TargetType::Collection(bound) => format!("Vec<{}>", bound.rust_name),
            TargetType::DeltaSet { .. } => "DeltaSet".to_string(),
            TargetType::Parameters { .. } => "ParameterMap".to_string(),
            TargetType::EntityReference => "EntityReference".to_string(),
            TargetType::Untyped(ResourceFlavor::Plain) => "EdmStructuredObject".to_string(),
            TargetType::Untyped(flavor) => format!("EdmStructuredObject ({flavor:?})"),
        }
    }

    /// Whether resources under this target are decoded without bound Rust types.
    pub fn is_untyped(&self) -> bool {
        matches!(
            self,
            TargetType::Untyped(_)
                | TargetType::DeltaSet { untyped: true }
                | TargetType::Parameters { untyped: true }
        )
    }

    /// Whether this target takes part in change tracking.
    pub fn is_delta(&self) -> bool {
        matches!(
            self,
            TargetType::Delta(_)
                | TargetType::DeletedDelta(_)
                | TargetType::DeltaSet { .. }
                | TargetType::Untyped(ResourceFlavor::Delta | ResourceFlavor::Deleted)
        )
    }

    /// The form of structured value this target produces.
    pub fn flavor(&self) -> ResourceFlavor {
        match self {
            TargetType::Delta(_) | TargetType::Untyped(ResourceFlavor::Delta) => {
                ResourceFlavor::Delta
            }
            TargetType::DeletedDelta(_) | TargetType::Untyped(ResourceFlavor::Deleted) => {
                ResourceFlavor::Deleted
            }
            _ => ResourceFlavor::Plain,
        }
    }

    /// The bound type behind this target, for bound, delta and collection targets.
    pub fn bound(&self) -> Option<&Arc<BoundType>> {
        match self {
            TargetType::Bound(bound)
            | TargetType::Delta(bound)
            | TargetType::DeletedDelta(bound)
            | TargetType::Collection(bound) => Some(bound),
            _ => None,
        }
    }

    /// The schema type this target decodes from, when the target alone determines it.
    pub fn edm_type(&self, type_map: &TypeMap) -> Option<EdmTypeRef> {
        match self {
            TargetType::Bound(bound) | TargetType::Delta(bound) | TargetType::DeletedDelta(bound) => {
                type_map.edm_type_of(bound)
            }
            TargetType::Collection(bound) => type_map.edm_type_of(bound).map(EdmTypeRef::collection),
            _ => None,
        }
    }
}

/// Action parameters decoded with untyped objects for every resource.
#[derive(Debug, Default)]
pub struct UntypedParameters(pub ParameterMap);

impl FromValue for UntypedParameters {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        ParameterMap::from_value(value).map(UntypedParameters)
    }
}

/// How a schema name is interpreted: kinds are fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchemaKind {
    Primitive(EdmPrimitiveKind),
    Entity,
    Complex,
    Enum,
}

/// The type mapping cache: Rust types to schema types and back.
///
/// Built once per service with [`TypeMap::builder`] and shared read-only.
#[derive(Debug, Default)]
pub struct TypeMap {
    targets: HashMap<TypeId, TargetType>,
    by_type: HashMap<TypeId, Arc<BoundType>>,
    by_schema: HashMap<String, Arc<BoundType>>,
    kinds: HashMap<String, SchemaKind>,
}

impl TypeMap {
    /// A builder with primitive and built-in bindings registered.
    pub fn builder() -> TypeMapBuilder {
        TypeMapBuilder::default()
    }

    /// What a Rust type decodes as.
    pub fn target_for(&self, type_id: TypeId) -> Option<&TargetType> {
        self.targets.get(&type_id)
    }

    /// The Rust type bound to a schema type, if any.
    pub fn bound_for_schema(&self, schema_name: &str) -> Option<&Arc<BoundType>> {
        self.by_schema.get(schema_name)
    }

    /// The binding of a Rust type, if any.
    pub fn bound_type_of(&self, type_id: TypeId) -> Option<&Arc<BoundType>> {
        self.by_type.get(&type_id)
    }

    /// The schema type name a Rust type is bound to.
    pub fn edm_type_name_of(&self, type_id: TypeId) -> Option<&str> {
        self.by_type
            .get(&type_id)
            .map(|bound| bound.schema_name.as_str())
    }

    /// The schema type reference of a binding.
    pub fn edm_type_of(&self, bound: &BoundType) -> Option<EdmTypeRef> {
        let name = bound.schema_name.clone();
        Some(match self.kinds.get(&name)? {
            SchemaKind::Primitive(kind) => EdmTypeRef::primitive(*kind, true),
            SchemaKind::Entity => EdmTypeRef::entity(name),
            SchemaKind::Complex => EdmTypeRef::complex(name),
            SchemaKind::Enum => EdmTypeRef::enumeration(name),
        })
    }
}

/// Builder for [`TypeMap`].
#[derive(Debug)]
pub struct TypeMapBuilder {
    map: TypeMap,
}

impl Default for TypeMapBuilder {
    fn default() -> Self {
        let mut builder = Self {
            map: TypeMap::default(),
        };
        builder.register_builtins();
        builder
    }
}

macro_rules! register_primitives {
    ($builder:ident, $($ty:ty => $kind:ident),* $(,)?) => {
        $(
            $builder.bind::<$ty>(SchemaKind::Primitive(EdmPrimitiveKind::$kind), EdmPrimitiveKind::$kind.full_name(), None);
            $builder.bind_collection::<$ty, Vec<$ty>>();
        )*
    };
}

impl TypeMapBuilder {
    fn register_builtins(&mut self) {
        register_primitives!(self,
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
            uuid::Uuid => Guid,
            NaiveDate => Date,
            NaiveTime => TimeOfDay,
            DateTime<FixedOffset> => DateTimeOffset,
            DateTime<chrono::Utc> => DateTimeOffset,
            TimeDelta => Duration,
            bytes::Bytes => Binary,
        );
        // `Vec<u8>` is binary, not a collection of bytes.
        self.bind::<Vec<u8>>(
            SchemaKind::Primitive(EdmPrimitiveKind::Binary),
            EdmPrimitiveKind::Binary.full_name(),
            None,
        );

        self.map
            .targets
            .insert(TypeId::of::<DeltaSet>(), TargetType::DeltaSet { untyped: false });
        self.map.targets.insert(
            TypeId::of::<ParameterMap>(),
            TargetType::Parameters { untyped: false },
        );
        self.map.targets.insert(
            TypeId::of::<UntypedParameters>(),
            TargetType::Parameters { untyped: true },
        );
        self.map
            .targets
            .insert(TypeId::of::<EntityReference>(), TargetType::EntityReference);
        self.map.targets.insert(
            TypeId::of::<odata_value::EdmStructuredObject>(),
            TargetType::Untyped(ResourceFlavor::Plain),
        );
    }

    fn bind<T: 'static>(
        &mut self,
        kind: SchemaKind,
        schema_name: &str,
        factory: Option<ResourceFactory>,
    ) -> Arc<BoundType> {
        let bound = Arc::new(BoundType {
            type_id: TypeId::of::<T>(),
            rust_name: type_name::<T>(),
            schema_name: schema_name.to_string(),
            factory,
        });
        self.map
            .targets
            .insert(bound.type_id, TargetType::Bound(bound.clone()));
        self.map.by_type.insert(bound.type_id, bound.clone());
        self.map
            .by_schema
            .entry(schema_name.to_string())
            .or_insert_with(|| bound.clone());
        self.map.kinds.insert(schema_name.to_string(), kind);
        bound
    }

    fn bind_collection<T: 'static, C: 'static>(&mut self) {
        if let Some(element) = self.map.by_type.get(&TypeId::of::<T>()).cloned() {
            self.map
                .targets
                .insert(TypeId::of::<C>(), TargetType::Collection(element));
        }
    }

    /// Bind the entity type `schema_name` to `T`.
    ///
    /// Also makes `Delta<T>`, `DeletedDelta<T>`, `Vec<T>` and `Box<[T]>`
    /// decodable.
    pub fn entity<T: Resource + Default>(self, schema_name: &str) -> Self {
        self.structured::<T>(SchemaKind::Entity, schema_name)
    }

    /// Bind the complex type `schema_name` to `T`.
    ///
    /// Also makes `Delta<T>`, `Vec<T>` and `Box<[T]>` decodable.
    pub fn complex<T: Resource + Default>(self, schema_name: &str) -> Self {
        self.structured::<T>(SchemaKind::Complex, schema_name)
    }

    fn structured<T: Resource + Default>(mut self, kind: SchemaKind, schema_name: &str) -> Self {
        let bound = self.bind::<T>(kind, schema_name, Some(ResourceFactory::of::<T>()));
        self.map
            .targets
            .insert(TypeId::of::<Delta<T>>(), TargetType::Delta(bound.clone()));
        self.map.targets.insert(
            TypeId::of::<DeletedDelta<T>>(),
            TargetType::DeletedDelta(bound.clone()),
        );
        self.map
            .targets
            .insert(TypeId::of::<Vec<T>>(), TargetType::Collection(bound.clone()));
        self.map
            .targets
            .insert(TypeId::of::<Box<[T]>>(), TargetType::Collection(bound));
        self
    }

    /// Bind the enumeration `schema_name` to `T`.
    ///
    /// `T` receives [`Value::Enum`] through its [`FromValue`] impl.
    pub fn enumeration<T: FromValue + 'static>(mut self, schema_name: &str) -> Self {
        self.bind::<T>(SchemaKind::Enum, schema_name, None);
        self.bind_collection::<T, Vec<T>>();
        self
    }

    /// Finish.
    pub fn build(self) -> TypeMap {
        self.map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use odata_value::{EdmStructuredObject, PropertyShape};

    #[derive(Debug, Default)]
    struct Order {
        id: i32,
    }

    impl Resource for Order {
        fn type_name(&self) -> &str {
            "Order"
        }

        fn set_property(&mut self, name: &str, value: Value) -> Result<(), ValueError> {
            match name {
                "Id" => odata_value::assign(&mut self.id, value),
                _ => Err(ValueError::UnknownProperty {
                    type_name: "Order".into(),
                    property: name.into(),
                }),
            }
        }

        fn property_shape(&self, name: &str) -> Option<PropertyShape> {
            (name == "Id").then_some(PropertyShape::Single)
        }
    }

    #[test]
    fn primitives_are_bound_by_default() {
        let map = TypeMap::builder().build();
        let target = map.target_for(TypeId::of::<i32>()).unwrap();
        assert_eq!(
            target.edm_type(&map),
            Some(EdmTypeRef::primitive(EdmPrimitiveKind::Int32, true))
        );
        assert_eq!(map.edm_type_name_of(TypeId::of::<Vec<u8>>()), Some("Edm.Binary"));
        assert!(matches!(
            map.target_for(TypeId::of::<Vec<i64>>()),
            Some(TargetType::Collection(_))
        ));
        assert!(matches!(
            map.target_for(TypeId::of::<EdmStructuredObject>()),
            Some(TargetType::Untyped(ResourceFlavor::Plain))
        ));
    }

    #[test]
    fn structured_registration_covers_every_form() {
        let map = TypeMap::builder().entity::<Order>("Sales.Order").build();
        let bound = map.bound_for_schema("Sales.Order").unwrap();
        assert_eq!(bound.type_id, TypeId::of::<Order>());

        let delta = map.target_for(TypeId::of::<Delta<Order>>()).unwrap();
        assert!(delta.is_delta());
        assert_eq!(delta.flavor(), ResourceFlavor::Delta);
        assert_eq!(delta.edm_type(&map), Some(EdmTypeRef::entity("Sales.Order")));

        let list = map.target_for(TypeId::of::<Box<[Order]>>()).unwrap();
        assert_eq!(
            list.edm_type(&map),
            Some(EdmTypeRef::collection(EdmTypeRef::entity("Sales.Order")))
        );

        let factory = bound.factory.unwrap();
        let deleted = factory.create(ResourceFlavor::Deleted, Arc::from(vec!["Id".to_string()]));
        assert!(deleted.is_deleted());
        assert!(deleted.is::<DeletedDelta<Order>>());
    }

    #[test]
    fn parameter_targets_differ_by_mode() {
        let map = TypeMap::builder().build();
        assert!(!map.target_for(TypeId::of::<ParameterMap>()).unwrap().is_untyped());
        assert!(map
            .target_for(TypeId::of::<UntypedParameters>())
            .unwrap()
            .is_untyped());
    }
}
