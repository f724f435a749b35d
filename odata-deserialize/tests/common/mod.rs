#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use odata_deserialize::{
    CollectionReader, MessageReader, ODataNestedResourceInfo, ODataProperty, ODataReader,
    ODataResource, ODataValue, ParameterEvent, ParameterReader, ReaderError, ReaderEvent,
    ServiceContext, TypeMap,
};
use odata_edm::{
    EdmEnumType, EdmModel, EdmOperation, EdmPrimitiveKind, EdmStructuredType, EdmTypeRef,
    KeyValue, ODataPath, PathSegment,
};
use odata_value::{
    CollectionKind, CollectionSink, DynamicProperties, FromValue, Primitive, PropertyShape,
    Resource, Value, ValueError, assign, resource_from_value,
};
use rust_decimal::Decimal;

pub fn model() -> EdmModel {
    EdmModel::builder()
        .enumeration(
            EdmEnumType::new("Sales", "Color")
                .member("Red", 1)
                .member("Green", 2)
                .member("Blue", 3),
        )
        .structured(
            EdmStructuredType::entity("Sales", "Customer")
                .key("Id", EdmPrimitiveKind::Int32)
                .property("Name", EdmTypeRef::primitive(EdmPrimitiveKind::String, true))
                .property(
                    "Tags",
                    EdmTypeRef::collection(EdmTypeRef::primitive(EdmPrimitiveKind::String, false)),
                )
                .property("Favorite", EdmTypeRef::enumeration("Sales.Color"))
                .navigation("Orders", EdmTypeRef::collection(EdmTypeRef::entity("Sales.Order")))
                .open(),
        )
        .structured(
            EdmStructuredType::entity("Sales", "VipCustomer")
                .derives_from("Sales.Customer")
                .property("Level", EdmTypeRef::primitive(EdmPrimitiveKind::Int32, false)),
        )
        .structured(
            EdmStructuredType::entity("Sales", "Order")
                .key("Id", EdmPrimitiveKind::Int32)
                .property("Amount", EdmTypeRef::primitive(EdmPrimitiveKind::Decimal, true)),
        )
        .structured(EdmStructuredType::entity("Sales", "Party").key("Id", EdmPrimitiveKind::Int32).abstract_type())
        .operation(
            EdmOperation::action("Sales", "Promote")
                .bound_to(EdmTypeRef::entity("Sales.Customer"))
                .parameter("level", EdmTypeRef::primitive(EdmPrimitiveKind::Int32, false))
                .parameter(
                    "reasons",
                    EdmTypeRef::collection(EdmTypeRef::primitive(EdmPrimitiveKind::String, false)),
                )
                .parameter("order", EdmTypeRef::entity("Sales.Order"))
                .parameter("orders", EdmTypeRef::collection(EdmTypeRef::entity("Sales.Order"))),
        )
        .operation(
            EdmOperation::action("Sales", "ResetAll")
                .parameter("color", EdmTypeRef::enumeration("Sales.Color")),
        )
        .entity_set("Customers", "Sales.Customer")
        .entity_set("Orders", "Sales.Order")
        .operation_import("ResetAll", "Sales.ResetAll")
        .build()
}

pub fn type_map() -> TypeMap {
    TypeMap::builder()
        .entity::<Customer>("Sales.Customer")
        .entity::<VipCustomer>("Sales.VipCustomer")
        .entity::<Order>("Sales.Order")
        .enumeration::<Color>("Sales.Color")
        .build()
}

pub fn service() -> Arc<ServiceContext> {
    ServiceContext::builder(model()).type_map(type_map()).build()
}

pub fn customers() -> ODataPath {
    ODataPath::new(vec![PathSegment::EntitySet {
        name: "Customers".into(),
        entity_type: "Sales.Customer".into(),
    }])
}

pub fn promote() -> ODataPath {
    ODataPath::new(vec![
        PathSegment::EntitySet {
            name: "Customers".into(),
            entity_type: "Sales.Customer".into(),
        },
        PathSegment::Key {
            keys: vec![("Id".into(), KeyValue::Integer(1))],
        },
        PathSegment::Operation {
            operation: "Sales.Promote".into(),
        },
    ])
}

pub fn reset_all() -> ODataPath {
    ODataPath::new(vec![PathSegment::OperationImport {
        name: "ResetAll".into(),
        operation: "Sales.ResetAll".into(),
    }])
}

// Wire values

pub fn int(v: i32) -> ODataValue {
    ODataValue::Primitive(Primitive::Int32(v))
}

pub fn text(v: &str) -> ODataValue {
    ODataValue::Primitive(Primitive::String(v.to_string()))
}

pub fn resource(type_name: Option<&str>, properties: Vec<(&str, ODataValue)>) -> ODataResource {
    ODataResource {
        type_name: type_name.map(str::to_string),
        properties: properties
            .into_iter()
            .map(|(name, value)| ODataProperty::new(name, value))
            .collect(),
        ..ODataResource::default()
    }
}

pub fn start(resource: ODataResource) -> ReaderEvent {
    ReaderEvent::ResourceStart(Some(resource))
}

pub fn nested(name: &str, is_collection: bool) -> ReaderEvent {
    ReaderEvent::NestedResourceInfoStart(ODataNestedResourceInfo {
        name: name.into(),
        is_collection: Some(is_collection),
    })
}

// Bound types

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Green,
    Blue,
}

impl FromValue for Color {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        let member = odata_value::EnumMember::from_value(value)?;
        match member.member.as_str() {
            "Red" => Ok(Color::Red),
            "Green" => Ok(Color::Green),
            "Blue" => Ok(Color::Blue),
            other => Err(ValueError::TypeMismatch {
                expected: "Sales.Color".into(),
                got: other.into(),
            }),
        }
    }
}

#[derive(Debug, Default)]
pub struct Order {
    pub id: i32,
    pub amount: Option<Decimal>,
}

impl Resource for Order {
    fn type_name(&self) -> &str {
        "Order"
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<(), ValueError> {
        match name {
            "Id" => assign(&mut self.id, value),
            "Amount" => assign(&mut self.amount, value),
            _ => Err(ValueError::UnknownProperty {
                type_name: "Order".into(),
                property: name.into(),
            }),
        }
    }

    fn property_shape(&self, name: &str) -> Option<PropertyShape> {
        matches!(name, "Id" | "Amount").then_some(PropertyShape::Single)
    }
}

impl FromValue for Order {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        resource_from_value(value)
    }
}

/// `Tags` is get-only: the decoder appends into the existing list.
#[derive(Debug, Default)]
pub struct Customer {
    pub id: i32,
    pub name: Option<String>,
    pub favorite: Option<Color>,
    pub orders: Vec<Order>,
    pub tags: Vec<String>,
    pub extra: DynamicProperties,
}

impl Resource for Customer {
    fn type_name(&self) -> &str {
        "Customer"
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<(), ValueError> {
        match name {
            "Id" => assign(&mut self.id, value),
            "Name" => assign(&mut self.name, value),
            "Favorite" => assign(&mut self.favorite, value),
            "Orders" => assign(&mut self.orders, value),
            _ => Err(ValueError::UnknownProperty {
                type_name: "Customer".into(),
                property: name.into(),
            }),
        }
    }

    fn property_shape(&self, name: &str) -> Option<PropertyShape> {
        match name {
            "Id" | "Name" | "Favorite" => Some(PropertyShape::Single),
            "Orders" => Some(PropertyShape::Collection {
                kind: CollectionKind::List,
                settable: true,
            }),
            "Tags" => Some(PropertyShape::Collection {
                kind: CollectionKind::List,
                settable: false,
            }),
            _ => None,
        }
    }

    fn collection_mut(&mut self, name: &str) -> Option<&mut dyn CollectionSink> {
        match name {
            "Tags" => Some(&mut self.tags),
            _ => None,
        }
    }

    fn dynamic_properties_mut(&mut self) -> Option<&mut DynamicProperties> {
        Some(&mut self.extra)
    }
}

impl FromValue for Customer {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        resource_from_value(value)
    }
}

#[derive(Debug, Default)]
pub struct VipCustomer {
    pub customer: Customer,
    pub level: i32,
}

impl Resource for VipCustomer {
    fn type_name(&self) -> &str {
        "VipCustomer"
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<(), ValueError> {
        match name {
            "Level" => assign(&mut self.level, value),
            _ => self.customer.set_property(name, value),
        }
    }

    fn property_shape(&self, name: &str) -> Option<PropertyShape> {
        match name {
            "Level" => Some(PropertyShape::Single),
            _ => self.customer.property_shape(name),
        }
    }

    fn collection_mut(&mut self, name: &str) -> Option<&mut dyn CollectionSink> {
        self.customer.collection_mut(name)
    }

    fn dynamic_properties_mut(&mut self) -> Option<&mut DynamicProperties> {
        self.customer.dynamic_properties_mut()
    }
}

impl FromValue for VipCustomer {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        resource_from_value(value)
    }
}

// Scripted readers

#[derive(Debug)]
pub enum Param {
    Value(&'static str, ODataValue),
    Collection(&'static str, Vec<ODataValue>),
    Resource(&'static str, Vec<ReaderEvent>),
    ResourceSet(&'static str, Vec<ReaderEvent>),
}

/// A request body given as the events a format reader would produce.
#[derive(Debug, Default)]
pub struct Script {
    events: Vec<ReaderEvent>,
    property: Option<ODataValue>,
    collection: Vec<ODataValue>,
    parameters: Vec<Param>,
    reference: Option<String>,
}

impl Script {
    pub fn events(events: Vec<ReaderEvent>) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    pub fn property(value: ODataValue) -> Self {
        Self {
            property: Some(value),
            ..Self::default()
        }
    }

    pub fn collection(items: Vec<ODataValue>) -> Self {
        Self {
            collection: items,
            ..Self::default()
        }
    }

    pub fn parameters(parameters: Vec<Param>) -> Self {
        Self {
            parameters,
            ..Self::default()
        }
    }

    pub fn reference(id: &str) -> Self {
        Self {
            reference: Some(id.to_string()),
            ..Self::default()
        }
    }

    fn replay(&mut self) -> Box<dyn ODataReader> {
        Box::new(Replay(core::mem::take(&mut self.events).into()))
    }
}

struct Replay(VecDeque<ReaderEvent>);

#[async_trait]
impl ODataReader for Replay {
    async fn read(&mut self) -> Result<Option<ReaderEvent>, ReaderError> {
        Ok(self.0.pop_front())
    }
}

struct Values(VecDeque<ODataValue>);

#[async_trait]
impl CollectionReader for Values {
    async fn read(&mut self) -> Result<Option<ODataValue>, ReaderError> {
        Ok(self.0.pop_front())
    }
}

struct Parameters {
    queue: VecDeque<Param>,
    events: Vec<ReaderEvent>,
    values: Vec<ODataValue>,
}

#[async_trait]
impl ParameterReader for Parameters {
    async fn read(&mut self) -> Result<Option<ParameterEvent>, ReaderError> {
        let Some(param) = self.queue.pop_front() else {
            return Ok(None);
        };
        Ok(Some(match param {
            Param::Value(name, value) => ParameterEvent::Value {
                name: name.into(),
                value,
            },
            Param::Collection(name, values) => {
                self.values = values;
                ParameterEvent::Collection { name: name.into() }
            }
            Param::Resource(name, events) => {
                self.events = events;
                ParameterEvent::Resource { name: name.into() }
            }
            Param::ResourceSet(name, events) => {
                self.events = events;
                ParameterEvent::ResourceSet { name: name.into() }
            }
        }))
    }

    fn create_resource_reader(&mut self) -> Result<Box<dyn ODataReader>, ReaderError> {
        Ok(Box::new(Replay(core::mem::take(&mut self.events).into())))
    }

    fn create_resource_set_reader(&mut self) -> Result<Box<dyn ODataReader>, ReaderError> {
        Ok(Box::new(Replay(core::mem::take(&mut self.events).into())))
    }

    fn create_collection_reader(&mut self) -> Result<Box<dyn CollectionReader>, ReaderError> {
        Ok(Box::new(Values(core::mem::take(&mut self.values).into())))
    }
}

#[async_trait]
impl MessageReader for Script {
    fn create_resource_reader(
        &mut self,
        _navigation_source: Option<&str>,
        _structured_type: &EdmTypeRef,
    ) -> Result<Box<dyn ODataReader>, ReaderError> {
        Ok(self.replay())
    }

    fn create_resource_set_reader(
        &mut self,
        _navigation_source: Option<&str>,
        _element_type: &EdmTypeRef,
    ) -> Result<Box<dyn ODataReader>, ReaderError> {
        Ok(self.replay())
    }

    fn create_delta_resource_set_reader(
        &mut self,
        _entity_set: Option<&str>,
        _entity_type: &EdmTypeRef,
    ) -> Result<Box<dyn ODataReader>, ReaderError> {
        Ok(self.replay())
    }

    fn create_collection_reader(
        &mut self,
        _element_type: &EdmTypeRef,
    ) -> Result<Box<dyn CollectionReader>, ReaderError> {
        Ok(Box::new(Values(core::mem::take(&mut self.collection).into())))
    }

    fn create_parameter_reader(
        &mut self,
        _operation: &EdmOperation,
    ) -> Result<Box<dyn ParameterReader>, ReaderError> {
        Ok(Box::new(Parameters {
            queue: core::mem::take(&mut self.parameters).into(),
            events: Vec::new(),
            values: Vec::new(),
        }))
    }

    async fn read_property(
        &mut self,
        _expected: Option<&EdmTypeRef>,
    ) -> Result<ODataProperty, ReaderError> {
        let value = self
            .property
            .take()
            .ok_or_else(|| ReaderError::new("no property in payload"))?;
        Ok(ODataProperty::new("value", value))
    }

    async fn read_entity_reference_link(&mut self) -> Result<String, ReaderError> {
        self.reference
            .take()
            .ok_or_else(|| ReaderError::new("no entity reference in payload"))
    }
}
