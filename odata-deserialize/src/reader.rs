//! The interface a payload reader presents to the decoders.
//!
//! A reader owns the wire bytes; decoders only ever see structural events
//! and [`ODataValue`]s. Every `read` is an await point; everything between
//! two reads is synchronous.

use core::fmt;

use async_trait::async_trait;
use odata_edm::{EdmOperation, EdmTypeRef};
use odata_value::DeltaLink;

use crate::{
    ODataDeltaResourceSet, ODataNestedResourceInfo, ODataProperty, ODataResource,
    ODataResourceSet, ODataValue,
};

/// Error reported by a payload reader.
#[derive(Debug)]
pub struct ReaderError {
    message: String,
    source: Option<Box<dyn core::error::Error + Send + Sync>>,
}

impl ReaderError {
    /// An error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// An error caused by `source`.
    pub fn with_source(
        message: impl Into<String>,
        source: impl core::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ReaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl core::error::Error for ReaderError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|s| s as &(dyn core::error::Error + 'static))
    }
}

/// A structural event from a resource, resource set or delta reader.
///
/// Starts and ends nest properly: a resource's nested resource infos arrive
/// between its start and end, each one holding the resources, resource sets
/// or entity reference links of that property.
#[derive(Debug)]
pub enum ReaderEvent {
    /// A resource begins. `None` is a `null` resource.
    ResourceStart(Option<ODataResource>),
    /// The current resource ends.
    ResourceEnd,
    /// A deleted resource (inside a delta resource set) begins.
    DeletedResourceStart(ODataResource),
    /// A resource set begins.
    ResourceSetStart(ODataResourceSet),
    /// The current resource set ends.
    ResourceSetEnd,
    /// A delta resource set begins.
    DeltaResourceSetStart(ODataDeltaResourceSet),
    /// The current delta resource set ends.
    DeltaResourceSetEnd,
    /// A navigation or complex property of the current resource begins.
    NestedResourceInfoStart(ODataNestedResourceInfo),
    /// The current nested resource info ends.
    NestedResourceInfoEnd,
    /// A reference to an entity by id (`@odata.bind` and friends).
    EntityReferenceLink(String),
    /// An added link inside a delta resource set.
    DeltaLink(DeltaLink),
    /// A removed link inside a delta resource set.
    DeltaDeletedLink(DeltaLink),
    /// A primitive inside an untyped resource set.
    Primitive(ODataValue),
}

impl ReaderEvent {
    /// A short name for diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            ReaderEvent::ResourceStart(_) => "resource start",
            ReaderEvent::ResourceEnd => "resource end",
            ReaderEvent::DeletedResourceStart(_) => "deleted resource start",
            ReaderEvent::ResourceSetStart(_) => "resource set start",
            ReaderEvent::ResourceSetEnd => "resource set end",
            ReaderEvent::DeltaResourceSetStart(_) => "delta resource set start",
            ReaderEvent::DeltaResourceSetEnd => "delta resource set end",
            ReaderEvent::NestedResourceInfoStart(_) => "nested resource info start",
            ReaderEvent::NestedResourceInfoEnd => "nested resource info end",
            ReaderEvent::EntityReferenceLink(_) => "entity reference link",
            ReaderEvent::DeltaLink(_) => "delta link",
            ReaderEvent::DeltaDeletedLink(_) => "delta deleted link",
            ReaderEvent::Primitive(_) => "primitive",
        }
    }
}

/// Reads resources, resource sets and delta resource sets event by event.
#[async_trait]
pub trait ODataReader: Send {
    /// The next event, or `None` once the payload is exhausted.
    async fn read(&mut self) -> Result<Option<ReaderEvent>, ReaderError>;
}

/// Reads the items of a collection of primitives or enums.
#[async_trait]
pub trait CollectionReader: Send {
    /// The next item, or `None` at the end of the collection.
    async fn read(&mut self) -> Result<Option<ODataValue>, ReaderError>;
}

/// An event from a [`ParameterReader`].
#[derive(Debug)]
pub enum ParameterEvent {
    /// A primitive, enum or untyped parameter value.
    Value {
        /// Parameter name.
        name: String,
        /// The value.
        value: ODataValue,
    },
    /// A collection parameter; read it with
    /// [`ParameterReader::create_collection_reader`].
    Collection {
        /// Parameter name.
        name: String,
    },
    /// A resource parameter; read it with
    /// [`ParameterReader::create_resource_reader`].
    Resource {
        /// Parameter name.
        name: String,
    },
    /// A resource set parameter; read it with
    /// [`ParameterReader::create_resource_set_reader`].
    ResourceSet {
        /// Parameter name.
        name: String,
    },
}

/// Reads action parameters in payload order.
#[async_trait]
pub trait ParameterReader: Send {
    /// The next parameter, or `None` at the end of the payload.
    async fn read(&mut self) -> Result<Option<ParameterEvent>, ReaderError>;

    /// A reader over the value of the current resource parameter.
    fn create_resource_reader(&mut self) -> Result<Box<dyn ODataReader>, ReaderError>;

    /// A reader over the value of the current resource set parameter.
    fn create_resource_set_reader(&mut self) -> Result<Box<dyn ODataReader>, ReaderError>;

    /// A reader over the value of the current collection parameter.
    fn create_collection_reader(&mut self) -> Result<Box<dyn CollectionReader>, ReaderError>;
}

/// A request body, ready to be read as one of the top-level payload kinds.
#[async_trait]
pub trait MessageReader: Send {
    /// Read the body as a single resource of `structured_type`.
    fn create_resource_reader(
        &mut self,
        navigation_source: Option<&str>,
        structured_type: &EdmTypeRef,
    ) -> Result<Box<dyn ODataReader>, ReaderError>;

    /// Read the body as a resource set of `element_type`.
    fn create_resource_set_reader(
        &mut self,
        navigation_source: Option<&str>,
        element_type: &EdmTypeRef,
    ) -> Result<Box<dyn ODataReader>, ReaderError>;

    /// Read the body as a delta resource set of `entity_type` in `entity_set`.
    fn create_delta_resource_set_reader(
        &mut self,
        entity_set: Option<&str>,
        entity_type: &EdmTypeRef,
    ) -> Result<Box<dyn ODataReader>, ReaderError>;

    /// Read the body as a collection of `element_type`.
    fn create_collection_reader(
        &mut self,
        element_type: &EdmTypeRef,
    ) -> Result<Box<dyn CollectionReader>, ReaderError>;

    /// Read the body as the parameters of `operation`.
    fn create_parameter_reader(
        &mut self,
        operation: &EdmOperation,
    ) -> Result<Box<dyn ParameterReader>, ReaderError>;

    /// Read the body as a single property value (`{"value": ...}`).
    async fn read_property(
        &mut self,
        expected: Option<&EdmTypeRef>,
    ) -> Result<ODataProperty, ReaderError>;

    /// Read the body as an entity reference link (`{"@odata.id": ...}`).
    async fn read_entity_reference_link(&mut self) -> Result<String, ReaderError>;
}
