use core::fmt;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use odata_edm::{EdmType, EdmTypeRef};
use odata_value::Value;

use crate::{
    ActionDeserializer, CollectionDeserializer, DecodeContext, DecodeError, DeltaDeserializer,
    EntityReferenceDeserializer, EnumDeserializer, MessageReader, ODataItem,
    PrimitiveDeserializer, ResourceDeserializer, ResourceSetDeserializer, TargetType,
};

/// The payload shape a [`Deserializer`] handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    /// A single entity or complex value.
    Resource,
    /// A collection of entities or complex values.
    ResourceSet,
    /// A change set.
    DeltaResourceSet,
    /// A collection of primitives or enum members.
    Collection,
    /// A primitive value.
    Primitive,
    /// An enum member.
    Enum,
    /// Action parameters.
    Parameter,
    /// An entity reference link.
    EntityReferenceLink,
}

/// Decodes one payload kind.
///
/// `read` pulls the payload from a [`MessageReader`]; `read_inline` decodes
/// an item the reader already materialized, as happens for everything nested
/// inside a top-level payload.
#[async_trait]
pub trait Deserializer: Send + Sync + fmt::Debug {
    /// The payload kind this decoder handles.
    fn payload_kind(&self) -> PayloadKind;

    /// Read and decode a whole payload of the type recorded in `ctx`.
    async fn read(
        &self,
        reader: &mut dyn MessageReader,
        ctx: &DecodeContext,
    ) -> Result<Value, DecodeError>;

    /// Decode an already materialized `item` as `edm_type`.
    fn read_inline(
        &self,
        item: ODataItem,
        edm_type: &EdmTypeRef,
        ctx: &DecodeContext,
    ) -> Result<Value, DecodeError>;
}

/// Picks a [`Deserializer`] for a schema type.
///
/// The table is keyed by [`PayloadKind`]; [`with_deserializer`](Self::with_deserializer)
/// rebinds a kind, so a service can swap in its own decoder for, say,
/// every resource.
#[derive(Debug, Clone)]
pub struct DeserializerProvider {
    table: HashMap<PayloadKind, Arc<dyn Deserializer>>,
}

impl Default for DeserializerProvider {
    fn default() -> Self {
        Self::empty()
            .with_deserializer(Arc::new(ResourceDeserializer))
            .with_deserializer(Arc::new(ResourceSetDeserializer))
            .with_deserializer(Arc::new(DeltaDeserializer))
            .with_deserializer(Arc::new(CollectionDeserializer))
            .with_deserializer(Arc::new(PrimitiveDeserializer))
            .with_deserializer(Arc::new(EnumDeserializer))
            .with_deserializer(Arc::new(ActionDeserializer))
            .with_deserializer(Arc::new(EntityReferenceDeserializer))
    }
}

impl DeserializerProvider {
    /// A provider with the built-in decoders.
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider with no decoders at all.
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Register `deserializer` for its payload kind, replacing any previous one.
    pub fn with_deserializer(mut self, deserializer: Arc<dyn Deserializer>) -> Self {
        self.table.insert(deserializer.payload_kind(), deserializer);
        self
    }

    /// The decoder registered for `kind`.
    pub fn get(&self, kind: PayloadKind) -> Option<&dyn Deserializer> {
        self.table.get(&kind).map(|d| d.as_ref())
    }

    /// The payload kind a value of `edm_type` is decoded as.
    ///
    /// `is_delta` selects a change set for collections. Plain `Edm.Untyped`
    /// has no payload kind.
    pub fn kind_for(edm_type: &EdmTypeRef, is_delta: bool) -> Option<PayloadKind> {
        match &edm_type.ty {
            EdmType::Entity(_) | EdmType::Complex(_) | EdmType::UntypedStructured => {
                Some(PayloadKind::Resource)
            }
            EdmType::Enum(_) => Some(PayloadKind::Enum),
            EdmType::Primitive(_) => Some(PayloadKind::Primitive),
            EdmType::Collection(_) if is_delta => Some(PayloadKind::DeltaResourceSet),
            EdmType::Collection(element) => match &element.ty {
                EdmType::Entity(_) | EdmType::Complex(_) | EdmType::UntypedStructured => {
                    Some(PayloadKind::ResourceSet)
                }
                _ => Some(PayloadKind::Collection),
            },
            EdmType::Untyped => None,
        }
    }

    /// The decoder for a value of `edm_type`.
    pub fn resolve(&self, edm_type: &EdmTypeRef, is_delta: bool) -> Option<&dyn Deserializer> {
        self.get(Self::kind_for(edm_type, is_delta)?)
    }

    /// The decoder for a top-level `target`.
    ///
    /// Entity references, action parameters and change sets are recognized
    /// by target alone; everything else goes through [`resolve`](Self::resolve)
    /// with `edm_type`.
    pub fn resolve_for_target(
        &self,
        target: &TargetType,
        edm_type: Option<&EdmTypeRef>,
    ) -> Option<&dyn Deserializer> {
        match target {
            TargetType::EntityReference => self.get(PayloadKind::EntityReferenceLink),
            TargetType::Parameters { .. } => self.get(PayloadKind::Parameter),
            TargetType::DeltaSet { .. } => self.get(PayloadKind::DeltaResourceSet),
            _ => self.resolve(edm_type?, false),
        }
    }
}
