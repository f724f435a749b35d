use async_trait::async_trait;
use odata_edm::EdmTypeRef;
use odata_value::Value;

use super::{edm_type_of, unexpected};
use crate::{
    DecodeContext, DecodeError, Deserializer, MessageReader, ODataItem, PayloadKind, convert_value,
};

/// Decodes primitive values, at the top level from a `{"value": ...}` body.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrimitiveDeserializer;

#[async_trait]
impl Deserializer for PrimitiveDeserializer {
    fn payload_kind(&self) -> PayloadKind {
        PayloadKind::Primitive
    }

    async fn read(
        &self,
        reader: &mut dyn MessageReader,
        ctx: &DecodeContext,
    ) -> Result<Value, DecodeError> {
        let edm_type = edm_type_of(ctx)?;
        let property = reader.read_property(Some(&edm_type)).await?;
        self.read_inline(ODataItem::Value(property.value), &edm_type, ctx)
    }

    fn read_inline(
        &self,
        item: ODataItem,
        edm_type: &EdmTypeRef,
        ctx: &DecodeContext,
    ) -> Result<Value, DecodeError> {
        match item {
            ODataItem::Value(value) => convert_value(value, Some(edm_type), ctx),
            other => Err(unexpected("a primitive value", &other)),
        }
    }
}
