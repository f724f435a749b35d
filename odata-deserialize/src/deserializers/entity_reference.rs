use async_trait::async_trait;
use odata_edm::EdmTypeRef;
use odata_value::Value;

use super::unexpected;
use crate::{DecodeContext, DecodeError, Deserializer, MessageReader, ODataItem, PayloadKind};

/// Decodes an entity reference link (`{"@odata.id": "Customers(1)"}`) into
/// [`Value::EntityReference`].
#[derive(Debug, Default, Clone, Copy)]
pub struct EntityReferenceDeserializer;

#[async_trait]
impl Deserializer for EntityReferenceDeserializer {
    fn payload_kind(&self) -> PayloadKind {
        PayloadKind::EntityReferenceLink
    }

    async fn read(
        &self,
        reader: &mut dyn MessageReader,
        _ctx: &DecodeContext,
    ) -> Result<Value, DecodeError> {
        let id = reader.read_entity_reference_link().await?;
        Ok(Value::EntityReference(id))
    }

    fn read_inline(
        &self,
        item: ODataItem,
        _edm_type: &EdmTypeRef,
        _ctx: &DecodeContext,
    ) -> Result<Value, DecodeError> {
        match item {
            ODataItem::EntityReferenceLink(id) => Ok(Value::EntityReference(id)),
            other => Err(unexpected("an entity reference link", &other)),
        }
    }
}
