use async_trait::async_trait;
use odata_edm::EdmTypeRef;
use odata_value::{Collection, Value};

use super::{edm_type_of, element_type, unexpected};
use crate::{
    DecodeContext, DecodeError, Deserializer, MessageReader, ODataItem, ODataValue, PathStep,
    PayloadKind, ResultExt, convert_value,
};

/// Decodes collections of primitives and enum members (and untyped
/// collections, whose items may be anything).
#[derive(Debug, Default, Clone, Copy)]
pub struct CollectionDeserializer;

#[async_trait]
impl Deserializer for CollectionDeserializer {
    fn payload_kind(&self) -> PayloadKind {
        PayloadKind::Collection
    }

    async fn read(
        &self,
        reader: &mut dyn MessageReader,
        ctx: &DecodeContext,
    ) -> Result<Value, DecodeError> {
        let edm_type = edm_type_of(ctx)?;
        let mut items = Vec::new();
        {
            let mut collection = reader.create_collection_reader(element_type(&edm_type)?)?;
            while let Some(item) = collection.read().await? {
                items.push(item);
            }
        }
        self.read_inline(
            ODataItem::Value(ODataValue::Collection {
                type_name: None,
                items,
            }),
            &edm_type,
            ctx,
        )
    }

    fn read_inline(
        &self,
        item: ODataItem,
        edm_type: &EdmTypeRef,
        ctx: &DecodeContext,
    ) -> Result<Value, DecodeError> {
        let element = element_type(edm_type)?;
        let items = match item {
            ODataItem::Value(ODataValue::Null) => return Ok(Value::Null),
            ODataItem::Value(ODataValue::Collection { items, .. }) => items,
            other => return Err(unexpected("a collection", &other)),
        };
        let mut out = Collection::new(element.clone());
        for (index, item) in items.into_iter().enumerate() {
            out.items
                .push(convert_value(item, Some(element), ctx).at(|| PathStep::Index(index))?);
        }
        Ok(Value::Collection(out))
    }
}
