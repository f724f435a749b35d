use async_trait::async_trait;
use odata_edm::{EdmTypeRef, parse_collection_type_name};
use odata_value::{Collection, Value};

use super::{edm_type_of, element_type, unexpected};
use crate::{
    DecodeContext, DecodeError, DecodeErrorKind, Deserializer, MessageReader, ODataItem,
    ODataValue, PathStep, PayloadKind, ResourceFlavor, ResultExt, convert_value, read_item_tree,
};

/// Decodes resource sets: collections of entities or complex values.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResourceSetDeserializer;

#[async_trait]
impl Deserializer for ResourceSetDeserializer {
    fn payload_kind(&self) -> PayloadKind {
        PayloadKind::ResourceSet
    }

    async fn read(
        &self,
        reader: &mut dyn MessageReader,
        ctx: &DecodeContext,
    ) -> Result<Value, DecodeError> {
        let edm_type = edm_type_of(ctx)?;
        let tree = {
            let mut set_reader = reader.create_resource_set_reader(
                ctx.path().navigation_source(),
                element_type(&edm_type)?,
            )?;
            read_item_tree(set_reader.as_mut()).await?
        };
        let item = tree.ok_or_else(|| {
            DecodeError::new(DecodeErrorKind::UnexpectedItem {
                expected: "a resource set",
                found: "an empty payload",
            })
        })?;
        self.read_inline(item, &edm_type, ctx)
    }

    fn read_inline(
        &self,
        item: ODataItem,
        edm_type: &EdmTypeRef,
        ctx: &DecodeContext,
    ) -> Result<Value, DecodeError> {
        let element = element_type(edm_type)?;
        let items = match item {
            ODataItem::ResourceSet(set) => {
                if let Some(name) = set.set.type_name.as_deref() {
                    parse_collection_type_name(name)?;
                }
                set.items
            }
            ODataItem::Value(ODataValue::Collection { items, .. }) => {
                items.into_iter().map(ODataItem::Value).collect()
            }
            ODataItem::Value(ODataValue::Null) => return Ok(Value::Null),
            other => return Err(unexpected("a resource set", &other)),
        };

        let _guard = ctx.enter()?;
        let mut out = Collection::new(element.clone());
        for (index, item) in items.into_iter().enumerate() {
            let value = match item {
                ODataItem::Resource(_) => ctx.decode_child(item, element, ResourceFlavor::Plain),
                ODataItem::Value(value) => convert_value(value, Some(element), ctx),
                other => Err(unexpected("a resource", &other)),
            };
            out.items.push(value.at(|| PathStep::Index(index))?);
        }
        Ok(Value::Collection(out))
    }
}
