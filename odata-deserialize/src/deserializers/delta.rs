use async_trait::async_trait;
use odata_edm::EdmTypeRef;
use odata_value::{DeltaItem, DeltaSet, Value};

use super::{element_type, unexpected};
use crate::{
    DecodeContext, DecodeError, DecodeErrorKind, Deserializer, MessageReader, ODataItem,
    ODataValue, PathStep, PayloadKind, ResourceFlavor, ResultExt, read_item_tree, trace,
};

/// Decodes change sets: changed and deleted entities plus added and deleted
/// links, kept in payload order.
///
/// Changed entities decode as `Delta<T>` (or an untyped object), deleted ones
/// as `DeletedDelta<T>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeltaDeserializer;

#[async_trait]
impl Deserializer for DeltaDeserializer {
    fn payload_kind(&self) -> PayloadKind {
        PayloadKind::DeltaResourceSet
    }

    async fn read(
        &self,
        reader: &mut dyn MessageReader,
        ctx: &DecodeContext,
    ) -> Result<Value, DecodeError> {
        let source = ctx
            .path()
            .navigation_source()
            .and_then(|name| ctx.model().navigation_source(name))
            .ok_or_else(|| DecodeError::new(DecodeErrorKind::MissingNavigationSource))?;
        let entity_type = EdmTypeRef::entity(source.entity_type.clone());
        let edm_type = EdmTypeRef::collection(entity_type.clone());

        let tree = {
            let mut delta_reader =
                reader.create_delta_resource_set_reader(Some(&source.name), &entity_type)?;
            read_item_tree(delta_reader.as_mut()).await?
        };
        let item = tree.ok_or_else(|| {
            DecodeError::new(DecodeErrorKind::UnexpectedItem {
                expected: "a delta resource set",
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
            ODataItem::DeltaResourceSet(set) => set.items,
            ODataItem::Value(ODataValue::Null) => return Ok(Value::Null),
            other => return Err(unexpected("a delta resource set", &other)),
        };

        let _guard = ctx.enter()?;
        let mut out = DeltaSet::new(element.clone());
        for (index, item) in items.into_iter().enumerate() {
            let decoded = delta_item(item, element, ctx).at(|| PathStep::Index(index))?;
            out.push(decoded);
        }
        trace!(count = out.len(), "decoded change set");
        Ok(Value::DeltaSet(out))
    }
}

fn delta_item(
    item: ODataItem,
    element: &EdmTypeRef,
    ctx: &DecodeContext,
) -> Result<DeltaItem, DecodeError> {
    match item {
        ODataItem::DeletedLink(link) => Ok(DeltaItem::DeletedLink(link)),
        ODataItem::AddedLink(link) => Ok(DeltaItem::AddedLink(link)),
        ODataItem::Resource(ref wrapper) => {
            let flavor = if wrapper.is_deleted {
                ResourceFlavor::Deleted
            } else {
                ResourceFlavor::Delta
            };
            match ctx.decode_child(item, element, flavor)? {
                Value::Resource(resource) => Ok(DeltaItem::Resource(resource)),
                other => Err(DecodeError::new(DecodeErrorKind::TypeMismatch {
                    expected: element.full_name(),
                    found: other.describe(),
                })),
            }
        }
        other => Err(unexpected("a resource or link", &other)),
    }
}
