use async_trait::async_trait;
use odata_edm::{EdmOperation, EdmOperationParameter, EdmTypeRef, PathSegment};
use odata_value::{ParameterMap, Value};

use super::unexpected;
use crate::{
    DecodeContext, DecodeError, DecodeErrorKind, Deserializer, MessageReader, ODataItem,
    ODataValue, ParameterEvent, ParameterReader, PathStep, PayloadKind, ResourceFlavor,
    ResultExt, convert_value, debug, read_item_tree,
};

/// Decodes the body of an action invocation into a [`ParameterMap`].
///
/// The action is taken from the last segment of the request path, either an
/// operation import or a bound operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct ActionDeserializer;

#[async_trait]
impl Deserializer for ActionDeserializer {
    fn payload_kind(&self) -> PayloadKind {
        PayloadKind::Parameter
    }

    async fn read(
        &self,
        reader: &mut dyn MessageReader,
        ctx: &DecodeContext,
    ) -> Result<Value, DecodeError> {
        let operation = resolve_operation(ctx)?;
        debug!(operation = %operation.full_name(), "decoding action parameters");
        let mut parameters = reader.create_parameter_reader(operation)?;
        let mut out = ParameterMap::new();

        while let Some(event) = parameters.read().await? {
            let name = match &event {
                ParameterEvent::Value { name, .. }
                | ParameterEvent::Collection { name }
                | ParameterEvent::Resource { name }
                | ParameterEvent::ResourceSet { name } => name.clone(),
            };
            let value = read_parameter(parameters.as_mut(), event, operation, ctx)
                .await
                .at(|| PathStep::Parameter(name.clone()))?;
            out.insert(name, value);
        }
        Ok(Value::Parameters(out))
    }

    fn read_inline(
        &self,
        item: ODataItem,
        _edm_type: &EdmTypeRef,
        _ctx: &DecodeContext,
    ) -> Result<Value, DecodeError> {
        Err(unexpected("a parameter payload", &item))
    }
}

/// The action the request path invokes.
fn resolve_operation(ctx: &DecodeContext) -> Result<&EdmOperation, DecodeError> {
    let path = ctx.path();
    let name = match path.segments() {
        [PathSegment::OperationImport { operation, .. }] => Some(operation),
        [_, .., PathSegment::Operation { operation }] => Some(operation),
        _ => None,
    };
    name.and_then(|name| ctx.model().find_operation(name))
        .ok_or_else(|| {
            DecodeError::new(DecodeErrorKind::NotAnOperationInvocation {
                path: path.to_string(),
            })
        })
}

fn declared<'o>(
    operation: &'o EdmOperation,
    name: &str,
) -> Result<&'o EdmOperationParameter, DecodeError> {
    operation.find_parameter(name).ok_or_else(|| {
        DecodeError::new(DecodeErrorKind::UnknownParameter {
            parameter: name.to_string(),
            operation: operation.full_name(),
        })
    })
}

async fn read_parameter(
    parameters: &mut dyn ParameterReader,
    event: ParameterEvent,
    operation: &EdmOperation,
    ctx: &DecodeContext,
) -> Result<Value, DecodeError> {
    match event {
        ParameterEvent::Value { name, value } => {
            let parameter = declared(operation, &name)?;
            convert_value(value, Some(&parameter.ty), ctx)
        }
        ParameterEvent::Collection { name } => {
            let parameter = declared(operation, &name)?;
            let mut items = Vec::new();
            {
                let mut collection = parameters.create_collection_reader()?;
                while let Some(item) = collection.read().await? {
                    items.push(item);
                }
            }
            let value = ODataValue::Collection {
                type_name: None,
                items,
            };
            convert_value(value, Some(&parameter.ty), ctx)
        }
        ParameterEvent::Resource { name } => {
            let parameter = declared(operation, &name)?;
            let tree = {
                let mut resource = parameters.create_resource_reader()?;
                read_item_tree(resource.as_mut()).await?
            };
            match tree {
                None => Ok(Value::Null),
                Some(item) => ctx.decode_child(item, &parameter.ty, ResourceFlavor::Plain),
            }
        }
        ParameterEvent::ResourceSet { name } => {
            let parameter = declared(operation, &name)?;
            let tree = {
                let mut set = parameters.create_resource_set_reader()?;
                read_item_tree(set.as_mut()).await?
            };
            let Some(item) = tree else {
                return Ok(Value::Null);
            };
            let value = ctx.decode_child(item, &parameter.ty, ResourceFlavor::Plain)?;
            if !ctx.is_untyped() {
                check_elements(&value, &parameter.ty, ctx)?;
            }
            Ok(value)
        }
    }
}

/// Every bound element of a resource set parameter must map to the declared
/// element type or a type derived from it.
fn check_elements(
    value: &Value,
    declared: &EdmTypeRef,
    ctx: &DecodeContext,
) -> Result<(), DecodeError> {
    let (Value::Collection(collection), Some(base)) = (
        value,
        declared.element_type().and_then(EdmTypeRef::structured_name),
    ) else {
        return Ok(());
    };
    let model = ctx.model();
    for (index, item) in collection.items.iter().enumerate() {
        let Value::Resource(resource) = item else {
            continue;
        };
        let bound = ctx
            .type_map()
            .bound_type_of(resource.concrete_type_id())
            .ok_or_else(|| {
                DecodeError::new(DecodeErrorKind::MissingTypeMapping {
                    type_name: resource.type_name().to_string(),
                })
            })
            .at(|| PathStep::Index(index))?;
        let assignable = model
            .structured_type(&bound.schema_name)
            .is_some_and(|ty| model.is_assignable_to(ty, base));
        if !assignable {
            return Err(DecodeError::new(DecodeErrorKind::TypeMismatch {
                expected: base.to_string(),
                found: bound.schema_name.clone(),
            })
            .with_path(PathStep::Index(index)));
        }
    }
    Ok(())
}
