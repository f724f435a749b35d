//! Conversion of wire values into decoded values.

use core::str::FromStr;

use odata_edm::{EdmType, EdmTypeRef, parse_collection_type_name};
use odata_value::{Primitive, Value, parse_literal};
use rust_decimal::Decimal;

use crate::{
    DecodeContext, DecodeError, DecodeErrorKind, ODataItem, ODataResource, ODataValue,
    ResourceFlavor, ResourceWrapper, trace,
};

/// Convert one wire value into a decoded value.
///
/// `expected` is the declared type of the slot the value is headed for;
/// `None` (or `Edm.Untyped`) means the payload has to say what it is, through
/// an embedded type name or the shape of the literal. Enums, collections and
/// structured values are handed to the decoder the provider picks for them.
pub fn convert_value(
    value: ODataValue,
    expected: Option<&EdmTypeRef>,
    ctx: &DecodeContext,
) -> Result<Value, DecodeError> {
    let expected = expected.filter(|ty| !matches!(ty.ty, EdmType::Untyped));
    match value {
        ODataValue::Null => {
            if let Some(ty) = expected.filter(|ty| !ty.nullable && ty.element_type().is_none()) {
                return Err(DecodeError::new(DecodeErrorKind::NullNotAllowed {
                    type_name: ty.full_name(),
                }));
            }
            Ok(Value::Null)
        }
        ODataValue::Enum { type_name, value } => convert_enum(type_name, value, expected, ctx),
        ODataValue::Collection { type_name, items } => {
            let edm_type = collection_type(type_name.as_deref(), expected, ctx)?;
            ctx.decode_child(
                ODataItem::Value(ODataValue::Collection { type_name, items }),
                &edm_type,
                ResourceFlavor::Plain,
            )
        }
        ODataValue::Resource {
            type_name,
            properties,
        } => {
            // A payload type name differing from the expected type is
            // redirected by the resource decoder.
            let edm_type = match (expected.filter(|ty| ty.is_structured()), type_name.as_deref()) {
                (Some(ty), _) => ty.clone(),
                (None, None) => EdmTypeRef::untyped_structured(),
                (None, Some(name)) => {
                    let resolved = resolve_type(name, ctx)?;
                    if !resolved.is_structured() {
                        return Err(DecodeError::new(DecodeErrorKind::TypeMismatch {
                            expected: "a structured type".to_string(),
                            found: name.to_string(),
                        }));
                    }
                    resolved
                }
            };
            let resource = ODataResource {
                type_name,
                properties,
                ..ODataResource::default()
            };
            ctx.decode_child(
                ODataItem::Resource(ResourceWrapper::new(resource)),
                &edm_type,
                ResourceFlavor::Plain,
            )
        }
        ODataValue::Untyped(literal) => match expected.and_then(EdmTypeRef::as_primitive) {
            Some(kind) => Ok(Value::Primitive(normalize(parse_literal(&literal, kind)?, ctx))),
            None => match expected {
                Some(ty) if ty.enum_name().is_some() => {
                    convert_enum(None, literal, Some(ty), ctx)
                }
                _ => Ok(Value::Primitive(parse_untyped_literal(&literal)?)),
            },
        },
        ODataValue::Primitive(primitive) => match expected {
            None => Ok(Value::Primitive(normalize(primitive, ctx))),
            Some(ty) => {
                if let Some(kind) = ty.as_primitive() {
                    return Ok(Value::Primitive(normalize(primitive.coerce_to(kind)?, ctx)));
                }
                if ty.enum_name().is_some() {
                    let text = match primitive.as_str() {
                        Some(text) => text.to_string(),
                        None => primitive.to_string(),
                    };
                    return convert_enum(None, text, Some(ty), ctx);
                }
                Err(DecodeError::new(DecodeErrorKind::TypeMismatch {
                    expected: ty.full_name(),
                    found: primitive.kind().full_name().to_string(),
                }))
            }
        },
    }
}

fn convert_enum(
    type_name: Option<String>,
    value: String,
    expected: Option<&EdmTypeRef>,
    ctx: &DecodeContext,
) -> Result<Value, DecodeError> {
    let edm_type = match (expected.filter(|ty| ty.enum_name().is_some()), type_name.as_deref()) {
        (Some(ty), _) => ty.clone(),
        (None, Some(name)) => {
            let resolved = resolve_type(name, ctx)?;
            if resolved.enum_name().is_none() {
                return Err(DecodeError::new(DecodeErrorKind::TypeMismatch {
                    expected: "an enum type".to_string(),
                    found: name.to_string(),
                }));
            }
            resolved
        }
        // An enum nobody can name is only text.
        (None, None) => return Ok(Value::Primitive(Primitive::String(value))),
    };
    ctx.decode_child(
        ODataItem::Value(ODataValue::Enum { type_name, value }),
        &edm_type,
        ResourceFlavor::Plain,
    )
}

/// The collection type of a collection value.
fn collection_type(
    type_name: Option<&str>,
    expected: Option<&EdmTypeRef>,
    ctx: &DecodeContext,
) -> Result<EdmTypeRef, DecodeError> {
    let declared = expected.filter(|ty| {
        ty.element_type()
            .is_some_and(|element| !matches!(element.ty, EdmType::Untyped))
    });
    if let Some(name) = type_name {
        let element = parse_collection_type_name(name)?.ok_or_else(|| {
            DecodeError::new(DecodeErrorKind::TypeMismatch {
                expected: "a collection type".to_string(),
                found: name.to_string(),
            })
        })?;
        if declared.is_none() {
            let element = resolve_type(element, ctx)?;
            return Ok(EdmTypeRef::collection(element));
        }
    }
    Ok(declared
        .cloned()
        .unwrap_or_else(|| EdmTypeRef::collection(EdmTypeRef::untyped())))
}

fn resolve_type(name: &str, ctx: &DecodeContext) -> Result<EdmTypeRef, DecodeError> {
    ctx.model().resolve_type_name(name)?.ok_or_else(|| {
        DecodeError::new(DecodeErrorKind::UnknownType {
            type_name: name.to_string(),
        })
    })
}

fn normalize(primitive: Primitive, ctx: &DecodeContext) -> Primitive {
    match ctx.time_zone() {
        Some(offset) => primitive.with_time_zone(offset),
        None => primitive,
    }
}

/// Infer the type of an untyped literal.
///
/// Tried in order: 32-bit integer, 64-bit integer, decimal, floating point,
/// and finally a double-quoted string, which is unquoted. Anything else is
/// rejected.
///
/// ```
/// use odata_deserialize::parse_untyped_literal;
/// use odata_value::Primitive;
///
/// assert_eq!(parse_untyped_literal("42").unwrap(), Primitive::Int32(42));
/// assert!(matches!(parse_untyped_literal("42.5").unwrap(), Primitive::Decimal(_)));
/// assert_eq!(parse_untyped_literal("4.2e1").unwrap(), Primitive::Double(42.0));
/// assert_eq!(parse_untyped_literal("\"abc\"").unwrap(), Primitive::String("abc".into()));
/// assert!(parse_untyped_literal("abc").is_err());
/// ```
pub fn parse_untyped_literal(literal: &str) -> Result<Primitive, DecodeError> {
    let text = literal.trim();
    if let Ok(int) = text.parse::<i32>() {
        return Ok(Primitive::Int32(int));
    }
    if let Ok(int) = text.parse::<i64>() {
        return Ok(Primitive::Int64(int));
    }
    if let Ok(decimal) = Decimal::from_str(text) {
        return Ok(Primitive::Decimal(decimal));
    }
    if let Ok(float) = text.parse::<f64>()
        && float.is_finite()
    {
        return Ok(Primitive::Double(float));
    }
    if let Some(unquoted) = text
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        trace!(literal, "untyped literal is a string");
        return Ok(Primitive::String(unquoted.to_string()));
    }
    Err(DecodeError::new(DecodeErrorKind::InvalidUntypedLiteral {
        literal: literal.to_string(),
    }))
}
