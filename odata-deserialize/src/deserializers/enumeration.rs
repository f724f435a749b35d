use async_trait::async_trait;
use odata_edm::{EdmEnumType, EdmTypeRef};
use odata_value::{EnumMember, Value};

use super::{edm_type_of, unexpected};
use crate::{
    DecodeContext, DecodeError, DecodeErrorKind, Deserializer, MessageReader, ODataItem,
    ODataValue, PayloadKind,
};

/// Decodes enum members, validating them against the enumeration.
///
/// Members may be given by name or by underlying value. Flags enumerations
/// also accept comma-separated member lists, and numbers are split into the
/// members whose bits they set.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnumDeserializer;

#[async_trait]
impl Deserializer for EnumDeserializer {
    fn payload_kind(&self) -> PayloadKind {
        PayloadKind::Enum
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
        let Some(name) = edm_type.enum_name() else {
            return Err(DecodeError::new(DecodeErrorKind::TypeMismatch {
                expected: "an enum type".to_string(),
                found: edm_type.full_name(),
            }));
        };
        let enum_type = ctx.model().enum_type(name).ok_or_else(|| {
            DecodeError::new(DecodeErrorKind::UnknownType {
                type_name: name.to_string(),
            })
        })?;

        let text = match item {
            ODataItem::Value(ODataValue::Null) => {
                if !edm_type.nullable {
                    return Err(DecodeError::new(DecodeErrorKind::NullNotAllowed {
                        type_name: name.to_string(),
                    }));
                }
                return Ok(Value::Null);
            }
            ODataItem::Value(ODataValue::Enum { value, .. } | ODataValue::Untyped(value)) => value,
            ODataItem::Value(ODataValue::Primitive(primitive)) => match primitive.as_i64() {
                Some(number) => number.to_string(),
                None => match primitive.as_str() {
                    Some(text) => text.to_string(),
                    None => {
                        return Err(DecodeError::new(DecodeErrorKind::TypeMismatch {
                            expected: name.to_string(),
                            found: primitive.kind().full_name().to_string(),
                        }));
                    }
                },
            },
            other => return Err(unexpected("an enum value", &other)),
        };

        let members = resolve_members(enum_type, &text)?;
        Ok(Value::Enum(EnumMember::new(
            enum_type.full_name(),
            members.join(","),
        )))
    }
}

fn invalid(enum_type: &EdmEnumType, member: &str) -> DecodeError {
    DecodeError::new(DecodeErrorKind::InvalidEnumMember {
        type_name: enum_type.full_name(),
        member: member.to_string(),
    })
}

/// The member names `text` stands for.
fn resolve_members<'a>(enum_type: &'a EdmEnumType, text: &str) -> Result<Vec<&'a str>, DecodeError> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    if parts.len() > 1 && !enum_type.is_flags() {
        return Err(invalid(enum_type, text));
    }

    let mut names = Vec::new();
    for part in parts {
        if let Some(member) = enum_type.member_by_name(part) {
            if !names.contains(&member.name.as_str()) {
                names.push(member.name.as_str());
            }
            continue;
        }
        let number: i64 = part.parse().map_err(|_| invalid(enum_type, part))?;
        for name in members_for_value(enum_type, number).ok_or_else(|| invalid(enum_type, part))? {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    Ok(names)
}

fn members_for_value(enum_type: &EdmEnumType, value: i64) -> Option<Vec<&str>> {
    if let Some(member) = enum_type.member_by_value(value) {
        return Some(vec![member.name.as_str()]);
    }
    if !enum_type.is_flags() || value <= 0 {
        return None;
    }
    let mut covered = 0;
    let mut names = Vec::new();
    for member in enum_type.members() {
        if member.value > 0 && value & member.value == member.value {
            covered |= member.value;
            names.push(member.name.as_str());
        }
    }
    (covered == value).then_some(names)
}
