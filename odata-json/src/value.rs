//! JSON values to wire values.

use core::str::FromStr;
use std::collections::HashMap;

use odata_deserialize::{ODataProperty, ODataValue, ReaderError};
use odata_edm::{EdmModel, EdmProperty, EdmStructuredType, EdmTypeRef};
use odata_value::{Primitive, parse_literal};
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value as Json};

use crate::annotation::{Control, Member, classify, type_name};

/// The structured type named by `edm_type`, if the model declares it.
pub(crate) fn structured<'m>(
    model: &'m EdmModel,
    edm_type: Option<&EdmTypeRef>,
) -> Option<&'m EdmStructuredType> {
    edm_type
        .and_then(EdmTypeRef::structured_name)
        .and_then(|name| model.structured_type(name))
}

/// The declared property `name` of `ty`, matched the way the decoders match it.
pub(crate) fn declared<'m>(
    model: &'m EdmModel,
    ty: Option<&'m EdmStructuredType>,
    name: &str,
) -> Option<&'m EdmProperty> {
    model.resolve_property(ty?, name, true).ok().flatten()
}

/// The payload type of a resource: `@odata.type` when it names a structured
/// type, otherwise the expected one.
pub(crate) fn payload_type<'m>(
    model: &'m EdmModel,
    type_name: Option<&str>,
    expected: Option<&'m EdmStructuredType>,
) -> Option<&'m EdmStructuredType> {
    type_name
        .and_then(|name| model.structured_type(name))
        .or(expected)
}

/// `Prop@odata.type` hints of an object, by property name.
pub(crate) fn type_hints(object: &Map<String, Json>) -> HashMap<String, String> {
    object
        .iter()
        .filter_map(|(key, value)| match classify(key) {
            Member::PropertyControl(property, Control::Type) => {
                value.as_str().map(|raw| (property, type_name(raw)))
            }
            _ => None,
        })
        .collect()
}

/// A short name for the kind of a JSON value, for diagnostics.
pub(crate) fn describe(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
}

/// Converts JSON values into [`ODataValue`]s.
///
/// Literals are left loosely typed when the declared type is known: the
/// value converter coerces them and reports mismatches with a location. An
/// explicit `@odata.type` hint is applied here.
#[derive(Clone, Copy)]
pub(crate) struct Values<'m> {
    model: &'m EdmModel,
}

impl<'m> Values<'m> {
    pub(crate) fn new(model: &'m EdmModel) -> Self {
        Self { model }
    }

    /// Convert `json`, headed for a slot of type `expected`.
    pub(crate) fn read(
        &self,
        json: Json,
        expected: Option<&EdmTypeRef>,
        hint: Option<String>,
    ) -> Result<ODataValue, ReaderError> {
        let hinted = match &hint {
            Some(name) => self
                .model
                .resolve_type_name(name)
                .map_err(|err| ReaderError::with_source(format!("invalid type name `{name}`"), err))?,
            None => None,
        };
        let effective = hinted.as_ref().or(expected);
        let is_enum = effective.is_some_and(|ty| ty.enum_name().is_some());
        let enum_name = || {
            hinted
                .as_ref()
                .and_then(EdmTypeRef::enum_name)
                .map(str::to_string)
        };

        Ok(match json {
            Json::Null => ODataValue::Null,
            Json::Bool(b) => ODataValue::Primitive(Primitive::Boolean(b)),
            Json::Number(n) if is_enum => ODataValue::Enum {
                type_name: enum_name(),
                value: n.to_string(),
            },
            Json::Number(n) => match effective.and_then(EdmTypeRef::as_primitive) {
                Some(kind) if hinted.is_some() => {
                    let primitive = number(&n)?;
                    ODataValue::Primitive(primitive.coerce_to(kind).map_err(|err| {
                        ReaderError::with_source(format!("`{n}` is not a valid {kind}"), err)
                    })?)
                }
                Some(_) => ODataValue::Primitive(number(&n)?),
                // The literal decides: integer, decimal or floating point.
                None => ODataValue::Untyped(n.to_string()),
            },
            Json::String(s) if is_enum => ODataValue::Enum {
                type_name: enum_name(),
                value: s,
            },
            Json::String(s) => match hinted.as_ref().and_then(EdmTypeRef::as_primitive) {
                Some(kind) => ODataValue::Primitive(parse_literal(&s, kind).map_err(|err| {
                    ReaderError::with_source(format!("`{s}` is not a valid {kind}"), err)
                })?),
                None => ODataValue::Primitive(Primitive::String(s)),
            },
            Json::Array(items) => {
                let element = effective.and_then(EdmTypeRef::element_type);
                let items = items
                    .into_iter()
                    .map(|item| self.read(item, element, None))
                    .collect::<Result<Vec<_>, _>>()?;
                ODataValue::Collection {
                    type_name: hinted
                        .as_ref()
                        .filter(|ty| ty.element_type().is_some())
                        .map(EdmTypeRef::full_name),
                    items,
                }
            }
            Json::Object(object) => self.object(object, effective)?,
        })
    }

    /// An inline structured value. Nested objects stay inline too.
    fn object(
        &self,
        object: Map<String, Json>,
        expected: Option<&EdmTypeRef>,
    ) -> Result<ODataValue, ReaderError> {
        let mut hints = type_hints(&object);
        let named = object
            .iter()
            .find(|(key, _)| classify(key) == Member::Control(Control::Type))
            .and_then(|(_, value)| value.as_str())
            .map(type_name);
        let ty = payload_type(
            self.model,
            named.as_deref(),
            structured(self.model, expected),
        );

        let mut properties = Vec::new();
        for (key, value) in object {
            if classify(&key) != Member::Property {
                continue;
            }
            let slot = declared(self.model, ty, &key).map(|p| &p.ty);
            let hint = hints.remove(&key);
            let value = self.read(value, slot, hint)?;
            properties.push(ODataProperty::new(key, value));
        }
        Ok(ODataValue::Resource {
            type_name: named,
            properties,
        })
    }
}

/// A JSON number as the narrowest primitive that holds it exactly.
fn number(n: &Number) -> Result<Primitive, ReaderError> {
    if let Some(int) = n.as_i64() {
        return Ok(i32::try_from(int).map_or(Primitive::Int64(int), Primitive::Int32));
    }
    if let Some(uint) = n.as_u64() {
        return Ok(Primitive::Decimal(Decimal::from(uint)));
    }
    let text = n.to_string();
    if let Ok(decimal) = Decimal::from_str(&text) {
        return Ok(Primitive::Decimal(decimal));
    }
    n.as_f64()
        .map(Primitive::Double)
        .ok_or_else(|| ReaderError::new(format!("`{text}` is not a representable number")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use odata_edm::{EdmEnumType, EdmPrimitiveKind};
    use serde_json::json;

    fn model() -> EdmModel {
        EdmModel::builder()
            .enumeration(EdmEnumType::new("Sales", "Color").member("Red", 1))
            .structured(
                EdmStructuredType::complex("Sales", "Address")
                    .property("Zip", EdmTypeRef::primitive(EdmPrimitiveKind::Int32, true)),
            )
            .build()
    }

    #[test]
    fn numbers_without_a_declared_type_stay_literal() {
        let model = model();
        let values = Values::new(&model);
        assert_eq!(
            values.read(json!(42), None, None).unwrap(),
            ODataValue::Untyped("42".to_string())
        );
        assert_eq!(
            values
                .read(json!(42), Some(&EdmTypeRef::primitive(EdmPrimitiveKind::Int64, true)), None)
                .unwrap(),
            ODataValue::Primitive(Primitive::Int32(42))
        );
        assert_eq!(
            values
                .read(json!(12.5), Some(&EdmTypeRef::primitive(EdmPrimitiveKind::Decimal, true)), None)
                .unwrap(),
            ODataValue::Primitive(Primitive::Decimal(Decimal::new(125, 1)))
        );
    }

    #[test]
    fn type_hints_type_literals() {
        let model = model();
        let values = Values::new(&model);
        assert_eq!(
            values
                .read(json!("2024-02-29"), None, Some("Edm.Date".to_string()))
                .unwrap(),
            ODataValue::Primitive(
                parse_literal("2024-02-29", EdmPrimitiveKind::Date).unwrap()
            )
        );
        assert_eq!(
            values
                .read(json!("Red"), None, Some("Sales.Color".to_string()))
                .unwrap(),
            ODataValue::Enum {
                type_name: Some("Sales.Color".to_string()),
                value: "Red".to_string()
            }
        );
        assert!(values
            .read(json!("soon"), None, Some("Edm.Date".to_string()))
            .is_err());
    }

    #[test]
    fn objects_become_inline_resources() {
        let model = model();
        let values = Values::new(&model);
        let value = values
            .read(
                json!({"@odata.type": "#Sales.Address", "Zip": 1234, "@Core.Note": "x"}),
                None,
                None,
            )
            .unwrap();
        assert_eq!(
            value,
            ODataValue::Resource {
                type_name: Some("Sales.Address".to_string()),
                properties: vec![ODataProperty::new(
                    "Zip",
                    ODataValue::Primitive(Primitive::Int32(1234))
                )],
            }
        );
    }
}
