//! Resources, resource sets and change sets as reader events.

use std::collections::VecDeque;

use odata_deserialize::{
    ODataDeltaResourceSet, ODataInstanceAnnotation, ODataNestedResourceInfo, ODataProperty,
    ODataResource, ODataResourceSet, ReaderError, ReaderEvent,
};
use odata_edm::{EdmModel, EdmStructuredType, EdmTypeRef};
use odata_value::{DeletedReason, DeltaLink};
use serde_json::{Map, Value as Json};

use crate::annotation::{Control, Member, classify, type_name};
use crate::trace;
use crate::value::{Values, declared, describe, payload_type, structured, type_hints};

/// Declared navigation and complex properties are read as nested resource
/// infos; everything else is a property value.
fn is_nested(ty: &EdmTypeRef) -> bool {
    ty.structured_name().is_some()
        || ty
            .element_type()
            .and_then(EdmTypeRef::structured_name)
            .is_some()
}

/// A member of a resource that becomes a nested resource info.
enum Nested<'m> {
    Value {
        name: String,
        json: Json,
        ty: &'m EdmTypeRef,
    },
    Bind {
        name: String,
        json: Json,
    },
    Delta {
        name: String,
        json: Json,
        ty: Option<&'m EdmTypeRef>,
    },
}

/// What an entry of a change set is, going by its `@odata.context`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Resource,
    Link,
    DeletedLink,
    DeletedEntity,
}

fn entry(object: &Map<String, Json>) -> Entry {
    let context = object
        .iter()
        .find(|(key, _)| classify(key) == Member::Control(Control::Context))
        .and_then(|(_, value)| value.as_str());
    match context {
        Some(context) if context.ends_with("$deletedLink") => Entry::DeletedLink,
        Some(context) if context.ends_with("$link") => Entry::Link,
        Some(context) if context.ends_with("$deletedEntity") => Entry::DeletedEntity,
        _ => Entry::Resource,
    }
}

fn link(object: &Map<String, Json>) -> Result<DeltaLink, ReaderError> {
    let field = |name: &str| {
        object
            .get(name)
            .and_then(Json::as_str)
            .map(str::to_string)
            .ok_or_else(|| ReaderError::new(format!("delta link without a `{name}` string")))
    };
    Ok(DeltaLink {
        source: field("source")?,
        target: field("target")?,
        relationship: field("relationship")?,
    })
}

/// The `reason` of an `@odata.removed` object or a `$deletedEntity` entry.
fn removed_reason(reason: Option<&Json>) -> Result<DeletedReason, ReaderError> {
    match reason.and_then(Json::as_str) {
        None => Ok(DeletedReason::Deleted),
        Some(reason) => DeletedReason::from_wire(reason)
            .ok_or_else(|| ReaderError::new(format!("unknown removal reason `{reason}`"))),
    }
}

/// Collects the events of one payload, in the order a streaming reader
/// would deliver them.
pub(crate) struct Events<'m> {
    model: &'m EdmModel,
    values: Values<'m>,
    events: VecDeque<ReaderEvent>,
}

impl<'m> Events<'m> {
    pub(crate) fn new(model: &'m EdmModel) -> Self {
        Self {
            model,
            values: Values::new(model),
            events: VecDeque::new(),
        }
    }

    pub(crate) fn finish(self) -> VecDeque<ReaderEvent> {
        self.events
    }

    fn push(&mut self, event: ReaderEvent) {
        self.events.push_back(event);
    }

    /// A resource, or `null`.
    pub(crate) fn resource_or_null(
        &mut self,
        json: Json,
        expected: Option<&'m EdmStructuredType>,
    ) -> Result<(), ReaderError> {
        match json {
            Json::Object(object) => self.resource(object, expected),
            Json::Null => {
                self.push(ReaderEvent::ResourceStart(None));
                self.push(ReaderEvent::ResourceEnd);
                Ok(())
            }
            other => Err(ReaderError::new(format!(
                "expected a resource, found {}",
                describe(&other)
            ))),
        }
    }

    pub(crate) fn resource(
        &mut self,
        object: Map<String, Json>,
        expected: Option<&'m EdmStructuredType>,
    ) -> Result<(), ReaderError> {
        let model = self.model;
        let mut hints = type_hints(&object);
        let mut header = ODataResource::new();
        let mut removed = None;
        // The payload type has to be known before properties are classified.
        for (key, value) in &object {
            match classify(key) {
                Member::Control(Control::Type) => header.type_name = value.as_str().map(type_name),
                Member::Control(Control::Id) => header.id = value.as_str().map(str::to_string),
                Member::Control(Control::Removed) => removed = Some(removed_reason(value.get("reason"))?),
                _ => {}
            }
        }
        let ty = payload_type(model, header.type_name.as_deref(), expected);

        let mut nested = Vec::new();
        for (key, value) in object {
            match classify(&key) {
                Member::Property => match declared(model, ty, &key) {
                    Some(property)
                        if is_nested(&property.ty)
                            && !(value.is_null() && property.ty.element_type().is_some()) =>
                    {
                        nested.push(Nested::Value {
                            name: key,
                            json: value,
                            ty: &property.ty,
                        });
                    }
                    property => {
                        let hint = hints.remove(&key);
                        let value = self.values.read(value, property.map(|p| &p.ty), hint)?;
                        header.properties.push(ODataProperty::new(key, value));
                    }
                },
                Member::Instance(term) => {
                    let value = self.values.read(value, None, None)?;
                    header
                        .instance_annotations
                        .push(ODataInstanceAnnotation { name: term, value });
                }
                Member::PropertyControl(property, Control::Bind) => nested.push(Nested::Bind {
                    name: property,
                    json: value,
                }),
                Member::PropertyControl(property, Control::Delta) => {
                    let ty = declared(model, ty, &property).map(|p| &p.ty);
                    nested.push(Nested::Delta {
                        name: property,
                        json: value,
                        ty,
                    });
                }
                _ => {}
            }
        }

        trace!(type_name = ?header.type_name, removed = removed.is_some(), "resource");
        match removed {
            Some(reason) => {
                header.removed_reason = Some(reason);
                self.push(ReaderEvent::DeletedResourceStart(header));
            }
            None => self.push(ReaderEvent::ResourceStart(Some(header))),
        }
        for member in nested {
            self.nested(member)?;
        }
        self.push(ReaderEvent::ResourceEnd);
        Ok(())
    }

    fn open(&mut self, name: String, is_collection: bool) {
        trace!(property = %name, is_collection, "nested resource info");
        self.push(ReaderEvent::NestedResourceInfoStart(ODataNestedResourceInfo {
            name,
            is_collection: Some(is_collection),
        }));
    }

    fn nested(&mut self, member: Nested<'m>) -> Result<(), ReaderError> {
        match member {
            Nested::Value { name, json, ty } => {
                let target = structured(self.model, Some(ty.element_type().unwrap_or(ty)));
                match json {
                    Json::Array(items) => {
                        self.open(name, true);
                        self.resource_set(items, target, None)?;
                    }
                    json => {
                        self.open(name, false);
                        self.resource_or_null(json, target)?;
                    }
                }
            }
            Nested::Bind { name, json } => {
                let (is_collection, ids) = match json {
                    Json::String(id) => (false, vec![id]),
                    Json::Array(items) => (
                        true,
                        items
                            .into_iter()
                            .map(|item| match item {
                                Json::String(id) => Ok(id),
                                other => Err(bind_error(&name, &other)),
                            })
                            .collect::<Result<Vec<_>, _>>()?,
                    ),
                    other => return Err(bind_error(&name, &other)),
                };
                self.open(name, is_collection);
                for id in ids {
                    self.push(ReaderEvent::EntityReferenceLink(id));
                }
            }
            Nested::Delta { name, json, ty } => {
                let Json::Array(items) = json else {
                    return Err(ReaderError::new(format!(
                        "`{name}@delta` must be an array"
                    )));
                };
                let target = structured(self.model, ty.and_then(EdmTypeRef::element_type));
                self.open(name, true);
                self.delta_set(items, target, None)?;
            }
        }
        self.push(ReaderEvent::NestedResourceInfoEnd);
        Ok(())
    }

    pub(crate) fn resource_set(
        &mut self,
        items: Vec<Json>,
        element: Option<&'m EdmStructuredType>,
        type_name: Option<String>,
    ) -> Result<(), ReaderError> {
        self.push(ReaderEvent::ResourceSetStart(ODataResourceSet { type_name }));
        for item in items {
            match item {
                Json::Object(object) => self.resource(object, element)?,
                Json::Null => {
                    self.push(ReaderEvent::ResourceStart(None));
                    self.push(ReaderEvent::ResourceEnd);
                }
                // Left for the decoder to reject or accept (untyped sets).
                other => {
                    let value = self.values.read(other, None, None)?;
                    self.push(ReaderEvent::Primitive(value));
                }
            }
        }
        self.push(ReaderEvent::ResourceSetEnd);
        Ok(())
    }

    pub(crate) fn delta_set(
        &mut self,
        items: Vec<Json>,
        entity: Option<&'m EdmStructuredType>,
        type_name: Option<String>,
    ) -> Result<(), ReaderError> {
        self.push(ReaderEvent::DeltaResourceSetStart(ODataDeltaResourceSet {
            type_name,
        }));
        for item in items {
            let object = match item {
                Json::Object(object) => object,
                other => {
                    return Err(ReaderError::new(format!(
                        "change set entries are objects, found {}",
                        describe(&other)
                    )));
                }
            };
            match entry(&object) {
                Entry::Link => self.push(ReaderEvent::DeltaLink(link(&object)?)),
                Entry::DeletedLink => self.push(ReaderEvent::DeltaDeletedLink(link(&object)?)),
                Entry::DeletedEntity => {
                    let reason = removed_reason(object.get("reason"))?;
                    let resource = ODataResource {
                        id: object.get("id").and_then(Json::as_str).map(str::to_string),
                        removed_reason: Some(reason),
                        ..ODataResource::default()
                    };
                    self.push(ReaderEvent::DeletedResourceStart(resource));
                    self.push(ReaderEvent::ResourceEnd);
                }
                Entry::Resource => self.resource(object, entity)?,
            }
        }
        self.push(ReaderEvent::DeltaResourceSetEnd);
        Ok(())
    }
}

fn bind_error(name: &str, found: &Json) -> ReaderError {
    ReaderError::new(format!(
        "`{name}@odata.bind` must be an id or an array of ids, found {}",
        describe(found)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use odata_deserialize::ODataValue;
    use odata_edm::EdmPrimitiveKind;
    use odata_value::Primitive;
    use serde_json::json;

    fn model() -> EdmModel {
        EdmModel::builder()
            .structured(
                EdmStructuredType::entity("Sales", "Customer")
                    .key("Id", EdmPrimitiveKind::Int32)
                    .navigation("Orders", EdmTypeRef::collection(EdmTypeRef::entity("Sales.Order"))),
            )
            .structured(EdmStructuredType::entity("Sales", "Order").key("Id", EdmPrimitiveKind::Int32))
            .build()
    }

    fn names(events: &VecDeque<ReaderEvent>) -> Vec<&'static str> {
        events.iter().map(ReaderEvent::describe).collect()
    }

    #[test]
    fn navigation_members_nest_after_the_header() {
        let model = model();
        let customer = model.structured_type("Sales.Customer");
        let mut events = Events::new(&model);
        let Json::Object(object) = json!({
            "Orders": [{"Id": 10}],
            "Id": 1,
            "Orders@odata.bind": ["Orders(11)"],
        }) else {
            unreachable!()
        };
        events.resource(object, customer).unwrap();
        let events = events.finish();
        assert_eq!(
            names(&events),
            [
                "resource start",
                "nested resource info start",
                "resource set start",
                "resource start",
                "resource end",
                "resource set end",
                "nested resource info end",
                "nested resource info start",
                "entity reference link",
                "nested resource info end",
                "resource end",
            ]
        );
        let ReaderEvent::ResourceStart(Some(header)) = &events[0] else {
            panic!("expected a resource header");
        };
        assert_eq!(
            header.properties,
            [ODataProperty::new("Id", ODataValue::Primitive(Primitive::Int32(1)))]
        );
    }

    #[test]
    fn change_set_entries_follow_their_context() {
        let model = model();
        let mut events = Events::new(&model);
        let items = vec![
            json!({"@odata.context": "#Customers/$deletedEntity", "id": "Customers(2)", "reason": "changed"}),
            json!({"@odata.context": "#Customers/$link", "source": "Customers(1)", "relationship": "Orders", "target": "Orders(3)"}),
            json!({"@odata.context": "#Customers/$deletedLink", "source": "Customers(1)", "relationship": "Orders", "target": "Orders(4)"}),
            json!({"@removed": {"reason": "deleted"}, "@id": "Customers(5)"}),
        ];
        events
            .delta_set(items, model.structured_type("Sales.Customer"), None)
            .unwrap();
        let events = events.finish();
        assert_eq!(
            names(&events),
            [
                "delta resource set start",
                "deleted resource start",
                "resource end",
                "delta link",
                "delta deleted link",
                "deleted resource start",
                "resource end",
                "delta resource set end",
            ]
        );
        let ReaderEvent::DeletedResourceStart(first) = &events[1] else {
            panic!("expected a deleted resource");
        };
        assert_eq!(first.id.as_deref(), Some("Customers(2)"));
        assert_eq!(first.removed_reason, Some(DeletedReason::Changed));
    }

    #[test]
    fn malformed_bind_is_rejected() {
        let model = model();
        let mut events = Events::new(&model);
        let Json::Object(object) = json!({"Orders@odata.bind": 5}) else {
            unreachable!()
        };
        let err = events
            .resource(object, model.structured_type("Sales.Customer"))
            .unwrap_err();
        assert!(err.message().contains("Orders@odata.bind"));
    }
}
