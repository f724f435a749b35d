//! The message reader and the readers it hands out.

use std::collections::VecDeque;

use async_trait::async_trait;
use odata_deserialize::{
    CollectionReader, MessageReader, ODataProperty, ODataReader, ODataValue, ParameterReader,
    ReaderError, ReaderEvent,
};
use odata_edm::{EdmModel, EdmOperation, EdmTypeRef};
use serde_json::Value as Json;

use crate::annotation::{Control, Member, classify};
use crate::document;
use crate::events::Events;
use crate::parameters::JsonParameterReader;
use crate::trace;
use crate::value::{Values, describe, structured, type_hints};

/// Reads an OData JSON request body.
///
/// The body is parsed up front; each `create_*` call consumes it, so a
/// reader serves exactly one top-level payload. Types come from the model
/// and from `@odata.type` annotations in the payload.
pub struct JsonMessageReader<'m> {
    model: &'m EdmModel,
    body: Option<Json>,
    consumed: bool,
}

impl<'m> JsonMessageReader<'m> {
    /// Parse `body`. An empty or all-whitespace body is accepted and reads as
    /// an action invocation without parameters.
    pub fn from_slice(model: &'m EdmModel, body: &[u8]) -> Result<Self, ReaderError> {
        let body = if body.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            Some(
                document::parse(body)
                    .map_err(|err| ReaderError::with_source("malformed JSON payload", err))?,
            )
        };
        Ok(Self {
            model,
            body,
            consumed: false,
        })
    }

    /// Read an already parsed document.
    pub fn from_value(model: &'m EdmModel, body: Json) -> Self {
        Self {
            model,
            body: Some(body),
            consumed: false,
        }
    }

    fn take(&mut self) -> Result<Option<Json>, ReaderError> {
        if self.consumed {
            return Err(ReaderError::new("the payload has already been read"));
        }
        self.consumed = true;
        Ok(self.body.take())
    }

    fn take_body(&mut self) -> Result<Json, ReaderError> {
        self.take()?
            .ok_or_else(|| ReaderError::new("empty payload"))
    }
}

impl core::fmt::Debug for JsonMessageReader<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JsonMessageReader")
            .field("consumed", &self.consumed)
            .finish_non_exhaustive()
    }
}

/// The items of a resource set or change set body: a bare array or the
/// `value` member of an object.
fn value_array(body: Json) -> Result<Vec<Json>, ReaderError> {
    match body {
        Json::Array(items) => Ok(items),
        Json::Object(mut object) => match object.remove("value") {
            Some(Json::Array(items)) => Ok(items),
            Some(other) => Err(ReaderError::new(format!(
                "`value` must be an array, found {}",
                describe(&other)
            ))),
            None => Err(ReaderError::new("expected a `value` array")),
        },
        other => Err(ReaderError::new(format!(
            "expected an array, found {}",
            describe(&other)
        ))),
    }
}

#[async_trait]
impl MessageReader for JsonMessageReader<'_> {
    fn create_resource_reader(
        &mut self,
        navigation_source: Option<&str>,
        structured_type: &EdmTypeRef,
    ) -> Result<Box<dyn ODataReader>, ReaderError> {
        trace!(?navigation_source, type_name = %structured_type, "reading a resource");
        let body = self.take_body()?;
        let mut events = Events::new(self.model);
        events.resource_or_null(body, structured(self.model, Some(structured_type)))?;
        Ok(Box::new(EventQueue::new(events.finish())))
    }

    fn create_resource_set_reader(
        &mut self,
        navigation_source: Option<&str>,
        element_type: &EdmTypeRef,
    ) -> Result<Box<dyn ODataReader>, ReaderError> {
        trace!(?navigation_source, type_name = %element_type, "reading a resource set");
        let items = value_array(self.take_body()?)?;
        let mut events = Events::new(self.model);
        events.resource_set(items, structured(self.model, Some(element_type)), None)?;
        Ok(Box::new(EventQueue::new(events.finish())))
    }

    fn create_delta_resource_set_reader(
        &mut self,
        entity_set: Option<&str>,
        entity_type: &EdmTypeRef,
    ) -> Result<Box<dyn ODataReader>, ReaderError> {
        trace!(?entity_set, type_name = %entity_type, "reading a change set");
        let items = value_array(self.take_body()?)?;
        let mut events = Events::new(self.model);
        events.delta_set(items, structured(self.model, Some(entity_type)), None)?;
        Ok(Box::new(EventQueue::new(events.finish())))
    }

    fn create_collection_reader(
        &mut self,
        element_type: &EdmTypeRef,
    ) -> Result<Box<dyn CollectionReader>, ReaderError> {
        let values = Values::new(self.model);
        let items = value_array(self.take_body()?)?
            .into_iter()
            .map(|item| values.read(item, Some(element_type), None))
            .collect::<Result<VecDeque<_>, _>>()?;
        Ok(Box::new(ValueQueue::new(items)))
    }

    fn create_parameter_reader(
        &mut self,
        operation: &EdmOperation,
    ) -> Result<Box<dyn ParameterReader>, ReaderError> {
        let body = self.take()?;
        Ok(Box::new(JsonParameterReader::new(self.model, operation, body)?))
    }

    async fn read_property(
        &mut self,
        expected: Option<&EdmTypeRef>,
    ) -> Result<ODataProperty, ReaderError> {
        let mut object = match self.take_body()? {
            Json::Object(object) => object,
            other => {
                return Err(ReaderError::new(format!(
                    "expected an object with a `value` member, found {}",
                    describe(&other)
                )));
            }
        };
        let hint = type_hints(&object).remove("value");
        let value = object
            .remove("value")
            .ok_or_else(|| ReaderError::new("expected a `value` member"))?;
        let value = Values::new(self.model).read(value, expected, hint)?;
        Ok(ODataProperty::new("value", value))
    }

    async fn read_entity_reference_link(&mut self) -> Result<String, ReaderError> {
        let body = self.take_body()?;
        body.as_object()
            .and_then(|object| {
                object
                    .iter()
                    .find(|(key, _)| classify(key) == Member::Control(Control::Id))
            })
            .and_then(|(_, id)| id.as_str())
            .map(str::to_string)
            .ok_or_else(|| ReaderError::new("expected an `@odata.id` member"))
    }
}

/// Replays events collected up front.
pub(crate) struct EventQueue {
    events: VecDeque<ReaderEvent>,
}

impl EventQueue {
    pub(crate) fn new(events: VecDeque<ReaderEvent>) -> Self {
        Self { events }
    }
}

#[async_trait]
impl ODataReader for EventQueue {
    async fn read(&mut self) -> Result<Option<ReaderEvent>, ReaderError> {
        Ok(self.events.pop_front())
    }
}

/// Replays collection items collected up front.
pub(crate) struct ValueQueue {
    items: VecDeque<ODataValue>,
}

impl ValueQueue {
    pub(crate) fn new(items: VecDeque<ODataValue>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl CollectionReader for ValueQueue {
    async fn read(&mut self) -> Result<Option<ODataValue>, ReaderError> {
        Ok(self.items.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use odata_edm::{EdmPrimitiveKind, EdmStructuredType};

    fn model() -> EdmModel {
        EdmModel::builder()
            .structured(EdmStructuredType::entity("Sales", "Order").key("Id", EdmPrimitiveKind::Int32))
            .build()
    }

    #[test]
    fn malformed_json_is_a_reader_error() {
        let model = model();
        let err = JsonMessageReader::from_slice(&model, b"{\"Id\": ").unwrap_err();
        assert!(err.to_string().starts_with("malformed JSON payload"));
    }

    #[test]
    fn a_body_is_read_once() {
        let model = model();
        let mut reader = JsonMessageReader::from_slice(&model, br#"{"Id": 1}"#).unwrap();
        let order = EdmTypeRef::entity("Sales.Order");
        assert!(reader.create_resource_reader(None, &order).is_ok());
        let err = reader.create_resource_reader(None, &order).err().unwrap();
        assert_eq!(err.message(), "the payload has already been read");
    }

    #[test]
    fn sets_accept_bare_arrays_and_value_members() {
        assert_eq!(value_array(serde_json::json!([1, 2])).unwrap().len(), 2);
        assert_eq!(
            value_array(serde_json::json!({"@odata.context": "$metadata#Orders", "value": [1]}))
                .unwrap()
                .len(),
            1
        );
        assert!(value_array(serde_json::json!({"items": []})).is_err());
    }
}
