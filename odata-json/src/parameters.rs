//! Action parameters.

use std::collections::VecDeque;

use async_trait::async_trait;
use odata_deserialize::{
    CollectionReader, ODataReader, ODataValue, ParameterEvent, ParameterReader, ReaderError,
    ReaderEvent,
};
use odata_edm::{EdmModel, EdmOperation};
use serde_json::{Map, Value as Json};

use crate::annotation::{Member, classify};
use crate::events::Events;
use crate::reader::{EventQueue, ValueQueue};
use crate::debug;
use crate::value::{Values, describe, structured, type_hints};

/// What a parameter reader hands out for the current parameter.
enum Pending {
    None,
    Events(VecDeque<ReaderEvent>),
    Values(VecDeque<ODataValue>),
}

/// Parameters of one action invocation, classified by their declared types.
pub(crate) struct JsonParameterReader {
    parameters: VecDeque<(ParameterEvent, Pending)>,
    current: Pending,
}

impl JsonParameterReader {
    pub(crate) fn new(
        model: &EdmModel,
        operation: &EdmOperation,
        body: Option<Json>,
    ) -> Result<Self, ReaderError> {
        let object = match body {
            // No body invokes an action without parameters.
            None => Map::new(),
            Some(Json::Object(object)) => object,
            Some(other) => {
                return Err(ReaderError::new(format!(
                    "action parameters are an object, found {}",
                    describe(&other)
                )));
            }
        };
        let mut hints = type_hints(&object);
        let values = Values::new(model);
        let mut parameters = VecDeque::new();

        for (name, json) in object {
            if classify(&name) != Member::Property {
                continue;
            }
            let hint = hints.remove(&name);
            let Some(parameter) = operation.find_parameter(&name) else {
                // Passed through; the decoder names the operation in its error.
                debug!(parameter = %name, operation = %operation.full_name(), "undeclared parameter");
                let value = values.read(json, None, hint)?;
                parameters.push_back((ParameterEvent::Value { name, value }, Pending::None));
                continue;
            };
            let ty = &parameter.ty;
            let element = ty.element_type();

            let entry = match (json, element) {
                (Json::Null, Some(_)) => (
                    ParameterEvent::Value {
                        name,
                        value: ODataValue::Null,
                    },
                    Pending::None,
                ),
                (json, None) if ty.structured_name().is_some() => {
                    let mut events = Events::new(model);
                    events.resource_or_null(json, structured(model, Some(ty)))?;
                    (
                        ParameterEvent::Resource { name },
                        Pending::Events(events.finish()),
                    )
                }
                (Json::Array(items), Some(element)) if element.structured_name().is_some() => {
                    let mut events = Events::new(model);
                    events.resource_set(items, structured(model, Some(element)), None)?;
                    (
                        ParameterEvent::ResourceSet { name },
                        Pending::Events(events.finish()),
                    )
                }
                (Json::Array(items), Some(element)) => {
                    let items = items
                        .into_iter()
                        .map(|item| values.read(item, Some(element), None))
                        .collect::<Result<VecDeque<_>, _>>()?;
                    (
                        ParameterEvent::Collection { name },
                        Pending::Values(items),
                    )
                }
                (other, Some(_)) => {
                    return Err(ReaderError::new(format!(
                        "parameter `{name}` is a collection, found {}",
                        describe(&other)
                    )));
                }
                (json, None) => {
                    let value = values.read(json, Some(ty), hint)?;
                    (ParameterEvent::Value { name, value }, Pending::None)
                }
            };
            parameters.push_back(entry);
        }

        Ok(Self {
            parameters,
            current: Pending::None,
        })
    }

    fn take_events(&mut self, what: &str) -> Result<Box<dyn ODataReader>, ReaderError> {
        match core::mem::replace(&mut self.current, Pending::None) {
            Pending::Events(events) => Ok(Box::new(EventQueue::new(events))),
            _ => Err(ReaderError::new(format!(
                "the current parameter is not a {what}"
            ))),
        }
    }
}

#[async_trait]
impl ParameterReader for JsonParameterReader {
    async fn read(&mut self) -> Result<Option<ParameterEvent>, ReaderError> {
        Ok(self.parameters.pop_front().map(|(event, pending)| {
            self.current = pending;
            event
        }))
    }

    fn create_resource_reader(&mut self) -> Result<Box<dyn ODataReader>, ReaderError> {
        self.take_events("resource")
    }

    fn create_resource_set_reader(&mut self) -> Result<Box<dyn ODataReader>, ReaderError> {
        self.take_events("resource set")
    }

    fn create_collection_reader(&mut self) -> Result<Box<dyn CollectionReader>, ReaderError> {
        match core::mem::replace(&mut self.current, Pending::None) {
            Pending::Values(values) => Ok(Box::new(ValueQueue::new(values))),
            _ => Err(ReaderError::new("the current parameter is not a collection")),
        }
    }
}
