//! Wire-level items and the wrapper tree they are folded into.

use odata_value::{DeletedReason, DeltaLink, Primitive};

use crate::{ODataReader, ReaderError, ReaderEvent};

/// A property value as the reader delivers it.
#[derive(Debug, Clone, PartialEq)]
pub enum ODataValue {
    /// `null`
    Null,
    /// A primitive the reader already typed.
    Primitive(Primitive),
    /// Raw literal text the reader could not type (an `Edm.Untyped` value).
    Untyped(String),
    /// An enum member, or flags combination, by name (or number).
    Enum {
        /// The enum type named in the payload, if any.
        type_name: Option<String>,
        /// The member text.
        value: String,
    },
    /// A collection of values.
    Collection {
        /// `Collection(X)` as named in the payload, if any.
        type_name: Option<String>,
        /// The items, in payload order.
        items: Vec<ODataValue>,
    },
    /// An inline structured value (dynamic or untyped properties).
    Resource {
        /// The type named in the payload, if any.
        type_name: Option<String>,
        /// The properties, in payload order.
        properties: Vec<ODataProperty>,
    },
}

impl ODataValue {
    /// A short name for diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            ODataValue::Null => "null",
            ODataValue::Primitive(_) => "a primitive value",
            ODataValue::Untyped(_) => "an untyped value",
            ODataValue::Enum { .. } => "an enum value",
            ODataValue::Collection { .. } => "a collection value",
            ODataValue::Resource { .. } => "a resource value",
        }
    }
}

/// A named property value.
#[derive(Debug, Clone, PartialEq)]
pub struct ODataProperty {
    /// Property name as it appears in the payload.
    pub name: String,
    /// The value.
    pub value: ODataValue,
}

impl ODataProperty {
    /// A property `name` holding `value`.
    pub fn new(name: impl Into<String>, value: ODataValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// An instance annotation (`@ns.term`) on a resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ODataInstanceAnnotation {
    /// The qualified term name, without the leading `@`.
    pub name: String,
    /// The value.
    pub value: ODataValue,
}

/// The header of a resource: its type, id and structural properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ODataResource {
    /// The type named in the payload (`@odata.type`), if any.
    pub type_name: Option<String>,
    /// The entity id (`@odata.id`), if any.
    pub id: Option<String>,
    /// Primitive, enum and collection-of-primitive properties, in payload order.
    pub properties: Vec<ODataProperty>,
    /// Instance annotations, in payload order.
    pub instance_annotations: Vec<ODataInstanceAnnotation>,
    /// For a deleted resource, why it was removed.
    pub removed_reason: Option<DeletedReason>,
}

impl ODataResource {
    /// A resource with no type name and no properties.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the type name.
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Set the id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Append a property.
    pub fn with_property(mut self, name: impl Into<String>, value: ODataValue) -> Self {
        self.properties.push(ODataProperty::new(name, value));
        self
    }

    /// Whether a property named `name` is present.
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.iter().any(|p| p.name == name)
    }
}

/// The header of a resource set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ODataResourceSet {
    /// `Collection(X)` as named in the payload, if any.
    pub type_name: Option<String>,
}

/// The header of a delta resource set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ODataDeltaResourceSet {
    /// `Collection(X)` as named in the payload, if any.
    pub type_name: Option<String>,
}

/// The header of a nested resource info: a navigation or complex property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ODataNestedResourceInfo {
    /// The property name.
    pub name: String,
    /// Whether the property holds a collection, when the reader knows.
    pub is_collection: Option<bool>,
}

/// A node of the wrapper tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ODataItem {
    /// A resource (possibly `null`, possibly deleted).
    Resource(ResourceWrapper),
    /// A resource set.
    ResourceSet(ResourceSetWrapper),
    /// A delta resource set.
    DeltaResourceSet(DeltaResourceSetWrapper),
    /// A removed link, inside a delta resource set.
    DeletedLink(DeltaLink),
    /// An added link, inside a delta resource set.
    AddedLink(DeltaLink),
    /// A reference to an entity by id.
    EntityReferenceLink(String),
    /// A property value (also used for primitives inside untyped sets).
    Value(ODataValue),
}

impl ODataItem {
    /// A short name for diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            ODataItem::Resource(_) => "a resource",
            ODataItem::ResourceSet(_) => "a resource set",
            ODataItem::DeltaResourceSet(_) => "a delta resource set",
            ODataItem::DeletedLink(_) => "a deleted link",
            ODataItem::AddedLink(_) => "an added link",
            ODataItem::EntityReferenceLink(_) => "an entity reference link",
            ODataItem::Value(_) => "a value",
        }
    }
}

/// A resource and its nested resource infos.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceWrapper {
    /// The resource, or `None` for `null`.
    pub resource: Option<ODataResource>,
    /// Whether the resource was read as a deleted resource.
    pub is_deleted: bool,
    /// Navigation and complex properties, in payload order.
    pub nested: Vec<NestedResourceInfoWrapper>,
}

impl ResourceWrapper {
    /// A wrapper around `resource` with no nested infos.
    pub fn new(resource: ODataResource) -> Self {
        Self {
            resource: Some(resource),
            is_deleted: false,
            nested: Vec::new(),
        }
    }

    /// A wrapper around a deleted `resource`.
    pub fn deleted(resource: ODataResource) -> Self {
        Self {
            is_deleted: true,
            ..Self::new(resource)
        }
    }

    /// Append a nested resource info.
    pub fn with_nested(mut self, nested: NestedResourceInfoWrapper) -> Self {
        self.nested.push(nested);
        self
    }
}

/// A resource set and its items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceSetWrapper {
    /// The set header.
    pub set: ODataResourceSet,
    /// Resources (or, in untyped sets, values), in payload order.
    pub items: Vec<ODataItem>,
}

/// A delta resource set and its items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeltaResourceSetWrapper {
    /// The set header.
    pub set: ODataDeltaResourceSet,
    /// Resources, deleted resources and links, in payload order.
    pub items: Vec<ODataItem>,
}

/// A nested resource info and what it holds.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedResourceInfoWrapper {
    /// The info header.
    pub info: ODataNestedResourceInfo,
    /// A resource, a resource set, a delta resource set, or entity reference links.
    pub items: Vec<ODataItem>,
}

impl NestedResourceInfoWrapper {
    /// An info for property `name` holding `items`.
    pub fn new(name: impl Into<String>, items: Vec<ODataItem>) -> Self {
        Self {
            info: ODataNestedResourceInfo {
                name: name.into(),
                is_collection: None,
            },
            items,
        }
    }
}

enum Frame {
    Resource(ResourceWrapper),
    ResourceSet(ResourceSetWrapper),
    DeltaResourceSet(DeltaResourceSetWrapper),
    Nested(NestedResourceInfoWrapper),
}

impl Frame {
    fn describe(&self) -> &'static str {
        match self {
            Frame::Resource(_) => "resource",
            Frame::ResourceSet(_) => "resource set",
            Frame::DeltaResourceSet(_) => "delta resource set",
            Frame::Nested(_) => "nested resource info",
        }
    }
}

struct TreeBuilder {
    stack: Vec<Frame>,
    root: Option<ODataItem>,
}

impl TreeBuilder {
    fn attach(&mut self, item: ODataItem) -> Result<(), ReaderError> {
        match self.stack.last_mut() {
            None => {
                if self.root.is_some() {
                    return Err(ReaderError::new(format!(
                        "unexpected {} after the top-level item",
                        item.describe()
                    )));
                }
                self.root = Some(item);
                Ok(())
            }
            Some(Frame::ResourceSet(set)) => {
                set.items.push(item);
                Ok(())
            }
            Some(Frame::DeltaResourceSet(set)) => {
                set.items.push(item);
                Ok(())
            }
            Some(Frame::Nested(nested)) => {
                nested.items.push(item);
                Ok(())
            }
            Some(Frame::Resource(_)) => Err(ReaderError::new(format!(
                "{} directly inside a resource",
                item.describe()
            ))),
        }
    }

    fn pop(&mut self, expected: &'static str) -> Result<Frame, ReaderError> {
        match self.stack.pop() {
            Some(frame) if frame.describe() == expected => Ok(frame),
            Some(frame) => Err(ReaderError::new(format!(
                "{expected} end while inside a {}",
                frame.describe()
            ))),
            None => Err(ReaderError::new(format!(
                "{expected} end without a matching start"
            ))),
        }
    }

    fn apply(&mut self, event: ReaderEvent) -> Result<(), ReaderError> {
        match event {
            ReaderEvent::ResourceStart(resource) => {
                self.stack.push(Frame::Resource(ResourceWrapper {
                    resource,
                    is_deleted: false,
                    nested: Vec::new(),
                }));
            }
            ReaderEvent::DeletedResourceStart(resource) => {
                self.stack
                    .push(Frame::Resource(ResourceWrapper::deleted(resource)));
            }
            ReaderEvent::ResourceEnd => {
                if let Frame::Resource(wrapper) = self.pop("resource")? {
                    self.attach(ODataItem::Resource(wrapper))?;
                }
            }
            ReaderEvent::ResourceSetStart(set) => {
                self.stack.push(Frame::ResourceSet(ResourceSetWrapper {
                    set,
                    items: Vec::new(),
                }));
            }
            ReaderEvent::ResourceSetEnd => {
                if let Frame::ResourceSet(wrapper) = self.pop("resource set")? {
                    self.attach(ODataItem::ResourceSet(wrapper))?;
                }
            }
            ReaderEvent::DeltaResourceSetStart(set) => {
                self.stack.push(Frame::DeltaResourceSet(DeltaResourceSetWrapper {
                    set,
                    items: Vec::new(),
                }));
            }
            ReaderEvent::DeltaResourceSetEnd => {
                if let Frame::DeltaResourceSet(wrapper) = self.pop("delta resource set")? {
                    self.attach(ODataItem::DeltaResourceSet(wrapper))?;
                }
            }
            ReaderEvent::NestedResourceInfoStart(info) => match self.stack.last() {
                Some(Frame::Resource(_)) => self.stack.push(Frame::Nested(NestedResourceInfoWrapper {
                    info,
                    items: Vec::new(),
                })),
                _ => {
                    return Err(ReaderError::new(format!(
                        "nested resource info `{}` outside a resource",
                        info.name
                    )));
                }
            },
            ReaderEvent::NestedResourceInfoEnd => {
                if let Frame::Nested(nested) = self.pop("nested resource info")? {
                    match self.stack.last_mut() {
                        Some(Frame::Resource(parent)) => parent.nested.push(nested),
                        _ => {
                            return Err(ReaderError::new(
                                "nested resource info end outside a resource",
                            ));
                        }
                    }
                }
            }
            ReaderEvent::EntityReferenceLink(url) => {
                self.attach(ODataItem::EntityReferenceLink(url))?;
            }
            ReaderEvent::DeltaLink(link) => self.attach(ODataItem::AddedLink(link))?,
            ReaderEvent::DeltaDeletedLink(link) => self.attach(ODataItem::DeletedLink(link))?,
            ReaderEvent::Primitive(value) => self.attach(ODataItem::Value(value))?,
        }
        Ok(())
    }
}

/// Drain `reader` and fold its events into a wrapper tree.
///
/// Returns `None` for a payload without any item.
pub async fn read_item_tree(
    reader: &mut dyn ODataReader,
) -> Result<Option<ODataItem>, ReaderError> {
    let mut builder = TreeBuilder {
        stack: Vec::new(),
        root: None,
    };
    while let Some(event) = reader.read().await? {
        builder.apply(event)?;
    }
    if let Some(open) = builder.stack.last() {
        return Err(ReaderError::new(format!(
            "payload ended inside a {}",
            open.describe()
        )));
    }
    Ok(builder.root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;

    struct Replay(VecDeque<ReaderEvent>);

    #[async_trait]
    impl ODataReader for Replay {
        async fn read(&mut self) -> Result<Option<ReaderEvent>, ReaderError> {
            Ok(self.0.pop_front())
        }
    }

    fn replay(events: Vec<ReaderEvent>) -> Replay {
        Replay(events.into())
    }

    #[tokio::test]
    async fn builds_nested_tree() {
        let mut reader = replay(vec![
            ReaderEvent::ResourceStart(Some(ODataResource::new().with_property(
                "Id",
                ODataValue::Primitive(Primitive::Int32(1)),
            ))),
            ReaderEvent::NestedResourceInfoStart(ODataNestedResourceInfo {
                name: "Orders".into(),
                is_collection: Some(true),
            }),
            ReaderEvent::ResourceSetStart(ODataResourceSet::default()),
            ReaderEvent::ResourceStart(Some(ODataResource::new())),
            ReaderEvent::ResourceEnd,
            ReaderEvent::ResourceStart(Some(ODataResource::new())),
            ReaderEvent::ResourceEnd,
            ReaderEvent::ResourceSetEnd,
            ReaderEvent::NestedResourceInfoEnd,
            ReaderEvent::ResourceEnd,
        ]);
        let Some(ODataItem::Resource(root)) = read_item_tree(&mut reader).await.unwrap() else {
            panic!("expected a resource");
        };
        assert_eq!(root.nested.len(), 1);
        assert_eq!(root.nested[0].info.name, "Orders");
        let [ODataItem::ResourceSet(set)] = root.nested[0].items.as_slice() else {
            panic!("expected one resource set");
        };
        assert_eq!(set.items.len(), 2);
    }

    #[tokio::test]
    async fn unbalanced_events_fail() {
        let mut reader = replay(vec![ReaderEvent::ResourceStart(Some(ODataResource::new()))]);
        assert!(read_item_tree(&mut reader).await.is_err());

        let mut reader = replay(vec![
            ReaderEvent::ResourceSetStart(ODataResourceSet::default()),
            ReaderEvent::ResourceEnd,
        ]);
        assert!(read_item_tree(&mut reader).await.is_err());
    }

    #[tokio::test]
    async fn empty_payload_has_no_item() {
        let mut reader = replay(Vec::new());
        assert_eq!(read_item_tree(&mut reader).await.unwrap(), None);
    }
}
