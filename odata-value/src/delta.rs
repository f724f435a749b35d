use std::sync::Arc;

use indexmap::IndexSet;
use odata_edm::EdmTypeRef;

use crate::{
    CollectionSink, DeletedMetadata, DeletedReason, DynamicProperties, InstanceAnnotations,
    PropertyShape, Resource, Value, ValueError,
};

/// A partial update of `T`: the instance plus the names of the properties the
/// payload actually set.
///
/// Setting a property outside the updatable set fails with
/// [`ValueError::NotUpdatable`]. A property left at its default is therefore
/// distinguishable from one explicitly set to that default.
#[derive(Debug)]
pub struct Delta<T> {
    instance: T,
    updatable: Arc<[String]>,
    changed: IndexSet<String>,
}

impl<T: Resource> Delta<T> {
    /// Track changes to `instance`, accepting only the `updatable` properties.
    pub fn new(instance: T, updatable: Arc<[String]>) -> Self {
        Self {
            instance,
            updatable,
            changed: IndexSet::new(),
        }
    }

    /// The instance holding the set values.
    pub fn instance(&self) -> &T {
        &self.instance
    }

    /// Unwrap the instance, dropping the change record.
    pub fn into_instance(self) -> T {
        self.instance
    }

    /// The properties the wrapper accepts.
    pub fn updatable_property_names(&self) -> &[String] {
        &self.updatable
    }

    /// The properties set so far, in the order they were first set.
    pub fn changed_property_names(&self) -> impl Iterator<Item = &str> {
        self.changed.iter().map(String::as_str)
    }

    /// Whether `name` was set.
    pub fn is_changed(&self, name: &str) -> bool {
        self.changed.contains(name)
    }

    fn check_updatable(&self, name: &str) -> Result<(), ValueError> {
        if self.updatable.iter().any(|p| p == name) {
            Ok(())
        } else {
            Err(ValueError::NotUpdatable {
                type_name: self.instance.type_name().to_string(),
                property: name.to_string(),
            })
        }
    }
}

impl<T: Resource> Resource for Delta<T> {
    fn type_name(&self) -> &str {
        self.instance.type_name()
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<(), ValueError> {
        self.check_updatable(name)?;
        self.instance.set_property(name, value)?;
        self.changed.insert(name.to_string());
        Ok(())
    }

    fn property_shape(&self, name: &str) -> Option<PropertyShape> {
        self.instance.property_shape(name)
    }

    fn collection_mut(&mut self, name: &str) -> Option<&mut dyn CollectionSink> {
        self.check_updatable(name).ok()?;
        self.changed.insert(name.to_string());
        self.instance.collection_mut(name)
    }

    fn dynamic_properties_mut(&mut self) -> Option<&mut DynamicProperties> {
        self.instance.dynamic_properties_mut()
    }

    fn instance_annotations_mut(&mut self) -> Option<&mut InstanceAnnotations> {
        self.instance.instance_annotations_mut()
    }
}

/// A deleted entity inside a change set: the key properties the payload
/// carried, the entity id and the removal reason.
#[derive(Debug)]
pub struct DeletedDelta<T> {
    delta: Delta<T>,
    metadata: DeletedMetadata,
}

impl<T: Resource> DeletedDelta<T> {
    /// Track a deleted `instance`. The reason defaults to [`DeletedReason::Deleted`].
    pub fn new(instance: T, updatable: Arc<[String]>) -> Self {
        Self {
            delta: Delta::new(instance, updatable),
            metadata: DeletedMetadata::default(),
        }
    }

    /// The change record of the key properties.
    pub fn delta(&self) -> &Delta<T> {
        &self.delta
    }

    /// The entity id, if the payload carried one.
    pub fn id(&self) -> Option<&str> {
        self.metadata.id.as_deref()
    }

    /// Why the entity was removed.
    pub fn reason(&self) -> DeletedReason {
        self.metadata.reason
    }
}

impl<T: Resource> Resource for DeletedDelta<T> {
    fn type_name(&self) -> &str {
        self.delta.type_name()
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<(), ValueError> {
        self.delta.set_property(name, value)
    }

    fn property_shape(&self, name: &str) -> Option<PropertyShape> {
        self.delta.property_shape(name)
    }

    fn collection_mut(&mut self, name: &str) -> Option<&mut dyn CollectionSink> {
        self.delta.collection_mut(name)
    }

    fn dynamic_properties_mut(&mut self) -> Option<&mut DynamicProperties> {
        self.delta.dynamic_properties_mut()
    }

    fn instance_annotations_mut(&mut self) -> Option<&mut InstanceAnnotations> {
        self.delta.instance_annotations_mut()
    }

    fn deleted_metadata(&self) -> Option<&DeletedMetadata> {
        Some(&self.metadata)
    }

    fn deleted_metadata_mut(&mut self) -> Option<&mut DeletedMetadata> {
        Some(&mut self.metadata)
    }
}

/// A link between two entities, added or removed in a change set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaLink {
    /// Id of the entity the link starts from.
    pub source: String,
    /// Id of the linked entity.
    pub target: String,
    /// Name of the navigation property.
    pub relationship: String,
}

/// One entry of a [`DeltaSet`].
#[derive(Debug)]
pub enum DeltaItem {
    /// An added or updated entity, or a deleted one (see [`Resource::is_deleted`](crate::Resource)).
    Resource(Box<dyn Resource>),
    /// A link that was removed.
    DeletedLink(DeltaLink),
    /// A link that was added.
    AddedLink(DeltaLink),
}

impl DeltaItem {
    /// The resource, if this entry is one.
    pub fn as_resource(&self) -> Option<&dyn Resource> {
        match self {
            DeltaItem::Resource(r) => Some(r.as_ref()),
            _ => None,
        }
    }

    /// The resource as the concrete type `R`, if this entry is one.
    pub fn downcast_resource<R: Resource>(&self) -> Option<&R> {
        self.as_resource()?.downcast_ref::<R>()
    }

    /// Whether this entry removes something (a deleted entity or link).
    pub fn is_deletion(&self) -> bool {
        match self {
            DeltaItem::Resource(r) => r.is_deleted(),
            DeltaItem::DeletedLink(_) => true,
            DeltaItem::AddedLink(_) => false,
        }
    }
}

/// An ordered log of changes to an entity set.
///
/// Entries keep the order in which they arrived; nothing is merged or
/// de-duplicated.
#[derive(Debug)]
pub struct DeltaSet {
    element_type: EdmTypeRef,
    items: Vec<DeltaItem>,
}

impl DeltaSet {
    /// An empty change set for entities of `element_type`.
    pub fn new(element_type: EdmTypeRef) -> Self {
        Self {
            element_type,
            items: Vec::new(),
        }
    }

    /// The entity type of the changed entities.
    pub fn element_type(&self) -> &EdmTypeRef {
        &self.element_type
    }

    /// Append an entry.
    pub fn push(&mut self, item: DeltaItem) {
        self.items.push(item);
    }

    /// The entries, in arrival order.
    pub fn items(&self) -> &[DeltaItem] {
        &self.items
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl IntoIterator for DeltaSet {
    type Item = DeltaItem;
    type IntoIter = std::vec::IntoIter<DeltaItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
