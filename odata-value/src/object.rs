use indexmap::IndexMap;
use odata_edm::EdmTypeRef;

use crate::{
    DeletedMetadata, DynamicProperties, InstanceAnnotations, PropertyShape, Resource, Value,
    ValueError,
};

/// An entity or complex value decoded without a bound Rust type.
///
/// Declared properties and dynamic properties live in separate bags, both
/// in payload order. Only properties present in the payload are recorded, so
/// the declared bag doubles as the set of changed properties.
#[derive(Debug)]
pub struct EdmStructuredObject {
    ty: EdmTypeRef,
    type_name: String,
    expected_type: Option<EdmTypeRef>,
    properties: IndexMap<String, Value>,
    dynamic_properties: DynamicProperties,
    annotations: InstanceAnnotations,
    deleted: Option<DeletedMetadata>,
}

impl EdmStructuredObject {
    /// An empty object of schema type `ty`.
    pub fn new(ty: EdmTypeRef) -> Self {
        Self {
            type_name: ty.full_name(),
            ty,
            expected_type: None,
            properties: IndexMap::new(),
            dynamic_properties: IndexMap::new(),
            annotations: IndexMap::new(),
            deleted: None,
        }
    }

    /// An empty object of schema type `ty` standing for a deleted entity.
    pub fn deleted(ty: EdmTypeRef, metadata: DeletedMetadata) -> Self {
        Self {
            deleted: Some(metadata),
            ..Self::new(ty)
        }
    }

    /// The schema type of the object.
    pub fn edm_type(&self) -> &EdmTypeRef {
        &self.ty
    }

    /// Whether the object is an entity (as opposed to a complex value).
    pub fn is_entity(&self) -> bool {
        self.ty.is_entity()
    }

    /// The statically expected type, when the payload named a derived type.
    pub fn expected_type(&self) -> Option<&EdmTypeRef> {
        self.expected_type.as_ref()
    }

    /// Record the statically expected type.
    pub fn set_expected_type(&mut self, expected: EdmTypeRef) {
        self.expected_type = Some(expected);
    }

    /// A declared or dynamic property by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties
            .get(name)
            .or_else(|| self.dynamic_properties.get(name))
    }

    /// Remove and return a property.
    pub fn take(&mut self, name: &str) -> Option<Value> {
        self.properties
            .shift_remove(name)
            .or_else(|| self.dynamic_properties.shift_remove(name))
    }

    /// Declared properties present in the payload, in payload order.
    pub fn properties(&self) -> &IndexMap<String, Value> {
        &self.properties
    }

    /// Dynamic properties, in payload order.
    pub fn dynamic_properties(&self) -> &DynamicProperties {
        &self.dynamic_properties
    }

    /// Instance annotations, in payload order.
    pub fn instance_annotations(&self) -> &InstanceAnnotations {
        &self.annotations
    }

    /// Names of the declared properties the payload set.
    pub fn changed_property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }
}

impl Resource for EdmStructuredObject {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<(), ValueError> {
        self.properties.insert(name.to_string(), value);
        Ok(())
    }

    fn property_shape(&self, _name: &str) -> Option<PropertyShape> {
        Some(PropertyShape::Any)
    }

    fn dynamic_properties_mut(&mut self) -> Option<&mut DynamicProperties> {
        Some(&mut self.dynamic_properties)
    }

    fn instance_annotations_mut(&mut self) -> Option<&mut InstanceAnnotations> {
        Some(&mut self.annotations)
    }

    fn deleted_metadata(&self) -> Option<&DeletedMetadata> {
        self.deleted.as_ref()
    }

    fn deleted_metadata_mut(&mut self) -> Option<&mut DeletedMetadata> {
        self.deleted.as_mut()
    }

    fn as_structured_object_mut(&mut self) -> Option<&mut EdmStructuredObject> {
        Some(self)
    }
}
