use crate::{EdmPrimitiveKind, EdmTypeRef};

/// Whether a structured type is an entity or a complex type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructuredKind {
    /// Entity type.
    Entity,
    /// Complex type.
    Complex,
}

/// How a property relates to its declaring type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// A structural property (primitive, enum, complex or collection thereof).
    Structural,
    /// A navigation property pointing at other entities.
    Navigation {
        /// Whether the targets are contained by the declaring entity.
        contains_target: bool,
    },
}

/// A property declared on a structured type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdmProperty {
    /// The property name as it appears on the wire.
    pub name: String,
    /// The property type.
    pub ty: EdmTypeRef,
    /// Structural or navigation.
    pub kind: PropertyKind,
    /// The name the bound Rust type uses for this property, when it differs
    /// from the wire name.
    pub binding_name: Option<String>,
}

impl EdmProperty {
    /// A structural property.
    pub fn structural(name: impl Into<String>, ty: EdmTypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            kind: PropertyKind::Structural,
            binding_name: None,
        }
    }

    /// A navigation property.
    pub fn navigation(name: impl Into<String>, ty: EdmTypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            kind: PropertyKind::Navigation {
                contains_target: false,
            },
            binding_name: None,
        }
    }

    /// Bind the property to a differently named field of the Rust type.
    pub fn bound_to(mut self, binding_name: impl Into<String>) -> Self {
        self.binding_name = Some(binding_name.into());
        self
    }

    /// Whether this is a navigation property.
    pub fn is_navigation(&self) -> bool {
        matches!(self.kind, PropertyKind::Navigation { .. })
    }
}

/// An entity or complex type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdmStructuredType {
    namespace: String,
    name: String,
    kind: StructuredKind,
    base_type: Option<String>,
    is_abstract: bool,
    is_open: bool,
    properties: Vec<EdmProperty>,
    keys: Vec<String>,
}

impl EdmStructuredType {
    fn new(namespace: &str, name: &str, kind: StructuredKind) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            kind,
            base_type: None,
            is_abstract: false,
            is_open: false,
            properties: Vec::new(),
            keys: Vec::new(),
        }
    }

    /// Start declaring an entity type.
    pub fn entity(namespace: &str, name: &str) -> Self {
        Self::new(namespace, name, StructuredKind::Entity)
    }

    /// Start declaring a complex type.
    pub fn complex(namespace: &str, name: &str) -> Self {
        Self::new(namespace, name, StructuredKind::Complex)
    }

    /// Derive from `base` (full name).
    pub fn derives_from(mut self, base: impl Into<String>) -> Self {
        self.base_type = Some(base.into());
        self
    }

    /// Mark the type abstract.
    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Mark the type open (accepts dynamic properties).
    pub fn open(mut self) -> Self {
        self.is_open = true;
        self
    }

    /// Declare a non-nullable primitive key property.
    pub fn key(mut self, name: &str, kind: EdmPrimitiveKind) -> Self {
        self.keys.push(name.to_string());
        self.properties.push(EdmProperty::structural(
            name,
            EdmTypeRef::primitive(kind, false),
        ));
        self
    }

    /// Declare a structural property.
    pub fn property(mut self, name: &str, ty: EdmTypeRef) -> Self {
        self.properties.push(EdmProperty::structural(name, ty));
        self
    }

    /// Declare a navigation property.
    pub fn navigation(mut self, name: &str, ty: EdmTypeRef) -> Self {
        self.properties.push(EdmProperty::navigation(name, ty));
        self
    }

    /// Declare a fully specified property.
    pub fn with_property(mut self, property: EdmProperty) -> Self {
        self.properties.push(property);
        self
    }

    /// The namespace, e.g. `Sales`.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The unqualified name, e.g. `Customer`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The qualified name, e.g. `Sales.Customer`.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    /// Entity or complex.
    pub fn kind(&self) -> StructuredKind {
        self.kind
    }

    /// Whether this is an entity type.
    pub fn is_entity(&self) -> bool {
        self.kind == StructuredKind::Entity
    }

    /// The full name of the base type, if any.
    pub fn base_type(&self) -> Option<&str> {
        self.base_type.as_deref()
    }

    /// Whether the type is abstract.
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Whether the type itself is declared open. See [`crate::EdmModel::is_open`]
    /// for the inherited answer.
    pub fn is_declared_open(&self) -> bool {
        self.is_open
    }

    /// Properties declared directly on this type (not inherited ones).
    pub fn declared_properties(&self) -> &[EdmProperty] {
        &self.properties
    }

    /// Key property names declared directly on this type.
    pub fn declared_keys(&self) -> &[String] {
        &self.keys
    }

    /// A reference to this type.
    pub fn type_ref(&self) -> EdmTypeRef {
        match self.kind {
            StructuredKind::Entity => EdmTypeRef::entity(self.full_name()),
            StructuredKind::Complex => EdmTypeRef::complex(self.full_name()),
        }
    }
}
