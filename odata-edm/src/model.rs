use core::fmt;

use indexmap::IndexMap;

use crate::{
    EdmEntityContainer, EdmEnumType, EdmNavigationSource, EdmOperation, EdmOperationImport,
    EdmPrimitiveKind, EdmProperty, EdmStructuredType, EdmTypeRef, NavigationSourceKind,
    TypeNameError, UNTYPED_TYPE_NAME, parse_collection_type_name,
};

/// A named type declared in a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdmSchemaType {
    /// Entity or complex type.
    Structured(EdmStructuredType),
    /// Enumeration type.
    Enum(EdmEnumType),
}

impl EdmSchemaType {
    /// The qualified name.
    pub fn full_name(&self) -> String {
        match self {
            EdmSchemaType::Structured(ty) => ty.full_name(),
            EdmSchemaType::Enum(ty) => ty.full_name(),
        }
    }

    /// A reference to this type.
    pub fn type_ref(&self) -> EdmTypeRef {
        match self {
            EdmSchemaType::Structured(ty) => ty.type_ref(),
            EdmSchemaType::Enum(ty) => EdmTypeRef::enumeration(ty.full_name()),
        }
    }
}

/// Returned when a case-insensitive property lookup matches several properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousProperty {
    /// The name that was looked up.
    pub name: String,
    /// The declaring type.
    pub type_name: String,
    /// Every declared property matching `name` case-insensitively.
    pub candidates: Vec<String>,
}

impl fmt::Display for AmbiguousProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "property `{}` on type `{}` is ambiguous between {}",
            self.name,
            self.type_name,
            self.candidates.join(", ")
        )
    }
}

impl core::error::Error for AmbiguousProperty {}

/// The service's entity data model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdmModel {
    types: IndexMap<String, EdmSchemaType>,
    operations: Vec<EdmOperation>,
    container: EdmEntityContainer,
}

impl EdmModel {
    /// Start building a model.
    pub fn builder() -> EdmModelBuilder {
        EdmModelBuilder::default()
    }

    /// Find a declared (non-primitive) type by full name.
    pub fn find_declared_type(&self, full_name: &str) -> Option<&EdmSchemaType> {
        self.types.get(full_name)
    }

    /// Find an entity or complex type by full name.
    pub fn structured_type(&self, full_name: &str) -> Option<&EdmStructuredType> {
        match self.types.get(full_name)? {
            EdmSchemaType::Structured(ty) => Some(ty),
            EdmSchemaType::Enum(_) => None,
        }
    }

    /// Find an enumeration type by full name.
    pub fn enum_type(&self, full_name: &str) -> Option<&EdmEnumType> {
        match self.types.get(full_name)? {
            EdmSchemaType::Enum(ty) => Some(ty),
            EdmSchemaType::Structured(_) => None,
        }
    }

    /// Resolve any type name (primitive, declared, `Edm.Untyped` or
    /// `Collection(X)`) into a type reference.
    ///
    /// Returns `Ok(None)` when the name is well formed but unknown.
    pub fn resolve_type_name(&self, name: &str) -> Result<Option<EdmTypeRef>, TypeNameError> {
        if let Some(element) = parse_collection_type_name(name)? {
            return Ok(self
                .resolve_type_name(element)?
                .map(EdmTypeRef::collection));
        }
        if name == UNTYPED_TYPE_NAME {
            return Ok(Some(EdmTypeRef::untyped()));
        }
        if let Some(kind) = name
            .strip_prefix("Edm.")
            .and_then(EdmPrimitiveKind::from_name)
        {
            return Ok(Some(EdmTypeRef::primitive(kind, true)));
        }
        Ok(self.find_declared_type(name).map(EdmSchemaType::type_ref))
    }

    /// The base type chain of `ty`, starting with `ty` itself.
    pub fn base_chain<'a>(
        &'a self,
        ty: &'a EdmStructuredType,
    ) -> impl Iterator<Item = &'a EdmStructuredType> + 'a {
        let limit = self.types.len() + 1;
        let mut next = Some(ty);
        core::iter::from_fn(move || {
            let current = next?;
            next = current
                .base_type()
                .and_then(|base| self.structured_type(base));
            Some(current)
        })
        .take(limit)
    }

    /// All properties of `ty`, inherited ones first.
    pub fn properties<'a>(&'a self, ty: &'a EdmStructuredType) -> Vec<&'a EdmProperty> {
        let mut chain: Vec<&EdmStructuredType> = self.base_chain(ty).collect();
        chain.reverse();
        chain
            .into_iter()
            .flat_map(|t| t.declared_properties().iter())
            .collect()
    }

    /// Find a property (declared or inherited) by exact name.
    pub fn find_property<'a>(
        &'a self,
        ty: &'a EdmStructuredType,
        name: &str,
    ) -> Option<&'a EdmProperty> {
        self.base_chain(ty)
            .flat_map(|t| t.declared_properties().iter())
            .find(|p| p.name == name)
    }

    /// Find a property by exact name, falling back to a case-insensitive
    /// match when `case_insensitive` is set.
    pub fn resolve_property<'a>(
        &'a self,
        ty: &'a EdmStructuredType,
        name: &str,
        case_insensitive: bool,
    ) -> Result<Option<&'a EdmProperty>, AmbiguousProperty> {
        if let Some(property) = self.find_property(ty, name) {
            return Ok(Some(property));
        }
        if !case_insensitive {
            return Ok(None);
        }
        let candidates: Vec<&EdmProperty> = self
            .properties(ty)
            .into_iter()
            .filter(|p| p.name.eq_ignore_ascii_case(name))
            .collect();
        match candidates.as_slice() {
            [] => Ok(None),
            [single] => Ok(Some(*single)),
            many => Err(AmbiguousProperty {
                name: name.to_string(),
                type_name: ty.full_name(),
                candidates: many.iter().map(|p| p.name.clone()).collect(),
            }),
        }
    }

    /// The name the bound Rust type uses for `property`.
    pub fn aliased_property_name<'a>(&self, property: &'a EdmProperty) -> &'a str {
        property.binding_name.as_deref().unwrap_or(&property.name)
    }

    /// Whether `ty` or any of its base types is open.
    pub fn is_open(&self, ty: &EdmStructuredType) -> bool {
        self.base_chain(ty).any(EdmStructuredType::is_declared_open)
    }

    /// Key property names of an entity type, inherited from the root of the
    /// hierarchy.
    pub fn key_names<'a>(&'a self, ty: &'a EdmStructuredType) -> Vec<&'a str> {
        self.base_chain(ty)
            .find(|t| !t.declared_keys().is_empty())
            .map(|t| t.declared_keys().iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Whether `derived` is `base` or inherits from it.
    pub fn is_assignable_to(&self, derived: &EdmStructuredType, base_name: &str) -> bool {
        self.base_chain(derived).any(|t| t.full_name() == base_name)
    }

    /// The names (as seen by the bound Rust type) of every property a partial
    /// update may set.
    pub fn updatable_property_names(&self, ty: &EdmStructuredType) -> Vec<String> {
        self.properties(ty)
            .into_iter()
            .map(|p| self.aliased_property_name(p).to_string())
            .collect()
    }

    /// The entity container.
    pub fn container(&self) -> &EdmEntityContainer {
        &self.container
    }

    /// Find an entity set or singleton by name.
    pub fn navigation_source(&self, name: &str) -> Option<&EdmNavigationSource> {
        self.container.navigation_source(name)
    }

    /// Find an operation by full name (or bare name when unambiguous).
    pub fn find_operation(&self, name: &str) -> Option<&EdmOperation> {
        self.operations
            .iter()
            .find(|op| op.full_name() == name)
            .or_else(|| {
                let mut bare = self.operations.iter().filter(|op| op.name() == name);
                match (bare.next(), bare.next()) {
                    (Some(op), None) => Some(op),
                    _ => None,
                }
            })
    }

    /// Find the operation behind an operation import.
    pub fn operation_for_import(&self, import_name: &str) -> Option<&EdmOperation> {
        let import = self.container.operation_import(import_name)?;
        self.find_operation(&import.operation)
    }

    /// All declared operations.
    pub fn operations(&self) -> &[EdmOperation] {
        &self.operations
    }

    /// All declared types, in declaration order.
    pub fn types(&self) -> impl Iterator<Item = &EdmSchemaType> {
        self.types.values()
    }
}

/// Builder for [`EdmModel`].
#[derive(Debug, Default)]
pub struct EdmModelBuilder {
    model: EdmModel,
}

impl EdmModelBuilder {
    /// Declare an entity or complex type.
    pub fn structured(mut self, ty: EdmStructuredType) -> Self {
        self.model
            .types
            .insert(ty.full_name(), EdmSchemaType::Structured(ty));
        self
    }

    /// Declare an enumeration type.
    pub fn enumeration(mut self, ty: EdmEnumType) -> Self {
        self.model.types.insert(ty.full_name(), EdmSchemaType::Enum(ty));
        self
    }

    /// Declare an operation.
    pub fn operation(mut self, op: EdmOperation) -> Self {
        self.model.operations.push(op);
        self
    }

    /// Add an entity set to the container.
    pub fn entity_set(mut self, name: &str, entity_type: &str) -> Self {
        self.model
            .container
            .navigation_sources
            .push(EdmNavigationSource {
                name: name.to_string(),
                kind: NavigationSourceKind::EntitySet,
                entity_type: entity_type.to_string(),
            });
        self
    }

    /// Add a singleton to the container.
    pub fn singleton(mut self, name: &str, entity_type: &str) -> Self {
        self.model
            .container
            .navigation_sources
            .push(EdmNavigationSource {
                name: name.to_string(),
                kind: NavigationSourceKind::Singleton,
                entity_type: entity_type.to_string(),
            });
        self
    }

    /// Expose an unbound operation through the container.
    pub fn operation_import(mut self, name: &str, operation: &str) -> Self {
        self.model
            .container
            .operation_imports
            .push(EdmOperationImport {
                name: name.to_string(),
                operation: operation.to_string(),
            });
        self
    }

    /// Finish building.
    pub fn build(self) -> EdmModel {
        self.model
    }
}
