/// Entity set or singleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationSourceKind {
    /// A collection of entities addressable by key.
    EntitySet,
    /// A single named entity.
    Singleton,
}

/// An entity set or singleton in the entity container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdmNavigationSource {
    /// Name within the container.
    pub name: String,
    /// Entity set or singleton.
    pub kind: NavigationSourceKind,
    /// Full name of the entity type.
    pub entity_type: String,
}

impl EdmNavigationSource {
    /// Whether this is an entity set.
    pub fn is_entity_set(&self) -> bool {
        self.kind == NavigationSourceKind::EntitySet
    }
}

/// An unbound operation exposed by the entity container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdmOperationImport {
    /// Name within the container.
    pub name: String,
    /// Full name of the imported operation.
    pub operation: String,
}

/// The entity container: top-level addressable resources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdmEntityContainer {
    pub(crate) navigation_sources: Vec<EdmNavigationSource>,
    pub(crate) operation_imports: Vec<EdmOperationImport>,
}

impl EdmEntityContainer {
    /// Find an entity set or singleton by name.
    pub fn navigation_source(&self, name: &str) -> Option<&EdmNavigationSource> {
        self.navigation_sources.iter().find(|s| s.name == name)
    }

    /// All entity sets and singletons.
    pub fn navigation_sources(&self) -> &[EdmNavigationSource] {
        &self.navigation_sources
    }

    /// Find an operation import by name.
    pub fn operation_import(&self, name: &str) -> Option<&EdmOperationImport> {
        self.operation_imports.iter().find(|i| i.name == name)
    }
}
