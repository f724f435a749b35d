use core::fmt;

/// Namespace of the built-in primitive types.
pub const EDM_NAMESPACE: &str = "Edm";

/// Full name of the untyped marker type.
pub const UNTYPED_TYPE_NAME: &str = "Edm.Untyped";

/// The built-in primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdmPrimitiveKind {
    /// `Edm.Binary`
    Binary,
    /// `Edm.Boolean`
    Boolean,
    /// `Edm.Byte`
    Byte,
    /// `Edm.Date`
    Date,
    /// `Edm.DateTimeOffset`
    DateTimeOffset,
    /// `Edm.Decimal`
    Decimal,
    /// `Edm.Double`
    Double,
    /// `Edm.Duration`
    Duration,
    /// `Edm.Guid`
    Guid,
    /// `Edm.Int16`
    Int16,
    /// `Edm.Int32`
    Int32,
    /// `Edm.Int64`
    Int64,
    /// `Edm.SByte`
    SByte,
    /// `Edm.Single`
    Single,
    /// `Edm.String`
    String,
    /// `Edm.TimeOfDay`
    TimeOfDay,
}

impl EdmPrimitiveKind {
    /// Every primitive kind, in declaration order.
    pub const ALL: [EdmPrimitiveKind; 16] = [
        EdmPrimitiveKind::Binary,
        EdmPrimitiveKind::Boolean,
        EdmPrimitiveKind::Byte,
        EdmPrimitiveKind::Date,
        EdmPrimitiveKind::DateTimeOffset,
        EdmPrimitiveKind::Decimal,
        EdmPrimitiveKind::Double,
        EdmPrimitiveKind::Duration,
        EdmPrimitiveKind::Guid,
        EdmPrimitiveKind::Int16,
        EdmPrimitiveKind::Int32,
        EdmPrimitiveKind::Int64,
        EdmPrimitiveKind::SByte,
        EdmPrimitiveKind::Single,
        EdmPrimitiveKind::String,
        EdmPrimitiveKind::TimeOfDay,
    ];

    /// The unqualified name, e.g. `Int32`.
    pub const fn name(self) -> &'static str {
        match self {
            EdmPrimitiveKind::Binary => "Binary",
            EdmPrimitiveKind::Boolean => "Boolean",
            EdmPrimitiveKind::Byte => "Byte",
            EdmPrimitiveKind::Date => "Date",
            EdmPrimitiveKind::DateTimeOffset => "DateTimeOffset",
            EdmPrimitiveKind::Decimal => "Decimal",
            EdmPrimitiveKind::Double => "Double",
            EdmPrimitiveKind::Duration => "Duration",
            EdmPrimitiveKind::Guid => "Guid",
            EdmPrimitiveKind::Int16 => "Int16",
            EdmPrimitiveKind::Int32 => "Int32",
            EdmPrimitiveKind::Int64 => "Int64",
            EdmPrimitiveKind::SByte => "SByte",
            EdmPrimitiveKind::Single => "Single",
            EdmPrimitiveKind::String => "String",
            EdmPrimitiveKind::TimeOfDay => "TimeOfDay",
        }
    }

    /// The qualified name, e.g. `Edm.Int32`.
    pub const fn full_name(self) -> &'static str {
        match self {
            EdmPrimitiveKind::Binary => "Edm.Binary",
            EdmPrimitiveKind::Boolean => "Edm.Boolean",
            EdmPrimitiveKind::Byte => "Edm.Byte",
            EdmPrimitiveKind::Date => "Edm.Date",
            EdmPrimitiveKind::DateTimeOffset => "Edm.DateTimeOffset",
            EdmPrimitiveKind::Decimal => "Edm.Decimal",
            EdmPrimitiveKind::Double => "Edm.Double",
            EdmPrimitiveKind::Duration => "Edm.Duration",
            EdmPrimitiveKind::Guid => "Edm.Guid",
            EdmPrimitiveKind::Int16 => "Edm.Int16",
            EdmPrimitiveKind::Int32 => "Edm.Int32",
            EdmPrimitiveKind::Int64 => "Edm.Int64",
            EdmPrimitiveKind::SByte => "Edm.SByte",
            EdmPrimitiveKind::Single => "Edm.Single",
            EdmPrimitiveKind::String => "Edm.String",
            EdmPrimitiveKind::TimeOfDay => "Edm.TimeOfDay",
        }
    }

    /// Look up a primitive kind by its qualified (`Edm.Int32`) or bare (`Int32`) name.
    pub fn from_name(name: &str) -> Option<Self> {
        let bare = name.strip_prefix("Edm.").unwrap_or(name);
        Self::ALL.into_iter().find(|kind| kind.name() == bare)
    }

    /// Whether the kind is an integral number.
    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            EdmPrimitiveKind::Byte
                | EdmPrimitiveKind::SByte
                | EdmPrimitiveKind::Int16
                | EdmPrimitiveKind::Int32
                | EdmPrimitiveKind::Int64
        )
    }
}

impl fmt::Display for EdmPrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.full_name())
    }
}

/// The kind of a schema type, used to pick a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdmTypeKind {
    /// A built-in primitive.
    Primitive,
    /// An entity type (has a key, lives in an entity set).
    Entity,
    /// A complex type (structured, no identity).
    Complex,
    /// An enumeration.
    Enum,
    /// A collection of some element type.
    Collection,
    /// `Edm.Untyped`, either as a plain value or as an open structured bag.
    Untyped,
}

/// A schema type, referring to named types by their full name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EdmType {
    /// A built-in primitive.
    Primitive(EdmPrimitiveKind),
    /// An entity type, by full name.
    Entity(String),
    /// A complex type, by full name.
    Complex(String),
    /// An enumeration type, by full name.
    Enum(String),
    /// A collection of the given element type.
    Collection(Box<EdmTypeRef>),
    /// `Edm.Untyped` used as a plain value.
    Untyped,
    /// `Edm.Untyped` used as an open structured bag of properties.
    UntypedStructured,
}

/// A reference to a schema type together with its nullability.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdmTypeRef {
    /// The referenced type.
    pub ty: EdmType,
    /// Whether `null` is an acceptable value.
    pub nullable: bool,
}

impl EdmTypeRef {
    /// A reference to a primitive type.
    pub const fn primitive(kind: EdmPrimitiveKind, nullable: bool) -> Self {
        Self {
            ty: EdmType::Primitive(kind),
            nullable,
        }
    }

    /// A nullable reference to an entity type.
    pub fn entity(full_name: impl Into<String>) -> Self {
        Self {
            ty: EdmType::Entity(full_name.into()),
            nullable: true,
        }
    }

    /// A nullable reference to a complex type.
    pub fn complex(full_name: impl Into<String>) -> Self {
        Self {
            ty: EdmType::Complex(full_name.into()),
            nullable: true,
        }
    }

    /// A nullable reference to an enumeration type.
    pub fn enumeration(full_name: impl Into<String>) -> Self {
        Self {
            ty: EdmType::Enum(full_name.into()),
            nullable: true,
        }
    }

    /// A non-nullable collection of `element`.
    pub fn collection(element: EdmTypeRef) -> Self {
        Self {
            ty: EdmType::Collection(Box::new(element)),
            nullable: false,
        }
    }

    /// `Edm.Untyped` as a plain value.
    pub const fn untyped() -> Self {
        Self {
            ty: EdmType::Untyped,
            nullable: true,
        }
    }

    /// `Edm.Untyped` as an open structured bag.
    pub const fn untyped_structured() -> Self {
        Self {
            ty: EdmType::UntypedStructured,
            nullable: true,
        }
    }

    /// Return a copy with the given nullability.
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// The kind of the referenced type.
    pub fn kind(&self) -> EdmTypeKind {
        match &self.ty {
            EdmType::Primitive(_) => EdmTypeKind::Primitive,
            EdmType::Entity(_) => EdmTypeKind::Entity,
            EdmType::Complex(_) => EdmTypeKind::Complex,
            EdmType::Enum(_) => EdmTypeKind::Enum,
            EdmType::Collection(_) => EdmTypeKind::Collection,
            EdmType::Untyped | EdmType::UntypedStructured => EdmTypeKind::Untyped,
        }
    }

    /// The qualified name of the referenced type, e.g. `Collection(Sales.Order)`.
    pub fn full_name(&self) -> String {
        match &self.ty {
            EdmType::Primitive(kind) => kind.full_name().to_string(),
            EdmType::Entity(name) | EdmType::Complex(name) | EdmType::Enum(name) => name.clone(),
            EdmType::Collection(element) => format!("Collection({})", element.full_name()),
            EdmType::Untyped | EdmType::UntypedStructured => UNTYPED_TYPE_NAME.to_string(),
        }
    }

    /// The primitive kind, if this references a primitive.
    pub fn as_primitive(&self) -> Option<EdmPrimitiveKind> {
        match &self.ty {
            EdmType::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    /// The full name of the structured type, if this references an entity or complex type.
    pub fn structured_name(&self) -> Option<&str> {
        match &self.ty {
            EdmType::Entity(name) | EdmType::Complex(name) => Some(name),
            _ => None,
        }
    }

    /// The full name of the enumeration, if this references one.
    pub fn enum_name(&self) -> Option<&str> {
        match &self.ty {
            EdmType::Enum(name) => Some(name),
            _ => None,
        }
    }

    /// The element type, if this references a collection.
    pub fn element_type(&self) -> Option<&EdmTypeRef> {
        match &self.ty {
            EdmType::Collection(element) => Some(element),
            _ => None,
        }
    }

    /// Whether this references an entity type.
    pub fn is_entity(&self) -> bool {
        matches!(self.ty, EdmType::Entity(_))
    }

    /// Whether this references an entity type, a complex type or the untyped structured bag.
    pub fn is_structured(&self) -> bool {
        matches!(
            self.ty,
            EdmType::Entity(_) | EdmType::Complex(_) | EdmType::UntypedStructured
        )
    }

    /// Whether this references `Edm.Untyped` in either form.
    pub fn is_untyped(&self) -> bool {
        matches!(self.ty, EdmType::Untyped | EdmType::UntypedStructured)
    }

    /// Whether this references a collection of structured elements.
    pub fn is_structured_collection(&self) -> bool {
        self.element_type().is_some_and(EdmTypeRef::is_structured)
    }
}

impl fmt::Display for EdmTypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// Error returned by [`parse_collection_type_name`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeNameError {
    /// `Collection(` without a matching `)`.
    Unterminated(String),
    /// `Collection(Collection(...))`, which the protocol does not allow.
    NestedCollection(String),
}

impl fmt::Display for TypeNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeNameError::Unterminated(name) => {
                write!(f, "collection type name `{name}` is not terminated")
            }
            TypeNameError::NestedCollection(name) => {
                write!(f, "collection type name `{name}` nests another collection")
            }
        }
    }
}

impl core::error::Error for TypeNameError {}

/// Split a `Collection(X)` type name into its element name `X`.
///
/// Returns `Ok(None)` for names that are not collection names at all.
pub fn parse_collection_type_name(name: &str) -> Result<Option<&str>, TypeNameError> {
    let name = name.trim();
    let Some(rest) = name.strip_prefix("Collection(") else {
        return Ok(None);
    };
    let Some(element) = rest.strip_suffix(')') else {
        return Err(TypeNameError::Unterminated(name.to_string()));
    };
    if element.trim_start().starts_with("Collection(") {
        return Err(TypeNameError::NestedCollection(name.to_string()));
    }
    Ok(Some(element.trim()))
}
