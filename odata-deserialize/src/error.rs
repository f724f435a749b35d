use core::fmt;

use odata_edm::TypeNameError;
use odata_value::ValueError;

use crate::ReaderError;

/// One step of the location of a decode error inside the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    /// A property of a resource.
    Property(String),
    /// An element of a collection or resource set.
    Index(usize),
    /// An action parameter.
    Parameter(String),
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Property(name) => write!(f, ".{name}"),
            PathStep::Index(i) => write!(f, "[{i}]"),
            PathStep::Parameter(name) => write!(f, "@{name}"),
        }
    }
}

/// The broad class of a [`DecodeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The payload does not fit the schema or the bound Rust types.
    SchemaMismatch,
    /// The payload itself is malformed.
    MalformedPayload,
    /// No decoder is registered for a schema type.
    DecoderUnavailable,
    /// An open type received the same dynamic property twice.
    DuplicateDynamicProperty,
    /// Nesting exceeded the configured depth.
    RecursionTooDeep,
    /// The payload reader yielded something the model does not allow.
    ReaderContract,
}

/// What went wrong while decoding.
#[derive(Debug)]
#[non_exhaustive]
pub enum DecodeErrorKind {
    /// A property is neither declared nor allowed as a dynamic property.
    UnknownProperty {
        /// The property name from the payload.
        property: String,
        /// The structured type that was being decoded.
        type_name: String,
        /// A declared property with a similar name.
        suggestion: Option<String>,
    },
    /// Several declared properties match a name case-insensitively.
    AmbiguousProperty {
        /// The property name from the payload.
        property: String,
        /// The structured type that was being decoded.
        type_name: String,
        /// The matching declared properties.
        candidates: Vec<String>,
    },
    /// A type name from the payload does not resolve in the model.
    UnknownType {
        /// The unresolved name.
        type_name: String,
    },
    /// The payload names an abstract type.
    AbstractType {
        /// The abstract type.
        type_name: String,
    },
    /// A collection was decoded for a property that does not hold a collection.
    NotCollectionShaped {
        /// The property.
        property: String,
        /// The owning type.
        type_name: String,
    },
    /// No Rust type is bound to a schema type, or no schema type to a Rust type.
    MissingTypeMapping {
        /// The type without a mapping.
        type_name: String,
    },
    /// A get-only collection property holds no instance to append into.
    NullGetOnlyCollection {
        /// The property.
        property: String,
        /// The owning type.
        type_name: String,
    },
    /// A get-only collection property is a fixed-size array, which cannot be
    /// appended to in place.
    FixedSizeGetOnlyCollection {
        /// The property.
        property: String,
        /// The owning type.
        type_name: String,
    },
    /// The decoded value does not match what the target expects.
    TypeMismatch {
        /// What was expected.
        expected: String,
        /// What was found.
        found: String,
    },
    /// A bound Rust type or value conversion rejected a value.
    Value(ValueError),
    /// An untyped literal is not an integer, decimal, float or quoted string.
    InvalidUntypedLiteral {
        /// The raw literal.
        literal: String,
    },
    /// A `Collection(Collection(..))` type name.
    NestedCollection {
        /// The offending type name.
        type_name: String,
    },
    /// A change set was decoded for a path with no entity set.
    MissingNavigationSource,
    /// The request path does not end in an action invocation.
    NotAnOperationInvocation {
        /// The request path.
        path: String,
    },
    /// An enum value names no member of its type.
    InvalidEnumMember {
        /// The enumeration type.
        type_name: String,
        /// The offending member.
        member: String,
    },
    /// `null` for a non-nullable type.
    NullNotAllowed {
        /// The non-nullable type.
        type_name: String,
    },
    /// The wrapper tree holds an item of the wrong shape.
    UnexpectedItem {
        /// The expected item shape.
        expected: &'static str,
        /// The shape found.
        found: &'static str,
    },
    /// The payload reader failed.
    Reader(ReaderError),
    /// No decoder is registered for a schema type.
    NoDeserializer {
        /// The schema type.
        type_name: String,
    },
    /// An open type received the same dynamic property twice.
    DuplicateDynamicProperty {
        /// The dynamic property.
        property: String,
        /// The owning type.
        type_name: String,
    },
    /// Nesting exceeded [`DecodeOptions::max_depth`](crate::DecodeOptions::max_depth).
    RecursionTooDeep {
        /// The configured limit.
        limit: usize,
    },
    /// The parameter reader yielded a parameter the operation does not declare.
    UnknownParameter {
        /// The parameter name.
        parameter: String,
        /// The operation.
        operation: String,
    },
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeErrorKind::UnknownProperty {
                property,
                type_name,
                suggestion,
            } => {
                write!(
                    f,
                    "`{type_name}` has no property `{property}` and is not an open type"
                )?;
                if let Some(suggestion) = suggestion {
                    write!(f, " (did you mean `{suggestion}`?)")?;
                }
                Ok(())
            }
            DecodeErrorKind::AmbiguousProperty {
                property,
                type_name,
                candidates,
            } => write!(
                f,
                "property `{property}` of `{type_name}` is ambiguous: matches {}",
                candidates.join(", ")
            ),
            DecodeErrorKind::UnknownType { type_name } => {
                write!(f, "type `{type_name}` is not defined in the model")
            }
            DecodeErrorKind::AbstractType { type_name } => {
                write!(f, "cannot create an instance of abstract type `{type_name}`")
            }
            DecodeErrorKind::NotCollectionShaped {
                property,
                type_name,
            } => write!(
                f,
                "property `{property}` of `{type_name}` does not hold a collection"
            ),
            DecodeErrorKind::MissingTypeMapping { type_name } => {
                write!(f, "no type mapping for `{type_name}`")
            }
            DecodeErrorKind::NullGetOnlyCollection {
                property,
                type_name,
            } => write!(
                f,
                "get-only collection property `{property}` of `{type_name}` is null"
            ),
            DecodeErrorKind::FixedSizeGetOnlyCollection {
                property,
                type_name,
            } => write!(
                f,
                "get-only collection property `{property}` of `{type_name}` is a fixed-size array"
            ),
            DecodeErrorKind::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {expected}, found {found}")
            }
            DecodeErrorKind::Value(err) => write!(f, "{err}"),
            DecodeErrorKind::InvalidUntypedLiteral { literal } => write!(
                f,
                "untyped value `{literal}` is not a number or a quoted string"
            ),
            DecodeErrorKind::NestedCollection { type_name } => {
                write!(f, "nested collection type `{type_name}` is not supported")
            }
            DecodeErrorKind::MissingNavigationSource => {
                f.write_str("a delta payload requires an entity set in the request path")
            }
            DecodeErrorKind::NotAnOperationInvocation { path } => {
                write!(f, "path `{path}` does not invoke an action")
            }
            DecodeErrorKind::InvalidEnumMember { type_name, member } => {
                write!(f, "`{member}` is not a member of `{type_name}`")
            }
            DecodeErrorKind::NullNotAllowed { type_name } => {
                write!(f, "null is not allowed for non-nullable `{type_name}`")
            }
            DecodeErrorKind::UnexpectedItem { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            DecodeErrorKind::Reader(err) => write!(f, "payload reader: {err}"),
            DecodeErrorKind::NoDeserializer { type_name } => {
                write!(f, "no deserializer for type `{type_name}`")
            }
            DecodeErrorKind::DuplicateDynamicProperty {
                property,
                type_name,
            } => write!(
                f,
                "duplicate dynamic property `{property}` on `{type_name}`"
            ),
            DecodeErrorKind::RecursionTooDeep { limit } => {
                write!(f, "payload nesting exceeds the limit of {limit}")
            }
            DecodeErrorKind::UnknownParameter {
                parameter,
                operation,
            } => write!(
                f,
                "operation `{operation}` has no parameter `{parameter}`"
            ),
        }
    }
}

/// Error returned by every decode operation.
#[derive(Debug)]
pub struct DecodeError {
    /// What went wrong.
    pub kind: DecodeErrorKind,
    /// Where in the payload it went wrong, outermost step first.
    pub path: Vec<PathStep>,
}

impl DecodeError {
    /// An error at the current position.
    pub fn new(kind: DecodeErrorKind) -> Self {
        Self {
            kind,
            path: Vec::new(),
        }
    }

    /// Prefix the location with `step` (called while unwinding).
    pub fn with_path(mut self, step: PathStep) -> Self {
        self.path.insert(0, step);
        self
    }

    /// The broad class of this error.
    pub fn category(&self) -> ErrorCategory {
        match &self.kind {
            DecodeErrorKind::UnknownProperty { .. }
            | DecodeErrorKind::AmbiguousProperty { .. }
            | DecodeErrorKind::UnknownType { .. }
            | DecodeErrorKind::AbstractType { .. }
            | DecodeErrorKind::NotCollectionShaped { .. }
            | DecodeErrorKind::MissingTypeMapping { .. }
            | DecodeErrorKind::NullGetOnlyCollection { .. }
            | DecodeErrorKind::FixedSizeGetOnlyCollection { .. }
            | DecodeErrorKind::TypeMismatch { .. }
            | DecodeErrorKind::Value(_) => ErrorCategory::SchemaMismatch,
            DecodeErrorKind::InvalidUntypedLiteral { .. }
            | DecodeErrorKind::NestedCollection { .. }
            | DecodeErrorKind::MissingNavigationSource
            | DecodeErrorKind::NotAnOperationInvocation { .. }
            | DecodeErrorKind::InvalidEnumMember { .. }
            | DecodeErrorKind::NullNotAllowed { .. }
            | DecodeErrorKind::UnexpectedItem { .. }
            | DecodeErrorKind::Reader(_) => ErrorCategory::MalformedPayload,
            DecodeErrorKind::NoDeserializer { .. } => ErrorCategory::DecoderUnavailable,
            DecodeErrorKind::DuplicateDynamicProperty { .. } => {
                ErrorCategory::DuplicateDynamicProperty
            }
            DecodeErrorKind::RecursionTooDeep { .. } => ErrorCategory::RecursionTooDeep,
            DecodeErrorKind::UnknownParameter { .. } => ErrorCategory::ReaderContract,
        }
    }

    /// The location as a string such as `Orders[1].Name`, empty at the root.
    pub fn location(&self) -> String {
        let mut out = String::new();
        for step in &self.path {
            out.push_str(&step.to_string());
        }
        out.strip_prefix('.').map(str::to_string).unwrap_or(out)
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "at {}: {}", self.location(), self.kind)
        }
    }
}

impl core::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match &self.kind {
            DecodeErrorKind::Value(err) => Some(err),
            DecodeErrorKind::Reader(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DecodeErrorKind> for DecodeError {
    fn from(kind: DecodeErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<ValueError> for DecodeError {
    fn from(err: ValueError) -> Self {
        Self::new(DecodeErrorKind::Value(err))
    }
}

impl From<ReaderError> for DecodeError {
    fn from(err: ReaderError) -> Self {
        Self::new(DecodeErrorKind::Reader(err))
    }
}

impl From<TypeNameError> for DecodeError {
    fn from(err: TypeNameError) -> Self {
        match err {
            TypeNameError::NestedCollection(type_name) => {
                Self::new(DecodeErrorKind::NestedCollection { type_name })
            }
            TypeNameError::Unterminated(type_name) => {
                Self::new(DecodeErrorKind::UnknownType { type_name })
            }
        }
    }
}

/// Attach `step` to the error of a fallible decode.
pub(crate) trait ResultExt<T> {
    fn at(self, step: impl FnOnce() -> PathStep) -> Result<T, DecodeError>;
}

impl<T, E: Into<DecodeError>> ResultExt<T> for Result<T, E> {
    fn at(self, step: impl FnOnce() -> PathStep) -> Result<T, DecodeError> {
        self.map_err(|err| err.into().with_path(step()))
    }
}

/// The closest candidate to `name`, if any is similar enough.
pub(crate) fn suggest<'a>(
    name: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Option<String> {
    candidates
        .into_iter()
        .map(|candidate| (candidate, strsim::jaro_winkler(name, candidate)))
        .filter(|(_, similarity)| *similarity > 0.6)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(candidate, _)| candidate.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_renders_nested_steps() {
        let err = DecodeError::new(DecodeErrorKind::MissingNavigationSource)
            .with_path(PathStep::Property("Name".into()))
            .with_path(PathStep::Index(1))
            .with_path(PathStep::Property("Orders".into()));
        assert_eq!(err.location(), "Orders[1].Name");
        assert!(err.to_string().starts_with("at Orders[1].Name: "));
    }

    #[test]
    fn suggestions_pick_the_closest_name() {
        assert_eq!(
            suggest("Nmae", ["Id", "Name", "Orders"]),
            Some("Name".to_string())
        );
        assert_eq!(suggest("zzz", ["Id"]), None);
    }

    #[test]
    fn categories() {
        let err = DecodeError::new(DecodeErrorKind::RecursionTooDeep { limit: 3 });
        assert_eq!(err.category(), ErrorCategory::RecursionTooDeep);
        let err = DecodeError::from(ValueError::MissingParameter { name: "x".into() });
        assert_eq!(err.category(), ErrorCategory::SchemaMismatch);
    }
}
