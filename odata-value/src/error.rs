use core::fmt;

use odata_edm::EdmPrimitiveKind;

/// Error raised while building or extracting decoded values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The value has a different shape than the target expects.
    TypeMismatch {
        /// What the target expected.
        expected: String,
        /// What the value actually held.
        got: String,
    },
    /// A numeric value does not fit the target kind.
    OutOfRange {
        /// The value, rendered.
        value: String,
        /// The target kind.
        target: EdmPrimitiveKind,
    },
    /// A textual value could not be parsed as the target kind.
    InvalidLiteral {
        /// The target kind.
        kind: EdmPrimitiveKind,
        /// The offending text.
        literal: String,
    },
    /// The resource has no property of that name.
    UnknownProperty {
        /// Name of the resource type.
        type_name: String,
        /// The property that was set.
        property: String,
    },
    /// A [`Delta`](crate::Delta) refused a property outside its updatable set.
    NotUpdatable {
        /// Name of the resource type.
        type_name: String,
        /// The property that was set.
        property: String,
    },
    /// A parameter was requested that the payload did not carry.
    MissingParameter {
        /// Parameter name.
        name: String,
    },
}

impl ValueError {
    pub(crate) fn type_mismatch(expected: impl Into<String>, got: impl Into<String>) -> Self {
        ValueError::TypeMismatch {
            expected: expected.into(),
            got: got.into(),
        }
    }

    pub(crate) fn out_of_range(value: impl fmt::Display, target: EdmPrimitiveKind) -> Self {
        ValueError::OutOfRange {
            value: value.to_string(),
            target,
        }
    }

    pub(crate) fn invalid_literal(kind: EdmPrimitiveKind, literal: &str) -> Self {
        ValueError::InvalidLiteral {
            kind,
            literal: literal.to_string(),
        }
    }
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueError::TypeMismatch { expected, got } => {
                write!(f, "type mismatch: expected {expected}, got {got}")
            }
            ValueError::OutOfRange { value, target } => {
                write!(f, "{value} is out of range for {target}")
            }
            ValueError::InvalidLiteral { kind, literal } => {
                write!(f, "`{literal}` is not a valid {kind} literal")
            }
            ValueError::UnknownProperty {
                type_name,
                property,
            } => write!(f, "`{type_name}` has no property `{property}`"),
            ValueError::NotUpdatable {
                type_name,
                property,
            } => write!(f, "property `{property}` of `{type_name}` cannot be updated"),
            ValueError::MissingParameter { name } => write!(f, "missing parameter `{name}`"),
        }
    }
}

impl core::error::Error for ValueError {}
