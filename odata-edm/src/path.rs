use core::fmt;

use uuid::Uuid;

use crate::EdmTypeRef;

/// A key value parsed from a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyValue {
    /// An integral literal.
    Integer(i64),
    /// A quoted string literal, unescaped.
    String(String),
    /// A guid literal.
    Guid(Uuid),
    /// `true` or `false`.
    Boolean(bool),
    /// Any other literal (dates, decimals, ...), left for the consumer to
    /// interpret against the key property type.
    Literal(String),
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Integer(v) => write!(f, "{v}"),
            KeyValue::String(v) => write!(f, "'{}'", v.replace('\'', "''")),
            KeyValue::Guid(v) => write!(f, "{v}"),
            KeyValue::Boolean(v) => write!(f, "{v}"),
            KeyValue::Literal(v) => f.write_str(v),
        }
    }
}

/// One segment of a resource path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// `/Customers`
    EntitySet {
        /// Entity set name.
        name: String,
        /// Full name of the element entity type.
        entity_type: String,
    },
    /// `/Me`
    Singleton {
        /// Singleton name.
        name: String,
        /// Full name of the entity type.
        entity_type: String,
    },
    /// `(1)` or `(Id=1,Code='a')`
    Key {
        /// Key property names and values, in declaration order.
        keys: Vec<(String, KeyValue)>,
    },
    /// `/Orders`
    Navigation {
        /// Navigation property name.
        property: String,
        /// The property's type.
        ty: EdmTypeRef,
        /// The entity set the navigation targets, when known.
        navigation_source: Option<String>,
    },
    /// `/Address`
    Property {
        /// Property name.
        name: String,
        /// The property's type.
        ty: EdmTypeRef,
    },
    /// `/Sales.VipCustomer`
    TypeCast {
        /// Full name of the cast target.
        type_name: String,
    },
    /// `/ResetAll` (an unbound operation imported by the container).
    OperationImport {
        /// Import name.
        name: String,
        /// Full name of the imported operation.
        operation: String,
    },
    /// `/Sales.Promote` (an operation bound to the previous segment).
    Operation {
        /// Full name of the operation.
        operation: String,
    },
    /// `/$ref`
    Ref,
    /// `/$count`
    Count,
}

impl PathSegment {
    /// The segment as it would appear in a URL.
    pub fn identifier(&self) -> String {
        match self {
            PathSegment::EntitySet { name, .. }
            | PathSegment::Singleton { name, .. }
            | PathSegment::OperationImport { name, .. } => name.clone(),
            PathSegment::Key { keys } => {
                let rendered: Vec<String> = match keys.as_slice() {
                    [(_, single)] => vec![single.to_string()],
                    many => many.iter().map(|(k, v)| format!("{k}={v}")).collect(),
                };
                format!("({})", rendered.join(","))
            }
            PathSegment::Navigation { property, .. } => property.clone(),
            PathSegment::Property { name, .. } => name.clone(),
            PathSegment::TypeCast { type_name } => type_name.clone(),
            PathSegment::Operation { operation } => operation.clone(),
            PathSegment::Ref => "$ref".to_string(),
            PathSegment::Count => "$count".to_string(),
        }
    }
}

/// A parsed resource path: the part of the request URL after the service root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ODataPath {
    segments: Vec<PathSegment>,
}

impl ODataPath {
    /// A path made of `segments`.
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    /// The segments, in order.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// The last segment.
    pub fn last_segment(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// Append a segment.
    pub fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    /// The name of the entity set or singleton the path ends up addressing,
    /// if it can be determined.
    pub fn navigation_source(&self) -> Option<&str> {
        let mut current = None;
        for segment in &self.segments {
            match segment {
                PathSegment::EntitySet { name, .. } | PathSegment::Singleton { name, .. } => {
                    current = Some(name.as_str());
                }
                PathSegment::Navigation {
                    navigation_source, ..
                } => current = navigation_source.as_deref(),
                PathSegment::OperationImport { .. } => current = None,
                _ => {}
            }
        }
        current
    }

    /// The keys of the last key segment, if any.
    pub fn last_keys(&self) -> Option<&[(String, KeyValue)]> {
        self.segments.iter().rev().find_map(|s| match s {
            PathSegment::Key { keys } => Some(keys.as_slice()),
            _ => None,
        })
    }
}

impl fmt::Display for ODataPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                PathSegment::Key { .. } => f.write_str(&segment.identifier())?,
                _ => write!(f, "/{}", segment.identifier())?,
            }
        }
        Ok(())
    }
}

impl From<Vec<PathSegment>> for ODataPath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self::new(segments)
    }
}
