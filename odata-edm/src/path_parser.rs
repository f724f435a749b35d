use core::fmt;

use percent_encoding::percent_decode_str;
use url::Url;
use uuid::Uuid;

use crate::{EdmModel, EdmStructuredType, KeyValue, ODataPath, PathSegment};

/// Error produced while parsing a resource path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The URI could not be parsed at all.
    InvalidUri(String),
    /// An absolute URI that does not start with the service root.
    NotUnderServiceRoot {
        /// The offending URI.
        uri: String,
        /// The service root it was expected under.
        service_root: Option<String>,
    },
    /// Nothing left after stripping the service root.
    Empty,
    /// A segment that names nothing in the model.
    UnknownSegment(String),
    /// A key predicate that could not be parsed.
    InvalidKey {
        /// The segment carrying the key.
        segment: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::InvalidUri(uri) => write!(f, "`{uri}` is not a valid URI"),
            PathError::NotUnderServiceRoot { uri, service_root } => match service_root {
                Some(root) => write!(f, "`{uri}` is not under the service root `{root}`"),
                None => write!(f, "`{uri}` is absolute but no service root is known"),
            },
            PathError::Empty => f.write_str("the path is empty"),
            PathError::UnknownSegment(segment) => {
                write!(f, "segment `{segment}` does not resolve against the model")
            }
            PathError::InvalidKey { segment, reason } => {
                write!(f, "invalid key in segment `{segment}`: {reason}")
            }
        }
    }
}

impl core::error::Error for PathError {}

/// Turns a resource URI into an [`ODataPath`].
pub trait PathParser: Send + Sync + fmt::Debug {
    /// Parse `uri`, which is either relative to `service_root` or absolute
    /// and located under it.
    fn parse(
        &self,
        model: &EdmModel,
        service_root: Option<&str>,
        uri: &str,
    ) -> Result<ODataPath, PathError>;
}

/// Parser for the resource-path subset needed to address entities:
/// entity sets, singletons, key predicates (parenthesized or as segments),
/// navigation and structural properties, type casts, operations, `$ref` and
/// `$count`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPathParser;

enum Cursor<'m> {
    Start,
    Collection(&'m EdmStructuredType),
    Single(&'m EdmStructuredType),
    Done,
}

impl PathParser for DefaultPathParser {
    fn parse(
        &self,
        model: &EdmModel,
        service_root: Option<&str>,
        uri: &str,
    ) -> Result<ODataPath, PathError> {
        let relative = relative_part(service_root, uri)?;
        let raw_segments = split_segments(&relative);
        if raw_segments.is_empty() {
            return Err(PathError::Empty);
        }

        let mut path = ODataPath::default();
        let mut cursor = Cursor::Start;

        for raw in raw_segments {
            let segment = percent_decode_str(raw)
                .decode_utf8()
                .map_err(|_| PathError::InvalidUri(uri.to_string()))?;
            let (name, key_text) = split_key_predicate(&segment);

            cursor = match cursor {
                Cursor::Start => {
                    if let Some(source) = model.navigation_source(name) {
                        let entity_type = model
                            .structured_type(&source.entity_type)
                            .ok_or_else(|| PathError::UnknownSegment(segment.to_string()))?;
                        if source.is_entity_set() {
                            path.push(PathSegment::EntitySet {
                                name: source.name.clone(),
                                entity_type: source.entity_type.clone(),
                            });
                            with_keys(model, &mut path, entity_type, &segment, key_text)?
                        } else {
                            path.push(PathSegment::Singleton {
                                name: source.name.clone(),
                                entity_type: source.entity_type.clone(),
                            });
                            Cursor::Single(entity_type)
                        }
                    } else if let Some(import) = model.container().operation_import(name) {
                        path.push(PathSegment::OperationImport {
                            name: import.name.clone(),
                            operation: import.operation.clone(),
                        });
                        Cursor::Done
                    } else {
                        return Err(PathError::UnknownSegment(segment.to_string()));
                    }
                }
                Cursor::Collection(entity_type) => {
                    if name == "$count" {
                        path.push(PathSegment::Count);
                        Cursor::Done
                    } else if let Some(next) =
                        qualified_segment(model, &mut path, entity_type, name, true)
                    {
                        next
                    } else if key_text.is_none() {
                        // key-as-segment: /Customers/1
                        let keys = parse_keys(model, entity_type, &segment, &segment)?;
                        path.push(PathSegment::Key { keys });
                        Cursor::Single(entity_type)
                    } else {
                        return Err(PathError::UnknownSegment(segment.to_string()));
                    }
                }
                Cursor::Single(entity_type) => {
                    if name == "$ref" {
                        path.push(PathSegment::Ref);
                        Cursor::Done
                    } else if let Some(property) = model.find_property(entity_type, name) {
                        if property.is_navigation() {
                            let is_collection = property.ty.element_type().is_some();
                            let target_name = property
                                .ty
                                .element_type()
                                .unwrap_or(&property.ty)
                                .structured_name()
                                .ok_or_else(|| PathError::UnknownSegment(segment.to_string()))?;
                            let target = model
                                .structured_type(target_name)
                                .ok_or_else(|| PathError::UnknownSegment(segment.to_string()))?;
                            path.push(PathSegment::Navigation {
                                property: property.name.clone(),
                                ty: property.ty.clone(),
                                navigation_source: None,
                            });
                            if is_collection {
                                with_keys(model, &mut path, target, &segment, key_text)?
                            } else {
                                Cursor::Single(target)
                            }
                        } else {
                            path.push(PathSegment::Property {
                                name: property.name.clone(),
                                ty: property.ty.clone(),
                            });
                            Cursor::Done
                        }
                    } else if let Some(next) =
                        qualified_segment(model, &mut path, entity_type, name, false)
                    {
                        next
                    } else {
                        return Err(PathError::UnknownSegment(segment.to_string()));
                    }
                }
                Cursor::Done => return Err(PathError::UnknownSegment(segment.to_string())),
            };
        }

        Ok(path)
    }
}

/// Strip the service root (for absolute URIs), query and fragment.
fn relative_part(service_root: Option<&str>, uri: &str) -> Result<String, PathError> {
    let not_under_root = || PathError::NotUnderServiceRoot {
        uri: uri.to_string(),
        service_root: service_root.map(str::to_string),
    };
    let relative = match Url::parse(uri) {
        Ok(absolute) => {
            let root = service_root.ok_or_else(not_under_root)?;
            let root = Url::parse(root).map_err(|_| PathError::InvalidUri(root.to_string()))?;
            let root = root.as_str().trim_end_matches('/');
            absolute
                .as_str()
                .strip_prefix(root)
                .ok_or_else(not_under_root)?
                .to_string()
        }
        Err(url::ParseError::RelativeUrlWithoutBase) => uri.to_string(),
        Err(_) => return Err(PathError::InvalidUri(uri.to_string())),
    };
    let without_query = relative
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .to_string();
    Ok(without_query)
}

/// Split on `/`, ignoring slashes inside quoted literals.
fn split_segments(path: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in path.char_indices() {
        match c {
            '\'' => in_quotes = !in_quotes,
            '/' if !in_quotes => {
                if i > start {
                    segments.push(&path[start..i]);
                }
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < path.len() {
        segments.push(&path[start..]);
    }
    segments
}

/// `Customers(1)` -> (`Customers`, Some(`1`))
fn split_key_predicate(segment: &str) -> (&str, Option<&str>) {
    match (segment.find('('), segment.ends_with(')')) {
        (Some(open), true) => (&segment[..open], Some(&segment[open + 1..segment.len() - 1])),
        _ => (segment, None),
    }
}

fn with_keys<'m>(
    model: &'m EdmModel,
    path: &mut ODataPath,
    entity_type: &'m EdmStructuredType,
    segment: &str,
    key_text: Option<&str>,
) -> Result<Cursor<'m>, PathError> {
    match key_text {
        Some(text) => {
            let keys = parse_keys(model, entity_type, segment, text)?;
            path.push(PathSegment::Key { keys });
            Ok(Cursor::Single(entity_type))
        }
        None => Ok(Cursor::Collection(entity_type)),
    }
}

/// Type casts and bound operations, both spelled with a qualified name.
fn qualified_segment<'m>(
    model: &'m EdmModel,
    path: &mut ODataPath,
    current: &'m EdmStructuredType,
    name: &str,
    is_collection: bool,
) -> Option<Cursor<'m>> {
    if !name.contains('.') {
        return None;
    }
    if let Some(cast) = model.structured_type(name) {
        if !model.is_assignable_to(cast, &current.full_name()) {
            return None;
        }
        path.push(PathSegment::TypeCast {
            type_name: cast.full_name(),
        });
        return Some(if is_collection {
            Cursor::Collection(cast)
        } else {
            Cursor::Single(cast)
        });
    }
    let operation = model.find_operation(name).filter(|op| op.is_bound())?;
    path.push(PathSegment::Operation {
        operation: operation.full_name(),
    });
    Some(Cursor::Done)
}

fn parse_keys(
    model: &EdmModel,
    entity_type: &EdmStructuredType,
    segment: &str,
    text: &str,
) -> Result<Vec<(String, KeyValue)>, PathError> {
    let invalid = |reason: &str| PathError::InvalidKey {
        segment: segment.to_string(),
        reason: reason.to_string(),
    };
    let key_names = model.key_names(entity_type);
    let parts = split_top_level_commas(text);
    if parts.is_empty() {
        return Err(invalid("empty key predicate"));
    }

    if let [single] = parts.as_slice()
        && find_unquoted(single, '=').is_none()
    {
        let [name] = key_names.as_slice() else {
            return Err(invalid("a single key value needs a single key property"));
        };
        return Ok(vec![(name.to_string(), parse_literal(single).ok_or_else(|| invalid("empty key value"))?)]);
    }

    let mut keys = Vec::with_capacity(parts.len());
    for part in parts {
        let eq = find_unquoted(part, '=').ok_or_else(|| invalid("expected `name=value`"))?;
        let name = part[..eq].trim();
        if !key_names.contains(&name) {
            return Err(invalid(&format!("`{name}` is not a key property")));
        }
        let value = parse_literal(&part[eq + 1..]).ok_or_else(|| invalid("empty key value"))?;
        keys.push((name.to_string(), value));
    }
    Ok(keys)
}

fn split_top_level_commas(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '\'' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() || !parts.is_empty() {
        parts.push(tail);
    }
    parts
}

fn find_unquoted(text: &str, needle: char) -> Option<usize> {
    let mut in_quotes = false;
    for (i, c) in text.char_indices() {
        if c == '\'' {
            in_quotes = !in_quotes;
        } else if c == needle && !in_quotes {
            return Some(i);
        }
    }
    None
}

fn parse_literal(raw: &str) -> Option<KeyValue> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        return Some(KeyValue::String(raw[1..raw.len() - 1].replace("''", "'")));
    }
    match raw {
        "true" => return Some(KeyValue::Boolean(true)),
        "false" => return Some(KeyValue::Boolean(false)),
        _ => {}
    }
    if let Ok(v) = raw.parse::<i64>() {
        return Some(KeyValue::Integer(v));
    }
    if raw.len() == 36
        && let Ok(v) = Uuid::parse_str(raw)
    {
        return Some(KeyValue::Guid(v));
    }
    Some(KeyValue::Literal(raw.to_string()))
}
