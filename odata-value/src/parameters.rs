use indexmap::IndexMap;

use crate::{FromValue, Value, ValueError};

/// Decoded action parameters, keyed by parameter name.
///
/// Iteration follows payload order; lookup is by name.
#[derive(Debug, Default)]
pub struct ParameterMap {
    values: IndexMap<String, Value>,
}

impl ParameterMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the value of parameter `name`, replacing any earlier value.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// The value of parameter `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Whether the payload carried parameter `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Remove parameter `name` and convert it to `T`.
    pub fn take<T: FromValue>(&mut self, name: &str) -> Result<T, ValueError> {
        let value = self
            .values
            .shift_remove(name)
            .ok_or_else(|| ValueError::MissingParameter {
                name: name.to_string(),
            })?;
        T::from_value(value)
    }

    /// Parameter names, in payload order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate `(name, value)` pairs in payload order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl IntoIterator for ParameterMap {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}
