/// A member of an enumeration type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdmEnumMember {
    /// Member name.
    pub name: String,
    /// Underlying value.
    pub value: i64,
}

/// An enumeration type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdmEnumType {
    namespace: String,
    name: String,
    is_flags: bool,
    members: Vec<EdmEnumMember>,
}

impl EdmEnumType {
    /// Start declaring an enumeration.
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            is_flags: false,
            members: Vec::new(),
        }
    }

    /// Mark the enumeration as a flags enumeration.
    pub fn flags(mut self) -> Self {
        self.is_flags = true;
        self
    }

    /// Declare a member.
    pub fn member(mut self, name: &str, value: i64) -> Self {
        self.members.push(EdmEnumMember {
            name: name.to_string(),
            value,
        });
        self
    }

    /// The unqualified name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The qualified name.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    /// Whether several members may be combined.
    pub fn is_flags(&self) -> bool {
        self.is_flags
    }

    /// All members.
    pub fn members(&self) -> &[EdmEnumMember] {
        &self.members
    }

    /// Find a member by name (exact match).
    pub fn member_by_name(&self, name: &str) -> Option<&EdmEnumMember> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Find a member by value.
    pub fn member_by_value(&self, value: i64) -> Option<&EdmEnumMember> {
        self.members.iter().find(|m| m.value == value)
    }
}
