use crate::EdmTypeRef;

/// Action or function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Side-effecting operation invoked with `POST`; its parameters arrive in the body.
    Action,
    /// Side-effect free operation.
    Function,
}

/// A declared parameter of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdmOperationParameter {
    /// Parameter name.
    pub name: String,
    /// Parameter type.
    pub ty: EdmTypeRef,
}

/// An action or function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdmOperation {
    namespace: String,
    name: String,
    kind: OperationKind,
    is_bound: bool,
    parameters: Vec<EdmOperationParameter>,
    return_type: Option<EdmTypeRef>,
}

impl EdmOperation {
    fn new(namespace: &str, name: &str, kind: OperationKind) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            kind,
            is_bound: false,
            parameters: Vec::new(),
            return_type: None,
        }
    }

    /// Start declaring an action.
    pub fn action(namespace: &str, name: &str) -> Self {
        Self::new(namespace, name, OperationKind::Action)
    }

    /// Start declaring a function.
    pub fn function(namespace: &str, name: &str) -> Self {
        Self::new(namespace, name, OperationKind::Function)
    }

    /// Bind the operation to `binding_type`; the binding parameter is added
    /// as the first parameter, named `bindingParameter`.
    pub fn bound_to(mut self, binding_type: EdmTypeRef) -> Self {
        self.is_bound = true;
        self.parameters.insert(
            0,
            EdmOperationParameter {
                name: "bindingParameter".to_string(),
                ty: binding_type,
            },
        );
        self
    }

    /// Declare a parameter.
    pub fn parameter(mut self, name: &str, ty: EdmTypeRef) -> Self {
        self.parameters.push(EdmOperationParameter {
            name: name.to_string(),
            ty,
        });
        self
    }

    /// Declare the return type.
    pub fn returns(mut self, ty: EdmTypeRef) -> Self {
        self.return_type = Some(ty);
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

    /// Action or function.
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Whether the operation is bound to a type.
    pub fn is_bound(&self) -> bool {
        self.is_bound
    }

    /// All parameters, binding parameter first for bound operations.
    pub fn parameters(&self) -> &[EdmOperationParameter] {
        &self.parameters
    }

    /// Find a parameter by name.
    pub fn find_parameter(&self, name: &str) -> Option<&EdmOperationParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// The return type, if any.
    pub fn return_type(&self) -> Option<&EdmTypeRef> {
        self.return_type.as_ref()
    }
}
