//! Injector declarations.
//!
//! An injector asks for one or more output types, may take external
//! arguments (matched by type) and may or may not be able to return an
//! error.

use serde::Serialize;

use crate::key::TypeKey;

/// An argument of the injector, supplied by its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InjectorInput {
    /// Declared parameter name
    pub name: String,
    pub ty: TypeKey,
}

/// What an injector must construct.
///
/// # Examples
/// ```
/// use wiregen_core::injector::InjectorSpec;
///
/// let spec = InjectorSpec::new("initialize_event")
///     .input("phrase", "String")
///     .output("app::Event")
///     .error_capable(true);
///
/// assert_eq!(spec.inputs().len(), 1);
/// assert!(spec.is_error_capable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InjectorSpec {
    name: String,
    inputs: Vec<InjectorInput>,
    outputs: Vec<TypeKey>,
    error_capable: bool,
}

impl InjectorSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            error_capable: false,
        }
    }

    /// Adds an external argument.
    pub fn input(mut self, name: impl Into<String>, ty: impl Into<TypeKey>) -> Self {
        self.inputs.push(InjectorInput {
            name: name.into(),
            ty: ty.into(),
        });
        self
    }

    /// Adds a requested output type.
    pub fn output(mut self, ty: impl Into<TypeKey>) -> Self {
        self.outputs.push(ty.into());
        self
    }

    /// Whether the injector's signature has an error channel.
    pub fn error_capable(mut self, capable: bool) -> Self {
        self.error_capable = capable;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[InjectorInput] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TypeKey] {
        &self.outputs
    }

    pub fn is_error_capable(&self) -> bool {
        self.error_capable
    }

    /// Position of the argument of type `ty`, if the injector takes one.
    pub fn argument_for(&self, ty: &TypeKey) -> Option<usize> {
        self.inputs.iter().position(|input| &input.ty == ty)
    }
}
