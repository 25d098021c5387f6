//! Diagnostics produced while resolving an injector.
//!
//! Every diagnostic names the offending types and declarations and ends
//! with a hint about how to fix the declaration. Each one also carries a
//! stable [`DiagnosticKind`] tag for machine-readable reports.

use std::fmt;

use serde::Serialize;
use wiregen_support::rendering::render_chain;

use crate::key::TypeKey;

/// A compile-time diagnostic for one injector.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A required type has no provider, binding or injector argument.
    #[error("{}", .0)]
    NoProviderFound(NoProviderFoundError),

    /// Two providers claim the same type inside one declaration scope.
    #[error("{}", .0)]
    DuplicateProvider(DuplicateProviderError),

    /// Two different provider sets supply different providers for one type.
    #[error("{}", .0)]
    ConflictingProvider(ConflictingProviderError),

    /// A type transitively requires itself.
    #[error("{}", .0)]
    CycleDetected(CycleDetectedError),

    /// A provider was supplied but never reached from any target.
    #[error("{}", .0)]
    UnusedProvider(UnusedProviderError),

    /// A reachable provider can fail but the injector has no error channel.
    #[error("{}", .0)]
    InjectorCannotFail(InjectorCannotFailError),

    /// An injector argument is never consumed.
    #[error("{}", .0)]
    ArgumentTypeMismatch(ArgumentTypeMismatchError),
}

impl Diagnostic {
    /// Returns the stable kind tag of this diagnostic.
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Diagnostic::NoProviderFound(_) => DiagnosticKind::NoProviderFound,
            Diagnostic::DuplicateProvider(_) => DiagnosticKind::DuplicateProvider,
            Diagnostic::ConflictingProvider(_) => DiagnosticKind::ConflictingProvider,
            Diagnostic::CycleDetected(_) => DiagnosticKind::CycleDetected,
            Diagnostic::UnusedProvider(_) => DiagnosticKind::UnusedProvider,
            Diagnostic::InjectorCannotFail(_) => DiagnosticKind::InjectorCannotFail,
            Diagnostic::ArgumentTypeMismatch(_) => DiagnosticKind::ArgumentTypeMismatch,
        }
    }
}

/// Machine-readable tag for a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    NoProviderFound,
    DuplicateProvider,
    ConflictingProvider,
    CycleDetected,
    UnusedProvider,
    InjectorCannotFail,
    ArgumentTypeMismatch,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::NoProviderFound => "no_provider_found",
            DiagnosticKind::DuplicateProvider => "duplicate_provider",
            DiagnosticKind::ConflictingProvider => "conflicting_provider",
            DiagnosticKind::CycleDetected => "cycle_detected",
            DiagnosticKind::UnusedProvider => "unused_provider",
            DiagnosticKind::InjectorCannotFail => "injector_cannot_fail",
            DiagnosticKind::ArgumentTypeMismatch => "argument_type_mismatch",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A type nothing can construct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoProviderFoundError {
    /// The type that could not be provided
    pub ty: TypeKey,
    /// The node that needed it; `None` when the injector requested it directly
    pub required_by: Option<TypeKey>,
    /// Provided types with similar names
    pub suggestions: Vec<String>,
}

impl fmt::Display for NoProviderFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "No provider found for {}", self.ty)?;

        match self.required_by {
            Some(ref parent) => write!(f, "\n  Required by: {parent}")?,
            None => write!(f, "\n  Requested by the injector")?,
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        write!(
            f,
            "\n  Hint: Add a provider or binding for {} to the set, or take it as an injector argument",
            self.ty.short_name()
        )
    }
}

/// Two providers for one type where no override applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateProviderError {
    pub ty: TypeKey,
    /// Provider that was registered first
    pub existing: String,
    /// Provider that was rejected
    pub duplicate: String,
}

impl fmt::Display for DuplicateProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Multiple providers for {}: {} and {}",
            self.ty, self.existing, self.duplicate
        )?;
        write!(
            f,
            "\n  Hint: Remove one of them, or mark the newer one as an override"
        )
    }
}

/// Two sets disagree about who provides a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictingProviderError {
    pub ty: TypeKey,
    pub first: String,
    pub first_set: String,
    pub second: String,
    pub second_set: String,
}

impl fmt::Display for ConflictingProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Conflicting providers for {}: {} (from set {}) and {} (from set {})",
            self.ty, self.first, self.first_set, self.second, self.second_set
        )?;
        write!(
            f,
            "\n  Hint: Only one of the included sets may provide {}",
            self.ty.short_name()
        )
    }
}

/// A dependency cycle.
///
/// Shows the full path so you can see WHERE the cycle is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleDetectedError {
    /// The cycle, starting and ending with the same type.
    /// Example: ["A", "B", "A"]
    pub path: Vec<TypeKey>,
}

impl fmt::Display for CycleDetectedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dependency cycle detected:\n  {}", render_chain(&self.path))?;
        write!(
            f,
            "\n  Hint: Break the cycle by taking one of these types as an injector argument"
        )
    }
}

/// A provider that no target needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnusedProviderError {
    pub provider: String,
}

impl fmt::Display for UnusedProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unused provider: {}", self.provider)?;
        write!(f, "\n  Hint: Remove it from the provider set")
    }
}

/// A fallible provider inside an infallible injector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InjectorCannotFailError {
    pub injector: String,
    pub provider: String,
}

impl fmt::Display for InjectorCannotFailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Injector {} cannot return an error, but provider {} can fail",
            self.injector, self.provider
        )?;
        write!(f, "\n  Hint: Declare the injector with an error result")
    }
}

/// An injector argument nothing consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgumentTypeMismatchError {
    pub injector: String,
    pub argument: String,
    pub ty: TypeKey,
}

impl fmt::Display for ArgumentTypeMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Argument {} of injector {} has type {}, which no provider consumes",
            self.argument, self.injector, self.ty
        )?;
        write!(f, "\n  Hint: Remove the argument or fix its type")
    }
}

/// All diagnostics reported for one injector. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    /// Wraps a non-empty list. Returns `None` for an empty one.
    pub fn new(diagnostics: Vec<Diagnostic>) -> Option<Self> {
        (!diagnostics.is_empty()).then_some(Self(diagnostics))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn first(&self) -> &Diagnostic {
        &self.0[0]
    }

    pub fn kinds(&self) -> Vec<DiagnosticKind> {
        self.0.iter().map(Diagnostic::kind).collect()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self(vec![diagnostic])
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

/// Convenient Result type for single-failure stages.
pub type Result<T> = std::result::Result<T, Diagnostic>;
