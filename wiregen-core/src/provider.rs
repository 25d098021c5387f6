//! Provider declarations and provider sets.
//!
//! A [`Provider`] constructs one or more output types from an ordered list
//! of input types. Value bindings, interface bindings, struct literals and
//! struct field accessors are all expressed as providers, so the graph
//! only ever deals with one kind of node source.
//!
//! A [`ProviderSet`] groups providers and other sets under a name, similar
//! to a module of related registrations.
//!
//! # Examples
//! ```
//! use wiregen_core::provider::{Provider, ProviderSet};
//!
//! let greeting = ProviderSet::new("GreetingSet")
//!     .provider(Provider::function("app::new_message", Vec::<&str>::new(), "app::Message"))
//!     .provider(Provider::function("app::new_greeter", ["app::Message"], "app::Greeter"));
//!
//! let app = ProviderSet::new("AppSet")
//!     .include(greeting)
//!     .provider(Provider::function("app::new_event", ["app::Greeter"], "app::Event").fallible());
//!
//! assert_eq!(app.flatten().unwrap().len(), 3);
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::trace;

use crate::error::{ConflictingProviderError, Diagnostic, DuplicateProviderError, Result};
use crate::key::TypeKey;

/// How a provider produces its outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderKind {
    /// A constructor call taking the inputs as arguments.
    Function,
    /// A pre-existing value; `expr` is an opaque marker for the renderer.
    Value { expr: String },
    /// Interface binding: the single input (the concrete type) is used
    /// as the single output (the interface type).
    Bind,
    /// Struct literal; `fields[i]` is initialised from `inputs[i]`.
    Struct { fields: Vec<String> },
    /// Field accessors on the single input; `fields[i]` yields `outputs[i]`.
    FieldsOf { fields: Vec<String> },
}

impl ProviderKind {
    /// Short label used in outlines and logs.
    pub fn label(&self) -> &'static str {
        match self {
            ProviderKind::Function => "call",
            ProviderKind::Value { .. } => "value",
            ProviderKind::Bind => "bind",
            ProviderKind::Struct { .. } => "struct",
            ProviderKind::FieldsOf { .. } => "field",
        }
    }
}

/// An immutable provider declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provider {
    id: String,
    kind: ProviderKind,
    inputs: Vec<TypeKey>,
    outputs: Vec<TypeKey>,
    can_fail: bool,
    has_cleanup: bool,
    is_override: bool,
}

impl Provider {
    fn with_kind(id: impl Into<String>, kind: ProviderKind, inputs: Vec<TypeKey>, outputs: Vec<TypeKey>) -> Self {
        Self {
            id: id.into(),
            kind,
            inputs,
            outputs,
            can_fail: false,
            has_cleanup: false,
            is_override: false,
        }
    }

    /// A constructor function `id(inputs...) -> output`.
    pub fn function<I, T>(id: impl Into<String>, inputs: I, output: impl Into<TypeKey>) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TypeKey>,
    {
        Self::with_kind(
            id,
            ProviderKind::Function,
            inputs.into_iter().map(Into::into).collect(),
            vec![output.into()],
        )
    }

    /// A value binding: `ty` is provided by the literal `expr`.
    pub fn value(ty: impl Into<TypeKey>, expr: impl Into<String>) -> Self {
        let ty = ty.into();
        let expr = expr.into();
        Self::with_kind(
            format!("value({ty} = {expr})"),
            ProviderKind::Value { expr },
            vec![],
            vec![ty],
        )
    }

    /// An interface binding: `interface` is satisfied by `concrete`.
    pub fn bind(interface: impl Into<TypeKey>, concrete: impl Into<TypeKey>) -> Self {
        let interface = interface.into();
        let concrete = concrete.into();
        Self::with_kind(
            format!("bind({interface} -> {concrete})"),
            ProviderKind::Bind,
            vec![concrete],
            vec![interface],
        )
    }

    /// A struct literal of `ty` whose named fields are injected.
    pub fn structure<F, N, T>(ty: impl Into<TypeKey>, fields: F) -> Self
    where
        F: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<TypeKey>,
    {
        let ty = ty.into();
        let (names, inputs): (Vec<String>, Vec<TypeKey>) =
            fields.into_iter().map(|(n, t)| (n.into(), t.into())).unzip();
        Self::with_kind(
            format!("struct({ty})"),
            ProviderKind::Struct { fields: names },
            inputs,
            vec![ty],
        )
    }

    /// Exposes named fields of `parent` as providers of their types.
    pub fn fields_of<F, N, T>(parent: impl Into<TypeKey>, fields: F) -> Self
    where
        F: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<TypeKey>,
    {
        let parent = parent.into();
        let (names, outputs): (Vec<String>, Vec<TypeKey>) =
            fields.into_iter().map(|(n, t)| (n.into(), t.into())).unzip();
        Self::with_kind(
            format!("fields_of({parent}: {})", names.join(", ")),
            ProviderKind::FieldsOf { fields: names },
            vec![parent],
            outputs,
        )
    }

    /// Adds another output produced by the same function call.
    pub fn also_produces(mut self, ty: impl Into<TypeKey>) -> Self {
        if self.kind == ProviderKind::Function {
            self.outputs.push(ty.into());
        }
        self
    }

    /// Marks a function provider as returning a result-or-error.
    pub fn fallible(mut self) -> Self {
        if self.kind == ProviderKind::Function {
            self.can_fail = true;
        }
        self
    }

    /// Marks a function provider as also returning a release action.
    pub fn with_cleanup(mut self) -> Self {
        if self.kind == ProviderKind::Function {
            self.has_cleanup = true;
        }
        self
    }

    /// Lets this provider replace earlier providers of the same types.
    pub fn as_override(mut self) -> Self {
        self.is_override = true;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &ProviderKind {
        &self.kind
    }

    pub fn inputs(&self) -> &[TypeKey] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TypeKey] {
        &self.outputs
    }

    pub fn can_fail(&self) -> bool {
        self.can_fail
    }

    pub fn has_cleanup(&self) -> bool {
        self.has_cleanup
    }

    pub fn is_override(&self) -> bool {
        self.is_override
    }
}

/// An entry of a [`ProviderSet`].
#[derive(Debug, Clone)]
pub enum SetItem {
    Provider(Arc<Provider>),
    Set(Arc<ProviderSet>),
}

/// A named, reusable group of providers and nested sets.
#[derive(Debug, Clone)]
pub struct ProviderSet {
    name: String,
    items: Vec<SetItem>,
}

impl ProviderSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
        }
    }

    /// Adds a provider to this set.
    pub fn provider(mut self, provider: impl Into<Arc<Provider>>) -> Self {
        self.items.push(SetItem::Provider(provider.into()));
        self
    }

    /// Includes another set. Sharing one `Arc` across several parents
    /// lets flattening recognise it as the same set.
    pub fn include(mut self, set: impl Into<Arc<ProviderSet>>) -> Self {
        self.items.push(SetItem::Set(set.into()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn items(&self) -> &[SetItem] {
        &self.items
    }

    /// Flattens this set and every nested set into one provider list.
    ///
    /// Providers appear in declaration order, nested sets expanded in
    /// place. Identical providers and sets reached more than once are
    /// kept once.
    ///
    /// # Errors
    /// - [`Diagnostic::ConflictingProvider`] — two sets provide one type
    ///   with different providers
    /// - [`Diagnostic::DuplicateProvider`] — one set does
    pub fn flatten(&self) -> Result<Vec<Arc<Provider>>> {
        self.flatten_with(false)
    }

    /// Like [`ProviderSet::flatten`], but with `allow_override` every
    /// provider may take over types claimed earlier, as if each were
    /// marked [`Provider::as_override`].
    ///
    /// # Errors
    /// See [`ProviderSet::flatten`].
    pub fn flatten_with(&self, allow_override: bool) -> Result<Vec<Arc<Provider>>> {
        let mut flattener = Flattener {
            allow_override,
            ..Flattener::default()
        };
        flattener.visit(self)?;
        Ok(flattener.providers)
    }
}

#[derive(Default)]
struct Flattener {
    providers: Vec<Arc<Provider>>,
    claims: IndexMap<TypeKey, (Arc<Provider>, String)>,
    seen_sets: HashSet<*const ProviderSet>,
    allow_override: bool,
}

impl Flattener {
    fn visit(&mut self, set: &ProviderSet) -> Result<()> {
        if !self.seen_sets.insert(std::ptr::from_ref(set)) {
            trace!(set = set.name(), "Set already expanded");
            return Ok(());
        }

        for item in &set.items {
            match item {
                SetItem::Provider(provider) => self.add(provider, set.name())?,
                SetItem::Set(nested) => self.visit(nested)?,
            }
        }
        Ok(())
    }

    fn add(&mut self, provider: &Arc<Provider>, set_name: &str) -> Result<()> {
        if self.providers.iter().any(|p| p == provider) {
            trace!(provider = provider.id(), "Identical provider reached twice");
            return Ok(());
        }

        for ty in provider.outputs() {
            let Some((existing, existing_set)) = self.claims.get(ty) else {
                continue;
            };
            if provider.is_override() || self.allow_override {
                continue;
            }
            if existing_set == set_name {
                return Err(Diagnostic::DuplicateProvider(DuplicateProviderError {
                    ty: ty.clone(),
                    existing: existing.id().to_string(),
                    duplicate: provider.id().to_string(),
                }));
            }
            return Err(Diagnostic::ConflictingProvider(ConflictingProviderError {
                ty: ty.clone(),
                first: existing.id().to_string(),
                first_set: existing_set.clone(),
                second: provider.id().to_string(),
                second_set: set_name.to_string(),
            }));
        }

        for ty in provider.outputs() {
            self.claims
                .insert(ty.clone(), (Arc::clone(provider), set_name.to_string()));
        }
        self.providers.push(Arc::clone(provider));
        Ok(())
    }
}
